use {
    super::Repository,
    crate::auction::entities,
};

impl Repository {
    pub async fn add_notification(
        &self,
        notification: &entities::Notification,
    ) -> anyhow::Result<()> {
        self.db.add_notification(notification).await
    }
}
