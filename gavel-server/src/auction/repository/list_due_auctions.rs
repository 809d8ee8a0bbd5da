use {
    super::Repository,
    crate::auction::entities,
    std::time::Duration,
    time::OffsetDateTime,
};

impl Repository {
    pub async fn list_activatable(
        &self,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<entities::Auction>> {
        self.db.list_activatable(now).await
    }

    pub async fn list_closable(
        &self,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<entities::Auction>> {
        self.db.list_closable(now).await
    }

    pub async fn list_ending_soon(
        &self,
        now: OffsetDateTime,
        window: Duration,
    ) -> anyhow::Result<Vec<entities::Auction>> {
        self.db.list_ending_soon(now, window).await
    }
}
