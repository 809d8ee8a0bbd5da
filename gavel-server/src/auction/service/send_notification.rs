use {
    super::Service,
    crate::{
        api::ws::UpdateEvent,
        auction::entities,
    },
    gavel_api_types::UserId,
};

impl Service {
    /// Records the notification durably, then pushes it on the recipient's
    /// user channel. A failed insert is logged and the push still happens,
    /// so a connected user is not silenced by a storage hiccup.
    pub async fn send_notification(&self, notification: entities::Notification) {
        if let Err(err) = self.repo.add_notification(&notification).await {
            tracing::error!(
                error = ?err,
                user_id = notification.user_id.as_str(),
                "Failed to store notification"
            );
        }
        self.publish(UpdateEvent::Notification(notification.into()));
    }

    /// Sends one notification to every watcher of the auction.
    pub async fn notify_watchers(
        &self,
        auction: &entities::Auction,
        build: impl Fn(UserId) -> entities::Notification,
    ) {
        let watchers = match self.repo.list_watchers(auction.id).await {
            Ok(watchers) => watchers,
            Err(err) => {
                tracing::error!(
                    error = ?err,
                    auction_id = %auction.id,
                    "Failed to list watchers for notification fan-out"
                );
                return;
            }
        };
        // Fan-out already paid for the full durable set; if the cached counter
        // drifted from its cardinality, re-derive it here.
        if watchers.len() as i64 != auction.watchers_count {
            if let Err(err) = self.repo.recount_watchers(auction.id).await {
                tracing::warn!(
                    error = ?err,
                    auction_id = %auction.id,
                    "Failed to recount watchers"
                );
            }
        }
        for user_id in watchers {
            self.send_notification(build(user_id)).await;
        }
    }
}
