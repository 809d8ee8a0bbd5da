use {
    super::Repository,
    crate::api::RestError,
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
};

impl Repository {
    /// Removes the (auction, user) pair and returns the new watcher count.
    pub async fn remove_watcher(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<i64, RestError> {
        let count = self
            .db
            .remove_watcher(auction_id, user_id.clone())
            .await?
            .ok_or(RestError::NotWatching)?;

        if let Some(watchers) = self.in_memory_store.watchers.write().await.get_mut(&auction_id) {
            watchers.remove(&user_id);
        }
        Ok(count)
    }
}
