use {
    super::Repository,
    crate::api::RestError,
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
};

impl Repository {
    /// Inserts the (auction, user) pair and returns the new watcher count.
    pub async fn add_watcher(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<i64, RestError> {
        let count = self
            .db
            .add_watcher(auction_id, user_id.clone())
            .await?
            .ok_or(RestError::AlreadyWatching)?;

        self.in_memory_store
            .watchers
            .write()
            .await
            .entry(auction_id)
            .or_default()
            .insert(user_id);
        Ok(count)
    }
}
