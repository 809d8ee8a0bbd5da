use {
    super::Repository,
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
};

impl Repository {
    /// Reads the durable watcher set and refreshes the in-memory cache from it.
    pub async fn list_watchers(&self, auction_id: AuctionId) -> anyhow::Result<Vec<UserId>> {
        let watchers = self.db.list_watchers(auction_id).await?;
        self.in_memory_store
            .watchers
            .write()
            .await
            .insert(auction_id, watchers.iter().cloned().collect());
        Ok(watchers)
    }
}
