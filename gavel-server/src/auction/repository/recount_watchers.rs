use {
    super::Repository,
    gavel_api_types::auction::AuctionId,
};

impl Repository {
    /// Re-derives the cached watcher counter from the durable set cardinality.
    pub async fn recount_watchers(&self, auction_id: AuctionId) -> anyhow::Result<i64> {
        self.db.recount_watchers(auction_id).await
    }
}
