use {
    super::Repository,
    crate::auction::entities,
    gavel_api_types::auction::AuctionId,
    std::sync::Arc,
};

impl Repository {
    pub async fn get_or_create_auction_lock(&self, auction_id: AuctionId) -> entities::AuctionLock {
        self.in_memory_store
            .auction_locks
            .lock()
            .await
            .entry(auction_id)
            .or_default()
            .clone()
    }

    pub async fn remove_auction_lock(&self, auction_id: &AuctionId) {
        let mut guard = self.in_memory_store.auction_locks.lock().await;
        if let Some(lock) = guard.get(auction_id) {
            // Drop the entry only when no other task still holds a reference.
            if Arc::strong_count(lock) == 1 {
                guard.remove(auction_id);
            }
        }
    }
}
