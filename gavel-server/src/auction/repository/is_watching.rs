use {
    super::Repository,
    crate::api::RestError,
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
};

impl Repository {
    pub async fn is_watching(
        &self,
        auction_id: AuctionId,
        user_id: &UserId,
    ) -> Result<bool, RestError> {
        // A positive cache hit is always right, the cache is write-through.
        // A miss is not: the entry may hold only the users added since this
        // process last loaded the full set, so it has to hit the store.
        if let Some(watchers) = self.in_memory_store.watchers.read().await.get(&auction_id) {
            if watchers.contains(user_id) {
                return Ok(true);
            }
        }
        let watching = self.db.is_watching(auction_id, user_id.clone()).await?;
        if watching {
            self.in_memory_store
                .watchers
                .write()
                .await
                .entry(auction_id)
                .or_default()
                .insert(user_id.clone());
        }
        Ok(watching)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auction::repository::MockDatabase,
        uuid::Uuid,
    };

    #[tokio::test]
    async fn partially_seeded_cache_still_finds_a_durable_watcher() {
        let auction_id = Uuid::new_v4();

        // "alice" watched durably before this process started; the cache entry
        // is created by "bob" watching and must not shadow her.
        let mut db = MockDatabase::default();
        db.expect_add_watcher()
            .withf(|_, user_id| user_id == "bob")
            .returning(|_, _| Ok(Some(2)));
        db.expect_is_watching()
            .withf(|_, user_id| user_id == "alice")
            .times(1)
            .returning(|_, _| Ok(true));

        let repo = Repository::new(db);
        repo.add_watcher(auction_id, "bob".to_string()).await.unwrap();
        assert!(repo.is_watching(auction_id, &"alice".to_string()).await.unwrap());
        // The positive answer is now cached and served without the store.
        assert!(repo.is_watching(auction_id, &"alice".to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn cached_watcher_is_answered_without_the_store() {
        let auction_id = Uuid::new_v4();

        let mut db = MockDatabase::default();
        db.expect_add_watcher().returning(|_, _| Ok(Some(1)));

        let repo = Repository::new(db);
        repo.add_watcher(auction_id, "bob".to_string()).await.unwrap();
        assert!(repo.is_watching(auction_id, &"bob".to_string()).await.unwrap());
    }
}
