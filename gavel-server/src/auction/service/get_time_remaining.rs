use {
    super::Service,
    crate::api::RestError,
    gavel_api_types::auction::AuctionId,
    std::time::Duration,
    time::OffsetDateTime,
};

impl Service {
    /// Server-authoritative countdown. None once the auction is over.
    pub async fn get_time_remaining(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<Duration>, RestError> {
        let auction = self
            .repo
            .get_auction(auction_id)
            .await?
            .ok_or(RestError::AuctionNotFound)?;
        Ok(auction.time_remaining(OffsetDateTime::now_utc()))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auction::{
            entities::auction::tests::auction_fixture,
            repository::MockDatabase,
        },
    };

    #[tokio::test]
    async fn remaining_time_is_null_once_over() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        auction.end_time = now - Duration::from_secs(30);
        let auction_id = auction.id;

        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(auction.clone())));

        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(service.get_time_remaining(auction_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remaining_time_counts_down_to_the_end_time() {
        let now = OffsetDateTime::now_utc();
        let auction = auction_fixture(now);
        let auction_id = auction.id;

        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(auction.clone())));

        let (service, _events) = Service::new_with_mocks(db);
        let remaining = service
            .get_time_remaining(auction_id)
            .await
            .unwrap()
            .unwrap();
        assert!(remaining <= Duration::from_secs(3600));
        assert!(remaining > Duration::from_secs(3590));
    }
}
