use {
    super::Service,
    crate::api::RestError,
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
};

pub struct UnwatchInput {
    pub auction_id: AuctionId,
    pub user_id:    UserId,
}

impl Service {
    /// Removes the user from the auction's watcher set and returns the new count.
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn unwatch(&self, input: UnwatchInput) -> Result<i64, RestError> {
        self.repo
            .get_auction(input.auction_id)
            .await?
            .ok_or(RestError::AuctionNotFound)?;
        self.repo
            .remove_watcher(input.auction_id, input.user_id)
            .await
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
        time::OffsetDateTime,
    };

    #[tokio::test]
    async fn unwatching_without_watching_is_rejected() {
        let auction = auction_fixture(OffsetDateTime::now_utc());
        let auction_id = auction.id;

        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(auction.clone())));
        db.expect_remove_watcher().returning(|_, _| Ok(None));

        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(
            service
                .unwatch(UnwatchInput {
                    auction_id,
                    user_id: "watcher".to_string(),
                })
                .await
                .unwrap_err(),
            RestError::NotWatching
        );
    }
}
