use {
    super::Service,
    crate::api::RestError,
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
};

pub struct WatchInput {
    pub auction_id: AuctionId,
    pub user_id:    UserId,
}

impl Service {
    /// Adds the user to the auction's watcher set and returns the new count.
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn watch(&self, input: WatchInput) -> Result<i64, RestError> {
        // Watching an unknown auction is a not-found, not a silent insert.
        self.repo
            .get_auction(input.auction_id)
            .await?
            .ok_or(RestError::AuctionNotFound)?;
        self.repo.add_watcher(input.auction_id, input.user_id).await
    }

    pub async fn is_watching(
        &self,
        auction_id: AuctionId,
        user_id: &UserId,
    ) -> Result<bool, RestError> {
        self.repo
            .get_auction(auction_id)
            .await?
            .ok_or(RestError::AuctionNotFound)?;
        self.repo.is_watching(auction_id, user_id).await
    }
}
