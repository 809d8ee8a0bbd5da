use {
    super::Repository,
    crate::{
        api::RestError,
        auction::entities,
    },
    gavel_api_types::auction::AuctionId,
};

impl Repository {
    pub async fn get_recent_bids(
        &self,
        auction_id: AuctionId,
        limit: i64,
    ) -> Result<Vec<entities::Bid>, RestError> {
        self.db.get_recent_bids(auction_id, limit).await
    }
}
