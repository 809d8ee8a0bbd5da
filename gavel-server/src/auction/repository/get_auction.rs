use {
    super::Repository,
    crate::{
        api::RestError,
        auction::entities,
    },
    gavel_api_types::auction::AuctionId,
};

impl Repository {
    pub async fn get_auction(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<entities::Auction>, RestError> {
        self.db.get_auction(auction_id).await
    }
}
