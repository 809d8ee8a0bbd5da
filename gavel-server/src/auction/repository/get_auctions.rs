use {
    super::{
        Repository,
        AUCTION_PAGE_SIZE_CAP,
    },
    crate::{
        api::RestError,
        auction::entities,
    },
};

impl Repository {
    pub async fn get_auctions(
        &self,
        status: Option<entities::AuctionStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<(Vec<entities::Auction>, i64), RestError> {
        let limit = limit
            .unwrap_or(AUCTION_PAGE_SIZE_CAP)
            .clamp(1, AUCTION_PAGE_SIZE_CAP);
        let offset = offset.unwrap_or(0).max(0);
        self.db.get_auctions(status, limit, offset).await
    }
}
