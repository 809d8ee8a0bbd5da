use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
};

pub struct GetAuctionsInput {
    pub status: Option<entities::AuctionStatus>,
    pub limit:  Option<i64>,
    pub offset: Option<i64>,
}

impl Service {
    pub async fn get_auctions(
        &self,
        input: GetAuctionsInput,
    ) -> Result<(Vec<entities::Auction>, i64), RestError> {
        self.repo
            .get_auctions(input.status, input.limit, input.offset)
            .await
    }
}
