use {
    super::{
        AppendBid,
        Repository,
    },
    crate::{
        api::RestError,
        auction::entities,
    },
    gavel_api_types::auction::AuctionId,
};

impl Repository {
    /// Commits one bid keyed to the current bid value the caller observed.
    /// None means the compare-and-swap missed and nothing was written.
    pub async fn append_bid(
        &self,
        auction_id: AuctionId,
        append: AppendBid,
    ) -> Result<Option<entities::Bid>, RestError> {
        self.db.append_bid(auction_id, append).await
    }
}
