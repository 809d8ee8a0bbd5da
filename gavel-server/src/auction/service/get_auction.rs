use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
    gavel_api_types::{
        auction::AuctionId,
        UserId,
    },
};

pub struct GetAuctionInput {
    pub auction_id: AuctionId,
    pub viewer:     Option<UserId>,
}

pub struct AuctionView {
    pub auction:     entities::Auction,
    pub recent_bids: Vec<entities::Bid>,
    pub is_watched:  bool,
}

impl Service {
    pub async fn get_auction(&self, input: GetAuctionInput) -> Result<AuctionView, RestError> {
        let auction = self
            .repo
            .get_auction(input.auction_id)
            .await?
            .ok_or(RestError::AuctionNotFound)?;
        let recent_bids = self
            .repo
            .get_recent_bids(input.auction_id, self.bidding.recent_bids_limit)
            .await?;
        let is_watched = match &input.viewer {
            Some(viewer) => self.repo.is_watching(input.auction_id, viewer).await?,
            None => false,
        };
        Ok(AuctionView {
            auction,
            recent_bids,
            is_watched,
        })
    }
}
