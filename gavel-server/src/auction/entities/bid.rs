use {
    gavel_api_types::{
        auction as api_types,
        auction::{
            AuctionId,
            BidId,
        },
        Amount,
        UserId,
    },
    time::OffsetDateTime,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Bid {
    pub id:          BidId,
    pub auction_id:  AuctionId,
    pub bidder_id:   UserId,
    pub bidder_name: String,
    pub amount:      Amount,
    pub is_winning:  bool,
    pub created_at:  OffsetDateTime,
}

impl From<Bid> for api_types::Bid {
    fn from(bid: Bid) -> Self {
        Self {
            id:          bid.id,
            auction_id:  bid.auction_id,
            bidder_id:   bid.bidder_id,
            bidder_name: bid.bidder_name,
            amount:      bid.amount,
            is_winning:  bid.is_winning,
            created_at:  bid.created_at,
        }
    }
}
