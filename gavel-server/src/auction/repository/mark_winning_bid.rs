use {
    super::Repository,
    crate::auction::entities,
    gavel_api_types::auction::AuctionId,
};

impl Repository {
    pub async fn mark_winning_bid(
        &self,
        auction_id: AuctionId,
    ) -> anyhow::Result<Option<entities::Bid>> {
        self.db.mark_winning_bid(auction_id).await
    }
}
