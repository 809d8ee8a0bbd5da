use {
    super::Repository,
    crate::auction::entities,
    gavel_api_types::auction::AuctionId,
};

impl Repository {
    /// Conditional transition guard. A false result means another tick (or an
    /// overlapping run of this one) already performed the transition.
    pub async fn advance_auction_status(
        &self,
        auction_id: AuctionId,
        from_status: entities::AuctionStatus,
        to_status: entities::AuctionStatus,
    ) -> anyhow::Result<bool> {
        self.db
            .advance_auction_status(auction_id, from_status, to_status)
            .await
    }
}
