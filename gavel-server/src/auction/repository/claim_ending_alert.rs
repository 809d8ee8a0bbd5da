use {
    super::Repository,
    gavel_api_types::auction::AuctionId,
    std::time::Duration,
    time::OffsetDateTime,
};

impl Repository {
    pub async fn claim_ending_alert(
        &self,
        auction_id: AuctionId,
        now: OffsetDateTime,
        cooldown: Duration,
    ) -> anyhow::Result<bool> {
        self.db.claim_ending_alert(auction_id, now, cooldown).await
    }
}
