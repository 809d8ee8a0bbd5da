use {
    super::Service,
    crate::{
        api::{
            ws::UpdateEvent,
            RestError,
        },
        auction::{
            entities,
            repository::AppendBid,
        },
    },
    gavel_api_types::{
        auction::AuctionId,
        ws::ServerUpdateResponse,
        Amount,
        UserId,
    },
    time::OffsetDateTime,
    uuid::Uuid,
};

pub struct PlaceBidInput {
    pub auction_id:     AuctionId,
    pub bidder_id:      UserId,
    pub bidder_name:    String,
    pub bidder_balance: Amount,
    pub amount:         Amount,
}

impl Service {
    /// Places a bid on an auction. Bids for one auction are serialized through
    /// a per-auction lock; the commit itself is keyed to the current bid we
    /// read, so a writer outside this process cannot slip in between.
    #[tracing::instrument(skip_all, fields(auction_id = %input.auction_id))]
    pub async fn place_bid(&self, input: PlaceBidInput) -> Result<entities::Bid, RestError> {
        let auction_lock = self.repo.get_or_create_auction_lock(input.auction_id).await;
        let result = {
            let _guard = auction_lock.lock().await;
            self.place_bid_with_lock_held(&input).await
        };
        self.repo.remove_auction_lock(&input.auction_id).await;
        result
    }

    async fn place_bid_with_lock_held(
        &self,
        input: &PlaceBidInput,
    ) -> Result<entities::Bid, RestError> {
        let auction = self
            .repo
            .get_auction(input.auction_id)
            .await?
            .ok_or(RestError::AuctionNotFound)?;
        self.verify_bid(&auction, input, OffsetDateTime::now_utc())?;

        let append = AppendBid {
            bid_id:               Uuid::new_v4(),
            bidder_id:            input.bidder_id.clone(),
            bidder_name:          input.bidder_name.clone(),
            amount:               input.amount,
            expected_current_bid: auction.current_bid,
        };
        match self.repo.append_bid(input.auction_id, append).await? {
            Some(bid) => {
                self.publish(UpdateEvent::AuctionUpdate(
                    ServerUpdateResponse::BidAccepted {
                        auction_id:  auction.id,
                        bid:         bid.clone().into(),
                        current_bid: bid.amount,
                        bid_count:   auction.bid_count + 1,
                    },
                ));
                Ok(bid)
            }
            None => {
                // The commit guard failed: the current bid moved underneath us
                // or the auction closed. Re-read and re-verify so the error
                // names what actually changed; if the bid is merely outpriced,
                // carry the minimum that would be accepted right now.
                let auction = self
                    .repo
                    .get_auction(input.auction_id)
                    .await?
                    .ok_or(RestError::AuctionNotFound)?;
                self.verify_bid(&auction, input, OffsetDateTime::now_utc())?;
                Err(RestError::BidTooLow {
                    minimum: auction.minimum_next_bid(self.bidding.minimum_increment),
                })
            }
        }
    }

    fn verify_bid(
        &self,
        auction: &entities::Auction,
        input: &PlaceBidInput,
        now: OffsetDateTime,
    ) -> Result<(), RestError> {
        if auction.status != entities::AuctionStatus::Active {
            return Err(RestError::AuctionNotActive);
        }
        // The scheduler tick may lag behind the wall clock.
        if now >= auction.end_time {
            return Err(RestError::AuctionExpired);
        }
        if input.bidder_id == auction.seller_id {
            return Err(RestError::SelfBid);
        }
        let minimum = auction.minimum_next_bid(self.bidding.minimum_increment);
        if input.amount < minimum {
            return Err(RestError::BidTooLow { minimum });
        }
        if input.bidder_balance < input.amount {
            return Err(RestError::InsufficientFunds);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auction::{
            entities::auction::tests::auction_fixture,
            repository::MockDatabase,
        },
        std::{
            sync::{
                Arc,
                Mutex,
            },
            time::Duration,
        },
    };

    fn bid_input(auction_id: AuctionId, amount: Amount) -> PlaceBidInput {
        PlaceBidInput {
            auction_id,
            bidder_id: "bidder".to_string(),
            bidder_name: "Ada".to_string(),
            bidder_balance: 1_000_000,
            amount,
        }
    }

    fn bid_fixture(append: &AppendBid, auction_id: AuctionId) -> entities::Bid {
        entities::Bid {
            id:          append.bid_id,
            auction_id,
            bidder_id:   append.bidder_id.clone(),
            bidder_name: append.bidder_name.clone(),
            amount:      append.amount,
            is_winning:  false,
            created_at:  OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn accepted_bid_is_committed_and_broadcast() {
        let now = OffsetDateTime::now_utc();
        let auction = auction_fixture(now);
        let auction_id = auction.id;

        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(auction.clone())));
        db.expect_append_bid()
            .withf(|_, append| append.expected_current_bid == 1000 && append.amount == 1150)
            .returning(|auction_id, append| Ok(Some(bid_fixture(&append, auction_id))));

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        let bid = service
            .place_bid(bid_input(auction_id, 1150))
            .await
            .unwrap();
        assert_eq!(bid.amount, 1150);

        match event_receiver.recv().await.unwrap() {
            UpdateEvent::AuctionUpdate(ServerUpdateResponse::BidAccepted {
                auction_id: id,
                current_bid,
                bid_count,
                ..
            }) => {
                assert_eq!(id, auction_id);
                assert_eq!(current_bid, 1150);
                assert_eq!(bid_count, 1);
            }
            event => panic!("unexpected event: {:?}", event),
        }
    }

    #[tokio::test]
    async fn rejects_in_precondition_order() {
        let now = OffsetDateTime::now_utc();
        let auction_id = Uuid::new_v4();

        let mut db = MockDatabase::default();
        db.expect_get_auction().returning(|_| Ok(None));
        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(
            service
                .place_bid(bid_input(auction_id, 1150))
                .await
                .unwrap_err(),
            RestError::AuctionNotFound
        );

        let mut upcoming = auction_fixture(now);
        upcoming.status = entities::AuctionStatus::Upcoming;
        let auction_id = upcoming.id;
        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(upcoming.clone())));
        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(
            service
                .place_bid(bid_input(auction_id, 1150))
                .await
                .unwrap_err(),
            RestError::AuctionNotActive
        );

        let mut overdue = auction_fixture(now);
        overdue.end_time = now - Duration::from_secs(1);
        let auction_id = overdue.id;
        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(overdue.clone())));
        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(
            service
                .place_bid(bid_input(auction_id, 1150))
                .await
                .unwrap_err(),
            RestError::AuctionExpired
        );

        let seller_owned = auction_fixture(now);
        let auction_id = seller_owned.id;
        let seller_id = seller_owned.seller_id.clone();
        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(seller_owned.clone())));
        let (service, _events) = Service::new_with_mocks(db);
        let mut input = bid_input(auction_id, 1150);
        input.bidder_id = seller_id;
        assert_eq!(
            service.place_bid(input).await.unwrap_err(),
            RestError::SelfBid
        );

        let auction = auction_fixture(now);
        let auction_id = auction.id;
        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(auction.clone())));
        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(
            service
                .place_bid(bid_input(auction_id, 1099))
                .await
                .unwrap_err(),
            RestError::BidTooLow { minimum: 1100 }
        );

        let auction = auction_fixture(now);
        let auction_id = auction.id;
        let mut db = MockDatabase::default();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(auction.clone())));
        let (service, _events) = Service::new_with_mocks(db);
        let mut input = bid_input(auction_id, 1150);
        input.bidder_balance = 1149;
        assert_eq!(
            service.place_bid(input).await.unwrap_err(),
            RestError::InsufficientFunds
        );
    }

    #[tokio::test]
    async fn losing_a_commit_race_reports_the_fresh_minimum() {
        let now = OffsetDateTime::now_utc();
        let stale = auction_fixture(now);
        let auction_id = stale.id;
        let mut fresh = stale.clone();
        fresh.current_bid = 1150;
        fresh.bid_count = 1;

        // First read sees 1000, the commit misses because another writer
        // raised the bid to 1150, and the re-read prices the error at 1250.
        let mut db = MockDatabase::default();
        let mut reads = vec![fresh, stale];
        db.expect_get_auction()
            .times(2)
            .returning(move |_| Ok(Some(reads.pop().unwrap())));
        db.expect_append_bid().times(1).returning(|_, _| Ok(None));

        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(
            service
                .place_bid(bid_input(auction_id, 1150))
                .await
                .unwrap_err(),
            RestError::BidTooLow { minimum: 1250 }
        );
    }

    #[tokio::test]
    async fn commit_miss_on_a_closed_auction_reports_the_closure() {
        let now = OffsetDateTime::now_utc();
        let open = auction_fixture(now);
        let auction_id = open.id;
        let mut closed = open.clone();
        closed.status = entities::AuctionStatus::Ended;

        // The auction closes between the read and the commit. The status guard
        // fails the commit, and the re-verify must not price the rejection.
        let mut db = MockDatabase::default();
        let mut reads = vec![closed, open];
        db.expect_get_auction()
            .times(2)
            .returning(move |_| Ok(Some(reads.pop().unwrap())));
        db.expect_append_bid().times(1).returning(|_, _| Ok(None));

        let (service, _events) = Service::new_with_mocks(db);
        assert_eq!(
            service
                .place_bid(bid_input(auction_id, 1150))
                .await
                .unwrap_err(),
            RestError::AuctionNotActive
        );
    }

    #[tokio::test]
    async fn exactly_one_of_two_simultaneous_equal_bids_wins() {
        let now = OffsetDateTime::now_utc();
        let auction = auction_fixture(now);
        let auction_id = auction.id;

        // A shared auction row that advances when a commit lands, so whichever
        // bid serializes second sees the winner's amount.
        let row = Arc::new(Mutex::new(auction));
        let mut db = MockDatabase::default();
        let reads = row.clone();
        db.expect_get_auction()
            .returning(move |_| Ok(Some(reads.lock().unwrap().clone())));
        let commits = row.clone();
        db.expect_append_bid()
            .times(1)
            .returning(move |auction_id, append| {
                let mut auction = commits.lock().unwrap();
                assert_eq!(append.expected_current_bid, auction.current_bid);
                auction.current_bid = append.amount;
                auction.bid_count += 1;
                Ok(Some(bid_fixture(&append, auction_id)))
            });

        let (service, _events) = Service::new_with_mocks(db);
        let first = tokio::spawn({
            let service = service.clone();
            async move { service.place_bid(bid_input(auction_id, 1150)).await }
        });
        let second = tokio::spawn({
            let service = service.clone();
            async move { service.place_bid(bid_input(auction_id, 1150)).await }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        let accepted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].amount, 1150);
        let rejected: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(rejected, [&RestError::BidTooLow { minimum: 1250 }]);
    }
}
