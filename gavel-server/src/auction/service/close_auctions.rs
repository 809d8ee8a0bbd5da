use {
    super::Service,
    crate::{
        api::ws::UpdateEvent,
        auction::entities,
    },
    gavel_api_types::{
        auction::{
            AuctionEnded,
            EndedOutcome,
        },
        ws::ServerUpdateResponse,
    },
    time::OffsetDateTime,
};

impl Service {
    /// Closes every active auction whose end time has passed.
    pub async fn close_auctions(&self) {
        let auctions = match self.repo.list_closable(OffsetDateTime::now_utc()).await {
            Ok(auctions) => auctions,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to list auctions due to close");
                return;
            }
        };
        for auction in auctions {
            self.task_tracker.spawn({
                let service = self.clone();
                let auction_id = auction.id;
                async move {
                    if let Err(err) = service.close_auction(auction).await {
                        tracing::error!(error = ?err, auction_id = %auction_id, "Failed to close auction");
                    }
                }
            });
        }
    }

    /// The status transition is the only gate. Every side effect below runs
    /// at most once because only one closer wins the conditional update.
    #[tracing::instrument(skip_all, fields(auction_id = %auction.id))]
    async fn close_auction(&self, auction: entities::Auction) -> anyhow::Result<()> {
        let is_updated = self
            .repo
            .advance_auction_status(
                auction.id,
                entities::AuctionStatus::Active,
                entities::AuctionStatus::Ended,
            )
            .await?;
        if !is_updated {
            return Ok(());
        }

        let reserve_met = auction.reserve_met();
        let outcome = match (&auction.highest_bidder_id, reserve_met) {
            (None, _) => EndedOutcome::NoBids,
            (Some(_), true) => EndedOutcome::Sold,
            (Some(_), false) => EndedOutcome::ReserveNotMet,
        };
        tracing::info!(
            car_label = auction.car_label.as_str(),
            outcome = ?outcome,
            final_price = auction.current_bid,
            "Auction ended"
        );

        if outcome == EndedOutcome::Sold {
            match self.repo.mark_winning_bid(auction.id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(auction_id = %auction.id, "Sold auction has no bid row to mark winning")
                }
                Err(err) => {
                    tracing::error!(error = ?err, auction_id = %auction.id, "Failed to mark winning bid")
                }
            }
            if let Some(winner_id) = auction.highest_bidder_id.clone() {
                self.send_notification(entities::Notification::won_auction(winner_id, &auction))
                    .await;
            }
        }

        let (winner_id, winner_name) = if outcome == EndedOutcome::Sold {
            (
                auction.highest_bidder_id.clone(),
                auction.highest_bidder_name.clone(),
            )
        } else {
            (None, None)
        };
        self.publish(UpdateEvent::AuctionUpdate(
            ServerUpdateResponse::LifecycleEnded(AuctionEnded {
                auction_id: auction.id,
                outcome,
                winner_id,
                winner_name,
                final_price: auction.current_bid,
                reserve_met,
            }),
        ));
        self.notify_watchers(&auction, |user_id| {
            entities::Notification::auction_ended(user_id, &auction)
        })
        .await;
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
        gavel_api_types::auction::NotificationKind,
        std::time::Duration,
        uuid::Uuid,
    };

    fn closable_auction(now: OffsetDateTime) -> entities::Auction {
        let mut auction = auction_fixture(now);
        auction.end_time = now - Duration::from_secs(5);
        auction
    }

    fn winning_bid(auction: &entities::Auction) -> entities::Bid {
        entities::Bid {
            id:          Uuid::new_v4(),
            auction_id:  auction.id,
            bidder_id:   auction.highest_bidder_id.clone().unwrap(),
            bidder_name: auction.highest_bidder_name.clone().unwrap(),
            amount:      auction.current_bid,
            is_winning:  true,
            created_at:  auction.end_time - Duration::from_secs(60),
        }
    }

    async fn recv_lifecycle_ended(
        event_receiver: &mut tokio::sync::broadcast::Receiver<UpdateEvent>,
    ) -> AuctionEnded {
        loop {
            match event_receiver.recv().await.unwrap() {
                UpdateEvent::AuctionUpdate(ServerUpdateResponse::LifecycleEnded(ended)) => {
                    return ended
                }
                UpdateEvent::Notification(_) => continue,
                event => panic!("unexpected event: {:?}", event),
            }
        }
    }

    #[tokio::test]
    async fn sold_auction_marks_the_winner_and_congratulates_them() {
        let now = OffsetDateTime::now_utc();
        let mut auction = closable_auction(now);
        auction.current_bid = 6000;
        auction.bid_count = 4;
        auction.reserve_price = Some(5000);
        auction.highest_bidder_id = Some("winner".to_string());
        auction.highest_bidder_name = Some("Hamid".to_string());
        let auction_id = auction.id;

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_closable()
            .returning(move |_| Ok(vec![listed.clone()]));
        db.expect_advance_auction_status()
            .returning(|_, _, _| Ok(true));
        let marked = winning_bid(&auction);
        db.expect_mark_winning_bid()
            .times(1)
            .returning(move |_| Ok(Some(marked.clone())));
        db.expect_list_watchers().returning(|_| Ok(vec![]));
        db.expect_add_notification()
            .withf(|notification| notification.kind == NotificationKind::WonAuction)
            .times(1)
            .returning(|_| Ok(()));

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.close_auctions().await;
        service.wait_for_spawned_tasks().await;

        match event_receiver.recv().await.unwrap() {
            UpdateEvent::Notification(notification) => {
                assert_eq!(notification.user_id, "winner");
                assert_eq!(notification.kind, NotificationKind::WonAuction);
            }
            event => panic!("unexpected event: {:?}", event),
        }
        let ended = recv_lifecycle_ended(&mut event_receiver).await;
        assert_eq!(ended.auction_id, auction_id);
        assert_eq!(ended.outcome, EndedOutcome::Sold);
        assert_eq!(ended.winner_id, Some("winner".to_string()));
        assert_eq!(ended.final_price, 6000);
        assert!(ended.reserve_met);
    }

    #[tokio::test]
    async fn unmet_reserve_ends_without_a_winner() {
        let now = OffsetDateTime::now_utc();
        let mut auction = closable_auction(now);
        auction.current_bid = 4000;
        auction.reserve_price = Some(5000);
        auction.highest_bidder_id = Some("runner-up".to_string());
        auction.highest_bidder_name = Some("Ada".to_string());

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_closable()
            .returning(move |_| Ok(vec![listed.clone()]));
        db.expect_advance_auction_status()
            .returning(|_, _, _| Ok(true));
        // No winning bid is marked and no win notification goes out.
        db.expect_mark_winning_bid().times(0);
        db.expect_list_watchers().returning(|_| Ok(vec![]));

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.close_auctions().await;
        service.wait_for_spawned_tasks().await;

        let ended = recv_lifecycle_ended(&mut event_receiver).await;
        assert_eq!(ended.outcome, EndedOutcome::ReserveNotMet);
        assert_eq!(ended.winner_id, None);
        assert!(!ended.reserve_met);
    }

    #[tokio::test]
    async fn bidless_auction_ends_with_no_bids_outcome() {
        let now = OffsetDateTime::now_utc();
        let auction = closable_auction(now);

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_closable()
            .returning(move |_| Ok(vec![listed.clone()]));
        db.expect_advance_auction_status()
            .returning(|_, _, _| Ok(true));
        db.expect_mark_winning_bid().times(0);
        db.expect_list_watchers().returning(|_| Ok(vec![]));

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.close_auctions().await;
        service.wait_for_spawned_tasks().await;

        let ended = recv_lifecycle_ended(&mut event_receiver).await;
        assert_eq!(ended.outcome, EndedOutcome::NoBids);
        assert_eq!(ended.final_price, 1000);
    }

    #[tokio::test]
    async fn second_scan_of_a_closed_auction_has_no_effect() {
        let now = OffsetDateTime::now_utc();
        let auction = closable_auction(now);

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_closable()
            .returning(move |_| Ok(vec![listed.clone()]));
        // The conditional transition already happened elsewhere.
        db.expect_advance_auction_status()
            .returning(|_, _, _| Ok(false));
        db.expect_mark_winning_bid().times(0);
        db.expect_add_notification().times(0);

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.close_auctions().await;
        service.wait_for_spawned_tasks().await;

        assert!(event_receiver.try_recv().is_err());
    }
}
