use {
    super::Service,
    crate::{
        api::ws::UpdateEvent,
        auction::entities,
    },
    gavel_api_types::ws::ServerUpdateResponse,
    time::OffsetDateTime,
};

impl Service {
    /// Opens every upcoming auction whose start time has passed.
    pub async fn start_auctions(&self) {
        let auctions = match self.repo.list_activatable(OffsetDateTime::now_utc()).await {
            Ok(auctions) => auctions,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to list auctions due to start");
                return;
            }
        };
        for auction in auctions {
            self.task_tracker.spawn({
                let service = self.clone();
                let auction_id = auction.id;
                async move {
                    if let Err(err) = service.start_auction(auction).await {
                        tracing::error!(error = ?err, auction_id = %auction_id, "Failed to start auction");
                    }
                }
            });
        }
    }

    #[tracing::instrument(skip_all, fields(auction_id = %auction.id))]
    async fn start_auction(&self, auction: entities::Auction) -> anyhow::Result<()> {
        let is_updated = self
            .repo
            .advance_auction_status(
                auction.id,
                entities::AuctionStatus::Upcoming,
                entities::AuctionStatus::Active,
            )
            .await?;
        if !is_updated {
            // Another tick already opened it.
            return Ok(());
        }
        tracing::info!(car_label = auction.car_label.as_str(), "Auction started");
        self.publish(UpdateEvent::AuctionUpdate(
            ServerUpdateResponse::LifecycleStarted {
                auction_id: auction.id,
                end_time:   auction.end_time,
            },
        ));
        self.notify_watchers(&auction, |user_id| {
            entities::Notification::auction_started(user_id, &auction)
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
    };

    #[tokio::test]
    async fn due_auction_opens_and_watchers_are_told() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        auction.status = entities::AuctionStatus::Upcoming;
        auction.start_time = now - Duration::from_secs(5);
        auction.watchers_count = 1;
        let auction_id = auction.id;
        let end_time = auction.end_time;

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_activatable()
            .returning(move |_| Ok(vec![listed.clone()]));
        db.expect_advance_auction_status()
            .withf(move |id, from, to| {
                *id == auction_id
                    && *from == entities::AuctionStatus::Upcoming
                    && *to == entities::AuctionStatus::Active
            })
            .returning(|_, _, _| Ok(true));
        db.expect_list_watchers()
            .returning(|_| Ok(vec!["watcher".to_string()]));
        db.expect_add_notification().returning(|_| Ok(()));

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.start_auctions().await;
        service.wait_for_spawned_tasks().await;

        match event_receiver.recv().await.unwrap() {
            UpdateEvent::AuctionUpdate(ServerUpdateResponse::LifecycleStarted {
                auction_id: id,
                end_time: reported_end,
            }) => {
                assert_eq!(id, auction_id);
                assert_eq!(reported_end, end_time);
            }
            event => panic!("unexpected event: {:?}", event),
        }
        match event_receiver.recv().await.unwrap() {
            UpdateEvent::Notification(notification) => {
                assert_eq!(notification.user_id, "watcher");
                assert_eq!(notification.kind, NotificationKind::AuctionStarted);
            }
            event => panic!("unexpected event: {:?}", event),
        }
    }

    #[tokio::test]
    async fn already_opened_auction_stays_silent() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        auction.status = entities::AuctionStatus::Upcoming;

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_activatable()
            .returning(move |_| Ok(vec![listed.clone()]));
        db.expect_advance_auction_status()
            .returning(|_, _, _| Ok(false));

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.start_auctions().await;
        service.wait_for_spawned_tasks().await;

        assert!(event_receiver.try_recv().is_err());
    }
}
