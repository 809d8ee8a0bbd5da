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
    /// Alerts on every active auction that closes within the configured window.
    pub async fn alert_ending_soon(&self) {
        let auctions = match self
            .repo
            .list_ending_soon(OffsetDateTime::now_utc(), self.lifecycle.ending_soon_window)
            .await
        {
            Ok(auctions) => auctions,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to list auctions ending soon");
                return;
            }
        };
        for auction in auctions {
            self.task_tracker.spawn({
                let service = self.clone();
                let auction_id = auction.id;
                async move {
                    if let Err(err) = service.send_ending_alert(auction).await {
                        tracing::error!(error = ?err, auction_id = %auction_id, "Failed to send ending soon alert");
                    }
                }
            });
        }
    }

    #[tracing::instrument(skip_all, fields(auction_id = %auction.id))]
    async fn send_ending_alert(&self, auction: entities::Auction) -> anyhow::Result<()> {
        let claimed = self
            .repo
            .claim_ending_alert(
                auction.id,
                OffsetDateTime::now_utc(),
                self.lifecycle.ending_alert_cooldown,
            )
            .await?;
        if !claimed {
            // An alert within the cooldown already covered this auction.
            return Ok(());
        }
        self.publish(UpdateEvent::AuctionUpdate(
            ServerUpdateResponse::EndingSoon {
                auction_id: auction.id,
                end_time:   auction.end_time,
            },
        ));
        self.notify_watchers(&auction, |user_id| {
            entities::Notification::auction_ending(user_id, &auction)
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
        gavel_api_types::auction::{
            NotificationKind,
            NotificationPriority,
        },
        std::time::Duration,
    };

    #[tokio::test]
    async fn claimed_alert_reaches_the_channel_and_the_watchers() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        auction.end_time = now + Duration::from_secs(120);
        auction.watchers_count = 1;
        let auction_id = auction.id;

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_ending_soon()
            .returning(move |_, _| Ok(vec![listed.clone()]));
        db.expect_claim_ending_alert()
            .times(1)
            .returning(|_, _, _| Ok(true));
        db.expect_list_watchers()
            .returning(|_| Ok(vec!["watcher".to_string()]));
        db.expect_add_notification().returning(|_| Ok(()));

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.alert_ending_soon().await;
        service.wait_for_spawned_tasks().await;

        match event_receiver.recv().await.unwrap() {
            UpdateEvent::AuctionUpdate(ServerUpdateResponse::EndingSoon {
                auction_id: id, ..
            }) => assert_eq!(id, auction_id),
            event => panic!("unexpected event: {:?}", event),
        }
        match event_receiver.recv().await.unwrap() {
            UpdateEvent::Notification(notification) => {
                assert_eq!(notification.kind, NotificationKind::AuctionEnding);
                assert_eq!(notification.priority, NotificationPriority::High);
            }
            event => panic!("unexpected event: {:?}", event),
        }
    }

    #[tokio::test]
    async fn cooldown_suppresses_repeat_alerts() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        auction.end_time = now + Duration::from_secs(120);
        auction.ending_alert_at = Some(now - Duration::from_secs(60));

        let mut db = MockDatabase::default();
        let listed = auction.clone();
        db.expect_list_ending_soon()
            .returning(move |_, _| Ok(vec![listed.clone()]));
        db.expect_claim_ending_alert().returning(|_, _, _| Ok(false));
        db.expect_add_notification().times(0);

        let (service, mut event_receiver) = Service::new_with_mocks(db);
        service.alert_ending_soon().await;
        service.wait_for_spawned_tasks().await;

        assert!(event_receiver.try_recv().is_err());
    }
}
