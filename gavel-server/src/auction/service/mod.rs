use {
    super::repository::{
        Database,
        Repository,
    },
    crate::{
        api::ws::UpdateEvent,
        config::{
            BiddingConfig,
            LifecycleConfig,
        },
    },
    std::sync::Arc,
    tokio::sync::broadcast,
    tokio_util::task::TaskTracker,
};

pub mod add_auction;
pub mod alert_ending_soon;
pub mod close_auctions;
pub mod get_auction;
pub mod get_auctions;
pub mod get_time_remaining;
pub mod place_bid;
pub mod send_notification;
pub mod start_auctions;
pub mod unwatch;
pub mod watch;
pub mod workers;

pub struct ServiceInner {
    repo:         Arc<Repository>,
    bidding:      BiddingConfig,
    lifecycle:    LifecycleConfig,
    task_tracker: TaskTracker,
    event_sender: broadcast::Sender<UpdateEvent>,
}

#[derive(Clone)]
pub struct Service(Arc<ServiceInner>);
impl std::ops::Deref for Service {
    type Target = ServiceInner;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Service {
    pub fn new(
        db: impl Database,
        bidding: BiddingConfig,
        lifecycle: LifecycleConfig,
        event_sender: broadcast::Sender<UpdateEvent>,
    ) -> Self {
        Self(Arc::new(ServiceInner {
            repo: Arc::new(Repository::new(db)),
            bidding,
            lifecycle,
            task_tracker: TaskTracker::new(),
            event_sender,
        }))
    }

    /// Fire-and-forget publish into the realtime hub. Never blocks the caller
    /// on subscriber delivery.
    pub(super) fn publish(&self, event: UpdateEvent) {
        if let Err(e) = self.event_sender.send(event) {
            tracing::error!(error = e.to_string(), "Failed to send update event");
        }
    }
}

#[cfg(test)]
pub mod tests {
    use {
        super::*,
        crate::auction::repository::MockDatabase,
        tokio::sync::broadcast::Receiver,
    };

    impl Service {
        pub fn new_with_mocks(db: MockDatabase) -> (Self, Receiver<UpdateEvent>) {
            let (event_sender, event_receiver) = broadcast::channel(100);
            let service = Service::new(
                db,
                BiddingConfig::default(),
                LifecycleConfig::default(),
                event_sender,
            );
            (service, event_receiver)
        }

        /// Waits for every task spawned by a scheduler scan to finish.
        pub async fn wait_for_spawned_tasks(&self) {
            self.task_tracker.close();
            self.task_tracker.wait().await;
        }
    }
}
