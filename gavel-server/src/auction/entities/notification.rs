use {
    super::Auction,
    gavel_api_types::{
        auction as api_types,
        auction::{
            AuctionId,
            NotificationId,
            NotificationKind,
            NotificationPriority,
        },
        UserId,
    },
    time::OffsetDateTime,
    uuid::Uuid,
};

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub id:         NotificationId,
    pub user_id:    UserId,
    pub kind:       NotificationKind,
    pub title:      String,
    pub message:    String,
    pub auction_id: Option<AuctionId>,
    pub priority:   NotificationPriority,
    pub created_at: OffsetDateTime,
}

impl Notification {
    fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: String,
        message: String,
        auction_id: AuctionId,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title,
            message,
            auction_id: Some(auction_id),
            priority,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn auction_started(user_id: UserId, auction: &Auction) -> Self {
        Self::new(
            user_id,
            NotificationKind::AuctionStarted,
            "Auction Started".to_string(),
            format!("Bidding is now open on {}", auction.car_label),
            auction.id,
            NotificationPriority::Medium,
        )
    }

    pub fn auction_ending(user_id: UserId, auction: &Auction) -> Self {
        Self::new(
            user_id,
            NotificationKind::AuctionEnding,
            "Auction Ending Soon".to_string(),
            format!("The auction for {} is about to close", auction.car_label),
            auction.id,
            NotificationPriority::High,
        )
    }

    pub fn auction_ended(user_id: UserId, auction: &Auction) -> Self {
        Self::new(
            user_id,
            NotificationKind::AuctionEnded,
            "Auction Ended".to_string(),
            format!("The auction for {} has ended", auction.car_label),
            auction.id,
            NotificationPriority::Medium,
        )
    }

    pub fn won_auction(user_id: UserId, auction: &Auction) -> Self {
        Self::new(
            user_id,
            NotificationKind::WonAuction,
            "You Won the Auction!".to_string(),
            format!(
                "You won {} with a bid of {}",
                auction.car_label, auction.current_bid
            ),
            auction.id,
            NotificationPriority::High,
        )
    }
}

impl From<Notification> for api_types::Notification {
    fn from(notification: Notification) -> Self {
        Self {
            id:         notification.id,
            user_id:    notification.user_id,
            kind:       notification.kind,
            title:      notification.title,
            message:    notification.message,
            auction_id: notification.auction_id,
            priority:   notification.priority,
            created_at: notification.created_at,
        }
    }
}
