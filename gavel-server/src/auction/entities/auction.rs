use {
    gavel_api_types::{
        auction as api_types,
        auction::{
            AuctionId,
            CarId,
        },
        Amount,
        UserId,
    },
    std::{
        sync::Arc,
        time::Duration,
    },
    time::OffsetDateTime,
    tokio::sync::Mutex,
};

/// Serializes concurrent bid commits for one auction within this process.
pub type AuctionLock = Arc<Mutex<()>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuctionStatus {
    Upcoming,
    Active,
    Ended,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Auction {
    pub id:                  AuctionId,
    pub car_id:              CarId,
    pub car_label:           String,
    pub seller_id:           UserId,
    pub seller_name:         String,
    pub start_price:         Amount,
    pub reserve_price:       Option<Amount>,
    pub current_bid:         Amount,
    pub highest_bidder_id:   Option<UserId>,
    pub highest_bidder_name: Option<String>,
    pub bid_count:           i64,
    pub watchers_count:      i64,
    pub status:              AuctionStatus,
    pub start_time:          OffsetDateTime,
    pub end_time:            OffsetDateTime,
    pub created_at:          OffsetDateTime,
    /// When the last ending soon alert was claimed for this auction.
    pub ending_alert_at:     Option<OffsetDateTime>,
}

impl Auction {
    /// The lowest amount the auction accepts as the next bid.
    pub fn minimum_next_bid(&self, minimum_increment: Amount) -> Amount {
        self.current_bid + minimum_increment
    }

    /// Whether the seller's reserve condition is satisfied by the current bid.
    pub fn reserve_met(&self) -> bool {
        self.reserve_price
            .map_or(true, |reserve| self.current_bid >= reserve)
    }

    /// The reserve price is only disclosed to the seller while the auction runs,
    /// and to everyone once it has ended.
    pub fn reserve_visible_to(&self, viewer: Option<&UserId>) -> bool {
        self.status == AuctionStatus::Ended || viewer == Some(&self.seller_id)
    }

    /// Time left until the auction closes. None once the end time has passed.
    pub fn time_remaining(&self, now: OffsetDateTime) -> Option<Duration> {
        if self.status == AuctionStatus::Ended || self.end_time <= now {
            return None;
        }
        (self.end_time - now).try_into().ok()
    }

    /// The wire representation for one viewer, with the reserve price stripped
    /// when the visibility rule says so.
    pub fn into_api(self, viewer: Option<&UserId>) -> api_types::Auction {
        let reserve_price = if self.reserve_visible_to(viewer) {
            self.reserve_price
        } else {
            None
        };
        api_types::Auction {
            id: self.id,
            car_id: self.car_id,
            car_label: self.car_label,
            seller_id: self.seller_id,
            seller_name: self.seller_name,
            start_price: self.start_price,
            current_bid: self.current_bid,
            reserve_price,
            highest_bidder_id: self.highest_bidder_id,
            highest_bidder_name: self.highest_bidder_name,
            bid_count: self.bid_count,
            watchers_count: self.watchers_count,
            status: self.status.into(),
            start_time: self.start_time,
            end_time: self.end_time,
            created_at: self.created_at,
        }
    }
}

impl From<AuctionStatus> for api_types::AuctionStatus {
    fn from(status: AuctionStatus) -> Self {
        match status {
            AuctionStatus::Upcoming => api_types::AuctionStatus::Upcoming,
            AuctionStatus::Active => api_types::AuctionStatus::Active,
            AuctionStatus::Ended => api_types::AuctionStatus::Ended,
        }
    }
}

impl From<api_types::AuctionStatus> for AuctionStatus {
    fn from(status: api_types::AuctionStatus) -> Self {
        match status {
            api_types::AuctionStatus::Upcoming => AuctionStatus::Upcoming,
            api_types::AuctionStatus::Active => AuctionStatus::Active,
            api_types::AuctionStatus::Ended => AuctionStatus::Ended,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use {
        super::*,
        uuid::Uuid,
    };

    pub fn auction_fixture(now: OffsetDateTime) -> Auction {
        Auction {
            id:                  Uuid::new_v4(),
            car_id:              Uuid::new_v4(),
            car_label:           "Toyota Corolla 2020".to_string(),
            seller_id:           "seller".to_string(),
            seller_name:         "Grace".to_string(),
            start_price:         1000,
            reserve_price:       None,
            current_bid:         1000,
            highest_bidder_id:   None,
            highest_bidder_name: None,
            bid_count:           0,
            watchers_count:      0,
            status:              AuctionStatus::Active,
            start_time:          now - Duration::from_secs(3600),
            end_time:            now + Duration::from_secs(3600),
            created_at:          now - Duration::from_secs(7200),
            ending_alert_at:     None,
        }
    }

    #[test]
    fn minimum_next_bid_tracks_current_bid() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        assert_eq!(auction.minimum_next_bid(100), 1100);
        auction.current_bid = 1150;
        assert_eq!(auction.minimum_next_bid(100), 1250);
    }

    #[test]
    fn reserve_met_defaults_to_true_without_reserve() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        assert!(auction.reserve_met());
        auction.reserve_price = Some(5000);
        auction.current_bid = 4000;
        assert!(!auction.reserve_met());
        auction.current_bid = 6000;
        assert!(auction.reserve_met());
    }

    #[test]
    fn reserve_hidden_from_non_sellers_until_ended() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        auction.reserve_price = Some(5000);

        let seller = auction.seller_id.clone();
        let stranger = "someone-else".to_string();
        assert!(auction.reserve_visible_to(Some(&seller)));
        assert!(!auction.reserve_visible_to(Some(&stranger)));
        assert!(!auction.reserve_visible_to(None));

        auction.status = AuctionStatus::Ended;
        assert!(auction.reserve_visible_to(Some(&stranger)));
        assert!(auction.reserve_visible_to(None));

        let api = auction.clone().into_api(Some(&stranger));
        assert_eq!(api.reserve_price, Some(5000));
    }

    #[test]
    fn time_remaining_is_none_once_over() {
        let now = OffsetDateTime::now_utc();
        let mut auction = auction_fixture(now);
        assert!(auction.time_remaining(now).is_some());

        auction.end_time = now - Duration::from_secs(1);
        assert_eq!(auction.time_remaining(now), None);

        auction.end_time = now + Duration::from_secs(60);
        auction.status = AuctionStatus::Ended;
        assert_eq!(auction.time_remaining(now), None);
    }
}
