use {
    super::Service,
    crate::{
        api::RestError,
        auction::entities,
    },
    gavel_api_types::{
        auction::CarId,
        Amount,
        UserId,
    },
    time::{
        Duration,
        OffsetDateTime,
    },
    uuid::Uuid,
};

pub struct AddAuctionInput {
    pub car_id:         CarId,
    pub car_label:      String,
    pub seller_id:      UserId,
    pub seller_name:    String,
    pub start_price:    Amount,
    pub reserve_price:  Option<Amount>,
    /// None starts the auction immediately.
    pub start_time:     Option<OffsetDateTime>,
    pub duration_hours: i64,
}

impl Service {
    #[tracing::instrument(skip_all, fields(car_id = %input.car_id))]
    pub async fn add_auction(
        &self,
        input: AddAuctionInput,
    ) -> Result<entities::Auction, RestError> {
        if input.start_price <= 0 {
            return Err(RestError::BadParameters(
                "start price must be positive".to_string(),
            ));
        }
        if input.duration_hours <= 0 {
            return Err(RestError::BadParameters(
                "duration must be positive".to_string(),
            ));
        }
        if let Some(reserve) = input.reserve_price {
            if reserve <= input.start_price {
                return Err(RestError::BadParameters(
                    "reserve price must be above the start price".to_string(),
                ));
            }
        }

        let now = OffsetDateTime::now_utc();
        let (start_time, status) = match input.start_time {
            Some(start) if start <= now => {
                return Err(RestError::BadParameters(
                    "scheduled start time must be in the future".to_string(),
                ));
            }
            Some(start) => (start, entities::AuctionStatus::Upcoming),
            None => (now, entities::AuctionStatus::Active),
        };

        let auction = entities::Auction {
            id: Uuid::new_v4(),
            car_id: input.car_id,
            car_label: input.car_label,
            seller_id: input.seller_id,
            seller_name: input.seller_name,
            start_price: input.start_price,
            reserve_price: input.reserve_price,
            current_bid: input.start_price,
            highest_bidder_id: None,
            highest_bidder_name: None,
            bid_count: 0,
            watchers_count: 0,
            status,
            start_time,
            end_time: start_time + Duration::hours(input.duration_hours),
            created_at: now,
            ending_alert_at: None,
        };
        self.repo.add_auction(auction).await
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::auction::repository::MockDatabase,
    };

    fn add_input() -> AddAuctionInput {
        AddAuctionInput {
            car_id:         Uuid::new_v4(),
            car_label:      "Toyota Corolla 2020".to_string(),
            seller_id:      "seller".to_string(),
            seller_name:    "Grace".to_string(),
            start_price:    1000,
            reserve_price:  None,
            start_time:     None,
            duration_hours: 24,
        }
    }

    #[tokio::test]
    async fn immediate_auction_opens_active_at_start_price() {
        let mut db = MockDatabase::default();
        db.expect_add_auction().returning(|_| Ok(()));

        let (service, _events) = Service::new_with_mocks(db);
        let auction = service.add_auction(add_input()).await.unwrap();
        assert_eq!(auction.status, entities::AuctionStatus::Active);
        assert_eq!(auction.current_bid, 1000);
        assert_eq!(auction.end_time, auction.start_time + Duration::hours(24));
    }

    #[tokio::test]
    async fn scheduled_auction_starts_upcoming() {
        let mut db = MockDatabase::default();
        db.expect_add_auction().returning(|_| Ok(()));

        let (service, _events) = Service::new_with_mocks(db);
        let mut input = add_input();
        input.start_time = Some(OffsetDateTime::now_utc() + Duration::hours(1));
        let auction = service.add_auction(input).await.unwrap();
        assert_eq!(auction.status, entities::AuctionStatus::Upcoming);
    }

    #[tokio::test]
    async fn rejects_bad_parameters() {
        let (service, _events) = Service::new_with_mocks(MockDatabase::default());

        let mut input = add_input();
        input.reserve_price = Some(900);
        assert!(matches!(
            service.add_auction(input).await.unwrap_err(),
            RestError::BadParameters(_)
        ));

        let mut input = add_input();
        input.start_time = Some(OffsetDateTime::now_utc() - Duration::minutes(5));
        assert!(matches!(
            service.add_auction(input).await.unwrap_err(),
            RestError::BadParameters(_)
        ));

        let mut input = add_input();
        input.duration_hours = 0;
        assert!(matches!(
            service.add_auction(input).await.unwrap_err(),
            RestError::BadParameters(_)
        ));
    }
}
