#[cfg(test)]
use mockall::automock;
use {
    crate::{
        api::RestError,
        auction::entities,
        state::DB,
    },
    axum::async_trait,
    gavel_api_types::{
        auction::{
            AuctionId,
            BidId,
            CarId,
        },
        Amount,
        UserId,
    },
    sqlx::{
        prelude::FromRow,
        QueryBuilder,
    },
    std::{
        fmt::Debug,
        time::Duration,
    },
    time::OffsetDateTime,
    tracing::instrument,
};

#[derive(Clone, Copy, Debug, PartialEq, sqlx::Type)]
#[sqlx(type_name = "auction_status", rename_all = "lowercase")]
pub enum AuctionStatus {
    Upcoming,
    Active,
    Ended,
}

impl From<entities::AuctionStatus> for AuctionStatus {
    fn from(status: entities::AuctionStatus) -> Self {
        match status {
            entities::AuctionStatus::Upcoming => AuctionStatus::Upcoming,
            entities::AuctionStatus::Active => AuctionStatus::Active,
            entities::AuctionStatus::Ended => AuctionStatus::Ended,
        }
    }
}

impl From<AuctionStatus> for entities::AuctionStatus {
    fn from(status: AuctionStatus) -> Self {
        match status {
            AuctionStatus::Upcoming => entities::AuctionStatus::Upcoming,
            AuctionStatus::Active => entities::AuctionStatus::Active,
            AuctionStatus::Ended => entities::AuctionStatus::Ended,
        }
    }
}

#[derive(Clone, Debug, FromRow)]
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
    pub ending_alert_at:     Option<OffsetDateTime>,
}

impl From<Auction> for entities::Auction {
    fn from(auction: Auction) -> Self {
        Self {
            id:                  auction.id,
            car_id:              auction.car_id,
            car_label:           auction.car_label,
            seller_id:           auction.seller_id,
            seller_name:         auction.seller_name,
            start_price:         auction.start_price,
            reserve_price:       auction.reserve_price,
            current_bid:         auction.current_bid,
            highest_bidder_id:   auction.highest_bidder_id,
            highest_bidder_name: auction.highest_bidder_name,
            bid_count:           auction.bid_count,
            watchers_count:      auction.watchers_count,
            status:              auction.status.into(),
            start_time:          auction.start_time,
            end_time:            auction.end_time,
            created_at:          auction.created_at,
            ending_alert_at:     auction.ending_alert_at,
        }
    }
}

#[derive(Clone, Debug, FromRow)]
pub struct Bid {
    pub id:         BidId,
    pub auction_id: AuctionId,
    pub user_id:    UserId,
    pub user_name:  String,
    pub amount:     Amount,
    pub is_winning: bool,
    pub created_at: OffsetDateTime,
}

impl From<Bid> for entities::Bid {
    fn from(bid: Bid) -> Self {
        Self {
            id:          bid.id,
            auction_id:  bid.auction_id,
            bidder_id:   bid.user_id,
            bidder_name: bid.user_name,
            amount:      bid.amount,
            is_winning:  bid.is_winning,
            created_at:  bid.created_at,
        }
    }
}

pub struct AppendBid {
    pub bid_id:               BidId,
    pub bidder_id:            UserId,
    pub bidder_name:          String,
    pub amount:               Amount,
    /// The current bid value the caller validated against. The append only
    /// commits if the row still holds this value.
    pub expected_current_bid: Amount,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Database: Debug + Send + Sync + 'static {
    async fn add_auction(&self, auction: &entities::Auction) -> Result<(), RestError>;
    async fn get_auction(&self, auction_id: AuctionId)
        -> Result<Option<entities::Auction>, RestError>;
    async fn get_auctions(
        &self,
        status: Option<entities::AuctionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<entities::Auction>, i64), RestError>;
    async fn get_recent_bids(
        &self,
        auction_id: AuctionId,
        limit: i64,
    ) -> Result<Vec<entities::Bid>, RestError>;
    /// Compare-and-swap commit of one bid. Returns None without writing
    /// anything when the auction's current bid no longer matches
    /// `expected_current_bid`.
    async fn append_bid(
        &self,
        auction_id: AuctionId,
        append: AppendBid,
    ) -> Result<Option<entities::Bid>, RestError>;
    /// Conditional status transition. Returns false when the auction was not
    /// in `from_status` anymore, in which case nothing was written.
    async fn advance_auction_status(
        &self,
        auction_id: AuctionId,
        from_status: entities::AuctionStatus,
        to_status: entities::AuctionStatus,
    ) -> anyhow::Result<bool>;
    /// Marks the most recent highest bid of the auction as winning.
    async fn mark_winning_bid(&self, auction_id: AuctionId)
        -> anyhow::Result<Option<entities::Bid>>;
    /// Claims the right to send one ending soon alert. Returns false when the
    /// auction was alerted within the cooldown already.
    async fn claim_ending_alert(
        &self,
        auction_id: AuctionId,
        now: OffsetDateTime,
        cooldown: Duration,
    ) -> anyhow::Result<bool>;
    async fn list_activatable(&self, now: OffsetDateTime)
        -> anyhow::Result<Vec<entities::Auction>>;
    async fn list_closable(&self, now: OffsetDateTime) -> anyhow::Result<Vec<entities::Auction>>;
    async fn list_ending_soon(
        &self,
        now: OffsetDateTime,
        window: Duration,
    ) -> anyhow::Result<Vec<entities::Auction>>;
    /// Returns the new watcher count, or None if the pair already existed.
    async fn add_watcher(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<Option<i64>, RestError>;
    /// Returns the new watcher count, or None if the pair did not exist.
    async fn remove_watcher(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<Option<i64>, RestError>;
    async fn list_watchers(&self, auction_id: AuctionId) -> anyhow::Result<Vec<UserId>>;
    async fn is_watching(&self, auction_id: AuctionId, user_id: UserId)
        -> Result<bool, RestError>;
    async fn recount_watchers(&self, auction_id: AuctionId) -> anyhow::Result<i64>;
    async fn add_notification(&self, notification: &entities::Notification) -> anyhow::Result<()>;
}

#[async_trait]
impl Database for DB {
    #[instrument(
        target = "metrics",
        name = "db_add_auction",
        fields(category = "db_queries", result = "success", name = "add_auction"),
        skip_all
    )]
    async fn add_auction(&self, auction: &entities::Auction) -> Result<(), RestError> {
        sqlx::query(
            "INSERT INTO auctions (id, car_id, car_label, seller_id, seller_name, start_price, \
             reserve_price, current_bid, bid_count, watchers_count, status, start_time, end_time, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(auction.id)
        .bind(auction.car_id)
        .bind(&auction.car_label)
        .bind(&auction.seller_id)
        .bind(&auction.seller_name)
        .bind(auction.start_price)
        .bind(auction.reserve_price)
        .bind(auction.current_bid)
        .bind(auction.bid_count)
        .bind(auction.watchers_count)
        .bind(AuctionStatus::from(auction.status))
        .bind(auction.start_time)
        .bind(auction.end_time)
        .bind(auction.created_at)
        .execute(self)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction.id, "DB: Failed to insert auction");
            RestError::TemporarilyUnavailable
        })?;
        Ok(())
    }

    #[instrument(
        target = "metrics",
        name = "db_get_auction",
        fields(category = "db_queries", result = "success", name = "get_auction"),
        skip_all
    )]
    async fn get_auction(
        &self,
        auction_id: AuctionId,
    ) -> Result<Option<entities::Auction>, RestError> {
        let auction: Option<Auction> = sqlx::query_as("SELECT * FROM auctions WHERE id = $1")
            .bind(auction_id)
            .fetch_optional(self)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to fetch auction");
                RestError::TemporarilyUnavailable
            })?;
        Ok(auction.map(|auction| auction.into()))
    }

    #[instrument(
        target = "metrics",
        name = "db_get_auctions",
        fields(category = "db_queries", result = "success", name = "get_auctions"),
        skip_all
    )]
    async fn get_auctions(
        &self,
        status: Option<entities::AuctionStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<entities::Auction>, i64), RestError> {
        let mut count_query = QueryBuilder::new("SELECT COUNT(*) FROM auctions");
        if let Some(status) = status {
            count_query.push(" WHERE status = ");
            count_query.push_bind(AuctionStatus::from(status));
        }
        let total_count: i64 = count_query
            .build_query_scalar()
            .fetch_one(self)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "DB: Failed to count auctions");
                RestError::TemporarilyUnavailable
            })?;

        let mut query = QueryBuilder::new("SELECT * FROM auctions");
        if let Some(status) = status {
            query.push(" WHERE status = ");
            query.push_bind(AuctionStatus::from(status));
        }
        // Live auctions first, then the ones opening soonest, then the archive.
        query.push(
            " ORDER BY CASE status WHEN 'active' THEN 0 WHEN 'upcoming' THEN 1 ELSE 2 END, \
             end_time ASC LIMIT ",
        );
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let auctions: Vec<Auction> =
            query.build_query_as().fetch_all(self).await.map_err(|e| {
                tracing::error!(error = ?e, "DB: Failed to fetch auctions");
                RestError::TemporarilyUnavailable
            })?;
        Ok((
            auctions.into_iter().map(|auction| auction.into()).collect(),
            total_count,
        ))
    }

    #[instrument(
        target = "metrics",
        name = "db_get_recent_bids",
        fields(category = "db_queries", result = "success", name = "get_recent_bids"),
        skip_all
    )]
    async fn get_recent_bids(
        &self,
        auction_id: AuctionId,
        limit: i64,
    ) -> Result<Vec<entities::Bid>, RestError> {
        let bids: Vec<Bid> = sqlx::query_as(
            "SELECT * FROM bids WHERE auction_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(auction_id)
        .bind(limit)
        .fetch_all(self)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to fetch bids");
            RestError::TemporarilyUnavailable
        })?;
        Ok(bids.into_iter().map(|bid| bid.into()).collect())
    }

    #[instrument(
        target = "metrics",
        name = "db_append_bid",
        fields(category = "db_queries", result = "success", name = "append_bid"),
        skip_all
    )]
    async fn append_bid(
        &self,
        auction_id: AuctionId,
        append: AppendBid,
    ) -> Result<Option<entities::Bid>, RestError> {
        let mut tx = self.begin().await.map_err(|e| {
            tracing::error!(error = ?e, "DB: Failed to begin bid transaction");
            RestError::TemporarilyUnavailable
        })?;

        // The guard column is current_bid: a concurrent writer that committed
        // after our read makes this a no-op and the whole append is abandoned.
        let updated = sqlx::query(
            "UPDATE auctions SET current_bid = $3, highest_bidder_id = $4, \
             highest_bidder_name = $5, bid_count = bid_count + 1 WHERE id = $1 AND \
             current_bid = $2 AND status = 'active'",
        )
        .bind(auction_id)
        .bind(append.expected_current_bid)
        .bind(append.amount)
        .bind(&append.bidder_id)
        .bind(&append.bidder_name)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to update current bid");
            RestError::TemporarilyUnavailable
        })?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let bid: Bid = sqlx::query_as(
            "INSERT INTO bids (id, auction_id, user_id, user_name, amount, is_winning, \
             created_at) VALUES ($1, $2, $3, $4, $5, FALSE, NOW()) RETURNING *",
        )
        .bind(append.bid_id)
        .bind(auction_id)
        .bind(&append.bidder_id)
        .bind(&append.bidder_name)
        .bind(append.amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to insert bid");
            RestError::TemporarilyUnavailable
        })?;

        tx.commit().await.map_err(|e| {
            tracing::error!(error = ?e, "DB: Failed to commit bid transaction");
            RestError::TemporarilyUnavailable
        })?;
        Ok(Some(bid.into()))
    }

    #[instrument(
        target = "metrics",
        name = "db_advance_auction_status",
        fields(category = "db_queries", result = "success", name = "advance_auction_status"),
        skip_all
    )]
    async fn advance_auction_status(
        &self,
        auction_id: AuctionId,
        from_status: entities::AuctionStatus,
        to_status: entities::AuctionStatus,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE auctions SET status = $3 WHERE id = $1 AND status = $2")
            .bind(auction_id)
            .bind(AuctionStatus::from(from_status))
            .bind(AuctionStatus::from(to_status))
            .execute(self)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        target = "metrics",
        name = "db_mark_winning_bid",
        fields(category = "db_queries", result = "success", name = "mark_winning_bid"),
        skip_all
    )]
    async fn mark_winning_bid(
        &self,
        auction_id: AuctionId,
    ) -> anyhow::Result<Option<entities::Bid>> {
        let bid: Option<Bid> = sqlx::query_as(
            "UPDATE bids SET is_winning = TRUE WHERE id = (SELECT id FROM bids WHERE \
             auction_id = $1 ORDER BY amount DESC, created_at DESC LIMIT 1) RETURNING *",
        )
        .bind(auction_id)
        .fetch_optional(self)
        .await?;
        Ok(bid.map(|bid| bid.into()))
    }

    #[instrument(
        target = "metrics",
        name = "db_claim_ending_alert",
        fields(category = "db_queries", result = "success", name = "claim_ending_alert"),
        skip_all
    )]
    async fn claim_ending_alert(
        &self,
        auction_id: AuctionId,
        now: OffsetDateTime,
        cooldown: Duration,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE auctions SET ending_alert_at = $2 WHERE id = $1 AND status = 'active' AND \
             (ending_alert_at IS NULL OR ending_alert_at <= $3)",
        )
        .bind(auction_id)
        .bind(now)
        .bind(now - cooldown)
        .execute(self)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(
        target = "metrics",
        name = "db_list_activatable",
        fields(category = "db_queries", result = "success", name = "list_activatable"),
        skip_all
    )]
    async fn list_activatable(
        &self,
        now: OffsetDateTime,
    ) -> anyhow::Result<Vec<entities::Auction>> {
        let auctions: Vec<Auction> =
            sqlx::query_as("SELECT * FROM auctions WHERE status = 'upcoming' AND start_time <= $1")
                .bind(now)
                .fetch_all(self)
                .await?;
        Ok(auctions.into_iter().map(|auction| auction.into()).collect())
    }

    #[instrument(
        target = "metrics",
        name = "db_list_closable",
        fields(category = "db_queries", result = "success", name = "list_closable"),
        skip_all
    )]
    async fn list_closable(&self, now: OffsetDateTime) -> anyhow::Result<Vec<entities::Auction>> {
        let auctions: Vec<Auction> =
            sqlx::query_as("SELECT * FROM auctions WHERE status = 'active' AND end_time <= $1")
                .bind(now)
                .fetch_all(self)
                .await?;
        Ok(auctions.into_iter().map(|auction| auction.into()).collect())
    }

    #[instrument(
        target = "metrics",
        name = "db_list_ending_soon",
        fields(category = "db_queries", result = "success", name = "list_ending_soon"),
        skip_all
    )]
    async fn list_ending_soon(
        &self,
        now: OffsetDateTime,
        window: Duration,
    ) -> anyhow::Result<Vec<entities::Auction>> {
        let auctions: Vec<Auction> = sqlx::query_as(
            "SELECT * FROM auctions WHERE status = 'active' AND end_time > $1 AND end_time <= $2",
        )
        .bind(now)
        .bind(now + window)
        .fetch_all(self)
        .await?;
        Ok(auctions.into_iter().map(|auction| auction.into()).collect())
    }

    #[instrument(
        target = "metrics",
        name = "db_add_watcher",
        fields(category = "db_queries", result = "success", name = "add_watcher"),
        skip_all
    )]
    async fn add_watcher(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<Option<i64>, RestError> {
        let mut tx = self.begin().await.map_err(|e| {
            tracing::error!(error = ?e, "DB: Failed to begin watcher transaction");
            RestError::TemporarilyUnavailable
        })?;
        let inserted = sqlx::query(
            "INSERT INTO auction_watchers (auction_id, user_id, created_at) VALUES ($1, $2, \
             NOW()) ON CONFLICT DO NOTHING",
        )
        .bind(auction_id)
        .bind(&user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to insert watcher");
            RestError::TemporarilyUnavailable
        })?;
        if inserted.rows_affected() == 0 {
            return Ok(None);
        }
        let count: i64 = sqlx::query_scalar(
            "UPDATE auctions SET watchers_count = watchers_count + 1 WHERE id = $1 RETURNING \
             watchers_count",
        )
        .bind(auction_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to bump watcher count");
            RestError::TemporarilyUnavailable
        })?;
        tx.commit().await.map_err(|e| {
            tracing::error!(error = ?e, "DB: Failed to commit watcher transaction");
            RestError::TemporarilyUnavailable
        })?;
        Ok(Some(count))
    }

    #[instrument(
        target = "metrics",
        name = "db_remove_watcher",
        fields(category = "db_queries", result = "success", name = "remove_watcher"),
        skip_all
    )]
    async fn remove_watcher(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<Option<i64>, RestError> {
        let mut tx = self.begin().await.map_err(|e| {
            tracing::error!(error = ?e, "DB: Failed to begin watcher transaction");
            RestError::TemporarilyUnavailable
        })?;
        let deleted =
            sqlx::query("DELETE FROM auction_watchers WHERE auction_id = $1 AND user_id = $2")
                .bind(auction_id)
                .bind(&user_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to delete watcher");
                    RestError::TemporarilyUnavailable
                })?;
        if deleted.rows_affected() == 0 {
            return Ok(None);
        }
        let count: i64 = sqlx::query_scalar(
            "UPDATE auctions SET watchers_count = GREATEST(watchers_count - 1, 0) WHERE id = $1 \
             RETURNING watchers_count",
        )
        .bind(auction_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to drop watcher count");
            RestError::TemporarilyUnavailable
        })?;
        tx.commit().await.map_err(|e| {
            tracing::error!(error = ?e, "DB: Failed to commit watcher transaction");
            RestError::TemporarilyUnavailable
        })?;
        Ok(Some(count))
    }

    #[instrument(
        target = "metrics",
        name = "db_list_watchers",
        fields(category = "db_queries", result = "success", name = "list_watchers"),
        skip_all
    )]
    async fn list_watchers(&self, auction_id: AuctionId) -> anyhow::Result<Vec<UserId>> {
        let watchers: Vec<UserId> =
            sqlx::query_scalar("SELECT user_id FROM auction_watchers WHERE auction_id = $1")
                .bind(auction_id)
                .fetch_all(self)
                .await?;
        Ok(watchers)
    }

    #[instrument(
        target = "metrics",
        name = "db_is_watching",
        fields(category = "db_queries", result = "success", name = "is_watching"),
        skip_all
    )]
    async fn is_watching(
        &self,
        auction_id: AuctionId,
        user_id: UserId,
    ) -> Result<bool, RestError> {
        let watching: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM auction_watchers WHERE auction_id = $1 AND user_id = $2)",
        )
        .bind(auction_id)
        .bind(&user_id)
        .fetch_one(self)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, auction_id = %auction_id, "DB: Failed to check watcher");
            RestError::TemporarilyUnavailable
        })?;
        Ok(watching)
    }

    #[instrument(
        target = "metrics",
        name = "db_recount_watchers",
        fields(category = "db_queries", result = "success", name = "recount_watchers"),
        skip_all
    )]
    async fn recount_watchers(&self, auction_id: AuctionId) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "UPDATE auctions SET watchers_count = (SELECT COUNT(*) FROM auction_watchers WHERE \
             auction_id = auctions.id) WHERE id = $1 RETURNING watchers_count",
        )
        .bind(auction_id)
        .fetch_one(self)
        .await?;
        Ok(count)
    }

    #[instrument(
        target = "metrics",
        name = "db_add_notification",
        fields(category = "db_queries", result = "success", name = "add_notification"),
        skip_all
    )]
    async fn add_notification(&self, notification: &entities::Notification) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, type, title, message, auction_id, priority, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(&notification.user_id)
        .bind(serde_plain(&notification.kind)?)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.auction_id)
        .bind(serde_plain(&notification.priority)?)
        .bind(notification.created_at)
        .execute(self)
        .await?;
        Ok(())
    }
}

/// Reuses the wire-format tags of serde enums for plain text columns.
fn serde_plain<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => anyhow::bail!("expected a string-serializable enum, got {other}"),
    }
}
