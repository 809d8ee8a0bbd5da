use {
    crate::{
        Amount,
        UserId,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    time::OffsetDateTime,
    utoipa::{
        IntoParams,
        ToResponse,
        ToSchema,
    },
    uuid::Uuid,
};

pub type AuctionId = Uuid;
pub type BidId = Uuid;
pub type CarId = Uuid;
pub type NotificationId = Uuid;

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    /// Scheduled but not yet open for bidding.
    Upcoming,
    /// Open for bidding until the end time passes.
    Active,
    /// Closed. No further bids are accepted.
    Ended,
}

#[derive(Serialize, Deserialize, ToSchema, ToResponse, Clone, PartialEq, Debug)]
pub struct Auction {
    /// The unique id of the auction.
    #[schema(example = "obo3ee3e-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub id:                  AuctionId,
    /// The vehicle being sold.
    #[schema(example = "b27f5d21-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub car_id:              CarId,
    /// Display text for the vehicle, used in event and notification copy.
    #[schema(example = "Toyota Corolla 2020")]
    pub car_label:           String,
    #[schema(example = "u_4f2a", value_type = String)]
    pub seller_id:           UserId,
    #[schema(example = "Grace")]
    pub seller_name:         String,
    /// The price bidding opens at.
    #[schema(example = 1000)]
    pub start_price:         Amount,
    /// The highest accepted amount so far, or the start price if there are no bids.
    #[schema(example = 1500)]
    pub current_bid:         Amount,
    /// The seller's minimum sale price. Only present for the seller, or for
    /// everyone once the auction has ended.
    #[schema(example = 5000, value_type = Option<i64>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve_price:       Option<Amount>,
    #[schema(value_type = Option<String>)]
    pub highest_bidder_id:   Option<UserId>,
    pub highest_bidder_name: Option<String>,
    #[schema(example = 4)]
    pub bid_count:           i64,
    #[schema(example = 12)]
    pub watchers_count:      i64,
    pub status:              AuctionStatus,
    /// The time bidding opens, formatted in rfc3339.
    #[schema(example = "2024-05-23T21:00:00Z", value_type = String)]
    #[serde(with = "time::serde::rfc3339")]
    pub start_time:          OffsetDateTime,
    /// The time bidding closes, formatted in rfc3339.
    #[schema(example = "2024-05-25T21:00:00Z", value_type = String)]
    #[serde(with = "time::serde::rfc3339")]
    pub end_time:            OffsetDateTime,
    #[schema(example = "2024-05-23T20:59:30Z", value_type = String)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at:          OffsetDateTime,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, PartialEq, Debug)]
pub struct Bid {
    /// The unique id of the bid.
    #[schema(example = "beedbeed-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub id:          BidId,
    #[schema(example = "obo3ee3e-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub auction_id:  AuctionId,
    #[schema(example = "u_91c3", value_type = String)]
    pub bidder_id:   UserId,
    #[schema(example = "Hamid")]
    pub bidder_name: String,
    #[schema(example = 1500)]
    pub amount:      Amount,
    /// Set on at most one bid per auction, after the auction has ended with the
    /// reserve met.
    pub is_winning:  bool,
    #[schema(example = "2024-05-23T21:26:57.329954Z", value_type = String)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at:  OffsetDateTime,
}

/// Payload for placing a bid on an auction.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct BidCreate {
    /// The offered amount. Must be at least the current bid plus the minimum increment.
    #[schema(example = 1500)]
    pub amount: Amount,
}

#[derive(Serialize, Deserialize, ToResponse, ToSchema, Clone, Debug)]
pub struct BidResult {
    /// The status of the request. If the bid was placed successfully, the status will be "OK".
    #[schema(example = "OK")]
    pub status: String,
    /// The unique id created to identify the bid.
    #[schema(example = "beedbeed-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub id:     BidId,
}

/// Payload for listing a vehicle for auction.
#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct AuctionCreate {
    #[schema(example = "b27f5d21-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub car_id:         CarId,
    #[schema(example = "Toyota Corolla 2020")]
    pub car_label:      String,
    #[schema(example = 1000)]
    pub start_price:    Amount,
    /// Optional minimum sale price. Must be above the start price when set.
    #[schema(example = 5000, value_type = Option<i64>)]
    pub reserve_price:  Option<Amount>,
    /// When bidding opens, formatted in rfc3339. Omit to open immediately.
    #[schema(example = "2024-05-23T21:00:00Z", value_type = Option<String>)]
    #[serde(default, with = "crate::serde::nullable_datetime")]
    pub start_time:     Option<OffsetDateTime>,
    /// How long bidding stays open, in hours.
    #[schema(example = 48)]
    pub duration_hours: i64,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct GetAuctionResponse {
    pub auction:     Auction,
    /// The most recent bids, newest first.
    pub recent_bids: Vec<Bid>,
    /// Whether the requesting user is watching this auction.
    pub is_watched:  bool,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct GetAuctionsResponse {
    pub auctions:    Vec<Auction>,
    /// Total number of auctions matching the filter, ignoring pagination.
    #[schema(example = 37)]
    pub total_count: i64,
}

#[derive(Serialize, Deserialize, IntoParams, Clone, Debug)]
pub struct GetAuctionsQueryParams {
    /// Restrict the listing to one lifecycle status.
    #[param(value_type = Option<AuctionStatus>)]
    pub status: Option<AuctionStatus>,
    #[param(example = 20)]
    pub limit:  Option<i64>,
    #[param(example = 0)]
    pub offset: Option<i64>,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct TimeRemainingResponse {
    /// Milliseconds until the auction closes. Null once the end time has passed.
    #[schema(example = 93000, value_type = Option<i64>)]
    pub time_remaining_ms: Option<i64>,
}

#[derive(Serialize, Deserialize, ToResponse, ToSchema, Clone, Debug)]
pub struct WatchResult {
    /// The status of the request. "OK" if the watcher set was changed.
    #[schema(example = "OK")]
    pub status:         String,
    /// The auction's watcher count after the change.
    #[schema(example = 13)]
    pub watchers_count: i64,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Debug)]
pub struct WatchStatus {
    pub is_watched: bool,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Bidding opened on a watched auction.
    AuctionStarted,
    /// A watched auction closes within the alert window.
    AuctionEnding,
    /// A watched auction closed.
    AuctionEnded,
    /// The recipient placed the winning bid.
    WonAuction,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Medium,
    High,
}

/// A personal alert delivered on the recipient's user channel and kept durably.
#[derive(Serialize, Deserialize, ToSchema, Clone, PartialEq, Debug)]
pub struct Notification {
    #[schema(example = "a1b2c3d4-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub id:         NotificationId,
    #[schema(example = "u_91c3", value_type = String)]
    pub user_id:    UserId,
    #[serde(rename = "type")]
    pub kind:       NotificationKind,
    #[schema(example = "Auction Started")]
    pub title:      String,
    #[schema(example = "Bidding is now open on Toyota Corolla 2020")]
    pub message:    String,
    #[schema(value_type = Option<String>)]
    pub auction_id: Option<AuctionId>,
    pub priority:   NotificationPriority,
    #[schema(example = "2024-05-23T21:26:57.329954Z", value_type = String)]
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// How a closed auction resolved.
#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "snake_case")]
pub enum EndedOutcome {
    /// The reserve was met (or there was none) and the highest bid won.
    Sold,
    /// Bids were placed but the highest stayed below the reserve price.
    ReserveNotMet,
    /// No bids were placed.
    NoBids,
}

#[derive(Serialize, Deserialize, ToSchema, Clone, PartialEq, Debug)]
pub struct AuctionEnded {
    #[schema(example = "obo3ee3e-58cc-4372-a567-0e02b2c3d479", value_type = String)]
    pub auction_id:  AuctionId,
    pub outcome:     EndedOutcome,
    /// Set only when the outcome is `sold`.
    #[schema(value_type = Option<String>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_id:   Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner_name: Option<String>,
    /// The closing value of the current bid, whether or not it won.
    #[schema(example = 6000)]
    pub final_price: Amount,
    pub reserve_met: bool,
}
