use {
    crate::{
        api::{
            RestError,
            UserContext,
        },
        auction::service::{
            add_auction::AddAuctionInput,
            get_auction::GetAuctionInput,
            get_auctions::GetAuctionsInput,
            place_bid::PlaceBidInput,
            unwatch::UnwatchInput,
            watch::WatchInput,
        },
        state::ServerState,
    },
    axum::{
        extract::{
            Path,
            Query,
            State,
        },
        Json,
    },
    gavel_api_types::{
        auction::{
            Auction,
            AuctionCreate,
            AuctionId,
            BidCreate,
            BidResult,
            GetAuctionResponse,
            GetAuctionsQueryParams,
            GetAuctionsResponse,
            TimeRemainingResponse,
            WatchResult,
            WatchStatus,
        },
        ErrorBodyResponse,
    },
    std::sync::Arc,
};

/// List a vehicle for auction.
///
/// Opens bidding immediately when no start time is given, otherwise schedules
/// the auction to open at the given time.
#[utoipa::path(post, path = "/v1/auctions", request_body = AuctionCreate, responses(
    (status = 200, description = "The created auction", body = Auction),
    (status = 400, response = ErrorBodyResponse),
),)]
pub async fn post_auction(
    State(state): State<Arc<ServerState>>,
    user: UserContext,
    Json(auction_create): Json<AuctionCreate>,
) -> Result<Json<Auction>, RestError> {
    let auction = state
        .auction_service
        .add_auction(AddAuctionInput {
            car_id:         auction_create.car_id,
            car_label:      auction_create.car_label,
            seller_id:      user.user_id.clone(),
            seller_name:    user.user_name,
            start_price:    auction_create.start_price,
            reserve_price:  auction_create.reserve_price,
            start_time:     auction_create.start_time,
            duration_hours: auction_create.duration_hours,
        })
        .await?;
    Ok(Json(auction.into_api(Some(&user.user_id))))
}

/// List auctions, optionally filtered by lifecycle status.
///
/// Active auctions sort first, then upcoming, then ended, each by closest end time.
#[utoipa::path(get, path = "/v1/auctions", params(GetAuctionsQueryParams), responses(
    (status = 200, description = "The matching auctions and the total match count", body = GetAuctionsResponse),
    (status = 400, response = ErrorBodyResponse),
),)]
pub async fn get_auctions(
    State(state): State<Arc<ServerState>>,
    user: UserContext,
    Query(query_params): Query<GetAuctionsQueryParams>,
) -> Result<Json<GetAuctionsResponse>, RestError> {
    let (auctions, total_count) = state
        .auction_service
        .get_auctions(GetAuctionsInput {
            status: query_params.status.map(Into::into),
            limit:  query_params.limit,
            offset: query_params.offset,
        })
        .await?;
    Ok(Json(GetAuctionsResponse {
        auctions: auctions
            .into_iter()
            .map(|auction| auction.into_api(Some(&user.user_id)))
            .collect(),
        total_count,
    }))
}

/// Get one auction with its most recent bids.
#[utoipa::path(get, path = "/v1/auctions/{auction_id}",
    params(("auction_id" = String, description = "Auction id to query for")),
    responses(
    (status = 200, description = "The auction, its recent bids and the caller's watch status", body = GetAuctionResponse),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn get_auction(
    State(state): State<Arc<ServerState>>,
    user: UserContext,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<GetAuctionResponse>, RestError> {
    let view = state
        .auction_service
        .get_auction(GetAuctionInput {
            auction_id,
            viewer: Some(user.user_id.clone()),
        })
        .await?;
    Ok(Json(GetAuctionResponse {
        auction:     view.auction.into_api(Some(&user.user_id)),
        recent_bids: view.recent_bids.into_iter().map(Into::into).collect(),
        is_watched:  view.is_watched,
    }))
}

/// Place a bid on an active auction.
///
/// The amount must be at least the current bid plus the minimum increment,
/// and the bidder's balance must cover it. Concurrent bids on one auction are
/// resolved in commit order; the loser is told the new minimum.
#[utoipa::path(post, path = "/v1/auctions/{auction_id}/bids", request_body = BidCreate,
    params(("auction_id" = String, description = "Auction id to bid on")),
    responses(
    (status = 200, description = "Bid was placed successfully", body = BidResult,
    example = json!({"status": "OK", "id": "beedbeed-58cc-4372-a567-0e02b2c3d479"})),
    (status = 400, response = ErrorBodyResponse),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn post_bid(
    State(state): State<Arc<ServerState>>,
    user: UserContext,
    Path(auction_id): Path<AuctionId>,
    Json(bid_create): Json<BidCreate>,
) -> Result<Json<BidResult>, RestError> {
    let bid = state
        .auction_service
        .place_bid(PlaceBidInput {
            auction_id,
            bidder_id: user.user_id,
            bidder_name: user.user_name,
            bidder_balance: user.balance,
            amount: bid_create.amount,
        })
        .await?;
    Ok(Json(BidResult {
        status: "OK".to_string(),
        id:     bid.id,
    }))
}

/// Start watching an auction.
///
/// Watchers receive lifecycle notifications for the auction until they unwatch.
#[utoipa::path(post, path = "/v1/auctions/{auction_id}/watch",
    params(("auction_id" = String, description = "Auction id to watch")),
    responses(
    (status = 200, description = "Watcher was added", body = WatchResult),
    (status = 400, response = ErrorBodyResponse),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn post_watch(
    State(state): State<Arc<ServerState>>,
    user: UserContext,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<WatchResult>, RestError> {
    let watchers_count = state
        .auction_service
        .watch(WatchInput {
            auction_id,
            user_id: user.user_id,
        })
        .await?;
    Ok(Json(WatchResult {
        status: "OK".to_string(),
        watchers_count,
    }))
}

/// Stop watching an auction.
#[utoipa::path(delete, path = "/v1/auctions/{auction_id}/watch",
    params(("auction_id" = String, description = "Auction id to unwatch")),
    responses(
    (status = 200, description = "Watcher was removed", body = WatchResult),
    (status = 400, response = ErrorBodyResponse),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn delete_watch(
    State(state): State<Arc<ServerState>>,
    user: UserContext,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<WatchResult>, RestError> {
    let watchers_count = state
        .auction_service
        .unwatch(UnwatchInput {
            auction_id,
            user_id: user.user_id,
        })
        .await?;
    Ok(Json(WatchResult {
        status: "OK".to_string(),
        watchers_count,
    }))
}

/// Check whether the caller is watching an auction.
#[utoipa::path(get, path = "/v1/auctions/{auction_id}/watch",
    params(("auction_id" = String, description = "Auction id to query for")),
    responses(
    (status = 200, description = "The caller's watch status", body = WatchStatus),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn get_watch_status(
    State(state): State<Arc<ServerState>>,
    user: UserContext,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<WatchStatus>, RestError> {
    let is_watched = state
        .auction_service
        .is_watching(auction_id, &user.user_id)
        .await?;
    Ok(Json(WatchStatus { is_watched }))
}

/// Get the server-authoritative countdown for an auction.
///
/// Returns null milliseconds once the auction is over, so clients never
/// extrapolate a countdown from their own clock.
#[utoipa::path(get, path = "/v1/auctions/{auction_id}/time-remaining",
    params(("auction_id" = String, description = "Auction id to query for")),
    responses(
    (status = 200, description = "Milliseconds until the auction closes", body = TimeRemainingResponse),
    (status = 404, description = "Auction was not found", body = ErrorBodyResponse),
),)]
pub async fn get_time_remaining(
    State(state): State<Arc<ServerState>>,
    Path(auction_id): Path<AuctionId>,
) -> Result<Json<TimeRemainingResponse>, RestError> {
    let remaining = state.auction_service.get_time_remaining(auction_id).await?;
    Ok(Json(TimeRemainingResponse {
        time_remaining_ms: remaining.map(|duration| duration.as_millis() as i64),
    }))
}
