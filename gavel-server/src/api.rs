use {
    crate::{
        config::RunOptions,
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::ServerState,
    },
    anyhow::Result,
    axum::{
        async_trait,
        extract::{
            FromRequestParts,
            State,
        },
        http::{
            request::Parts,
            StatusCode,
        },
        response::{
            IntoResponse,
            Response,
        },
        routing::{
            delete,
            get,
            post,
        },
        Json,
        Router,
    },
    axum_prometheus::PrometheusMetricLayerBuilder,
    clap::crate_version,
    gavel_api_types::{
        auction::{
            Auction,
            AuctionCreate,
            AuctionEnded,
            AuctionStatus,
            Bid,
            BidCreate,
            BidResult,
            EndedOutcome,
            GetAuctionResponse,
            GetAuctionsResponse,
            Notification,
            NotificationKind,
            NotificationPriority,
            TimeRemainingResponse,
            WatchResult,
            WatchStatus,
        },
        ws::{
            APIResponse,
            ClientMessage,
            ClientRequest,
            Route as WsRoute,
            ServerResultMessage,
            ServerResultResponse,
            ServerUpdateResponse,
        },
        Amount,
        ErrorBodyResponse,
        Route,
        UserId,
    },
    std::sync::{
        atomic::Ordering,
        Arc,
    },
    tower_http::cors::CorsLayer,
    utoipa::OpenApi,
    utoipa_redoc::{
        Redoc,
        Servable,
    },
};

pub(crate) mod auction;
pub(crate) mod ws;

async fn root() -> String {
    format!("Gavel Auction Server API {}", crate_version!())
}

/// Liveness probe. Checks that the database still answers.
pub async fn live(State(state): State<Arc<ServerState>>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.store.db).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => {
            tracing::error!(error = ?err, "Liveness database check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "DB UNAVAILABLE").into_response()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RestError {
    /// The request contained invalid parameters
    BadParameters(String),
    /// The auction was not found
    AuctionNotFound,
    /// The auction is not open for bidding
    AuctionNotActive,
    /// The auction's end time has passed even though the status has not caught up yet
    AuctionExpired,
    /// Sellers may not bid on their own auctions
    SelfBid,
    /// The offered amount is below the current minimum
    BidTooLow { minimum: Amount },
    /// The bidder's balance does not cover the offered amount
    InsufficientFunds,
    /// The user already watches this auction
    AlreadyWatching,
    /// The user does not watch this auction
    NotWatching,
    /// The client has reached the websocket connection limit for its IP
    TooManyOpenWebsocketConnections,
    /// Internal error occurred during processing the request
    TemporarilyUnavailable,
}

impl RestError {
    pub fn to_status_and_message(&self) -> (StatusCode, String) {
        match self {
            RestError::BadParameters(msg) => {
                (StatusCode::BAD_REQUEST, format!("Bad parameters: {}", msg))
            }
            RestError::AuctionNotFound => (
                StatusCode::NOT_FOUND,
                "Auction with the specified id was not found".to_string(),
            ),
            RestError::AuctionNotActive => (
                StatusCode::BAD_REQUEST,
                "Auction is not open for bidding".to_string(),
            ),
            RestError::AuctionExpired => (
                StatusCode::BAD_REQUEST,
                "Auction has already ended".to_string(),
            ),
            RestError::SelfBid => (
                StatusCode::BAD_REQUEST,
                "Sellers cannot bid on their own auction".to_string(),
            ),
            RestError::BidTooLow { minimum } => (
                StatusCode::BAD_REQUEST,
                format!("Bid too low. The minimum accepted bid is {}", minimum),
            ),
            RestError::InsufficientFunds => (
                StatusCode::BAD_REQUEST,
                "Insufficient balance to cover this bid".to_string(),
            ),
            RestError::AlreadyWatching => (
                StatusCode::BAD_REQUEST,
                "Already watching this auction".to_string(),
            ),
            RestError::NotWatching => (
                StatusCode::BAD_REQUEST,
                "Not watching this auction".to_string(),
            ),
            RestError::TooManyOpenWebsocketConnections => (
                StatusCode::BAD_REQUEST,
                "Maximum number of websocket connections reached".to_string(),
            ),
            RestError::TemporarilyUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "This service is temporarily unavailable".to_string(),
            ),
        }
    }

    /// Stable machine readable tag, kept independent of the human message.
    pub fn code(&self) -> &'static str {
        match self {
            RestError::BadParameters(_) => "INVALID_PARAMETERS",
            RestError::AuctionNotFound => "AUCTION_NOT_FOUND",
            RestError::AuctionNotActive => "AUCTION_NOT_ACTIVE",
            RestError::AuctionExpired => "AUCTION_ENDED",
            RestError::SelfBid => "CANNOT_BID_OWN_AUCTION",
            RestError::BidTooLow { .. } => "BID_TOO_LOW",
            RestError::InsufficientFunds => "INSUFFICIENT_BALANCE",
            RestError::AlreadyWatching => "ALREADY_WATCHING",
            RestError::NotWatching => "NOT_WATCHING",
            RestError::TooManyOpenWebsocketConnections => "TOO_MANY_CONNECTIONS",
            RestError::TemporarilyUnavailable => "INTERNAL_ERROR",
        }
    }

    pub fn min_amount(&self) -> Option<Amount> {
        match self {
            RestError::BidTooLow { minimum } => Some(*minimum),
            _ => None,
        }
    }

    /// The structured body shared by REST responses and websocket results.
    pub fn to_error_body(&self) -> ErrorBodyResponse {
        ErrorBodyResponse {
            error:      self.to_status_and_message().1,
            code:       self.code().to_string(),
            min_amount: self.min_amount(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let (status, _) = self.to_status_and_message();
        (status, Json(self.to_error_body())).into_response()
    }
}

/// Identity and balance asserted by the upstream gateway via headers.
#[derive(Clone, Debug)]
pub struct UserContext {
    pub user_id:   UserId,
    pub user_name: String,
    pub balance:   Amount,
}

#[async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .map(|value| {
                    value
                        .to_str()
                        .map(str::to_string)
                        .map_err(|_| format!("{} header is not valid utf-8", name))
                })
                .transpose()
        };

        let user_id = header("x-user-id")
            .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "x-user-id header is required".to_string(),
            ))?;
        let user_name = header("x-user-name")
            .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?
            .unwrap_or_else(|| user_id.clone());
        let balance = header("x-user-balance")
            .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?
            .map(|value| {
                value.parse::<Amount>().map_err(|_| {
                    (
                        StatusCode::BAD_REQUEST,
                        "x-user-balance header is not a valid amount".to_string(),
                    )
                })
            })
            .transpose()?
            .unwrap_or(0);

        Ok(Self {
            user_id,
            user_name,
            balance,
        })
    }
}

pub async fn start_api(run_options: RunOptions, server_state: Arc<ServerState>) -> Result<()> {
    // Make sure functions included in the paths section have distinct names, otherwise some api generators will fail
    #[derive(OpenApi)]
    #[openapi(
    paths(
    auction::post_auction,
    auction::get_auctions,
    auction::get_auction,
    auction::post_bid,
    auction::post_watch,
    auction::delete_watch,
    auction::get_watch_status,
    auction::get_time_remaining,
    ),
    components(
    schemas(
    Auction,
    AuctionStatus,
    AuctionCreate,
    AuctionEnded,
    EndedOutcome,
    Bid,
    BidCreate,
    BidResult,
    GetAuctionResponse,
    GetAuctionsResponse,
    TimeRemainingResponse,
    WatchResult,
    WatchStatus,
    Notification,
    NotificationKind,
    NotificationPriority,
    ErrorBodyResponse,
    APIResponse,
    ClientRequest,
    ClientMessage,
    ServerResultMessage,
    ServerUpdateResponse,
    ServerResultResponse,
    ),
    responses(
    ErrorBodyResponse,
    BidResult,
    WatchResult,
    Auction,
    ),
    ),
    tags(
    (name = "Gavel Auction Server", description = "The auction server runs timed vehicle auctions: it validates and \
    serializes bids, drives the auction lifecycle, and pushes realtime updates and notifications to watchers.")
    )
    )]
    struct ApiDoc;

    let auction_routes = Router::new()
        .route("/", post(auction::post_auction))
        .route("/", get(auction::get_auctions))
        .route("/:auction_id", get(auction::get_auction))
        .route("/:auction_id/bids", post(auction::post_bid))
        .route("/:auction_id/watch", post(auction::post_watch))
        .route("/:auction_id/watch", delete(auction::delete_watch))
        .route("/:auction_id/watch", get(auction::get_watch_status))
        .route(
            "/:auction_id/time-remaining",
            get(auction::get_time_remaining),
        );

    let v1_routes = Router::new().nest(
        Route::V1.as_ref(),
        Router::new()
            .nest(Route::Auction.as_ref(), auction_routes)
            .route(WsRoute::Ws.as_ref(), get(ws::ws_route_handler)),
    );

    let (prometheus_layer, _) = PrometheusMetricLayerBuilder::new()
        .with_metrics_from_fn({
            let state = server_state.clone();
            move || state.store.metrics_recorder.clone()
        })
        .build_pair();

    let app: Router<()> = Router::new()
        .merge(Redoc::with_url(Route::Docs.as_ref(), ApiDoc::openapi()))
        .route(
            Route::OpenApi.as_ref(),
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .merge(v1_routes)
        .route(Route::Root.as_ref(), get(root))
        .route(Route::Liveness.as_ref(), get(live))
        .layer(CorsLayer::permissive())
        .layer(prometheus_layer)
        .with_state(server_state);

    tracing::info!(
        listen_addr = %run_options.server.listen_addr,
        "Starting API server..."
    );
    let listener = tokio::net::TcpListener::bind(&run_options.server.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            while !SHOULD_EXIT.load(Ordering::Acquire) {
                tokio::time::sleep(EXIT_CHECK_INTERVAL).await;
            }
            tracing::info!("Shutting down API server...");
        })
        .await?;
    Ok(())
}
