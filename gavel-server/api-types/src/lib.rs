use {
    ::serde::{
        Deserialize,
        Serialize,
    },
    strum::AsRefStr,
    utoipa::{
        ToResponse,
        ToSchema,
    },
};

pub mod auction;
pub mod serde;
pub mod ws;

/// Opaque user identifier handed to the server by the upstream gateway.
pub type UserId = String;
/// Whole currency units. All prices, bids and balances use this.
pub type Amount = i64;

#[derive(ToResponse, ToSchema, Serialize, Deserialize, Clone, Debug)]
#[response(description = "An error occurred processing the request")]
pub struct ErrorBodyResponse {
    pub error:      String,
    /// Stable machine readable tag for the failure.
    #[schema(example = "BID_TOO_LOW")]
    pub code:       String,
    /// The lowest amount the auction currently accepts. Only set when code is BID_TOO_LOW.
    #[schema(example = 1250, value_type = Option<i64>)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<Amount>,
}

#[derive(AsRefStr, Clone)]
#[strum(prefix = "/")]
pub enum Route {
    #[strum(serialize = "v1")]
    V1,
    #[strum(serialize = "auctions")]
    Auction,
    #[strum(serialize = "")]
    Root,
    #[strum(serialize = "live")]
    Liveness,
    #[strum(serialize = "docs")]
    Docs,
    #[strum(serialize = "docs/openapi.json")]
    OpenApi,
}
