use {
    crate::{
        auction::{
            AuctionEnded,
            AuctionId,
            Bid,
            BidResult,
            Notification,
        },
        Amount,
        ErrorBodyResponse,
        UserId,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    strum::AsRefStr,
    time::OffsetDateTime,
    utoipa::ToSchema,
};

#[derive(Deserialize, Clone, ToSchema, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum ClientMessage {
    /// Join the channels of the given auctions. Idempotent.
    #[serde(rename = "subscribe")]
    Subscribe {
        #[schema(value_type = Vec<String>)]
        auction_ids: Vec<AuctionId>,
    },
    /// Leave the channels of the given auctions. Idempotent.
    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        #[schema(value_type = Vec<String>)]
        auction_ids: Vec<AuctionId>,
    },
    /// Place a bid over the socket. Equivalent to the REST bid endpoint.
    #[serde(rename = "place_bid")]
    PlaceBid {
        #[schema(value_type = String)]
        auction_id: AuctionId,
        #[schema(example = 1500)]
        amount:     Amount,
    },
}

#[derive(Deserialize, Clone, ToSchema, Serialize)]
pub struct ClientRequest {
    pub id:  String,
    #[serde(flatten)]
    pub msg: ClientMessage,
}

/// This enum is used to send an update to the client for any channel it is part of.
#[derive(Serialize, Clone, ToSchema, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerUpdateResponse {
    #[serde(rename = "bid_accepted")]
    BidAccepted {
        #[schema(value_type = String)]
        auction_id:  AuctionId,
        bid:         Bid,
        /// The auction's new current bid, equal to the accepted amount.
        #[schema(example = 1500)]
        current_bid: Amount,
        #[schema(example = 5)]
        bid_count:   i64,
    },
    #[serde(rename = "lifecycle_started")]
    LifecycleStarted {
        #[schema(value_type = String)]
        auction_id: AuctionId,
        #[schema(example = "2024-05-25T21:00:00Z", value_type = String)]
        #[serde(with = "time::serde::rfc3339")]
        end_time:   OffsetDateTime,
    },
    #[serde(rename = "lifecycle_ended")]
    LifecycleEnded(AuctionEnded),
    #[serde(rename = "ending_soon")]
    EndingSoon {
        #[schema(value_type = String)]
        auction_id: AuctionId,
        #[schema(example = "2024-05-25T21:00:00Z", value_type = String)]
        #[serde(with = "time::serde::rfc3339")]
        end_time:   OffsetDateTime,
    },
    /// Courtesy presence event. Not a delivery guarantee of any kind.
    #[serde(rename = "member_joined")]
    MemberJoined {
        #[schema(value_type = String)]
        auction_id: AuctionId,
        #[schema(value_type = String)]
        user_id:    UserId,
    },
    #[serde(rename = "member_left")]
    MemberLeft {
        #[schema(value_type = String)]
        auction_id: AuctionId,
        #[schema(value_type = String)]
        user_id:    UserId,
    },
    /// Personal alert, delivered only on the recipient's own connection.
    #[serde(rename = "notification")]
    Notification { notification: Notification },
}

impl ServerUpdateResponse {
    /// The auction channel this update belongs to. None for personal notifications.
    pub fn auction_id(&self) -> Option<AuctionId> {
        match self {
            ServerUpdateResponse::BidAccepted { auction_id, .. }
            | ServerUpdateResponse::LifecycleStarted { auction_id, .. }
            | ServerUpdateResponse::EndingSoon { auction_id, .. }
            | ServerUpdateResponse::MemberJoined { auction_id, .. }
            | ServerUpdateResponse::MemberLeft { auction_id, .. } => Some(*auction_id),
            ServerUpdateResponse::LifecycleEnded(ended) => Some(ended.auction_id),
            ServerUpdateResponse::Notification { .. } => None,
        }
    }
}

#[derive(Serialize, Clone, ToSchema, Deserialize, Debug)]
#[serde(untagged)]
pub enum APIResponse {
    BidResult(BidResult),
}

#[derive(Serialize, Clone, ToSchema, Deserialize, Debug)]
#[serde(tag = "status", content = "result")]
pub enum ServerResultMessage {
    #[serde(rename = "success")]
    Success(Option<APIResponse>),
    /// Carries the same structured body as a REST error response.
    #[serde(rename = "error")]
    Err(ErrorBodyResponse),
}

/// This enum is used to send the result for a specific client request with the same id.
/// Id is only None when the client message is invalid.
#[derive(Serialize, ToSchema, Deserialize, Clone, Debug)]
pub struct ServerResultResponse {
    pub id:     Option<String>,
    #[serde(flatten)]
    pub result: ServerResultMessage,
}

#[derive(AsRefStr, Clone)]
#[strum(prefix = "/")]
pub enum Route {
    #[strum(serialize = "ws")]
    Ws,
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        uuid::Uuid,
    };

    #[test]
    fn client_request_tagging() {
        let id = Uuid::new_v4();
        let text = format!(
            r#"{{"id":"1","method":"place_bid","params":{{"auction_id":"{}","amount":1500}}}}"#,
            id
        );
        let request: ClientRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(request.id, "1");
        match request.msg {
            ClientMessage::PlaceBid { auction_id, amount } => {
                assert_eq!(auction_id, id);
                assert_eq!(amount, 1500);
            }
            _ => panic!("expected place_bid"),
        }
    }

    #[test]
    fn update_event_type_tags() {
        let update = ServerUpdateResponse::EndingSoon {
            auction_id: Uuid::new_v4(),
            end_time:   OffsetDateTime::UNIX_EPOCH,
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["type"], "ending_soon");

        let update = ServerUpdateResponse::LifecycleEnded(AuctionEnded {
            auction_id:  Uuid::new_v4(),
            outcome:     crate::auction::EndedOutcome::NoBids,
            winner_id:   None,
            winner_name: None,
            final_price: 1000,
            reserve_met: false,
        });
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["type"], "lifecycle_ended");
        assert_eq!(value["outcome"], "no_bids");
    }

    #[test]
    fn error_result_keeps_the_structured_body() {
        let response = ServerResultResponse {
            id:     Some("1".to_string()),
            result: ServerResultMessage::Err(ErrorBodyResponse {
                error:      "Bid too low. The minimum accepted bid is 1250".to_string(),
                code:       "BID_TOO_LOW".to_string(),
                min_amount: Some(1250),
            }),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], "1");
        assert_eq!(value["status"], "error");
        assert_eq!(value["result"]["code"], "BID_TOO_LOW");
        assert_eq!(value["result"]["min_amount"], 1250);
    }
}
