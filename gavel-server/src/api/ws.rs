use {
    super::{
        RestError,
        UserContext,
    },
    crate::{
        auction::service::place_bid::PlaceBidInput,
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::ServerState,
    },
    anyhow::{
        anyhow,
        Result,
    },
    axum::{
        extract::{
            ws::{
                Message,
                WebSocket,
            },
            State,
            WebSocketUpgrade,
        },
        http::HeaderMap,
        response::IntoResponse,
    },
    futures::{
        stream::{
            SplitSink,
            SplitStream,
        },
        SinkExt,
        StreamExt,
    },
    gavel_api_types::{
        auction::{
            AuctionId,
            BidResult,
            Notification,
        },
        ws::{
            APIResponse,
            ClientMessage,
            ClientRequest,
            ServerResultMessage,
            ServerResultResponse,
            ServerUpdateResponse,
        },
    },
    std::{
        collections::{
            HashMap,
            HashSet,
        },
        net::IpAddr,
        sync::{
            atomic::{
                AtomicUsize,
                Ordering,
            },
            Arc,
        },
        time::Duration,
    },
    tokio::sync::{
        broadcast,
        RwLock,
    },
    tracing::instrument,
};

pub struct WsState {
    pub requester_ip_header_name: String,
    subscriber_counter:           AtomicUsize,
    subscriber_per_ip:            RwLock<HashMap<IpAddr, HashSet<SubscriberId>>>,
    pub broadcast_sender:         broadcast::Sender<UpdateEvent>,
    pub broadcast_receiver:       broadcast::Receiver<UpdateEvent>,
}

const MAXIMUM_SUBSCRIBERS_PER_IP: usize = 10;

impl WsState {
    pub fn new(requester_ip_header_name: String, broadcast_channel_size: usize) -> Self {
        let (broadcast_sender, broadcast_receiver) = broadcast::channel(broadcast_channel_size);
        Self {
            requester_ip_header_name,
            subscriber_counter: AtomicUsize::new(0),
            subscriber_per_ip: RwLock::new(HashMap::new()),
            broadcast_sender,
            broadcast_receiver,
        }
    }

    /// If the specified IP address has too many open websocket connections, this function will
    /// return none. Otherwise, it will return the new subscriber id.
    pub async fn get_new_subscriber_id(&self, ip: Option<IpAddr>) -> Option<SubscriberId> {
        let id = self.subscriber_counter.fetch_add(1, Ordering::SeqCst);
        if let Some(ip) = ip {
            let mut write_guard = self.subscriber_per_ip.write().await;
            let ids = write_guard.entry(ip).or_insert_with(HashSet::new);
            if ids.len() >= MAXIMUM_SUBSCRIBERS_PER_IP {
                return None;
            }
            ids.insert(id);
        }
        Some(id)
    }

    pub async fn remove_subscriber(&self, id: SubscriberId, ip: Option<IpAddr>) {
        if let Some(ip) = ip {
            let mut write_guard = self.subscriber_per_ip.write().await;
            if let Some(ids) = write_guard.get_mut(&ip) {
                ids.remove(&id);
                if ids.is_empty() {
                    write_guard.remove(&ip);
                }
            }
        }
    }
}

pub async fn ws_route_handler(
    user: UserContext,
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ws_state = &state.store.ws;
    let requester_ip = headers
        .get(ws_state.requester_ip_header_name.as_str())
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next()) // Only take the first ip if there are multiple
        .and_then(|value| value.trim().parse().ok());

    if requester_ip.is_none() {
        tracing::warn!("Failed to get requester IP address");
    }

    match ws_state.get_new_subscriber_id(requester_ip).await {
        Some(subscriber_id) => ws.on_upgrade(move |socket| {
            websocket_handler(socket, state, subscriber_id, user, requester_ip)
        }),
        None => RestError::TooManyOpenWebsocketConnections.into_response(),
    }
}

async fn websocket_handler(
    stream: WebSocket,
    state: Arc<ServerState>,
    subscriber_id: SubscriberId,
    user: UserContext,
    requester_ip: Option<IpAddr>,
) {
    let ws_state = &state.store.ws;
    let (sender, receiver) = stream.split();
    let new_receiver = ws_state.broadcast_receiver.resubscribe();
    let mut subscriber = Subscriber::new(
        subscriber_id,
        state.clone(),
        new_receiver,
        receiver,
        sender,
        user,
    );
    subscriber.run().await;
    state
        .store
        .ws
        .remove_subscriber(subscriber_id, requester_ip)
        .await;
}

#[derive(Clone, PartialEq, Debug)]
pub enum UpdateEvent {
    /// An auction channel update, delivered to subscribers of that auction.
    AuctionUpdate(ServerUpdateResponse),
    /// A personal notification, delivered only to the recipient's connections.
    Notification(Notification),
}

pub type SubscriberId = usize;

/// Subscriber is an actor that handles a single websocket connection.
/// It listens to the store for updates and sends them to the client.
pub struct Subscriber {
    id:                  SubscriberId,
    closed:              bool,
    state:               Arc<ServerState>,
    notify_receiver:     broadcast::Receiver<UpdateEvent>,
    receiver:            SplitStream<WebSocket>,
    sender:              SplitSink<WebSocket, Message>,
    auction_ids:         HashSet<AuctionId>,
    ping_interval:       tokio::time::Interval,
    exit_check_interval: tokio::time::Interval,
    responded_to_ping:   bool,
    user:                UserContext,
}

const PING_INTERVAL_DURATION: Duration = Duration::from_secs(30);

fn ok_response(id: String) -> ServerResultResponse {
    ServerResultResponse {
        id:     Some(id),
        result: ServerResultMessage::Success(None),
    }
}

impl Subscriber {
    pub fn new(
        id: SubscriberId,
        state: Arc<ServerState>,
        notify_receiver: broadcast::Receiver<UpdateEvent>,
        receiver: SplitStream<WebSocket>,
        sender: SplitSink<WebSocket, Message>,
        user: UserContext,
    ) -> Self {
        Self {
            id,
            closed: false,
            state,
            notify_receiver,
            receiver,
            sender,
            auction_ids: HashSet::new(),
            ping_interval: tokio::time::interval(PING_INTERVAL_DURATION),
            exit_check_interval: tokio::time::interval(EXIT_CHECK_INTERVAL),
            responded_to_ping: true, // We start with true so we don't close the connection immediately
            user,
        }
    }

    pub async fn run(&mut self) {
        while !self.closed {
            if let Err(e) = self.handle_next().await {
                tracing::debug!(subscriber = self.id, error = ?e, "Error Handling Subscriber Message.");
                break;
            }
        }
    }

    async fn handle_next(&mut self) -> Result<()> {
        tokio::select! {
            maybe_update_event = self.notify_receiver.recv() => {
                match maybe_update_event {
                    Ok(event) => self.handle_update(event).await,
                    Err(e) => Err(anyhow!("Error receiving update event: {:?}", e)),
                }
            },
            maybe_message_or_err = self.receiver.next() => {
                self.handle_client_message(
                    maybe_message_or_err.ok_or(anyhow!("Client channel is closed"))??
                ).await
            },
            _  = self.ping_interval.tick() => {
                if !self.responded_to_ping {
                    return Err(anyhow!("Subscriber did not respond to ping. Closing connection."));
                }
                self.responded_to_ping = false;
                self.sender.send(Message::Ping(vec![])).await?;
                Ok(())
            },
            _ = self.exit_check_interval.tick() => {
                if SHOULD_EXIT.load(Ordering::Acquire) {
                    self.sender.close().await?;
                    self.closed = true;
                    return Err(anyhow!("Application is shutting down. Closing connection."));
                }
                Ok(())
            }
        }
    }

    async fn handle_auction_update(&mut self, update: ServerUpdateResponse) -> Result<()> {
        match update.auction_id() {
            Some(auction_id) if self.auction_ids.contains(&auction_id) => {}
            _ => {
                // Irrelevant update
                return Ok(());
            }
        }
        let message = serde_json::to_string(&update)?;
        self.sender.send(message.into()).await?;
        Ok(())
    }

    async fn handle_notification(&mut self, notification: Notification) -> Result<()> {
        if notification.user_id != self.user.user_id {
            // Someone else's notification
            return Ok(());
        }
        let message = serde_json::to_string(&ServerUpdateResponse::Notification { notification })?;
        self.sender.send(message.into()).await?;
        Ok(())
    }

    #[instrument(
        target = "metrics",
        fields(category = "ws_update", result = "success", name),
        skip_all
    )]
    async fn handle_update(&mut self, event: UpdateEvent) -> Result<()> {
        let result = match event {
            UpdateEvent::AuctionUpdate(update) => {
                tracing::Span::current().record("name", "auction_update");
                self.handle_auction_update(update).await
            }
            UpdateEvent::Notification(notification) => {
                tracing::Span::current().record("name", "notification");
                self.handle_notification(notification).await
            }
        };
        if result.is_err() {
            tracing::Span::current().record("result", "error");
        }
        result
    }

    /// Publishes a presence event on the auction channel. Best effort only.
    fn publish_presence(&self, update: ServerUpdateResponse) {
        if let Err(e) = self
            .state
            .store
            .ws
            .broadcast_sender
            .send(UpdateEvent::AuctionUpdate(update))
        {
            tracing::debug!(subscriber = self.id, error = ?e, "Failed to publish presence event");
        }
    }

    async fn handle_subscribe(
        &mut self,
        message_id: String,
        auction_ids: Vec<AuctionId>,
    ) -> ServerResultResponse {
        for auction_id in auction_ids {
            // Joining twice is a no-op and announces nothing.
            if self.auction_ids.insert(auction_id) {
                self.publish_presence(ServerUpdateResponse::MemberJoined {
                    auction_id,
                    user_id: self.user.user_id.clone(),
                });
            }
        }
        ok_response(message_id)
    }

    async fn handle_unsubscribe(
        &mut self,
        message_id: String,
        auction_ids: Vec<AuctionId>,
    ) -> ServerResultResponse {
        for auction_id in auction_ids {
            if self.auction_ids.remove(&auction_id) {
                self.publish_presence(ServerUpdateResponse::MemberLeft {
                    auction_id,
                    user_id: self.user.user_id.clone(),
                });
            }
        }
        ok_response(message_id)
    }

    async fn handle_place_bid(
        &mut self,
        message_id: String,
        auction_id: AuctionId,
        amount: i64,
    ) -> ServerResultResponse {
        let result = self
            .state
            .auction_service
            .place_bid(PlaceBidInput {
                auction_id,
                bidder_id: self.user.user_id.clone(),
                bidder_name: self.user.user_name.clone(),
                bidder_balance: self.user.balance,
                amount,
            })
            .await;
        match result {
            Ok(bid) => ServerResultResponse {
                id:     Some(message_id),
                result: ServerResultMessage::Success(Some(APIResponse::BidResult(BidResult {
                    status: "OK".to_string(),
                    id:     bid.id,
                }))),
            },
            Err(e) => ServerResultResponse {
                id:     Some(message_id),
                result: ServerResultMessage::Err(e.to_error_body()),
            },
        }
    }

    #[instrument(
        target = "metrics",
        fields(category = "ws_client_message", result = "success", name),
        skip_all
    )]
    async fn handle_client_message(&mut self, message: Message) -> Result<()> {
        let maybe_client_message = match message {
            Message::Close(_) => {
                // Closing the connection. Send the close message to gracefully
                // shut down the connection, otherwise the client might get an
                // abnormal Websocket closure error.
                tracing::Span::current().record("name", "close");
                if let Err(e) = self.sender.close().await {
                    tracing::Span::current().record("result", "error");
                    return Err(e.into());
                }
                self.closed = true;
                return Ok(());
            }
            Message::Text(text) => serde_json::from_str::<ClientRequest>(&text),
            Message::Binary(data) => serde_json::from_slice::<ClientRequest>(&data),
            Message::Ping(_) => {
                // Axum will send Pong automatically
                tracing::Span::current().record("name", "ping");
                return Ok(());
            }
            Message::Pong(_) => {
                tracing::Span::current().record("name", "pong");
                self.responded_to_ping = true;
                return Ok(());
            }
        };

        let response = match maybe_client_message {
            Err(e) => {
                tracing::Span::current().record("result", "error");
                ServerResultResponse {
                    id:     None,
                    result: ServerResultMessage::Err(
                        RestError::BadParameters(e.to_string()).to_error_body(),
                    ),
                }
            }
            Ok(ClientRequest { msg, id }) => match msg {
                ClientMessage::Subscribe { auction_ids } => {
                    tracing::Span::current().record("name", "subscribe");
                    self.handle_subscribe(id, auction_ids).await
                }
                ClientMessage::Unsubscribe { auction_ids } => {
                    tracing::Span::current().record("name", "unsubscribe");
                    self.handle_unsubscribe(id, auction_ids).await
                }
                ClientMessage::PlaceBid { auction_id, amount } => {
                    tracing::Span::current().record("name", "place_bid");
                    self.handle_place_bid(id, auction_id, amount).await
                }
            },
        };
        if matches!(response.result, ServerResultMessage::Err(_)) {
            tracing::Span::current().record("result", "error");
        }
        self.sender
            .send(serde_json::to_string(&response)?.into())
            .await?;
        Ok(())
    }
}
