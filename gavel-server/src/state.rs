use {
    crate::{
        api::ws::WsState,
        auction::service::Service as AuctionService,
        config::Config,
    },
    axum_prometheus::metrics_exporter_prometheus::PrometheusHandle,
    sqlx::{
        Pool,
        Postgres,
    },
    std::sync::Arc,
};

pub type DB = Pool<Postgres>;

pub struct Store {
    pub db:               DB,
    pub config:           Config,
    pub ws:               WsState,
    pub metrics_recorder: PrometheusHandle,
}

pub struct ServerState {
    pub store:           Arc<Store>,
    pub auction_service: AuctionService,
}
