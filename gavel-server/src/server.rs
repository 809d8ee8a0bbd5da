use {
    crate::{
        api,
        api::ws::WsState,
        auction::service::{
            workers::run_lifecycle_loop,
            Service as AuctionService,
        },
        config::{
            Config,
            RunOptions,
        },
        metrics_api,
        state::{
            ServerState,
            Store,
        },
    },
    anyhow::anyhow,
    axum_prometheus::metrics_exporter_prometheus::PrometheusBuilder,
    futures::future::join_all,
    sqlx::postgres::PgPoolOptions,
    std::{
        sync::{
            atomic::{
                AtomicBool,
                Ordering,
            },
            Arc,
        },
        time::Duration,
    },
};

const DATABASE_MAX_CONNECTIONS: u32 = 10;
const DATABASE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn start_server(run_options: RunOptions) -> anyhow::Result<()> {
    tokio::spawn(async move {
        tracing::info!("Registered shutdown signal handler...");
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shut down signal received, waiting for tasks...");
        SHOULD_EXIT.store(true, Ordering::Release);
    });

    let config = Config::load(&run_options.config.config).map_err(|err| {
        anyhow!(
            "Failed to load config from file({path}): {:?}",
            err,
            path = run_options.config.config
        )
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(DATABASE_MAX_CONNECTIONS)
        .acquire_timeout(DATABASE_CONNECT_TIMEOUT)
        .connect(&run_options.server.database_url)
        .await
        .map_err(|err| anyhow!("Failed to connect to database: {:?}", err))?;

    let metrics_recorder = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|err| anyhow!("Failed to install metrics recorder: {:?}", err))?;

    let store = Arc::new(Store {
        db: pool.clone(),
        ws: WsState::new(
            config.websocket.requester_ip_header_name.clone(),
            config.websocket.broadcast_channel_size,
        ),
        config: config.clone(),
        metrics_recorder,
    });

    let auction_service = AuctionService::new(
        pool,
        config.bidding.clone(),
        config.lifecycle.clone(),
        store.ws.broadcast_sender.clone(),
    );
    let server_state = Arc::new(ServerState {
        store:           store.clone(),
        auction_service: auction_service.clone(),
    });

    let lifecycle_loop = tokio::spawn(run_lifecycle_loop(auction_service));
    let server_loop = tokio::spawn(api::start_api(run_options.clone(), server_state));
    let metrics_loop = tokio::spawn(metrics_api::start_metrics(run_options, store));
    join_all(vec![lifecycle_loop, server_loop, metrics_loop]).await;
    Ok(())
}

// A static exit flag to indicate to running threads that we're shutting down. This is used to
// gracefully shutdown the application.
//
// NOTE: A more idiomatic approach would be to use a tokio::sync::broadcast channel, and to send a
// shutdown signal to all running tasks. However, this is a bit more complicated to implement and
// we don't rely on global state for anything else.
pub(crate) static SHOULD_EXIT: AtomicBool = AtomicBool::new(false);
pub const EXIT_CHECK_INTERVAL: Duration = Duration::from_secs(1);
