//! Standalone metrics listener.
//!
//! Renders the shared Prometheus recorder over `/metrics` on its own port,
//! keeping scrape traffic off the public API listener.
use {
    crate::{
        config::RunOptions,
        server::{
            EXIT_CHECK_INTERVAL,
            SHOULD_EXIT,
        },
        state::Store,
    },
    anyhow::Result,
    axum::{
        routing::get,
        Router,
    },
    axum_prometheus::PrometheusMetricLayerBuilder,
    std::sync::{
        atomic::Ordering,
        Arc,
    },
};

pub async fn start_metrics(run_options: RunOptions, store: Arc<Store>) -> Result<()> {
    let (_, metrics_handle) = PrometheusMetricLayerBuilder::new()
        .with_metrics_from_fn(move || store.metrics_recorder.clone())
        .build_pair();

    let app = Router::new().route(
        "/metrics",
        get(move || async move { metrics_handle.render() }),
    );

    tracing::info!(
        metrics_addr = %run_options.server.metrics_addr,
        "Starting metrics server..."
    );
    let listener = tokio::net::TcpListener::bind(&run_options.server.metrics_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            while !SHOULD_EXIT.load(Ordering::Acquire) {
                tokio::time::sleep(EXIT_CHECK_INTERVAL).await;
            }
            tracing::info!("Shutting down metrics server...");
        })
        .await?;
    Ok(())
}
