use {
    super::Service,
    crate::server::{
        EXIT_CHECK_INTERVAL,
        SHOULD_EXIT,
    },
    std::sync::atomic::Ordering,
};

pub async fn run_lifecycle_loop(service: Service) -> anyhow::Result<()> {
    let mut exit_check_interval = tokio::time::interval(EXIT_CHECK_INTERVAL);
    let mut tick_interval = tokio::time::interval(service.lifecycle.tick_interval);
    tracing::info!("Starting lifecycle scheduler...");
    while !SHOULD_EXIT.load(Ordering::Acquire) {
        tokio::select! {
            _ = tick_interval.tick() => {
                service.start_auctions().await;
                service.close_auctions().await;
                service.alert_ending_soon().await;
            }
            _ = exit_check_interval.tick() => {}
        }
    }
    tracing::info!("Shutting down lifecycle scheduler...");
    service.task_tracker.close();
    service.task_tracker.wait().await;
    Ok(())
}
