use crate::application_port::SessionService;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Periodically removes expired sessions until `cancel` fires.
pub fn spawn_sweeper(
    session_service: Arc<dyn SessionService>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = session_service.purge_expired_sessions().await {
                        warn!(error = %e, "expired session sweep failed");
                    }
                }
            }
        }
    })
}
