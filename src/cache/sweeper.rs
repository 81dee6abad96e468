use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use super::store::ResultCache;

/// Handle to a running sweeper task. Dropping it without calling [`stop`]
/// leaves the sweeper running in the background — callers that want an
/// orderly shutdown must call `stop` explicitly.
pub struct SweeperHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for the current sweep (if
    /// any) to finish before returning. The stop signal is only checked
    /// between sweeps — the lock is never held while waiting on it, so
    /// this cannot deadlock with an in-progress sweep.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.join.await;
    }
}

/// Spawns the background sweeper: wakes every `period`, invokes
/// `cache.delete_stale(expire_threshold)`, and repeats until stopped.
pub fn spawn(cache: ResultCache, period: Duration, expire_threshold: Duration) -> SweeperHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let mut ticker = time::interval(period);
        ticker.tick().await; // first tick fires immediately; consume it up front

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = cache.delete_stale(expire_threshold).await;
                    debug!(removed, "cache sweep complete");
                }
                _ = &mut stop_rx => {
                    info!("cache sweeper stopping");
                    break;
                }
            }
        }
    });

    SweeperHandle { stop_tx, join }
}
