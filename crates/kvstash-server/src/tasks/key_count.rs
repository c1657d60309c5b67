//! Periodic copy of the store size into the `total_keys` gauge.
//!
//! The task is started once at boot and stopped through a `watch` channel
//! during graceful shutdown; `KeyCountRefresher::shutdown` waits for it to exit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use kvstash_core::GuardedMap;

use crate::obs::KvMetrics;

/// Handle to the running refresher.
pub struct KeyCountRefresher {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl KeyCountRefresher {
    /// Signal the task to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "key count refresher did not stop cleanly");
        }
    }
}

/// Copy the current key count into the gauge. Takes the read lock only.
pub fn refresh_total_keys(store: &GuardedMap, metrics: &KvMetrics) {
    let n = store.len();
    metrics.total_keys.set(i64::try_from(n).unwrap_or(i64::MAX));
    tracing::debug!(total_keys = n, "refreshed key count");
}

/// Spawn the refresher on the current Tokio runtime.
///
/// The first refresh happens one full `interval` after start.
pub fn spawn_key_count_refresher(
    store: Arc<GuardedMap>,
    metrics: Arc<KvMetrics>,
    interval: Duration,
) -> KeyCountRefresher {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(run(store, metrics, interval, shutdown_rx));
    KeyCountRefresher { shutdown_tx, handle }
}

async fn run(
    store: Arc<GuardedMap>,
    metrics: Arc<KvMetrics>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // interval() fires immediately; skip it.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh_total_keys(&store, &metrics);
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("key count refresher stopped");
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn refreshes_on_each_tick_and_stops() {
        let store = Arc::new(GuardedMap::new());
        let metrics = Arc::new(KvMetrics::default());
        let refresher = spawn_key_count_refresher(
            Arc::clone(&store),
            Arc::clone(&metrics),
            Duration::from_secs(60),
        );

        store.set("a", "1");
        store.set("b", "2");
        // Not refreshed before the first interval elapses.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(metrics.total_keys.get(), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(metrics.total_keys.get(), 2);

        store.set("c", "3");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(metrics.total_keys.get(), 3);

        refresher.shutdown().await;

        store.set("d", "4");
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(metrics.total_keys.get(), 3);
    }

    #[test]
    fn refresh_reads_store_len() {
        let store = GuardedMap::new();
        let metrics = KvMetrics::default();
        store.set("x", "");
        refresh_total_keys(&store, &metrics);
        assert_eq!(metrics.total_keys.get(), 1);
    }
}
