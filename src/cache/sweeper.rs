//! Background task that periodically purges expired cache entries.

use super::manager::CacheService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic expiry sweeper for a [`CacheService`].
pub struct ExpirySweeper {
    cache: Arc<CacheService>,
    interval: Duration,
}

/// Handle to a running sweeper. Dropping it also stops the task, but only
/// [`SweeperHandle::shutdown`] waits for the current pass to finish.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ExpirySweeper {
    /// Intervals shorter than a millisecond are raised to one.
    pub fn new(cache: Arc<CacheService>, interval: Duration) -> Self {
        Self {
            cache,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Spawn the sweep loop. The first pass runs one full interval after start.
    pub fn start(self) -> SweeperHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            info!("Starting cache expiry sweeper with interval: {:?}", self.interval);

            let mut interval = time::interval_at(time::Instant::now() + self.interval, self.interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = self.cache.cleanup_expired().await;
                        debug!("Expiry sweep removed {} entries", removed);
                    }
                    changed = shutdown_rx.changed() => {
                        // A closed channel means the handle is gone; stop as well
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Cache expiry sweeper stopped");
        });

        SweeperHandle { shutdown, task }
    }
}

impl SweeperHandle {
    /// Signal the sweeper to stop and wait for it to finish its current pass.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
