//! Background loop pruning errored and idle tasks

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::registry::{TaskRegistry, WeakTaskRegistry};

/// Periodic scan over the registry.
///
/// Holds only a weak handle, so the loop ends once the registry is dropped.
pub struct StaleReaper {
    registry: WeakTaskRegistry,
    interval: Duration,
}

impl StaleReaper {
    pub fn new(registry: &TaskRegistry) -> Self {
        Self {
            registry: registry.downgrade(),
            interval: registry.config().reap_interval(),
        }
    }

    /// Spawn the loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tracing::info!(
            "Stale task reaper started (every {}s)",
            self.interval.as_secs()
        );
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(registry) = self.registry.upgrade() else {
                tracing::debug!("Task registry dropped, reaper exiting");
                break;
            };

            let removed = registry.reap_stale();
            if !removed.is_empty() {
                tracing::debug!("Reaped tasks: {:?}", removed);
            }
        }
    }
}
