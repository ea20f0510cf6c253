//! Machine watchdog
//!
//! Every socket pings its machine, and any inbound frame (pongs included)
//! refreshes activity. The watchdog periodically drops connections that have
//! been silent for longer than the idle timeout, i.e. machines that stopped
//! answering. Dropping the registry entry closes the writer channel, which in
//! turn ends the socket task.

use std::time::Duration;

use tracing::{info, warn};

use crate::config::MachinesConfig;
use crate::shared::shutdown::ShutdownSignal;

use super::registry::SharedConnectionRegistry;

pub struct MachineWatchdog {
    registry: SharedConnectionRegistry,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

impl MachineWatchdog {
    pub fn new(registry: SharedConnectionRegistry, config: &MachinesConfig) -> Self {
        Self {
            registry,
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }

    /// One pass; returns how many machines were evicted.
    pub fn sweep(&self) -> usize {
        let evicted = self
            .registry
            .evict_stale(self.idle_timeout.as_secs() as i64);
        if !evicted.is_empty() {
            warn!(
                count = evicted.len(),
                idle_timeout_secs = self.idle_timeout.as_secs(),
                "Evicted idle machines"
            );
        }
        evicted.len()
    }

    /// Run until shutdown. Does nothing when the idle timeout is zero.
    pub fn start(self, shutdown: ShutdownSignal) -> Option<tokio::task::JoinHandle<()>> {
        if self.idle_timeout.is_zero() {
            info!("Machine idle eviction disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            info!(
                idle_timeout_secs = self.idle_timeout.as_secs(),
                sweep_interval_secs = self.sweep_interval.as_secs(),
                "Machine watchdog started"
            );
            let mut interval = tokio::time::interval(self.sweep_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.sweep();
                    }
                    _ = shutdown.wait() => {
                        info!("Machine watchdog stopped");
                        break;
                    }
                }
            }
        }))
    }
}
