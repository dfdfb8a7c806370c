//! Heartbeat monitor
//!
//! Each sweep pings every live connection and clears its liveness flag.
//! A connection whose flag is still clear at the next sweep never answered
//! and gets terminated and purged. The sweep always covers every connection.

use std::time::Duration;

use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::registry::ConnectionRegistry;
use crate::room::RoomDirectory;
use crate::types::ClientId;

/// Outcome of one sweep
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections that were sent a probe
    pub probed: usize,
    /// Connections terminated for missing the previous probe
    pub terminated: Vec<ClientId>,
}

#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Timer for the hub loop; the first tick fires one interval from now
    pub fn ticker(&self) -> Interval {
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Run one heartbeat cycle over every registered connection
    pub fn sweep(&self, registry: &mut ConnectionRegistry, rooms: &mut RoomDirectory) -> SweepReport {
        let mut report = SweepReport::default();

        for id in registry.ids() {
            let Some(conn) = registry.get_mut(&id) else {
                continue;
            };

            if !conn.is_alive {
                info!("Client {} missed heartbeat, terminating", id);
                conn.terminate();
                registry.purge(id, rooms);
                report.terminated.push(id);
                continue;
            }

            conn.is_alive = false;
            if let Err(e) = conn.ping() {
                warn!("Heartbeat ping to {} failed: {}", id, e);
            }
            report.probed += 1;
        }

        debug!(
            "Heartbeat: probed {}, terminated {}",
            report.probed,
            report.terminated.len()
        );
        report
    }
}
