//! Periodic connectivity probe against the remote API

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::sync::remote::RemoteApi;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Shared connectivity flags
#[derive(Default)]
struct HealthState {
    connected: AtomicBool,
    probes: AtomicU64,
}

/// Background task that pings `/health` on an interval.
///
/// The flag is advisory only; mutations never wait on it. The probe task is
/// aborted when the monitor is dropped.
pub struct HealthMonitor {
    state: Arc<HealthState>,
    handle: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start probing immediately, then every `interval` (at least one second)
    pub fn start(remote: Arc<dyn RemoteApi>, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let state = Arc::new(HealthState::default());
        let task_state = state.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let healthy = match remote.health().await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!("Health probe failed: {}", e);
                        false
                    }
                };
                task_state.probes.fetch_add(1, Ordering::Relaxed);
                let was = task_state.connected.swap(healthy, Ordering::Relaxed);
                if was != healthy {
                    if healthy {
                        tracing::info!("Remote API reachable");
                    } else {
                        tracing::warn!("Remote API unreachable");
                    }
                }
            }
        });

        Self { state, handle }
    }

    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Relaxed)
    }

    /// Number of probes completed so far
    pub fn probes(&self) -> u64 {
        self.state.probes.load(Ordering::Relaxed)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
