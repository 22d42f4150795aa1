//! Auto-hide timer for on-screen playback controls

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Hides controls after a period of pointer inactivity.
///
/// At most one countdown runs at a time. The countdown is aborted on
/// [`cancel`](Self::cancel) and when the timer is dropped, so a stale
/// countdown can never hide controls for a torn-down session.
pub struct ControlsTimer {
    visible: Arc<AtomicBool>,
    hide_after: Duration,
    task: Option<JoinHandle<()>>,
}

impl ControlsTimer {
    pub fn new(hide_after: Duration) -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(true)),
            hide_after,
            task: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Show controls and restart the countdown
    pub fn arm(&mut self) {
        self.cancel();
        self.visible.store(true, Ordering::Relaxed);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let visible = self.visible.clone();
        let hide_after = self.hide_after;
        self.task = Some(runtime.spawn(async move {
            tokio::time::sleep(hide_after).await;
            visible.store(false, Ordering::Relaxed);
        }));
    }

    /// Stop any countdown and keep controls shown
    pub fn show(&mut self) {
        self.cancel();
        self.visible.store(true, Ordering::Relaxed);
    }

    pub fn hide_now(&mut self) {
        self.cancel();
        self.visible.store(false, Ordering::Relaxed);
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ControlsTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
