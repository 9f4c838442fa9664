//! Coalesced refresh scheduling.
//!
//! State-changing events request a UI refresh, but bursts (position
//! snapshots, fill history) must not redraw per event. Requests made while
//! one is pending are absorbed; the flush runs once per interval at most.
//! Without a runtime the flush runs inline, which keeps synchronous tests
//! deterministic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::trace;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Flush callback fired once per coalescing window.
pub type RefreshFlush = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    pending: Arc<AtomicBool>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request a refresh. Coalesces with any pending request.
    pub fn request(&self, flush: RefreshFlush) {
        if self.pending.swap(true, Ordering::SeqCst) {
            trace!("Refresh already pending, coalesced");
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let pending = Arc::clone(&self.pending);
                let interval = self.interval;
                handle.spawn(async move {
                    tokio::time::sleep(interval).await;
                    pending.store(false, Ordering::SeqCst);
                    flush();
                });
            }
            Err(_) => {
                self.pending.store(false, Ordering::SeqCst);
                flush();
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}
