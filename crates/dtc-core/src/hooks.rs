//! Collaborator hook traits.
//!
//! The pipeline reports failures to an external error-policy engine and
//! liveness to an external health watchdog. Both are optional: routing must
//! work identically when no collaborator is wired in. The traits carry the
//! exact call surface the collaborators expose; retry/escalation logic and
//! the watchdog monitor loop live behind them, outside this workspace.

/// Error-policy engine consumed by the router and transport.
pub trait ErrorPolicy: Send + Sync {
    /// Report an error occurrence.
    ///
    /// Returns true when the collaborator considers the error handled
    /// (recovered or intentionally suppressed).
    fn handle_error(&self, error_type: &str, category: &str, context: &str) -> bool;
}

/// Health watchdog consumed by long-lived components.
pub trait HealthWatchdog: Send + Sync {
    /// Record a liveness beat for the named component.
    fn heartbeat(&self, component: &str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPolicy(AtomicUsize);

    impl ErrorPolicy for CountingPolicy {
        fn handle_error(&self, _error_type: &str, _category: &str, _context: &str) -> bool {
            self.0.fetch_add(1, Ordering::Relaxed);
            true
        }
    }

    #[test]
    fn test_trait_is_object_safe() {
        let policy: Box<dyn ErrorPolicy> = Box::new(CountingPolicy(AtomicUsize::new(0)));
        assert!(policy.handle_error("decode", "data", "frame 12"));
    }
}
