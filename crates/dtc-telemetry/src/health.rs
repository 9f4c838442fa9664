//! Log-backed health reporting.
//!
//! Default implementations of the pipeline's collaborator hooks. They
//! report through tracing only; a deployment wanting real escalation
//! swaps in its own implementations.

use dtc_core::{ErrorPolicy, HealthWatchdog};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// Error policy that logs every reported error and treats it as handled.
#[derive(Debug, Default)]
pub struct LoggingErrorPolicy;

impl ErrorPolicy for LoggingErrorPolicy {
    fn handle_error(&self, error_type: &str, category: &str, context: &str) -> bool {
        error!(error_type, category, context, "Pipeline error reported");
        true
    }
}

/// Watchdog recording the last beat per component and warning when a
/// component is queried while overdue.
#[derive(Debug)]
pub struct BeatWatchdog {
    stale_after: Duration,
    beats: Mutex<HashMap<String, Instant>>,
}

impl BeatWatchdog {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            beats: Mutex::new(HashMap::new()),
        }
    }

    /// Time since the component's last beat, if it ever beat.
    pub fn age(&self, component: &str) -> Option<Duration> {
        self.beats.lock().get(component).map(|t| t.elapsed())
    }

    /// Components whose last beat is older than the staleness threshold.
    pub fn stale_components(&self) -> Vec<String> {
        let beats = self.beats.lock();
        beats
            .iter()
            .filter(|(_, t)| t.elapsed() > self.stale_after)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Warn about every stale component. Intended to run on a timer from
    /// the application.
    pub fn check(&self) {
        for component in self.stale_components() {
            warn!(component = %component, "Component heartbeat is stale");
        }
    }
}

impl Default for BeatWatchdog {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl HealthWatchdog for BeatWatchdog {
    fn heartbeat(&self, component: &str) {
        self.beats
            .lock()
            .insert(component.to_string(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beat_updates_age() {
        let watchdog = BeatWatchdog::default();
        assert_eq!(watchdog.age("router"), None);
        watchdog.heartbeat("router");
        assert!(watchdog.age("router").unwrap() < Duration::from_secs(1));
    }

    #[test]
    fn test_stale_detection() {
        let watchdog = BeatWatchdog::new(Duration::ZERO);
        watchdog.heartbeat("connection");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(watchdog.stale_components(), vec!["connection".to_string()]);
    }

    #[test]
    fn test_fresh_component_not_stale() {
        let watchdog = BeatWatchdog::new(Duration::from_secs(60));
        watchdog.heartbeat("router");
        assert!(watchdog.stale_components().is_empty());
    }

    #[test]
    fn test_logging_policy_handles_everything() {
        let policy = LoggingErrorPolicy;
        assert!(policy.handle_error("decode", "data", "frame 3"));
    }
}
