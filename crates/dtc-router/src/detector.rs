//! Debounced trade-mode detection.
//!
//! Every account-bearing event votes for the mode its account implies.
//! A single stray event must never flip the pipeline's mode, so candidate
//! votes are debounced: a switch fires only after `required_consecutive`
//! votes agreeing on both mode and account inside a sliding time window.
//! Votes matching the current mode are ignored and leave the queue alone.

use dtc_core::{mode_for_account, TradeMode};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

const DEBOUNCE_WINDOW: Duration = Duration::from_millis(750);
const REQUIRED_CONSECUTIVE: usize = 2;
const CANDIDATE_CAPACITY: usize = 10;

/// Debounced mode detector. Not thread-safe on its own; the router holds
/// it behind its state mutex.
#[derive(Debug)]
pub struct ModeDetector {
    live_account: String,
    window: Duration,
    required_consecutive: usize,
    capacity: usize,
    candidates: VecDeque<(Instant, TradeMode, String)>,
}

impl ModeDetector {
    pub fn new(live_account: impl Into<String>) -> Self {
        Self::with_debounce(live_account, DEBOUNCE_WINDOW, REQUIRED_CONSECUTIVE)
    }

    pub fn with_debounce(
        live_account: impl Into<String>,
        window: Duration,
        required_consecutive: usize,
    ) -> Self {
        Self {
            live_account: live_account.into(),
            window,
            required_consecutive: required_consecutive.max(1),
            capacity: CANDIDATE_CAPACITY,
            candidates: VecDeque::with_capacity(CANDIDATE_CAPACITY),
        }
    }

    /// Classify an account string into its trade mode. Pure and total.
    pub fn detect(&self, account: &str) -> TradeMode {
        mode_for_account(account, &self.live_account)
    }

    /// Record one vote and decide whether to switch away from `current`.
    ///
    /// `quantity` is `Some` for position-scoped votes: flat positions
    /// (zero quantity) never vote. Order-scoped votes pass `None` and
    /// always count.
    pub fn should_switch(
        &mut self,
        account: &str,
        current: TradeMode,
        quantity: Option<Decimal>,
    ) -> Option<TradeMode> {
        self.should_switch_at(Instant::now(), account, current, quantity)
    }

    /// Clock-injected variant of [`should_switch`](Self::should_switch).
    /// `now` must be monotonically non-decreasing across calls.
    pub fn should_switch_at(
        &mut self,
        now: Instant,
        account: &str,
        current: TradeMode,
        quantity: Option<Decimal>,
    ) -> Option<TradeMode> {
        if quantity.is_some_and(|q| q.is_zero()) {
            return None;
        }

        let candidate = self.detect(account);
        if candidate == current {
            return None;
        }

        self.candidates
            .retain(|(ts, _, _)| now.duration_since(*ts) <= self.window);
        if self.candidates.len() == self.capacity {
            self.candidates.pop_front();
        }
        self.candidates
            .push_back((now, candidate, account.to_string()));

        let consecutive = self
            .candidates
            .iter()
            .rev()
            .take_while(|(_, m, a)| *m == candidate && a == account)
            .count();

        if consecutive >= self.required_consecutive {
            debug!(%candidate, account, consecutive, "Mode switch debounce satisfied");
            self.candidates.clear();
            Some(candidate)
        } else {
            None
        }
    }

    /// Drop all pending votes. Called on disconnect.
    pub fn reset(&mut self) {
        self.candidates.clear();
    }

    /// Number of pending candidate votes.
    pub fn pending_votes(&self) -> usize {
        self.candidates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const LIVE: &str = "120005";

    fn detector() -> ModeDetector {
        ModeDetector::new(LIVE)
    }

    #[test]
    fn test_detect_classification() {
        let d = detector();
        assert_eq!(d.detect(""), TradeMode::Debug);
        assert_eq!(d.detect(LIVE), TradeMode::Live);
        assert_eq!(d.detect("Sim1"), TradeMode::Sim);
        assert_eq!(d.detect("OtherAcct"), TradeMode::Debug);
    }

    #[test]
    fn test_single_vote_does_not_switch() {
        let mut d = detector();
        assert_eq!(d.should_switch(LIVE, TradeMode::Sim, None), None);
        assert_eq!(d.pending_votes(), 1);
    }

    #[test]
    fn test_two_consecutive_votes_switch() {
        let mut d = detector();
        let t0 = Instant::now();
        assert_eq!(d.should_switch_at(t0, LIVE, TradeMode::Sim, None), None);
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(100), LIVE, TradeMode::Sim, None),
            Some(TradeMode::Live)
        );
        // Queue cleared after commit.
        assert_eq!(d.pending_votes(), 0);
    }

    #[test]
    fn test_conflicting_candidate_breaks_consecutive_run() {
        let mut d = detector();
        let t0 = Instant::now();
        assert_eq!(d.should_switch_at(t0, LIVE, TradeMode::Debug, None), None);
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(50), "Sim1", TradeMode::Debug, None),
            None
        );
        // LIVE again: only one trailing LIVE vote, not enough.
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(100), LIVE, TradeMode::Debug, None),
            None
        );
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(150), LIVE, TradeMode::Debug, None),
            Some(TradeMode::Live)
        );
    }

    #[test]
    fn test_votes_outside_window_expire() {
        let mut d = detector();
        let t0 = Instant::now();
        assert_eq!(d.should_switch_at(t0, LIVE, TradeMode::Sim, None), None);
        // Second vote arrives after the window; the first has expired, so
        // this becomes a fresh single vote.
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(800), LIVE, TradeMode::Sim, None),
            None
        );
        assert_eq!(d.pending_votes(), 1);
    }

    #[test]
    fn test_votes_for_same_mode_different_accounts_do_not_commit() {
        let mut d = detector();
        let t0 = Instant::now();
        assert_eq!(d.should_switch_at(t0, "Sim1", TradeMode::Live, None), None);
        // Same candidate mode but a different account: no agreement yet.
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(100), "Sim2", TradeMode::Live, None),
            None
        );
        // Two votes from the same account commit.
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(200), "Sim2", TradeMode::Live, None),
            Some(TradeMode::Sim)
        );
    }

    #[test]
    fn test_pending_vote_survives_current_mode_traffic() {
        let mut d = detector();
        let t0 = Instant::now();
        assert_eq!(d.should_switch_at(t0, "Sim1", TradeMode::Live, None), None);
        // A LIVE event while in LIVE mode is ignored without disturbing
        // the pending SIM vote.
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(50), LIVE, TradeMode::Live, None),
            None
        );
        assert_eq!(d.pending_votes(), 1);
        assert_eq!(
            d.should_switch_at(t0 + Duration::from_millis(100), "Sim1", TradeMode::Live, None),
            Some(TradeMode::Sim)
        );
    }

    #[test]
    fn test_flat_position_never_votes() {
        let mut d = detector();
        let t0 = Instant::now();
        assert_eq!(
            d.should_switch_at(t0, LIVE, TradeMode::Sim, Some(Decimal::ZERO)),
            None
        );
        assert_eq!(d.pending_votes(), 0);
        // Non-flat position votes normally.
        assert_eq!(
            d.should_switch_at(t0, LIVE, TradeMode::Sim, Some(dec!(2))),
            None
        );
        assert_eq!(d.pending_votes(), 1);
    }

    #[test]
    fn test_queue_capacity_bounded() {
        let mut d = ModeDetector::with_debounce(LIVE, Duration::from_secs(60), 100);
        let t0 = Instant::now();
        for i in 0u64..25 {
            // Alternate candidates so the consecutive run never completes.
            let account = if i % 2 == 0 { LIVE } else { "Sim1" };
            d.should_switch_at(t0 + Duration::from_millis(i), account, TradeMode::Debug, None);
        }
        assert!(d.pending_votes() <= CANDIDATE_CAPACITY);
    }

    #[test]
    fn test_reset_clears_votes() {
        let mut d = detector();
        d.should_switch(LIVE, TradeMode::Sim, None);
        d.reset();
        assert_eq!(d.pending_votes(), 0);
    }
}
