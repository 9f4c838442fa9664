//! Message routing.
//!
//! One `route` call per inbound frame: classify, run mode evaluation and
//! validity filters, update session state, then dispatch to consumers
//! exactly once each. All mutable state sits behind a single mutex; hooks
//! are dispatched after the lock is released so consumer code can never
//! deadlock against the router.

use crate::classifier::classify;
use crate::consumer::{DispatchReport, EventConsumer};
use crate::detector::ModeDetector;
use crate::refresh::{RefreshFlush, RefreshScheduler, DEFAULT_REFRESH_INTERVAL};
use crate::session::{OpenPosition, SessionSnapshot, SessionState};
use chrono::Utc;
use dtc_core::{
    AccountBalanceUpdate, DtcEvent, ErrorPolicy, HealthWatchdog, OrderUpdate, PositionUpdate,
    TradeMode,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Router configuration.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Account treated as LIVE. Everything starting with "Sim" is SIM;
    /// the rest is DEBUG.
    pub live_account: String,
    /// Known-phantom position snapshots, symbol -> (quantity, average
    /// price). A position event matching an entry exactly is dropped.
    pub phantom_positions: HashMap<String, (Decimal, Decimal)>,
    /// Modes whose externally pushed balances are ignored while that mode
    /// is the current one (the pipeline tracks those balances itself).
    pub ignore_external_balance_modes: HashSet<TradeMode>,
    /// Coalescing window for consumer refresh.
    pub refresh_interval: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            live_account: String::new(),
            phantom_positions: HashMap::new(),
            ignore_external_balance_modes: HashSet::from([TradeMode::Sim]),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

struct RouterInner {
    detector: ModeDetector,
    session: SessionState,
}

/// Outcome of mode evaluation for one account-bearing event, computed
/// under the state lock.
enum ModeOutcome {
    /// No switch; keep routing.
    Stay,
    /// Switch committed; consumers must be told before the event itself.
    Switched { mode: TradeMode, account: String },
    /// Switch blocked by the precedence gate; the event is dropped.
    Blocked { candidate: TradeMode, holder: TradeMode },
}

/// Event router and session owner.
pub struct MessageRouter {
    config: RouterConfig,
    consumers: Arc<Vec<Arc<dyn EventConsumer>>>,
    inner: Mutex<RouterInner>,
    refresh: RefreshScheduler,
    flush: RefreshFlush,
    error_policy: Option<Arc<dyn ErrorPolicy>>,
    watchdog: Option<Arc<dyn HealthWatchdog>>,
    raw_hook: Option<RawFrameHook>,
}

/// Catch-all observer for frames no typed consumer will ever see.
pub type RawFrameHook = Arc<dyn Fn(&Value) + Send + Sync>;

impl MessageRouter {
    pub fn new(config: RouterConfig, consumers: Vec<Arc<dyn EventConsumer>>) -> Self {
        let consumers = Arc::new(consumers);
        let flush_targets = Arc::clone(&consumers);
        let flush: RefreshFlush = Arc::new(move || {
            for consumer in flush_targets.iter() {
                if let Err(e) = consumer.update() {
                    warn!(consumer = consumer.name(), error = %e, "Refresh update failed");
                }
            }
        });

        Self {
            refresh: RefreshScheduler::new(config.refresh_interval),
            inner: Mutex::new(RouterInner {
                detector: ModeDetector::new(config.live_account.clone()),
                session: SessionState::new(),
            }),
            config,
            consumers,
            flush,
            error_policy: None,
            watchdog: None,
            raw_hook: None,
        }
    }

    pub fn with_error_policy(mut self, policy: Arc<dyn ErrorPolicy>) -> Self {
        self.error_policy = Some(policy);
        self
    }

    pub fn with_watchdog(mut self, watchdog: Arc<dyn HealthWatchdog>) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    /// Observe frames that classify as unknown.
    pub fn with_raw_hook(mut self, hook: RawFrameHook) -> Self {
        self.raw_hook = Some(hook);
        self
    }

    /// Current mode.
    pub fn mode(&self) -> TradeMode {
        self.inner.lock().session.mode()
    }

    /// Read-only session copy.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().session.snapshot()
    }

    /// Drop pending mode votes. Called when the connection goes away so a
    /// stale vote cannot combine with a fresh one after reconnect.
    pub fn reset_detector(&self) {
        self.inner.lock().detector.reset();
    }

    /// Route one raw frame end to end.
    pub fn route(&self, raw: Value) -> DispatchReport {
        if let Some(watchdog) = &self.watchdog {
            watchdog.heartbeat("router");
        }

        match classify(raw) {
            DtcEvent::Logon(resp) => {
                if resp.is_success() {
                    info!(server = %resp.server_name, "Logon accepted");
                } else {
                    error!(result = resp.result, text = %resp.result_text, "Logon rejected");
                    self.report_error("logon_rejected", "session", &resp.result_text);
                }
                self.dispatch("on_logon", |c| c.on_logon(&resp))
            }
            DtcEvent::Heartbeat(hb) => {
                if let Some(watchdog) = &self.watchdog {
                    watchdog.heartbeat("connection");
                }
                self.dispatch("on_heartbeat", |c| c.on_heartbeat(&hb))
            }
            DtcEvent::TradeAccount(ta) => {
                if !ta.trade_account.is_empty() {
                    let mut inner = self.inner.lock();
                    if inner.session.account().is_empty() {
                        info!(account = %ta.trade_account, "Trade account discovered");
                        inner.session.set_account(&ta.trade_account);
                    }
                }
                self.dispatch("on_trade_account", |c| c.on_trade_account(&ta))
            }
            DtcEvent::Balance(bal) => self.route_balance(&bal),
            DtcEvent::Position(pos) => self.route_position(&pos),
            DtcEvent::Order(order) => self.route_order(&order),
            DtcEvent::OrderFill(fill) => {
                let report = self.dispatch("on_order_fill", |c| c.on_order_fill(&fill));
                self.request_refresh();
                report
            }
            DtcEvent::MarketTrade(tick) => self.dispatch("on_market_trade", |c| c.on_market_trade(&tick)),
            DtcEvent::MarketBidAsk(tick) => {
                self.dispatch("on_market_bid_ask", |c| c.on_market_bid_ask(&tick))
            }
            DtcEvent::SecurityDefinition(def) => {
                self.dispatch("on_security_definition", |c| c.on_security_definition(&def))
            }
            DtcEvent::Reject(reject) => {
                warn!(request_id = reject.request_id, text = %reject.reject_text, "Request rejected");
                self.report_error("reject", "server", &reject.reject_text);
                self.dispatch("on_reject", |c| c.on_reject(&reject))
            }
            DtcEvent::Unknown(value) => {
                debug!(frame = %value, "Unroutable frame");
                if let Some(hook) = &self.raw_hook {
                    hook(&value);
                }
                DispatchReport::dropped()
            }
        }
    }

    fn route_order(&self, order: &OrderUpdate) -> DispatchReport {
        let outcome = self.evaluate_mode(&order.trade_account, None);
        let mut report = DispatchReport::default();

        match outcome {
            ModeOutcome::Blocked { candidate, holder } => {
                warn!(
                    %candidate,
                    %holder,
                    account = %order.trade_account,
                    symbol = %order.symbol,
                    "Order dropped: mode switch blocked by open position"
                );
                return DispatchReport::dropped();
            }
            ModeOutcome::Switched { mode, account } => {
                report.merge(self.commit_mode(mode, &account));
            }
            ModeOutcome::Stay => {}
        }

        report.merge(self.dispatch("on_order", |c| c.on_order(order)));
        self.request_refresh();
        report
    }

    fn route_position(&self, pos: &PositionUpdate) -> DispatchReport {
        let outcome = self.evaluate_mode(&pos.trade_account, Some(pos.quantity));
        let mut report = DispatchReport::default();

        match outcome {
            ModeOutcome::Blocked { candidate, holder } => {
                warn!(
                    %candidate,
                    %holder,
                    account = %pos.trade_account,
                    symbol = %pos.symbol,
                    "Position dropped: mode switch blocked by open position"
                );
                return DispatchReport::dropped();
            }
            ModeOutcome::Switched { mode, account } => {
                report.merge(self.commit_mode(mode, &account));
            }
            ModeOutcome::Stay => {}
        }

        // Zero quantity closes the position; nothing further to dispatch.
        if pos.is_flat() {
            let removed = self.inner.lock().session.clear_position(&pos.symbol);
            if removed {
                debug!(symbol = %pos.symbol, "Position closed");
                report.merge(self.dispatch("on_position_closed", |c| {
                    c.on_position_closed(&pos.symbol)
                }));
                self.request_refresh();
            }
            return report;
        }

        if !pos.has_reference_price() {
            warn!(symbol = %pos.symbol, quantity = %pos.quantity, "Dropping stale position without price");
            report.dropped = true;
            return report;
        }

        if let Some((qty, price)) = self.config.phantom_positions.get(&pos.symbol) {
            if pos.quantity == *qty && pos.average_price == Some(*price) {
                warn!(symbol = %pos.symbol, quantity = %qty, "Dropping known phantom position");
                report.dropped = true;
                return report;
            }
        }

        {
            let mut inner = self.inner.lock();
            let mode = inner.detector.detect(&pos.trade_account);
            // has_reference_price checked above; default never used.
            let average_price = pos.average_price.unwrap_or_default();
            inner.session.upsert_position(OpenPosition {
                symbol: pos.symbol.clone(),
                quantity: pos.quantity,
                average_price,
                account: pos.trade_account.clone(),
                mode,
                updated_at: Utc::now(),
            });
        }

        report.merge(self.dispatch("on_position", |c| c.on_position(pos)));
        self.request_refresh();
        report
    }

    fn route_balance(&self, bal: &AccountBalanceUpdate) -> DispatchReport {
        let Some(balance) = bal.balance() else {
            warn!(account = %bal.trade_account, "Dropping balance update without a balance figure");
            return DispatchReport::dropped();
        };

        let (mode, current, store) = {
            let mut inner = self.inner.lock();
            let mode = inner.detector.detect(&bal.trade_account);
            let current = inner.session.mode();
            let ignored =
                self.config.ignore_external_balance_modes.contains(&mode) && mode == current;
            if ignored {
                debug!(%mode, account = %bal.trade_account, "Ignoring external balance for current mode");
            } else {
                inner.session.record_balance(mode, balance);
            }
            (mode, current, !ignored)
        };

        if !store {
            return DispatchReport::dropped();
        }

        let report = if mode == current {
            self.dispatch("on_balance", |c| c.on_balance(mode, bal))
        } else {
            // Stored for later; not the active mode, so nothing to render.
            debug!(%mode, %current, "Balance stored for inactive mode");
            DispatchReport::default()
        };
        self.request_refresh();
        report
    }

    /// Run drift detection and the debounced mode evaluation for one
    /// account-bearing event. State lock held for the whole decision so
    /// vote, gate check, and commit see one consistent session.
    fn evaluate_mode(&self, account: &str, quantity: Option<Decimal>) -> ModeOutcome {
        let mut inner = self.inner.lock();
        let current = inner.session.mode();

        let implied = inner.detector.detect(account);
        {
            let current_account = inner.session.account();
            if account_drifted(implied, current, account, current_account) {
                warn!(
                    %implied,
                    %current,
                    account,
                    current_account,
                    "Event account disagrees with the active session"
                );
            }
        }

        let Some(candidate) = inner.detector.should_switch(account, current, quantity) else {
            return ModeOutcome::Stay;
        };

        if let Some(holder) = inner.session.blocked_by_open_position(candidate) {
            return ModeOutcome::Blocked { candidate, holder };
        }

        inner.session.set_mode(candidate, account);
        ModeOutcome::Switched {
            mode: candidate,
            account: account.to_string(),
        }
    }

    /// Announce a committed switch. Runs before the triggering event's own
    /// hook so consumers never see an event from a mode they were not told
    /// about.
    fn commit_mode(&self, mode: TradeMode, account: &str) -> DispatchReport {
        info!(%mode, account, "Trading mode switched");
        self.dispatch("set_trading_mode", |c| c.set_trading_mode(mode, account))
    }

    fn dispatch<F>(&self, operation: &'static str, hook: F) -> DispatchReport
    where
        F: Fn(&dyn EventConsumer) -> crate::error::RouterResult<()>,
    {
        let mut report = DispatchReport::default();
        for consumer in self.consumers.iter() {
            let result = hook(consumer.as_ref());
            if let Err(e) = &result {
                error!(consumer = consumer.name(), operation, error = %e, "Consumer hook failed");
                self.report_error("consumer_failure", "dispatch", consumer.name());
            }
            report.record(consumer.name(), operation, result);
        }
        report
    }

    fn request_refresh(&self) {
        self.refresh.request(Arc::clone(&self.flush));
    }

    fn report_error(&self, error_type: &str, category: &str, context: &str) {
        if let Some(policy) = &self.error_policy {
            let handled = policy.handle_error(error_type, category, context);
            if !handled {
                error!(error_type, category, context, "Error policy left error unhandled");
            }
        }
    }
}

/// An event drifts when its (mode, account) pair disagrees with the active
/// session. Warn-only; never blocks routing.
fn account_drifted(
    implied: TradeMode,
    current: TradeMode,
    account: &str,
    current_account: &str,
) -> bool {
    !account.is_empty() && (implied != current || account != current_account)
}
