//! Application wiring and main loop.
//!
//! Owns the connection, the router, and the probe sequence: once the
//! server accepts the logon, the application enumerates trade accounts and
//! requests the state snapshot for each one (positions, working orders,
//! fill history, balance) before live events start flowing through the
//! router.

use crate::config::AppConfig;
use crate::consumers::LogConsumer;
use crate::error::AppResult;
use dtc_core::event::kind_for_discriminant;
use dtc_core::EventKind;
use dtc_router::{EventConsumer, MessageRouter};
use dtc_telemetry::{BeatWatchdog, LoggingErrorPolicy};
use dtc_transport::{request, DisconnectHook, DtcConnection};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

const FRAME_CHANNEL_CAPACITY: usize = 1024;

/// The DTC pipeline application.
pub struct Application {
    config: AppConfig,
    /// Extra consumers wired in before `run` (tests, alternative UIs).
    extra_consumers: Vec<Arc<dyn EventConsumer>>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        Ok(Self {
            config,
            extra_consumers: Vec::new(),
        })
    }

    /// Register an additional consumer ahead of `run`.
    pub fn add_consumer(&mut self, consumer: Arc<dyn EventConsumer>) {
        self.extra_consumers.push(consumer);
    }

    /// Connect and run until shutdown or disconnect.
    pub async fn run(&mut self) -> AppResult<()> {
        let (frame_tx, mut frame_rx) = mpsc::channel::<Value>(FRAME_CHANNEL_CAPACITY);

        let mut consumers: Vec<Arc<dyn EventConsumer>> = vec![Arc::new(LogConsumer)];
        consumers.extend(self.extra_consumers.iter().cloned());

        let router = Arc::new(
            MessageRouter::new(self.config.router_config(), consumers)
                .with_error_policy(Arc::new(LoggingErrorPolicy))
                .with_watchdog(Arc::new(BeatWatchdog::default())),
        );

        // A stale vote must not survive into the next session.
        let on_disconnect: DisconnectHook = {
            let router = Arc::clone(&router);
            Box::new(move || router.reset_detector())
        };

        let conn =
            DtcConnection::connect(self.config.connection_config(), frame_tx, Some(on_disconnect))
                .await?;

        let mut probed_accounts: HashSet<String> = HashSet::new();

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Shutdown signal listener failed");
                    }
                    info!("Shutdown requested");
                    conn.close("shutdown requested").await;
                    break;
                }
                frame = frame_rx.recv() => {
                    let Some(frame) = frame else {
                        info!("Connection closed, exiting main loop");
                        break;
                    };
                    self.advance_probe(&conn, &frame, &mut probed_accounts).await;
                    let report = router.route(frame);
                    if !report.is_success() {
                        warn!(failures = report.failures.len(), "Consumer dispatch had failures");
                    }
                }
            }
        }

        Ok(())
    }

    /// Drive the startup probe from inbound frames. Send failures are
    /// logged and skipped; the receive loop notices a dead socket on its
    /// own.
    async fn advance_probe(
        &self,
        conn: &DtcConnection,
        frame: &Value,
        probed_accounts: &mut HashSet<String>,
    ) {
        if !self.config.probe.enabled {
            return;
        }
        let Some(kind) = frame.get("Type").map(kind_for_discriminant) else {
            return;
        };

        match kind {
            EventKind::LogonResponse => {
                let accepted = frame.get("Result").and_then(Value::as_i64) == Some(1);
                if !accepted {
                    return;
                }
                self.send_probe(conn, request::trade_accounts_request(conn.next_request_id()))
                    .await;
                for (idx, target) in self.config.probe.market_data.iter().enumerate() {
                    let symbol_id = i32::try_from(idx).unwrap_or(i32::MAX).saturating_add(1);
                    self.send_probe(
                        conn,
                        request::market_data_request(symbol_id, &target.symbol, &target.exchange),
                    )
                    .await;
                    self.send_probe(
                        conn,
                        request::security_definition_request(
                            conn.next_request_id(),
                            &target.symbol,
                            &target.exchange,
                        ),
                    )
                    .await;
                }
            }
            EventKind::TradeAccountResponse => {
                let Some(account) = frame
                    .get("TradeAccount")
                    .and_then(Value::as_str)
                    .filter(|a| !a.is_empty())
                else {
                    return;
                };
                if !probed_accounts.insert(account.to_string()) {
                    return;
                }
                info!(account, "Probing account state");
                self.send_probe(
                    conn,
                    request::current_positions_request(conn.next_request_id(), account),
                )
                .await;
                self.send_probe(
                    conn,
                    request::open_orders_request(conn.next_request_id(), account),
                )
                .await;
                self.send_probe(
                    conn,
                    request::historical_order_fills_request(
                        conn.next_request_id(),
                        account,
                        self.config.probe.fill_history_days,
                    ),
                )
                .await;
                self.send_probe(
                    conn,
                    request::account_balance_request(conn.next_request_id(), account),
                )
                .await;
            }
            _ => {}
        }
    }

    async fn send_probe(&self, conn: &DtcConnection, req: Value) {
        if let Err(e) = conn.send(&req).await {
            warn!(error = %e, request = %req, "Probe request failed to send");
        }
    }
}
