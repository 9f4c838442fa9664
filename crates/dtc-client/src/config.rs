//! Application configuration.

use crate::error::{AppError, AppResult};
use dtc_core::TradeMode;
use dtc_router::RouterConfig;
use dtc_transport::ConnectionConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Connection section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// DTC server hostname.
    #[serde(default = "default_host")]
    pub host: String,
    /// DTC server port.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Client name advertised in the logon request.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Heartbeat interval advertised to the server (seconds). Default: 5.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    11099
}

fn default_client_name() -> String {
    "dtc-pipeline".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    5
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            client_name: default_client_name(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

/// A known-phantom position the server keeps replaying. Snapshots matching
/// an entry exactly are dropped by the router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhantomPositionEntry {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
}

/// Routing section of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// Account treated as LIVE.
    #[serde(default)]
    pub live_account: String,
    /// Phantom position table, usually empty.
    #[serde(default)]
    pub phantom_positions: Vec<PhantomPositionEntry>,
    /// Modes whose pushed balances are ignored while current. Default: SIM,
    /// whose balance the pipeline tracks itself.
    #[serde(default = "default_ignore_balance_modes")]
    pub ignore_external_balance_modes: Vec<TradeMode>,
    /// Consumer refresh coalescing window (ms). Default: 100.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

fn default_ignore_balance_modes() -> Vec<TradeMode> {
    vec![TradeMode::Sim]
}

fn default_refresh_interval_ms() -> u64 {
    100
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            live_account: String::new(),
            phantom_positions: Vec::new(),
            ignore_external_balance_modes: default_ignore_balance_modes(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

/// Market data subscription target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataTarget {
    pub symbol: String,
    #[serde(default)]
    pub exchange: String,
}

/// Probe section: what to request once the session is up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Whether to run the startup probe at all. Default: true.
    #[serde(default = "default_probe_enabled")]
    pub enabled: bool,
    /// Days of fill history to request per account. Default: 30.
    #[serde(default = "default_fill_history_days")]
    pub fill_history_days: u32,
    /// Symbols to subscribe market data for.
    #[serde(default)]
    pub market_data: Vec<MarketDataTarget>,
}

fn default_probe_enabled() -> bool {
    true
}

fn default_fill_history_days() -> u32 {
    30
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            enabled: default_probe_enabled(),
            fill_history_days: default_fill_history_days(),
            market_data: Vec::new(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub probe: ProbeSettings,
}

impl AppConfig {
    /// Load configuration, falling back to defaults when the file does not
    /// exist. The path comes from `DTC_CONFIG` unless overridden.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("DTC_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.connection.host.clone(),
            port: self.connection.port,
            username: self.connection.username.clone(),
            password: self.connection.password.clone(),
            client_name: self.connection.client_name.clone(),
            heartbeat_interval_secs: self.connection.heartbeat_interval_secs,
            ..Default::default()
        }
    }

    pub fn router_config(&self) -> RouterConfig {
        let phantom_positions: HashMap<String, (Decimal, Decimal)> = self
            .routing
            .phantom_positions
            .iter()
            .map(|p| (p.symbol.clone(), (p.quantity, p.average_price)))
            .collect();
        let ignore_external_balance_modes: HashSet<TradeMode> = self
            .routing
            .ignore_external_balance_modes
            .iter()
            .copied()
            .collect();

        RouterConfig {
            live_account: self.routing.live_account.clone(),
            phantom_positions,
            ignore_external_balance_modes,
            refresh_interval: Duration::from_millis(self.routing.refresh_interval_ms),
        }
    }
}
