//! Trading mode classification.
//!
//! The pipeline operates in exactly one mode at a time. Modes are totally
//! ordered by precedence: LIVE > SIM > DEBUG. LIVE can always be entered;
//! entry into a lower-precedence mode is blocked while a higher-precedence
//! mode holds an open position.

use serde::{Deserialize, Serialize};

/// Mutually exclusive operating context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeMode {
    /// Real-money trading against the configured live account.
    Live,
    /// Paper trading ("Sim*" accounts).
    Sim,
    /// Development/testing fallback for empty or unrecognized accounts.
    Debug,
}

impl TradeMode {
    /// Precedence rank. Higher wins.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Live => 2,
            Self::Sim => 1,
            Self::Debug => 0,
        }
    }

    /// True when `self` outranks `other`.
    #[must_use]
    pub fn outranks(&self, other: TradeMode) -> bool {
        self.precedence() > other.precedence()
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    #[must_use]
    pub fn is_sim(&self) -> bool {
        matches!(self, Self::Sim)
    }

    /// Human-readable name for log/UI surfaces.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Live => "Live Trading",
            Self::Sim => "Paper Trading",
            Self::Debug => "Debug Mode",
        }
    }
}

impl std::fmt::Display for TradeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "LIVE"),
            Self::Sim => write!(f, "SIM"),
            Self::Debug => write!(f, "DEBUG"),
        }
    }
}

impl std::str::FromStr for TradeMode {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LIVE" => Ok(Self::Live),
            "SIM" => Ok(Self::Sim),
            "DEBUG" => Ok(Self::Debug),
            other => Err(crate::CoreError::InvalidMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_total_order() {
        assert!(TradeMode::Live.outranks(TradeMode::Sim));
        assert!(TradeMode::Live.outranks(TradeMode::Debug));
        assert!(TradeMode::Sim.outranks(TradeMode::Debug));
        assert!(!TradeMode::Debug.outranks(TradeMode::Sim));
        assert!(!TradeMode::Sim.outranks(TradeMode::Sim));
    }

    #[test]
    fn test_display_roundtrip() {
        for mode in [TradeMode::Live, TradeMode::Sim, TradeMode::Debug] {
            let parsed: TradeMode = mode.to_string().parse().unwrap();
            assert_eq!(parsed, mode);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("PROD".parse::<TradeMode>().is_err());
    }

    #[test]
    fn test_serde_uppercase() {
        let json = serde_json::to_string(&TradeMode::Live).unwrap();
        assert_eq!(json, "\"LIVE\"");
        let back: TradeMode = serde_json::from_str("\"SIM\"").unwrap();
        assert_eq!(back, TradeMode::Sim);
    }
}
