//! Engine configuration
//!
//! Read once at startup and handed to `register_builtins`; nothing here is
//! consulted on the evaluation hot path.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::lookup::LookupConfig;

/// One-time setup for the function library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name prefix under which anomaly-detector series are fetched
    pub anomaly_prefix: String,
    /// External keyed-lookup settings for the hash alias functions
    pub lookup: LookupConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            anomaly_prefix: "resources.monitoring.anomaly_detector.".to_string(),
            lookup: LookupConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(io::Error::other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_carry_the_historical_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.anomaly_prefix, "resources.monitoring.anomaly_detector.");
        assert_eq!(cfg.lookup.default_db, 0);
        assert_eq!(cfg.lookup.kube_db, 2);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"anomaly_prefix": "anomalies."}"#).unwrap();
        assert_eq!(cfg.anomaly_prefix, "anomalies.");
        assert_eq!(cfg.lookup, LookupConfig::default());
    }
}
