//! Engine configuration
//!
//! Limits are configurable via a JSON file; every field falls back to its
//! default when omitted.

use serde::{Deserialize, Serialize};

/// Upper bound for audit rates (100.00%)
pub const MAX_AUDIT_RATE_BPS: u16 = 10_000;

/// Configuration for the claim engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Longest accepted vendor name, in bytes
    #[serde(default = "default_max_vendor_name_len")]
    pub max_vendor_name_len: usize,

    /// Longest accepted source document reference
    #[serde(default = "default_max_source_reference_len")]
    pub max_source_reference_len: usize,

    /// Length of the daily-cap window in seconds
    #[serde(default = "default_day_length_secs")]
    pub day_length_secs: i64,

    /// Reject extracted invoices whose due date is not in the future
    #[serde(default = "default_require_future_due_date")]
    pub require_future_due_date: bool,
}

fn default_max_vendor_name_len() -> usize {
    50
}

fn default_max_source_reference_len() -> usize {
    64
}

fn default_day_length_secs() -> i64 {
    86_400
}

fn default_require_future_due_date() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_vendor_name_len: default_max_vendor_name_len(),
            max_source_reference_len: default_max_source_reference_len(),
            day_length_secs: default_day_length_secs(),
            require_future_due_date: default_require_future_due_date(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Day index used for the daily-cap window
    pub fn day_index(&self, unix_seconds: i64) -> i64 {
        unix_seconds.div_euclid(self.day_length_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_vendor_name_len, 50);
        assert_eq!(config.max_source_reference_len, 64);
        assert_eq!(config.day_length_secs, 86_400);
        assert!(config.require_future_due_date);
    }

    #[test]
    fn test_config_partial_json() {
        let json = r#"{ "max_vendor_name_len": 10 }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.max_vendor_name_len, 10);
        assert_eq!(config.day_length_secs, 86_400); // default
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "require_future_due_date": false }"#).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert!(!config.require_future_due_date);

        std::fs::write(&path, "not json").unwrap();
        assert!(EngineConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_day_index() {
        let config = EngineConfig::default();
        assert_eq!(config.day_index(0), 0);
        assert_eq!(config.day_index(86_399), 0);
        assert_eq!(config.day_index(86_400), 1);
    }
}
