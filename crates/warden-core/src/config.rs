//! Host configuration

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use warden_permissions::permission::{validate_permission_name, ACTIVE_TAB};
use warden_permissions::LedgerOptions;

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extra URL schemes match patterns may use (e.g. `warden-extension`)
    pub custom_schemes: Vec<String>,
    /// Permissions a user gesture unlocks in its tab
    pub gesture_permissions: Vec<String>,
    /// Buffered change events per ledger subscriber
    pub event_capacity: usize,
    /// Load every extension with its mandatory permissions implicitly denied
    pub deny_mandatory_permissions: bool,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            custom_schemes: Vec::new(),
            gesture_permissions: vec![ACTIVE_TAB.to_string()],
            event_capacity: 64,
            deny_mandatory_permissions: false,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            return Err(CoreError::Config(
                "event_capacity must be at least 1".to_string(),
            ));
        }

        EnvFilter::try_new(&self.log_filter).map_err(|e| {
            CoreError::Config(format!("log_filter {:?}: {}", self.log_filter, e))
        })?;

        for permission in &self.gesture_permissions {
            validate_permission_name(permission).map_err(|e| {
                CoreError::Config(format!("gesture permission {:?}: {}", permission, e))
            })?;
        }

        Ok(())
    }

    /// Install the global subscriber with this config's filter
    pub fn init_logging(&self) {
        crate::init_logging_with_filter(&self.log_filter);
    }

    pub fn ledger_options(&self) -> LedgerOptions {
        LedgerOptions {
            gesture_permissions: self.gesture_permissions.iter().cloned().collect(),
            event_capacity: self.event_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.custom_schemes.is_empty());
        assert_eq!(config.gesture_permissions, vec!["activeTab".to_string()]);
        assert!(config.validate().is_ok());
        assert!(config.ledger_options().gesture_permissions.contains("activeTab"));
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            Config::from_json_str(r#"{"custom_schemes": ["warden-extension"], "event_capacity": 8}"#)
                .unwrap();
        assert_eq!(config.custom_schemes, vec!["warden-extension".to_string()]);
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_json_round_trip() {
        let config = Config {
            deny_mandatory_permissions: true,
            ..Config::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(Config::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            Config::from_json_str("not json"),
            Err(CoreError::Serialization(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{"event_capacity": 0}"#),
            Err(CoreError::Config(_))
        ));
        assert!(matches!(
            Config::from_json_str(r#"{"gesture_permissions": ["has space"]}"#),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_log_filter_is_validated() {
        let config =
            Config::from_json_str(r#"{"log_filter": "warn,warden_permissions=debug"}"#).unwrap();
        assert_eq!(config.log_filter, "warn,warden_permissions=debug");

        assert!(matches!(
            Config::from_json_str(r#"{"log_filter": "warden=loudest"}"#),
            Err(CoreError::Config(_))
        ));
    }

    #[test]
    fn test_init_logging_from_config() {
        let config = Config {
            log_filter: "debug".to_string(),
            ..Config::default()
        };
        config.init_logging();
        tracing::debug!(filter = %config.log_filter, "Logging initialized from config");
    }
}
