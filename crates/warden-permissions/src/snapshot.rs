//! Ledger snapshots
//!
//! Serializable copies of a ledger's explicit entries and policy flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use warden_match::MatchPattern;

use crate::permission::validate_permission_name;
use crate::state::LedgerState;
use crate::Result;

/// Serializable copy of a ledger's explicit entries and policy flag.
///
/// Expired entries are kept as-is; they stay inert after a restore until
/// purged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSnapshot {
    pub granted_permissions: BTreeMap<String, Option<DateTime<Utc>>>,
    pub denied_permissions: BTreeMap<String, Option<DateTime<Utc>>>,
    pub granted_patterns: BTreeMap<MatchPattern, Option<DateTime<Utc>>>,
    pub denied_patterns: BTreeMap<MatchPattern, Option<DateTime<Utc>>>,
    pub implicitly_denied: bool,
}

impl LedgerSnapshot {
    pub(crate) fn capture(state: &LedgerState) -> Self {
        Self {
            granted_permissions: state.granted_permissions.clone().into_iter().collect(),
            denied_permissions: state.denied_permissions.clone().into_iter().collect(),
            granted_patterns: state.granted_patterns.clone().into_iter().collect(),
            denied_patterns: state.denied_patterns.clone().into_iter().collect(),
            implicitly_denied: state.implicitly_denied,
        }
    }

    /// Rebuild explicit state. A key present in both a grant and a denial
    /// map keeps only the denial.
    pub(crate) fn into_state(self) -> Result<LedgerState> {
        for permission in self
            .granted_permissions
            .keys()
            .chain(self.denied_permissions.keys())
        {
            validate_permission_name(permission)?;
        }

        let mut state = LedgerState {
            implicitly_denied: self.implicitly_denied,
            ..LedgerState::default()
        };

        state.granted_permissions = self
            .granted_permissions
            .into_iter()
            .filter(|(permission, _)| !self.denied_permissions.contains_key(permission))
            .collect();
        state.denied_permissions = self.denied_permissions.into_iter().collect();

        state.granted_patterns = self
            .granted_patterns
            .into_iter()
            .filter(|(pattern, _)| !self.denied_patterns.contains_key(pattern))
            .collect();
        state.denied_patterns = self.denied_patterns.into_iter().collect();

        Ok(state)
    }

    pub fn is_empty(&self) -> bool {
        self.granted_permissions.is_empty()
            && self.denied_permissions.is_empty()
            && self.granted_patterns.is_empty()
            && self.denied_patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    fn pattern(s: &str) -> MatchPattern {
        MatchPattern::parse(s).unwrap()
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let expires: DateTime<Utc> = "2030-01-01T00:00:00Z".parse().unwrap();
        let mut snapshot = LedgerSnapshot::default();
        snapshot
            .granted_permissions
            .insert("tabs".to_string(), Some(expires));
        snapshot
            .denied_patterns
            .insert(pattern("*://*.example.com/*"), None);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("*://*.example.com/*"));

        let back: LedgerSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_snapshot_missing_fields_default() {
        let snapshot: LedgerSnapshot =
            serde_json::from_str(r#"{"implicitly_denied": true}"#).unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.implicitly_denied);
    }

    #[test]
    fn test_snapshot_rejects_bad_pattern() {
        let result: serde_json::Result<LedgerSnapshot> =
            serde_json::from_str(r#"{"granted_patterns": {"gopher://x/*": null}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_into_state_denial_wins() {
        let mut snapshot = LedgerSnapshot::default();
        snapshot.granted_permissions.insert("tabs".to_string(), None);
        snapshot.denied_permissions.insert("tabs".to_string(), None);
        snapshot
            .granted_patterns
            .insert(pattern("https://example.com/*"), None);
        snapshot
            .denied_patterns
            .insert(pattern("https://example.com/*"), None);

        let state = snapshot.into_state().unwrap();
        assert!(state.granted_permissions.is_empty());
        assert!(state.denied_permissions.contains_key("tabs"));
        assert!(state.granted_patterns.is_empty());
        assert_eq!(state.denied_patterns.len(), 1);
    }

    #[test]
    fn test_into_state_validates_names() {
        let mut snapshot = LedgerSnapshot::default();
        snapshot.denied_permissions.insert(" ".to_string(), None);

        assert!(matches!(
            snapshot.into_state(),
            Err(LedgerError::InvalidPermission(_))
        ));
    }
}
