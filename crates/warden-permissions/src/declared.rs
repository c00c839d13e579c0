//! Manifest-declared permission sets
//!
//! Supplied by the host when the ledger is created and never changed
//! afterwards. Implicit statuses are derived from these sets at query time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use warden_match::{MatchOptions, MatchPattern};

use crate::permission::validate_permission_name;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredPermissions {
    /// Mandatory permissions from the manifest
    #[serde(default)]
    pub requested_permissions: HashSet<String>,
    /// Permissions the extension may ask for later
    #[serde(default)]
    pub optional_permissions: HashSet<String>,
    /// Mandatory host access patterns
    #[serde(default)]
    pub requested_patterns: HashSet<MatchPattern>,
    /// Host access the extension may ask for later
    #[serde(default)]
    pub optional_patterns: HashSet<MatchPattern>,
}

impl DeclaredPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requested_permission(mut self, permission: &str) -> Result<Self> {
        validate_permission_name(permission)?;
        self.requested_permissions.insert(permission.to_string());
        Ok(self)
    }

    pub fn with_optional_permission(mut self, permission: &str) -> Result<Self> {
        validate_permission_name(permission)?;
        self.optional_permissions.insert(permission.to_string());
        Ok(self)
    }

    pub fn with_requested_pattern(mut self, pattern: &str) -> Result<Self> {
        self.requested_patterns.insert(MatchPattern::parse(pattern)?);
        Ok(self)
    }

    pub fn with_optional_pattern(mut self, pattern: &str) -> Result<Self> {
        self.optional_patterns.insert(MatchPattern::parse(pattern)?);
        Ok(self)
    }

    pub fn is_requested(&self, permission: &str) -> bool {
        self.requested_permissions.contains(permission)
    }

    pub fn is_optional(&self, permission: &str) -> bool {
        self.optional_permissions.contains(permission)
    }

    pub fn is_declared(&self, permission: &str) -> bool {
        self.is_requested(permission) || self.is_optional(permission)
    }

    /// Every declared pattern, requested and optional
    pub fn all_patterns(&self) -> impl Iterator<Item = &MatchPattern> {
        self.requested_patterns
            .iter()
            .chain(self.optional_patterns.iter())
    }

    /// Whether any optional pattern covers every host
    pub fn requests_optional_access_to_all_hosts(&self) -> bool {
        self.optional_patterns
            .iter()
            .any(|pattern| pattern.matches_all_hosts())
    }

    /// Whether some declared pattern overlaps `pattern`
    pub fn declares_pattern(&self, pattern: &MatchPattern) -> bool {
        let options = MatchOptions::NONE.bidirectional();
        self.all_patterns()
            .any(|declared| declared.matches_pattern(pattern, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let declared = DeclaredPermissions::new()
            .with_requested_permission("storage")
            .unwrap()
            .with_optional_permission("tabs")
            .unwrap()
            .with_requested_pattern("https://example.com/*")
            .unwrap()
            .with_optional_pattern("*://*/*")
            .unwrap();

        assert!(declared.is_requested("storage"));
        assert!(declared.is_optional("tabs"));
        assert!(declared.is_declared("tabs"));
        assert!(!declared.is_declared("cookies"));
        assert_eq!(declared.all_patterns().count(), 2);
        assert!(declared.requests_optional_access_to_all_hosts());
    }

    #[test]
    fn test_builder_rejects_malformed_input() {
        assert!(DeclaredPermissions::new()
            .with_requested_permission("")
            .is_err());
        assert!(DeclaredPermissions::new()
            .with_optional_pattern("https://exa*mple.com/*")
            .is_err());
    }

    #[test]
    fn test_declares_pattern() {
        let declared = DeclaredPermissions::new()
            .with_optional_pattern("https://*.example.com/*")
            .unwrap();

        let mail = MatchPattern::parse("https://mail.example.com/*").unwrap();
        let other = MatchPattern::parse("https://example.org/*").unwrap();
        assert!(declared.declares_pattern(&mail));
        assert!(!declared.declares_pattern(&other));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let declared: DeclaredPermissions = serde_json::from_str(
            r#"{"requested_permissions": ["storage"], "requested_patterns": ["https://example.com/*"]}"#,
        )
        .unwrap();

        assert!(declared.is_requested("storage"));
        assert!(declared.optional_permissions.is_empty());
        assert_eq!(declared.requested_patterns.len(), 1);
    }
}
