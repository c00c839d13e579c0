//! Permission status levels
//!
//! Ordered by increasing access:
//! ```text
//! DeniedExplicitly < DeniedImplicitly < RequestedImplicitly < Unknown
//!   < RequestedExplicitly < GrantedImplicitly < GrantedExplicitly
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Denied by the host or user
    DeniedExplicitly,
    /// Requested in the manifest but blocked by host policy
    DeniedImplicitly,
    /// Declared optional, no decision yet
    RequestedImplicitly,
    /// Never declared by the extension
    Unknown,
    /// Asked for at runtime, awaiting a decision
    RequestedExplicitly,
    /// Requested in the manifest, usable by default
    GrantedImplicitly,
    /// Granted by the host or user
    GrantedExplicitly,
}

impl PermissionStatus {
    /// At least `GrantedImplicitly`
    pub fn is_granted(&self) -> bool {
        *self >= PermissionStatus::GrantedImplicitly
    }

    /// At most `DeniedImplicitly`
    pub fn is_denied(&self) -> bool {
        *self <= PermissionStatus::DeniedImplicitly
    }

    pub fn is_explicit(&self) -> bool {
        matches!(
            self,
            PermissionStatus::DeniedExplicitly
                | PermissionStatus::RequestedExplicitly
                | PermissionStatus::GrantedExplicitly
        )
    }

    /// Whether hosts may write this status into a ledger
    pub fn is_settable(&self) -> bool {
        matches!(
            self,
            PermissionStatus::DeniedExplicitly
                | PermissionStatus::Unknown
                | PermissionStatus::GrantedExplicitly
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionStatus::DeniedExplicitly => "denied_explicitly",
            PermissionStatus::DeniedImplicitly => "denied_implicitly",
            PermissionStatus::RequestedImplicitly => "requested_implicitly",
            PermissionStatus::Unknown => "unknown",
            PermissionStatus::RequestedExplicitly => "requested_explicitly",
            PermissionStatus::GrantedImplicitly => "granted_implicitly",
            PermissionStatus::GrantedExplicitly => "granted_explicitly",
        }
    }
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PermissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "denied_explicitly" => Ok(PermissionStatus::DeniedExplicitly),
            "denied_implicitly" => Ok(PermissionStatus::DeniedImplicitly),
            "requested_implicitly" => Ok(PermissionStatus::RequestedImplicitly),
            "unknown" => Ok(PermissionStatus::Unknown),
            "requested_explicitly" => Ok(PermissionStatus::RequestedExplicitly),
            "granted_implicitly" => Ok(PermissionStatus::GrantedImplicitly),
            "granted_explicitly" => Ok(PermissionStatus::GrantedExplicitly),
            _ => Err(format!("Unknown permission status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(PermissionStatus::DeniedExplicitly < PermissionStatus::DeniedImplicitly);
        assert!(PermissionStatus::DeniedImplicitly < PermissionStatus::RequestedImplicitly);
        assert!(PermissionStatus::RequestedImplicitly < PermissionStatus::Unknown);
        assert!(PermissionStatus::Unknown < PermissionStatus::RequestedExplicitly);
        assert!(PermissionStatus::RequestedExplicitly < PermissionStatus::GrantedImplicitly);
        assert!(PermissionStatus::GrantedImplicitly < PermissionStatus::GrantedExplicitly);
    }

    #[test]
    fn test_granted_and_denied() {
        assert!(PermissionStatus::GrantedExplicitly.is_granted());
        assert!(PermissionStatus::GrantedImplicitly.is_granted());
        assert!(!PermissionStatus::RequestedExplicitly.is_granted());
        assert!(!PermissionStatus::Unknown.is_granted());

        assert!(PermissionStatus::DeniedExplicitly.is_denied());
        assert!(PermissionStatus::DeniedImplicitly.is_denied());
        assert!(!PermissionStatus::RequestedImplicitly.is_denied());
    }

    #[test]
    fn test_settable() {
        assert!(PermissionStatus::GrantedExplicitly.is_settable());
        assert!(PermissionStatus::DeniedExplicitly.is_settable());
        assert!(PermissionStatus::Unknown.is_settable());
        assert!(!PermissionStatus::GrantedImplicitly.is_settable());
        assert!(!PermissionStatus::DeniedImplicitly.is_settable());
        assert!(!PermissionStatus::RequestedImplicitly.is_settable());
        assert!(!PermissionStatus::RequestedExplicitly.is_settable());
    }

    #[test]
    fn test_string_round_trip() {
        for status in [
            PermissionStatus::DeniedExplicitly,
            PermissionStatus::RequestedImplicitly,
            PermissionStatus::GrantedExplicitly,
        ] {
            assert_eq!(status.as_str().parse::<PermissionStatus>(), Ok(status));
        }
        assert!("granted".parse::<PermissionStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&PermissionStatus::GrantedImplicitly).unwrap(),
            "\"granted_implicitly\""
        );
    }
}
