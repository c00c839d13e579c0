use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_permissions::{DeclaredPermissions, PermissionLedger};

/// A loaded extension and its permission ledger
pub struct ExtensionContext {
    unique_identifier: String,
    display_name: Option<String>,
    loaded_at: DateTime<Utc>,
    ledger: PermissionLedger,
}

impl ExtensionContext {
    pub(crate) fn new(display_name: Option<String>, ledger: PermissionLedger) -> Self {
        Self {
            unique_identifier: Uuid::new_v4().to_string(),
            display_name,
            loaded_at: Utc::now(),
            ledger,
        }
    }

    pub fn unique_identifier(&self) -> &str {
        &self.unique_identifier
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn ledger(&self) -> &PermissionLedger {
        &self.ledger
    }

    pub fn declared(&self) -> &DeclaredPermissions {
        self.ledger.declared()
    }
}

impl std::fmt::Debug for ExtensionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionContext")
            .field("unique_identifier", &self.unique_identifier)
            .field("display_name", &self.display_name)
            .field("loaded_at", &self.loaded_at)
            .finish_non_exhaustive()
    }
}
