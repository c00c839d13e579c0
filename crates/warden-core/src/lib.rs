//! Warden Core
//!
//! Coordination layer for an extension host. Owns one [`ExtensionContext`]
//! per loaded extension and routes tab lifecycle and URL access questions to
//! their permission ledgers.

mod config;
mod context;
mod error;
mod host;

pub use config::Config;
pub use context::ExtensionContext;
pub use error::CoreError;
pub use host::ExtensionHost;

// Re-export the engine crates
pub use warden_match::{MatchOptions, MatchPattern, PatternError};
pub use warden_permissions::{
    DeclaredPermissions, LedgerError, LedgerEvent, LedgerSnapshot, PermissionLedger,
    PermissionStatus, StatusResolution, TabId,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    init_logging_with_filter("info");
}

/// Initialize logging, falling back to `default_filter` when `RUST_LOG` is unset
pub fn init_logging_with_filter(default_filter: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt().with_env_filter(filter).with_target(true).init();
}
