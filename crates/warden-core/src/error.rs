//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Pattern error: {0}")]
    Pattern(#[from] warden_match::PatternError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] warden_permissions::LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extension not found: {0}")]
    ExtensionNotFound(String),
}
