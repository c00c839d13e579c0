//! Ledger error types

use thiserror::Error;
use warden_match::PatternError;

use crate::status::PermissionStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Status cannot be set explicitly: {0}")]
    InvalidStatus(PermissionStatus),

    #[error("Invalid permission name: {0:?}")]
    InvalidPermission(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),
}
