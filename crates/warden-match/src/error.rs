//! Match pattern error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Invalid scheme: {0}")]
    InvalidScheme(String),

    #[error("Invalid host: {0}")]
    InvalidHost(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}
