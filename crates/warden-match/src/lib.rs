//! Warden Match Patterns
//!
//! Parsing and evaluation of extension match patterns of the form
//! `scheme://host/path`:
//! ```text
//! <all_urls>                 every URL
//! *://*/*                    every URL (normalizes to <all_urls>)
//! https://*.example.com/*    example.com and all of its subdomains
//! file:///home/*             local files under /home
//! ```
//!
//! Patterns are immutable once parsed and compare by their normalized string.

mod error;
mod glob;
mod options;
mod pattern;
mod scheme;

pub use error::PatternError;
pub use options::MatchOptions;
pub use pattern::{MatchPattern, ALL_URLS};
pub use scheme::{custom_schemes, is_supported_scheme, register_custom_scheme, BUILTIN_SCHEMES};

pub type Result<T> = std::result::Result<T, PatternError>;
