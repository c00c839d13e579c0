//! Supported URL schemes
//!
//! Patterns may only name a scheme from the built-in allow-list or one the
//! host registered at runtime. The registry lives for the whole process;
//! registering affects patterns parsed afterwards, never existing ones.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use crate::error::PatternError;
use crate::Result;

/// Schemes every pattern may use without registration
pub const BUILTIN_SCHEMES: &[&str] = &["http", "https", "file", "ftp"];

struct SchemeRegistry {
    /// Readers clone the `Arc`; writers swap in a new set
    custom: RwLock<Arc<BTreeSet<String>>>,
}

impl SchemeRegistry {
    fn new() -> Self {
        Self {
            custom: RwLock::new(Arc::new(BTreeSet::new())),
        }
    }

    fn snapshot(&self) -> Arc<BTreeSet<String>> {
        Arc::clone(&self.custom.read())
    }

    /// Returns false if the scheme was already present
    fn insert(&self, scheme: String) -> bool {
        let mut guard = self.custom.write();
        if guard.contains(&scheme) {
            return false;
        }

        let mut next = BTreeSet::clone(&guard);
        next.insert(scheme);
        *guard = Arc::new(next);
        true
    }
}

fn registry() -> &'static SchemeRegistry {
    static REGISTRY: OnceLock<SchemeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(SchemeRegistry::new)
}

/// Allow `scheme` in patterns parsed from now on.
///
/// Registering the same scheme twice, or a built-in one, is a no-op.
pub fn register_custom_scheme(scheme: &str) -> Result<()> {
    let scheme = scheme.trim().to_ascii_lowercase();

    if !is_valid_scheme_syntax(&scheme) {
        return Err(PatternError::InvalidScheme(scheme));
    }

    if BUILTIN_SCHEMES.contains(&scheme.as_str()) {
        return Ok(());
    }

    if registry().insert(scheme.clone()) {
        tracing::info!(scheme = %scheme, "Registered custom URL scheme");
    }

    Ok(())
}

/// Check whether patterns may name this scheme
pub fn is_supported_scheme(scheme: &str) -> bool {
    let scheme = scheme.to_ascii_lowercase();
    BUILTIN_SCHEMES.contains(&scheme.as_str()) || registry().snapshot().contains(&scheme)
}

/// Registered custom schemes, sorted
pub fn custom_schemes() -> Vec<String> {
    registry().snapshot().iter().cloned().collect()
}

/// RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_valid_scheme_syntax(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
