//! Extension host
//!
//! Owns the loaded extensions. Tab lifecycle notifications fan out to every
//! extension's ledger.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;
use warden_permissions::{Clock, DeclaredPermissions, PermissionLedger, SystemClock, TabId};

use crate::config::Config;
use crate::context::ExtensionContext;
use crate::error::CoreError;
use crate::Result;

pub struct ExtensionHost {
    config: Config,
    /// Loaded extensions keyed by unique identifier
    contexts: Arc<RwLock<HashMap<String, Arc<ExtensionContext>>>>,
    clock: Arc<dyn Clock>,
}

impl ExtensionHost {
    /// Create a host, registering the configured custom schemes
    pub fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        for scheme in &config.custom_schemes {
            warden_match::register_custom_scheme(scheme).map_err(|e| {
                tracing::warn!(scheme = %scheme, error = %e, "Rejected custom scheme");
                CoreError::from(e)
            })?;
        }

        Ok(Self {
            config,
            contexts: Arc::new(RwLock::new(HashMap::new())),
            clock,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // === Extension lifecycle ===

    pub fn load_extension(&self, declared: DeclaredPermissions) -> Arc<ExtensionContext> {
        self.load(None, declared)
    }

    pub fn load_named_extension(
        &self,
        display_name: &str,
        declared: DeclaredPermissions,
    ) -> Arc<ExtensionContext> {
        self.load(Some(display_name.to_string()), declared)
    }

    fn load(
        &self,
        display_name: Option<String>,
        declared: DeclaredPermissions,
    ) -> Arc<ExtensionContext> {
        let ledger = PermissionLedger::with_options(
            declared,
            Arc::clone(&self.clock),
            self.config.ledger_options(),
        );
        if self.config.deny_mandatory_permissions {
            ledger.set_implicitly_denied(true);
        }

        let context = Arc::new(ExtensionContext::new(display_name, ledger));
        self.contexts
            .write()
            .insert(context.unique_identifier().to_string(), Arc::clone(&context));

        tracing::info!(
            extension_id = %context.unique_identifier(),
            name = ?context.display_name(),
            "Extension loaded"
        );

        context
    }

    pub fn unload_extension(&self, extension_id: &str) -> Result<Arc<ExtensionContext>> {
        let context = self.contexts.write().remove(extension_id).ok_or_else(|| {
            tracing::warn!(extension_id = %extension_id, "Unload of unknown extension");
            CoreError::ExtensionNotFound(extension_id.to_string())
        })?;

        tracing::info!(extension_id = %extension_id, "Extension unloaded");
        Ok(context)
    }

    pub fn context(&self, extension_id: &str) -> Option<Arc<ExtensionContext>> {
        self.contexts.read().get(extension_id).cloned()
    }

    /// All loaded extensions, oldest first
    pub fn contexts(&self) -> Vec<Arc<ExtensionContext>> {
        let mut contexts: Vec<_> = self.contexts.read().values().cloned().collect();
        contexts.sort_by(|a, b| {
            a.loaded_at()
                .cmp(&b.loaded_at())
                .then_with(|| a.unique_identifier().cmp(b.unique_identifier()))
        });
        contexts
    }

    // === Tabs ===

    /// Record a user gesture for one extension in `tab`, optionally unlocking
    /// the origin of the page it shows. Returns false when the extension has
    /// no `activeTab` access.
    pub fn user_gesture(&self, extension_id: &str, tab: &TabId, url: Option<&Url>) -> Result<bool> {
        let context = self
            .context(extension_id)
            .ok_or_else(|| CoreError::ExtensionNotFound(extension_id.to_string()))?;

        match url {
            Some(url) => context
                .ledger()
                .record_user_gesture_for_url(tab, url)
                .map_err(|e| {
                    tracing::warn!(tab = %tab, url = %url, error = %e, "Rejected gesture URL");
                    CoreError::from(e)
                }),
            None => Ok(context.ledger().record_user_gesture(tab)),
        }
    }

    /// A navigation ends every gesture grant held in the tab
    pub fn tab_navigated(&self, tab: &TabId) {
        self.clear_gestures(tab);
    }

    pub fn tab_closed(&self, tab: &TabId) {
        self.clear_gestures(tab);
    }

    fn clear_gestures(&self, tab: &TabId) {
        for context in self.contexts.read().values() {
            context.ledger().clear_user_gesture(tab);
        }
    }

    // === Access ===

    pub fn extensions_with_access_to_url(
        &self,
        url: &Url,
        tab: Option<&TabId>,
    ) -> Vec<Arc<ExtensionContext>> {
        self.contexts()
            .into_iter()
            .filter(|context| context.ledger().has_access_to_url(url, tab))
            .collect()
    }

    /// Purge expired entries from every ledger. Returns the total removed.
    pub fn purge_expired(&self) -> usize {
        self.contexts()
            .iter()
            .map(|context| context.ledger().purge_expired())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use warden_permissions::permission::ACTIVE_TAB;
    use warden_permissions::{FixedClock, PermissionStatus};

    fn with_active_tab() -> DeclaredPermissions {
        DeclaredPermissions::new()
            .with_requested_permission(ACTIVE_TAB)
            .unwrap()
    }

    fn declared(pattern: &str) -> DeclaredPermissions {
        DeclaredPermissions::new()
            .with_requested_permission("storage")
            .unwrap()
            .with_requested_pattern(pattern)
            .unwrap()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_load_and_unload() {
        let host = ExtensionHost::new(Config::default()).unwrap();
        let first = host.load_named_extension("Reader", declared("https://example.com/*"));
        let second = host.load_extension(DeclaredPermissions::new());

        assert_ne!(first.unique_identifier(), second.unique_identifier());
        assert_eq!(first.display_name(), Some("Reader"));
        assert_eq!(host.contexts().len(), 2);
        assert!(host.context(first.unique_identifier()).is_some());

        let removed = host.unload_extension(first.unique_identifier()).unwrap();
        assert_eq!(removed.unique_identifier(), first.unique_identifier());
        assert!(host.context(first.unique_identifier()).is_none());

        assert!(matches!(
            host.unload_extension("missing"),
            Err(CoreError::ExtensionNotFound(_))
        ));
    }

    #[test]
    fn test_custom_scheme_registration() {
        let config = Config {
            custom_schemes: vec!["warden-test-app".to_string()],
            ..Config::default()
        };
        let host = ExtensionHost::new(config).unwrap();
        let context = host.load_extension(declared("warden-test-app://*/*"));

        assert!(context
            .ledger()
            .has_access_to_url(&url("warden-test-app://settings/page"), None));
    }

    #[test]
    fn test_invalid_custom_scheme() {
        let config = Config {
            custom_schemes: vec!["1bad".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            ExtensionHost::new(config),
            Err(CoreError::Pattern(_))
        ));
    }

    #[test]
    fn test_deny_mandatory_permissions() {
        let config = Config {
            deny_mandatory_permissions: true,
            ..Config::default()
        };
        let host = ExtensionHost::new(config).unwrap();
        let context = host.load_extension(declared("https://example.com/*"));

        assert_eq!(
            context.ledger().permission_status("storage", None),
            PermissionStatus::DeniedImplicitly
        );
    }

    #[test]
    fn test_tab_lifecycle_clears_gestures() {
        let host = ExtensionHost::new(Config::default()).unwrap();
        let a = host.load_extension(with_active_tab());
        let b = host.load_extension(with_active_tab());
        let tab = TabId::from("tab-7");
        let page = url("https://news.example.net/today");

        assert!(host
            .user_gesture(a.unique_identifier(), &tab, Some(&page))
            .unwrap());
        assert!(host.user_gesture(b.unique_identifier(), &tab, None).unwrap());

        let with_access = host.extensions_with_access_to_url(&page, Some(&tab));
        assert_eq!(with_access.len(), 1);
        assert_eq!(with_access[0].unique_identifier(), a.unique_identifier());
        assert!(host.extensions_with_access_to_url(&page, None).is_empty());

        host.tab_navigated(&tab);
        assert!(!a.ledger().has_active_user_gesture(&tab));
        assert!(!b.ledger().has_active_user_gesture(&tab));

        assert!(host.user_gesture(b.unique_identifier(), &tab, None).unwrap());
        host.tab_closed(&tab);
        assert!(!b.ledger().has_active_user_gesture(&tab));
    }

    #[test]
    fn test_gesture_without_active_tab_grants_nothing() {
        let host = ExtensionHost::new(Config::default()).unwrap();
        let context = host.load_extension(DeclaredPermissions::new());
        let tab = TabId::from("tab-3");
        let page = url("https://bank.example.com/account");

        assert!(!host
            .user_gesture(context.unique_identifier(), &tab, Some(&page))
            .unwrap());
        assert!(host
            .extensions_with_access_to_url(&page, Some(&tab))
            .is_empty());
    }

    #[test]
    fn test_user_gesture_errors() {
        let host = ExtensionHost::new(Config::default()).unwrap();
        let context = host.load_extension(DeclaredPermissions::new());
        let tab = TabId::from("tab-1");

        assert!(matches!(
            host.user_gesture("missing", &tab, None),
            Err(CoreError::ExtensionNotFound(_))
        ));
        assert!(matches!(
            host.user_gesture(context.unique_identifier(), &tab, Some(&url("about:blank"))),
            Err(CoreError::Ledger(_))
        ));
    }

    #[test]
    fn test_extensions_with_access_to_url() {
        let host = ExtensionHost::new(Config::default()).unwrap();
        let docs = host.load_extension(declared("https://docs.example.com/*"));
        let all = host.load_extension(declared("<all_urls>"));

        let target = url("https://docs.example.com/guide");
        let ids: Vec<_> = host
            .extensions_with_access_to_url(&target, None)
            .iter()
            .map(|c| c.unique_identifier().to_string())
            .collect();
        assert!(ids.contains(&docs.unique_identifier().to_string()));
        assert!(ids.contains(&all.unique_identifier().to_string()));

        let other = url("https://other.test/");
        let with_access = host.extensions_with_access_to_url(&other, None);
        assert_eq!(with_access.len(), 1);
        assert_eq!(with_access[0].unique_identifier(), all.unique_identifier());
    }

    #[test]
    fn test_purge_expired_across_extensions() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let host = ExtensionHost::with_clock(Config::default(), clock.clone()).unwrap();
        let soon = clock.now() + Duration::minutes(5);

        for _ in 0..3 {
            let context = host.load_extension(DeclaredPermissions::new());
            context
                .ledger()
                .set_permission_status(PermissionStatus::GrantedExplicitly, "tabs", Some(soon))
                .unwrap();
        }

        assert_eq!(host.purge_expired(), 0);
        clock.advance(Duration::minutes(10));
        assert_eq!(host.purge_expired(), 3);
    }
}
