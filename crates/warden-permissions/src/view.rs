//! Consistent read view over a ledger
//!
//! A view pins one published state and one instant, so a batch of queries
//! made through it cannot straddle a write or an expiration boundary.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use url::Url;
use warden_match::{MatchOptions, MatchPattern};

use crate::declared::DeclaredPermissions;
use crate::permission::ACTIVE_TAB;
use crate::state::{is_live, live_entries, Entries, Expiration, LedgerState};
use crate::status::PermissionStatus;
use crate::tab::TabId;

/// A status together with the entry that decided it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResolution {
    pub status: PermissionStatus,
    /// Most specific pattern at the deciding step (URL and pattern queries)
    pub pattern: Option<MatchPattern>,
    /// Expiration of the deciding explicit entry
    pub expires_at: Option<DateTime<Utc>>,
}

impl StatusResolution {
    fn new(status: PermissionStatus) -> Self {
        Self {
            status,
            pattern: None,
            expires_at: None,
        }
    }

    fn from_entry(status: PermissionStatus, entry: (&MatchPattern, Expiration)) -> Self {
        Self {
            status,
            pattern: Some(entry.0.clone()),
            expires_at: entry.1,
        }
    }
}

pub struct LedgerView<'a> {
    declared: &'a DeclaredPermissions,
    state: Arc<LedgerState>,
    now: DateTime<Utc>,
}

impl<'a> LedgerView<'a> {
    pub(crate) fn new(
        declared: &'a DeclaredPermissions,
        state: Arc<LedgerState>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            declared,
            state,
            now,
        }
    }

    /// The instant expirations are compared against
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn permission_status(&self, permission: &str, tab: Option<&TabId>) -> PermissionStatus {
        self.resolve_permission(permission, tab).status
    }

    pub fn resolve_permission(&self, permission: &str, tab: Option<&TabId>) -> StatusResolution {
        let state = &self.state;

        if let Some(expiration) = self.live(&state.denied_permissions, permission) {
            return StatusResolution {
                status: PermissionStatus::DeniedExplicitly,
                pattern: None,
                expires_at: expiration,
            };
        }

        let gesture_grant = tab
            .and_then(|tab| state.active_tab_grants.get(tab))
            .map_or(false, |grant| grant.permissions.contains(permission));
        if gesture_grant && self.gestures_allowed() {
            return StatusResolution::new(PermissionStatus::GrantedExplicitly);
        }

        if let Some(expiration) = self.live(&state.granted_permissions, permission) {
            return StatusResolution {
                status: PermissionStatus::GrantedExplicitly,
                pattern: None,
                expires_at: expiration,
            };
        }

        let status = if self.declared.is_requested(permission) {
            self.mandatory_status()
        } else if self.declared.is_optional(permission) {
            PermissionStatus::RequestedImplicitly
        } else {
            PermissionStatus::Unknown
        };

        StatusResolution::new(status)
    }

    pub fn url_status(&self, url: &Url, tab: Option<&TabId>) -> PermissionStatus {
        self.resolve_url(url, tab).status
    }

    pub fn resolve_url(&self, url: &Url, tab: Option<&TabId>) -> StatusResolution {
        self.resolve_with(tab, |key| key.matches_url(url, MatchOptions::NONE))
    }

    /// Same as [`resolve_url`](Self::resolve_url) for an unparsed URL.
    /// Unparseable input resolves to `Unknown`.
    pub fn resolve_url_str(&self, url: &str, tab: Option<&TabId>) -> StatusResolution {
        match Url::parse(url) {
            Ok(url) => self.resolve_url(&url, tab),
            Err(_) => StatusResolution::new(PermissionStatus::Unknown),
        }
    }

    pub fn pattern_status(&self, pattern: &MatchPattern, tab: Option<&TabId>) -> PermissionStatus {
        self.resolve_pattern(pattern, tab).status
    }

    pub fn resolve_pattern(&self, pattern: &MatchPattern, tab: Option<&TabId>) -> StatusResolution {
        let options = MatchOptions::NONE.bidirectional();
        self.resolve_with(tab, |key| key.matches_pattern(pattern, options))
    }

    fn resolve_with<F>(&self, tab: Option<&TabId>, applies: F) -> StatusResolution
    where
        F: Fn(&MatchPattern) -> bool,
    {
        let state = &self.state;

        if let Some(entry) = self.most_specific(&state.denied_patterns, &applies) {
            return StatusResolution::from_entry(PermissionStatus::DeniedExplicitly, entry);
        }

        let gesture_pattern = tab
            .and_then(|tab| state.active_tab_grants.get(tab))
            .and_then(|grant| grant.pattern.as_ref())
            .filter(|pattern| applies(*pattern))
            .filter(|_| self.gestures_allowed());
        if let Some(pattern) = gesture_pattern {
            return StatusResolution::from_entry(
                PermissionStatus::GrantedExplicitly,
                (pattern, None),
            );
        }

        if let Some(entry) = self.most_specific(&state.granted_patterns, &applies) {
            return StatusResolution::from_entry(PermissionStatus::GrantedExplicitly, entry);
        }

        let requested = most_specific_of(self.declared.requested_patterns.iter(), &applies);
        if let Some(pattern) = requested {
            return StatusResolution::from_entry(self.mandatory_status(), (pattern, None));
        }

        let optional = most_specific_of(self.declared.optional_patterns.iter(), &applies);
        if let Some(pattern) = optional {
            return StatusResolution::from_entry(
                PermissionStatus::RequestedImplicitly,
                (pattern, None),
            );
        }

        StatusResolution::new(PermissionStatus::Unknown)
    }

    pub fn has_permission(&self, permission: &str, tab: Option<&TabId>) -> bool {
        self.permission_status(permission, tab).is_granted()
    }

    pub fn has_access_to_url(&self, url: &Url, tab: Option<&TabId>) -> bool {
        self.url_status(url, tab).is_granted()
    }

    /// Every declared or explicitly granted permission currently usable
    /// outside of any tab
    pub fn current_permissions(&self) -> BTreeSet<String> {
        self.declared
            .requested_permissions
            .iter()
            .chain(self.declared.optional_permissions.iter())
            .chain(self.state.granted_permissions.keys())
            .filter(|permission| self.has_permission(permission, None))
            .cloned()
            .collect()
    }

    /// Granted patterns, plus mandatory ones unless policy blocks them, that
    /// no live denial contains
    pub fn current_patterns(&self) -> BTreeSet<MatchPattern> {
        let denied = live_entries(&self.state.denied_patterns, self.now);
        let is_denied = |pattern: &MatchPattern| {
            denied
                .keys()
                .any(|denial| denial.matches_pattern(pattern, MatchOptions::NONE))
        };

        let granted = self
            .state
            .granted_patterns
            .iter()
            .filter(|(_, expiration)| is_live(expiration, self.now))
            .map(|(pattern, _)| pattern);

        let mandatory = self
            .declared
            .requested_patterns
            .iter()
            .filter(|_| !self.state.implicitly_denied);

        granted
            .chain(mandatory)
            .filter(|pattern| !is_denied(*pattern))
            .cloned()
            .collect()
    }

    pub fn has_access_to_all_urls(&self) -> bool {
        self.current_patterns()
            .iter()
            .any(MatchPattern::matches_all_urls)
    }

    pub fn has_access_to_all_hosts(&self) -> bool {
        self.current_patterns()
            .iter()
            .any(MatchPattern::matches_all_hosts)
    }

    pub fn granted_permissions(&self) -> HashMap<String, Expiration> {
        live_entries(&self.state.granted_permissions, self.now)
    }

    pub fn denied_permissions(&self) -> HashMap<String, Expiration> {
        live_entries(&self.state.denied_permissions, self.now)
    }

    pub fn granted_patterns(&self) -> HashMap<MatchPattern, Expiration> {
        live_entries(&self.state.granted_patterns, self.now)
    }

    pub fn denied_patterns(&self) -> HashMap<MatchPattern, Expiration> {
        live_entries(&self.state.denied_patterns, self.now)
    }

    /// Gesture grants only count while `activeTab` itself is granted
    /// outside of any tab
    pub(crate) fn gestures_allowed(&self) -> bool {
        self.permission_status(ACTIVE_TAB, None).is_granted()
    }

    fn mandatory_status(&self) -> PermissionStatus {
        if self.state.implicitly_denied {
            PermissionStatus::DeniedImplicitly
        } else {
            PermissionStatus::GrantedImplicitly
        }
    }

    /// `Some(expiration)` if `key` has a live entry
    fn live(&self, entries: &Entries<String>, key: &str) -> Option<Expiration> {
        entries
            .get(key)
            .filter(|expiration| is_live(expiration, self.now))
            .copied()
    }

    fn most_specific<'s, F>(
        &self,
        entries: &'s Entries<MatchPattern>,
        applies: &F,
    ) -> Option<(&'s MatchPattern, Expiration)>
    where
        F: Fn(&MatchPattern) -> bool,
    {
        let live = entries
            .iter()
            .filter(|(_, expiration)| is_live(expiration, self.now))
            .map(|(pattern, _)| pattern);

        most_specific_of(live, applies).map(|pattern| (pattern, entries[pattern]))
    }
}

/// Longest normalized string wins; equal lengths fall back to string order
fn most_specific_of<'p, I, F>(patterns: I, applies: &F) -> Option<&'p MatchPattern>
where
    I: Iterator<Item = &'p MatchPattern>,
    F: Fn(&MatchPattern) -> bool,
{
    patterns.filter(|pattern| applies(*pattern)).max_by(|a, b| {
        a.as_str()
            .len()
            .cmp(&b.as_str().len())
            .then_with(|| b.cmp(a))
    })
}
