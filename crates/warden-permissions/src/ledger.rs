//! Permission ledger
//!
//! Holds one extension's explicit grants and denials, its active-tab gesture
//! grants, and its manifest-declared sets.
//!
//! Reads clone the current `Arc<LedgerState>` and release the lock before
//! evaluating. Writes are serialized by `writer`, build the next state off
//! the read path, and swap it in under a short write lock.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;
use warden_match::MatchPattern;

use crate::clock::{Clock, SystemClock};
use crate::declared::DeclaredPermissions;
use crate::error::LedgerError;
use crate::events::{ChangeSet, LedgerEvent};
use crate::permission::{is_well_known, validate_permission_name, ACTIVE_TAB};
use crate::snapshot::LedgerSnapshot;
use crate::state::{
    apply_status, purge_entries, replace_entries, ActiveTabGrant, Entries, Expiration, LedgerState,
};
use crate::status::PermissionStatus;
use crate::tab::TabId;
use crate::view::{LedgerView, StatusResolution};
use crate::Result;

#[derive(Debug, Clone)]
pub struct LedgerOptions {
    /// Permissions a user gesture unlocks for its tab
    pub gesture_permissions: HashSet<String>,
    /// Buffered change events per subscriber
    pub event_capacity: usize,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            gesture_permissions: [ACTIVE_TAB.to_string()].into_iter().collect(),
            event_capacity: 64,
        }
    }
}

pub struct PermissionLedger {
    declared: Arc<DeclaredPermissions>,
    state: RwLock<Arc<LedgerState>>,
    writer: Mutex<()>,
    clock: Arc<dyn Clock>,
    gesture_permissions: HashSet<String>,
    events: broadcast::Sender<LedgerEvent>,
}

impl PermissionLedger {
    pub fn new(declared: DeclaredPermissions) -> Self {
        Self::with_options(declared, Arc::new(SystemClock), LedgerOptions::default())
    }

    pub fn with_clock(declared: DeclaredPermissions, clock: Arc<dyn Clock>) -> Self {
        Self::with_options(declared, clock, LedgerOptions::default())
    }

    pub fn with_options(
        declared: DeclaredPermissions,
        clock: Arc<dyn Clock>,
        options: LedgerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));

        Self {
            declared: Arc::new(declared),
            state: RwLock::new(Arc::new(LedgerState::default())),
            writer: Mutex::new(()),
            clock,
            gesture_permissions: options.gesture_permissions,
            events,
        }
    }

    pub fn declared(&self) -> &DeclaredPermissions {
        &self.declared
    }

    /// Subscribe to change events
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Consistent view at the clock's current time
    pub fn view(&self) -> LedgerView<'_> {
        self.view_at(self.clock.now())
    }

    /// Consistent view evaluating expirations at `now`
    pub fn view_at(&self, now: DateTime<Utc>) -> LedgerView<'_> {
        LedgerView::new(&self.declared, self.current(), now)
    }

    // === Queries ===

    pub fn permission_status(&self, permission: &str, tab: Option<&TabId>) -> PermissionStatus {
        self.view().permission_status(permission, tab)
    }

    pub fn url_status(&self, url: &Url, tab: Option<&TabId>) -> PermissionStatus {
        self.view().url_status(url, tab)
    }

    pub fn pattern_status(&self, pattern: &MatchPattern, tab: Option<&TabId>) -> PermissionStatus {
        self.view().pattern_status(pattern, tab)
    }

    pub fn resolve_url(&self, url: &Url, tab: Option<&TabId>) -> StatusResolution {
        self.view().resolve_url(url, tab)
    }

    pub fn resolve_pattern(&self, pattern: &MatchPattern, tab: Option<&TabId>) -> StatusResolution {
        self.view().resolve_pattern(pattern, tab)
    }

    pub fn has_permission(&self, permission: &str, tab: Option<&TabId>) -> bool {
        self.view().has_permission(permission, tab)
    }

    pub fn has_access_to_url(&self, url: &Url, tab: Option<&TabId>) -> bool {
        self.view().has_access_to_url(url, tab)
    }

    pub fn has_access_to_all_urls(&self) -> bool {
        self.view().has_access_to_all_urls()
    }

    pub fn has_access_to_all_hosts(&self) -> bool {
        self.view().has_access_to_all_hosts()
    }

    pub fn current_permissions(&self) -> BTreeSet<String> {
        self.view().current_permissions()
    }

    pub fn current_patterns(&self) -> BTreeSet<MatchPattern> {
        self.view().current_patterns()
    }

    pub fn granted_permissions(&self) -> HashMap<String, Expiration> {
        self.view().granted_permissions()
    }

    pub fn denied_permissions(&self) -> HashMap<String, Expiration> {
        self.view().denied_permissions()
    }

    pub fn granted_patterns(&self) -> HashMap<MatchPattern, Expiration> {
        self.view().granted_patterns()
    }

    pub fn denied_patterns(&self) -> HashMap<MatchPattern, Expiration> {
        self.view().denied_patterns()
    }

    pub fn is_implicitly_denied(&self) -> bool {
        self.current().implicitly_denied
    }

    // === Explicit status writes ===

    /// Grant, deny, or (with `Unknown`) forget a permission
    pub fn set_permission_status(
        &self,
        status: PermissionStatus,
        permission: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<()> {
        ensure_settable(status)?;
        validate_permission_name(permission)?;
        if !is_well_known(permission) {
            tracing::debug!(permission = %permission, "Unfamiliar permission name");
        }

        self.commit(|state| {
            let mut changes = ChangeSet::new();
            apply_status(
                &mut state.granted_permissions,
                &mut state.denied_permissions,
                permission.to_string(),
                status,
                expiration,
                &mut changes,
            );
            ((), changes.into_permission_events())
        });

        tracing::debug!(
            permission = %permission,
            status = %status,
            expiration = ?expiration,
            "Set permission status"
        );

        Ok(())
    }

    /// Grant, deny, or (with `Unknown`) forget a match pattern
    pub fn set_pattern_status(
        &self,
        status: PermissionStatus,
        pattern: &MatchPattern,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<()> {
        ensure_settable(status)?;

        self.commit(|state| {
            let mut changes = ChangeSet::new();
            apply_status(
                &mut state.granted_patterns,
                &mut state.denied_patterns,
                pattern.clone(),
                status,
                expiration,
                &mut changes,
            );
            ((), changes.into_pattern_events())
        });

        tracing::debug!(
            pattern = %pattern,
            status = %status,
            expiration = ?expiration,
            "Set pattern status"
        );

        Ok(())
    }

    /// Set the status of the URL's origin (`scheme://host/*`)
    pub fn set_url_status(
        &self,
        status: PermissionStatus,
        url: &Url,
        expiration: Option<DateTime<Utc>>,
    ) -> Result<()> {
        ensure_settable(status)?;
        let pattern = MatchPattern::for_url_origin(url)?;
        self.set_pattern_status(status, &pattern, expiration)
    }

    pub fn set_granted_permissions(&self, entries: HashMap<String, Expiration>) -> Result<()> {
        self.replace_permissions(entries, true)
    }

    pub fn set_denied_permissions(&self, entries: HashMap<String, Expiration>) -> Result<()> {
        self.replace_permissions(entries, false)
    }

    pub fn set_granted_patterns(&self, entries: HashMap<MatchPattern, Expiration>) {
        self.replace_patterns(entries, true)
    }

    pub fn set_denied_patterns(&self, entries: HashMap<MatchPattern, Expiration>) {
        self.replace_patterns(entries, false)
    }

    fn replace_permissions(&self, entries: Entries<String>, grant: bool) -> Result<()> {
        for permission in entries.keys() {
            validate_permission_name(permission)?;
        }

        let count = entries.len();
        self.commit(|state| {
            let mut changes = ChangeSet::new();
            let (target, opposite) = if grant {
                (&mut state.granted_permissions, &mut state.denied_permissions)
            } else {
                (&mut state.denied_permissions, &mut state.granted_permissions)
            };
            replace_entries(target, opposite, entries, grant, &mut changes);
            ((), changes.into_permission_events())
        });

        tracing::debug!(count, granted = grant, "Replaced permission entries");
        Ok(())
    }

    fn replace_patterns(&self, entries: Entries<MatchPattern>, grant: bool) {
        let count = entries.len();
        self.commit(|state| {
            let mut changes = ChangeSet::new();
            let (target, opposite) = if grant {
                (&mut state.granted_patterns, &mut state.denied_patterns)
            } else {
                (&mut state.denied_patterns, &mut state.granted_patterns)
            };
            replace_entries(target, opposite, entries, grant, &mut changes);
            ((), changes.into_pattern_events())
        });

        tracing::debug!(count, granted = grant, "Replaced pattern entries");
    }

    /// Host policy: implicitly deny every manifest-mandatory permission
    pub fn set_implicitly_denied(&self, denied: bool) {
        self.update(|state| state.implicitly_denied = denied);
        tracing::debug!(denied, "Set implicit denial policy");
    }

    /// Remove entries whose expiration has passed. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();

        self.commit(|state| {
            let mut permissions = ChangeSet::new();
            purge_entries(
                &mut state.granted_permissions,
                &mut state.denied_permissions,
                now,
                &mut permissions,
            );

            let mut patterns = ChangeSet::new();
            purge_entries(
                &mut state.granted_patterns,
                &mut state.denied_patterns,
                now,
                &mut patterns,
            );

            let removed = permissions.len() + patterns.len();
            if !permissions.is_empty() || !patterns.is_empty() {
                tracing::debug!(removed, "Purged expired entries");
            }

            let mut events = permissions.into_permission_events();
            events.extend(patterns.into_pattern_events());
            (removed, events)
        })
    }

    // === Active-tab gestures ===

    /// A user gesture in `tab` unlocks the gesture permissions for that tab.
    ///
    /// Nothing is recorded unless `activeTab` is granted outside of any tab.
    /// Returns whether the gesture was recorded.
    pub fn record_user_gesture(&self, tab: &TabId) -> bool {
        self.record_gesture(tab, None)
    }

    /// Like [`record_user_gesture`](Self::record_user_gesture), also unlocking
    /// the origin of the page shown in the tab
    pub fn record_user_gesture_for_url(&self, tab: &TabId, url: &Url) -> Result<bool> {
        let pattern = MatchPattern::for_url_origin(url)?;
        Ok(self.record_gesture(tab, Some(pattern)))
    }

    fn record_gesture(&self, tab: &TabId, pattern: Option<MatchPattern>) -> bool {
        if !self.view().gestures_allowed() {
            tracing::debug!(tab = %tab, "Ignored user gesture without activeTab access");
            return false;
        }

        tracing::debug!(tab = %tab, pattern = ?pattern, "Recorded user gesture");

        let permissions = self.gesture_permissions.clone();
        self.update(|state| {
            state
                .active_tab_grants
                .insert(tab.clone(), ActiveTabGrant { permissions, pattern });
        });
        true
    }

    pub fn has_active_user_gesture(&self, tab: &TabId) -> bool {
        self.current().active_tab_grants.contains_key(tab)
    }

    /// Drop the gesture grant for `tab`, e.g. after it navigates
    pub fn clear_user_gesture(&self, tab: &TabId) {
        if !self.has_active_user_gesture(tab) {
            return;
        }

        self.update(|state| {
            state.active_tab_grants.remove(tab);
        });

        tracing::debug!(tab = %tab, "Cleared user gesture");
    }

    // === Snapshots ===

    /// Explicit entries and policy, without gesture grants
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::capture(&self.current())
    }

    /// Replace explicit entries and policy with a snapshot's. Gesture grants
    /// are kept. No change events are published.
    pub fn restore(&self, snapshot: LedgerSnapshot) -> Result<()> {
        let restored = snapshot.into_state()?;

        self.update(|state| {
            let active_tab_grants = std::mem::take(&mut state.active_tab_grants);
            *state = LedgerState {
                active_tab_grants,
                ..restored
            };
        });

        tracing::debug!("Restored ledger from snapshot");
        Ok(())
    }

    fn current(&self) -> Arc<LedgerState> {
        Arc::clone(&self.state.read())
    }

    fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut LedgerState) -> R,
    {
        self.commit(|state| (f(state), Vec::new()))
    }

    /// Apply `f` to a copy of the state, swap it in, then publish the events
    /// it produced. The writer lock is held throughout, so subscribers see
    /// events in the same order as the swaps.
    fn commit<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut LedgerState) -> (R, Vec<LedgerEvent>),
    {
        let _writer = self.writer.lock();
        let mut next = LedgerState::clone(&self.current());
        let (result, events) = f(&mut next);
        *self.state.write() = Arc::new(next);

        for event in events {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
        result
    }
}

fn ensure_settable(status: PermissionStatus) -> Result<()> {
    if status.is_settable() {
        Ok(())
    } else {
        Err(LedgerError::InvalidStatus(status))
    }
}
