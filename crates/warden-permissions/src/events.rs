//! Ledger change notifications
//!
//! Every write that changes explicit entries publishes one event per kind of
//! change on the ledger's broadcast channel.

use std::collections::BTreeSet;
use warden_match::MatchPattern;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    PermissionsGranted(BTreeSet<String>),
    PermissionsDenied(BTreeSet<String>),
    GrantedPermissionsRemoved(BTreeSet<String>),
    DeniedPermissionsRemoved(BTreeSet<String>),
    PatternsGranted(BTreeSet<MatchPattern>),
    PatternsDenied(BTreeSet<MatchPattern>),
    GrantedPatternsRemoved(BTreeSet<MatchPattern>),
    DeniedPatternsRemoved(BTreeSet<MatchPattern>),
}

/// Keys touched by a single write, grouped by kind of change
#[derive(Debug)]
pub(crate) struct ChangeSet<K> {
    pub granted: BTreeSet<K>,
    pub denied: BTreeSet<K>,
    pub grants_removed: BTreeSet<K>,
    pub denials_removed: BTreeSet<K>,
}

impl<K: Ord> ChangeSet<K> {
    pub fn new() -> Self {
        Self {
            granted: BTreeSet::new(),
            denied: BTreeSet::new(),
            grants_removed: BTreeSet::new(),
            denials_removed: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
            && self.denied.is_empty()
            && self.grants_removed.is_empty()
            && self.denials_removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.granted.len() + self.denied.len() + self.grants_removed.len() + self.denials_removed.len()
    }

    fn into_events(
        self,
        granted: fn(BTreeSet<K>) -> LedgerEvent,
        denied: fn(BTreeSet<K>) -> LedgerEvent,
        grants_removed: fn(BTreeSet<K>) -> LedgerEvent,
        denials_removed: fn(BTreeSet<K>) -> LedgerEvent,
    ) -> Vec<LedgerEvent> {
        // Removals first so observers never see both entries for one key
        [
            (self.grants_removed, grants_removed),
            (self.denials_removed, denials_removed),
            (self.granted, granted),
            (self.denied, denied),
        ]
        .into_iter()
        .filter(|(keys, _)| !keys.is_empty())
        .map(|(keys, make)| make(keys))
        .collect()
    }
}

impl ChangeSet<String> {
    pub fn into_permission_events(self) -> Vec<LedgerEvent> {
        self.into_events(
            LedgerEvent::PermissionsGranted,
            LedgerEvent::PermissionsDenied,
            LedgerEvent::GrantedPermissionsRemoved,
            LedgerEvent::DeniedPermissionsRemoved,
        )
    }
}

impl ChangeSet<MatchPattern> {
    pub fn into_pattern_events(self) -> Vec<LedgerEvent> {
        self.into_events(
            LedgerEvent::PatternsGranted,
            LedgerEvent::PatternsDenied,
            LedgerEvent::GrantedPatternsRemoved,
            LedgerEvent::DeniedPatternsRemoved,
        )
    }
}
