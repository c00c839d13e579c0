//! Explicit ledger entries
//!
//! A `LedgerState` is never mutated in place once published: writers clone
//! it, apply their change, and swap the new state in.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use warden_match::MatchPattern;

use crate::events::ChangeSet;
use crate::status::PermissionStatus;
use crate::tab::TabId;

/// `None` never expires
pub(crate) type Expiration = Option<DateTime<Utc>>;

pub(crate) type Entries<K> = HashMap<K, Expiration>;

/// Permissions (and optionally a tab-origin pattern) unlocked by a user gesture
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveTabGrant {
    pub permissions: HashSet<String>,
    pub pattern: Option<MatchPattern>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LedgerState {
    pub granted_permissions: Entries<String>,
    pub denied_permissions: Entries<String>,
    pub granted_patterns: Entries<MatchPattern>,
    pub denied_patterns: Entries<MatchPattern>,
    pub active_tab_grants: HashMap<TabId, ActiveTabGrant>,
    /// Host policy blocking the extension's mandatory permissions
    pub implicitly_denied: bool,
}

/// An entry expiring at exactly `now` is already gone
pub(crate) fn is_live(expiration: &Expiration, now: DateTime<Utc>) -> bool {
    expiration.map_or(true, |at| at > now)
}

pub(crate) fn live_entries<K: Clone + Eq + Hash>(
    entries: &Entries<K>,
    now: DateTime<Utc>,
) -> HashMap<K, Expiration> {
    entries
        .iter()
        .filter(|(_, expiration)| is_live(expiration, now))
        .map(|(key, expiration)| (key.clone(), *expiration))
        .collect()
}

/// Write one explicit status for `key`, keeping grant and denial exclusive.
/// `status` must be settable.
pub(crate) fn apply_status<K: Clone + Eq + Hash + Ord>(
    granted: &mut Entries<K>,
    denied: &mut Entries<K>,
    key: K,
    status: PermissionStatus,
    expiration: Expiration,
    changes: &mut ChangeSet<K>,
) {
    match status {
        PermissionStatus::GrantedExplicitly => {
            if denied.remove(&key).is_some() {
                changes.denials_removed.insert(key.clone());
            }
            granted.insert(key.clone(), expiration);
            changes.granted.insert(key);
        }
        PermissionStatus::DeniedExplicitly => {
            if granted.remove(&key).is_some() {
                changes.grants_removed.insert(key.clone());
            }
            denied.insert(key.clone(), expiration);
            changes.denied.insert(key);
        }
        _ => {
            if granted.remove(&key).is_some() {
                changes.grants_removed.insert(key.clone());
            }
            if denied.remove(&key).is_some() {
                changes.denials_removed.insert(key);
            }
        }
    }
}

/// Replace every entry of `target` with `entries`, dropping conflicting keys
/// from `opposite`. Reports keys against `target_is_grant`.
pub(crate) fn replace_entries<K: Clone + Eq + Hash + Ord>(
    target: &mut Entries<K>,
    opposite: &mut Entries<K>,
    entries: Entries<K>,
    target_is_grant: bool,
    changes: &mut ChangeSet<K>,
) {
    let (added, removed, opposite_removed) = if target_is_grant {
        (
            &mut changes.granted,
            &mut changes.grants_removed,
            &mut changes.denials_removed,
        )
    } else {
        (
            &mut changes.denied,
            &mut changes.denials_removed,
            &mut changes.grants_removed,
        )
    };

    for key in target.keys() {
        if !entries.contains_key(key) {
            removed.insert(key.clone());
        }
    }

    for key in entries.keys() {
        if opposite.remove(key).is_some() {
            opposite_removed.insert(key.clone());
        }
        added.insert(key.clone());
    }

    *target = entries;
}

/// Drop expired entries from both maps
pub(crate) fn purge_entries<K: Clone + Eq + Hash + Ord>(
    granted: &mut Entries<K>,
    denied: &mut Entries<K>,
    now: DateTime<Utc>,
    changes: &mut ChangeSet<K>,
) {
    granted.retain(|key, expiration| {
        let keep = is_live(expiration, now);
        if !keep {
            changes.grants_removed.insert(key.clone());
        }
        keep
    });
    denied.retain(|key, expiration| {
        let keep = is_live(expiration, now);
        if !keep {
            changes.denials_removed.insert(key.clone());
        }
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_is_live() {
        let now = Utc::now();
        assert!(is_live(&None, now));
        assert!(is_live(&Some(now + Duration::seconds(1)), now));
        assert!(!is_live(&Some(now), now));
        assert!(!is_live(&Some(now - Duration::seconds(1)), now));
    }

    #[test]
    fn test_apply_status_exclusive() {
        let mut granted = Entries::new();
        let mut denied = Entries::new();
        let mut changes = ChangeSet::new();

        apply_status(
            &mut granted,
            &mut denied,
            "tabs".to_string(),
            PermissionStatus::GrantedExplicitly,
            None,
            &mut changes,
        );
        apply_status(
            &mut granted,
            &mut denied,
            "tabs".to_string(),
            PermissionStatus::DeniedExplicitly,
            None,
            &mut changes,
        );

        assert!(granted.is_empty());
        assert!(denied.contains_key("tabs"));
        assert!(changes.grants_removed.contains("tabs"));
        assert!(changes.denied.contains("tabs"));
    }

    #[test]
    fn test_replace_entries_reports_removed_keys() {
        let mut granted: Entries<String> = [("a".to_string(), None), ("b".to_string(), None)]
            .into_iter()
            .collect();
        let mut denied: Entries<String> = [("c".to_string(), None)].into_iter().collect();
        let mut changes = ChangeSet::new();

        let next: Entries<String> = [("b".to_string(), None), ("c".to_string(), None)]
            .into_iter()
            .collect();
        replace_entries(&mut granted, &mut denied, next, true, &mut changes);

        assert_eq!(granted.len(), 2);
        assert!(denied.is_empty());
        assert!(changes.grants_removed.contains("a"));
        assert!(changes.denials_removed.contains("c"));
        assert!(changes.granted.contains("b"));
        assert!(changes.granted.contains("c"));
    }

    #[test]
    fn test_purge_entries() {
        let now = Utc::now();
        let mut granted: Entries<String> = [
            ("old".to_string(), Some(now - Duration::hours(1))),
            ("forever".to_string(), None),
        ]
        .into_iter()
        .collect();
        let mut denied: Entries<String> = [("stale".to_string(), Some(now))].into_iter().collect();
        let mut changes = ChangeSet::new();

        purge_entries(&mut granted, &mut denied, now, &mut changes);

        assert_eq!(granted.len(), 1);
        assert!(denied.is_empty());
        assert_eq!(changes.len(), 2);
    }
}
