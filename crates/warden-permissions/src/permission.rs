//! Permission names
//!
//! Names are open-ended strings; these are the ones hosts commonly grant.

use crate::error::LedgerError;
use crate::Result;

pub const ACTIVE_TAB: &str = "activeTab";
pub const ALARMS: &str = "alarms";
pub const CLIPBOARD_WRITE: &str = "clipboardWrite";
pub const CONTEXT_MENUS: &str = "contextMenus";
pub const COOKIES: &str = "cookies";
pub const DECLARATIVE_NET_REQUEST: &str = "declarativeNetRequest";
pub const DECLARATIVE_NET_REQUEST_FEEDBACK: &str = "declarativeNetRequestFeedback";
pub const DECLARATIVE_NET_REQUEST_WITH_HOST_ACCESS: &str = "declarativeNetRequestWithHostAccess";
pub const MENUS: &str = "menus";
pub const NATIVE_MESSAGING: &str = "nativeMessaging";
pub const NOTIFICATIONS: &str = "notifications";
pub const SCRIPTING: &str = "scripting";
pub const SIDE_PANEL: &str = "sidePanel";
pub const STORAGE: &str = "storage";
pub const TABS: &str = "tabs";
pub const UNLIMITED_STORAGE: &str = "unlimitedStorage";
pub const WEB_NAVIGATION: &str = "webNavigation";
pub const WEB_REQUEST: &str = "webRequest";

pub const WELL_KNOWN: &[&str] = &[
    ACTIVE_TAB,
    ALARMS,
    CLIPBOARD_WRITE,
    CONTEXT_MENUS,
    COOKIES,
    DECLARATIVE_NET_REQUEST,
    DECLARATIVE_NET_REQUEST_FEEDBACK,
    DECLARATIVE_NET_REQUEST_WITH_HOST_ACCESS,
    MENUS,
    NATIVE_MESSAGING,
    NOTIFICATIONS,
    SCRIPTING,
    SIDE_PANEL,
    STORAGE,
    TABS,
    UNLIMITED_STORAGE,
    WEB_NAVIGATION,
    WEB_REQUEST,
];

pub fn is_well_known(name: &str) -> bool {
    WELL_KNOWN.contains(&name)
}

/// Reject names that cannot be permissions: empty, containing whitespace,
/// or shaped like a match pattern.
pub fn validate_permission_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().any(char::is_whitespace) || name.contains("://") {
        return Err(LedgerError::InvalidPermission(name.to_string()));
    }
    Ok(())
}
