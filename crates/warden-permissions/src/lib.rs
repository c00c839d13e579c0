//! Warden Permissions
//!
//! Per-extension permission ledger. Resolves "can this extension use
//! permission P / touch URL U (in tab T)?" into a [`PermissionStatus`]:
//! ```text
//! explicit denial          → DeniedExplicitly
//! active-tab gesture grant → GrantedExplicitly
//! explicit grant           → GrantedExplicitly
//! requested in manifest    → GrantedImplicitly (DeniedImplicitly under policy)
//! optional in manifest     → RequestedImplicitly
//! anything else            → Unknown
//! ```
//!
//! Only explicit entries are stored. Implicit statuses are computed from the
//! declared sets on every query.

mod clock;
mod declared;
mod error;
mod events;
mod ledger;
pub mod permission;
mod snapshot;
mod state;
mod status;
mod tab;
mod view;

pub use clock::{Clock, FixedClock, SystemClock};
pub use declared::DeclaredPermissions;
pub use error::LedgerError;
pub use events::LedgerEvent;
pub use ledger::{LedgerOptions, PermissionLedger};
pub use snapshot::LedgerSnapshot;
pub use status::PermissionStatus;
pub use tab::TabId;
pub use view::{LedgerView, StatusResolution};

pub type Result<T> = std::result::Result<T, LedgerError>;
