//! Display Snapshots and Change Detection
//!
//! Value types describing what a display looks like at one point in time:
//!
//! - [`DisplayId`] - platform-assigned id, [`DisplayId::DEFAULT`] is the primary display
//! - [`DisplayIdentity`] - rotation-independent key for a physical panel
//! - [`Info`] - immutable snapshot of one display's configuration
//! - [`ChangeFlags`] - which categories of configuration differ between two snapshots
//!
//! Snapshots are produced by [`Info::capture`] and published by the
//! [`DisplayController`](crate::controller::DisplayController) behind an `Arc`.

mod change;
mod identity;
mod info;

pub use change::{diff, Change, ChangeFlags};
pub use identity::{DisplayId, DisplayIdentity};
pub use info::{Info, NavigationMode, DENSITY_DEFAULT};
