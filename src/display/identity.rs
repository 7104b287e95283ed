//! Display ids and rotation-independent display identity

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bounds::{Insets, Rotation, Size};

/// Platform-assigned display id
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DisplayId(pub u32);

impl DisplayId {
    /// The primary display
    pub const DEFAULT: DisplayId = DisplayId(0);

    /// True for the primary display
    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "display {}", self.0)
    }
}

impl From<u32> for DisplayId {
    fn from(id: u32) -> Self {
        DisplayId(id)
    }
}

/// Identity of a physical display, independent of its current rotation
///
/// Built by rotating the observed geometry back to the natural orientation, so the
/// same panel produces the same identity in every rotation. Used as the bounds cache
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayIdentity {
    unique_id: String,
    natural_size: Size,
    cutout: Insets,
}

impl DisplayIdentity {
    /// Normalize geometry observed at `rotation`
    ///
    /// `size` and `cutout` are as seen at `rotation`.
    pub fn from_geometry(unique_id: &str, size: Size, rotation: Rotation, cutout: Insets) -> Self {
        let undo = rotation.inverse();
        Self {
            unique_id: unique_id.to_string(),
            natural_size: size.rotated(undo),
            cutout: cutout.rotated(undo),
        }
    }

    /// Platform unique id (stable across reconnects)
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// Size at rotation 0
    pub fn natural_size(&self) -> Size {
        self.natural_size
    }

    /// Cutout insets at rotation 0
    pub fn cutout(&self) -> Insets {
        self.cutout
    }
}

impl fmt::Display for DisplayIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.unique_id, self.natural_size)
    }
}
