//! Change detection between two snapshots
//!
//! Each [`Change`] bit covers a fixed, disjoint group of [`Info`] fields:
//!
//! | Bit | Fields |
//! |---|---|
//! | `ActiveScreen` | identity, current bounds size |
//! | `Rotation` | rotation |
//! | `Density` | density, font scale |
//! | `NavigationMode` | navigation mode |
//! | `SupportedBounds` | supported bounds (as a set) |
//! | `TaskbarPinning` | taskbar pinned |
//! | `DesktopMode` | desktop-first mode, desktop taskbar |
//! | `LockedTaskbar` | locked taskbar on home, home visible |
//! | `NightMode` | night mode |
//!
//! Fields outside the table (display id, capture sequence) never set a bit.

use enumflags2::{bitflags, BitFlags};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use super::info::Info;

/// One category of observable change
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// A different physical display, or a different live size
    ActiveScreen = 1 << 0,
    /// Rotation changed
    Rotation = 1 << 1,
    /// Density or font scale changed
    Density = 1 << 2,
    /// Navigation mode changed
    NavigationMode = 1 << 3,
    /// Set of supported window bounds changed
    SupportedBounds = 1 << 4,
    /// Taskbar pinning changed
    TaskbarPinning = 1 << 5,
    /// Desktop mode changed
    DesktopMode = 1 << 6,
    /// Locked taskbar visibility on home changed
    LockedTaskbar = 1 << 7,
    /// Night mode changed
    NightMode = 1 << 8,
}

impl Change {
    /// Short name used in logs
    pub fn name(self) -> &'static str {
        match self {
            Change::ActiveScreen => "active-screen",
            Change::Rotation => "rotation",
            Change::Density => "density",
            Change::NavigationMode => "navigation-mode",
            Change::SupportedBounds => "supported-bounds",
            Change::TaskbarPinning => "taskbar-pinning",
            Change::DesktopMode => "desktop-mode",
            Change::LockedTaskbar => "locked-taskbar",
            Change::NightMode => "night-mode",
        }
    }
}

/// Set of [`Change`] bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChangeFlags(BitFlags<Change>);

impl ChangeFlags {
    /// No change
    pub fn empty() -> Self {
        Self(BitFlags::empty())
    }

    /// Every change
    pub fn all() -> Self {
        Self(BitFlags::all())
    }

    /// Compare two snapshots field by field
    pub fn between(old: &Info, new: &Info) -> Self {
        let mut flags = Self::empty();

        if old.identity != new.identity || old.current_bounds.size() != new.current_bounds.size() {
            flags |= Change::ActiveScreen;
        }
        if old.rotation != new.rotation {
            flags |= Change::Rotation;
        }
        if old.density_dpi != new.density_dpi || old.font_scale != new.font_scale {
            flags |= Change::Density;
        }
        if old.navigation_mode != new.navigation_mode {
            flags |= Change::NavigationMode;
        }
        if old.supported_bounds != new.supported_bounds {
            flags |= Change::SupportedBounds;
        }
        if old.taskbar_pinned != new.taskbar_pinned {
            flags |= Change::TaskbarPinning;
        }
        if old.desktop_first_mode != new.desktop_first_mode
            || old.desktop_taskbar != new.desktop_taskbar
        {
            flags |= Change::DesktopMode;
        }
        if old.locked_taskbar_on_home != new.locked_taskbar_on_home
            || old.home_visible != new.home_visible
        {
            flags |= Change::LockedTaskbar;
        }
        if old.night_mode != new.night_mode {
            flags |= Change::NightMode;
        }

        flags
    }

    /// True if `change` is set
    pub fn contains(self, change: Change) -> bool {
        self.0.contains(change)
    }

    /// True if any bit of `other` is set
    pub fn intersects(self, other: ChangeFlags) -> bool {
        self.0.intersects(other.0)
    }

    /// True if nothing changed
    pub fn is_empty(self) -> bool {
        self.0.is_empty()
    }

    /// Raw bit pattern
    pub fn bits(self) -> u32 {
        self.0.bits()
    }

    /// Set bits in declaration order
    pub fn iter(self) -> impl Iterator<Item = Change> {
        self.0.iter()
    }
}

/// Shorthand for [`ChangeFlags::between`]
pub fn diff(old: &Info, new: &Info) -> ChangeFlags {
    ChangeFlags::between(old, new)
}

impl From<Change> for ChangeFlags {
    fn from(change: Change) -> Self {
        Self(change.into())
    }
}

impl BitOr<Change> for ChangeFlags {
    type Output = ChangeFlags;

    fn bitor(self, rhs: Change) -> Self::Output {
        Self(self.0 | rhs)
    }
}

impl BitOr for ChangeFlags {
    type Output = ChangeFlags;

    fn bitor(self, rhs: ChangeFlags) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign<Change> for ChangeFlags {
    fn bitor_assign(&mut self, rhs: Change) {
        self.0 |= rhs;
    }
}

impl fmt::Display for ChangeFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.iter().map(Change::name).collect();
        write!(f, "{}", names.join("|"))
    }
}

impl Serialize for ChangeFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(Change::name))
    }
}
