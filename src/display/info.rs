//! Display configuration snapshot

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::change::ChangeFlags;
use super::identity::{DisplayId, DisplayIdentity};
use crate::bounds::{BoundsCache, Rotation, WindowBounds};
use crate::platform::{self, DisplayObservation, DisplayPlatform};

/// Baseline density that maps to a scale factor of 1.0
pub const DENSITY_DEFAULT: u32 = 160;

/// System navigation scheme
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    /// Back, home and recents buttons
    ThreeButton,
    /// Home pill plus back button
    TwoButton,
    /// Fully gestural
    #[default]
    Gesture,
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationMode::ThreeButton => write!(f, "3-button"),
            NavigationMode::TwoButton => write!(f, "2-button"),
            NavigationMode::Gesture => write!(f, "gesture"),
        }
    }
}

/// Immutable capture of one display's configuration
///
/// A new `Info` is built on every recompute; published snapshots are never modified.
/// Compare two snapshots with [`ChangeFlags::between`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Info {
    /// Display this snapshot describes
    pub display: DisplayId,
    /// Rotation-independent identity
    pub identity: DisplayIdentity,
    /// Active rotation
    pub rotation: Rotation,
    /// Live window bounds at the active rotation
    pub current_bounds: WindowBounds,
    /// Density in dots per inch
    pub density_dpi: u32,
    /// User font scale
    pub font_scale: f32,
    /// System navigation scheme
    pub navigation_mode: NavigationMode,
    /// Bounds of every rotation of every internal display plus this one
    pub supported_bounds: BTreeSet<WindowBounds>,
    /// Desktop windowing is the default experience
    pub desktop_first_mode: bool,
    /// Taskbar stays visible on the home screen
    pub locked_taskbar_on_home: bool,
    /// Taskbar is in its freeform desktop form
    pub desktop_taskbar: bool,
    /// User pinned the taskbar
    pub taskbar_pinned: bool,
    /// Dark theme is active
    pub night_mode: bool,
    /// Home screen is currently visible
    pub home_visible: bool,
    /// Capture counter, increases with every recompute
    pub sequence: u64,
}

impl Info {
    /// Query the platform and build a snapshot
    ///
    /// Reads the live observation for `display` plus the device's internal displays and
    /// resolves their bounds through `cache`. Only `cache` is modified.
    ///
    /// # Errors
    ///
    /// Returns the platform's error if `display` cannot be observed.
    pub fn capture(
        platform: &dyn DisplayPlatform,
        display: DisplayId,
        cache: &mut BoundsCache,
        sequence: u64,
    ) -> platform::Result<Self> {
        let observation = platform.observe(display)?;
        let internal = platform.internal_displays();
        Ok(Self::from_observation(
            display,
            &observation,
            &internal,
            cache,
            sequence,
        ))
    }

    /// Build a snapshot from an observation already in hand
    pub fn from_observation(
        display: DisplayId,
        observation: &DisplayObservation,
        internal: &[platform::DisplayGeometry],
        cache: &mut BoundsCache,
        sequence: u64,
    ) -> Self {
        let geometry = &observation.geometry;
        let identity = geometry.identity();
        let inputs = observation.estimator_inputs();
        let live = geometry.bounds_observation();

        let mut supported_bounds: BTreeSet<WindowBounds> = cache
            .get_or_estimate(&identity, &live, inputs)
            .iter()
            .copied()
            .collect();

        for other in internal {
            let other_identity = other.identity();
            if other_identity == identity {
                continue;
            }
            let other_bounds =
                cache.get_or_estimate(&other_identity, &other.bounds_observation(), inputs);
            supported_bounds.extend(other_bounds.iter().copied());
        }

        Self {
            display,
            identity,
            rotation: geometry.rotation,
            current_bounds: live.window_bounds(),
            density_dpi: observation.density_dpi,
            font_scale: observation.font_scale,
            navigation_mode: observation.navigation_mode,
            supported_bounds,
            desktop_first_mode: observation.desktop_first_mode,
            locked_taskbar_on_home: observation.locked_taskbar_on_home,
            desktop_taskbar: observation.desktop_taskbar,
            taskbar_pinned: observation.taskbar_pinned,
            night_mode: observation.night_mode,
            home_visible: observation.home_visible,
            sequence,
        }
    }

    /// Density relative to [`DENSITY_DEFAULT`]
    pub fn scale_factor(&self) -> f32 {
        self.density_dpi as f32 / DENSITY_DEFAULT as f32
    }

    /// Which change categories differ from `previous`
    pub fn changes_since(&self, previous: &Info) -> ChangeFlags {
        ChangeFlags::between(previous, self)
    }

    /// Taskbar floats over apps instead of being pinned
    pub fn is_transient_taskbar(&self) -> bool {
        !self.taskbar_pinned && !self.desktop_taskbar
    }

    /// Taskbar is shown on the home screen right now
    pub fn shows_locked_taskbar_on_home(&self) -> bool {
        self.locked_taskbar_on_home && self.home_visible
    }
}
