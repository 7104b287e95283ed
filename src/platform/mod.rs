//! Platform Integration
//!
//! The controller never talks to the OS directly. Everything it needs to know about
//! displays comes through [`DisplayPlatform`]:
//!
//! - **Queries:** enumerate displays, observe one display, list internal panels
//! - **Callbacks:** explicit register/unregister pairs for per-display configuration
//!   changes and for system events (hot-plug, theme/overlay broadcasts)
//!
//! Callbacks fire on whatever thread the platform likes. They only ever post to the
//! [`EventSink`] handed over at registration, which marshals the event onto the
//! controller's executor.
//!
//! [`StaticPlatform`] is an in-memory implementation used by the CLI and the tests.

mod static_platform;

pub use static_platform::StaticPlatform;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounds::{BoundsObservation, EstimatorInputs, Insets, Rotation, Size};
use crate::controller::EventSink;
use crate::display::{DisplayId, DisplayIdentity, NavigationMode};

/// Platform result type
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Platform error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Display does not exist (or no longer exists)
    #[error("Display not found: {0}")]
    DisplayNotFound(DisplayId),

    /// Display exists but could not be queried
    #[error("Query failed for {display}: {reason}")]
    QueryFailed {
        /// Display being queried
        display: DisplayId,
        /// Platform-specific reason
        reason: String,
    },

    /// Callback registration was refused
    #[error("Callback registration failed: {0}")]
    RegistrationFailed(String),
}

/// Raw geometry of one display at its active rotation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    /// Platform unique id, stable across reconnects
    pub unique_id: String,
    /// Raw size at the active rotation
    pub size: Size,
    /// Active rotation
    pub rotation: Rotation,
    /// System insets at the active rotation
    pub insets: Insets,
    /// Cutout insets at the active rotation
    pub cutout: Insets,
}

impl DisplayGeometry {
    /// Rotation-independent identity of this panel
    pub fn identity(&self) -> DisplayIdentity {
        DisplayIdentity::from_geometry(&self.unique_id, self.size, self.rotation, self.cutout)
    }

    /// The live bounds as the estimator sees them
    pub fn bounds_observation(&self) -> BoundsObservation {
        BoundsObservation {
            rotation: self.rotation,
            size: self.size,
            insets: self.insets,
        }
    }

    /// Turn the panel to `rotation`, carrying size, insets and cutout along
    pub fn rotate_to(&mut self, rotation: Rotation) {
        let delta = self.rotation.delta_to(rotation);
        self.size = self.size.rotated(delta);
        self.insets = self.insets.rotated(delta);
        self.cutout = self.cutout.rotated(delta);
        self.rotation = rotation;
    }
}

/// Everything the platform reports about one display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayObservation {
    /// Raw geometry
    pub geometry: DisplayGeometry,
    /// Density in dots per inch
    pub density_dpi: u32,
    /// User font scale
    pub font_scale: f32,
    /// System navigation scheme
    pub navigation_mode: NavigationMode,
    /// Dark theme is active
    pub night_mode: bool,
    /// Desktop windowing is the default experience
    pub desktop_first_mode: bool,
    /// Taskbar is in its freeform desktop form
    pub desktop_taskbar: bool,
    /// User pinned the taskbar
    pub taskbar_pinned: bool,
    /// Taskbar stays visible on the home screen
    pub locked_taskbar_on_home: bool,
    /// Home screen is currently visible
    pub home_visible: bool,
}

impl DisplayObservation {
    /// Values that feed bounds estimation
    pub fn estimator_inputs(&self) -> EstimatorInputs {
        EstimatorInputs {
            density_dpi: self.density_dpi,
            font_scale: self.font_scale,
            navigation_mode: self.navigation_mode,
        }
    }
}

impl Default for DisplayObservation {
    fn default() -> Self {
        Self {
            geometry: DisplayGeometry::default(),
            density_dpi: crate::display::DENSITY_DEFAULT,
            font_scale: 1.0,
            navigation_mode: NavigationMode::default(),
            night_mode: false,
            desktop_first_mode: false,
            desktop_taskbar: false,
            taskbar_pinned: false,
            locked_taskbar_on_home: false,
            home_visible: true,
        }
    }
}

/// What a callback registration listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackScope {
    /// Configuration changes of one display
    Display(DisplayId),
    /// Hot-plug and theme/overlay broadcasts
    System,
}

/// Handle returned by a successful registration
///
/// Must be passed back to [`DisplayPlatform::unregister`] to release the callback.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CallbackRegistration {
    scope: CallbackScope,
    token: u64,
}

impl CallbackRegistration {
    /// Wrap a platform token
    pub fn new(scope: CallbackScope, token: u64) -> Self {
        Self { scope, token }
    }

    /// What this registration listens to
    pub fn scope(&self) -> CallbackScope {
        self.scope
    }

    /// Platform token
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// OS display services consumed by the controller
#[cfg_attr(test, mockall::automock)]
pub trait DisplayPlatform: Send + Sync {
    /// Ids of every connected display
    fn enumerate(&self) -> Vec<DisplayId>;

    /// Live state of `display`
    fn observe(&self, display: DisplayId) -> Result<DisplayObservation>;

    /// Geometry of every built-in panel (for foldables, more than one)
    fn internal_displays(&self) -> Vec<DisplayGeometry>;

    /// Post `sink.configuration_changed(display)` whenever density, font scale,
    /// rotation or navigation mode of `display` changes
    fn register_config_callback(
        &self,
        display: DisplayId,
        sink: EventSink,
    ) -> Result<CallbackRegistration>;

    /// Post hot-plug and theme/overlay events to `sink`
    fn register_system_callback(&self, sink: EventSink) -> Result<CallbackRegistration>;

    /// Release a registration; its sink receives nothing afterwards
    fn unregister(&self, registration: CallbackRegistration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_to_round_trip() {
        let mut geometry = DisplayGeometry {
            unique_id: "local:0".to_string(),
            size: Size::new(1080, 2400),
            rotation: Rotation::R0,
            insets: Insets::new(0, 118, 0, 63),
            cutout: Insets::new(0, 80, 0, 0),
        };
        let original = geometry.clone();

        geometry.rotate_to(Rotation::R90);
        assert_eq!(geometry.size, Size::new(2400, 1080));
        assert_eq!(geometry.insets, Insets::new(118, 0, 63, 0));
        assert_eq!(geometry.identity(), original.identity());

        geometry.rotate_to(Rotation::R270);
        geometry.rotate_to(Rotation::R0);
        assert_eq!(geometry, original);
    }

    #[test]
    fn test_default_observation_inputs() {
        let inputs = DisplayObservation::default().estimator_inputs();
        assert_eq!(inputs.density_dpi, 160);
        assert_eq!(inputs.navigation_mode, NavigationMode::Gesture);
    }
}
