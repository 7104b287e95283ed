//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::bounds::{Insets, Rotation, Size};
use crate::display::{DisplayId, NavigationMode, DENSITY_DEFAULT};
use crate::platform::{DisplayGeometry, DisplayObservation};

/// Display controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Track every display the platform reports, including hot-plugged ones.
    /// When false only the default display is tracked.
    #[serde(default = "default_multi_display")]
    pub multi_display: bool,

    /// Maximum number of displays tracked at once
    #[serde(default = "default_max_displays")]
    pub max_displays: usize,

    /// Name of the executor thread
    #[serde(default = "default_executor_thread_name")]
    pub executor_thread_name: String,
}

fn default_multi_display() -> bool {
    true
}

fn default_max_displays() -> usize {
    4
}

fn default_executor_thread_name() -> String {
    "display-controller".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            multi_display: default_multi_display(),
            max_displays: default_max_displays(),
            executor_thread_name: default_executor_thread_name(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    pub level: String,

    /// Output format ("pretty", "compact", "json")
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: default_log_format(),
            file: None,
        }
    }
}

/// One display of the in-memory platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Platform display id (0 is the default display)
    pub id: u32,

    /// Stable unique id of the panel
    pub unique_id: String,

    /// Width at `rotation`
    pub width: u32,

    /// Height at `rotation`
    pub height: u32,

    /// Active rotation in quarter turns (0-3)
    #[serde(default)]
    pub rotation: Rotation,

    /// System insets at `rotation`
    #[serde(default)]
    pub insets: Insets,

    /// Cutout insets at `rotation`
    #[serde(default)]
    pub cutout: Insets,

    /// Density in dpi
    #[serde(default = "default_density")]
    pub density_dpi: u32,

    /// User font scale
    #[serde(default = "default_font_scale")]
    pub font_scale: f32,

    /// Navigation scheme ("three_button", "two_button", "gesture")
    #[serde(default)]
    pub navigation_mode: NavigationMode,

    /// Dark theme active
    #[serde(default)]
    pub night_mode: bool,

    /// Desktop windowing is the default experience
    #[serde(default)]
    pub desktop_first_mode: bool,

    /// Taskbar in its desktop form
    #[serde(default)]
    pub desktop_taskbar: bool,

    /// Taskbar pinned by the user
    #[serde(default)]
    pub taskbar_pinned: bool,

    /// Taskbar stays visible on the home screen
    #[serde(default)]
    pub locked_taskbar_on_home: bool,

    /// Home screen visible
    #[serde(default = "default_home_visible")]
    pub home_visible: bool,

    /// Built-in panel; its bounds count as supported bounds of every display
    #[serde(default)]
    pub internal: bool,
}

fn default_density() -> u32 {
    DENSITY_DEFAULT
}

fn default_font_scale() -> f32 {
    1.0
}

fn default_home_visible() -> bool {
    true
}

impl DisplayConfig {
    /// Platform display id
    pub fn display_id(&self) -> DisplayId {
        DisplayId(self.id)
    }

    /// Raw geometry as the platform reports it
    pub fn geometry(&self) -> DisplayGeometry {
        DisplayGeometry {
            unique_id: self.unique_id.clone(),
            size: Size::new(self.width, self.height),
            rotation: self.rotation,
            insets: self.insets,
            cutout: self.cutout,
        }
    }

    /// Full observation as the platform reports it
    pub fn observation(&self) -> DisplayObservation {
        DisplayObservation {
            geometry: self.geometry(),
            density_dpi: self.density_dpi,
            font_scale: self.font_scale,
            navigation_mode: self.navigation_mode,
            night_mode: self.night_mode,
            desktop_first_mode: self.desktop_first_mode,
            desktop_taskbar: self.desktop_taskbar,
            taskbar_pinned: self.taskbar_pinned,
            locked_taskbar_on_home: self.locked_taskbar_on_home,
            home_visible: self.home_visible,
        }
    }
}

/// A scripted platform change, replayed in order by the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ScriptedEvent {
    /// Turn a display to `rotation` (quarter turns)
    Rotate { display: u32, rotation: Rotation },

    /// Change density
    Density { display: u32, dpi: u32 },

    /// Change user font scale
    FontScale { display: u32, scale: f32 },

    /// Switch navigation scheme
    Navigation { display: u32, mode: NavigationMode },

    /// Toggle dark theme on one display
    NightMode { display: u32, enabled: bool },

    /// Change taskbar state; absent fields are left alone
    Taskbar {
        display: u32,
        #[serde(default)]
        pinned: Option<bool>,
        #[serde(default)]
        desktop: Option<bool>,
        #[serde(default)]
        locked_on_home: Option<bool>,
    },

    /// Show or hide the home screen
    HomeVisible { display: u32, visible: bool },

    /// Theme/overlay broadcast, optionally switching night mode everywhere
    Theme {
        #[serde(default)]
        night_mode: Option<bool>,
    },

    /// Hot-plug a display
    Connect(DisplayConfig),

    /// Unplug a display
    Disconnect { display: u32 },
}

impl ScriptedEvent {
    /// Display the event targets, if it targets one
    pub fn display(&self) -> Option<DisplayId> {
        match self {
            Self::Rotate { display, .. }
            | Self::Density { display, .. }
            | Self::FontScale { display, .. }
            | Self::Navigation { display, .. }
            | Self::NightMode { display, .. }
            | Self::Taskbar { display, .. }
            | Self::HomeVisible { display, .. }
            | Self::Disconnect { display } => Some(DisplayId(*display)),
            Self::Connect(config) => Some(config.display_id()),
            Self::Theme { .. } => None,
        }
    }
}
