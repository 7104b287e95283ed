//! # display-tracker
//!
//! Display-configuration tracking and window-bounds caching.
//!
//! Watches rotation, density, font scale, navigation mode and taskbar/desktop state
//! of every display, keeps a four-rotation window-bounds table per physical panel,
//! and tells interested subsystems (layout, taskbar) exactly which categories of
//! configuration changed.
//!
//! # Architecture
//!
//! ```text
//! display-tracker
//!   ├─> DisplayController (executor thread, listeners, priority listener)
//!   │     └─> PerDisplayTracker (one per display: Info + platform callback)
//!   ├─> Info::capture (live observation + BoundsCache → immutable snapshot)
//!   │     └─> BoundsCache (DisplayIdentity → [WindowBounds; 4])
//!   │           └─> BoundsEstimator (pure geometry)
//!   └─> DisplayPlatform (OS queries and callback registration)
//! ```
//!
//! # Data Flow
//!
//! **Change path:** platform callback → EventSink → executor → `Info::capture` →
//! `ChangeFlags::between` → priority listener → display listeners
//!
//! **Read path:** any thread → `DisplayController::info` → published `Arc<Info>`

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Window bounds geometry, estimation and caching
pub mod bounds;

/// Configuration loading and validation
pub mod config;

/// Change tracking and listener dispatch
pub mod controller;

/// Display snapshots and change detection
pub mod display;

/// Platform abstraction and the in-memory platform
pub mod platform;

pub use bounds::{BoundsCache, BoundsEstimator, Rotation, WindowBounds};
pub use config::{Config, ControllerConfig};
pub use controller::{DisplayController, DisplayError, EventSink, ListenerHandle};
pub use display::{Change, ChangeFlags, DisplayId, DisplayIdentity, Info, NavigationMode};
pub use platform::{DisplayPlatform, PlatformError, StaticPlatform};
