//! Window Bounds Estimation and Caching
//!
//! Keeps a table of [`WindowBounds`] for all four rotations of every physical display
//! the controller has seen.
//!
//! # Overview
//!
//! Only the active rotation of a display can be observed at any time. The
//! [`BoundsEstimator`] derives the other three rotations geometrically from that one
//! observation, and the [`BoundsCache`] stores the result keyed by the display's
//! rotation-independent [`DisplayIdentity`](crate::display::DisplayIdentity).
//!
//! ```text
//!   live observation (R90)            cache entry
//!  ┌──────────────────────┐        ┌──────┬──────┬──────┬──────┐
//!  │ 2400x1080, insets    │ ─────> │  R0  │  R90 │ R180 │ R270 │
//!  └──────────────────────┘        └──────┴──────┴──────┴──────┘
//!                                   estimated  ▲ verified against live
//! ```
//!
//! On every configuration change the active rotation's entry is compared with the live
//! bounds. A mismatch patches that single entry; a change in density, font scale or
//! navigation mode (the estimator inputs) drops the whole entry.

mod cache;
mod estimator;
mod geometry;

pub use cache::{BoundsCache, CacheStats, CachedBounds, EstimatorInputs};
pub use estimator::{BoundsEstimator, BoundsObservation, BoundsTable};
pub use geometry::{Insets, Rect, Rotation, Size, WindowBounds};

use thiserror::Error;

/// Bounds result type
pub type Result<T> = std::result::Result<T, BoundsError>;

/// Bounds error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoundsError {
    /// Rotation outside 0..=3
    #[error("Invalid rotation: {0} (expected 0-3 quarter turns)")]
    InvalidRotation(u32),

    /// Estimation failed
    #[error("Estimation failed: {0}")]
    Estimate(#[from] EstimateError),
}

/// Reasons the estimator refuses an observation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EstimateError {
    /// Zero width or height
    #[error("Degenerate display geometry: {0}")]
    DegenerateGeometry(Size),

    /// Insets leave no usable area
    #[error("Insets exceed display bounds {size}: {insets:?}")]
    InsetsExceedBounds {
        /// Natural display size
        size: Size,
        /// Natural insets
        insets: Insets,
    },
}
