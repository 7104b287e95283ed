//! Four-rotation bounds estimation
//!
//! Pure geometry: no I/O and no state. Given one observation of a display at its
//! active rotation, derive the bounds the display would report at every rotation.

use serde::{Deserialize, Serialize};
use std::ops::Index;

use super::geometry::{Insets, Rotation, Size, WindowBounds};
use super::EstimateError;
use crate::display::DisplayIdentity;

/// What the platform reported for a display at its active rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundsObservation {
    /// Active rotation
    pub rotation: Rotation,
    /// Raw size at the active rotation
    pub size: Size,
    /// System insets at the active rotation
    pub insets: Insets,
}

impl BoundsObservation {
    /// The real bounds this observation describes
    pub fn window_bounds(&self) -> WindowBounds {
        WindowBounds::new(self.size, self.insets, self.rotation)
    }
}

/// Bounds for all four rotations of one display, indexed by [`Rotation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundsTable([WindowBounds; 4]);

impl BoundsTable {
    /// Bounds at `rotation`
    pub fn get(&self, rotation: Rotation) -> &WindowBounds {
        &self.0[rotation.index()]
    }

    /// Replace the bounds for the rotation `bounds` describes
    pub fn patch(&mut self, bounds: WindowBounds) {
        self.0[bounds.rotation.index()] = bounds;
    }

    /// Iterate in rotation order
    pub fn iter(&self) -> impl Iterator<Item = &WindowBounds> {
        self.0.iter()
    }

    /// Underlying array
    pub fn as_array(&self) -> &[WindowBounds; 4] {
        &self.0
    }
}

impl Index<Rotation> for BoundsTable {
    type Output = WindowBounds;

    fn index(&self, rotation: Rotation) -> &Self::Output {
        self.get(rotation)
    }
}

/// Derives four-rotation bounds tables
pub struct BoundsEstimator;

impl BoundsEstimator {
    /// Estimate bounds for every rotation of `identity`
    ///
    /// The natural size comes from the identity; the natural insets are recovered by
    /// undoing the observation's rotation. Every rotation is then produced by rotating
    /// both back out, so the entry for the observed rotation reproduces the
    /// observation exactly whenever the observation agrees with the identity.
    ///
    /// # Errors
    ///
    /// - [`EstimateError::DegenerateGeometry`] if either the identity or the
    ///   observation has zero width or height
    /// - [`EstimateError::InsetsExceedBounds`] if the insets leave no usable area
    pub fn estimate(
        identity: &DisplayIdentity,
        observation: &BoundsObservation,
    ) -> Result<BoundsTable, EstimateError> {
        let natural_size = identity.natural_size();
        if natural_size.is_degenerate() {
            return Err(EstimateError::DegenerateGeometry(natural_size));
        }
        if observation.size.is_degenerate() {
            return Err(EstimateError::DegenerateGeometry(observation.size));
        }

        let natural_insets = observation.insets.rotated(observation.rotation.inverse());
        if natural_insets.horizontal() >= natural_size.width
            || natural_insets.vertical() >= natural_size.height
        {
            return Err(EstimateError::InsetsExceedBounds {
                size: natural_size,
                insets: natural_insets,
            });
        }

        Ok(BoundsTable(Rotation::ALL.map(|rotation| {
            WindowBounds::new(
                natural_size.rotated(rotation),
                natural_insets.rotated(rotation),
                rotation,
            )
        })))
    }
}
