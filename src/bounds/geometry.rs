//! Rotation-aware geometry primitives
//!
//! All values are in physical pixels. A [`Rotation`] counts quarter turns away from
//! the display's natural orientation; rotating a [`Size`] or [`Insets`] by an odd
//! number of quarter turns swaps its axes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::BoundsError;

/// Display rotation in quarter turns from the natural orientation
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rotation {
    /// Natural orientation
    #[default]
    R0,
    /// One quarter turn
    R90,
    /// Upside down
    R180,
    /// Three quarter turns
    R270,
}

impl Rotation {
    /// All rotations in table order
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    /// Build a rotation from any number of quarter turns (wraps modulo 4)
    pub fn from_quarter_turns(turns: u32) -> Self {
        match turns % 4 {
            0 => Rotation::R0,
            1 => Rotation::R90,
            2 => Rotation::R180,
            _ => Rotation::R270,
        }
    }

    /// Number of quarter turns (0..=3)
    pub fn quarter_turns(self) -> u32 {
        self as u32
    }

    /// Index into a four-rotation table
    pub fn index(self) -> usize {
        self as usize
    }

    /// True when this rotation swaps width and height
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::R90 | Rotation::R270)
    }

    /// The rotation that undoes this one
    pub fn inverse(self) -> Self {
        Self::from_quarter_turns(4 - self.quarter_turns())
    }

    /// Rotation needed to go from `self` to `target`
    pub fn delta_to(self, target: Rotation) -> Self {
        Self::from_quarter_turns(target.quarter_turns() + 4 - self.quarter_turns())
    }
}

impl TryFrom<u32> for Rotation {
    type Error = BoundsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 3 {
            return Err(BoundsError::InvalidRotation(value));
        }
        Ok(Self::from_quarter_turns(value))
    }
}

impl From<Rotation> for u32 {
    fn from(rotation: Rotation) -> Self {
        rotation.quarter_turns()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.quarter_turns() * 90)
    }
}

/// Width and height in pixels
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Create a new size
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A display with no area cannot be estimated
    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Size after rotating by `rotation`
    pub fn rotated(self, rotation: Rotation) -> Self {
        if rotation.swaps_axes() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Per-edge insets in pixels
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Insets {
    /// Left edge
    pub left: u32,
    /// Top edge
    pub top: u32,
    /// Right edge
    pub right: u32,
    /// Bottom edge
    pub bottom: u32,
}

impl Insets {
    /// No insets on any edge
    pub const NONE: Insets = Insets::new(0, 0, 0, 0);

    /// Create insets in `left, top, right, bottom` order
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Insets after rotating the display by `rotation`
    ///
    /// One quarter turn moves the top edge to the left, the right edge to the top,
    /// and so on around the display.
    pub fn rotated(self, rotation: Rotation) -> Self {
        let Insets {
            left,
            top,
            right,
            bottom,
        } = self;
        match rotation {
            Rotation::R0 => self,
            Rotation::R90 => Insets::new(top, right, bottom, left),
            Rotation::R180 => Insets::new(right, bottom, left, top),
            Rotation::R270 => Insets::new(bottom, left, top, right),
        }
    }

    /// Sum of left and right insets
    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    /// Sum of top and bottom insets
    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }
}

/// Axis-aligned rectangle
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Rect {
    /// Left coordinate
    pub x: i32,
    /// Top coordinate
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Rect {
    /// Rectangle anchored at the origin
    pub const fn from_size(size: Size) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    /// Size of the rectangle
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Usable window area of one display at one rotation
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct WindowBounds {
    /// Full display rectangle at this rotation
    pub bounds: Rect,
    /// System insets (status bar, navigation bar, cutout) at this rotation
    pub insets: Insets,
    /// Rotation these bounds describe
    pub rotation: Rotation,
}

impl WindowBounds {
    /// Bounds for a display of `size` with `insets`, seen at `rotation`
    pub fn new(size: Size, insets: Insets, rotation: Rotation) -> Self {
        Self {
            bounds: Rect::from_size(size),
            insets,
            rotation,
        }
    }

    /// Full size at this rotation
    pub fn size(&self) -> Size {
        self.bounds.size()
    }

    /// Size left over once insets are removed
    pub fn available_size(&self) -> Size {
        Size::new(
            self.bounds.width.saturating_sub(self.insets.horizontal()),
            self.bounds.height.saturating_sub(self.insets.vertical()),
        )
    }

    /// True when the display is wider than it is tall
    pub fn is_landscape(&self) -> bool {
        self.bounds.width > self.bounds.height
    }
}

impl fmt::Display for WindowBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @{} insets=({},{},{},{})",
            self.size(),
            self.rotation,
            self.insets.left,
            self.insets.top,
            self.insets.right,
            self.insets.bottom
        )
    }
}
