// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Image orientations and the rotation needed to move between them.
//!
//! Orientations form the eight-element dihedral group of the square: four
//! quarter turns, each optionally mirrored. The rotation needed to bring a
//! source orientation to a target is `target ∘ source⁻¹`, classified into
//! one of eight [`Rotation`] values. Only odd quarter turns swap width and
//! height.

use serde::{Deserialize, Serialize};

use crate::core::framebuffer::Size;
use crate::core::{FrameGenError, Result};

/// Orientation of the pixel data relative to upright portrait content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    PortraitMirrored,
    PortraitUpsideDownMirrored,
    LandscapeLeftMirrored,
    LandscapeRightMirrored,
}

/// Rotation class applied when sampling a source into a target orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    NoRotation,
    RotateCounterclockwise,
    RotateClockwise,
    Rotate180,
    FlipHorizontally,
    FlipVertically,
    RotateClockwiseAndFlipVertically,
    RotateClockwiseAndFlipHorizontally,
}

/// Element of the dihedral group: `quarter_turns` clockwise, then an
/// optional horizontal mirror applied first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transform {
    quarter_turns: u8,
    mirrored: bool,
}

impl Transform {
    const fn new(quarter_turns: u8, mirrored: bool) -> Self {
        Self {
            quarter_turns: quarter_turns % 4,
            mirrored,
        }
    }

    /// `self ∘ other`: apply `other` first.
    ///
    /// A mirror conjugates a rotation into its inverse, so the turns of
    /// `other` subtract when `self` is mirrored.
    fn compose(self, other: Transform) -> Transform {
        let turns = if self.mirrored {
            self.quarter_turns + 4 - other.quarter_turns
        } else {
            self.quarter_turns + other.quarter_turns
        };
        Transform::new(turns, self.mirrored ^ other.mirrored)
    }

    fn inverse(self) -> Transform {
        if self.mirrored {
            self
        } else {
            Transform::new(4 - self.quarter_turns, false)
        }
    }
}

impl ImageOrientation {
    /// All eight orientations.
    pub const ALL: [ImageOrientation; 8] = [
        Self::Portrait,
        Self::PortraitUpsideDown,
        Self::LandscapeLeft,
        Self::LandscapeRight,
        Self::PortraitMirrored,
        Self::PortraitUpsideDownMirrored,
        Self::LandscapeLeftMirrored,
        Self::LandscapeRightMirrored,
    ];

    const fn transform(self) -> Transform {
        match self {
            Self::Portrait => Transform::new(0, false),
            Self::LandscapeRight => Transform::new(1, false),
            Self::PortraitUpsideDown => Transform::new(2, false),
            Self::LandscapeLeft => Transform::new(3, false),
            Self::PortraitMirrored => Transform::new(0, true),
            Self::LandscapeRightMirrored => Transform::new(1, true),
            Self::PortraitUpsideDownMirrored => Transform::new(2, true),
            Self::LandscapeLeftMirrored => Transform::new(3, true),
        }
    }

    /// Rotation that brings data in this orientation to `target`.
    pub fn rotation_needed_for(self, target: ImageOrientation) -> Rotation {
        Rotation::from_transform(target.transform().compose(self.transform().inverse()))
    }

    /// EXIF orientation tag (1..=8).
    pub const fn exif_tag(self) -> u32 {
        match self {
            Self::Portrait => 1,
            Self::PortraitMirrored => 2,
            Self::PortraitUpsideDown => 3,
            Self::PortraitUpsideDownMirrored => 4,
            Self::LandscapeLeftMirrored => 5,
            Self::LandscapeRight => 6,
            Self::LandscapeRightMirrored => 7,
            Self::LandscapeLeft => 8,
        }
    }
}

impl TryFrom<u32> for ImageOrientation {
    type Error = FrameGenError;

    fn try_from(tag: u32) -> Result<Self> {
        match tag {
            1 => Ok(Self::Portrait),
            2 => Ok(Self::PortraitMirrored),
            3 => Ok(Self::PortraitUpsideDown),
            4 => Ok(Self::PortraitUpsideDownMirrored),
            5 => Ok(Self::LandscapeLeftMirrored),
            6 => Ok(Self::LandscapeRight),
            7 => Ok(Self::LandscapeRightMirrored),
            8 => Ok(Self::LandscapeLeft),
            other => Err(FrameGenError::InvalidOrientation(format!(
                "EXIF orientation tag {} is outside 1..=8",
                other
            ))),
        }
    }
}

impl Rotation {
    fn from_transform(transform: Transform) -> Self {
        match (transform.quarter_turns, transform.mirrored) {
            (0, false) => Self::NoRotation,
            (1, false) => Self::RotateClockwise,
            (2, false) => Self::Rotate180,
            (3, false) => Self::RotateCounterclockwise,
            (0, true) => Self::FlipHorizontally,
            (1, true) => Self::RotateClockwiseAndFlipVertically,
            (2, true) => Self::FlipVertically,
            _ => Self::RotateClockwiseAndFlipHorizontally,
        }
    }

    /// Whether the rotated image has width and height exchanged.
    pub const fn flips_dimensions(self) -> bool {
        match self {
            Self::NoRotation | Self::Rotate180 | Self::FlipHorizontally | Self::FlipVertically => {
                false
            }
            Self::RotateCounterclockwise
            | Self::RotateClockwise
            | Self::RotateClockwiseAndFlipVertically
            | Self::RotateClockwiseAndFlipHorizontally => true,
        }
    }

    /// Output canvas size for an input of `width` × `height`.
    pub const fn size_for(self, width: u32, height: u32) -> Size {
        if self.flips_dimensions() {
            Size::new(height, width)
        } else {
            Size::new(width, height)
        }
    }

    /// Texture coordinates for a full-canvas quad drawn as a triangle strip
    /// (bottom-left, bottom-right, top-left, top-right).
    pub const fn texture_coordinates(self) -> [f32; 8] {
        match self {
            Self::NoRotation => [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            Self::RotateCounterclockwise => [0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0],
            Self::RotateClockwise => [1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            Self::Rotate180 => [1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0],
            Self::FlipHorizontally => [1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            Self::FlipVertically => [0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            Self::RotateClockwiseAndFlipVertically => [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0],
            Self::RotateClockwiseAndFlipHorizontally => [1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        }
    }
}
