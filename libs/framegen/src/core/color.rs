// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! YUV → RGB color conversion matrices.

use serde::{Deserialize, Serialize};

/// Quantization range of the luma channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorRange {
    /// Luma spans 0..=255.
    Full,
    /// Luma spans 16..=235.
    Video,
}

impl ColorRange {
    /// Normalized luma value subtracted before the matrix is applied.
    pub const fn luma_offset(self) -> f32 {
        match self {
            Self::Full => 0.0,
            Self::Video => 16.0 / 255.0,
        }
    }
}

/// Named matrix presets, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMatrixPreset {
    #[default]
    Bt601FullRange,
    Bt601VideoRange,
    Bt709VideoRange,
}

/// Immutable 3×3 transform from (Y, Cb - 0.5, Cr - 0.5) to RGB.
///
/// Stored column-major: column 0 holds the luma weights, column 1 the Cb
/// weights, column 2 the Cr weights. This is the layout a `mat3` uniform
/// expects without transposition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorConversionMatrix {
    columns: [[f32; 3]; 3],
    range: ColorRange,
}

impl ColorConversionMatrix {
    /// BT.601, full range. The default for camera capture.
    pub const BT601_FULL_RANGE: Self = Self {
        columns: [[1.0, 1.0, 1.0], [0.0, -0.343, 1.765], [1.4, -0.711, 0.0]],
        range: ColorRange::Full,
    };

    /// BT.601, video range.
    pub const BT601_VIDEO_RANGE: Self = Self {
        columns: [
            [1.164, 1.164, 1.164],
            [0.0, -0.392, 2.017],
            [1.596, -0.813, 0.0],
        ],
        range: ColorRange::Video,
    };

    /// BT.709, video range.
    pub const BT709_VIDEO_RANGE: Self = Self {
        columns: [
            [1.164, 1.164, 1.164],
            [0.0, -0.213, 2.112],
            [1.793, -0.533, 0.0],
        ],
        range: ColorRange::Video,
    };

    pub const fn range(&self) -> ColorRange {
        self.range
    }

    /// The nine matrix values in column-major order.
    pub fn column_major(&self) -> [f32; 9] {
        let [c0, c1, c2] = self.columns;
        [
            c0[0], c0[1], c0[2], c1[0], c1[1], c1[2], c2[0], c2[1], c2[2],
        ]
    }

    /// Convert one normalized YUV sample to normalized RGB, clamped to 0..=1.
    pub fn apply(&self, y: f32, cb: f32, cr: f32) -> [f32; 3] {
        apply_column_major(&self.column_major(), self.range.luma_offset(), y, cb, cr)
    }
}

impl Default for ColorConversionMatrix {
    fn default() -> Self {
        Self::BT601_FULL_RANGE
    }
}

impl From<ColorMatrixPreset> for ColorConversionMatrix {
    fn from(preset: ColorMatrixPreset) -> Self {
        match preset {
            ColorMatrixPreset::Bt601FullRange => Self::BT601_FULL_RANGE,
            ColorMatrixPreset::Bt601VideoRange => Self::BT601_VIDEO_RANGE,
            ColorMatrixPreset::Bt709VideoRange => Self::BT709_VIDEO_RANGE,
        }
    }
}

/// Shared by [`ColorConversionMatrix::apply`] and the software rasterizer,
/// which only sees the raw uniform values.
pub(crate) fn apply_column_major(
    m: &[f32; 9],
    luma_offset: f32,
    y: f32,
    cb: f32,
    cr: f32,
) -> [f32; 3] {
    let y = y - luma_offset;
    let cb = cb - 0.5;
    let cr = cr - 0.5;
    [
        (m[0] * y + m[3] * cb + m[6] * cr).clamp(0.0, 1.0),
        (m[1] * y + m[4] * cb + m[7] * cr).clamp(0.0, 1.0),
        (m[2] * y + m[5] * cb + m[8] * cr).clamp(0.0, 1.0),
    ]
}
