// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pixel format for video buffers.
//!
//! Enum values ARE the CVPixelFormatType FourCC constants, so platform
//! buffers can report their format without a lookup table.

use crate::core::color::ColorRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum PixelFormat {
    /// NV12 YUV 4:2:0 bi-planar, video range. '420v'
    Nv12VideoRange = 0x34323076,
    /// NV12 YUV 4:2:0 bi-planar, full range. '420f'
    #[default]
    Nv12FullRange = 0x34323066,
    /// 32-bit BGRA (8 bits/channel). 'BGRA'
    Bgra32 = 0x42475241,
    /// 32-bit RGBA (8 bits/channel). 'RGBA'
    Rgba32 = 0x52474241,
    /// Unknown or unsupported format.
    Unknown = 0x00000000,
}

impl PixelFormat {
    #[inline]
    pub const fn as_fourcc(&self) -> u32 {
        *self as u32
    }

    pub fn from_fourcc(fourcc: u32) -> Self {
        match fourcc {
            0x34323076 => Self::Nv12VideoRange,
            0x34323066 => Self::Nv12FullRange,
            0x42475241 => Self::Bgra32,
            0x52474241 => Self::Rgba32,
            _ => Self::Unknown,
        }
    }

    /// Luma at full resolution in plane 0, interleaved CbCr at half
    /// resolution in plane 1.
    pub const fn is_biplanar_420(&self) -> bool {
        matches!(self, Self::Nv12VideoRange | Self::Nv12FullRange)
    }

    /// Quantization range reported by the format, for YUV formats.
    pub const fn color_range(&self) -> Option<ColorRange> {
        match self {
            Self::Nv12VideoRange => Some(ColorRange::Video),
            Self::Nv12FullRange => Some(ColorRange::Full),
            _ => None,
        }
    }
}
