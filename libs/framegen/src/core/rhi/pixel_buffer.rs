// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pixel buffer with cached dimensions.

use std::any::Any;
use std::sync::Arc;

use super::PixelFormat;
use crate::core::{FrameGenError, Result};

/// Flags passed through to the platform lock/unlock calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockFlags(pub u64);

impl LockFlags {
    pub const NONE: Self = Self(0);
    /// kCVPixelBufferLock_ReadOnly
    pub const READ_ONLY: Self = Self(1);
}

/// A platform image buffer in GPU-shareable memory.
///
/// Implemented by platform wrappers (CVPixelBuffer on Apple) and by the
/// in-memory buffer of the software backend. Texture caches downcast via
/// [`as_any`](PlanarPixelBuffer::as_any) to reach their native type.
pub trait PlanarPixelBuffer: Send + Sync {
    /// Width of plane 0, in pixels.
    fn width(&self) -> u32;

    /// Height of plane 0, in pixels.
    fn height(&self) -> u32;

    fn format(&self) -> PixelFormat;

    fn plane_count(&self) -> usize;

    fn plane_width(&self, plane: usize) -> u32;

    fn plane_height(&self, plane: usize) -> u32;

    /// Pin the buffer's memory for CPU/GPU access.
    fn lock_base_address(&self, flags: LockFlags) -> Result<()>;

    /// Balance a successful [`lock_base_address`](PlanarPixelBuffer::lock_base_address).
    fn unlock_base_address(&self, flags: LockFlags);

    fn as_any(&self) -> &dyn Any;
}

/// Cheaply cloneable handle to a platform pixel buffer.
///
/// Clone only increments the Arc refcount - it does NOT retain the platform
/// buffer again. Width and height are queried once at construction.
#[derive(Clone)]
pub struct PixelBuffer {
    inner: Arc<dyn PlanarPixelBuffer>,
    pub width: u32,
    pub height: u32,
}

impl PixelBuffer {
    pub fn new<B: PlanarPixelBuffer + 'static>(buffer: B) -> Self {
        Self::from_arc(Arc::new(buffer))
    }

    pub fn from_arc(inner: Arc<dyn PlanarPixelBuffer>) -> Self {
        let width = inner.width();
        let height = inner.height();
        Self {
            inner,
            width,
            height,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.inner.format()
    }

    pub fn plane_count(&self) -> usize {
        self.inner.plane_count()
    }

    pub fn plane_width(&self, plane: usize) -> u32 {
        self.inner.plane_width(plane)
    }

    pub fn plane_height(&self, plane: usize) -> u32 {
        self.inner.plane_height(plane)
    }

    /// The platform buffer behind this handle.
    pub fn buffer(&self) -> &dyn PlanarPixelBuffer {
        self.inner.as_ref()
    }

    /// Reject anything that is not a well-formed biplanar 4:2:0 image.
    ///
    /// The chroma plane must be exactly half the luma plane, rounded up.
    pub fn validate_biplanar_420(&self) -> Result<()> {
        let format = self.format();
        if !format.is_biplanar_420() {
            return Err(FrameGenError::InvalidPixelBuffer(format!(
                "expected a biplanar 4:2:0 format, got {format:?}"
            )));
        }

        let planes = self.plane_count();
        if planes != 2 {
            return Err(FrameGenError::InvalidPixelBuffer(format!(
                "expected 2 planes, got {planes}"
            )));
        }

        if self.width == 0 || self.height == 0 {
            return Err(FrameGenError::InvalidPixelBuffer(format!(
                "empty luminance plane {}x{}",
                self.width, self.height
            )));
        }

        if self.plane_width(0) != self.width || self.plane_height(0) != self.height {
            return Err(FrameGenError::InvalidPixelBuffer(format!(
                "plane 0 is {}x{} but the buffer is {}x{}",
                self.plane_width(0), self.plane_height(0), self.width, self.height
            )));
        }

        let expected = (self.width.div_ceil(2), self.height.div_ceil(2));
        let chroma = (self.plane_width(1), self.plane_height(1));
        if chroma != expected {
            return Err(FrameGenError::InvalidPixelBuffer(format!(
                "chrominance plane is {}x{}, expected {}x{} for 4:2:0",
                chroma.0, chroma.1, expected.0, expected.1
            )));
        }

        Ok(())
    }

    /// Lock the base address for the lifetime of the returned guard.
    pub fn lock(&self, flags: LockFlags) -> Result<BaseAddressLock<'_>> {
        self.inner.lock_base_address(flags)?;
        Ok(BaseAddressLock {
            buffer: self,
            flags,
        })
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format())
            .finish()
    }
}

/// Unlocks the pixel buffer when dropped, on every exit path.
pub struct BaseAddressLock<'a> {
    buffer: &'a PixelBuffer,
    flags: LockFlags,
}

impl BaseAddressLock<'_> {
    pub fn buffer(&self) -> &PixelBuffer {
        self.buffer
    }
}

impl Drop for BaseAddressLock<'_> {
    fn drop(&mut self) {
        self.buffer.inner.unlock_base_address(self.flags);
    }
}
