// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Framebuffers: GPU images that are both draw destinations and sampled
//! sources.

use crate::core::context::FramebufferLease;
use crate::core::orientation::ImageOrientation;
use crate::core::rhi::{RenderTargetStorage, TextureName};
use crate::core::timestamp::{Timestamp, TimingStyle};

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A GPU image with orientation and timing.
///
/// Two kinds exist. Pooled framebuffers come from the
/// [`FramebufferPool`](crate::core::context::FramebufferPool) and return
/// their slot when dropped. Texture-only wrappers borrow a texture owned by
/// someone else (the video texture cache) and own nothing.
pub struct Framebuffer {
    storage: RenderTargetStorage,
    orientation: ImageOrientation,
    texture_only: bool,
    timing: TimingStyle,
    lease: Option<FramebufferLease>,
}

impl Framebuffer {
    pub(crate) fn pooled(
        storage: RenderTargetStorage,
        orientation: ImageOrientation,
        texture_only: bool,
        lease: FramebufferLease,
    ) -> Self {
        Self {
            storage,
            orientation,
            texture_only,
            timing: TimingStyle::StillImage,
            lease: Some(lease),
        }
    }

    /// Wrap an externally owned texture as a texture-only framebuffer.
    pub fn wrapping_texture(
        texture: TextureName,
        size: Size,
        orientation: ImageOrientation,
    ) -> Self {
        Self {
            storage: RenderTargetStorage {
                texture,
                framebuffer: None,
                size,
            },
            orientation,
            texture_only: true,
            timing: TimingStyle::StillImage,
            lease: None,
        }
    }

    pub fn size(&self) -> Size {
        self.storage.size
    }

    pub fn width(&self) -> u32 {
        self.storage.size.width
    }

    pub fn height(&self) -> u32 {
        self.storage.size.height
    }

    pub fn orientation(&self) -> ImageOrientation {
        self.orientation
    }

    pub fn is_texture_only(&self) -> bool {
        self.texture_only
    }

    /// Whether dropping this framebuffer returns storage to a pool.
    pub fn is_pooled(&self) -> bool {
        self.lease.is_some()
    }

    pub fn texture(&self) -> TextureName {
        self.storage.texture
    }

    pub fn storage(&self) -> &RenderTargetStorage {
        &self.storage
    }

    pub fn timing(&self) -> TimingStyle {
        self.timing
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timing.timestamp()
    }

    pub(crate) fn set_timing(&mut self, timing: TimingStyle) {
        self.timing = timing;
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("orientation", &self.orientation)
            .field("texture_only", &self.texture_only)
            .field("timing", &self.timing)
            .field("pooled", &self.is_pooled())
            .finish()
    }
}
