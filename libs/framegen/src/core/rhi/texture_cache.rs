// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Texture cache for creating per-plane texture views from pixel buffers.

use super::{BaseAddressLock, LockFlags, PixelBuffer, TextureName};
use crate::core::Result;

/// CVReturn status codes reported by texture caches.
pub mod cv_return {
    pub const SUCCESS: i32 = 0;
    pub const ERROR: i32 = -6660;
    pub const INVALID_ARGUMENT: i32 = -6661;
    pub const ALLOCATION_FAILED: i32 = -6662;
    pub const INVALID_PIXEL_FORMAT: i32 = -6680;
    pub const PIXEL_BUFFER_NOT_OPENGL_COMPATIBLE: i32 = -6683;
}

/// Channel layout of a plane texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaneTextureFormat {
    /// One 8-bit channel (GL_LUMINANCE).
    Luminance,
    /// Two interleaved 8-bit channels (GL_LUMINANCE_ALPHA).
    LuminanceAlpha,
}

impl PlaneTextureFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Luminance => 1,
            Self::LuminanceAlpha => 2,
        }
    }
}

/// Which plane of a buffer to expose, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneTextureRequest {
    pub plane: usize,
    pub format: PlaneTextureFormat,
    pub width: u32,
    pub height: u32,
}

/// Non-owning handle to a plane texture.
///
/// Valid only until the next [`VideoTextureCache::flush`]; never keep one
/// past the frame it was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTexture {
    pub name: TextureName,
    pub plane: usize,
    pub width: u32,
    pub height: u32,
}

/// Zero-copy texture views over pixel buffer planes.
///
/// Wraps the platform's video texture cache (CVOpenGLESTextureCache /
/// CVMetalTextureCache on Apple). Owned by the GPU context and only used on
/// its thread.
pub trait VideoTextureCache: Send {
    /// Create a texture over one plane of a locked buffer.
    ///
    /// Failures carry the platform status code in
    /// [`FrameGenError::TextureCreation`](crate::core::FrameGenError::TextureCreation).
    fn create_texture(
        &mut self,
        buffer: &PixelBuffer,
        request: &PlaneTextureRequest,
    ) -> Result<CacheTexture>;

    /// Release textures created since the last flush.
    fn flush(&mut self);
}

/// Scoped pairing of a buffer lock with the texture cache.
///
/// Textures are created through [`texture_cache`](PlaneBindingScope::texture_cache)
/// while the buffer is locked. Dropping the scope unlocks the buffer and
/// then flushes the cache, whichever way the frame exits.
pub struct PlaneBindingScope<'a> {
    lock: Option<BaseAddressLock<'a>>,
    cache: &'a mut dyn VideoTextureCache,
}

impl<'a> PlaneBindingScope<'a> {
    /// Lock `buffer`. If locking fails the cache is still flushed.
    pub fn enter(buffer: &'a PixelBuffer, cache: &'a mut dyn VideoTextureCache) -> Result<Self> {
        match buffer.lock(LockFlags::NONE) {
            Ok(lock) => Ok(Self {
                lock: Some(lock),
                cache,
            }),
            Err(e) => {
                cache.flush();
                Err(e)
            }
        }
    }

    pub fn buffer(&self) -> Option<&PixelBuffer> {
        self.lock.as_ref().map(|lock| lock.buffer())
    }

    pub fn texture_cache(&mut self) -> &mut dyn VideoTextureCache {
        &mut *self.cache
    }
}

impl Drop for PlaneBindingScope<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.cache.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rhi::PixelFormat;
    use crate::software::{SoftwareBackend, SoftwarePixelBuffer};
    use std::sync::Arc;

    #[test]
    fn test_scope_unlocks_then_flushes() {
        let backend = SoftwareBackend::new();
        let mut cache = backend.texture_cache();
        let raw = SoftwarePixelBuffer::filled(8, 8, PixelFormat::Nv12FullRange, 100, 128, 128);
        let raw = Arc::new(raw);
        let buffer = PixelBuffer::from_arc(raw.clone());

        {
            let mut scope = PlaneBindingScope::enter(&buffer, &mut cache).unwrap();
            let request = PlaneTextureRequest {
                plane: 0,
                format: PlaneTextureFormat::Luminance,
                width: 8,
                height: 8,
            };
            let cache = scope.texture_cache();
            cache.create_texture(&buffer, &request).unwrap();
            assert_eq!(raw.lock_count(), 1);
        }

        assert_eq!(raw.lock_count(), 0);
        assert_eq!(backend.stats().flushes, 1);
        assert_eq!(backend.stats().live_plane_textures, 0);
    }

    #[test]
    fn test_failed_lock_still_flushes() {
        let backend = SoftwareBackend::new();
        let mut cache = backend.texture_cache();
        let raw = SoftwarePixelBuffer::filled(8, 8, PixelFormat::Nv12FullRange, 100, 128, 128);
        let raw = Arc::new(raw);
        raw.fail_next_lock();
        let buffer = PixelBuffer::from_arc(raw.clone());

        assert!(PlaneBindingScope::enter(&buffer, &mut cache).is_err());
        assert_eq!(raw.lock_count(), 0);
        assert_eq!(backend.stats().flushes, 1);
    }
}
