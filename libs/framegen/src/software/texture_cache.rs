// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use parking_lot::Mutex;

use super::SoftwarePixelBuffer;
use super::backend::{SoftwareStore, SoftwareTexture};
use crate::core::framebuffer::Size;
use crate::core::rhi::{
    CacheTexture, PixelBuffer, PlaneTextureRequest, TextureName, VideoTextureCache, WrapMode,
    cv_return,
};
use crate::core::{FrameGenError, Result};

/// Texture cache over [`SoftwarePixelBuffer`] planes.
pub struct SoftwareTextureCache {
    store: Arc<Mutex<SoftwareStore>>,
}

impl SoftwareTextureCache {
    pub(super) fn new(store: Arc<Mutex<SoftwareStore>>) -> Self {
        Self { store }
    }
}

fn creation_failed(plane: usize, status: i32) -> FrameGenError {
    FrameGenError::TextureCreation { plane, status }
}

impl VideoTextureCache for SoftwareTextureCache {
    fn create_texture(
        &mut self,
        buffer: &PixelBuffer,
        request: &PlaneTextureRequest,
    ) -> Result<CacheTexture> {
        let plane_index = request.plane;
        let mut store = self.store.lock();

        if let Some(status) = store.plane_failures.get(&plane_index) {
            return Err(creation_failed(plane_index, *status));
        }

        let raw = buffer
            .buffer()
            .as_any()
            .downcast_ref::<SoftwarePixelBuffer>()
            .ok_or_else(|| {
                creation_failed(plane_index, cv_return::PIXEL_BUFFER_NOT_OPENGL_COMPATIBLE)
            })?;

        // Plane memory is read directly, which is only valid under the
        // base address lock.
        if raw.lock_count() == 0 {
            return Err(creation_failed(plane_index, cv_return::ERROR));
        }

        let plane = raw
            .plane(plane_index)
            .ok_or_else(|| creation_failed(plane_index, cv_return::INVALID_ARGUMENT))?;
        if plane.width != request.width || plane.height != request.height {
            return Err(creation_failed(plane_index, cv_return::INVALID_ARGUMENT));
        }

        let channels = request.format.bytes_per_pixel();
        if plane.data.len() != plane.width as usize * plane.height as usize * channels {
            return Err(creation_failed(plane_index, cv_return::INVALID_PIXEL_FORMAT));
        }

        let name = TextureName(store.allocate_name());
        store.textures.insert(
            name,
            SoftwareTexture {
                size: Size::new(plane.width, plane.height),
                channels,
                data: plane.data.clone(),
                wrap: (WrapMode::Repeat, WrapMode::Repeat),
                framebuffer: None,
            },
        );
        store.plane_textures.push(name);
        store.stats.textures_created += 1;
        store.stats.live_plane_textures += 1;

        Ok(CacheTexture {
            name,
            plane: plane_index,
            width: request.width,
            height: request.height,
        })
    }

    fn flush(&mut self) {
        let mut store = self.store.lock();
        let released = std::mem::take(&mut store.plane_textures);
        for name in &released {
            store.textures.remove(name);
        }
        store.stats.live_plane_textures -= released.len();
        store.stats.flushes += 1;
    }
}
