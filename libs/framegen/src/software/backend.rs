// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{SoftwareDevice, SoftwareTextureCache};
use crate::core::Result;
use crate::core::context::{GpuBackend, GpuContext, GpuContextConfig};
use crate::core::framebuffer::Size;
use crate::core::rhi::{ProgramId, TextureName, TextureUnit, WrapMode};

/// Counters observed by tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    /// Plane textures created by the texture cache.
    pub textures_created: usize,
    /// Plane textures not yet released by a flush.
    pub live_plane_textures: usize,
    pub flushes: usize,
    pub programs_compiled: usize,
    pub render_targets_allocated: usize,
    pub render_targets_deleted: usize,
    pub draws: usize,
}

/// One sampler input as the last draw saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledInput {
    pub unit: TextureUnit,
    pub size: Size,
    pub channels: usize,
    pub wrap: (WrapMode, WrapMode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwareDrawRecord {
    pub program: ProgramId,
    pub target_size: Size,
    pub inputs: Vec<SampledInput>,
}

pub(super) struct SoftwareTexture {
    pub size: Size,
    /// 1 (luminance), 2 (luminance-alpha) or 4 (RGBA).
    pub channels: usize,
    pub data: Vec<u8>,
    pub wrap: (WrapMode, WrapMode),
    /// Framebuffer object name of render targets.
    pub framebuffer: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SoftwareProgram {
    YuvToRgb,
}

#[derive(Default)]
pub(super) struct SoftwareStore {
    next_name: u32,
    pub textures: HashMap<TextureName, SoftwareTexture>,
    /// Plane textures created since the last flush.
    pub plane_textures: Vec<TextureName>,
    pub programs: HashMap<ProgramId, SoftwareProgram>,
    pub plane_failures: HashMap<usize, i32>,
    pub program_failure: Option<String>,
    pub last_draw: Option<SoftwareDrawRecord>,
    pub stats: SoftwareStats,
}

impl SoftwareStore {
    /// Next object name. Zero is never handed out.
    pub fn allocate_name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }
}

/// Shared state behind a software device and texture cache.
///
/// Clones share the same store, so a test keeps one handle for inspection
/// and fault injection while another is moved onto the GPU thread.
#[derive(Clone, Default)]
pub struct SoftwareBackend {
    store: Arc<Mutex<SoftwareStore>>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(&self) -> SoftwareDevice {
        SoftwareDevice::new(Arc::clone(&self.store))
    }

    pub fn texture_cache(&self) -> SoftwareTextureCache {
        SoftwareTextureCache::new(Arc::clone(&self.store))
    }

    /// Device and texture cache for a [`GpuContext`].
    pub fn gpu_backend(&self) -> GpuBackend {
        GpuBackend {
            device: Box::new(self.device()),
            texture_cache: Box::new(self.texture_cache()),
        }
    }

    /// Start a GPU context whose thread drives this backend.
    pub fn spawn_context(&self, config: GpuContextConfig) -> Result<GpuContext> {
        let backend = self.clone();
        GpuContext::new(config, move || Ok(backend.gpu_backend()))
    }

    pub fn stats(&self) -> SoftwareStats {
        self.store.lock().stats
    }

    /// S and T wrap modes of a live texture.
    pub fn texture_wrap(&self, texture: TextureName) -> Option<(WrapMode, WrapMode)> {
        self.store.lock().textures.get(&texture).map(|t| t.wrap)
    }

    pub fn last_draw(&self) -> Option<SoftwareDrawRecord> {
        self.store.lock().last_draw.clone()
    }

    /// Make every texture request for `plane` fail with `status`.
    pub fn fail_plane(&self, plane: usize, status: i32) {
        self.store.lock().plane_failures.insert(plane, status);
    }

    /// Make every program compilation fail with `log`.
    pub fn fail_program_compilation(&self, log: &str) {
        self.store.lock().program_failure = Some(log.to_owned());
    }

    pub fn clear_failures(&self) {
        let mut store = self.store.lock();
        store.plane_failures.clear();
        store.program_failure = None;
    }
}

impl std::fmt::Debug for SoftwareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareBackend")
            .field("stats", &self.stats())
            .finish()
    }
}
