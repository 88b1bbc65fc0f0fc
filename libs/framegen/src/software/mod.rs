// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! CPU reference backend.
//!
//! Implements the RHI seams in memory: a device that rasterizes the
//! conversion draw, a texture cache with CoreVideo semantics (plane
//! textures die at flush, failures carry CVReturn codes) and an NV12 pixel
//! buffer with lock counters. Used headless and as the test double for the
//! generator.

mod backend;
mod device;
mod pixel_buffer;
mod texture_cache;

pub use backend::{SampledInput, SoftwareBackend, SoftwareDrawRecord, SoftwareStats};
pub use device::SoftwareDevice;
pub use pixel_buffer::{SoftwarePixelBuffer, SoftwarePlane};
pub use texture_cache::SoftwareTextureCache;
