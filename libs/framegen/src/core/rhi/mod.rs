// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Render Hardware Interface (RHI) - the platform seams the generator drives.

mod device;
mod pixel_buffer;
mod pixel_format;
mod texture_cache;

pub use device::{
    DrawCall, GpuDevice, ProgramId, RenderTargetStorage, STANDARD_IMAGE_VERTICES, SamplerBinding,
    TextureName, TextureUnit, UniformValue, WrapMode,
};
pub use pixel_buffer::{BaseAddressLock, LockFlags, PixelBuffer, PlanarPixelBuffer};
pub use pixel_format::PixelFormat;
pub use texture_cache::{
    CacheTexture, PlaneBindingScope, PlaneTextureFormat, PlaneTextureRequest, VideoTextureCache,
    cv_return,
};
