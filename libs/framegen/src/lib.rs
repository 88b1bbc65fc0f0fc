// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod core;
pub mod software;

pub use crate::core::{
    ColorConversionMatrix, ColorMatrixPreset, ColorRange, ConversionPass, FrameBufferGenerator,
    FrameGenError, FrameGeneratorConfig, Framebuffer, FramebufferConsumer, FramebufferDescriptor,
    FramebufferPool, FramebufferPoolConfig, FramebufferPoolStats, GpuBackend, GpuContext,
    GpuContextConfig, GpuState, ImageOrientation, LockFlags, MediaTime, PixelBuffer,
    PixelBufferInput, PixelFormat, PlanarPixelBuffer, PoolExhaustionPolicy, Result, Rotation, Size,
    Timestamp, TimingStyle, init_logging,
};
