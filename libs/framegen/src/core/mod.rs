// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod color;
pub mod config;
pub mod context;
pub mod conversion;
pub mod error;
pub mod framebuffer;
pub mod generator;
pub mod input;
pub mod logging;
pub mod orientation;
pub mod rhi;
pub mod shaders;
pub mod timestamp;

pub use color::{ColorConversionMatrix, ColorMatrixPreset, ColorRange};
pub use config::FrameGeneratorConfig;
pub use context::*;
pub use conversion::ConversionPass;
pub use error::*;
pub use framebuffer::{Framebuffer, Size};
pub use generator::FrameBufferGenerator;
pub use input::{DEFAULT_SAMPLE_TIME, FramebufferConsumer, PixelBufferInput};
pub use logging::init_logging;
pub use orientation::{ImageOrientation, Rotation};
pub use rhi::{LockFlags, PixelBuffer, PixelFormat, PlanarPixelBuffer};
pub use timestamp::{MediaTime, Timestamp, TimingStyle};
