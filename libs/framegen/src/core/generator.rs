// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! FrameBufferGenerator - biplanar YUV pixel buffers in, pooled RGB
//! framebuffers out.

use crate::core::color::ColorConversionMatrix;
use crate::core::config::FrameGeneratorConfig;
use crate::core::context::{FramebufferDescriptor, GpuContext, GpuState, GpuStateParts};
use crate::core::conversion::ConversionPass;
use crate::core::framebuffer::{Framebuffer, Size};
use crate::core::orientation::ImageOrientation;
use crate::core::rhi::{
    PixelBuffer, PlaneBindingScope, PlaneTextureFormat, PlaneTextureRequest, TextureUnit, WrapMode,
};
use crate::core::timestamp::{MediaTime, Timestamp, TimingStyle};
use crate::core::{FrameGenError, Result};

const LUMINANCE_PLANE: usize = 0;
const CHROMINANCE_PLANE: usize = 1;

/// Converts camera frames into framebuffers for the processing graph.
///
/// All GPU work runs on the [`GpuContext`] thread; `generate` blocks until
/// that work is done. One generator per input stream is the usual setup,
/// but several can share a context.
pub struct FrameBufferGenerator {
    context: GpuContext,
    conversion: ConversionPass,
    target_orientation: ImageOrientation,
}

impl FrameBufferGenerator {
    /// Build a generator with the matrix and target orientation from
    /// `config`.
    ///
    /// The thread name and pool settings of `config` are not applied here;
    /// they only take effect if `context` was built from
    /// [`FrameGeneratorConfig::gpu_context_config`].
    ///
    /// Fails with [`FrameGenError::ShaderCompilation`] if the conversion
    /// program cannot be built. That is a build or deployment defect:
    /// callers should treat it as fatal, not retry.
    pub fn new(context: GpuContext, config: &FrameGeneratorConfig) -> Result<Self> {
        if !context.matches_config(&config.gpu_context_config()) {
            tracing::debug!(
                context_thread = %context.thread_name(),
                config_thread = %config.gpu_thread_name,
                "GPU context was built from other settings; its thread and pool settings apply"
            );
        }

        Self::with_matrix(
            context,
            config.color_conversion_matrix(),
            config.target_orientation,
        )
    }

    pub fn with_matrix(
        context: GpuContext,
        matrix: ColorConversionMatrix,
        target_orientation: ImageOrientation,
    ) -> Result<Self> {
        let conversion = context
            .run_sync(move |state| ConversionPass::new(state, matrix))
            .and_then(|pass| pass)
            .inspect_err(|e| tracing::error!(error = %e, "Conversion program unavailable"))?;

        tracing::debug!(
            program = conversion.program().0,
            target = ?target_orientation,
            range = ?matrix.range(),
            "FrameBufferGenerator ready"
        );

        Ok(Self {
            context,
            conversion,
            target_orientation,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    pub fn color_matrix(&self) -> &ColorConversionMatrix {
        self.conversion.matrix()
    }

    pub fn target_orientation(&self) -> ImageOrientation {
        self.target_orientation
    }

    /// Convert one frame, dropping it on failure.
    ///
    /// Failures are logged and yield `None`; the next frame is processed
    /// independently.
    pub fn generate(
        &self,
        pixel_buffer: &PixelBuffer,
        frame_time: MediaTime,
        orientation: ImageOrientation,
    ) -> Option<Framebuffer> {
        match self.try_generate(pixel_buffer, frame_time, orientation) {
            Ok(framebuffer) => Some(framebuffer),
            Err(FrameGenError::TextureCreation { plane, status }) => {
                tracing::warn!(
                    width = pixel_buffer.width,
                    height = pixel_buffer.height,
                    plane,
                    status,
                    "Dropped frame: could not create plane texture"
                );
                None
            }
            Err(e) if e.is_frame_recoverable() => {
                tracing::warn!(
                    width = pixel_buffer.width,
                    height = pixel_buffer.height,
                    orientation = ?orientation,
                    error = %e,
                    "Dropped frame"
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    width = pixel_buffer.width,
                    height = pixel_buffer.height,
                    error = %e,
                    "Frame generation failed"
                );
                None
            }
        }
    }

    /// Convert one frame, reporting why it failed.
    ///
    /// The returned framebuffer is in the target orientation, sized to the
    /// luminance plane (swapped for quarter-turn rotations) and stamped with
    /// `frame_time`. The buffer is locked only while its planes are bound
    /// and the texture cache is flushed on every path.
    pub fn try_generate(
        &self,
        pixel_buffer: &PixelBuffer,
        frame_time: MediaTime,
        orientation: ImageOrientation,
    ) -> Result<Framebuffer> {
        pixel_buffer.validate_biplanar_420()?;
        let timestamp = Timestamp::try_from(frame_time)?;

        let buffer = pixel_buffer.clone();
        let conversion = self.conversion;
        let target = self.target_orientation;
        self.context.run_sync(move |state| {
            convert_frame(state, &conversion, &buffer, orientation, target, timestamp)
        })?
    }
}

impl std::fmt::Debug for FrameBufferGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBufferGenerator")
            .field("target_orientation", &self.target_orientation)
            .field("color_matrix", self.conversion.matrix())
            .finish()
    }
}

/// Body of one generation, on the GPU thread.
fn convert_frame(
    state: &mut GpuState,
    conversion: &ConversionPass,
    buffer: &PixelBuffer,
    source_orientation: ImageOrientation,
    target_orientation: ImageOrientation,
    timestamp: Timestamp,
) -> Result<Framebuffer> {
    let GpuStateParts {
        device,
        texture_cache,
        framebuffers,
    } = state.parts();

    // Unlocks the buffer and flushes the cache when this function returns.
    let mut scope = PlaneBindingScope::enter(buffer, texture_cache)?;

    let luma_size = Size::new(buffer.width, buffer.height);
    let chroma_size = Size::new(
        buffer.plane_width(CHROMINANCE_PLANE),
        buffer.plane_height(CHROMINANCE_PLANE),
    );

    device.active_texture(TextureUnit::TEXTURE0);
    let luminance_texture = scope.texture_cache().create_texture(
        buffer,
        &PlaneTextureRequest {
            plane: LUMINANCE_PLANE,
            format: PlaneTextureFormat::Luminance,
            width: luma_size.width,
            height: luma_size.height,
        },
    )?;
    device.bind_texture(luminance_texture.name);
    device.set_wrap_mode(WrapMode::ClampToEdge, WrapMode::ClampToEdge);
    let luminance =
        Framebuffer::wrapping_texture(luminance_texture.name, luma_size, source_orientation);

    device.active_texture(TextureUnit::TEXTURE1);
    let chrominance_texture = scope.texture_cache().create_texture(
        buffer,
        &PlaneTextureRequest {
            plane: CHROMINANCE_PLANE,
            format: PlaneTextureFormat::LuminanceAlpha,
            width: chroma_size.width,
            height: chroma_size.height,
        },
    )?;
    device.bind_texture(chrominance_texture.name);
    device.set_wrap_mode(WrapMode::ClampToEdge, WrapMode::ClampToEdge);
    let chrominance =
        Framebuffer::wrapping_texture(chrominance_texture.name, chroma_size, source_orientation);

    let rotation = source_orientation.rotation_needed_for(target_orientation);
    let output_size = rotation.size_for(luma_size.width, luma_size.height);
    let mut output = framebuffers.acquire(
        device,
        FramebufferDescriptor {
            size: output_size,
            orientation: target_orientation,
            texture_only: false,
        },
    )?;

    conversion.run(device, &luminance, &chrominance, &output)?;
    output.set_timing(TimingStyle::VideoFrame(timestamp));

    tracing::trace!(
        width = output_size.width,
        height = output_size.height,
        rotation = ?rotation,
        timestamp_ns = timestamp.timestamp_ns,
        "Generated framebuffer"
    );

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::GpuContextConfig;
    use crate::core::rhi::PixelFormat;
    use crate::software::{SoftwareBackend, SoftwarePixelBuffer};
    use std::sync::Arc;

    fn generator() -> (FrameBufferGenerator, SoftwareBackend) {
        let backend = SoftwareBackend::new();
        let ctx = backend.spawn_context(GpuContextConfig::default()).unwrap();
        let generator = FrameBufferGenerator::new(ctx, &FrameGeneratorConfig::default()).unwrap();
        (generator, backend)
    }

    #[test]
    fn test_output_is_stamped_and_pooled() {
        let (generator, _backend) = generator();
        let raw = SoftwarePixelBuffer::filled(8, 4, PixelFormat::Nv12FullRange, 128, 128, 128);
        let buffer = PixelBuffer::new(raw);
        let time = MediaTime::new(1001, 30000);

        let fb = generator
            .try_generate(&buffer, time, ImageOrientation::Portrait)
            .unwrap();

        assert!(fb.is_pooled());
        assert!(!fb.is_texture_only());
        assert_eq!(fb.orientation(), ImageOrientation::Portrait);
        assert_eq!(fb.timestamp(), Some(Timestamp::from_nanos(33_366_667)));
    }

    #[test]
    fn test_invalid_time_is_rejected_before_locking() {
        let (generator, backend) = generator();
        let raw = SoftwarePixelBuffer::filled(8, 4, PixelFormat::Nv12FullRange, 0, 128, 128);
        let raw = Arc::new(raw);
        let buffer = PixelBuffer::from_arc(raw.clone());

        let err = generator
            .try_generate(&buffer, MediaTime::new(1, 0), ImageOrientation::Portrait)
            .unwrap_err();

        assert!(matches!(err, FrameGenError::InvalidTime(_)));
        assert!(err.is_frame_recoverable());
        assert_eq!(raw.total_locks(), 0);
        assert_eq!(backend.stats().textures_created, 0);
    }

    #[test]
    fn test_non_yuv_buffer_yields_none() {
        let (generator, _backend) = generator();
        let raw = SoftwarePixelBuffer::filled(8, 4, PixelFormat::Bgra32, 0, 0, 0);
        let buffer = PixelBuffer::new(raw);
        let time = MediaTime::new(0, 600);
        let frame = generator.generate(&buffer, time, ImageOrientation::Portrait);
        assert!(frame.is_none());
    }

    #[test]
    fn test_context_settings_come_from_the_context() {
        let backend = SoftwareBackend::new();
        let ctx = backend.spawn_context(GpuContextConfig::default()).unwrap();
        let config = FrameGeneratorConfig {
            gpu_thread_name: "renderer".into(),
            ..FrameGeneratorConfig::default()
        };

        let generator = FrameBufferGenerator::new(ctx, &config).unwrap();
        let name = generator
            .context()
            .run_sync(|_| std::thread::current().name().map(str::to_owned))
            .unwrap();
        assert_eq!(name.as_deref(), Some("framegen-gpu"));
    }

    #[test]
    fn test_construction_fails_when_program_does_not_compile() {
        let backend = SoftwareBackend::new();
        backend.fail_program_compilation("glLinkProgram: missing varying");
        let ctx = backend.spawn_context(GpuContextConfig::default()).unwrap();

        let err = FrameBufferGenerator::new(ctx, &FrameGeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, FrameGenError::ShaderCompilation(_)));
        assert!(!err.is_frame_recoverable());
    }
}
