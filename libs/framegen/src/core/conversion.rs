// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The YUV → RGB conversion pass.

use crate::core::color::ColorConversionMatrix;
use crate::core::context::GpuState;
use crate::core::framebuffer::Framebuffer;
use crate::core::rhi::{
    DrawCall, GpuDevice, ProgramId, STANDARD_IMAGE_VERTICES, SamplerBinding, TextureUnit,
    UniformValue,
};
use crate::core::shaders::{TWO_INPUT_VERTEX_SHADER, YUV_CONVERSION_FRAGMENT_SHADER, names};
use crate::core::{FrameGenError, Result};

/// One full-canvas draw sampling a luminance and a chrominance input.
///
/// The program is compiled when the pass is created; a pass that exists
/// can always draw. The matrix is fixed for the lifetime of the pass.
#[derive(Debug, Clone, Copy)]
pub struct ConversionPass {
    program: ProgramId,
    matrix: ColorConversionMatrix,
}

impl ConversionPass {
    /// Compile (or fetch from the context's cache) the conversion program.
    pub fn new(state: &mut GpuState, matrix: ColorConversionMatrix) -> Result<Self> {
        let program = state
            .program_for(TWO_INPUT_VERTEX_SHADER, YUV_CONVERSION_FRAGMENT_SHADER)
            .map_err(|e| match e {
                FrameGenError::ShaderCompilation(_) => e,
                other => FrameGenError::ShaderCompilation(other.to_string()),
            })?;
        Ok(Self { program, matrix })
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    pub fn matrix(&self) -> &ColorConversionMatrix {
        &self.matrix
    }

    /// Draw `luminance` + `chrominance` into `output`.
    ///
    /// Texture coordinates rotate the inputs from their orientation into the
    /// output's. Inputs are bound to texture units 0 and 1.
    pub fn run(
        &self,
        device: &mut dyn GpuDevice,
        luminance: &Framebuffer,
        chrominance: &Framebuffer,
        output: &Framebuffer,
    ) -> Result<()> {
        if output.is_texture_only() {
            return Err(FrameGenError::GpuError(
                "conversion output has no framebuffer attachment".into(),
            ));
        }

        let texture_coordinates = luminance
            .orientation()
            .rotation_needed_for(output.orientation())
            .texture_coordinates();

        let samplers = [
            SamplerBinding {
                uniform: names::LUMINANCE_TEXTURE,
                unit: TextureUnit::TEXTURE0,
                texture: luminance.texture(),
                texture_coordinates,
            },
            SamplerBinding {
                uniform: names::CHROMINANCE_TEXTURE,
                unit: TextureUnit::TEXTURE1,
                texture: chrominance.texture(),
                texture_coordinates,
            },
        ];
        let uniforms = [
            (
                names::COLOR_CONVERSION_MATRIX,
                UniformValue::Mat3(self.matrix.column_major()),
            ),
            (
                names::LUMA_OFFSET,
                UniformValue::Float(self.matrix.range().luma_offset()),
            ),
        ];

        device.draw(&DrawCall {
            program: self.program,
            target: *output.storage(),
            vertices: STANDARD_IMAGE_VERTICES,
            samplers: &samplers,
            uniforms: &uniforms,
        })
    }
}
