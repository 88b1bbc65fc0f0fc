// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! RHI device abstraction.
//!
//! A GL-style state machine: a current texture unit, a texture bound to it,
//! compiled programs, and draws into render targets. Implementations are
//! only ever touched from the GPU thread owned by
//! [`GpuContext`](crate::core::context::GpuContext).

use crate::core::Result;
use crate::core::framebuffer::Size;

/// GPU texture object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureName(pub u32);

/// Compiled and linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Numbered sampler binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureUnit(pub u32);

impl TextureUnit {
    pub const TEXTURE0: Self = Self(0);
    pub const TEXTURE1: Self = Self(1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

/// GPU storage behind a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetStorage {
    pub texture: TextureName,
    /// Framebuffer object; `None` for texture-only targets.
    pub framebuffer: Option<u32>,
    pub size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    /// Column-major 3×3 matrix.
    Mat3([f32; 9]),
}

/// One sampler input of a draw.
#[derive(Debug, Clone, Copy)]
pub struct SamplerBinding<'a> {
    /// Sampler uniform name in the fragment shader.
    pub uniform: &'a str,
    pub unit: TextureUnit,
    pub texture: TextureName,
    /// Per-corner coordinates, same corner order as [`DrawCall::vertices`].
    pub texture_coordinates: [f32; 8],
}

/// A single quad draw into a render target.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub program: ProgramId,
    pub target: RenderTargetStorage,
    /// Clip-space positions of the strip corners (BL, BR, TL, TR).
    pub vertices: [f32; 8],
    pub samplers: &'a [SamplerBinding<'a>],
    pub uniforms: &'a [(&'a str, UniformValue)],
}

/// Full-canvas quad in clip space.
pub const STANDARD_IMAGE_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// Platform GPU device.
pub trait GpuDevice: Send {
    /// Select the texture unit subsequent binds apply to.
    fn active_texture(&mut self, unit: TextureUnit);

    /// Bind `texture` to the active unit.
    fn bind_texture(&mut self, texture: TextureName);

    /// Set the S and T wrap modes of the bound texture.
    fn set_wrap_mode(&mut self, s: WrapMode, t: WrapMode);

    /// Compile and link a program from vertex and fragment sources.
    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId>;

    /// Allocate RGBA storage of `size`, with a framebuffer object unless
    /// `texture_only`.
    fn create_render_target(
        &mut self,
        size: Size,
        texture_only: bool,
    ) -> Result<RenderTargetStorage>;

    fn delete_render_target(&mut self, storage: &RenderTargetStorage);

    /// Draw a quad covering the whole target.
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()>;

    /// Read back an RGBA8 render target, rows in memory order.
    fn read_rgba(&mut self, storage: &RenderTargetStorage) -> Result<Vec<u8>>;
}
