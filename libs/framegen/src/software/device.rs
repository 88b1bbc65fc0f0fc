// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::backend::{
    SampledInput, SoftwareDrawRecord, SoftwareProgram, SoftwareStore, SoftwareTexture,
};
use crate::core::color::apply_column_major;
use crate::core::framebuffer::Size;
use crate::core::rhi::{
    DrawCall, GpuDevice, ProgramId, RenderTargetStorage, SamplerBinding, TextureName, TextureUnit,
    UniformValue, WrapMode,
};
use crate::core::shaders::names;
use crate::core::{FrameGenError, Result};

/// CPU rasterizer for full-canvas quads.
///
/// Sampling is nearest-neighbour at pixel centres with texture coordinates
/// interpolated across the quad. Row 0 of every texture is `t = 0`, so the
/// identity coordinates copy memory rows in order.
pub struct SoftwareDevice {
    store: Arc<Mutex<SoftwareStore>>,
    active_unit: TextureUnit,
    bound: HashMap<TextureUnit, TextureName>,
}

impl SoftwareDevice {
    pub(super) fn new(store: Arc<Mutex<SoftwareStore>>) -> Self {
        Self {
            store,
            active_unit: TextureUnit::TEXTURE0,
            bound: HashMap::new(),
        }
    }

    pub fn bound_texture(&self, unit: TextureUnit) -> Option<TextureName> {
        self.bound.get(&unit).copied()
    }
}

impl GpuDevice for SoftwareDevice {
    fn active_texture(&mut self, unit: TextureUnit) {
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, texture: TextureName) {
        self.bound.insert(self.active_unit, texture);
    }

    fn set_wrap_mode(&mut self, s: WrapMode, t: WrapMode) {
        let Some(name) = self.bound.get(&self.active_unit) else {
            tracing::warn!(unit = self.active_unit.0, "Wrap mode set with no texture bound");
            return;
        };
        if let Some(texture) = self.store.lock().textures.get_mut(name) {
            texture.wrap = (s, t);
        }
    }

    fn compile_program(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId> {
        let mut store = self.store.lock();
        if let Some(log) = &store.program_failure {
            return Err(FrameGenError::ShaderCompilation(log.clone()));
        }
        for (stage, source) in [("vertex", vertex), ("fragment", fragment)] {
            if !source.contains("void main") {
                return Err(FrameGenError::ShaderCompilation(format!(
                    "{stage} shader has no main function"
                )));
            }
        }
        if !fragment.contains(names::COLOR_CONVERSION_MATRIX) {
            return Err(FrameGenError::ShaderCompilation(
                "software device only executes the YUV conversion program".into(),
            ));
        }

        let program = ProgramId(store.allocate_name());
        store.programs.insert(program, SoftwareProgram::YuvToRgb);
        store.stats.programs_compiled += 1;
        Ok(program)
    }

    fn create_render_target(
        &mut self,
        size: Size,
        texture_only: bool,
    ) -> Result<RenderTargetStorage> {
        if size.width == 0 || size.height == 0 {
            return Err(FrameGenError::GpuError(format!(
                "cannot allocate a {}x{} render target",
                size.width, size.height
            )));
        }

        let mut store = self.store.lock();
        let texture = TextureName(store.allocate_name());
        let framebuffer = (!texture_only).then(|| store.allocate_name());
        store.textures.insert(
            texture,
            SoftwareTexture {
                size,
                channels: 4,
                data: vec![0; size.width as usize * size.height as usize * 4],
                wrap: (WrapMode::ClampToEdge, WrapMode::ClampToEdge),
                framebuffer,
            },
        );
        store.stats.render_targets_allocated += 1;

        Ok(RenderTargetStorage {
            texture,
            framebuffer,
            size,
        })
    }

    fn delete_render_target(&mut self, storage: &RenderTargetStorage) {
        let mut store = self.store.lock();
        if store.textures.remove(&storage.texture).is_some() {
            store.stats.render_targets_deleted += 1;
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        for sampler in call.samplers {
            self.bound.insert(sampler.unit, sampler.texture);
        }

        let mut store = self.store.lock();
        let program = *store
            .programs
            .get(&call.program)
            .ok_or_else(|| FrameGenError::GpuError(format!("unknown program {}", call.program.0)))?;

        // Taken out of the map so inputs can be borrowed while it is written.
        let mut target = store
            .textures
            .remove(&call.target.texture)
            .ok_or_else(|| {
                FrameGenError::GpuError(format!(
                    "render target {} does not exist",
                    call.target.texture.0
                ))
            })?;

        let result = match target.framebuffer {
            Some(_) if target.channels == 4 => match program {
                SoftwareProgram::YuvToRgb => rasterize_yuv(&store, call, &mut target),
            },
            _ => Err(FrameGenError::GpuError(format!(
                "texture {} has no framebuffer attachment",
                call.target.texture.0
            ))),
        };

        if result.is_ok() {
            let inputs = call
                .samplers
                .iter()
                .filter_map(|sampler| {
                    store.textures.get(&sampler.texture).map(|texture| SampledInput {
                        unit: sampler.unit,
                        size: texture.size,
                        channels: texture.channels,
                        wrap: texture.wrap,
                    })
                })
                .collect();
            store.last_draw = Some(SoftwareDrawRecord {
                program: call.program,
                target_size: target.size,
                inputs,
            });
            store.stats.draws += 1;
        }

        store.textures.insert(call.target.texture, target);
        result
    }

    fn read_rgba(&mut self, storage: &RenderTargetStorage) -> Result<Vec<u8>> {
        let store = self.store.lock();
        match store.textures.get(&storage.texture) {
            Some(texture) if texture.channels == 4 => Ok(texture.data.clone()),
            Some(texture) => Err(FrameGenError::GpuError(format!(
                "texture {} has {} channels, not RGBA",
                storage.texture.0, texture.channels
            ))),
            None => Err(FrameGenError::GpuError(format!(
                "texture {} does not exist",
                storage.texture.0
            ))),
        }
    }
}

fn sampler_texture<'s>(
    store: &'s SoftwareStore,
    call: &'s DrawCall<'_>,
    uniform: &str,
) -> Result<(&'s SamplerBinding<'s>, &'s SoftwareTexture)> {
    let sampler = call
        .samplers
        .iter()
        .find(|sampler| sampler.uniform == uniform)
        .ok_or_else(|| FrameGenError::GpuError(format!("sampler {uniform} is not bound")))?;
    let texture = store.textures.get(&sampler.texture).ok_or_else(|| {
        FrameGenError::GpuError(format!(
            "texture {} for {} is not resident",
            sampler.texture.0, uniform
        ))
    })?;
    Ok((sampler, texture))
}

fn rasterize_yuv(
    store: &SoftwareStore,
    call: &DrawCall<'_>,
    target: &mut SoftwareTexture,
) -> Result<()> {
    let (luma_sampler, luma) = sampler_texture(store, call, names::LUMINANCE_TEXTURE)?;
    let (chroma_sampler, chroma) = sampler_texture(store, call, names::CHROMINANCE_TEXTURE)?;

    let mut matrix = None;
    let mut luma_offset = 0.0;
    for (name, value) in call.uniforms {
        match (*name, value) {
            (names::COLOR_CONVERSION_MATRIX, UniformValue::Mat3(m)) => matrix = Some(*m),
            (names::LUMA_OFFSET, UniformValue::Float(offset)) => luma_offset = *offset,
            _ => {}
        }
    }
    let matrix = matrix.ok_or_else(|| {
        FrameGenError::GpuError(format!("uniform {} is not set", names::COLOR_CONVERSION_MATRIX))
    })?;

    let [left, bottom, right, _, _, top, _, _] = call.vertices;
    let width = target.size.width as usize;
    let height = target.size.height as usize;

    for row in 0..height {
        for col in 0..width {
            let x = (col as f32 + 0.5) / width as f32 * 2.0 - 1.0;
            let y = (row as f32 + 0.5) / height as f32 * 2.0 - 1.0;
            let s = (x - left) / (right - left);
            let t = (y - bottom) / (top - bottom);
            if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
                continue;
            }

            let (lu, lv) = interpolate(&luma_sampler.texture_coordinates, s, t);
            let (cu, cv) = interpolate(&chroma_sampler.texture_coordinates, s, t);
            let [y_value, _, _, _] = sample(luma, lu, lv);
            let [cb, _, _, cr] = sample(chroma, cu, cv);

            let rgb = apply_column_major(&matrix, luma_offset, y_value, cb, cr);
            let offset = (row * width + col) * 4;
            for (channel, value) in rgb.iter().enumerate() {
                target.data[offset + channel] = (value * 255.0).round() as u8;
            }
            target.data[offset + 3] = 255;
        }
    }
    Ok(())
}

/// Bilinear blend of the four corner coordinates (BL, BR, TL, TR).
fn interpolate(coordinates: &[f32; 8], s: f32, t: f32) -> (f32, f32) {
    let [blu, blv, bru, brv, tlu, tlv, tru, trv] = *coordinates;
    let bottom = (blu + (bru - blu) * s, blv + (brv - blv) * s);
    let top = (tlu + (tru - tlu) * s, tlv + (trv - tlv) * s);
    (bottom.0 + (top.0 - bottom.0) * t, bottom.1 + (top.1 - bottom.1) * t)
}

fn wrap_index(coordinate: f32, extent: u32, mode: WrapMode) -> usize {
    let extent = extent.max(1) as i64;
    let index = (coordinate * extent as f32).floor() as i64;
    let wrapped = match mode {
        WrapMode::ClampToEdge => index.clamp(0, extent - 1),
        WrapMode::Repeat => index.rem_euclid(extent),
    };
    wrapped as usize
}

/// Normalized RGBA the way GL expands luminance formats: L → (L, L, L, 1),
/// LA → (L, L, L, A).
fn sample(texture: &SoftwareTexture, u: f32, v: f32) -> [f32; 4] {
    let x = wrap_index(u, texture.size.width, texture.wrap.0);
    let y = wrap_index(v, texture.size.height, texture.wrap.1);
    let offset = (y * texture.size.width as usize + x) * texture.channels;
    let texel = &texture.data[offset..offset + texture.channels];
    let norm = |byte: u8| byte as f32 / 255.0;
    match *texel {
        [l] => [norm(l), norm(l), norm(l), 1.0],
        [l, a] => [norm(l), norm(l), norm(l), norm(a)],
        [r, g, b, a] => [norm(r), norm(g), norm(b), norm(a)],
        _ => [0.0, 0.0, 0.0, 1.0],
    }
}
