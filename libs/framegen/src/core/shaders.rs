// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Shader sources for the YUV → RGB conversion pass.

/// Uniform and attribute names shared by the shaders and the draw calls
/// that feed them.
pub mod names {
    pub const LUMINANCE_TEXTURE: &str = "inputImageTexture";
    pub const CHROMINANCE_TEXTURE: &str = "inputImageTexture2";
    pub const COLOR_CONVERSION_MATRIX: &str = "colorConversionMatrix";
    pub const LUMA_OFFSET: &str = "lumaOffset";
}

/// Passes the quad position through and forwards one texture coordinate
/// per input.
pub const TWO_INPUT_VERTEX_SHADER: &str = r#"
attribute vec4 position;
attribute vec4 inputTextureCoordinate;
attribute vec4 inputTextureCoordinate2;

varying vec2 textureCoordinate;
varying vec2 textureCoordinate2;

void main()
{
    gl_Position = position;
    textureCoordinate = inputTextureCoordinate.xy;
    textureCoordinate2 = inputTextureCoordinate2.xy;
}
"#;

/// Samples luma from the first input's red channel and (Cb, Cr) from the
/// second input's luminance-alpha pair, then applies the conversion matrix.
pub const YUV_CONVERSION_FRAGMENT_SHADER: &str = r#"
varying highp vec2 textureCoordinate;
varying highp vec2 textureCoordinate2;

uniform sampler2D inputImageTexture;
uniform sampler2D inputImageTexture2;

uniform mediump mat3 colorConversionMatrix;
uniform mediump float lumaOffset;

void main()
{
    mediump vec3 yuv;
    lowp vec3 rgb;

    yuv.x = texture2D(inputImageTexture, textureCoordinate).r - lumaOffset;
    yuv.yz = texture2D(inputImageTexture2, textureCoordinate2).ra - vec2(0.5, 0.5);
    rgb = colorConversionMatrix * yuv;

    gl_FragColor = vec4(rgb, 1.0);
}
"#;
