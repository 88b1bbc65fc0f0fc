// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameGenError {
    #[error("GPU operation failed: {0}")]
    GpuError(String),

    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    #[error("Could not create texture for plane {plane} (status {status})")]
    TextureCreation { plane: usize, status: i32 },

    #[error("Framebuffer unavailable: {0}")]
    FramebufferUnavailable(String),

    #[error("Pixel buffer lock failed: {0}")]
    PixelBufferLock(String),

    #[error("Invalid pixel buffer: {0}")]
    InvalidPixelBuffer(String),

    #[error("Invalid orientation: {0}")]
    InvalidOrientation(String),

    #[error("Invalid frame time: {0}")]
    InvalidTime(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FrameGenError {
    /// Whether the error only affects the current frame.
    ///
    /// Recoverable errors drop one frame; the next frame is processed
    /// independently. Everything else means the pipeline is misconfigured
    /// or the GPU context is gone.
    pub fn is_frame_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TextureCreation { .. }
                | Self::FramebufferUnavailable(_)
                | Self::PixelBufferLock(_)
                | Self::InvalidPixelBuffer(_)
                | Self::InvalidOrientation(_)
                | Self::InvalidTime(_)
                | Self::GpuError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_frame_errors_are_recoverable() {
        let texture = FrameGenError::TextureCreation {
            plane: 1,
            status: -6660,
        };
        assert!(texture.is_frame_recoverable());
        assert!(FrameGenError::FramebufferUnavailable("exhausted".into()).is_frame_recoverable());
        assert!(FrameGenError::InvalidPixelBuffer("3 planes".into()).is_frame_recoverable());
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        assert!(!FrameGenError::ShaderCompilation("syntax".into()).is_frame_recoverable());
        assert!(!FrameGenError::Runtime("gpu thread gone".into()).is_frame_recoverable());
        assert!(!FrameGenError::Configuration("bad toml".into()).is_frame_recoverable());
    }

    #[test]
    fn test_texture_error_message_names_plane() {
        let err = FrameGenError::TextureCreation {
            plane: 0,
            status: -6661,
        };
        assert_eq!(
            err.to_string(),
            "Could not create texture for plane 0 (status -6661)"
        );
    }
}
