// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Generator configuration via `framegen.toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::color::{ColorConversionMatrix, ColorMatrixPreset};
use crate::core::context::{FramebufferPoolConfig, GpuContextConfig};
use crate::core::orientation::ImageOrientation;
use crate::core::{FrameGenError, Result};

/// Settings for one generator and the GPU context it runs on.
///
/// ```toml
/// target_orientation = "portrait"
/// color_matrix = "bt601_full_range"
/// gpu_thread_name = "framegen-gpu"
///
/// [pool]
/// max_framebuffers_per_bucket = 4
/// exhaustion_policy = { policy = "block", timeout_ms = 50 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameGeneratorConfig {
    /// Orientation every produced framebuffer is normalized to.
    pub target_orientation: ImageOrientation,

    /// YUV → RGB matrix, read once when the generator is built.
    pub color_matrix: ColorMatrixPreset,

    pub gpu_thread_name: String,

    pub pool: FramebufferPoolConfig,
}

impl Default for FrameGeneratorConfig {
    fn default() -> Self {
        let gpu = GpuContextConfig::default();
        Self {
            target_orientation: ImageOrientation::Portrait,
            color_matrix: ColorMatrixPreset::default(),
            gpu_thread_name: gpu.thread_name,
            pool: gpu.pool,
        }
    }
}

impl FrameGeneratorConfig {
    /// Configuration file name.
    pub const FILE_NAME: &'static str = "framegen.toml";

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FrameGenError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory. Returns error if the file is
    /// missing or cannot be parsed.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            FrameGenError::Configuration(format!("Failed to read {}: {}", config_path.display(), e))
        })?;

        let config = Self::from_toml_str(&content).map_err(|e| match e {
            FrameGenError::Configuration(reason) => {
                FrameGenError::Configuration(format!("{}: {}", config_path.display(), reason))
            }
            other => other,
        })?;

        tracing::info!("Loaded generator config from {}", config_path.display());
        Ok(config)
    }

    /// Load configuration from a directory, returning defaults if the file
    /// is missing or unusable.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(
                "No {} found in {}, using defaults",
                Self::FILE_NAME,
                dir.display()
            );
            return Self::default();
        }

        match Self::load(dir) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.gpu_thread_name.trim().is_empty() {
            return Err(FrameGenError::Configuration("gpu_thread_name must not be empty".into()));
        }
        if self.pool.max_framebuffers_per_bucket == 0 {
            return Err(FrameGenError::Configuration(
                "pool.max_framebuffers_per_bucket must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn color_conversion_matrix(&self) -> ColorConversionMatrix {
        self.color_matrix.into()
    }

    /// Settings for the GPU context this generator runs on.
    pub fn gpu_context_config(&self) -> GpuContextConfig {
        GpuContextConfig {
            thread_name: self.gpu_thread_name.clone(),
            pool: self.pool.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::PoolExhaustionPolicy;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = FrameGeneratorConfig::from_toml_str("").unwrap();
        assert_eq!(config, FrameGeneratorConfig::default());
        assert_eq!(config.target_orientation, ImageOrientation::Portrait);
        assert_eq!(
            config.color_conversion_matrix(),
            ColorConversionMatrix::BT601_FULL_RANGE
        );
        assert_eq!(config.gpu_thread_name, "framegen-gpu");
        assert_eq!(
            config.pool.exhaustion_policy,
            PoolExhaustionPolicy::ReturnError
        );
    }

    #[test]
    fn test_full_config_parses() {
        let config = FrameGeneratorConfig::from_toml_str(
            r#"
target_orientation = "landscape_left"
color_matrix = "bt709_video_range"
gpu_thread_name = "render"

[pool]
max_framebuffers_per_bucket = 3
exhaustion_policy = { policy = "block", timeout_ms = 50 }
"#,
        )
        .unwrap();

        assert_eq!(config.target_orientation, ImageOrientation::LandscapeLeft);
        assert_eq!(config.color_matrix, ColorMatrixPreset::Bt709VideoRange);
        let gpu = config.gpu_context_config();
        assert_eq!(gpu.thread_name, "render");
        assert_eq!(gpu.pool.max_framebuffers_per_bucket, 3);
        assert_eq!(
            gpu.pool.exhaustion_policy,
            PoolExhaustionPolicy::Block { timeout_ms: 50 }
        );
    }

    #[test]
    fn test_zero_sized_pool_is_rejected() {
        let toml = "[pool]\nmax_framebuffers_per_bucket = 0\n";
        let err = FrameGeneratorConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, FrameGenError::Configuration(_)));
    }

    #[test]
    fn test_load_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FrameGeneratorConfig::load(dir.path()).is_err());
        assert_eq!(
            FrameGeneratorConfig::load_or_default(dir.path()),
            FrameGeneratorConfig::default()
        );
    }

    #[test]
    fn test_load_reads_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FrameGeneratorConfig::FILE_NAME),
            "target_orientation = \"portrait_upside_down\"\n",
        )
        .unwrap();

        let config = FrameGeneratorConfig::load(dir.path()).unwrap();
        assert_eq!(
            config.target_orientation,
            ImageOrientation::PortraitUpsideDown
        );
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FrameGeneratorConfig::FILE_NAME),
            "color_matrix = \"sepia\"\n",
        )
        .unwrap();

        let err = FrameGeneratorConfig::load(dir.path()).unwrap_err();
        let message = err.to_string();
        assert!(
            message.contains(FrameGeneratorConfig::FILE_NAME),
            "{message}"
        );
        assert!(message.contains("Failed to parse config"), "{message}");
        assert_eq!(message.matches("Invalid configuration").count(), 1);

        assert_eq!(
            FrameGeneratorConfig::load_or_default(dir.path()),
            FrameGeneratorConfig::default()
        );
    }

    #[test]
    fn test_load_validates_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(FrameGeneratorConfig::FILE_NAME),
            "gpu_thread_name = \"  \"\n",
        )
        .unwrap();

        let err = FrameGeneratorConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, FrameGenError::Configuration(_)));
        assert!(err.to_string().contains("gpu_thread_name"), "{err}");
    }
}
