// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Generator configuration.

mod generator_config;

pub use generator_config::FrameGeneratorConfig;
