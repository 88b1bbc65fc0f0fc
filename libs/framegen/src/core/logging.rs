// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Tracing subscriber setup for applications embedding the generator.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_directive` (e.g. `"info"` or `"framegen=debug"`).
///
/// Returns `false` if a global subscriber was already installed; that
/// subscriber is left in place.
pub fn init_logging(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .try_init()
        .is_ok()
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
