// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod framebuffer_pool;
mod gpu_context;
mod program_cache;

pub use framebuffer_pool::{
    FramebufferDescriptor, FramebufferLease, FramebufferPool, FramebufferPoolConfig,
    FramebufferPoolStats, PoolExhaustionPolicy, PoolSlotId,
};
pub use gpu_context::{GpuBackend, GpuContext, GpuContextConfig, GpuState, GpuStateParts};
pub use program_cache::ProgramCache;
