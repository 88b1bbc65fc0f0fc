// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! FramebufferPool - reusable render targets keyed by size, orientation and
//! texture-only flag.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::core::framebuffer::{Framebuffer, Size};
use crate::core::orientation::ImageOrientation;
use crate::core::rhi::{GpuDevice, RenderTargetStorage};
use crate::core::{FrameGenError, Result};

/// Request descriptor for acquiring a pooled framebuffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FramebufferDescriptor {
    pub size: Size,
    pub orientation: ImageOrientation,
    pub texture_only: bool,
}

/// Unique identifier for a pool slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolSlotId(u64);

/// Policy for handling pool exhaustion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PoolExhaustionPolicy {
    /// Block and wait for a framebuffer to be released.
    Block { timeout_ms: u64 },
    /// Grow the bucket past its configured size, up to `max_size`.
    Grow { max_size: usize },
    /// Fail immediately; the frame is dropped.
    #[default]
    ReturnError,
}

/// Configuration for the framebuffer pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramebufferPoolConfig {
    /// Maximum number of framebuffers per bucket before the exhaustion
    /// policy applies.
    pub max_framebuffers_per_bucket: usize,
    pub exhaustion_policy: PoolExhaustionPolicy,
}

impl Default for FramebufferPoolConfig {
    fn default() -> Self {
        Self {
            max_framebuffers_per_bucket: 8,
            exhaustion_policy: PoolExhaustionPolicy::default(),
        }
    }
}

/// Statistics about pool usage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FramebufferPoolStats {
    pub total_framebuffers: usize,
    pub framebuffers_in_use: usize,
    pub framebuffers_available: usize,
    pub bucket_count: usize,
}

struct PoolSlot {
    id: PoolSlotId,
    storage: RenderTargetStorage,
    descriptor: FramebufferDescriptor,
    in_use: AtomicBool,
}

impl PoolSlot {
    fn is_available(&self) -> bool {
        !self.in_use.load(Ordering::Acquire)
    }

    fn try_acquire(&self) -> bool {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.in_use.store(false, Ordering::Release);
    }
}

struct FramebufferPoolInner {
    buckets: Mutex<HashMap<FramebufferDescriptor, Vec<Arc<PoolSlot>>>>,
    config: FramebufferPoolConfig,
    next_slot_id: AtomicU64,
    available_condvar: Condvar,
    condvar_mutex: Mutex<()>,
}

impl FramebufferPoolInner {
    fn find_available_slot(&self, descriptor: &FramebufferDescriptor) -> Option<Arc<PoolSlot>> {
        let buckets = self.buckets.lock();
        buckets
            .get(descriptor)?
            .iter()
            .find(|slot| slot.try_acquire())
            .cloned()
    }

    fn bucket_size(&self, descriptor: &FramebufferDescriptor) -> usize {
        self.buckets.lock().get(descriptor).map_or(0, Vec::len)
    }

    fn stats(&self) -> FramebufferPoolStats {
        let buckets = self.buckets.lock();
        let mut total = 0;
        let mut in_use = 0;
        for slot in buckets.values().flatten() {
            total += 1;
            if !slot.is_available() {
                in_use += 1;
            }
        }
        FramebufferPoolStats {
            total_framebuffers: total,
            framebuffers_in_use: in_use,
            framebuffers_available: total - in_use,
            bucket_count: buckets.len(),
        }
    }
}

/// Claim on a pool slot. Returns the slot to the pool on drop, from any
/// thread.
pub struct FramebufferLease {
    slot: Arc<PoolSlot>,
    pool: Arc<FramebufferPoolInner>,
}

impl FramebufferLease {
    pub fn slot_id(&self) -> PoolSlotId {
        self.slot.id
    }
}

impl Drop for FramebufferLease {
    fn drop(&mut self) {
        self.slot.release();
        let _guard = self.pool.condvar_mutex.lock();
        self.pool.available_condvar.notify_one();
    }
}

impl std::fmt::Debug for FramebufferLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramebufferLease")
            .field("slot_id", &self.slot.id)
            .finish()
    }
}

/// Pool of reusable render targets.
///
/// Acquisition and purging touch GPU storage and run on the GPU thread;
/// statistics and lease release are safe from any thread.
#[derive(Clone)]
pub struct FramebufferPool {
    inner: Arc<FramebufferPoolInner>,
}

impl FramebufferPool {
    pub fn new(config: FramebufferPoolConfig) -> Self {
        Self {
            inner: Arc::new(FramebufferPoolInner {
                buckets: Mutex::new(HashMap::new()),
                config,
                next_slot_id: AtomicU64::new(0),
                available_condvar: Condvar::new(),
                condvar_mutex: Mutex::new(()),
            }),
        }
    }

    /// Hand out a framebuffer matching `descriptor`, reusing an idle slot
    /// when one exists.
    pub fn acquire(
        &self,
        device: &mut dyn GpuDevice,
        descriptor: FramebufferDescriptor,
    ) -> Result<Framebuffer> {
        if let Some(slot) = self.inner.find_available_slot(&descriptor) {
            return Ok(self.framebuffer_for(slot));
        }

        let current_size = self.inner.bucket_size(&descriptor);
        if current_size < self.inner.config.max_framebuffers_per_bucket {
            return self.allocate(device, descriptor);
        }

        match &self.inner.config.exhaustion_policy {
            PoolExhaustionPolicy::Block { timeout_ms } => {
                self.acquire_blocking(&descriptor, *timeout_ms)
            }
            PoolExhaustionPolicy::Grow { max_size } => {
                if current_size < *max_size {
                    self.allocate(device, descriptor)
                } else {
                    Err(FrameGenError::FramebufferUnavailable(format!(
                        "pool exhausted for {}x{} (max size {} reached)",
                        descriptor.size.width, descriptor.size.height, max_size
                    )))
                }
            }
            PoolExhaustionPolicy::ReturnError => Err(FrameGenError::FramebufferUnavailable(format!(
                "pool exhausted for {}x{} ({} in use)",
                descriptor.size.width, descriptor.size.height, current_size
            ))),
        }
    }

    fn acquire_blocking(
        &self,
        descriptor: &FramebufferDescriptor,
        timeout_ms: u64,
    ) -> Result<Framebuffer> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            if let Some(slot) = self.inner.find_available_slot(descriptor) {
                return Ok(self.framebuffer_for(slot));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(FrameGenError::FramebufferUnavailable(format!(
                    "pool exhausted (timeout after {}ms)",
                    timeout_ms
                )));
            }

            let mut guard = self.inner.condvar_mutex.lock();
            // Re-check under the condvar mutex so a release between the
            // search above and the wait is not missed.
            if let Some(slot) = self.inner.find_available_slot(descriptor) {
                return Ok(self.framebuffer_for(slot));
            }
            self.inner
                .available_condvar
                .wait_for(&mut guard, deadline - now);
        }
    }

    fn allocate(
        &self,
        device: &mut dyn GpuDevice,
        descriptor: FramebufferDescriptor,
    ) -> Result<Framebuffer> {
        let storage = device.create_render_target(descriptor.size, descriptor.texture_only)?;
        let slot = Arc::new(PoolSlot {
            id: PoolSlotId(self.inner.next_slot_id.fetch_add(1, Ordering::Relaxed)),
            storage,
            descriptor,
            in_use: AtomicBool::new(true),
        });

        tracing::debug!(
            slot = slot.id.0,
            width = descriptor.size.width,
            height = descriptor.size.height,
            orientation = ?descriptor.orientation,
            texture_only = descriptor.texture_only,
            "Allocated pooled framebuffer"
        );

        self.inner
            .buckets
            .lock()
            .entry(descriptor)
            .or_default()
            .push(Arc::clone(&slot));

        Ok(self.framebuffer_for(slot))
    }

    fn framebuffer_for(&self, slot: Arc<PoolSlot>) -> Framebuffer {
        let storage = slot.storage;
        let descriptor = slot.descriptor;
        Framebuffer::pooled(
            storage,
            descriptor.orientation,
            descriptor.texture_only,
            FramebufferLease {
                slot,
                pool: Arc::clone(&self.inner),
            },
        )
    }

    /// Pre-allocate `count` idle framebuffers for `descriptor`.
    pub fn prewarm(
        &self,
        device: &mut dyn GpuDevice,
        descriptor: FramebufferDescriptor,
        count: usize,
    ) -> Result<()> {
        for _ in 0..count {
            drop(self.allocate(device, descriptor)?);
        }
        Ok(())
    }

    /// Delete the storage of every idle framebuffer. Returns how many were
    /// released.
    pub fn purge_unused(&self, device: &mut dyn GpuDevice) -> usize {
        let mut purged = Vec::new();
        {
            let mut buckets = self.inner.buckets.lock();
            for slots in buckets.values_mut() {
                slots.retain(|slot| {
                    // Claim the slot so no one can acquire it mid-purge.
                    if slot.try_acquire() {
                        purged.push(slot.storage);
                        false
                    } else {
                        true
                    }
                });
            }
            buckets.retain(|_, slots| !slots.is_empty());
        }

        for storage in &purged {
            device.delete_render_target(storage);
        }
        purged.len()
    }

    pub fn stats(&self) -> FramebufferPoolStats {
        self.inner.stats()
    }

    pub fn config(&self) -> &FramebufferPoolConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for FramebufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("FramebufferPool")
            .field("total_framebuffers", &stats.total_framebuffers)
            .field("framebuffers_in_use", &stats.framebuffers_in_use)
            .field("framebuffers_available", &stats.framebuffers_available)
            .field("bucket_count", &stats.bucket_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software::SoftwareBackend;

    fn portrait(width: u32, height: u32) -> FramebufferDescriptor {
        FramebufferDescriptor {
            size: Size::new(width, height),
            orientation: ImageOrientation::Portrait,
            texture_only: false,
        }
    }

    #[test]
    fn test_released_framebuffer_is_reused() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let pool = FramebufferPool::new(FramebufferPoolConfig::default());

        let first = pool.acquire(&mut device, portrait(64, 32)).unwrap();
        let texture = first.texture();
        drop(first);

        let second = pool.acquire(&mut device, portrait(64, 32)).unwrap();
        assert_eq!(second.texture(), texture);
        assert_eq!(pool.stats().total_framebuffers, 1);
        assert_eq!(backend.stats().render_targets_allocated, 1);
    }

    #[test]
    fn test_buckets_are_keyed_by_size_orientation_and_texture_only() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let pool = FramebufferPool::new(FramebufferPoolConfig::default());

        let a = pool.acquire(&mut device, portrait(64, 32)).unwrap();
        let b = pool.acquire(&mut device, portrait(32, 64)).unwrap();
        let mut landscape = portrait(64, 32);
        landscape.orientation = ImageOrientation::LandscapeLeft;
        let c = pool.acquire(&mut device, landscape).unwrap();
        let mut texture_only = portrait(64, 32);
        texture_only.texture_only = true;
        let d = pool.acquire(&mut device, texture_only).unwrap();

        assert!(d.is_texture_only());
        assert_eq!(c.orientation(), ImageOrientation::LandscapeLeft);
        assert_eq!(pool.stats().bucket_count, 4);
        assert_eq!(pool.stats().framebuffers_in_use, 4);
        drop((a, b, c, d));
        assert_eq!(pool.stats().framebuffers_available, 4);
    }

    #[test]
    fn test_return_error_policy_when_exhausted() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let pool = FramebufferPool::new(FramebufferPoolConfig {
            max_framebuffers_per_bucket: 1,
            exhaustion_policy: PoolExhaustionPolicy::ReturnError,
        });

        let _held = pool.acquire(&mut device, portrait(8, 8)).unwrap();
        assert!(matches!(
            pool.acquire(&mut device, portrait(8, 8)),
            Err(FrameGenError::FramebufferUnavailable(_))
        ));
    }

    #[test]
    fn test_grow_policy_caps_at_max_size() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let pool = FramebufferPool::new(FramebufferPoolConfig {
            max_framebuffers_per_bucket: 1,
            exhaustion_policy: PoolExhaustionPolicy::Grow { max_size: 2 },
        });

        let _a = pool.acquire(&mut device, portrait(8, 8)).unwrap();
        let _b = pool.acquire(&mut device, portrait(8, 8)).unwrap();
        assert!(pool.acquire(&mut device, portrait(8, 8)).is_err());
    }

    #[test]
    fn test_block_policy_wakes_on_release() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let pool = FramebufferPool::new(FramebufferPoolConfig {
            max_framebuffers_per_bucket: 1,
            exhaustion_policy: PoolExhaustionPolicy::Block { timeout_ms: 5_000 },
        });

        let held = pool.acquire(&mut device, portrait(8, 8)).unwrap();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            drop(held);
        });

        let reacquired = pool.acquire(&mut device, portrait(8, 8)).unwrap();
        releaser.join().unwrap();
        assert_eq!(reacquired.size(), Size::new(8, 8));
    }

    #[test]
    fn test_block_policy_times_out() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let pool = FramebufferPool::new(FramebufferPoolConfig {
            max_framebuffers_per_bucket: 1,
            exhaustion_policy: PoolExhaustionPolicy::Block { timeout_ms: 10 },
        });

        let _held = pool.acquire(&mut device, portrait(8, 8)).unwrap();
        let err = pool.acquire(&mut device, portrait(8, 8)).unwrap_err();
        assert!(err.to_string().contains("timeout"), "{}", err);
    }

    #[test]
    fn test_purge_only_releases_idle_storage() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let pool = FramebufferPool::new(FramebufferPoolConfig::default());

        let held = pool.acquire(&mut device, portrait(8, 8)).unwrap();
        pool.prewarm(&mut device, portrait(16, 16), 2).unwrap();
        assert_eq!(pool.stats().total_framebuffers, 3);

        assert_eq!(pool.purge_unused(&mut device), 2);
        assert_eq!(pool.stats().total_framebuffers, 1);
        assert_eq!(backend.stats().render_targets_deleted, 2);
        drop(held);
    }
}
