// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::core::rhi::{LockFlags, PixelFormat, PlanarPixelBuffer};
use crate::core::{FrameGenError, Result};

/// One tightly packed plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftwarePlane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// In-memory planar pixel buffer with lock bookkeeping.
#[derive(Debug)]
pub struct SoftwarePixelBuffer {
    format: PixelFormat,
    planes: Vec<SoftwarePlane>,
    lock_count: AtomicUsize,
    total_locks: AtomicUsize,
    fail_next_lock: AtomicBool,
}

impl SoftwarePixelBuffer {
    /// Buffer from `(width, height, bytes)` planes, taken as given.
    pub fn with_planes(format: PixelFormat, planes: Vec<(u32, u32, Vec<u8>)>) -> Self {
        Self {
            format,
            planes: planes
                .into_iter()
                .map(|(width, height, data)| SoftwarePlane {
                    width,
                    height,
                    data,
                })
                .collect(),
            lock_count: AtomicUsize::new(0),
            total_locks: AtomicUsize::new(0),
            fail_next_lock: AtomicBool::new(false),
        }
    }

    /// Solid-color buffer.
    ///
    /// Biplanar 4:2:0 formats get a `y` luma plane and an interleaved
    /// (`cb`, `cr`) chroma plane of ceil(w/2) × ceil(h/2). Other formats
    /// get a single 4-byte-per-pixel plane filled with `y`.
    pub fn filled(width: u32, height: u32, format: PixelFormat, y: u8, cb: u8, cr: u8) -> Self {
        let pixels = width as usize * height as usize;
        if !format.is_biplanar_420() {
            return Self::with_planes(format, vec![(width, height, vec![y; pixels * 4])]);
        }

        let chroma_width = width.div_ceil(2);
        let chroma_height = height.div_ceil(2);
        let chroma = [cb, cr].repeat(chroma_width as usize * chroma_height as usize);
        Self::with_planes(
            format,
            vec![
                (width, height, vec![y; pixels]),
                (chroma_width, chroma_height, chroma),
            ],
        )
    }

    pub fn plane(&self, index: usize) -> Option<&SoftwarePlane> {
        self.planes.get(index)
    }

    /// Locks currently held.
    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::Acquire)
    }

    /// Successful locks over the buffer's lifetime.
    pub fn total_locks(&self) -> usize {
        self.total_locks.load(Ordering::Acquire)
    }

    /// Make the next lock attempt fail.
    pub fn fail_next_lock(&self) {
        self.fail_next_lock.store(true, Ordering::Release);
    }
}

impl PlanarPixelBuffer for SoftwarePixelBuffer {
    fn width(&self) -> u32 {
        self.plane_width(0)
    }

    fn height(&self) -> u32 {
        self.plane_height(0)
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn plane_count(&self) -> usize {
        self.planes.len()
    }

    fn plane_width(&self, plane: usize) -> u32 {
        self.planes.get(plane).map_or(0, |p| p.width)
    }

    fn plane_height(&self, plane: usize) -> u32 {
        self.planes.get(plane).map_or(0, |p| p.height)
    }

    fn lock_base_address(&self, _flags: LockFlags) -> Result<()> {
        if self.fail_next_lock.swap(false, Ordering::AcqRel) {
            return Err(FrameGenError::PixelBufferLock(
                "kCVReturnError from CVPixelBufferLockBaseAddress".into(),
            ));
        }
        self.lock_count.fetch_add(1, Ordering::AcqRel);
        self.total_locks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn unlock_base_address(&self, _flags: LockFlags) {
        let unbalanced = self
            .lock_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_err();
        if unbalanced {
            tracing::error!("Unlock of a pixel buffer that is not locked");
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
