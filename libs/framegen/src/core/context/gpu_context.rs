// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! GPU Context - the single thread that owns all GPU state.
//!
//! Created once at pipeline startup and passed to every component that
//! touches the GPU. Work is marshaled onto the context's thread and the
//! caller blocks until it completes, so GPU state mutation from different
//! callers never interleaves.

use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{
    FramebufferDescriptor, FramebufferPool, FramebufferPoolConfig, FramebufferPoolStats,
    ProgramCache,
};
use crate::core::framebuffer::{Framebuffer, Size};
use crate::core::orientation::ImageOrientation;
use crate::core::rhi::{GpuDevice, ProgramId, VideoTextureCache};
use crate::core::{FrameGenError, Result};

/// Configuration for a [`GpuContext`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuContextConfig {
    /// Name of the GPU thread.
    pub thread_name: String,
    pub pool: FramebufferPoolConfig,
}

impl Default for GpuContextConfig {
    fn default() -> Self {
        Self {
            thread_name: "framegen-gpu".to_string(),
            pool: FramebufferPoolConfig::default(),
        }
    }
}

/// Platform objects the GPU thread owns, built on that thread.
pub struct GpuBackend {
    pub device: Box<dyn GpuDevice>,
    pub texture_cache: Box<dyn VideoTextureCache>,
}

/// GPU state, only reachable from inside [`GpuContext::run_sync`].
pub struct GpuState {
    device: Box<dyn GpuDevice>,
    texture_cache: Box<dyn VideoTextureCache>,
    programs: ProgramCache,
    framebuffers: FramebufferPool,
}

/// Disjoint mutable views of [`GpuState`], for work that needs the device
/// and the texture cache at the same time.
pub struct GpuStateParts<'a> {
    pub device: &'a mut dyn GpuDevice,
    pub texture_cache: &'a mut dyn VideoTextureCache,
    pub framebuffers: &'a FramebufferPool,
}

impl GpuState {
    pub fn device(&mut self) -> &mut dyn GpuDevice {
        self.device.as_mut()
    }

    pub fn texture_cache(&mut self) -> &mut dyn VideoTextureCache {
        self.texture_cache.as_mut()
    }

    pub fn framebuffer_pool(&self) -> &FramebufferPool {
        &self.framebuffers
    }

    pub fn parts(&mut self) -> GpuStateParts<'_> {
        GpuStateParts {
            device: self.device.as_mut(),
            texture_cache: self.texture_cache.as_mut(),
            framebuffers: &self.framebuffers,
        }
    }

    /// Compiled program for this source pair, from the shared cache.
    pub fn program_for(&mut self, vertex: &str, fragment: &str) -> Result<ProgramId> {
        self.programs
            .program_for(self.device.as_mut(), vertex, fragment)
    }

    /// Borrow a framebuffer from the pool.
    pub fn request_framebuffer(
        &mut self,
        orientation: ImageOrientation,
        size: Size,
        texture_only: bool,
    ) -> Result<Framebuffer> {
        self.framebuffers.acquire(
            self.device.as_mut(),
            FramebufferDescriptor {
                size,
                orientation,
                texture_only,
            },
        )
    }
}

type UnitOfWork = Box<dyn FnOnce(&mut GpuState) + Send>;

enum GpuCommand {
    Run(UnitOfWork),
    Shutdown,
}

struct GpuContextShared {
    sender: Sender<GpuCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
    thread_name: String,
    framebuffers: FramebufferPool,
}

impl Drop for GpuContextShared {
    fn drop(&mut self) {
        let _ = self.sender.send(GpuCommand::Shutdown);
        if thread::current().id() == self.thread_id {
            return;
        }
        let thread = self.thread.lock().take();
        if thread.is_some_and(|handle| handle.join().is_err()) {
            tracing::error!(thread = %self.thread_name, "GPU thread panicked");
        }
    }
}

/// Handle to the GPU thread. Cheap to clone; the thread stops when the last
/// handle is dropped.
#[derive(Clone)]
pub struct GpuContext {
    shared: Arc<GpuContextShared>,
}

impl GpuContext {
    /// Spawn the GPU thread and build the backend on it.
    ///
    /// Platform GPU contexts are thread-affine, so `backend` runs on the new
    /// thread. Its error is returned here and the thread exits.
    pub fn new<F>(config: GpuContextConfig, backend: F) -> Result<Self>
    where
        F: FnOnce() -> Result<GpuBackend> + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::unbounded::<GpuCommand>();
        let (init_tx, init_rx) = crossbeam_channel::bounded::<Result<()>>(1);
        let framebuffers = FramebufferPool::new(config.pool.clone());
        let thread_framebuffers = framebuffers.clone();
        let thread_name = config.thread_name.clone();

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || {
                let GpuBackend {
                    device,
                    texture_cache,
                } = match backend() {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = init_tx.send(Err(e));
                        return;
                    }
                };
                let mut state = GpuState {
                    device,
                    texture_cache,
                    programs: ProgramCache::new(),
                    framebuffers: thread_framebuffers,
                };
                let _ = init_tx.send(Ok(()));
                run_gpu_loop(&mut state, receiver);
            })?;

        let thread_id = handle.thread().id();
        let shared = Arc::new(GpuContextShared {
            sender,
            thread: Mutex::new(Some(handle)),
            thread_id,
            thread_name,
            framebuffers,
        });

        init_rx
            .recv()
            .map_err(|_| FrameGenError::Runtime("GPU thread exited during startup".into()))??;

        tracing::info!(thread = %shared.thread_name, "GPU context started");
        Ok(Self { shared })
    }

    /// Run `work` on the GPU thread and block until it returns.
    ///
    /// Must not be called from inside another unit of work: the GPU thread
    /// would wait on itself.
    pub fn run_sync<F, R>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&mut GpuState) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_gpu_thread() {
            return Err(FrameGenError::Runtime("run_sync called from the GPU thread".into()));
        }

        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.shared
            .sender
            .send(GpuCommand::Run(Box::new(move |state| {
                let _ = reply_tx.send(work(state));
            })))
            .map_err(|_| FrameGenError::Runtime("GPU context has shut down".into()))?;

        reply_rx.recv().map_err(|_| {
            FrameGenError::Runtime("GPU thread stopped before completing the work".into())
        })
    }

    pub fn is_gpu_thread(&self) -> bool {
        thread::current().id() == self.shared.thread_id
    }

    pub fn thread_name(&self) -> &str {
        &self.shared.thread_name
    }

    /// Whether this context runs with the thread name and pool settings of
    /// `config`.
    pub fn matches_config(&self, config: &GpuContextConfig) -> bool {
        self.shared.thread_name == config.thread_name
            && *self.shared.framebuffers.config() == config.pool
    }

    /// Read back a framebuffer as RGBA8 bytes.
    pub fn read_rgba(&self, framebuffer: &Framebuffer) -> Result<Vec<u8>> {
        let storage = *framebuffer.storage();
        self.run_sync(move |state| state.device().read_rgba(&storage))?
    }

    pub fn framebuffer_pool_stats(&self) -> FramebufferPoolStats {
        self.shared.framebuffers.stats()
    }

    /// Release GPU storage of idle pooled framebuffers.
    pub fn purge_unused_framebuffers(&self) -> Result<usize> {
        self.run_sync(|state| {
            let GpuStateParts {
                device,
                framebuffers,
                ..
            } = state.parts();
            framebuffers.purge_unused(device)
        })
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("thread", &self.shared.thread_name)
            .field("framebuffers", &self.shared.framebuffers)
            .finish()
    }
}

fn run_gpu_loop(state: &mut GpuState, receiver: Receiver<GpuCommand>) {
    while let Ok(command) = receiver.recv() {
        match command {
            GpuCommand::Run(work) => work(state),
            GpuCommand::Shutdown => break,
        }
    }

    let purged = state.framebuffers.purge_unused(state.device.as_mut());
    tracing::info!(purged, "GPU context stopped");
}
