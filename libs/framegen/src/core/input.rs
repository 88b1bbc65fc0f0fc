// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pixel buffer source for the processing graph.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::framebuffer::Framebuffer;
use crate::core::generator::FrameBufferGenerator;
use crate::core::orientation::ImageOrientation;
use crate::core::rhi::PixelBuffer;
use crate::core::timestamp::MediaTime;

/// Receives framebuffers produced by a source.
///
/// Every consumer gets a shared handle to the same framebuffer. Its pool
/// slot is returned once the last handle is dropped.
pub trait FramebufferConsumer: Send + Sync {
    fn new_framebuffer_available(&self, framebuffer: Arc<Framebuffer>, source_index: usize);
}

/// Frame time used when the caller supplies none.
pub const DEFAULT_SAMPLE_TIME: MediaTime = MediaTime::new(1000, 1000);

/// Feeds pixel buffers through a [`FrameBufferGenerator`] and fans the
/// results out to consumers.
pub struct PixelBufferInput {
    generator: FrameBufferGenerator,
    consumers: RwLock<Vec<Arc<dyn FramebufferConsumer>>>,
}

impl PixelBufferInput {
    pub fn new(generator: FrameBufferGenerator) -> Self {
        Self {
            generator,
            consumers: RwLock::new(Vec::new()),
        }
    }

    pub fn generator(&self) -> &FrameBufferGenerator {
        &self.generator
    }

    /// Register a consumer; its source index is its registration order.
    pub fn add_consumer(&self, consumer: Arc<dyn FramebufferConsumer>) {
        self.consumers.write().push(consumer);
    }

    pub fn remove_all_consumers(&self) {
        self.consumers.write().clear();
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.read().len()
    }

    /// Convert one frame and hand it to every consumer. Returns whether a
    /// framebuffer was produced; dropped frames reach no consumer.
    pub fn process(
        &self,
        buffer: &PixelBuffer,
        frame_time: MediaTime,
        orientation: ImageOrientation,
    ) -> bool {
        let Some(framebuffer) = self.generator.generate(buffer, frame_time, orientation) else {
            return false;
        };

        let framebuffer = Arc::new(framebuffer);
        for (index, consumer) in self.consumers.read().iter().enumerate() {
            consumer.new_framebuffer_available(Arc::clone(&framebuffer), index);
        }
        true
    }

    /// Process a buffer with no timing or orientation metadata: one second
    /// at a millisecond timescale, portrait. `None` is ignored.
    pub fn set_pixel_buffer(&self, pixel_buffer: Option<&PixelBuffer>) -> bool {
        match pixel_buffer {
            Some(buffer) => self.process(buffer, DEFAULT_SAMPLE_TIME, ImageOrientation::Portrait),
            None => false,
        }
    }
}
