// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Compiled shader programs, keyed by their sources.

use std::collections::HashMap;

use crate::core::Result;
use crate::core::rhi::{GpuDevice, ProgramId};

#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: HashMap<(String, String), ProgramId>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached program for this source pair, compiling it on
    /// first use. Compile errors are not cached.
    pub fn program_for(
        &mut self,
        device: &mut dyn GpuDevice,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramId> {
        let key = (vertex.to_owned(), fragment.to_owned());
        if let Some(program) = self.programs.get(&key) {
            return Ok(*program);
        }

        let program = device.compile_program(vertex, fragment)?;
        tracing::debug!(program = program.0, "Compiled shader program");
        self.programs.insert(key, program);
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shaders::{
        TWO_INPUT_VERTEX_SHADER as VERTEX, YUV_CONVERSION_FRAGMENT_SHADER as FRAGMENT,
    };
    use crate::software::SoftwareBackend;

    #[test]
    fn test_program_is_compiled_once() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let mut cache = ProgramCache::new();

        let a = cache.program_for(&mut device, VERTEX, FRAGMENT).unwrap();
        let b = cache.program_for(&mut device, VERTEX, FRAGMENT).unwrap();

        assert_eq!(a, b);
        assert_eq!(cache.len(), 1);
        assert_eq!(backend.stats().programs_compiled, 1);
    }

    #[test]
    fn test_compile_failure_is_not_cached() {
        let backend = SoftwareBackend::new();
        let mut device = backend.device();
        let mut cache = ProgramCache::new();

        assert!(cache.program_for(&mut device, "", "").is_err());
        assert!(cache.is_empty());
    }
}
