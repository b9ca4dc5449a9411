//! This module contains the abstract machine that the opcode executors operate
//! on.
//!
//! The machine does not hold any code. Control flow decisions are reported back
//! to the analysis pass driving the executors, which is responsible for
//! deciding what to run next.

pub mod state;
pub mod value;

use crate::constant::{DEFAULT_MEMORY_SINGLE_OPERATION_MAX_BYTES, MAX_MEMORY_SIZE_BYTES};

/// The configuration for the abstract machine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The highest memory address (exclusive) that is modelled byte by byte.
    ///
    /// Accesses beyond this bound could never be paid for within a block, so
    /// they are treated as clobbering memory instead.
    ///
    /// Defaults to [`MAX_MEMORY_SIZE_BYTES`].
    pub memory_size_limit: usize,

    /// The maximum number of bytes that can be copied in a single memory
    /// operation before the copy is treated as clobbering memory instead.
    ///
    /// Defaults to [`DEFAULT_MEMORY_SINGLE_OPERATION_MAX_BYTES`].
    pub single_memory_operation_size_limit: usize,
}

impl Config {
    /// Sets the `memory_size_limit` config parameter to `value`.
    #[must_use]
    pub fn with_memory_size_limit(mut self, value: usize) -> Self {
        self.memory_size_limit = value;
        self
    }

    /// Sets the memory max bytes configuration parameter to `value`.
    #[must_use]
    pub fn with_memory_max_bytes(mut self, value: usize) -> Self {
        self.single_memory_operation_size_limit = value;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_size_limit: MAX_MEMORY_SIZE_BYTES,
            single_memory_operation_size_limit: DEFAULT_MEMORY_SINGLE_OPERATION_MAX_BYTES,
        }
    }
}
