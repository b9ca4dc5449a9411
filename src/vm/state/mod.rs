//! The state representation for the abstract machine, and utilities for
//! dealing with said representation.

pub mod memory;
pub mod stack;
pub mod storage;

use crate::vm::{
    state::{memory::Memory, stack::Stack, storage::Storage},
    value::Word,
    Config,
};

/// The state that the opcode executors operate on.
///
/// It is exclusively owned by the analysis pass that drives the executors, and
/// every effect of an executor is confined to it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineState {
    stack: Stack,
    memory: Memory,
    storage: Storage,
    transient: Storage,

    /// The offset of the next instruction to execute.
    pc: usize,
}

impl MachineState {
    /// Constructs a new state with empty stack, memory and storage, positioned
    /// at the start of the code.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            stack: Stack::new(),
            memory: Memory::new(config),
            storage: Storage::persistent(),
            transient: Storage::transient(),
            pc: 0,
        }
    }

    /// Constructs a new state whose stack holds `items`, with the last item on
    /// top.
    #[must_use]
    pub fn with_stack(items: impl IntoIterator<Item = Word>) -> Self {
        let mut state = Self::default();
        for item in items {
            state.stack.push(item);
        }
        state
    }

    /// Gets the program counter.
    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Sets the program counter to `pc`.
    pub fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Gets the persistent storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Gets the transient storage.
    #[must_use]
    pub fn transient(&self) -> &Storage {
        &self.transient
    }

    pub fn transient_mut(&mut self) -> &mut Storage {
        &mut self.transient
    }
}

impl Default for MachineState {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
