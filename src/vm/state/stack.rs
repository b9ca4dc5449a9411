//! This module contains the implementation of the abstract machine's stack.

use crate::{error::execution::Error, vm::value::Word};

/// The result type for stack operations, which are located by the executor
/// that performs them.
pub type Result<T> = std::result::Result<T, Error>;

/// The representation of the abstract machine's stack.
///
/// # Indexing
///
/// Indexing into this stack is zero-based, where frame 0 is the top stack
/// frame.
///
/// # Depth
///
/// A true EVM limits the stack to 1024 words. The executors only ever see
/// stacks built by an analysis pass, so no limit is enforced here and the
/// only failure is asking for a frame that does not exist.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Stack {
    data: Vec<Word>,
}

impl Stack {
    /// Creates a new stack without any items on it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the provided value onto the top of the stack.
    pub fn push(&mut self, data: impl Into<Word>) {
        self.data.push(data.into());
    }

    /// Pops the top value from the stack.
    ///
    /// # Errors
    ///
    /// If the stack has no item to pop.
    pub fn pop(&mut self) -> Result<Word> {
        self.require(1)?;
        self.data.pop().ok_or(Error::StackUnderflow {
            required:  1,
            available: 0,
        })
    }

    /// Pops the top `N` values from the stack, returning them with the former
    /// top of the stack first.
    ///
    /// # Errors
    ///
    /// If the stack holds fewer than `N` items, in which case it is left
    /// unchanged.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[Word; N]> {
        self.require(N)?;
        let mut items = [Word::zero(); N];
        for item in &mut items {
            *item = self.pop()?;
        }

        Ok(items)
    }

    /// Reads from the stack frame at the provided `depth`.
    ///
    /// # Errors
    ///
    /// If `depth` does not exist in the stack.
    pub fn read(&self, depth: usize) -> Result<&Word> {
        let index = self.frame_index(depth)?;
        Ok(&self.data[index])
    }

    /// Duplicates the stack item at `frame` onto the top of the stack.
    ///
    /// This is a more general case of the `DUP` opcodes as it can duplicate any
    /// available stack frame. `DUPn` duplicates frame `n - 1`.
    ///
    /// # Errors
    ///
    /// If `frame` doesn't exist.
    pub fn dup(&mut self, frame: usize) -> Result<()> {
        let value = *self.read(frame)?;
        self.push(value);

        Ok(())
    }

    /// Swaps the top stack item with the item in `frame`.
    ///
    /// It swaps with the indicated frame directly, so `SWAPn` swaps with frame
    /// `n`.
    ///
    /// # Errors
    ///
    /// If the target stack frame does not exist.
    pub fn swap(&mut self, frame: usize) -> Result<()> {
        let top_index = self.frame_index(0)?;
        let frame_index = self.frame_index(frame)?;
        self.data.swap(top_index, frame_index);

        Ok(())
    }

    /// Gets the current size of the stack.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Checks if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Checks that the stack holds at least `count` items.
    ///
    /// # Errors
    ///
    /// If it holds fewer.
    pub fn require(&self, count: usize) -> Result<()> {
        let available = self.size();
        if count > available {
            return Err(Error::StackUnderflow {
                required: count,
                available,
            });
        }

        Ok(())
    }

    /// Gets the index into the underlying storage of the frame at `depth`.
    fn frame_index(&self, depth: usize) -> Result<usize> {
        self.require(depth + 1)?;

        // Safe as `require` has checked that the stack is deep enough.
        Ok(self.data.len() - 1 - depth)
    }
}
