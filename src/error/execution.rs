//! This module contains errors pertaining to the abstract execution of
//! bytecode by the opcode executors.

use thiserror::Error;

use crate::error::container;

/// Errors that occur while applying an opcode's effect to a
/// [`crate::vm::state::MachineState`].
///
/// Executors are total over every well-formed state, so the only way for one
/// to fail is to be handed a stack that is too shallow for its operands.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Stack underflow: {required} items required but {available} available")]
    StackUnderflow { required: usize, available: usize },
}

/// An execution error with an associated byte offset in the bytecode.
pub type LocatedError = container::Located<Error>;

/// The result type for methods that may have execution errors.
pub type Result<T> = std::result::Result<T, LocatedError>;

/// Make it possible to attach locations to these errors.
impl container::Locatable for Error {
    type Located = LocatedError;

    fn locate(self, location: usize) -> Self::Located {
        container::Located {
            location,
            payload: self,
        }
    }
}
