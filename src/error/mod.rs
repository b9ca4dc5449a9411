//! This module contains the primary error type for the library's interface. It
//! also re-exports the more specific error types that are subsystem-specific.

pub mod container;
pub mod disassembly;
pub mod execution;
pub mod provider;
pub mod trace;

use thiserror::Error;

/// The interface result type for the library.
///
/// # Usage
///
/// Any function considered to be part of the public interface of the library
/// should return this result type. Subsystems should return the more-specific
/// child error types as appropriate.
pub type Result<T> = std::result::Result<T, Error>;

/// The interface error type for the library.
///
/// All errors returned from the library interface (and hence encountered by the
/// clients of the library) should be members of this enum.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum Error {
    /// Errors that come from the disassembly process.
    #[error(transparent)]
    Disassembly(#[from] disassembly::LocatedError),

    /// Errors from the opcode executors.
    #[error(transparent)]
    Execution(#[from] execution::LocatedError),

    /// Errors from reading traces and matching call frames in them.
    #[error(transparent)]
    Trace(#[from] trace::Error),

    /// Errors reported by the chain collaborators.
    #[error(transparent)]
    Provider(#[from] provider::Error),

    /// An unknown error, represented as a string.
    #[error("Unknown Error: {_0:?}")]
    Other(String),
}

impl Error {
    /// Constructs an unknown error with the provided `message`.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Checks if `self` reports that a transaction was unknown to the node.
    #[must_use]
    pub fn is_transaction_not_found(&self) -> bool {
        matches!(
            self,
            Self::Provider(provider::Error::TransactionNotFound { .. })
        )
    }
}

/// Allow the trace subsystem's malformation reports to be raised directly.
impl From<trace::Malformation> for Error {
    fn from(value: trace::Malformation) -> Self {
        Self::Trace(value.into())
    }
}
