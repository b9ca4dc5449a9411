//! This module contains the errors that the chain collaborators report back to
//! the library.

use thiserror::Error;

/// Errors returned by implementations of the traits in [`crate::provider`].
///
/// These are surfaced unchanged by the library and never retried by it. Retry
/// policy for transient failures belongs to the implementation of the
/// collaborator.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Transaction {hash} not found in node")]
    TransactionNotFound { hash: String },

    #[error("The chain collaborator failed: {_0}")]
    Transport(String),
}

impl Error {
    /// Constructs the error reported when `hash` is unknown to the node.
    pub fn transaction_not_found(hash: impl Into<String>) -> Self {
        Self::TransactionNotFound { hash: hash.into() }
    }

    /// Constructs a transport error with the provided `message`.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}
