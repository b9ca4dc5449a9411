//! This module contains errors pertaining to the handling of step traces and
//! the search for a contract's call frame within them.

use thiserror::Error;

use crate::constant::NO_MATCHING_BYTECODE_HINT;

/// Errors that occur while reading a [`crate::trace::DebugTrace`] or matching a
/// call frame within it.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    #[error("Malformed trace: {_0}")]
    MalformedTrace(Malformation),

    #[error("{}", NO_MATCHING_BYTECODE_HINT)]
    NoMatchingBytecode,

    #[error("The search for a matching call frame was stopped by the watchdog")]
    StoppedByWatchdog,
}

impl Error {
    /// Checks if `self` reports a trace that could not be processed at all.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedTrace(_))
    }
}

impl From<Malformation> for Error {
    fn from(value: Malformation) -> Self {
        Self::MalformedTrace(value)
    }
}

/// The ways in which a trace can fail to describe a sensible execution.
///
/// Indices refer to positions in the trace's `structLogs`.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Malformation {
    #[error("the trace does not contain `result.structLogs`")]
    MissingStructLogs,

    #[error("the trace could not be decoded: {_0}")]
    Undecodable(String),

    #[error("entry {index} has depth {depth}, below the root depth {root}")]
    DepthBelowRoot { index: usize, depth: u64, root: u64 },

    #[error("entry {index} jumps from depth {from} to depth {to}")]
    DepthJump { index: usize, from: u64, to: u64 },

    #[error("entry {index} enters depth {depth} without a preceding call or create")]
    UnexpectedFrameEntry { index: usize, depth: u64 },

    #[error("entry {index} at depth {depth} enters a frame deeper than can be counted")]
    DepthOverflow { index: usize, depth: u64 },

    #[error("entry {index} has stack word {word:?} that is not a hexadecimal word")]
    InvalidStackWord { index: usize, word: String },
}

#[cfg(test)]
mod test {
    use crate::error::trace::{Error, Malformation};

    #[test]
    fn no_matching_bytecode_mentions_optimizations() {
        let message = Error::NoMatchingBytecode.to_string();
        assert!(message.contains("No matching bytecode"));
        assert!(message.contains("optimizations"));
    }

    #[test]
    fn malformations_convert_into_malformed_trace() {
        let error: Error = Malformation::MissingStructLogs.into();
        assert!(error.is_malformed());
        assert!(!Error::NoMatchingBytecode.is_malformed());
    }
}
