//! This module contains the wrapper that attaches a location to an error.
//!
//! Locations are interpreted by the subsystem that produced the error: the
//! executors and the disassembler use byte offsets into the bytecode, while the
//! trace subsystem uses the index of the offending entry in the execution log.

use std::fmt::Formatter;

use thiserror::Error;

/// An error that is localised to a particular location.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub struct Located<E>
where
    E: Clone,
{
    /// The location at which the error occurred.
    pub location: usize,

    /// The error data
    pub payload: E,
}

/// Displays the error associated with the hexadecimal-encoded location where
/// the error occurred.
impl<E> std::fmt::Display for Located<E>
where
    E: std::fmt::Display + Clone,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:#06x}]: {}", self.location, self.payload)
    }
}

/// A trait for types that can have a location attached to them.
pub trait Locatable
where
    Self: Sized,
{
    /// The return type with the attached location.
    type Located;

    /// Attach the location described by `location` to the error.
    fn locate(self, location: usize) -> Self::Located;
}

/// A blanket implementation that allows for attaching a location to any result.
impl<T, E> Locatable for Result<T, E>
where
    E: std::error::Error + Clone,
{
    type Located = Result<T, Located<E>>;

    fn locate(self, location: usize) -> Self::Located {
        self.map_err(|e| Located {
            location,
            payload: e,
        })
    }
}
