//! This module contains the type definitions necessary to stop a search for a
//! matching call frame from outside.
//!
//! # Polling Points
//!
//! The matcher polls the watchdog before each code lookup, as the lookups are
//! the only expensive part of a search. A search that is not performing lookups
//! runs to completion without consulting the watchdog. Dropping the future of a
//! search also stops it, at its next suspension point.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;

/// A dynamically dispatched [`Watchdog`] instance, which can be shared with
/// the tasks that run searches.
pub type DynWatchdog = Arc<dyn Watchdog>;

/// The interface to an object that can be polled to see if a search needs to
/// abort.
///
/// The interface is simple, but it can encapsulate arbitrary logic as far as
/// the matcher is concerned, allowing the client to implement complex stop
/// logic such as deadlines or lookup budgets.
pub trait Watchdog
where
    Self: Debug + Send + Sync,
{
    /// Checks if the search should stop and return an error.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of code lookups the matcher should perform between
    /// polls of the watchdog.
    #[must_use]
    fn poll_every(&self) -> usize;
}

/// An implementation of the [`Watchdog`] trait that never stops a search.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl LazyWatchdog {
    /// Wraps `self` into an [`Arc`].
    #[must_use]
    pub fn in_arc(self) -> DynWatchdog {
        Arc::new(self)
    }
}

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        usize::MAX
    }
}

/// A watchdog that stops a search when a flag in the form of an atomic boolean
/// is set.
///
/// By default, it requests to be polled every
/// [`DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS`] lookups. This is configurable by
/// calling [`Self::polling_every`].
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that should be set externally to stop the search.
    flag: Arc<AtomicBool>,

    /// The number of lookups between polls.
    poll_interval: usize,
}

impl FlagWatchdog {
    /// Constructs a new `FlagWatchdog` wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        let poll_interval = DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;
        Self {
            flag,
            poll_interval,
        }
    }

    /// Specifies the number of lookups that the matcher should perform between
    /// polls of the watchdog. Zero is treated as one.
    #[must_use]
    pub fn polling_every(mut self, lookups: usize) -> Self {
        self.poll_interval = lookups;
        self
    }

    /// Wraps the watchdog into an [`Arc`].
    #[must_use]
    pub fn in_arc(self) -> DynWatchdog {
        Arc::new(self)
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_interval
    }
}

/// Tracks when a [`Watchdog`] is next due to be polled over the course of one
/// search.
///
/// The first check always polls, so a watchdog that is already stopped stops
/// the search before any lookup is made.
#[derive(Debug)]
pub struct Poller<'a> {
    watchdog: &'a dyn Watchdog,
    until_next_poll: usize,
}

impl<'a> Poller<'a> {
    /// Creates a poller for `watchdog`.
    #[must_use]
    pub fn new(watchdog: &'a dyn Watchdog) -> Self {
        Self {
            watchdog,
            until_next_poll: 0,
        }
    }

    /// Records one unit of work, polling the watchdog if it is due, and returns
    /// whether the work should stop.
    pub fn should_stop(&mut self) -> bool {
        if self.until_next_poll > 0 {
            self.until_next_poll -= 1;
            return false;
        }

        self.until_next_poll = self.watchdog.poll_every().max(1) - 1;
        self.watchdog.should_stop()
    }
}
