//! This module contains the call-frame matcher, which finds the steps of a
//! trace that were executed by a particular contract's code.
//!
//! # How it Works
//!
//! 1. The trace is validated, so that a malformed trace is reported before
//!    any lookups are made.
//! 2. If the target code is the code of the account the transaction was sent
//!    to, or that account has no code, the steps of the root frame are the
//!    answer.
//! 3. Otherwise every call-family step is a candidate, in the order the steps
//!    executed. The callee of each is read from its recorded stack, and its
//!    code is looked up and compared to the target code. The first candidate
//!    whose callee matches selects the steps one frame deeper than the call.
//!
//! Code is always compared in its normalised form (see [`crate::bytecode`]),
//! so builds that differ only in their compiler metadata match.

use crate::{
    address::Address,
    bytecode,
    constant::DEFAULT_CALLEE_STACK_POSITION,
    error::{
        self,
        trace::{Error, Malformation},
    },
    provider::ChainCodeProvider,
    trace::{self as trace_builder, DebugTrace, StructLog},
    vm::value::known::KnownWord,
    watchdog::{Poller, Watchdog},
};

/// The configuration for the matcher.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// The position on the recorded stack of a call-family step at which the
    /// callee address is found, where 0 is the top of the stack.
    ///
    /// The same position is used for all of the call-family opcodes.
    pub callee_stack_position: usize,
}

impl Config {
    /// Sets the stack position from which callee addresses are read.
    #[must_use]
    pub fn with_callee_stack_position(mut self, position: usize) -> Self {
        self.callee_stack_position = position;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        let callee_stack_position = DEFAULT_CALLEE_STACK_POSITION;
        Self {
            callee_stack_position,
        }
    }
}

/// A call-family step whose callee is known.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Candidate {
    /// The depth of the frame that the call enters.
    frame_depth: u64,

    /// The account whose code the call runs.
    callee: Address,
}

/// Finds the steps in `trace` that were executed by `target_bytecode`,
/// returning them as a trace with the envelope of the original.
///
/// `root_deployed_bytecode` is the code of the account the transaction was
/// sent to. Callee code is looked up through `provider`, which should answer at
/// the state the transaction executed in. The `watchdog` is polled before each
/// lookup.
///
/// # Errors
///
/// - [`Error::MalformedTrace`] if the depths in the trace are inconsistent,
///   before any lookup is made, or if the callee of a call reached by the
///   search cannot be read.
/// - [`Error::StoppedByWatchdog`] if the watchdog asks the search to stop.
/// - [`Error::NoMatchingBytecode`] if no frame runs the target code.
/// - Any error from `provider`, unchanged.
pub async fn find_relevant_segment(
    target_bytecode: &str,
    root_deployed_bytecode: &str,
    trace: &DebugTrace,
    provider: &impl ChainCodeProvider,
    config: &Config,
    watchdog: &dyn Watchdog,
) -> error::Result<DebugTrace> {
    trace.validate()?;

    let target = bytecode::normalize(target_bytecode);
    let root_code = bytecode::normalize(root_deployed_bytecode);
    if bytecode::same_code(&target, &root_code) || bytecode::is_empty_code(&root_code) {
        let root = trace.root_depth();
        tracing::debug!(root, "Target code runs in the root frame");
        return Ok(select_depth(trace, root));
    }

    let mut poller = Poller::new(watchdog);
    let calls = trace.struct_logs().iter().enumerate().filter(|(_, log)| log.is_call());

    for (index, log) in calls {
        let Some(candidate) = read_candidate(index, log, config)? else {
            continue;
        };

        if poller.should_stop() {
            tracing::debug!(index, "Search stopped by the watchdog");
            return Err(Error::StoppedByWatchdog.into());
        }

        tracing::trace!(index, callee = %candidate.callee, "Looking up callee code");
        let code = provider.code_at(candidate.callee).await?;

        if bytecode::same_code(&code, &target) {
            tracing::debug!(
                index,
                callee = %candidate.callee,
                depth = candidate.frame_depth,
                "Target code runs in a called frame"
            );
            return Ok(select_depth(trace, candidate.frame_depth));
        }
    }

    Err(Error::NoMatchingBytecode.into())
}

/// Reads the callee of the call-family step `log`, found at `index` in the
/// trace.
///
/// Returns [`None`] if the stack is too shallow to hold a callee.
fn read_candidate(
    index: usize,
    log: &StructLog,
    config: &Config,
) -> Result<Option<Candidate>, Malformation> {
    let Some(word) = log.stack_word(config.callee_stack_position) else {
        tracing::warn!(
            index,
            op = %log.op,
            stack_size = log.stack.len(),
            "Skipping call whose stack is too shallow to hold a callee"
        );
        return Ok(None);
    };

    let callee = KnownWord::from_hex(word).map(Address::from).ok_or_else(|| {
        Malformation::InvalidStackWord {
            index,
            word: word.to_owned(),
        }
    })?;
    let frame_depth = log.depth.checked_add(1).ok_or(Malformation::DepthOverflow {
        index,
        depth: log.depth,
    })?;

    Ok(Some(Candidate {
        frame_depth,
        callee,
    }))
}

/// Builds a trace holding every step of `trace` at exactly `depth`.
fn select_depth(trace: &DebugTrace, depth: u64) -> DebugTrace {
    let selected = trace
        .struct_logs()
        .iter()
        .filter(|log| log.depth == depth)
        .cloned()
        .collect();

    trace_builder::build(trace, selected)
}

#[cfg(test)]
mod test {
    use crate::{
        error::trace::Malformation,
        matcher::{read_candidate, Config},
        trace::StructLog,
    };

    fn call(depth: u64, stack: &[&str]) -> StructLog {
        StructLog {
            pc:       0,
            op:       "CALL".into(),
            gas:      0,
            gas_cost: 0,
            depth,
            stack:    stack.iter().map(|&word| word.to_owned()).collect(),
            memory:   None,
            storage:  None,
            extra:    serde_json::Map::new(),
        }
    }

    #[test]
    fn reads_callee_below_the_top() -> anyhow::Result<()> {
        let log = call(
            1,
            &["0x0", "0xffff000000000000000000000000000000000000000000000000000000aa", "0x5208"],
        );
        let found = read_candidate(0, &log, &Config::default())?.expect("Callee was not read");

        assert_eq!(
            found.callee.to_string(),
            "0x00000000000000000000000000000000000000aa"
        );
        assert_eq!(found.frame_depth, 2);

        Ok(())
    }

    #[test]
    fn respects_configured_position() -> anyhow::Result<()> {
        let log = call(1, &["0xbb", "0xaa", "0x5208"]);
        let config = Config::default().with_callee_stack_position(2);
        let found = read_candidate(0, &log, &config)?.expect("Callee was not read");

        assert_eq!(
            found.callee.to_string(),
            "0x00000000000000000000000000000000000000bb"
        );

        Ok(())
    }

    #[test]
    fn skips_shallow_stacks() -> anyhow::Result<()> {
        assert!(read_candidate(0, &call(1, &["0x5208"]), &Config::default())?.is_none());

        Ok(())
    }

    #[test]
    fn rejects_words_that_are_not_hex() {
        read_candidate(3, &call(1, &["0xzz", "0x5208"]), &Config::default())
            .expect_err("Read a callee from a non-hex word");
    }

    #[test]
    fn rejects_calls_at_the_greatest_depth() {
        let error = read_candidate(4, &call(u64::MAX, &["0xaa", "0x5208"]), &Config::default())
            .expect_err("Entered a frame beyond the greatest depth");

        assert_eq!(
            error,
            Malformation::DepthOverflow {
                index: 4,
                depth: u64::MAX,
            }
        );
    }
}
