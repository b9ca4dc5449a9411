//! This file contains utilities for implementing the executable semantics of
//! the opcodes.

use crate::{
    opcode::{ExecuteResult, Flow},
    vm::{
        state::MachineState,
        value::{known::KnownWord, Symbol, Word},
    },
};

/// Replaces the top stack item `a` with `op(a)`.
pub fn unary(state: &mut MachineState, op: impl FnOnce(KnownWord) -> KnownWord) -> ExecuteResult {
    let stack = state.stack_mut();
    let [a] = stack.pop_n::<1>()?;
    stack.push(a.map(op));

    Ok(Flow::Continue)
}

/// Replaces the top two stack items `a` (on top) and `b` with `op(a, b)`.
pub fn binary(
    state: &mut MachineState,
    op: impl FnOnce(KnownWord, KnownWord) -> KnownWord,
) -> ExecuteResult {
    let stack = state.stack_mut();
    let [a, b] = stack.pop_n::<2>()?;
    stack.push(a.zip(b, op));

    Ok(Flow::Continue)
}

/// Replaces the top three stack items `a` (on top), `b` and `c` with
/// `op(a, b, c)`.
pub fn ternary(
    state: &mut MachineState,
    op: impl FnOnce(KnownWord, KnownWord, KnownWord) -> KnownWord,
) -> ExecuteResult {
    let stack = state.stack_mut();
    let [a, b, c] = stack.pop_n::<3>()?;
    stack.push(a.zip3(b, c, op));

    Ok(Flow::Continue)
}

/// Pushes the answer to a query that takes no arguments, which is never known
/// statically.
pub fn environment_value(state: &mut MachineState, symbol: Symbol) -> ExecuteResult {
    state.stack_mut().push(Word::Symbolic(symbol));

    Ok(Flow::Continue)
}

/// Replaces the argument of a query on the top of the stack with its answer,
/// which is never known statically.
pub fn environment_query(state: &mut MachineState, symbol: Symbol) -> ExecuteResult {
    let stack = state.stack_mut();
    let [_] = stack.pop_n::<1>()?;
    stack.push(Word::Symbolic(symbol));

    Ok(Flow::Continue)
}
