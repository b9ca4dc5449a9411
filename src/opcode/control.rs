//! Opcodes that perform control(-flow) operations on the EVM.
//!
//! None of these move the program counter themselves. They report where
//! execution goes through the returned [`Flow`], and [`super::Opcode::execute`]
//! updates the state to match.

use crate::{
    opcode::{ExecuteResult, Flow, Halt},
    vm::{
        state::MachineState,
        value::{known::KnownWord, Word},
    },
};

/// The `STOP` opcode halts execution on the EVM, exiting the current call
/// context.
pub fn stop(_state: &mut MachineState) -> ExecuteResult {
    Ok(Flow::Halt(Halt::Stop))
}

/// The `JUMP` opcode alters the program counter.
///
/// # Semantics
///
/// | Stack Index | Input     | Output |
/// | :---------: | :-------: | :----: |
/// | 1           | `counter` |        |
///
/// A counter that is not known cannot be followed, and one that cannot be an
/// offset into any code halts as an invalid jump would.
pub fn jump(state: &mut MachineState) -> ExecuteResult {
    let counter = state.stack_mut().pop()?;

    Ok(jump_to(counter))
}

/// The `JUMPI` opcode conditionally alters the program counter.
///
/// # Semantics
///
/// | Stack Index | Input     | Output |
/// | :---------: | :-------: | :----: |
/// | 1           | `counter` |        |
/// | 2           | `b`       |        |
///
/// The jump is taken if `b` is nonzero. If `b` is not known, both ways are
/// possible and execution forks, unless the destination is not known either.
pub fn jumpi(offset: usize, state: &mut MachineState) -> ExecuteResult {
    let [counter, condition] = state.stack_mut().pop_n::<2>()?;

    let flow = match condition {
        Word::Concrete(b) if b.is_zero_value() => Flow::Continue,
        Word::Concrete(_) => jump_to(counter),
        Word::Symbolic(_) => match counter.known().map(|c| c.to_usize()) {
            Some(Some(taken)) => Flow::Fork {
                taken,
                not_taken: offset + 1,
            },
            Some(None) => Flow::Continue,
            None => Flow::UnresolvedJump,
        },
    };

    Ok(flow)
}

/// The `PC` opcode gets the value of the program counter prior to the
/// increment corresponding to this instruction.
///
/// # Semantics
///
/// | Stack Index | Input | Output   |
/// | :---------: | :---: | :------: |
/// | 1           |       | `offset` |
pub fn pc(offset: usize, state: &mut MachineState) -> ExecuteResult {
    state.stack_mut().push(offset);

    Ok(Flow::Continue)
}

/// The `JUMPDEST` opcode marks a valid destination for jumps, and has no
/// effect on the state.
pub fn jump_dest(_state: &mut MachineState) -> ExecuteResult {
    Ok(Flow::Continue)
}

/// The `RETURN` opcode halts execution, returning output data.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `size`   |        |
pub fn return_(state: &mut MachineState) -> ExecuteResult {
    let [offset, size] = state.stack_mut().pop_n::<2>()?;
    state.memory_mut().expand(offset, size);

    Ok(Flow::Halt(Halt::Return))
}

/// The `REVERT` opcode halts execution, reverting state changes but returning
/// data and remaining gas.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `size`   |        |
pub fn revert(state: &mut MachineState) -> ExecuteResult {
    let [offset, size] = state.stack_mut().pop_n::<2>()?;
    state.memory_mut().expand(offset, size);

    Ok(Flow::Halt(Halt::Revert))
}

/// The `INVALID` opcode, and every unassigned byte, halts with an exceptional
/// failure.
pub fn invalid(_state: &mut MachineState) -> ExecuteResult {
    Ok(Flow::Halt(Halt::Invalid))
}

/// Works out where an unconditional jump to `counter` goes.
fn jump_to(counter: Word) -> Flow {
    match counter.known().as_ref().map(KnownWord::to_usize) {
        Some(Some(target)) => Flow::Jump(target),
        Some(None) => Flow::Halt(Halt::Invalid),
        None => Flow::UnresolvedJump,
    }
}
