//! Opcodes that deal with the stack, memory, storage and the data regions
//! (call data, code and return data) available to the executing code.

use crate::{
    opcode::{
        util::{environment_query, environment_value},
        ExecuteResult,
        Flow,
    },
    vm::{
        state::MachineState,
        value::{known::KnownWord, Symbol, Word},
    },
};

/// The `CALLDATALOAD` opcode gets the input data for the current environment.
///
/// # Semantics
///
/// | Stack Index | Input    | Output                           |
/// | :---------: | :------: | :------------------------------: |
/// | 1           | `offset` | `calldata[offset:offset+32]`     |
pub fn call_data_load(state: &mut MachineState) -> ExecuteResult {
    environment_query(state, Symbol::CallDataLoad)
}

/// The `CALLDATASIZE` opcode gets the size of the input data in the current
/// environment.
///
/// # Semantics
///
/// | Stack Index | Input | Output          |
/// | :---------: | :---: | :-------------: |
/// | 1           |       | `len(calldata)` |
pub fn call_data_size(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::CallDataSize)
}

/// The `CALLDATACOPY` opcode copies the input data for the current environment
/// into memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
///
/// The call data is never known, so the destination becomes unknown.
pub fn call_data_copy(state: &mut MachineState) -> ExecuteResult {
    let [dest_offset, _, size] = state.stack_mut().pop_n::<3>()?;
    state.memory_mut().clobber(dest_offset, size);

    Ok(Flow::Continue)
}

/// The `CODESIZE` opcode gets the size of the code running in the current
/// environment.
pub fn code_size(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::CodeSize)
}

/// The `CODECOPY` opcode copies the code running in the current environment
/// into memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
///
/// The machine holds no code, so the destination becomes unknown.
pub fn code_copy(state: &mut MachineState) -> ExecuteResult {
    let [dest_offset, _, size] = state.stack_mut().pop_n::<3>()?;
    state.memory_mut().clobber(dest_offset, size);

    Ok(Flow::Continue)
}

/// The `EXTCODESIZE` opcode gets the size of another account's code.
///
/// # Semantics
///
/// | Stack Index | Input     | Output |
/// | :---------: | :-------: | :----: |
/// | 1           | `address` | `size` |
pub fn ext_code_size(state: &mut MachineState) -> ExecuteResult {
    environment_query(state, Symbol::ExtCodeSize)
}

/// The `EXTCODECOPY` opcode copies another account's code into memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `address`    |        |
/// | 2           | `destOffset` |        |
/// | 3           | `offset`     |        |
/// | 4           | `size`       |        |
pub fn ext_code_copy(state: &mut MachineState) -> ExecuteResult {
    let [_, dest_offset, _, size] = state.stack_mut().pop_n::<4>()?;
    state.memory_mut().clobber(dest_offset, size);

    Ok(Flow::Continue)
}

/// The `RETURNDATASIZE` opcode gets the size of the output data from the
/// previous call in the current environment.
pub fn return_data_size(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::ReturnDataSize)
}

/// The `RETURNDATACOPY` opcode copies the output data from the previous call
/// into memory.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
pub fn return_data_copy(state: &mut MachineState) -> ExecuteResult {
    let [dest_offset, _, size] = state.stack_mut().pop_n::<3>()?;
    state.memory_mut().clobber(dest_offset, size);

    Ok(Flow::Continue)
}

/// The `POP` opcode removes an item from the stack.
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           | `a`   |        |
pub fn pop(state: &mut MachineState) -> ExecuteResult {
    state.stack_mut().pop()?;

    Ok(Flow::Continue)
}

/// The `MLOAD` opcode loads a word from memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output                       |
/// | :---------: | :------: | :--------------------------: |
/// | 1           | `offset` | `memory[offset:offset+32]`   |
pub fn mload(state: &mut MachineState) -> ExecuteResult {
    let offset = state.stack_mut().pop()?;
    let value = state.memory_mut().load(offset);
    state.stack_mut().push(value);

    Ok(Flow::Continue)
}

/// The `MSTORE` opcode stores a word into memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `value`  |        |
pub fn mstore(state: &mut MachineState) -> ExecuteResult {
    let [offset, value] = state.stack_mut().pop_n::<2>()?;
    state.memory_mut().store(offset, value);

    Ok(Flow::Continue)
}

/// The `MSTORE8` opcode stores the lowest byte of a word into memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `value`  |        |
pub fn mstore8(state: &mut MachineState) -> ExecuteResult {
    let [offset, value] = state.stack_mut().pop_n::<2>()?;
    state.memory_mut().store_8(offset, value);

    Ok(Flow::Continue)
}

/// The `SLOAD` opcode loads a word from storage.
///
/// # Semantics
///
/// | Stack Index | Input | Output         |
/// | :---------: | :---: | :------------: |
/// | 1           | `key` | `storage[key]` |
pub fn sload(state: &mut MachineState) -> ExecuteResult {
    let key = state.stack_mut().pop()?;
    let value = state.storage().load(key);
    state.stack_mut().push(value);

    Ok(Flow::Continue)
}

/// The `SSTORE` opcode stores a word into storage.
///
/// # Semantics
///
/// | Stack Index | Input   | Output |
/// | :---------: | :-----: | :----: |
/// | 1           | `key`   |        |
/// | 2           | `value` |        |
pub fn sstore(state: &mut MachineState) -> ExecuteResult {
    let [key, value] = state.stack_mut().pop_n::<2>()?;
    state.storage_mut().store(key, value);

    Ok(Flow::Continue)
}

/// The `TLOAD` opcode loads a word from transient storage.
///
/// It has the same stack semantics as [`sload`].
pub fn tload(state: &mut MachineState) -> ExecuteResult {
    let key = state.stack_mut().pop()?;
    let value = state.transient().load(key);
    state.stack_mut().push(value);

    Ok(Flow::Continue)
}

/// The `TSTORE` opcode stores a word into transient storage.
///
/// It has the same stack semantics as [`sstore`].
pub fn tstore(state: &mut MachineState) -> ExecuteResult {
    let [key, value] = state.stack_mut().pop_n::<2>()?;
    state.transient_mut().store(key, value);

    Ok(Flow::Continue)
}

/// The `MCOPY` opcode copies a region of memory to another, possibly
/// overlapping, region.
///
/// # Semantics
///
/// | Stack Index | Input        | Output |
/// | :---------: | :----------: | :----: |
/// | 1           | `destOffset` |        |
/// | 2           | `offset`     |        |
/// | 3           | `size`       |        |
pub fn mcopy(state: &mut MachineState) -> ExecuteResult {
    let [dest_offset, offset, size] = state.stack_mut().pop_n::<3>()?;
    state.memory_mut().copy(dest_offset, offset, size);

    Ok(Flow::Continue)
}

/// The `MSIZE` opcode gets the size of active memory in bytes.
pub fn msize(state: &mut MachineState) -> ExecuteResult {
    let size = state.memory().size();
    state.stack_mut().push(size);

    Ok(Flow::Continue)
}

/// The `PUSH0` opcode places the value 0 on the stack.
pub fn push0(state: &mut MachineState) -> ExecuteResult {
    state.stack_mut().push(Word::zero());

    Ok(Flow::Continue)
}

/// The `PUSHn` opcodes place their immediate `value` on the stack.
pub fn push(value: KnownWord, state: &mut MachineState) -> ExecuteResult {
    state.stack_mut().push(value);

    Ok(Flow::Continue)
}

/// The `DUPn` opcodes duplicate the `n`th stack item onto the top of the stack.
///
/// # Semantics
///
/// | Stack Index | Input   | Output  |
/// | :---------: | :-----: | :-----: |
/// | 1           | `a1`    | `an`    |
/// | ...         | ...     | `a1`    |
/// | n           | `an`    | ...     |
/// | n+1         |         | `an`    |
pub fn dup(n: u8, state: &mut MachineState) -> ExecuteResult {
    state.stack_mut().dup(usize::from(n).saturating_sub(1))?;

    Ok(Flow::Continue)
}

/// The `SWAPn` opcodes exchange the top stack item with the `n + 1`th.
///
/// # Semantics
///
/// | Stack Index | Input   | Output  |
/// | :---------: | :-----: | :-----: |
/// | 1           | `a`     | `b`     |
/// | ...         | ...     | ...     |
/// | n+1         | `b`     | `a`     |
pub fn swap(n: u8, state: &mut MachineState) -> ExecuteResult {
    state.stack_mut().swap(usize::from(n))?;

    Ok(Flow::Continue)
}

#[cfg(test)]
mod test {
    use crate::{
        opcode::Opcode,
        vm::{
            state::MachineState,
            value::{Symbol, Word},
        },
    };

    fn word(value: usize) -> Word {
        Word::from(value)
    }

    #[test]
    fn stores_and_loads_memory() -> anyhow::Result<()> {
        let mut state = MachineState::with_stack([word(0x80), word(0x40)]);
        Opcode::MStore.execute(0, &mut state)?;
        state.stack_mut().push(word(0x40));
        Opcode::MLoad.execute(1, &mut state)?;

        assert_eq!(state.stack().read(0)?, &word(0x80));

        Opcode::MSize.execute(2, &mut state)?;
        assert_eq!(state.stack().read(0)?, &word(0x60));

        Ok(())
    }

    #[test]
    fn stores_single_bytes() -> anyhow::Result<()> {
        let mut state = MachineState::with_stack([word(0x1ff), word(31)]);
        Opcode::MStore8.execute(0, &mut state)?;
        state.stack_mut().push(word(0));
        Opcode::MLoad.execute(1, &mut state)?;

        assert_eq!(state.stack().read(0)?, &word(0xff));

        Ok(())
    }

    #[test]
    fn copies_clobber_their_destination() -> anyhow::Result<()> {
        for opcode in [Opcode::CallDataCopy, Opcode::CodeCopy, Opcode::ReturnDataCopy] {
            let mut state = MachineState::with_stack([word(32), word(0), word(0)]);
            state.memory_mut().store(word(0), word(1));
            opcode.execute(0, &mut state)?;

            assert!(state.stack().is_empty());
            assert_eq!(state.memory_mut().load(word(0)), Word::unknown());
        }

        let mut state = MachineState::with_stack([word(32), word(0), word(0), word(0xaa)]);
        Opcode::ExtCodeCopy.execute(0, &mut state)?;
        assert_eq!(state.memory_mut().load(word(0)), Word::unknown());

        Ok(())
    }

    #[test]
    fn copies_of_symbolic_size_clobber_all_memory() -> anyhow::Result<()> {
        let size = Word::Symbolic(Symbol::CallDataSize);
        let mut state = MachineState::with_stack([size, word(0), word(0x100)]);
        state.memory_mut().store(word(0), word(1));
        Opcode::CallDataCopy.execute(0, &mut state)?;

        assert!(state.memory().is_clobbered());
        Opcode::MSize.execute(1, &mut state)?;
        assert_eq!(
            state.stack().read(0)?,
            &Word::Symbolic(Symbol::MemorySize)
        );

        Ok(())
    }

    #[test]
    fn copies_memory() -> anyhow::Result<()> {
        let mut state = MachineState::with_stack([word(32), word(0), word(64)]);
        state.memory_mut().store(word(0), word(0xabc));
        Opcode::MCopy.execute(0, &mut state)?;

        assert_eq!(state.memory_mut().load(word(64)), word(0xabc));

        Ok(())
    }

    #[test]
    fn stores_and_loads_storage() -> anyhow::Result<()> {
        let mut state = MachineState::with_stack([word(5), word(1)]);
        Opcode::SStore.execute(0, &mut state)?;
        state.stack_mut().push(word(1));
        Opcode::SLoad.execute(1, &mut state)?;
        assert_eq!(state.stack().read(0)?, &word(5));

        state.stack_mut().push(word(2));
        Opcode::SLoad.execute(2, &mut state)?;
        assert_eq!(state.stack().read(0)?, &Word::Symbolic(Symbol::StorageLoad));

        Ok(())
    }

    #[test]
    fn transient_storage_is_separate() -> anyhow::Result<()> {
        let mut state = MachineState::with_stack([word(5), word(1)]);
        Opcode::TStore.execute(0, &mut state)?;

        state.stack_mut().push(word(1));
        Opcode::SLoad.execute(1, &mut state)?;
        assert_eq!(state.stack().read(0)?, &Word::Symbolic(Symbol::StorageLoad));

        state.stack_mut().push(word(1));
        Opcode::TLoad.execute(2, &mut state)?;
        assert_eq!(state.stack().read(0)?, &word(5));

        state.stack_mut().push(word(2));
        Opcode::TLoad.execute(3, &mut state)?;
        assert_eq!(
            state.stack().read(0)?,
            &Word::Symbolic(Symbol::TransientLoad)
        );

        Ok(())
    }

    #[test]
    fn duplicates_and_swaps() -> anyhow::Result<()> {
        let mut state = MachineState::with_stack([word(1), word(2), word(3)]);
        Opcode::Dup(3).execute(0, &mut state)?;
        assert_eq!(state.stack().read(0)?, &word(1));

        Opcode::Swap(3).execute(1, &mut state)?;
        assert_eq!(state.stack().read(0)?, &word(1));
        assert_eq!(state.stack().read(3)?, &word(1));

        Opcode::Swap(1).execute(2, &mut state)?;
        assert_eq!(state.stack().read(0)?, &word(3));
        assert_eq!(state.stack().read(1)?, &word(1));

        Ok(())
    }

    #[test]
    fn dup_and_swap_underflow() {
        let mut state = MachineState::with_stack([word(1), word(2)]);
        let error = Opcode::Dup(3)
            .execute(5, &mut state)
            .expect_err("DUP3 ran with two items");
        assert_eq!(error.location, 5);

        Opcode::Swap(2)
            .execute(5, &mut state)
            .expect_err("SWAP2 ran with two items");
        assert_eq!(state.stack().size(), 2);
    }

    #[test]
    fn pushes_and_pops() -> anyhow::Result<()> {
        let mut state = MachineState::default();
        Opcode::Push0.execute(0, &mut state)?;
        Opcode::push(&[0x2a])?.execute(1, &mut state)?;

        assert_eq!(state.stack().read(0)?, &word(0x2a));
        assert_eq!(state.stack().read(1)?, &word(0));
        assert_eq!(state.pc(), 3);

        Opcode::Pop.execute(3, &mut state)?;
        assert_eq!(state.stack().size(), 1);

        Ok(())
    }
}
