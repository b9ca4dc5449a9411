//! Opcodes that query the environment in which the code runs, or that have an
//! effect on it.
//!
//! The executors have no access to the chain, so every query pushes the
//! [`Symbol`] naming it. The one exception is `SHA3`, which is computed when
//! the hashed memory is known.

use sha3::{Digest, Keccak256};

use crate::{
    constant::WORD_SIZE_BYTES,
    opcode::{
        util::{environment_query, environment_value},
        ExecuteResult,
        Flow,
        Halt,
    },
    vm::{
        state::MachineState,
        value::{known::KnownWord, Symbol, Word},
    },
};

/// The `SHA3` opcode computes the Keccak-256 hash of a region of memory.
///
/// # Semantics
///
/// | Stack Index | Input    | Output                                     |
/// | :---------: | :------: | :----------------------------------------: |
/// | 1           | `offset` | `keccak256(memory[offset:offset + size])`  |
/// | 2           | `size`   |                                            |
///
/// The hash is only known if every hashed byte is.
pub fn sha3(state: &mut MachineState) -> ExecuteResult {
    let [offset, size] = state.stack_mut().pop_n::<2>()?;
    let hash = match state.memory_mut().read_bytes(offset, size) {
        Some(bytes) => {
            let digest = Keccak256::digest(&bytes);
            let mut hash = [0u8; WORD_SIZE_BYTES];
            hash.copy_from_slice(&digest);
            KnownWord::from_be_bytes(hash).into()
        }
        None => Word::unknown(),
    };
    state.stack_mut().push(hash);

    Ok(Flow::Continue)
}

/// The `ADDRESS` opcode gets the address of the currently executing account.
///
/// # Semantics
///
/// | Stack Index | Input | Output    |
/// | :---------: | :---: | :-------: |
/// | 1           |       | `address` |
pub fn address(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Address)
}

/// The `BALANCE` opcode gets the balance of the specified account.
///
/// # Semantics
///
/// | Stack Index | Input     | Output    |
/// | :---------: | :-------: | :-------: |
/// | 1           | `address` | `balance` |
pub fn balance(state: &mut MachineState) -> ExecuteResult {
    environment_query(state, Symbol::Balance)
}

/// The `ORIGIN` opcode gets the address that sent the transaction.
///
/// # Semantics
///
/// | Stack Index | Input | Output   |
/// | :---------: | :---: | :------: |
/// | 1           |       | `origin` |
pub fn origin(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Origin)
}

/// The `CALLER` opcode gets the address that made the current call.
///
/// # Semantics
///
/// | Stack Index | Input | Output   |
/// | :---------: | :---: | :------: |
/// | 1           |       | `caller` |
pub fn caller(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Caller)
}

/// The `CALLVALUE` opcode gets the value sent with the current call.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           |       | `value` |
pub fn call_value(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::CallValue)
}

/// The `GASPRICE` opcode gets the price of gas in the current environment.
///
/// # Semantics
///
/// | Stack Index | Input | Output  |
/// | :---------: | :---: | :-----: |
/// | 1           |       | `price` |
pub fn gas_price(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::GasPrice)
}

/// The `EXTCODEHASH` opcode gets the hash of the code of another account.
///
/// # Semantics
///
/// | Stack Index | Input     | Output |
/// | :---------: | :-------: | :----: |
/// | 1           | `address` | `hash` |
pub fn ext_code_hash(state: &mut MachineState) -> ExecuteResult {
    environment_query(state, Symbol::ExtCodeHash)
}

/// The `BLOCKHASH` opcode gets the hash of one of the 256 most recent blocks.
///
/// # Semantics
///
/// | Stack Index | Input         | Output |
/// | :---------: | :-----------: | :----: |
/// | 1           | `blockNumber` | `hash` |
pub fn block_hash(state: &mut MachineState) -> ExecuteResult {
    environment_query(state, Symbol::BlockHash)
}

/// The `COINBASE` opcode gets the address of the block's beneficiary.
pub fn coinbase(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Coinbase)
}

/// The `TIMESTAMP` opcode gets the block's timestamp.
pub fn timestamp(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Timestamp)
}

/// The `NUMBER` opcode gets the block's number.
pub fn number(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Number)
}

/// The `PREVRANDAO` opcode gets the output of the randomness beacon provided
/// by the beacon chain.
pub fn prevrandao(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Prevrandao)
}

/// The `GASLIMIT` opcode gets the block's gas limit.
pub fn gas_limit(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::GasLimit)
}

/// The `CHAINID` opcode gets the identifier of the chain.
pub fn chain_id(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::ChainId)
}

/// The `SELFBALANCE` opcode gets the balance of the currently executing
/// account.
pub fn self_balance(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::SelfBalance)
}

/// The `BASEFEE` opcode gets the block's base fee.
pub fn base_fee(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::BaseFee)
}

/// The `BLOBHASH` opcode gets one of the transaction's versioned blob hashes.
///
/// # Semantics
///
/// | Stack Index | Input   | Output |
/// | :---------: | :-----: | :----: |
/// | 1           | `index` | `hash` |
pub fn blob_hash(state: &mut MachineState) -> ExecuteResult {
    environment_query(state, Symbol::BlobHash)
}

/// The `BLOBBASEFEE` opcode gets the block's blob base fee.
pub fn blob_base_fee(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::BlobBaseFee)
}

/// The `GAS` opcode gets the amount of gas remaining after this instruction.
pub fn gas(state: &mut MachineState) -> ExecuteResult {
    environment_value(state, Symbol::Gas)
}

/// The `LOGn` opcodes append a log record with `n` topics.
///
/// # Semantics
///
/// | Stack Index | Input    | Output |
/// | :---------: | :------: | :----: |
/// | 1           | `offset` |        |
/// | 2           | `size`   |        |
/// | 3..n+2      | `topic`  |        |
///
/// Logging has no effect on the machine other than growing memory to cover
/// the logged data.
pub fn log(topic_count: u8, state: &mut MachineState) -> ExecuteResult {
    let stack = state.stack_mut();
    stack.require(usize::from(topic_count) + 2)?;
    let [offset, size] = stack.pop_n::<2>()?;
    for _ in 0..topic_count {
        stack.pop()?;
    }
    state.memory_mut().expand(offset, size);

    Ok(Flow::Continue)
}

/// The `CREATE` opcode creates a new account with associated code.
///
/// # Semantics
///
/// | Stack Index | Input    | Output    |
/// | :---------: | :------: | :-------: |
/// | 1           | `value`  | `address` |
/// | 2           | `offset` |           |
/// | 3           | `size`   |           |
pub fn create(state: &mut MachineState) -> ExecuteResult {
    let [_, offset, size] = state.stack_mut().pop_n::<3>()?;
    state.memory_mut().expand(offset, size);
    state.stack_mut().push(Symbol::Create);

    Ok(Flow::Continue)
}

/// The `CREATE2` opcode creates a new account with associated code at a
/// predictable address.
///
/// # Semantics
///
/// | Stack Index | Input    | Output    |
/// | :---------: | :------: | :-------: |
/// | 1           | `value`  | `address` |
/// | 2           | `offset` |           |
/// | 3           | `size`   |           |
/// | 4           | `salt`   |           |
pub fn create2(state: &mut MachineState) -> ExecuteResult {
    let [_, offset, size, _] = state.stack_mut().pop_n::<4>()?;
    state.memory_mut().expand(offset, size);
    state.stack_mut().push(Symbol::Create2);

    Ok(Flow::Continue)
}

/// The `CALL` opcode performs a message call into an account.
///
/// # Semantics
///
/// | Stack Index | Input        | Output    |
/// | :---------: | :----------: | :-------: |
/// | 1           | `gas`        | `success` |
/// | 2           | `address`    |           |
/// | 3           | `value`      |           |
/// | 4           | `argsOffset` |           |
/// | 5           | `argsSize`   |           |
/// | 6           | `retOffset`  |           |
/// | 7           | `retSize`    |           |
///
/// The returned data is unknown, so the region it is written to becomes
/// unknown.
pub fn call(state: &mut MachineState) -> ExecuteResult {
    let [_, _, _, args_offset, args_size, ret_offset, ret_size] =
        state.stack_mut().pop_n::<7>()?;
    message_call(state, [args_offset, args_size, ret_offset, ret_size], Symbol::Call)
}

/// The `CALLCODE` opcode performs a message call into this account with
/// another account's code.
///
/// It takes the same arguments as [`call`].
pub fn call_code(state: &mut MachineState) -> ExecuteResult {
    let [_, _, _, args_offset, args_size, ret_offset, ret_size] =
        state.stack_mut().pop_n::<7>()?;
    message_call(
        state,
        [args_offset, args_size, ret_offset, ret_size],
        Symbol::CallCode,
    )
}

/// The `DELEGATECALL` opcode performs a message call into this account with
/// another account's code, keeping the current sender and value.
///
/// # Semantics
///
/// | Stack Index | Input        | Output    |
/// | :---------: | :----------: | :-------: |
/// | 1           | `gas`        | `success` |
/// | 2           | `address`    |           |
/// | 3           | `argsOffset` |           |
/// | 4           | `argsSize`   |           |
/// | 5           | `retOffset`  |           |
/// | 6           | `retSize`    |           |
pub fn delegate_call(state: &mut MachineState) -> ExecuteResult {
    let [_, _, args_offset, args_size, ret_offset, ret_size] = state.stack_mut().pop_n::<6>()?;
    message_call(
        state,
        [args_offset, args_size, ret_offset, ret_size],
        Symbol::DelegateCall,
    )
}

/// The `STATICCALL` opcode performs a message call into an account that is not
/// allowed to modify state.
///
/// It takes the same arguments as [`delegate_call`].
pub fn static_call(state: &mut MachineState) -> ExecuteResult {
    let [_, _, args_offset, args_size, ret_offset, ret_size] = state.stack_mut().pop_n::<6>()?;
    message_call(
        state,
        [args_offset, args_size, ret_offset, ret_size],
        Symbol::StaticCall,
    )
}

/// The `SELFDESTRUCT` opcode halts execution and registers the account for
/// deletion.
///
/// # Semantics
///
/// | Stack Index | Input     | Output |
/// | :---------: | :-------: | :----: |
/// | 1           | `address` |        |
pub fn self_destruct(state: &mut MachineState) -> ExecuteResult {
    state.stack_mut().pop()?;

    Ok(Flow::Halt(Halt::SelfDestruct))
}

/// Applies the memory effects shared by the message calls and pushes the
/// success flag.
fn message_call(
    state: &mut MachineState,
    [args_offset, args_size, ret_offset, ret_size]: [Word; 4],
    result: Symbol,
) -> ExecuteResult {
    let memory = state.memory_mut();
    memory.expand(args_offset, args_size);
    memory.clobber(ret_offset, ret_size);
    state.stack_mut().push(result);

    Ok(Flow::Continue)
}
