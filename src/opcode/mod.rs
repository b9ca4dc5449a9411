//! This module contains the [`Opcode`] enum, and the executable semantics of
//! each of the EVM's [opcodes](https://ethereum.org/en/developers/docs/evm/opcodes/).
//!
//! # Executors
//!
//! Every opcode has a transition function over a
//! [`MachineState`] in one of the submodules, grouped by the kind of operation
//! it performs. [`Opcode::execute`] dispatches to them exhaustively, so adding
//! an opcode without giving it semantics is a compile error.
//!
//! # Terminology
//!
//! When referring to stack slots, we treat index 1 as being the top of the
//! stack.

pub mod arithmetic;
pub mod control;
pub mod environment;
pub mod logic;
pub mod macros;
pub mod memory;
mod util;

use std::fmt::{Display, Formatter};

use crate::{
    constant::{
        DUP_OPCODE_BASE_VALUE,
        DUP_SWAP_MAX_DEPTH,
        LOG_MAX_TOPICS,
        LOG_OPCODE_BASE_VALUE,
        PUSH_OPCODE_BASE_VALUE,
        PUSH_OPCODE_MAX_BYTES,
        SWAP_OPCODE_BASE_VALUE,
        WORD_SIZE_BYTES,
    },
    error::{
        container::Locatable,
        disassembly,
        execution::{Error, Result},
    },
    vm::{state::MachineState, value::known::KnownWord},
};

/// The result type of the individual opcode executors, which are located by
/// [`Opcode::execute`].
pub type ExecuteResult = std::result::Result<Flow, Error>;

/// One instruction of the EVM.
///
/// Instructions that carry data (`PUSHn`) or that come in numbered families
/// (`DUPn`, `SWAPn`, `LOGn`) hold that data in the variant. These should be
/// built with [`Opcode::push`], [`Opcode::dup`], [`Opcode::swap`] and
/// [`Opcode::log`], which check that the data is in range.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Opcode {
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
    Sha3,
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    Prevrandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,
    BlobHash,
    BlobBaseFee,
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,
    TLoad,
    TStore,
    MCopy,
    Push0,

    /// `PUSHn`, where `size` is `n` and `value` is the immediate data.
    Push { size: u8, value: KnownWord },

    /// `DUPn`, for `n` in `1..=16`.
    Dup(u8),

    /// `SWAPn`, for `n` in `1..=16`.
    Swap(u8),

    /// `LOGn`, for `n` in `0..=4`.
    Log(u8),

    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,

    /// The designated `INVALID` instruction (`0xfe`), or any byte that is not
    /// assigned an instruction.
    Invalid(u8),

    SelfDestruct,
}

/// What the analysis pass driving the executors should do after an
/// instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
    /// Execution continues with the next instruction.
    Continue,

    /// Execution continues at the contained offset.
    Jump(usize),

    /// Execution may continue at either offset, as the condition of a `JUMPI`
    /// was not known.
    Fork { taken: usize, not_taken: usize },

    /// The destination of a jump was not known, so it cannot be followed.
    UnresolvedJump,

    /// Execution of the frame ended.
    Halt(Halt),
}

/// The ways in which an instruction ends the execution of a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Halt {
    Stop,
    Return,
    Revert,
    Invalid,
    SelfDestruct,
}

impl Opcode {
    /// Constructs a `PUSHn` that pushes `bytes`, where `n` is the number of
    /// bytes.
    ///
    /// # Errors
    ///
    /// If `bytes` is empty (use [`Opcode::Push0`]) or longer than a word.
    pub fn push(bytes: &[u8]) -> std::result::Result<Self, disassembly::Error> {
        let size = u8::try_from(bytes.len()).unwrap_or(u8::MAX);
        let value = KnownWord::from_be_slice(bytes);
        let (true, Some(value)) = ((1..=PUSH_OPCODE_MAX_BYTES).contains(&size), value) else {
            return Err(disassembly::Error::InvalidPushSize(size));
        };

        Ok(Self::Push { size, value })
    }

    /// Constructs `DUPn`.
    ///
    /// # Errors
    ///
    /// If `n` is not in `1..=16`.
    pub fn dup(n: u8) -> std::result::Result<Self, disassembly::Error> {
        check_stack_item(n, "DUP")?;
        Ok(Self::Dup(n))
    }

    /// Constructs `SWAPn`.
    ///
    /// # Errors
    ///
    /// If `n` is not in `1..=16`.
    pub fn swap(n: u8) -> std::result::Result<Self, disassembly::Error> {
        check_stack_item(n, "SWAP")?;
        Ok(Self::Swap(n))
    }

    /// Constructs `LOGn`.
    ///
    /// # Errors
    ///
    /// If `n` is greater than 4.
    pub fn log(n: u8) -> std::result::Result<Self, disassembly::Error> {
        if n > LOG_MAX_TOPICS {
            return Err(disassembly::Error::InvalidTopicCount(n));
        }
        Ok(Self::Log(n))
    }

    /// Decodes the instruction whose opcode is `byte` and whose immediate data
    /// is `immediate`.
    ///
    /// Returns [`None`] if `immediate` is not exactly as long as the
    /// instruction requires (see [`Opcode::immediate_size_of`]).
    #[must_use]
    pub fn decode(byte: u8, immediate: &[u8]) -> Option<Self> {
        if immediate.len() != Self::immediate_size_of(byte) {
            return None;
        }

        let opcode = match byte {
            0x00 => Self::Stop,
            0x01 => Self::Add,
            0x02 => Self::Mul,
            0x03 => Self::Sub,
            0x04 => Self::Div,
            0x05 => Self::SDiv,
            0x06 => Self::Mod,
            0x07 => Self::SMod,
            0x08 => Self::AddMod,
            0x09 => Self::MulMod,
            0x0a => Self::Exp,
            0x0b => Self::SignExtend,
            0x10 => Self::Lt,
            0x11 => Self::Gt,
            0x12 => Self::SLt,
            0x13 => Self::SGt,
            0x14 => Self::Eq,
            0x15 => Self::IsZero,
            0x16 => Self::And,
            0x17 => Self::Or,
            0x18 => Self::Xor,
            0x19 => Self::Not,
            0x1a => Self::Byte,
            0x1b => Self::Shl,
            0x1c => Self::Shr,
            0x1d => Self::Sar,
            0x20 => Self::Sha3,
            0x30 => Self::Address,
            0x31 => Self::Balance,
            0x32 => Self::Origin,
            0x33 => Self::Caller,
            0x34 => Self::CallValue,
            0x35 => Self::CallDataLoad,
            0x36 => Self::CallDataSize,
            0x37 => Self::CallDataCopy,
            0x38 => Self::CodeSize,
            0x39 => Self::CodeCopy,
            0x3a => Self::GasPrice,
            0x3b => Self::ExtCodeSize,
            0x3c => Self::ExtCodeCopy,
            0x3d => Self::ReturnDataSize,
            0x3e => Self::ReturnDataCopy,
            0x3f => Self::ExtCodeHash,
            0x40 => Self::BlockHash,
            0x41 => Self::Coinbase,
            0x42 => Self::Timestamp,
            0x43 => Self::Number,
            0x44 => Self::Prevrandao,
            0x45 => Self::GasLimit,
            0x46 => Self::ChainId,
            0x47 => Self::SelfBalance,
            0x48 => Self::BaseFee,
            0x49 => Self::BlobHash,
            0x4a => Self::BlobBaseFee,
            0x50 => Self::Pop,
            0x51 => Self::MLoad,
            0x52 => Self::MStore,
            0x53 => Self::MStore8,
            0x54 => Self::SLoad,
            0x55 => Self::SStore,
            0x56 => Self::Jump,
            0x57 => Self::JumpI,
            0x58 => Self::Pc,
            0x59 => Self::MSize,
            0x5a => Self::Gas,
            0x5b => Self::JumpDest,
            0x5c => Self::TLoad,
            0x5d => Self::TStore,
            0x5e => Self::MCopy,
            0x5f => Self::Push0,
            0x60..=0x7f => Self::Push {
                size:  byte - PUSH_OPCODE_BASE_VALUE,
                value: KnownWord::from_be_slice(immediate)?,
            },
            0x80..=0x8f => Self::Dup(byte - DUP_OPCODE_BASE_VALUE),
            0x90..=0x9f => Self::Swap(byte - SWAP_OPCODE_BASE_VALUE),
            0xa0..=0xa4 => Self::Log(byte - LOG_OPCODE_BASE_VALUE),
            0xf0 => Self::Create,
            0xf1 => Self::Call,
            0xf2 => Self::CallCode,
            0xf3 => Self::Return,
            0xf4 => Self::DelegateCall,
            0xf5 => Self::Create2,
            0xfa => Self::StaticCall,
            0xfd => Self::Revert,
            0xff => Self::SelfDestruct,
            _ => Self::Invalid(byte),
        };

        Some(opcode)
    }

    /// Gets the number of bytes of immediate data that follow the opcode
    /// `byte` in the code.
    #[must_use]
    pub fn immediate_size_of(byte: u8) -> usize {
        match byte {
            0x60..=0x7f => usize::from(byte - PUSH_OPCODE_BASE_VALUE),
            _ => 0,
        }
    }

    /// Executes the opcode found at `offset` in the code, modifying `state`
    /// appropriately.
    ///
    /// On success the program counter in `state` is moved to wherever the
    /// returned [`Flow`] says execution continues: the next instruction for
    /// [`Flow::Continue`] and the fall-through of a [`Flow::Fork`], the target
    /// for [`Flow::Jump`], and unchanged otherwise.
    ///
    /// # Errors
    ///
    /// If the stack does not hold enough operands, in which case `state` is
    /// left unchanged.
    pub fn execute(&self, offset: usize, state: &mut MachineState) -> Result<Flow> {
        state.stack().require(self.arg_count()).locate(offset)?;

        let flow = self.dispatch(offset, state).locate(offset)?;
        let next = offset + 1 + self.immediate_size();
        match flow {
            Flow::Continue | Flow::Fork { .. } => state.set_pc(next),
            Flow::Jump(target) => state.set_pc(target),
            Flow::UnresolvedJump | Flow::Halt(_) => state.set_pc(offset),
        }

        Ok(flow)
    }

    /// Calls the transition function for the opcode.
    fn dispatch(&self, offset: usize, state: &mut MachineState) -> ExecuteResult {
        match *self {
            Self::Stop => control::stop(state),
            Self::Add => arithmetic::add(state),
            Self::Mul => arithmetic::mul(state),
            Self::Sub => arithmetic::sub(state),
            Self::Div => arithmetic::div(state),
            Self::SDiv => arithmetic::sdiv(state),
            Self::Mod => arithmetic::rem(state),
            Self::SMod => arithmetic::srem(state),
            Self::AddMod => arithmetic::add_mod(state),
            Self::MulMod => arithmetic::mul_mod(state),
            Self::Exp => arithmetic::exp(state),
            Self::SignExtend => arithmetic::sign_extend(state),
            Self::Lt => logic::lt(state),
            Self::Gt => logic::gt(state),
            Self::SLt => logic::slt(state),
            Self::SGt => logic::sgt(state),
            Self::Eq => logic::eq(state),
            Self::IsZero => logic::is_zero(state),
            Self::And => logic::and(state),
            Self::Or => logic::or(state),
            Self::Xor => logic::xor(state),
            Self::Not => logic::not(state),
            Self::Byte => logic::byte(state),
            Self::Shl => logic::shl(state),
            Self::Shr => logic::shr(state),
            Self::Sar => logic::sar(state),
            Self::Sha3 => environment::sha3(state),
            Self::Address => environment::address(state),
            Self::Balance => environment::balance(state),
            Self::Origin => environment::origin(state),
            Self::Caller => environment::caller(state),
            Self::CallValue => environment::call_value(state),
            Self::CallDataLoad => memory::call_data_load(state),
            Self::CallDataSize => memory::call_data_size(state),
            Self::CallDataCopy => memory::call_data_copy(state),
            Self::CodeSize => memory::code_size(state),
            Self::CodeCopy => memory::code_copy(state),
            Self::GasPrice => environment::gas_price(state),
            Self::ExtCodeSize => memory::ext_code_size(state),
            Self::ExtCodeCopy => memory::ext_code_copy(state),
            Self::ReturnDataSize => memory::return_data_size(state),
            Self::ReturnDataCopy => memory::return_data_copy(state),
            Self::ExtCodeHash => environment::ext_code_hash(state),
            Self::BlockHash => environment::block_hash(state),
            Self::Coinbase => environment::coinbase(state),
            Self::Timestamp => environment::timestamp(state),
            Self::Number => environment::number(state),
            Self::Prevrandao => environment::prevrandao(state),
            Self::GasLimit => environment::gas_limit(state),
            Self::ChainId => environment::chain_id(state),
            Self::SelfBalance => environment::self_balance(state),
            Self::BaseFee => environment::base_fee(state),
            Self::BlobHash => environment::blob_hash(state),
            Self::BlobBaseFee => environment::blob_base_fee(state),
            Self::Pop => memory::pop(state),
            Self::MLoad => memory::mload(state),
            Self::MStore => memory::mstore(state),
            Self::MStore8 => memory::mstore8(state),
            Self::SLoad => memory::sload(state),
            Self::SStore => memory::sstore(state),
            Self::Jump => control::jump(state),
            Self::JumpI => control::jumpi(offset, state),
            Self::Pc => control::pc(offset, state),
            Self::MSize => memory::msize(state),
            Self::Gas => environment::gas(state),
            Self::JumpDest => control::jump_dest(state),
            Self::TLoad => memory::tload(state),
            Self::TStore => memory::tstore(state),
            Self::MCopy => memory::mcopy(state),
            Self::Push0 => memory::push0(state),
            Self::Push { value, .. } => memory::push(value, state),
            Self::Dup(n) => memory::dup(n, state),
            Self::Swap(n) => memory::swap(n, state),
            Self::Log(n) => environment::log(n, state),
            Self::Create => environment::create(state),
            Self::Call => environment::call(state),
            Self::CallCode => environment::call_code(state),
            Self::Return => control::return_(state),
            Self::DelegateCall => environment::delegate_call(state),
            Self::Create2 => environment::create2(state),
            Self::StaticCall => environment::static_call(state),
            Self::Revert => control::revert(state),
            Self::Invalid(_) => control::invalid(state),
            Self::SelfDestruct => environment::self_destruct(state),
        }
    }

    /// Gets the byte representation of the opcode.
    #[must_use]
    pub fn as_byte(&self) -> u8 {
        match *self {
            Self::Stop => 0x00,
            Self::Add => 0x01,
            Self::Mul => 0x02,
            Self::Sub => 0x03,
            Self::Div => 0x04,
            Self::SDiv => 0x05,
            Self::Mod => 0x06,
            Self::SMod => 0x07,
            Self::AddMod => 0x08,
            Self::MulMod => 0x09,
            Self::Exp => 0x0a,
            Self::SignExtend => 0x0b,
            Self::Lt => 0x10,
            Self::Gt => 0x11,
            Self::SLt => 0x12,
            Self::SGt => 0x13,
            Self::Eq => 0x14,
            Self::IsZero => 0x15,
            Self::And => 0x16,
            Self::Or => 0x17,
            Self::Xor => 0x18,
            Self::Not => 0x19,
            Self::Byte => 0x1a,
            Self::Shl => 0x1b,
            Self::Shr => 0x1c,
            Self::Sar => 0x1d,
            Self::Sha3 => 0x20,
            Self::Address => 0x30,
            Self::Balance => 0x31,
            Self::Origin => 0x32,
            Self::Caller => 0x33,
            Self::CallValue => 0x34,
            Self::CallDataLoad => 0x35,
            Self::CallDataSize => 0x36,
            Self::CallDataCopy => 0x37,
            Self::CodeSize => 0x38,
            Self::CodeCopy => 0x39,
            Self::GasPrice => 0x3a,
            Self::ExtCodeSize => 0x3b,
            Self::ExtCodeCopy => 0x3c,
            Self::ReturnDataSize => 0x3d,
            Self::ReturnDataCopy => 0x3e,
            Self::ExtCodeHash => 0x3f,
            Self::BlockHash => 0x40,
            Self::Coinbase => 0x41,
            Self::Timestamp => 0x42,
            Self::Number => 0x43,
            Self::Prevrandao => 0x44,
            Self::GasLimit => 0x45,
            Self::ChainId => 0x46,
            Self::SelfBalance => 0x47,
            Self::BaseFee => 0x48,
            Self::BlobHash => 0x49,
            Self::BlobBaseFee => 0x4a,
            Self::Pop => 0x50,
            Self::MLoad => 0x51,
            Self::MStore => 0x52,
            Self::MStore8 => 0x53,
            Self::SLoad => 0x54,
            Self::SStore => 0x55,
            Self::Jump => 0x56,
            Self::JumpI => 0x57,
            Self::Pc => 0x58,
            Self::MSize => 0x59,
            Self::Gas => 0x5a,
            Self::JumpDest => 0x5b,
            Self::TLoad => 0x5c,
            Self::TStore => 0x5d,
            Self::MCopy => 0x5e,
            Self::Push0 => 0x5f,
            Self::Push { size, .. } => PUSH_OPCODE_BASE_VALUE + size,
            Self::Dup(n) => DUP_OPCODE_BASE_VALUE + n,
            Self::Swap(n) => SWAP_OPCODE_BASE_VALUE + n,
            Self::Log(n) => LOG_OPCODE_BASE_VALUE + n,
            Self::Create => 0xf0,
            Self::Call => 0xf1,
            Self::CallCode => 0xf2,
            Self::Return => 0xf3,
            Self::DelegateCall => 0xf4,
            Self::Create2 => 0xf5,
            Self::StaticCall => 0xfa,
            Self::Revert => 0xfd,
            Self::Invalid(byte) => byte,
            Self::SelfDestruct => 0xff,
        }
    }

    /// Gets a textual representation of the opcode, as used by node step
    /// tracers.
    #[must_use]
    pub fn as_text_code(&self) -> String {
        let text = match *self {
            Self::Stop => "STOP",
            Self::Add => "ADD",
            Self::Mul => "MUL",
            Self::Sub => "SUB",
            Self::Div => "DIV",
            Self::SDiv => "SDIV",
            Self::Mod => "MOD",
            Self::SMod => "SMOD",
            Self::AddMod => "ADDMOD",
            Self::MulMod => "MULMOD",
            Self::Exp => "EXP",
            Self::SignExtend => "SIGNEXTEND",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::SLt => "SLT",
            Self::SGt => "SGT",
            Self::Eq => "EQ",
            Self::IsZero => "ISZERO",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Byte => "BYTE",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Sar => "SAR",
            Self::Sha3 => "SHA3",
            Self::Address => "ADDRESS",
            Self::Balance => "BALANCE",
            Self::Origin => "ORIGIN",
            Self::Caller => "CALLER",
            Self::CallValue => "CALLVALUE",
            Self::CallDataLoad => "CALLDATALOAD",
            Self::CallDataSize => "CALLDATASIZE",
            Self::CallDataCopy => "CALLDATACOPY",
            Self::CodeSize => "CODESIZE",
            Self::CodeCopy => "CODECOPY",
            Self::GasPrice => "GASPRICE",
            Self::ExtCodeSize => "EXTCODESIZE",
            Self::ExtCodeCopy => "EXTCODECOPY",
            Self::ReturnDataSize => "RETURNDATASIZE",
            Self::ReturnDataCopy => "RETURNDATACOPY",
            Self::ExtCodeHash => "EXTCODEHASH",
            Self::BlockHash => "BLOCKHASH",
            Self::Coinbase => "COINBASE",
            Self::Timestamp => "TIMESTAMP",
            Self::Number => "NUMBER",
            Self::Prevrandao => "PREVRANDAO",
            Self::GasLimit => "GASLIMIT",
            Self::ChainId => "CHAINID",
            Self::SelfBalance => "SELFBALANCE",
            Self::BaseFee => "BASEFEE",
            Self::BlobHash => "BLOBHASH",
            Self::BlobBaseFee => "BLOBBASEFEE",
            Self::Pop => "POP",
            Self::MLoad => "MLOAD",
            Self::MStore => "MSTORE",
            Self::MStore8 => "MSTORE8",
            Self::SLoad => "SLOAD",
            Self::SStore => "SSTORE",
            Self::Jump => "JUMP",
            Self::JumpI => "JUMPI",
            Self::Pc => "PC",
            Self::MSize => "MSIZE",
            Self::Gas => "GAS",
            Self::JumpDest => "JUMPDEST",
            Self::TLoad => "TLOAD",
            Self::TStore => "TSTORE",
            Self::MCopy => "MCOPY",
            Self::Push0 => "PUSH0",
            Self::Push { size, .. } => return format!("PUSH{size}"),
            Self::Dup(n) => return format!("DUP{n}"),
            Self::Swap(n) => return format!("SWAP{n}"),
            Self::Log(n) => return format!("LOG{n}"),
            Self::Create => "CREATE",
            Self::Call => "CALL",
            Self::CallCode => "CALLCODE",
            Self::Return => "RETURN",
            Self::DelegateCall => "DELEGATECALL",
            Self::Create2 => "CREATE2",
            Self::StaticCall => "STATICCALL",
            Self::Revert => "REVERT",
            Self::Invalid(_) => "INVALID",
            Self::SelfDestruct => "SELFDESTRUCT",
        };

        text.into()
    }

    /// Gets the number of arguments that the opcode takes from the stack.
    #[must_use]
    pub fn arg_count(&self) -> usize {
        match *self {
            Self::Stop
            | Self::Address
            | Self::Origin
            | Self::Caller
            | Self::CallValue
            | Self::CallDataSize
            | Self::CodeSize
            | Self::GasPrice
            | Self::ReturnDataSize
            | Self::Coinbase
            | Self::Timestamp
            | Self::Number
            | Self::Prevrandao
            | Self::GasLimit
            | Self::ChainId
            | Self::SelfBalance
            | Self::BaseFee
            | Self::BlobBaseFee
            | Self::Pc
            | Self::MSize
            | Self::Gas
            | Self::JumpDest
            | Self::Push0
            | Self::Push { .. }
            | Self::Invalid(_) => 0,
            Self::IsZero
            | Self::Not
            | Self::Balance
            | Self::CallDataLoad
            | Self::ExtCodeSize
            | Self::ExtCodeHash
            | Self::BlockHash
            | Self::BlobHash
            | Self::Pop
            | Self::MLoad
            | Self::SLoad
            | Self::Jump
            | Self::TLoad
            | Self::SelfDestruct => 1,
            Self::Add
            | Self::Mul
            | Self::Sub
            | Self::Div
            | Self::SDiv
            | Self::Mod
            | Self::SMod
            | Self::Exp
            | Self::SignExtend
            | Self::Lt
            | Self::Gt
            | Self::SLt
            | Self::SGt
            | Self::Eq
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::Byte
            | Self::Shl
            | Self::Shr
            | Self::Sar
            | Self::Sha3
            | Self::MStore
            | Self::MStore8
            | Self::SStore
            | Self::JumpI
            | Self::TStore
            | Self::Return
            | Self::Revert => 2,
            Self::AddMod
            | Self::MulMod
            | Self::CallDataCopy
            | Self::CodeCopy
            | Self::ReturnDataCopy
            | Self::MCopy
            | Self::Create => 3,
            Self::ExtCodeCopy | Self::Create2 => 4,
            Self::DelegateCall | Self::StaticCall => 6,
            Self::Call | Self::CallCode => 7,
            Self::Dup(n) => usize::from(n),
            Self::Swap(n) => usize::from(n) + 1,
            Self::Log(n) => usize::from(n) + 2,
        }
    }

    /// Gets the number of bytes of immediate data the instruction carries.
    #[must_use]
    pub fn immediate_size(&self) -> usize {
        match *self {
            Self::Push { size, .. } => usize::from(size),
            _ => 0,
        }
    }

    /// Gets the minimum amount of gas the opcode can consume, assuming warm
    /// accounts and slots, no memory expansion and no value transfer.
    #[must_use]
    pub fn min_gas_cost(&self) -> usize {
        match *self {
            Self::Stop | Self::Return | Self::Revert | Self::Invalid(_) => 0,
            Self::JumpDest => 1,
            Self::Address
            | Self::Origin
            | Self::Caller
            | Self::CallValue
            | Self::CallDataSize
            | Self::CodeSize
            | Self::GasPrice
            | Self::ReturnDataSize
            | Self::Coinbase
            | Self::Timestamp
            | Self::Number
            | Self::Prevrandao
            | Self::GasLimit
            | Self::ChainId
            | Self::BaseFee
            | Self::BlobBaseFee
            | Self::Pop
            | Self::Pc
            | Self::MSize
            | Self::Gas
            | Self::Push0 => 2,
            Self::Add
            | Self::Sub
            | Self::Lt
            | Self::Gt
            | Self::SLt
            | Self::SGt
            | Self::Eq
            | Self::IsZero
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::Not
            | Self::Byte
            | Self::Shl
            | Self::Shr
            | Self::Sar
            | Self::CallDataLoad
            | Self::CallDataCopy
            | Self::CodeCopy
            | Self::ReturnDataCopy
            | Self::BlobHash
            | Self::MLoad
            | Self::MStore
            | Self::MStore8
            | Self::MCopy
            | Self::Push { .. }
            | Self::Dup(_)
            | Self::Swap(_) => 3,
            Self::Mul
            | Self::Div
            | Self::SDiv
            | Self::Mod
            | Self::SMod
            | Self::SignExtend
            | Self::SelfBalance => 5,
            Self::AddMod | Self::MulMod | Self::Jump => 8,
            Self::Exp | Self::JumpI => 10,
            Self::BlockHash => 20,
            Self::Sha3 => 30,
            Self::Balance
            | Self::ExtCodeSize
            | Self::ExtCodeCopy
            | Self::ExtCodeHash
            | Self::SLoad
            | Self::SStore
            | Self::TLoad
            | Self::TStore
            | Self::Call
            | Self::CallCode
            | Self::DelegateCall
            | Self::StaticCall => 100,
            Self::Log(n) => 375 + 375 * usize::from(n),
            Self::SelfDestruct => 5000,
            Self::Create | Self::Create2 => 32000,
        }
    }

    /// Checks if the opcode is one of the message calls that enter a new call
    /// frame running another account's code.
    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(
            self,
            Self::Call | Self::CallCode | Self::DelegateCall | Self::StaticCall
        )
    }

    /// Encodes the instruction as bytes, including any immediate data.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![self.as_byte()];
        if let Self::Push { size, value } = self {
            let data = value.to_be_bytes();
            bytes.extend_from_slice(&data[WORD_SIZE_BYTES - usize::from(*size)..]);
        }
        bytes
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push { value, .. } => write!(f, "{} {value}", self.as_text_code()),
            Self::Invalid(byte) => write!(f, "INVALID({byte:#04x})"),
            _ => write!(f, "{}", self.as_text_code()),
        }
    }
}

/// Checks that `n` is a valid index for the `DUP` and `SWAP` families.
fn check_stack_item(n: u8, name: &str) -> std::result::Result<(), disassembly::Error> {
    if !(1..=DUP_SWAP_MAX_DEPTH).contains(&n) {
        return Err(disassembly::Error::InvalidStackItem {
            item: n,
            name: name.into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{
        error::execution::Error,
        opcode::{Flow, Halt, Opcode},
        vm::{state::MachineState, value::Word},
    };

    #[test]
    fn every_byte_decodes_to_an_opcode_with_that_byte() {
        for byte in 0..=u8::MAX {
            let immediate = vec![0xab; Opcode::immediate_size_of(byte)];
            let opcode = Opcode::decode(byte, &immediate).expect("Byte did not decode");

            assert_eq!(opcode.as_byte(), byte, "Mismatch for {byte:#04x}");
            assert_eq!(opcode.immediate_size(), immediate.len());
        }
    }

    #[test]
    fn assigned_opcodes_are_counted() {
        let assigned = (0..=u8::MAX)
            .filter_map(|byte| Opcode::decode(byte, &vec![0; Opcode::immediate_size_of(byte)]))
            .filter(|opcode| !matches!(opcode, Opcode::Invalid(_)))
            .count();

        // 0xfe is the designated `INVALID` instruction, so it is not counted.
        assert_eq!(assigned, 148);
    }

    #[test]
    fn decoding_requires_exact_immediate() {
        assert_eq!(Opcode::decode(0x61, &[0x01]), None);
        assert_eq!(Opcode::decode(0x01, &[0x01]), None);
        assert_eq!(
            Opcode::decode(0x61, &[0x01, 0x02]),
            Some(Opcode::Push {
                size:  2,
                value: 0x0102usize.into(),
            })
        );
    }

    #[test]
    fn constructors_check_ranges() -> anyhow::Result<()> {
        assert_eq!(Opcode::dup(16)?, Opcode::Dup(16));
        Opcode::dup(0).expect_err("Constructed DUP0");
        Opcode::swap(17).expect_err("Constructed SWAP17");
        Opcode::log(5).expect_err("Constructed LOG5");
        Opcode::push(&[]).expect_err("Constructed an empty PUSH");
        Opcode::push(&[0; 33]).expect_err("Constructed PUSH33");

        Ok(())
    }

    #[test]
    fn encodes_push_data_with_leading_zeroes() -> anyhow::Result<()> {
        let push = Opcode::push(&[0x00, 0x80])?;

        assert_eq!(push.encode(), vec![0x61, 0x00, 0x80]);
        assert_eq!(push.as_text_code(), "PUSH2");
        assert_eq!(push.to_string(), "PUSH2 0x80");

        Ok(())
    }

    #[test]
    fn reports_metadata() {
        assert_eq!(Opcode::Call.arg_count(), 7);
        assert_eq!(Opcode::Swap(3).arg_count(), 4);
        assert_eq!(Opcode::Log(2).arg_count(), 4);
        assert_eq!(Opcode::Log(2).min_gas_cost(), 1125);
        assert_eq!(Opcode::Dup(5).as_text_code(), "DUP5");
        assert!(Opcode::StaticCall.is_call());
        assert!(!Opcode::Create.is_call());
    }

    #[test]
    fn underflow_leaves_state_unchanged() {
        let mut state = MachineState::with_stack([Word::from(1usize)]);
        state.set_pc(7);
        let before = state.clone();

        let error = Opcode::Add
            .execute(0x10, &mut state)
            .expect_err("Executed ADD with one operand");

        assert_eq!(error.location, 0x10);
        assert_eq!(
            error.payload,
            Error::StackUnderflow {
                required:  2,
                available: 1,
            }
        );
        assert_eq!(state, before);
    }

    #[test]
    fn executors_take_exactly_their_argument_count() -> anyhow::Result<()> {
        for byte in 0..=u8::MAX {
            let immediate = vec![0; Opcode::immediate_size_of(byte)];
            let opcode = Opcode::decode(byte, &immediate).expect("Byte did not decode");
            let arg_count = opcode.arg_count();

            let mut state = MachineState::with_stack(vec![Word::zero(); arg_count]);
            opcode.execute(0, &mut state)?;

            if arg_count == 0 {
                continue;
            }
            let mut state = MachineState::with_stack(vec![Word::zero(); arg_count - 1]);
            let before = state.clone();
            let error = opcode
                .execute(0, &mut state)
                .expect_err("Executed with a missing operand");

            assert_eq!(
                error.payload,
                Error::StackUnderflow {
                    required:  arg_count,
                    available: arg_count - 1,
                },
                "Mismatch for {opcode}"
            );
            assert_eq!(state, before, "{opcode} changed the state on underflow");
        }

        Ok(())
    }

    #[test]
    fn moves_program_counter_past_immediate() -> anyhow::Result<()> {
        let mut state = MachineState::default();
        let flow = Opcode::push(&[0x01, 0x02, 0x03])?.execute(4, &mut state)?;

        assert_eq!(flow, Flow::Continue);
        assert_eq!(state.pc(), 8);
        assert_eq!(state.stack().read(0)?, &Word::from(0x01_0203usize));

        Ok(())
    }

    #[test]
    fn halts_leave_program_counter_in_place() -> anyhow::Result<()> {
        let mut state = MachineState::default();
        state.set_pc(3);

        assert_eq!(
            Opcode::Invalid(0xfe).execute(3, &mut state)?,
            Flow::Halt(Halt::Invalid)
        );
        assert_eq!(state.pc(), 3);

        Ok(())
    }
}
