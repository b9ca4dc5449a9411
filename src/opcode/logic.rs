//! Opcodes that perform comparison and bitwise logic operations on the EVM.

use crate::{
    opcode::{
        util::{binary, unary},
        ExecuteResult,
    },
    vm::{state::MachineState, value::known::KnownWord},
};

/// The `LT` opcode performs a less-than comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output                       |
/// | :---------: | :---: | :--------------------------: |
/// | 1           | `a`   | `if a < b then 1 else 0`     |
/// | 2           | `b`   |                              |
pub fn lt(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::lt)
}

/// The `GT` opcode performs a greater-than comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output                       |
/// | :---------: | :---: | :--------------------------: |
/// | 1           | `a`   | `if a > b then 1 else 0`     |
/// | 2           | `b`   |                              |
pub fn gt(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::gt)
}

/// The `SLT` opcode performs a signed less-than comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output                       |
/// | :---------: | :---: | :--------------------------: |
/// | 1           | `a`   | `if a < b then 1 else 0`     |
/// | 2           | `b`   |                              |
pub fn slt(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::signed_lt)
}

/// The `SGT` opcode performs a signed greater-than comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output                       |
/// | :---------: | :---: | :--------------------------: |
/// | 1           | `a`   | `if a > b then 1 else 0`     |
/// | 2           | `b`   |                              |
pub fn sgt(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::signed_gt)
}

/// The `EQ` opcode performs an equality comparison.
///
/// # Semantics
///
/// | Stack Index | Input | Output                       |
/// | :---------: | :---: | :--------------------------: |
/// | 1           | `a`   | `if a == b then 1 else 0`    |
/// | 2           | `b`   |                              |
pub fn eq(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::equals)
}

/// The `ISZERO` opcode checks if the input is zero.
///
/// # Semantics
///
/// | Stack Index | Input | Output                       |
/// | :---------: | :---: | :--------------------------: |
/// | 1           | `a`   | `if a == 0 then 1 else 0`    |
pub fn is_zero(state: &mut MachineState) -> ExecuteResult {
    unary(state, KnownWord::is_zero)
}

/// The `AND` opcode performs bitwise conjunction.
///
/// # Semantics
///
/// | Stack Index | Input | Output    |
/// | :---------: | :---: | :-------: |
/// | 1           | `a`   | `a & b`   |
/// | 2           | `b`   |           |
pub fn and(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a & b)
}

/// The `OR` opcode performs bitwise disjunction.
///
/// # Semantics
///
/// | Stack Index | Input | Output    |
/// | :---------: | :---: | :-------: |
/// | 1           | `a`   | `a \| b`  |
/// | 2           | `b`   |           |
pub fn or(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a | b)
}

/// The `XOR` opcode performs bitwise exclusive disjunction.
///
/// # Semantics
///
/// | Stack Index | Input | Output    |
/// | :---------: | :---: | :-------: |
/// | 1           | `a`   | `a ^ b`   |
/// | 2           | `b`   |           |
pub fn xor(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a ^ b)
}

/// The `NOT` opcode performs bitwise negation.
///
/// # Semantics
///
/// | Stack Index | Input | Output |
/// | :---------: | :---: | :----: |
/// | 1           | `a`   | `~a`   |
pub fn not(state: &mut MachineState) -> ExecuteResult {
    unary(state, |a| !a)
}

/// The `BYTE` opcode retrieves a single byte from a word.
///
/// # Semantics
///
/// | Stack Index | Input | Output                                   |
/// | :---------: | :---: | :--------------------------------------: |
/// | 1           | `i`   | `(x >> (248 - i * 8)) & 0xff`, or 0      |
/// | 2           | `x`   |                                          |
///
/// Byte 0 is the most significant byte, and indices past 31 yield zero.
pub fn byte(state: &mut MachineState) -> ExecuteResult {
    binary(state, |i, x| x.byte(i))
}

/// The `SHL` opcode performs a left shift.
///
/// # Semantics
///
/// | Stack Index | Input   | Output                       |
/// | :---------: | :-----: | :--------------------------: |
/// | 1           | `shift` | `(value << shift) % 2**256`  |
/// | 2           | `value` |                              |
pub fn shl(state: &mut MachineState) -> ExecuteResult {
    binary(state, |shift, value| value << shift)
}

/// The `SHR` opcode performs a logical right shift.
///
/// # Semantics
///
/// | Stack Index | Input   | Output             |
/// | :---------: | :-----: | :----------------: |
/// | 1           | `shift` | `value >> shift`   |
/// | 2           | `value` |                    |
pub fn shr(state: &mut MachineState) -> ExecuteResult {
    binary(state, |shift, value| value >> shift)
}

/// The `SAR` opcode performs an arithmetic right shift, preserving the sign.
///
/// # Semantics
///
/// | Stack Index | Input   | Output             |
/// | :---------: | :-----: | :----------------: |
/// | 1           | `shift` | `value >> shift`   |
/// | 2           | `value` |                    |
pub fn sar(state: &mut MachineState) -> ExecuteResult {
    binary(state, |shift, value| value.sar(shift))
}
