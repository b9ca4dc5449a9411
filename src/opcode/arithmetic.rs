//! Opcodes that perform arithmetic operations on the EVM.
//!
//! Each of these fails only if there are not enough operands on the stack. A
//! symbolic operand makes the result [`crate::vm::value::Symbol::Unknown`].

use crate::{
    opcode::{
        util::{binary, ternary},
        ExecuteResult,
    },
    vm::{state::MachineState, value::known::KnownWord},
};

/// The `ADD` opcode performs addition.
///
/// # Semantics
///
/// | Stack Index | Input | Output             |
/// | :---------: | :---: | :----------------: |
/// | 1           | `a`   | `(a + b) % 2**256` |
/// | 2           | `b`   |                    |
pub fn add(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a + b)
}

/// The `MUL` opcode performs multiplication.
///
/// # Semantics
///
/// | Stack Index | Input | Output             |
/// | :---------: | :---: | :----------------: |
/// | 1           | `a`   | `(a * b) % 2**256` |
/// | 2           | `b`   |                    |
pub fn mul(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a * b)
}

/// The `SUB` opcode performs subtraction.
///
/// # Semantics
///
/// | Stack Index | Input | Output             |
/// | :---------: | :---: | :----------------: |
/// | 1           | `a`   | `(a - b) % 2**256` |
/// | 2           | `b`   |                    |
pub fn sub(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a - b)
}

/// The `DIV` opcode performs integer division.
///
/// # Semantics
///
/// | Stack Index | Input | Output                           |
/// | :---------: | :---: | :------------------------------: |
/// | 1           | `a`   | `if b == 0 then 0 else (a // b)` |
/// | 2           | `b`   |                                  |
pub fn div(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a / b)
}

/// The `SDIV` opcode performs signed integer division.
///
/// Both operands and the result are treated as two's complement signed 256-bit
/// integers.
///
/// # Semantics
///
/// | Stack Index | Input | Output                           |
/// | :---------: | :---: | :------------------------------: |
/// | 1           | `a`   | `if b == 0 then 0 else (a // b)` |
/// | 2           | `b`   |                                  |
pub fn sdiv(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::signed_div)
}

/// The `MOD` opcode performs integer modulo.
///
/// # Semantics
///
/// | Stack Index | Input | Output                          |
/// | :---------: | :---: | :-----------------------------: |
/// | 1           | `a`   | `if b == 0 then 0 else (a % b)` |
/// | 2           | `b`   |                                 |
pub fn rem(state: &mut MachineState) -> ExecuteResult {
    binary(state, |a, b| a % b)
}

/// The `SMOD` opcode performs signed integer modulo.
///
/// Both operands and the result are treated as two's complement signed 256-bit
/// integers.
///
/// # Semantics
///
/// | Stack Index | Input | Output                          |
/// | :---------: | :---: | :-----------------------------: |
/// | 1           | `a`   | `if b == 0 then 0 else (a % b)` |
/// | 2           | `b`   |                                 |
pub fn srem(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::signed_rem)
}

/// The `ADDMOD` opcode performs addition followed by modulo.
///
/// # Note
///
/// All intermediate values of this calculation **are not** computed modulo
/// 2**256.
///
/// # Semantics
///
/// | Stack Index | Input | Output                              |
/// | :---------: | :---: | :---------------------------------: |
/// | 1           | `a`   | `if N == 0 then 0 else (a + b) % N` |
/// | 2           | `b`   |                                     |
/// | 3           | `N`   |                                     |
pub fn add_mod(state: &mut MachineState) -> ExecuteResult {
    ternary(state, KnownWord::add_mod)
}

/// The `MULMOD` opcode performs multiplication followed by modulo.
///
/// # Note
///
/// All intermediate values of this calculation **are not** computed modulo
/// 2**256.
///
/// # Semantics
///
/// | Stack Index | Input | Output                              |
/// | :---------: | :---: | :---------------------------------: |
/// | 1           | `a`   | `if N == 0 then 0 else (a * b) % N` |
/// | 2           | `b`   |                                     |
/// | 3           | `N`   |                                     |
pub fn mul_mod(state: &mut MachineState) -> ExecuteResult {
    ternary(state, KnownWord::mul_mod)
}

/// The `EXP` opcode performs exponentiation.
///
/// # Semantics
///
/// | Stack Index | Input      | Output                        |
/// | :---------: | :--------: | :---------------------------: |
/// | 1           | `a`        | `(a ** exponent) % 2**256`    |
/// | 2           | `exponent` |                               |
pub fn exp(state: &mut MachineState) -> ExecuteResult {
    binary(state, KnownWord::exp)
}

/// The `SIGNEXTEND` opcode extends the length of a two's complement signed
/// integer.
///
/// # Semantics
///
/// | Stack Index | Input | Output                                    |
/// | :---------: | :---: | :---------------------------------------: |
/// | 1           | `b`   | `x` sign-extended from `(b + 1) * 8` bits |
/// | 2           | `x`   |                                           |
pub fn sign_extend(state: &mut MachineState) -> ExecuteResult {
    binary(state, |b, x| x.sign_extend(b))
}
