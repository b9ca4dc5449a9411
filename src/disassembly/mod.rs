//! This module contains the implementation of the [`InstructionStream`], a type
//! that represents a sequence of bytecode instructions, along with a simple
//! analysis pass that runs the opcode executors over it.

mod disassembler;

use std::rc::Rc;

use hex::FromHexError;

pub use crate::disassembly::disassembler::disassemble;
use crate::{
    error::{
        container::Locatable,
        disassembly::{self, Error},
        execution,
    },
    opcode::{Flow, Halt, Opcode},
    vm::state::MachineState,
};

/// A single decoded instruction, along with the byte offset in the code at
/// which it starts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub offset: usize,
    pub opcode: Opcode,
}

/// The instruction stream is a representation of a sequence of [`Opcode`]s that
/// implements some program.
///
/// # Stream Validity
///
/// This `InstructionStream` is a pure representation of the sequence of
/// instructions and performs no validation that the instruction stream is a
/// valid one. It is _perfectly_ possible, and allowable, to construct an
/// instruction stream containing invalid instructions. Empty code is an empty
/// stream.
///
/// # Byte-Instruction Correspondence
///
/// Every instruction knows the offset of its first byte, and re-encoding the
/// stream always yields the bytes it was disassembled from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstructionStream {
    /// The sequence of instructions, ordered by offset.
    instructions: Rc<Vec<Instruction>>,
}

impl InstructionStream {
    /// Gets the number of instructions in the stream.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Checks if the stream holds no instructions, as for empty code.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Gets the instructions in the stream, ordered by offset.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Gets the instruction that starts at byte `offset`, if there is one.
    ///
    /// Offsets that fall within the immediate data of a `PUSHn` have no
    /// instruction.
    #[must_use]
    pub fn at(&self, offset: usize) -> Option<&Instruction> {
        self.instructions
            .binary_search_by_key(&offset, |instruction| instruction.offset)
            .ok()
            .map(|index| &self.instructions[index])
    }

    /// Converts the instructions in the instruction stream to their
    /// corresponding bytecode.
    ///
    /// This should always result in the same bytecode as the input to the
    /// disassembly process.
    #[must_use]
    pub fn as_bytecode(&self) -> Vec<u8> {
        self.instructions
            .iter()
            .flat_map(|instruction| instruction.opcode.encode())
            .collect()
    }
}

/// An [`InstructionStream`] is usually created from a byte array of bytecode.
impl From<&[u8]> for InstructionStream {
    fn from(value: &[u8]) -> Self {
        let instructions = Rc::new(disassemble(value));
        Self { instructions }
    }
}

/// An [`InstructionStream`] can be created from a string as long as that string
/// is a hexadecimal encoding of the equivalent bytes, optionally prefixed with
/// `0x`.
///
/// Error locations are character indices into `value`.
impl TryFrom<&str> for InstructionStream {
    type Error = disassembly::LocatedError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let (prefix_len, digits) = match value.strip_prefix("0x") {
            Some(digits) => (2, digits),
            None => (0, value),
        };

        let bytes = hex::decode(digits).map_err(|e| match e {
            FromHexError::InvalidHexCharacter { c, index } => {
                Error::InvalidHexCharacter(c, index + prefix_len).locate(index + prefix_len)
            }
            _ => Error::InvalidHexLength.locate(value.len()),
        })?;

        Ok(Self::from(bytes.as_slice()))
    }
}

/// Allows converting the [`InstructionStream`] back to the corresponding
/// bytecode representation.
impl From<InstructionStream> for Vec<u8> {
    fn from(value: InstructionStream) -> Self {
        value.as_bytecode()
    }
}

/// Where a run of [`execute_linear`] came to an end.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// An instruction halted the frame.
    Halted { offset: usize, halt: Halt },

    /// Execution ran past the last instruction, which the EVM treats as `STOP`.
    EndOfCode,

    /// An instruction made a control-flow decision that a straight-line pass
    /// cannot follow.
    Diverged { offset: usize, flow: Flow },
}

/// Runs the executors over `stream` in order, starting from the program counter
/// in `state`.
///
/// This is a straight-line analysis pass. Only forward jumps whose target is a
/// `JUMPDEST` are followed, which guarantees that the pass terminates. Any other
/// jump, and any fork or jump to an unknown destination, ends the run.
///
/// # Errors
///
/// If an executor underflows the stack, located at that instruction's offset.
pub fn execute_linear(
    stream: &InstructionStream,
    state: &mut MachineState,
) -> execution::Result<Outcome> {
    loop {
        let offset = state.pc();
        let Some(instruction) = stream.at(offset) else {
            return Ok(Outcome::EndOfCode);
        };

        match instruction.opcode.execute(offset, state)? {
            Flow::Continue => {}
            Flow::Halt(halt) => return Ok(Outcome::Halted { offset, halt }),
            flow @ Flow::Jump(target) => {
                let lands_on_dest = stream
                    .at(target)
                    .is_some_and(|target| target.opcode == Opcode::JumpDest);
                if target <= offset || !lands_on_dest {
                    tracing::trace!(offset, target, "Linear pass stopped at a jump");
                    state.set_pc(offset);
                    return Ok(Outcome::Diverged { offset, flow });
                }
            }
            flow @ (Flow::Fork { .. } | Flow::UnresolvedJump) => {
                state.set_pc(offset);
                return Ok(Outcome::Diverged { offset, flow });
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        bytecode,
        disassembly::{execute_linear, InstructionStream, Outcome},
        error::disassembly,
        opcode::{Flow, Halt, Opcode},
        vm::{
            state::MachineState,
            value::{Symbol, Word},
        },
    };

    #[test]
    fn can_parse_from_hex_stream() -> anyhow::Result<()> {
        let bytes: Vec<u8> = (0..128).map(|_| rand::random()).collect();
        let hex_string = hex::encode(&bytes);

        let stream = InstructionStream::try_from(hex_string.as_str())?;
        let prefixed = InstructionStream::try_from(format!("0x{hex_string}").as_str())?;

        assert_eq!(stream, prefixed);
        let bytecode: Vec<u8> = stream.into();
        assert_eq!(bytecode, bytes);

        Ok(())
    }

    #[test]
    fn empty_code_is_an_empty_stream() -> anyhow::Result<()> {
        assert!(InstructionStream::try_from("0x")?.is_empty());
        assert!(InstructionStream::try_from("")?.is_empty());

        Ok(())
    }

    #[test]
    fn emits_parse_error_on_incorrectly_encoded_hex_string() {
        let result = InstructionStream::try_from("0xab70anx7302842")
            .expect_err("Parsing did not error");

        assert_eq!(result.location, 7);
        assert_eq!(
            result.payload,
            disassembly::Error::InvalidHexCharacter('n', 7)
        );
    }

    #[test]
    fn emits_parse_error_on_hex_string_with_bad_length() {
        let bad_length = "ab21fe9b5";
        let result = InstructionStream::try_from(bad_length).expect_err("Parsing did not error");

        assert_eq!(result.location, bad_length.len());
        assert_eq!(result.payload, disassembly::Error::InvalidHexLength);
    }

    #[test]
    fn finds_instructions_by_offset() -> anyhow::Result<()> {
        let stream = InstructionStream::from(
            bytecode![Opcode::push(&[0x01, 0x02])?, Opcode::Add].as_slice(),
        );

        assert_eq!(stream.len(), 2);
        assert_eq!(stream.at(3).map(|i| i.opcode), Some(Opcode::Add));
        assert!(stream.at(1).is_none());
        assert!(stream.at(4).is_none());

        Ok(())
    }

    #[test]
    fn runs_straight_line_code() -> anyhow::Result<()> {
        let code = bytecode![
            Opcode::push(&[0x02])?,
            Opcode::push(&[0x03])?,
            Opcode::Add,
            Opcode::push(&[0x00])?,
            Opcode::SStore,
            Opcode::Stop,
        ];
        let stream = InstructionStream::from(code.as_slice());
        let mut state = MachineState::default();

        let outcome = execute_linear(&stream, &mut state)?;

        assert_eq!(
            outcome,
            Outcome::Halted {
                offset: 8,
                halt:   Halt::Stop,
            }
        );
        assert_eq!(state.storage().load(Word::zero()), Word::from(5usize));

        Ok(())
    }

    #[test]
    fn running_off_the_end_stops() -> anyhow::Result<()> {
        let stream = InstructionStream::from(bytecode![Opcode::CallValue].as_slice());
        let mut state = MachineState::default();

        assert_eq!(execute_linear(&stream, &mut state)?, Outcome::EndOfCode);
        assert_eq!(
            state.stack().read(0)?,
            &Word::Symbolic(Symbol::CallValue)
        );

        Ok(())
    }

    #[test]
    fn follows_forward_jumps_to_jump_dests() -> anyhow::Result<()> {
        let code = bytecode![
            Opcode::push(&[0x04])?,
            Opcode::Jump,
            Opcode::Invalid(0xfe),
            Opcode::JumpDest,
            Opcode::Stop,
        ];
        let stream = InstructionStream::from(code.as_slice());
        let mut state = MachineState::default();

        assert_eq!(
            execute_linear(&stream, &mut state)?,
            Outcome::Halted {
                offset: 5,
                halt:   Halt::Stop,
            }
        );

        Ok(())
    }

    #[test]
    fn stops_at_forks_and_backward_jumps() -> anyhow::Result<()> {
        let fork = bytecode![
            Opcode::CallValue,
            Opcode::push(&[0x05])?,
            Opcode::JumpI,
            Opcode::JumpDest,
        ];
        let stream = InstructionStream::from(fork.as_slice());
        let mut state = MachineState::default();
        assert_eq!(
            execute_linear(&stream, &mut state)?,
            Outcome::Diverged {
                offset: 3,
                flow:   Flow::Fork {
                    taken:     5,
                    not_taken: 4,
                },
            }
        );
        assert_eq!(state.pc(), 3);

        let lp = bytecode![Opcode::JumpDest, Opcode::push(&[0x00])?, Opcode::Jump];
        let stream = InstructionStream::from(lp.as_slice());
        let mut state = MachineState::default();
        assert_eq!(
            execute_linear(&stream, &mut state)?,
            Outcome::Diverged {
                offset: 3,
                flow:   Flow::Jump(0),
            }
        );

        Ok(())
    }

    #[test]
    fn reports_underflow_at_the_instruction() {
        let stream = InstructionStream::from(bytecode![Opcode::JumpDest, Opcode::Pop].as_slice());
        let mut state = MachineState::default();

        let error = execute_linear(&stream, &mut state).expect_err("POP ran on an empty stack");
        assert_eq!(error.location, 1);
    }
}
