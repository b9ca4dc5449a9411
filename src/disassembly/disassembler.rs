//! This module contains the parser definition for turning a stream of bytes
//! into the [`Instruction`]s of an [`super::InstructionStream`].

use crate::{disassembly::Instruction, opcode::Opcode};

/// Disassembles the input `bytes` into a sequence of [`Instruction`]s, each
/// recording the byte offset at which it starts.
///
/// # CBOR Metadata
///
/// The disassembly process copes with CBOR metadata by recognising that it will
/// be unreachable during execution unless execution wants to revert as an
/// invalid opcode. To this end, any byte that is unassigned at the time of
/// disassembly is translated to [`Opcode::Invalid`], and hence will halt
/// execution if ever actually executed.
///
/// # Truncated Pushes
///
/// A `PUSHn` near the end of the code may claim more immediate bytes than
/// remain. It can never execute, so it and each of its trailing bytes are
/// translated to [`Opcode::Invalid`]. This keeps the correspondence between
/// instructions and bytes, so that re-encoding yields the input.
#[must_use]
pub fn disassemble(bytes: &[u8]) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(bytes.len());
    let mut offset = 0;

    while let Some(&byte) = bytes.get(offset) {
        let immediate_size = Opcode::immediate_size_of(byte);
        let immediate = bytes.get(offset + 1..offset + 1 + immediate_size);

        match immediate.and_then(|immediate| Opcode::decode(byte, immediate)) {
            Some(opcode) => {
                instructions.push(Instruction { offset, opcode });
                offset += 1 + immediate_size;
            }
            None => {
                tracing::trace!(offset, "Truncated push at the end of the code");
                for (index, &byte) in bytes[offset..].iter().enumerate() {
                    instructions.push(Instruction {
                        offset: offset + index,
                        opcode: Opcode::Invalid(byte),
                    });
                }
                break;
            }
        }
    }

    instructions
}
