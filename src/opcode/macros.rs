//! This module contains useful macros for working with bytecode and opcodes.

/// Constructs a bytecode input from the input instructions as literal opcodes.
///
/// # Usage
///
/// ```
/// use call_frame_extractor::{bytecode, opcode::Opcode};
///
/// let bytes = bytecode![
///     Opcode::push(&[0x04]).unwrap(),
///     Opcode::Jump,
///     Opcode::JumpDest,
///     Opcode::Stop,
/// ];
///
/// assert_eq!(bytes, vec![0x60, 0x04, 0x56, 0x5b, 0x00]);
/// ```
#[macro_export]
macro_rules! bytecode {
    ($($opcode:expr),*$(,)?) => {{
        let mut vec: Vec<u8> = vec![];
        $(vec.extend($crate::opcode::Opcode::encode(&$opcode));)*
        vec
    }};
}

// Export it scoped
pub use bytecode;

#[cfg(test)]
mod test {
    use crate::opcode::Opcode;

    #[test]
    fn concatenates_encoded_instructions() -> anyhow::Result<()> {
        let bytes = bytecode![
            Opcode::push(&[0x12, 0x34])?,
            Opcode::Dup(1),
            Opcode::Invalid(0xfe),
        ];

        assert_eq!(bytes, vec![0x61, 0x12, 0x34, 0x80, 0xfe]);
        assert!(bytecode![].is_empty());

        Ok(())
    }
}
