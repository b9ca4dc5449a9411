//! This module contains constants that are needed throughout the codebase.

/// The maximum size that a contract can have when being deployed on the
/// blockchain.
///
/// This is specified in [EIP-170](https://eips.ethereum.org/EIPS/eip-170).
pub const CONTRACT_MAXIMUM_SIZE_BYTES: usize = 24_576;

/// The maximum size that memory can be within the block gas limit.
///
/// Obtained by solving:
///
/// ```text
/// 3 * a + (a^2 / 512) = 30,000,000
/// ```
pub const MAX_MEMORY_SIZE_WORDS: usize = 123_170;

/// The maximum memory size within the block limit in bytes.
pub const MAX_MEMORY_SIZE_BYTES: usize = MAX_MEMORY_SIZE_WORDS * WORD_SIZE_BYTES;

/// The maximum amount of data that will be copied in a single memory operation
/// before the copy is treated as clobbering memory instead.
pub const DEFAULT_MEMORY_SINGLE_OPERATION_MAX_BYTES: usize = CONTRACT_MAXIMUM_SIZE_BYTES * 4;

/// The base byte value for the `PUSH` opcode, for `N > 0`.
///
/// This is constructed such that for `PUSHN`, `PUSH_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `PUSH` opcode.
pub const PUSH_OPCODE_BASE_VALUE: u8 = 0x5f;

/// The base byte value for the `DUP` opcode.
///
/// This is constructed such that for `DUPN`, `DUP_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `DUP` opcode.
pub const DUP_OPCODE_BASE_VALUE: u8 = 0x7f;

/// The base byte value for the `SWAP` opcode.
///
/// This is constructed such that for `SWAPN`, `SWAP_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `SWAP` opcode.
pub const SWAP_OPCODE_BASE_VALUE: u8 = 0x8f;

/// The base byte value for the `LOG` opcode.
///
/// This is constructed such that for `LOGN`, `LOG_OPCODE_BASE_VALUE` + `N`
/// equals the byte value for the corresponding `LOG` opcode.
pub const LOG_OPCODE_BASE_VALUE: u8 = 0xa0;

/// The maximum number of bytes that can be pushed at once using the `PUSH`
/// opcode.
pub const PUSH_OPCODE_MAX_BYTES: u8 = 32;

/// The maximum number of stack items that `DUP` and `SWAP` can reach past the
/// top of the stack.
pub const DUP_SWAP_MAX_DEPTH: u8 = 16;

/// The maximum number of topics accepted by the `LOG` opcode.
pub const LOG_MAX_TOPICS: u8 = 4;

/// The width of word on the EVM in bits.
pub const WORD_SIZE_BITS: usize = 256;

/// The width of a byte on the EVM (and most other places) in bits.
pub const BYTE_SIZE_BITS: usize = 8;

/// The width of a word on the EVM in bytes.
pub const WORD_SIZE_BYTES: usize = WORD_SIZE_BITS / BYTE_SIZE_BITS;

/// The bit-width of an address type.
pub const ADDRESS_WIDTH_BITS: usize = 160;

/// The width of an address in bytes.
pub const ADDRESS_WIDTH_BYTES: usize = ADDRESS_WIDTH_BITS / BYTE_SIZE_BITS;

/// The number of bytes at the end of compiled bytecode that encode the length
/// of the CBOR metadata that precedes them.
pub const METADATA_LENGTH_SUFFIX_BYTES: usize = 2;

/// The textual marker used by nodes to signal that an account has no code.
pub const EMPTY_CODE_MARKER: &str = "0x";

/// The position, counted from the top of a recorded stack snapshot, at which
/// the call-family opcodes are read for their callee address.
///
/// Index 0 is the top of the stack.
pub const DEFAULT_CALLEE_STACK_POSITION: usize = 1;

/// The default number of candidate calls the matcher will consider before
/// polling the watchdog.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 1;

/// The message attached to the failure raised when no call frame matches the
/// target bytecode.
pub const NO_MATCHING_BYTECODE_HINT: &str = "No matching bytecode found in the chain for this \
                                             transaction. Please check the contracts were not \
                                             deployed with different optimizations than the \
                                             debugger";
