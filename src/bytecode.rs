//! This module contains the normalisation of EVM bytecode for the purposes of
//! comparing two builds of the same contract.
//!
//! # Compiler Metadata
//!
//! Solidity (and Vyper, since 0.3.10) append a CBOR-encoded map to the code
//! they emit that describes how the code was built. The last two bytes of the
//! bytecode hold the big-endian length of that map. The map is never executed,
//! but it changes whenever the source files or compiler settings change in ways
//! that have nothing to do with the semantics of the code. Two builds of the
//! same contract therefore only compare equal once it is removed.
//!
//! All functions here work on hex text, as that is how bytecode is exchanged
//! with nodes and compilers. A leading `0x` is preserved.

use std::io::Cursor;

use crate::constant::{EMPTY_CODE_MARKER, METADATA_LENGTH_SUFFIX_BYTES};

/// Normalises the hex-encoded `bytecode` to its executable prefix.
///
/// The compiler metadata is removed if it can be recognised. If the result has
/// an odd number of hex digits, the final digit is dropped. This second step is
/// a heuristic carried for compatibility with traces produced by older tooling
/// that mis-decoded the metadata length by one nibble. It is not verified
/// against anything.
///
/// Both steps are repeated until the input stops changing, which makes the
/// function idempotent. Input that is not hex, or that carries no recognisable
/// metadata, is returned unchanged apart from the odd-length trim, which
/// counts characters rather than bytes.
#[must_use]
pub fn normalize(bytecode: &str) -> String {
    let mut current = bytecode.to_owned();
    loop {
        let next = normalize_step(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Checks whether the hex-encoded bytecodes `a` and `b` describe the same
/// executable code.
///
/// The comparison is made on the normalised forms, ignoring case and any `0x`
/// prefix.
#[must_use]
pub fn same_code(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    strip_hex_prefix(&a).eq_ignore_ascii_case(strip_hex_prefix(&b))
}

/// Checks whether `bytecode` is the marker for an account without code.
///
/// Nodes report such accounts as `0x`, while callers that never had code to
/// hand tend to use the empty string.
#[must_use]
pub fn is_empty_code(bytecode: &str) -> bool {
    let trimmed = bytecode.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(EMPTY_CODE_MARKER)
}

/// Splits the raw `bytes` into the executable prefix and the compiler metadata
/// that follows it, if any can be recognised.
///
/// The metadata is recognised when the final two bytes hold a non-zero length
/// `L`, and the `L` bytes before them decode as exactly one CBOR map. The
/// returned metadata includes the two length bytes.
#[must_use]
pub fn split_metadata(bytes: &[u8]) -> (&[u8], Option<&[u8]>) {
    let len = bytes.len();
    if len < METADATA_LENGTH_SUFFIX_BYTES {
        return (bytes, None);
    }

    let encoded_len = usize::from(u16::from_be_bytes([bytes[len - 2], bytes[len - 1]]));
    let total_len = encoded_len + METADATA_LENGTH_SUFFIX_BYTES;
    if encoded_len == 0 || total_len > len {
        return (bytes, None);
    }

    let start = len - total_len;
    if !is_single_cbor_map(&bytes[start..len - METADATA_LENGTH_SUFFIX_BYTES]) {
        return (bytes, None);
    }

    tracing::trace!(metadata_bytes = total_len, "Recognised compiler metadata");
    (&bytes[..start], Some(&bytes[start..]))
}

/// Removes the `0x` prefix from `bytecode` if it has one.
#[must_use]
pub fn strip_hex_prefix(bytecode: &str) -> &str {
    bytecode
        .strip_prefix("0x")
        .or_else(|| bytecode.strip_prefix("0X"))
        .unwrap_or(bytecode)
}

/// Performs a single round of metadata stripping followed by the odd-length
/// trim.
fn normalize_step(bytecode: &str) -> String {
    let digits = strip_hex_prefix(bytecode);
    let prefix = &bytecode[..bytecode.len() - digits.len()];

    let mut digits = strip_metadata(digits);
    if digits.chars().count() % 2 != 0 {
        if let Some((last, _)) = digits.char_indices().last() {
            digits = &digits[..last];
        }
    }

    format!("{prefix}{digits}")
}

/// Removes the metadata from the hex `digits`, returning them unchanged if they
/// cannot be decoded or carry no metadata.
fn strip_metadata(digits: &str) -> &str {
    let Ok(bytes) = hex::decode(digits) else {
        return digits;
    };
    let (executable, _) = split_metadata(&bytes);

    // Each byte is two hex digits, and the digits are ASCII, so this slice is
    // on a character boundary.
    &digits[..executable.len() * 2]
}

/// Checks that `data` is exactly one CBOR map with nothing trailing it.
fn is_single_cbor_map(data: &[u8]) -> bool {
    // Major type 5 is a map.
    if !data.first().is_some_and(|byte| byte >> 5 == 5) {
        return false;
    }

    let mut cursor = Cursor::new(data);
    match ciborium::de::from_reader::<ciborium::Value, _>(&mut cursor) {
        Ok(ciborium::Value::Map(_)) => cursor.position() == data.len() as u64,
        _ => false,
    }
}
