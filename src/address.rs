//! This module contains the representation of account addresses on the EVM.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use ethnum::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{constant::ADDRESS_WIDTH_BYTES, vm::value::known::KnownWord};

/// A 160-bit account address.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Address([u8; ADDRESS_WIDTH_BYTES]);

impl Address {
    /// Constructs an address from its big-endian `bytes`.
    #[must_use]
    pub fn new(bytes: [u8; ADDRESS_WIDTH_BYTES]) -> Self {
        Self(bytes)
    }

    /// Constructs an address from the low 160 bits of `word`, discarding the
    /// rest.
    #[must_use]
    pub fn from_word(word: U256) -> Self {
        let bytes = word.to_be_bytes();
        let mut address = [0u8; ADDRESS_WIDTH_BYTES];
        address.copy_from_slice(&bytes[bytes.len() - ADDRESS_WIDTH_BYTES..]);
        Self(address)
    }

    /// Gets the big-endian bytes of the address.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_WIDTH_BYTES] {
        &self.0
    }

    /// Gets the address as a 256-bit word, zero-extended.
    #[must_use]
    pub fn to_word(&self) -> U256 {
        let mut bytes = [0u8; 32];
        bytes[32 - ADDRESS_WIDTH_BYTES..].copy_from_slice(&self.0);
        U256::from_be_bytes(bytes)
    }
}

impl From<KnownWord> for Address {
    fn from(value: KnownWord) -> Self {
        Self::from_word(value.value())
    }
}

/// Prints the address as lowercase hex with a `0x` prefix, which is the form
/// nodes accept in their RPC parameters.
impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    /// Parses exactly 40 hex digits, with or without the `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; ADDRESS_WIDTH_BYTES];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}
