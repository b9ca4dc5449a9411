//! This module contains a representation of concrete word values for the EVM
//! that can be known and manipulated statically.

use std::fmt::{Display, Formatter};

use ethnum::{I256, U256};

use crate::constant::{BYTE_SIZE_BITS, WORD_SIZE_BITS, WORD_SIZE_BYTES};

/// The type of data whose value is concretely known during abstract execution.
///
/// # Representation
///
/// At the low level at which this library works, all values on the EVM are
/// just bags of bits in a 256-bit word. Operations on a `KnownWord` may treat
/// this word numerically in a signed or unsigned fashion. Signed operations
/// reinterpret the bit pattern as a two's complement number.
///
/// All arithmetic wraps modulo `2**256`, as it does on the EVM, and division by
/// zero produces zero rather than failing.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KnownWord {
    value: U256,
}

impl KnownWord {
    /// Creates a known value representing zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::new(U256::ZERO)
    }

    /// Creates a known value representing one.
    #[must_use]
    pub fn one() -> Self {
        Self::new(U256::ONE)
    }

    /// Constructs a new `KnownWord` holding the numeric `value`.
    #[must_use]
    pub fn new(value: impl Into<U256>) -> Self {
        let value = value.into();
        Self { value }
    }

    /// Constructs a new `KnownWord` from the bit pattern of the signed `value`.
    #[must_use]
    pub fn from_signed(value: impl Into<I256>) -> Self {
        let value = U256::from_ne_bytes(value.into().to_ne_bytes());
        Self { value }
    }

    /// Constructs a new `KnownWord` from its big-endian `bytes`.
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; WORD_SIZE_BYTES]) -> Self {
        let value = U256::from_be_bytes(bytes);
        Self { value }
    }

    /// Constructs a new `KnownWord` from up to 32 big-endian `bytes`,
    /// zero-extending on the left as `PUSH` does.
    ///
    /// Returns [`None`] if more than 32 bytes are provided.
    #[must_use]
    pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > WORD_SIZE_BYTES {
            return None;
        }
        let mut buffer = [0u8; WORD_SIZE_BYTES];
        buffer[WORD_SIZE_BYTES - bytes.len()..].copy_from_slice(bytes);
        Some(Self::from_be_bytes(buffer))
    }

    /// Parses a hex-encoded word, with or without a `0x` prefix.
    ///
    /// Traces written by different nodes disagree on whether stack words are
    /// zero-padded, so any number of digits up to 64 is accepted.
    #[must_use]
    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        if digits.is_empty() || digits.len() > WORD_SIZE_BYTES * 2 {
            return None;
        }
        U256::from_str_radix(digits, 16).ok().map(Self::new)
    }

    /// Gets the numeric value of the word.
    #[must_use]
    pub fn value(&self) -> U256 {
        self.value
    }

    /// Gets the value of the word interpreting the bit pattern as a signed
    /// number.
    #[must_use]
    pub fn value_signed(&self) -> I256 {
        I256::from_ne_bytes(self.value.to_ne_bytes())
    }

    /// Gets the big-endian bytes of this word.
    #[must_use]
    pub fn to_be_bytes(&self) -> [u8; WORD_SIZE_BYTES] {
        self.value.to_be_bytes()
    }

    /// Gets the value as a [`usize`] if it fits in one.
    #[must_use]
    pub fn to_usize(&self) -> Option<usize> {
        usize::try_from(self.value).ok()
    }

    /// Checks if the word is zero, as a plain boolean.
    #[must_use]
    pub fn is_zero_value(&self) -> bool {
        self.value == U256::ZERO
    }

    /// Performs signed division of two known words.
    #[must_use]
    pub fn signed_div(self, rhs: Self) -> Self {
        let divisor = rhs.value_signed();
        if divisor == I256::ZERO {
            return Self::zero();
        }

        // `I256::MIN / -1` overflows, and the EVM defines it as `I256::MIN`, which
        // is exactly what the wrapping operation produces.
        Self::from_signed(self.value_signed().wrapping_div(divisor))
    }

    /// Performs signed modulo of two known words.
    ///
    /// The sign of the result follows the sign of the dividend.
    #[must_use]
    pub fn signed_rem(self, rhs: Self) -> Self {
        let divisor = rhs.value_signed();
        if divisor == I256::ZERO {
            return Self::zero();
        }
        Self::from_signed(self.value_signed().wrapping_rem(divisor))
    }

    /// Computes `(self + rhs) % modulus` without the intermediate sum being
    /// truncated to 256 bits.
    #[must_use]
    pub fn add_mod(self, rhs: Self, modulus: Self) -> Self {
        if modulus.is_zero_value() {
            return Self::zero();
        }
        Self::new(add_mod_u256(self.value, rhs.value, modulus.value))
    }

    /// Computes `(self * rhs) % modulus` without the intermediate product being
    /// truncated to 256 bits.
    #[must_use]
    pub fn mul_mod(self, rhs: Self, modulus: Self) -> Self {
        if modulus.is_zero_value() {
            return Self::zero();
        }

        // Double-and-add over the bits of `rhs`, keeping everything reduced.
        let modulus = modulus.value;
        let base = self.value % modulus;
        let mut result = U256::ZERO;
        for bit in (0..WORD_SIZE_BITS as u32).rev() {
            result = add_mod_u256(result, result, modulus);
            if (rhs.value >> bit) & U256::ONE == U256::ONE {
                result = add_mod_u256(result, base, modulus);
            }
        }

        Self::new(result)
    }

    /// Performs exponentiation of two known words.
    #[must_use]
    pub fn exp(self, rhs: Self) -> Self {
        let mut result = U256::ONE;
        let mut base = self.value;
        let mut exponent = rhs.value;
        while exponent != U256::ZERO {
            if exponent & U256::ONE == U256::ONE {
                result = result.wrapping_mul(base);
            }
            base = base.wrapping_mul(base);
            exponent = exponent >> 1u32;
        }

        Self::new(result)
    }

    /// Extends the sign of the two's complement number held in the lowest
    /// `size + 1` bytes of `self` to the full word.
    #[must_use]
    pub fn sign_extend(self, size: Self) -> Self {
        let Some(size) = size.to_usize().filter(|s| *s < WORD_SIZE_BYTES - 1) else {
            return self;
        };

        #[allow(clippy::cast_possible_truncation)] // `size` is at most 30
        let sign_bit = (size * BYTE_SIZE_BITS + 7) as u32;
        let mask = (U256::ONE << (sign_bit + 1)) - U256::ONE;

        if (self.value >> sign_bit) & U256::ONE == U256::ONE {
            Self::new(self.value | !mask)
        } else {
            Self::new(self.value & mask)
        }
    }

    /// Extracts the byte at `index` from `self`, where byte 0 is the most
    /// significant byte.
    #[must_use]
    pub fn byte(self, index: Self) -> Self {
        match index.to_usize() {
            Some(index) if index < WORD_SIZE_BYTES => {
                Self::new(U256::from(self.to_be_bytes()[index]))
            }
            _ => Self::zero(),
        }
    }

    /// Computes less-than of two known words.
    #[must_use]
    pub fn lt(self, rhs: Self) -> Self {
        KnownWord::from(self.value < rhs.value)
    }

    /// Computes greater-than of two known words.
    #[must_use]
    pub fn gt(self, rhs: Self) -> Self {
        KnownWord::from(self.value > rhs.value)
    }

    /// Computes signed less-than of two known words.
    #[must_use]
    pub fn signed_lt(self, rhs: Self) -> Self {
        KnownWord::from(self.value_signed() < rhs.value_signed())
    }

    /// Computes signed greater-than of two known words.
    #[must_use]
    pub fn signed_gt(self, rhs: Self) -> Self {
        KnownWord::from(self.value_signed() > rhs.value_signed())
    }

    /// Computes equality of two known words, as a word.
    #[must_use]
    pub fn equals(self, rhs: Self) -> Self {
        KnownWord::from(self.value == rhs.value)
    }

    /// Checks if `self` is zero, as a word.
    #[must_use]
    pub fn is_zero(self) -> Self {
        KnownWord::from(self.is_zero_value())
    }

    /// Computes the signed right shift of `self` by `rhs`.
    ///
    /// Shifting by 256 or more bits saturates to zero or to all ones depending
    /// on the sign of `self`.
    #[must_use]
    pub fn sar(self, rhs: Self) -> Self {
        let value = self.value_signed();
        match shift_amount(rhs) {
            Some(shift) => Self::from_signed(value >> shift),
            None if value < I256::ZERO => Self::from_signed(I256::MINUS_ONE),
            None => Self::zero(),
        }
    }
}

/// Gets the shift amount described by `word` if it is less than the word size.
fn shift_amount(word: KnownWord) -> Option<u32> {
    #[allow(clippy::cast_possible_truncation)] // Bounded by the word size
    word.to_usize()
        .filter(|shift| *shift < WORD_SIZE_BITS)
        .map(|shift| shift as u32)
}

/// Computes `(a + b) % modulus` for non-zero `modulus` without losing the
/// carry out of the addition.
fn add_mod_u256(a: U256, b: U256, modulus: U256) -> U256 {
    let a = a % modulus;
    let b = b % modulus;
    let (sum, carry) = a.overflowing_add(b);

    // The true sum is below `2 * modulus`, so one subtraction suffices. When it
    // carried, the wrapping subtraction lands on the right value.
    if carry || sum >= modulus {
        sum.wrapping_sub(modulus)
    } else {
        sum
    }
}

impl std::ops::Add<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn add(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value.wrapping_add(rhs.value))
    }
}

impl std::ops::Mul<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn mul(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value.wrapping_mul(rhs.value))
    }
}

impl std::ops::Sub<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn sub(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value.wrapping_sub(rhs.value))
    }
}

impl std::ops::Div<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Performs unsigned division of two known words, yielding zero when
    /// dividing by zero.
    fn div(self, rhs: KnownWord) -> Self::Output {
        if rhs.is_zero_value() {
            KnownWord::zero()
        } else {
            KnownWord::new(self.value / rhs.value)
        }
    }
}

impl std::ops::Rem<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Performs unsigned modulo of two known words, yielding zero when the
    /// divisor is zero.
    fn rem(self, rhs: KnownWord) -> Self::Output {
        if rhs.is_zero_value() {
            KnownWord::zero()
        } else {
            KnownWord::new(self.value % rhs.value)
        }
    }
}

impl std::ops::BitAnd<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn bitand(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value & rhs.value)
    }
}

impl std::ops::BitOr<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn bitor(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value | rhs.value)
    }
}

impl std::ops::BitXor<KnownWord> for KnownWord {
    type Output = KnownWord;

    fn bitxor(self, rhs: KnownWord) -> Self::Output {
        KnownWord::new(self.value ^ rhs.value)
    }
}

impl std::ops::Not for KnownWord {
    type Output = KnownWord;

    fn not(self) -> Self::Output {
        KnownWord::new(!self.value)
    }
}

impl std::ops::Shl<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Computes the left shift of `self` by `rhs`, which is zero for shifts of
    /// 256 bits or more.
    fn shl(self, rhs: KnownWord) -> Self::Output {
        match shift_amount(rhs) {
            Some(shift) => KnownWord::new(self.value << shift),
            None => KnownWord::zero(),
        }
    }
}

impl std::ops::Shr<KnownWord> for KnownWord {
    type Output = KnownWord;

    /// Computes the unsigned right shift of `self` by `rhs`, which is zero for
    /// shifts of 256 bits or more.
    fn shr(self, rhs: KnownWord) -> Self::Output {
        match shift_amount(rhs) {
            Some(shift) => KnownWord::new(self.value >> shift),
            None => KnownWord::zero(),
        }
    }
}

impl From<usize> for KnownWord {
    fn from(value: usize) -> Self {
        Self::new(U256::from(value as u128))
    }
}

impl From<U256> for KnownWord {
    fn from(value: U256) -> Self {
        Self::new(value)
    }
}

impl From<KnownWord> for U256 {
    fn from(value: KnownWord) -> Self {
        value.value
    }
}

impl From<KnownWord> for bool {
    fn from(value: KnownWord) -> Self {
        !value.is_zero_value()
    }
}

impl From<bool> for KnownWord {
    fn from(value: bool) -> Self {
        if value {
            Self::one()
        } else {
            Self::zero()
        }
    }
}

/// Pretty-prints the known word as a hexadecimal-encoded number without
/// leading zeroes.
impl Display for KnownWord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = hex::encode(self.value.to_be_bytes());
        let str = str.trim_start_matches('0');
        let str = if str.is_empty() { "0" } else { str };
        write!(f, "0x{str}")
    }
}

#[cfg(test)]
mod test {
    use ethnum::{I256, U256};

    use crate::vm::value::known::KnownWord;

    fn word(value: u32) -> KnownWord {
        KnownWord::new(value)
    }

    fn signed(value: i32) -> KnownWord {
        KnownWord::from_signed(value)
    }

    #[test]
    fn can_construct_from_slices() {
        assert_eq!(KnownWord::from_be_slice(&[0x01, 0x02]), Some(word(0x0102)));
        assert_eq!(KnownWord::from_be_slice(&[]), Some(KnownWord::zero()));
        assert_eq!(KnownWord::from_be_slice(&[0u8; 33]), None);
    }

    #[test]
    fn can_parse_hex_of_any_padding() {
        assert_eq!(KnownWord::from_hex("0x1"), Some(word(1)));
        assert_eq!(
            KnownWord::from_hex(&format!("{:064x}", 0xabcu32)),
            Some(word(0xabc))
        );
        assert_eq!(KnownWord::from_hex("0x"), None);
        assert_eq!(KnownWord::from_hex("0xzz"), None);
        assert_eq!(KnownWord::from_hex(&"f".repeat(65)), None);
    }

    #[test]
    fn arithmetic_wraps() {
        let max = KnownWord::new(U256::MAX);

        assert_eq!(max + word(1), KnownWord::zero());
        assert_eq!(KnownWord::zero() - word(1), max);
        assert_eq!(word(7) * word(6), word(42));
    }

    #[test]
    fn division_by_zero_is_zero() {
        let zero = KnownWord::zero();

        assert_eq!(word(2) / zero, zero);
        assert_eq!(word(2) % zero, zero);
        assert_eq!(word(2).signed_div(zero), zero);
        assert_eq!(word(2).signed_rem(zero), zero);
        assert_eq!(word(2).add_mod(word(3), zero), zero);
        assert_eq!(word(2).mul_mod(word(3), zero), zero);
    }

    #[test]
    fn signed_division_and_remainder() {
        assert_eq!(signed(-8).signed_div(word(2)), signed(-4));
        assert_eq!(signed(-8).signed_rem(word(3)), signed(-2));
        assert_eq!(word(8).signed_rem(signed(-3)), word(2));

        let min = KnownWord::from_signed(I256::MIN);
        assert_eq!(min.signed_div(signed(-1)), min);
    }

    #[test]
    fn modular_arithmetic_keeps_full_width() {
        let max = KnownWord::new(U256::MAX);

        // 2**256 - 1 is congruent to 1 modulo 7, but the sums and products below
        // overflow the word.
        assert_eq!(max.add_mod(max, word(7)), word(2));
        assert_eq!(max.mul_mod(max, word(7)), word(1));
        assert_eq!(max.mul_mod(max, max), KnownWord::zero());
        assert_eq!(word(10).add_mod(word(10), word(8)), word(4));
        assert_eq!(word(10).mul_mod(word(10), word(8)), word(4));
    }

    #[test]
    fn exponentiation_uses_full_exponent() {
        assert_eq!(word(7).exp(word(2)), word(49));
        assert_eq!(word(2).exp(word(256)), KnownWord::zero());
        assert_eq!(word(3).exp(KnownWord::zero()), word(1));
    }

    #[test]
    fn sign_extension() {
        assert_eq!(word(0xff).sign_extend(word(0)), KnownWord::new(U256::MAX));
        assert_eq!(word(0x7f).sign_extend(word(0)), word(0x7f));
        assert_eq!(word(0x1ff).sign_extend(word(0)), KnownWord::new(U256::MAX));
        assert_eq!(word(0xff).sign_extend(word(31)), word(0xff));
    }

    #[test]
    fn byte_extraction() {
        let value = word(0x1234);

        assert_eq!(value.byte(word(31)), word(0x34));
        assert_eq!(value.byte(word(30)), word(0x12));
        assert_eq!(value.byte(word(0)), KnownWord::zero());
        assert_eq!(value.byte(word(32)), KnownWord::zero());
    }

    #[test]
    fn comparisons() {
        assert_eq!(word(7).lt(word(2)), KnownWord::from(false));
        assert_eq!(word(7).gt(word(2)), KnownWord::from(true));
        assert_eq!(signed(-8).signed_lt(word(3)), KnownWord::from(true));
        assert_eq!(signed(-8).signed_gt(word(3)), KnownWord::from(false));
        assert_eq!(word(7).equals(word(7)), KnownWord::one());
        assert_eq!(KnownWord::zero().is_zero(), KnownWord::one());
    }

    #[test]
    fn shifts_saturate() {
        assert_eq!(word(0b1110) << word(4), word(0b1110_0000));
        assert_eq!(word(0b10_1100) >> word(2), word(0b1011));
        assert_eq!(word(1) << word(256), KnownWord::zero());
        assert_eq!(word(1) >> word(300), KnownWord::zero());
        assert_eq!(signed(0b1101_0100).sar(word(2)), signed(0b11_0101));
        assert_eq!(signed(-16).sar(word(2)), signed(-4));
        assert_eq!(signed(-16).sar(word(256)), signed(-1));
        assert_eq!(word(16).sar(word(256)), KnownWord::zero());
    }

    #[test]
    fn displays_as_trimmed_hex() {
        assert_eq!(KnownWord::zero().to_string(), "0x0");
        assert_eq!(word(0xbeef).to_string(), "0xbeef");
    }
}
