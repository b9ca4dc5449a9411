//! This module contains the representation of the values that the executors
//! operate on.
//!
//! # Words
//!
//! Every value on the EVM is a 256-bit word. During static analysis some words
//! can be computed exactly, while others depend on the chain, the transaction,
//! or the result of another call. The latter are represented by a [`Symbol`]
//! naming the query that would have produced them.
//!
//! There is no way to turn a [`Word::Symbolic`] into a concrete
//! value. Consumers must handle both cases, usually by propagating the symbolic
//! result.

pub mod known;

use std::fmt::{Display, Formatter};

use crate::vm::value::known::KnownWord;

/// A single 256-bit value as seen by the executors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Word {
    /// A value that is known exactly.
    Concrete(KnownWord),

    /// A value whose contents depend on information unavailable during static
    /// analysis.
    Symbolic(Symbol),
}

impl Word {
    /// Creates a concrete word holding zero.
    #[must_use]
    pub fn zero() -> Self {
        Self::Concrete(KnownWord::zero())
    }

    /// Creates a symbolic word derived from operands that were themselves
    /// symbolic.
    #[must_use]
    pub fn unknown() -> Self {
        Self::Symbolic(Symbol::Unknown)
    }

    /// Gets the concrete value of the word, if it has one.
    #[must_use]
    pub fn known(&self) -> Option<KnownWord> {
        match self {
            Self::Concrete(value) => Some(*value),
            Self::Symbolic(_) => None,
        }
    }

    /// Gets the symbol behind the word, if it is not concrete.
    #[must_use]
    pub fn symbol(&self) -> Option<Symbol> {
        match self {
            Self::Concrete(_) => None,
            Self::Symbolic(symbol) => Some(*symbol),
        }
    }

    /// Checks if the word has a concrete value.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        matches!(self, Self::Concrete(_))
    }

    /// Applies `op` to the concrete value of the word, or yields
    /// [`Symbol::Unknown`] if it has none.
    #[must_use]
    pub fn map(self, op: impl FnOnce(KnownWord) -> KnownWord) -> Self {
        match self {
            Self::Concrete(value) => Self::Concrete(op(value)),
            Self::Symbolic(_) => Self::unknown(),
        }
    }

    /// Applies `op` to the concrete values of `self` and `other`, or yields
    /// [`Symbol::Unknown`] if either has none.
    #[must_use]
    pub fn zip(self, other: Self, op: impl FnOnce(KnownWord, KnownWord) -> KnownWord) -> Self {
        match (self, other) {
            (Self::Concrete(a), Self::Concrete(b)) => Self::Concrete(op(a, b)),
            _ => Self::unknown(),
        }
    }

    /// Applies `op` to the concrete values of `self`, `b`, and `c`, or yields
    /// [`Symbol::Unknown`] if any has none.
    #[must_use]
    pub fn zip3(
        self,
        b: Self,
        c: Self,
        op: impl FnOnce(KnownWord, KnownWord, KnownWord) -> KnownWord,
    ) -> Self {
        match (self, b, c) {
            (Self::Concrete(a), Self::Concrete(b), Self::Concrete(c)) => {
                Self::Concrete(op(a, b, c))
            }
            _ => Self::unknown(),
        }
    }
}

impl From<KnownWord> for Word {
    fn from(value: KnownWord) -> Self {
        Self::Concrete(value)
    }
}

impl From<Symbol> for Word {
    fn from(value: Symbol) -> Self {
        Self::Symbolic(value)
    }
}

impl From<usize> for Word {
    fn from(value: usize) -> Self {
        Self::Concrete(KnownWord::from(value))
    }
}

impl From<bool> for Word {
    fn from(value: bool) -> Self {
        Self::Concrete(KnownWord::from(value))
    }
}

impl Display for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concrete(value) => write!(f, "{value}"),
            Self::Symbolic(symbol) => write!(f, "{symbol}"),
        }
    }
}

/// The queries whose answers are unavailable during static analysis.
///
/// Each variant names the instruction (or family of instructions) that asks
/// the question, apart from [`Symbol::Unknown`], which stands for any value
/// computed from other symbolic values.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Symbol {
    /// The address of the executing account (`ADDRESS`).
    Address,

    /// The balance of some account (`BALANCE`).
    Balance,

    /// The sender of the transaction (`ORIGIN`).
    Origin,

    /// The sender of the current call (`CALLER`).
    Caller,

    /// The value sent with the current call (`CALLVALUE`).
    CallValue,

    /// A word of the call data (`CALLDATALOAD`).
    CallDataLoad,

    /// The size of the call data (`CALLDATASIZE`).
    CallDataSize,

    /// The size of the executing code (`CODESIZE`).
    CodeSize,

    /// The gas price of the transaction (`GASPRICE`).
    GasPrice,

    /// The size of another account's code (`EXTCODESIZE`).
    ExtCodeSize,

    /// The hash of another account's code (`EXTCODEHASH`).
    ExtCodeHash,

    /// The size of the last call's return data (`RETURNDATASIZE`).
    ReturnDataSize,

    /// The hash of a recent block (`BLOCKHASH`).
    BlockHash,

    /// The beneficiary of the block (`COINBASE`).
    Coinbase,

    /// The timestamp of the block (`TIMESTAMP`).
    Timestamp,

    /// The number of the block (`NUMBER`).
    Number,

    /// The randomness beacon output of the block (`PREVRANDAO`).
    Prevrandao,

    /// The gas limit of the block (`GASLIMIT`).
    GasLimit,

    /// The chain identifier (`CHAINID`).
    ChainId,

    /// The balance of the executing account (`SELFBALANCE`).
    SelfBalance,

    /// The base fee of the block (`BASEFEE`).
    BaseFee,

    /// A versioned blob hash of the transaction (`BLOBHASH`).
    BlobHash,

    /// The blob base fee of the block (`BLOBBASEFEE`).
    BlobBaseFee,

    /// The remaining gas (`GAS`).
    Gas,

    /// The size of memory once it has been written at an unknown location
    /// (`MSIZE`).
    MemorySize,

    /// A storage slot not written during the analysis (`SLOAD`).
    StorageLoad,

    /// A transient storage slot not written during the analysis (`TLOAD`).
    TransientLoad,

    /// The address of a created contract (`CREATE`).
    Create,

    /// The address of a contract created at a salted address (`CREATE2`).
    Create2,

    /// The success flag of a message call (`CALL`).
    Call,

    /// The success flag of a call with alternative account code (`CALLCODE`).
    CallCode,

    /// The success flag of a delegated call (`DELEGATECALL`).
    DelegateCall,

    /// The success flag of a static call (`STATICCALL`).
    StaticCall,

    /// A value computed from symbolic operands.
    Unknown,
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Address => "address",
            Self::Balance => "balance",
            Self::Origin => "origin",
            Self::Caller => "caller",
            Self::CallValue => "callvalue",
            Self::CallDataLoad => "calldataload",
            Self::CallDataSize => "calldatasize",
            Self::CodeSize => "codesize",
            Self::GasPrice => "gasprice",
            Self::ExtCodeSize => "extcodesize",
            Self::ExtCodeHash => "extcodehash",
            Self::ReturnDataSize => "returndatasize",
            Self::BlockHash => "blockhash",
            Self::Coinbase => "coinbase",
            Self::Timestamp => "timestamp",
            Self::Number => "number",
            Self::Prevrandao => "prevrandao",
            Self::GasLimit => "gaslimit",
            Self::ChainId => "chainid",
            Self::SelfBalance => "selfbalance",
            Self::BaseFee => "basefee",
            Self::BlobHash => "blobhash",
            Self::BlobBaseFee => "blobbasefee",
            Self::Gas => "gas",
            Self::MemorySize => "msize",
            Self::StorageLoad => "sload",
            Self::TransientLoad => "tload",
            Self::Create => "create",
            Self::Create2 => "create2",
            Self::Call => "call",
            Self::CallCode => "callcode",
            Self::DelegateCall => "delegatecall",
            Self::StaticCall => "staticcall",
            Self::Unknown => "unknown",
        };
        write!(f, "<{name}>")
    }
}

#[cfg(test)]
mod test {
    use crate::vm::value::{known::KnownWord, Symbol, Word};

    #[test]
    fn concrete_operands_give_concrete_results() {
        let a = Word::from(3usize);
        let b = Word::from(4usize);

        assert_eq!(a.zip(b, |a, b| a + b), Word::from(7usize));
        assert_eq!(a.map(|a| !(!a)), a);
    }

    #[test]
    fn symbolic_operands_give_unknown_results() {
        let a = Word::from(Symbol::CallValue);
        let b = Word::from(4usize);

        assert_eq!(a.zip(b, |a, b| a + b), Word::unknown());
        assert_eq!(b.zip(a, |a, b| a + b), Word::unknown());
        assert_eq!(a.map(|a| a), Word::unknown());
        assert_eq!(b.zip3(b, a, KnownWord::add_mod), Word::unknown());
    }

    #[test]
    fn exposes_only_concrete_values() {
        assert_eq!(Word::from(1usize).known(), Some(KnownWord::one()));
        assert_eq!(Word::from(Symbol::Gas).known(), None);
        assert_eq!(Word::from(Symbol::Gas).symbol(), Some(Symbol::Gas));
    }

    #[test]
    fn displays_symbols_by_query() {
        assert_eq!(Word::from(Symbol::CodeSize).to_string(), "<codesize>");
        assert_eq!(Word::from(2usize).to_string(), "0x2");
    }
}
