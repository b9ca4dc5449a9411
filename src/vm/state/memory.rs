//! This module contains the definition of the abstract machine's memory.

use std::{collections::BTreeMap, ops::Range};

use crate::{
    constant::WORD_SIZE_BYTES,
    vm::{
        value::{known::KnownWord, Symbol, Word},
        Config,
    },
};

/// A representation of the transient memory of the abstract machine.
///
/// Memory on the EVM is a byte array that grows as needed and reads as zero
/// where it has not been written. Here it is modelled byte by byte for every
/// access whose location is known, so that overlapping and unaligned accesses
/// behave as they do on a real EVM.
///
/// # Symbolic Contents
///
/// A symbolic word stored into memory is split into 32 parts that remember
/// which store they came from. Loading exactly those 32 bytes back yields the
/// original symbol, while any other mix of bytes that are not all concrete
/// yields [`Symbol::Unknown`].
///
/// # Clobbering
///
/// Writes to a symbolic location, or of a symbolic length, may have changed any
/// byte. They clear everything known about the memory, and from then on any
/// byte that has not been written since reads as unknown rather than zero. The
/// same happens for accesses beyond [`Config::memory_size_limit`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Memory {
    /// The bytes that are known, keyed by their address.
    cells: BTreeMap<usize, Cell>,

    /// Whether memory has been clobbered by a write whose extent is unknown.
    clobbered: bool,

    /// The size of the memory in bytes, always a multiple of the word size.
    size: usize,

    /// A counter identifying each store of a symbolic word.
    next_store: usize,

    /// The bound on the addresses that are modelled.
    size_limit: usize,

    /// The bound on the number of bytes copied by one operation.
    copy_limit: usize,
}

impl Memory {
    /// Constructs a new memory container that currently stores no data.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            cells: BTreeMap::new(),
            clobbered: false,
            size: 0,
            next_store: 0,
            size_limit: config.memory_size_limit,
            copy_limit: config.single_memory_operation_size_limit,
        }
    }

    /// Loads the 32 bytes at the provided `offset` in memory as a word.
    pub fn load(&mut self, offset: Word) -> Word {
        let Region::Bytes(range) = self.region(offset, WORD_SIZE_BYTES.into(), self.size_limit)
        else {
            return Word::unknown();
        };
        self.expand_to(&range);

        let cells: Vec<Cell> = range.map(|address| self.cell_at(address)).collect();

        // Fully concrete words read back exactly.
        if let Some(bytes) = concrete_bytes(&cells) {
            let mut word = [0u8; WORD_SIZE_BYTES];
            word.copy_from_slice(&bytes);
            return KnownWord::from_be_bytes(word).into();
        }

        // Symbolic words read back if the load lines up with a single store.
        if let Some(Cell::Part { symbol, store, .. }) = cells.first() {
            let lines_up = cells.iter().enumerate().all(|(i, cell)| {
                matches!(cell, Cell::Part { symbol: s, store: n, index }
                    if s == symbol && n == store && *index == i)
            });
            if lines_up {
                return Word::Symbolic(*symbol);
            }
        }

        Word::unknown()
    }

    /// Stores the provided `value` (of size 256-bits) at the provided `offset`
    /// in the memory.
    ///
    /// This will overwrite any existing value in the 32 bytes from `offset`.
    pub fn store(&mut self, offset: Word, value: Word) {
        let Region::Bytes(range) = self.region(offset, WORD_SIZE_BYTES.into(), self.size_limit)
        else {
            self.clobber_all();
            return;
        };
        self.expand_to(&range);

        match value {
            Word::Concrete(value) => {
                for (address, byte) in range.zip(value.to_be_bytes()) {
                    self.cells.insert(address, Cell::Byte(byte));
                }
            }
            Word::Symbolic(symbol) => {
                let store = self.next_store;
                self.next_store += 1;
                for (index, address) in range.enumerate() {
                    self.cells.insert(
                        address,
                        Cell::Part {
                            symbol,
                            store,
                            index,
                        },
                    );
                }
            }
        }
    }

    /// Stores the lowest byte of the provided `value` at the provided `offset`
    /// in the memory.
    pub fn store_8(&mut self, offset: Word, value: Word) {
        let Region::Bytes(range) = self.region(offset, KnownWord::one().into(), self.size_limit)
        else {
            self.clobber_all();
            return;
        };
        self.expand_to(&range);

        let cell = match value {
            Word::Concrete(value) => Cell::Byte(value.to_be_bytes()[WORD_SIZE_BYTES - 1]),
            Word::Symbolic(_) => Cell::Unknown,
        };
        self.cells.insert(range.start, cell);
    }

    /// Reads the `size` bytes starting at `offset` if every one of them is
    /// concretely known.
    ///
    /// Reading counts as an access, so memory grows to cover the region.
    pub fn read_bytes(&mut self, offset: Word, size: Word) -> Option<Vec<u8>> {
        match self.region(offset, size, self.copy_limit) {
            Region::Empty => Some(Vec::new()),
            Region::Unbounded => None,
            Region::Bytes(range) => {
                self.expand_to(&range);
                let cells: Vec<Cell> = range.map(|address| self.cell_at(address)).collect();
                concrete_bytes(&cells)
            }
        }
    }

    /// Marks the `size` bytes starting at `offset` as holding data that is not
    /// known, as happens when copying in call data or return data.
    ///
    /// If the region itself is not known, the whole memory is clobbered.
    pub fn clobber(&mut self, offset: Word, size: Word) {
        match self.region(offset, size, self.copy_limit) {
            Region::Empty => {}
            Region::Unbounded => self.clobber_all(),
            Region::Bytes(range) => {
                self.expand_to(&range);
                for address in range {
                    self.cells.insert(address, Cell::Unknown);
                }
            }
        }
    }

    /// Copies `size` bytes from `source` to `destination`, with the semantics of
    /// `MCOPY` for overlapping regions.
    pub fn copy(&mut self, destination: Word, source: Word, size: Word) {
        let target = self.region(destination, size, self.copy_limit);
        let from = self.region(source, size, self.copy_limit);
        match (target, from) {
            (Region::Empty, _) | (_, Region::Empty) => {}
            (Region::Bytes(target), Region::Bytes(from)) => {
                self.expand_to(&from);
                self.expand_to(&target);
                let cells: Vec<Cell> = from.map(|address| self.cell_at(address)).collect();
                for (address, cell) in target.zip(cells) {
                    self.cells.insert(address, cell);
                }
            }
            _ => self.clobber_all(),
        }
    }

    /// Grows memory to cover the `size` bytes starting at `offset`, as any
    /// instruction that reads a memory region does.
    pub fn expand(&mut self, offset: Word, size: Word) {
        match self.region(offset, size, self.size_limit) {
            Region::Empty => {}
            Region::Bytes(range) => self.expand_to(&range),
            Region::Unbounded => self.clobbered = true,
        }
    }

    /// Gets the size of memory in bytes, as `MSIZE` reports it.
    ///
    /// Once memory has been clobbered its size is no longer known.
    #[must_use]
    pub fn size(&self) -> Word {
        if self.clobbered {
            Word::Symbolic(Symbol::MemorySize)
        } else {
            self.size.into()
        }
    }

    /// Checks if memory has been clobbered by a write whose extent is unknown.
    #[must_use]
    pub fn is_clobbered(&self) -> bool {
        self.clobbered
    }

    /// Asks the memory for the number of bytes it has recorded.
    ///
    /// This has no equivalent operation on the EVM and is primarily useful for
    /// introspection.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.cells.len()
    }

    /// Checks if the memory has ever been written to.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries() == 0 && !self.clobbered
    }

    /// Forgets everything known about the memory.
    fn clobber_all(&mut self) {
        tracing::trace!("Memory clobbered by a write of unknown extent");
        self.cells.clear();
        self.clobbered = true;
    }

    /// Gets the cell at `address`, which is zero if it was never written and
    /// memory has not been clobbered.
    fn cell_at(&self, address: usize) -> Cell {
        match self.cells.get(&address) {
            Some(cell) => *cell,
            None if self.clobbered => Cell::Unknown,
            None => Cell::Byte(0),
        }
    }

    /// Grows the memory size to cover `range`, rounding up to a whole word.
    fn expand_to(&mut self, range: &Range<usize>) {
        let end = range.end.div_ceil(WORD_SIZE_BYTES) * WORD_SIZE_BYTES;
        self.size = self.size.max(end);
    }

    /// Works out which bytes the access of `size` bytes at `offset` touches.
    ///
    /// Accesses of zero bytes touch nothing regardless of their offset, as on
    /// the EVM.
    fn region(&self, offset: Word, size: Word, size_bound: usize) -> Region {
        let Some(size) = size.known() else {
            return Region::Unbounded;
        };
        if size.is_zero_value() {
            return Region::Empty;
        }
        let (Some(offset), Some(size)) = (offset.known().and_then(|o| o.to_usize()), size.to_usize())
        else {
            return Region::Unbounded;
        };
        if size > size_bound {
            return Region::Unbounded;
        }
        match offset.checked_add(size) {
            Some(end) if end <= self.size_limit => Region::Bytes(offset..end),
            _ => Region::Unbounded,
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new(&Config::default())
    }
}

/// The knowledge about a single byte of memory.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Cell {
    /// A concretely known byte.
    Byte(u8),

    /// Byte `index` of the symbolic word written by the `store`th symbolic
    /// store.
    Part {
        symbol: Symbol,
        store:  usize,
        index:  usize,
    },

    /// A byte about which nothing is known.
    Unknown,
}

/// The bytes touched by an access to memory.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Region {
    /// The access touches no bytes.
    Empty,

    /// The access touches exactly these addresses.
    Bytes(Range<usize>),

    /// The access touches an unknown or unmodelled part of memory.
    Unbounded,
}

/// Gets the bytes held by `cells` if all of them are concrete.
fn concrete_bytes(cells: &[Cell]) -> Option<Vec<u8>> {
    cells
        .iter()
        .map(|cell| match cell {
            Cell::Byte(byte) => Some(*byte),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod test {
    use crate::vm::{
        state::memory::Memory,
        value::{known::KnownWord, Symbol, Word},
        Config,
    };

    fn word(value: usize) -> Word {
        Word::from(value)
    }

    #[test]
    fn can_construct_new_memory() {
        let memory = Memory::default();
        assert!(memory.is_empty());
        assert_eq!(memory.size(), word(0));
    }

    #[test]
    fn unwritten_memory_reads_as_zero() {
        let mut memory = Memory::default();
        assert_eq!(memory.load(word(0x40)), word(0));
        assert_eq!(memory.size(), word(0x60));
    }

    #[test]
    fn can_store_and_load_concrete_words() {
        let mut memory = Memory::default();
        memory.store(word(0x40), word(0x80));

        assert_eq!(memory.load(word(0x40)), word(0x80));
        assert_eq!(memory.entries(), 32);
    }

    #[test]
    fn handles_unaligned_and_overlapping_accesses() {
        let mut memory = Memory::default();
        memory.store(word(0), word(0xaabb));

        // Shifting the load by one byte pulls in an unwritten zero byte.
        assert_eq!(memory.load(word(1)), word(0xaa_bb00));

        memory.store_8(word(31), word(0x1cc));
        assert_eq!(memory.load(word(0)), word(0xaacc));
    }

    #[test]
    fn symbolic_words_read_back_only_when_aligned() {
        let mut memory = Memory::default();
        memory.store(word(0), Word::Symbolic(Symbol::CallValue));

        assert_eq!(memory.load(word(0)), Word::Symbolic(Symbol::CallValue));
        assert_eq!(memory.load(word(1)), Word::unknown());

        memory.store_8(word(0), word(1));
        assert_eq!(memory.load(word(0)), Word::unknown());
    }

    #[test]
    fn symbolic_offset_writes_clobber_memory() {
        let mut memory = Memory::default();
        memory.store(word(0), word(1));
        memory.store(Word::Symbolic(Symbol::CallDataLoad), word(2));

        assert!(memory.is_clobbered());
        assert_eq!(memory.load(word(0)), Word::unknown());
        assert_eq!(memory.size(), Word::Symbolic(Symbol::MemorySize));

        // Later writes are still tracked exactly.
        memory.store(word(0), word(3));
        assert_eq!(memory.load(word(0)), word(3));
    }

    #[test]
    fn symbolic_offset_loads_are_unknown_without_clobbering() {
        let mut memory = Memory::default();
        assert_eq!(memory.load(Word::Symbolic(Symbol::Caller)), Word::unknown());
        assert!(!memory.is_clobbered());
    }

    #[test]
    fn accesses_beyond_limit_clobber() {
        let config = Config::default().with_memory_size_limit(64);
        let mut memory = Memory::new(&config);
        memory.store(word(64), word(1));

        assert!(memory.is_clobbered());
    }

    #[test]
    fn clobbering_regions_makes_them_unknown() {
        let mut memory = Memory::default();
        memory.store(word(0), word(7));
        memory.clobber(word(16), word(4));

        assert_eq!(memory.load(word(0)), Word::unknown());
        assert_eq!(memory.load(word(32)), word(0));
        assert!(!memory.is_clobbered());

        memory.clobber(word(0), Word::Symbolic(Symbol::CallDataSize));
        assert!(memory.is_clobbered());
    }

    #[test]
    fn zero_sized_accesses_do_nothing() {
        let mut memory = Memory::default();
        memory.clobber(Word::Symbolic(Symbol::Caller), word(0));
        memory.expand(word(1000), word(0));

        assert!(!memory.is_clobbered());
        assert_eq!(memory.size(), word(0));
    }

    #[test]
    fn copies_overlapping_regions() {
        let mut memory = Memory::default();
        memory.store(word(0), word(0x0102));
        memory.copy(word(1), word(0), word(32));

        assert_eq!(memory.load(word(1)), word(0x0102));
        assert_eq!(memory.load(word(0)), word(0x01));
    }

    #[test]
    fn reads_concrete_bytes() {
        let mut memory = Memory::default();
        memory.store(word(0), KnownWord::new(0xdead_beefu32).into());

        assert_eq!(
            memory.read_bytes(word(28), word(4)),
            Some(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert_eq!(memory.read_bytes(word(0), word(0)), Some(Vec::new()));

        memory.store_8(word(0), Word::Symbolic(Symbol::Unknown));
        assert_eq!(memory.read_bytes(word(0), word(4)), None);
    }
}
