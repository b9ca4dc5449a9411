//! This module contains the definition of the abstract machine's storage
//! containers, used for both persistent and transient storage.

use std::collections::HashMap;

use crate::vm::value::{known::KnownWord, Symbol, Word};

/// A representation of a word-addressed storage of the abstract machine.
///
/// On a real EVM every slot is initialized to some value the analysis cannot
/// see, so reading a slot that has not been written during the analysis yields
/// the symbol this storage was created with.
///
/// Writes to known slots are tracked exactly. A write to a symbolic slot may
/// have hit any slot, so it discards everything known.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Storage {
    /// The slots written during the analysis.
    known_slots: HashMap<KnownWord, Word>,

    /// The symbol read from slots whose contents are not known.
    unwritten: Symbol,
}

impl Storage {
    /// Creates a new, empty storage whose unwritten slots read as `unwritten`.
    #[must_use]
    pub fn new(unwritten: Symbol) -> Self {
        let known_slots = HashMap::new();
        Self {
            known_slots,
            unwritten,
        }
    }

    /// Creates a new, empty persistent storage as accessed by `SLOAD` and
    /// `SSTORE`.
    #[must_use]
    pub fn persistent() -> Self {
        Self::new(Symbol::StorageLoad)
    }

    /// Creates a new, empty transient storage as accessed by `TLOAD` and
    /// `TSTORE`.
    #[must_use]
    pub fn transient() -> Self {
        Self::new(Symbol::TransientLoad)
    }

    /// Stores the provided `value` in storage at the provided `key`,
    /// overwriting any existing value at that key.
    pub fn store(&mut self, key: Word, value: Word) {
        match key {
            Word::Concrete(key) => {
                self.known_slots.insert(key, value);
            }
            Word::Symbolic(_) => {
                tracing::trace!("Storage clobbered by a write to a symbolic slot");
                self.known_slots.clear();
            }
        }
    }

    /// Loads the value found at the provided `key`.
    ///
    /// This returns the most-recently written value, or the symbol for
    /// unwritten slots if the slot has not been written to.
    #[must_use]
    pub fn load(&self, key: Word) -> Word {
        key.known()
            .and_then(|key| self.known_slots.get(&key).copied())
            .unwrap_or(Word::Symbolic(self.unwritten))
    }

    /// Gets the number of slots in the storage that have known contents.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.known_slots.len()
    }

    /// Gets the slot keys for this storage that have known contents.
    #[must_use]
    pub fn keys(&self) -> Vec<&KnownWord> {
        self.known_slots.keys().collect()
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::persistent()
    }
}

#[cfg(test)]
mod test {
    use crate::vm::{
        state::storage::Storage,
        value::{Symbol, Word},
    };

    #[test]
    fn can_construct_new_storage() {
        let storage = Storage::default();
        assert_eq!(storage.entry_count(), 0);
        assert!(storage.keys().is_empty());
    }

    #[test]
    fn unwritten_slots_are_symbolic() {
        let persistent = Storage::persistent();
        let transient = Storage::transient();

        assert_eq!(
            persistent.load(Word::from(1usize)),
            Word::Symbolic(Symbol::StorageLoad)
        );
        assert_eq!(
            transient.load(Word::from(1usize)),
            Word::Symbolic(Symbol::TransientLoad)
        );
    }

    #[test]
    fn can_store_and_load_known_slots() {
        let mut storage = Storage::default();
        storage.store(Word::from(1usize), Word::from(7usize));
        storage.store(Word::from(2usize), Word::Symbolic(Symbol::Caller));
        storage.store(Word::from(1usize), Word::from(8usize));

        assert_eq!(storage.load(Word::from(1usize)), Word::from(8usize));
        assert_eq!(
            storage.load(Word::from(2usize)),
            Word::Symbolic(Symbol::Caller)
        );
        assert_eq!(storage.entry_count(), 2);
    }

    #[test]
    fn symbolic_slot_writes_forget_known_slots() {
        let mut storage = Storage::default();
        storage.store(Word::from(1usize), Word::from(7usize));
        storage.store(Word::Symbolic(Symbol::CallDataLoad), Word::from(8usize));

        assert_eq!(
            storage.load(Word::from(1usize)),
            Word::Symbolic(Symbol::StorageLoad)
        );
        assert_eq!(
            storage.load(Word::Symbolic(Symbol::CallDataLoad)),
            Word::Symbolic(Symbol::StorageLoad)
        );
    }
}
