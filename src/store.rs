//! In-memory record store
//!
//! Owns the process-wide uid-to-record mapping. Backed by an `IndexMap`
//! so iteration order is insertion order and stays stable across
//! deletions. All external mutation goes through the operation layer,
//! which uses the targeted mutators below; no `&mut EmailRecord` ever
//! escapes this module.

use indexmap::IndexMap;

use crate::models::{Classification, EmailRecord};

/// The single owned repository of email records
///
/// Constructed once per process and passed by handle to every operation.
/// Not internally synchronized: callers serialize access (the service
/// layer does so structurally through `&mut self` receivers).
#[derive(Debug, Default)]
pub struct EmailStore {
    /// Records keyed by uid, in insertion order
    entries: IndexMap<u32, EmailRecord>,
}

impl EmailStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record only if its uid is not already present
    ///
    /// Returns whether the record was inserted. Fetch relies on this to
    /// make re-fetching an already-stored uid a no-op.
    pub fn upsert_if_absent(&mut self, record: EmailRecord) -> bool {
        if self.entries.contains_key(&record.uid) {
            return false;
        }
        self.entries.insert(record.uid, record);
        true
    }

    /// Look up a record by uid
    pub fn get(&self, uid: u32) -> Option<&EmailRecord> {
        self.entries.get(&uid)
    }

    /// Whether a record exists for the uid
    pub fn contains(&self, uid: u32) -> bool {
        self.entries.contains_key(&uid)
    }

    /// Remove a record, returning whether one existed
    ///
    /// Uses `shift_remove` so the remaining records keep their insertion
    /// order.
    pub fn delete(&mut self, uid: u32) -> bool {
        self.entries.shift_remove(&uid).is_some()
    }

    /// Records matching a predicate, in insertion order
    ///
    /// The returned iterator is lazy and finite; call again to restart.
    pub fn scan<P>(&self, mut predicate: P) -> impl Iterator<Item = &EmailRecord>
    where
        P: FnMut(&EmailRecord) -> bool,
    {
        self.entries.values().filter(move |record| predicate(record))
    }

    /// All records, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &EmailRecord> {
        self.entries.values()
    }

    /// All stored uids, in insertion order
    pub fn uids(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overwrite a record's summary, returning whether the uid existed
    pub fn set_summary(&mut self, uid: u32, summary: String) -> bool {
        match self.entries.get_mut(&uid) {
            Some(record) => {
                record.summary = Some(summary);
                true
            }
            None => false,
        }
    }

    /// Overwrite a record's classification pair atomically, returning
    /// whether the uid existed
    pub fn set_classification(&mut self, uid: u32, classification: Classification) -> bool {
        match self.entries.get_mut(&uid) {
            Some(record) => {
                record.classification = classification;
                true
            }
            None => false,
        }
    }

    /// Set a record's read flag, returning whether the uid existed
    pub fn set_read(&mut self, uid: u32, is_read: bool) -> bool {
        match self.entries.get_mut(&uid) {
            Some(record) => {
                record.is_read = is_read;
                true
            }
            None => false,
        }
    }
}
