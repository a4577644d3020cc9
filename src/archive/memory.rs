use crate::archive::{EntryStream, ReadArchive};
use crate::error::Result;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

/// Archive whose entries live in memory
///
/// Entry bytes are reference counted, so opening an entry never copies it.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), Arc::from(data.into()));
    }

    /// Builder-style [`MemoryArchive::insert`]
    pub fn with_entry(mut self, key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(key, data);
        self
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReadArchive for MemoryArchive {
    fn has_entry(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    fn open_entry(&self, key: &str) -> Result<Option<EntryStream>> {
        Ok(self
            .entries
            .get(key)
            .map(|data| Box::new(Cursor::new(Arc::clone(data))) as EntryStream))
    }

    fn entries(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
