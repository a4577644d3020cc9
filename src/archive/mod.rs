//! Named-entry byte stores that packages are read from
//!
//! The package core only needs two things from an archive: whether an
//! entry exists, and a fresh stream over its bytes. [`ReadArchive`] is that
//! contract. Two stores implement it:
//! - [`ArchiveReader`]: the on-disk container format (optionally
//!   compressed, CRC-checked entries behind a central directory)
//! - [`MemoryArchive`]: entries held in memory

mod format;
mod memory;
mod reader;
mod writer;

pub use format::{
    CompressionMethod, EntryInfo, FileHeader, ENTRY_FIXED_SIZE, FORMAT_VERSION_MAJOR,
    FORMAT_VERSION_MINOR, HEADER_SIZE, MAGIC_NUMBER, MAX_PATH_LENGTH,
};
pub use memory::MemoryArchive;
pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;

use crate::error::Result;
use std::io::Read;
use std::sync::Arc;

/// A readable stream over the bytes of one archive entry
pub type EntryStream = Box<dyn Read + Send>;

/// Read access to a store of named binary entries
///
/// Keys are `/`-delimited strings. Implementations must be safe to share
/// between threads; every call to [`ReadArchive::open_entry`] returns an
/// independent stream.
pub trait ReadArchive: Send + Sync {
    /// Check whether an entry exists
    fn has_entry(&self, key: &str) -> bool;

    /// Open a fresh stream over an entry
    ///
    /// Returns `Ok(None)` if the entry does not exist. Errors are reserved
    /// for entries that exist but cannot be read.
    fn open_entry(&self, key: &str) -> Result<Option<EntryStream>>;

    /// List every entry key
    fn entries(&self) -> Vec<String>;
}

impl<A: ReadArchive + ?Sized> ReadArchive for Arc<A> {
    fn has_entry(&self, key: &str) -> bool {
        (**self).has_entry(key)
    }

    fn open_entry(&self, key: &str) -> Result<Option<EntryStream>> {
        (**self).open_entry(key)
    }

    fn entries(&self) -> Vec<String> {
        (**self).entries()
    }
}

impl<A: ReadArchive + ?Sized> ReadArchive for Box<A> {
    fn has_entry(&self, key: &str) -> bool {
        (**self).has_entry(key)
    }

    fn open_entry(&self, key: &str) -> Result<Option<EntryStream>> {
        (**self).open_entry(key)
    }

    fn entries(&self) -> Vec<String> {
        (**self).entries()
    }
}
