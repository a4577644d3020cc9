//! Lazy asset handles and the trait for deserialized asset types

use crate::archive::EntryStream;
use crate::error::Result;
use crate::id::AssetId;
use crate::metadata::AssetMetadata;
use std::any::Any;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::Arc;

/// A type that asset packages can deserialize into and cache
///
/// Cached objects are shared with callers through `Arc`, but the package
/// decides when an object leaves the cache. [`PackageAsset::dispose`] runs
/// at that point (on [`AssetPackage::dispose_of`](crate::AssetPackage::dispose_of)
/// or when the package is closed) so types that own external resources can
/// release them.
pub trait PackageAsset: Any + Send + Sync {
    fn dispose(&self) {}
}

impl PackageAsset for Vec<u8> {}
impl PackageAsset for String {}
impl PackageAsset for serde_json::Value {}

type StreamFactory = dyn Fn() -> Result<EntryStream> + Send + Sync;

/// Metadata plus a way to open the payload bytes
///
/// Nothing is read until [`Asset::open`] is called, and every call opens a
/// fresh stream, so the handle can be cloned and used from several places.
#[derive(Clone)]
pub struct Asset {
    metadata: Arc<AssetMetadata>,
    open: Arc<StreamFactory>,
}

impl Asset {
    pub fn new<F>(metadata: Arc<AssetMetadata>, open: F) -> Self
    where
        F: Fn() -> Result<EntryStream> + Send + Sync + 'static,
    {
        Self {
            metadata,
            open: Arc::new(open),
        }
    }

    /// Asset over bytes already in memory
    pub fn from_bytes(metadata: AssetMetadata, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        Self::new(Arc::new(metadata), move || {
            Ok(Box::new(Cursor::new(Arc::clone(&bytes))) as EntryStream)
        })
    }

    pub fn id(&self) -> AssetId {
        self.metadata.id
    }

    pub fn metadata(&self) -> &AssetMetadata {
        &self.metadata
    }

    /// Open a new stream over the payload
    pub fn open(&self) -> Result<EntryStream> {
        (self.open)()
    }

    /// Read the whole payload
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        // The recorded size is only a hint
        let mut data = Vec::with_capacity(self.metadata.size.min(1 << 24) as usize);
        self.open()?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Read the whole payload as UTF-8 text
    pub fn read_string(&self) -> Result<String> {
        let mut text = String::new();
        self.open()?.read_to_string(&mut text)?;
        Ok(text)
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.metadata.id)
            .field("path", &self.metadata.path)
            .finish_non_exhaustive()
    }
}
