//! assetpack: read-only asset packages
//!
//! An asset package is an archive of named payloads plus a few index tables
//! that give every asset a stable [`AssetId`], place it in a folder
//! hierarchy and attach tags to it. This crate provides:
//! - Stable path-derived ids with a string encoding
//! - Folder enumeration and tag queries over eagerly parsed index tables
//! - Lazily read, memoized per-asset metadata
//! - Typed loading through pluggable deserializers, with at most one cached
//!   object per asset
//! - A compressed, CRC-checked container format to store packages in
//!
//! # Example
//!
//! ```no_run
//! use assetpack::{AssetId, AssetPackage, DeserializerRegistry};
//!
//! let package = AssetPackage::open_file("base.wpk", DeserializerRegistry::with_defaults())?;
//!
//! for id in package.enumerate("shaders", true) {
//!     let source = package.load::<String>(id)?;
//!     println!("{}: {} bytes", package.get_path(id)?, source.len());
//! }
//!
//! let logo = package.load_path::<Vec<u8>>("ui/logo.png")?;
//! assert!(package.is_cached(AssetId::from_path("ui/logo.png")));
//! # drop(logo);
//! # Ok::<(), assetpack::PackageError>(())
//! ```

pub mod archive;
pub mod asset;
mod cache;
pub mod deserialize;
pub mod error;
pub mod id;
pub mod index;
pub mod lock;
pub mod metadata;
pub mod package;
pub mod path;

pub use archive::{
    ArchiveReader, ArchiveWriter, CompressionMethod, EntryInfo, EntryStream, FileHeader,
    MemoryArchive, ReadArchive, FORMAT_VERSION_MAJOR, FORMAT_VERSION_MINOR, HEADER_SIZE,
    MAGIC_NUMBER, MAX_PATH_LENGTH,
};
pub use asset::{Asset, PackageAsset};
pub use deserialize::{
    AssetDeserializer, BytesDeserializer, DeserializerRegistry, FnDeserializer, JsonDeserializer,
    TextDeserializer,
};
pub use error::{PackageError, Result};
pub use id::{AssetId, PackageId};
pub use index::AssetFolder;
pub use metadata::{AssetMetadata, PackageMetadata};
pub use package::AssetPackage;
