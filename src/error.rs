use crate::id::AssetId;
use std::io;
use thiserror::Error;

/// Result type for asset package operations
pub type Result<T> = std::result::Result<T, PackageError>;

/// Unified error type for all asset package operations
#[derive(Debug, Error)]
pub enum PackageError {
    // Package errors
    #[error("Malformed package: {0}")]
    MalformedPackage(String),

    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(
        "Asset {id} was previously loaded as {cached}, which does not match the requested type {requested}"
    )]
    TypeMismatch {
        id: AssetId,
        cached: &'static str,
        requested: &'static str,
    },

    #[error("Asset {0} is not cached and cannot be loaded while another asset is being deserialized")]
    ReentrancyViolation(AssetId),

    #[error("Deserializing asset {0} returned no object")]
    NullResult(AssetId),

    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("No deserializer for {type_name} accepts asset {id}")]
    NoDeserializer { id: AssetId, type_name: &'static str },

    #[error("Failed to parse {entry} at line {line}: {message}")]
    IndexParse {
        entry: &'static str,
        line: usize,
        message: String,
    },

    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("Package has been closed")]
    Disposed,

    // Archive errors
    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    #[error("Invalid magic number in archive header")]
    InvalidMagic,

    #[error("Unsupported archive version: {0}.{1}")]
    UnsupportedVersion(u16, u16),

    #[error("Invalid compression method: {0}")]
    InvalidCompression(u8),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("CRC mismatch in {path}: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },

    #[error("Path error: {0}")]
    PathError(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PackageError {
    pub(crate) fn parse(entry: &'static str, line: usize, message: impl Into<String>) -> Self {
        PackageError::IndexParse {
            entry,
            line,
            message: message.into(),
        }
    }
}
