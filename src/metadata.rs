//! Metadata records stored as JSON inside a package
//!
//! ```text
//! package.json                  package-level record
//! metadata/<asset path>.json    one record per asset
//! ```

use crate::error::Result;
use crate::id::{AssetId, PackageId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known entry holding the package record
pub const PACKAGE_METADATA_ENTRY: &str = "package.json";

/// Package-level record from `package.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package identifier
    pub id: PackageId,

    /// Human-readable name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Engine version the package was built for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,

    #[serde(default)]
    pub asset_count: usize,

    #[serde(default)]
    pub folder_count: usize,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: PackageId::from_path(&name),
            name,
            description: None,
            engine_version: None,
            asset_count: 0,
            folder_count: 0,
        }
    }

    /// Parse from JSON
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Per-asset record from `metadata/<path>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub id: AssetId,

    /// Asset path inside the package, without the `assets/` prefix
    pub path: String,

    /// Payload size in bytes
    #[serde(default)]
    pub size: u64,

    /// MIME type of the payload, e.g. `image/png`
    #[serde(default)]
    pub mime_type: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Free-form settings for deserializers (filtering, loop points, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl AssetMetadata {
    pub fn new(path: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: AssetId::from_path(&path),
            path,
            size: 0,
            mime_type: mime_type.into(),
            tags: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Parse from JSON
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// File extension of the asset path, lowercased
    pub fn extension(&self) -> Option<String> {
        let file_name = self.path.rsplit('/').next()?;
        let (_, extension) = file_name.rsplit_once('.')?;
        Some(extension.to_lowercase())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
