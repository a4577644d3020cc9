//! Pluggable deserializers that turn asset bytes into typed objects
//!
//! A [`DeserializerRegistry`] holds, per target type, an ordered list of
//! deserializers. When a package loads an asset as `T`, the first
//! deserializer for `T` whose [`AssetDeserializer::is_candidate`] accepts the
//! asset's metadata is used.
//!
//! ```
//! use assetpack::{Asset, AssetPackage, DeserializerRegistry, PackageAsset, Result};
//!
//! struct Shader {
//!     source: String,
//! }
//!
//! impl PackageAsset for Shader {}
//!
//! let registry = DeserializerRegistry::with_defaults().with_fn(
//!     |asset: &Asset, _package: &AssetPackage| -> Result<Option<Shader>> {
//!         Ok(Some(Shader { source: asset.read_string()? }))
//!     },
//! );
//! assert!(registry.supports::<Shader>());
//! assert!(registry.supports::<String>());
//! ```

use crate::asset::{Asset, PackageAsset};
use crate::error::{PackageError, Result};
use crate::id::AssetId;
use crate::metadata::AssetMetadata;
use crate::package::AssetPackage;
use serde::de::DeserializeOwned;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Converts an [`Asset`] into an object of type `T`
///
/// Returning `Ok(None)` means the deserializer produced nothing; the
/// package reports that as [`PackageError::NullResult`].
///
/// The package is passed in so a deserializer can reuse other assets of
/// the same package, e.g. a material fetching its textures. Only assets
/// that are already cached can be loaded from inside a deserializer.
pub trait AssetDeserializer<T>: Send + Sync {
    /// Whether this deserializer can handle the asset
    fn is_candidate(&self, metadata: &AssetMetadata) -> bool {
        let _ = metadata;
        true
    }

    fn deserialize(&self, asset: &Asset, package: &AssetPackage) -> Result<Option<T>>;
}

/// Adapter that lets a closure act as a deserializer
pub struct FnDeserializer<F> {
    f: F,
}

impl<T, F> AssetDeserializer<T> for FnDeserializer<F>
where
    F: Fn(&Asset, &AssetPackage) -> Result<Option<T>> + Send + Sync,
{
    fn deserialize(&self, asset: &Asset, package: &AssetPackage) -> Result<Option<T>> {
        (self.f)(asset, package)
    }
}

struct TypedDeserializers<T> {
    list: Vec<Box<dyn AssetDeserializer<T>>>,
}

/// Per-type deserializer lookup
#[derive(Default)]
pub struct DeserializerRegistry {
    by_type: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl DeserializerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in byte, text and JSON deserializers
    pub fn with_defaults() -> Self {
        Self::new()
            .with::<Vec<u8>, _>(BytesDeserializer)
            .with::<String, _>(TextDeserializer)
            .with::<serde_json::Value, _>(JsonDeserializer::new())
    }

    /// Append a deserializer for `T`
    pub fn register<T, D>(&mut self, deserializer: D) -> &mut Self
    where
        T: PackageAsset,
        D: AssetDeserializer<T> + 'static,
    {
        let slot = self
            .by_type
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(TypedDeserializers::<T> { list: Vec::new() }));

        // The slot for TypeId::of::<T>() always holds TypedDeserializers<T>
        if let Some(typed) = slot.downcast_mut::<TypedDeserializers<T>>() {
            typed.list.push(Box::new(deserializer));
        }
        self
    }

    /// Append a closure deserializer for `T`
    pub fn register_fn<T, F>(&mut self, f: F) -> &mut Self
    where
        T: PackageAsset,
        F: Fn(&Asset, &AssetPackage) -> Result<Option<T>> + Send + Sync + 'static,
    {
        self.register::<T, _>(FnDeserializer { f })
    }

    /// Builder-style [`DeserializerRegistry::register`]
    pub fn with<T, D>(mut self, deserializer: D) -> Self
    where
        T: PackageAsset,
        D: AssetDeserializer<T> + 'static,
    {
        self.register::<T, D>(deserializer);
        self
    }

    /// Builder-style [`DeserializerRegistry::register_fn`]
    pub fn with_fn<T, F>(mut self, f: F) -> Self
    where
        T: PackageAsset,
        F: Fn(&Asset, &AssetPackage) -> Result<Option<T>> + Send + Sync + 'static,
    {
        self.register_fn::<T, F>(f);
        self
    }

    /// Whether any deserializer is registered for `T`
    pub fn supports<T: PackageAsset>(&self) -> bool {
        self.typed::<T>().map_or(false, |typed| !typed.list.is_empty())
    }

    /// Find the first deserializer for `T` that accepts the asset
    pub fn find<T: PackageAsset>(&self, metadata: &AssetMetadata) -> Option<&dyn AssetDeserializer<T>> {
        self.typed::<T>()?
            .list
            .iter()
            .find(|d| d.is_candidate(metadata))
            .map(|d| d.as_ref())
    }

    /// Deserialize the asset loaded for `id` as `T`
    ///
    /// `id` is the id the caller asked for; errors report it rather than
    /// whatever the metadata record says.
    pub fn deserialize<T: PackageAsset>(
        &self,
        id: AssetId,
        asset: &Asset,
        package: &AssetPackage,
    ) -> Result<Option<T>> {
        let deserializer =
            self.find::<T>(asset.metadata())
                .ok_or_else(|| PackageError::NoDeserializer {
                    id,
                    type_name: type_name::<T>(),
                })?;
        deserializer.deserialize(asset, package)
    }

    fn typed<T: PackageAsset>(&self) -> Option<&TypedDeserializers<T>> {
        self.by_type
            .get(&TypeId::of::<T>())?
            .downcast_ref::<TypedDeserializers<T>>()
    }
}

impl fmt::Debug for DeserializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializerRegistry")
            .field("types", &self.by_type.len())
            .finish()
    }
}

fn is_json(metadata: &AssetMetadata) -> bool {
    metadata.mime_type == "application/json" || metadata.extension().as_deref() == Some("json")
}

/// Raw payload bytes; accepts every asset
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDeserializer;

impl AssetDeserializer<Vec<u8>> for BytesDeserializer {
    fn deserialize(&self, asset: &Asset, _package: &AssetPackage) -> Result<Option<Vec<u8>>> {
        asset.read_bytes().map(Some)
    }
}

/// UTF-8 text for `text/*` and structured text assets
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDeserializer;

impl AssetDeserializer<String> for TextDeserializer {
    fn is_candidate(&self, metadata: &AssetMetadata) -> bool {
        let mime = metadata.mime_type.as_str();
        if mime.starts_with("text/") || mime == "application/json" || mime == "application/xml" {
            return true;
        }
        matches!(
            metadata.extension().as_deref(),
            Some("txt" | "json" | "xml" | "csv" | "md" | "glsl" | "frag" | "vert" | "wgsl")
        )
    }

    fn deserialize(&self, asset: &Asset, _package: &AssetPackage) -> Result<Option<String>> {
        asset.read_string().map(Some)
    }
}

/// JSON assets deserialized with serde into `T`
pub struct JsonDeserializer<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> JsonDeserializer<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }
}

impl<T> Default for JsonDeserializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> AssetDeserializer<T> for JsonDeserializer<T> {
    fn is_candidate(&self, metadata: &AssetMetadata) -> bool {
        is_json(metadata)
    }

    fn deserialize(&self, asset: &Asset, _package: &AssetPackage) -> Result<Option<T>> {
        let reader = std::io::BufReader::new(asset.open()?);
        Ok(Some(serde_json::from_reader(reader)?))
    }
}
