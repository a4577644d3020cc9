//! The asset package: index tables, metadata cache and object cache over
//! one archive
//!
//! Opening a package reads four well-known entries up front:
//!
//! ```text
//! package.json      package record
//! guid_table.txt    id → asset path
//! hierarchy.txt     folder → asset ids
//! tag_table.txt     tag → asset ids
//! ```
//!
//! Asset payloads (`assets/<path>`) and per-asset metadata
//! (`metadata/<path>.json`) are only read on demand.
//!
//! Deserialized objects are cached per id. Loading is serialized across the
//! package, and a deserializer may only load assets that are already cached:
//! anything else would need a second deserialization while the first is
//! still running.

use crate::archive::{ArchiveReader, EntryStream, ReadArchive};
use crate::asset::{Asset, PackageAsset};
use crate::cache::{CachedObject, ObjectCache};
use crate::deserialize::DeserializerRegistry;
use crate::error::{PackageError, Result};
use crate::id::{AssetId, PackageId};
use crate::index::{AssetFolder, FolderTree, GuidTable, TagTable, GUID_TABLE_ENTRY, HIERARCHY_ENTRY, TAG_TABLE_ENTRY};
use crate::lock::ReentrantRwLock;
use crate::metadata::{AssetMetadata, PackageMetadata, PACKAGE_METADATA_ENTRY};
use crate::path::{asset_entry_key, metadata_entry_key};
use parking_lot::{Mutex, RwLock};
use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Idle,
    Deserializing,
}

/// Marks the package as deserializing until dropped
struct DeserializingScope<'a> {
    state: &'a Mutex<LoadState>,
}

impl<'a> DeserializingScope<'a> {
    fn enter(state: &'a Mutex<LoadState>) -> Self {
        *state.lock() = LoadState::Deserializing;
        Self { state }
    }
}

impl Drop for DeserializingScope<'_> {
    fn drop(&mut self) {
        *self.state.lock() = LoadState::Idle;
    }
}

/// A read-only collection of assets addressed by [`AssetId`]
pub struct AssetPackage {
    metadata: PackageMetadata,
    archive: RwLock<Option<Arc<dyn ReadArchive>>>,
    guid_table: GuidTable,
    folders: FolderTree,
    tags: TagTable,
    all: HashSet<AssetId>,
    registry: Arc<DeserializerRegistry>,
    metadata_cache: RwLock<HashMap<AssetId, Arc<AssetMetadata>>>,
    objects: ObjectCache,
    lock: ReentrantRwLock,
    state: Mutex<LoadState>,
    closed: AtomicBool,
}

impl AssetPackage {
    /// Open a package from any archive
    ///
    /// Fails without side effects if a required entry is missing or an
    /// index table is malformed.
    pub fn open<A>(archive: A, registry: impl Into<Arc<DeserializerRegistry>>) -> Result<Self>
    where
        A: ReadArchive + 'static,
    {
        let archive: Arc<dyn ReadArchive> = Arc::new(archive);

        let metadata = PackageMetadata::from_json(&read_required(&*archive, PACKAGE_METADATA_ENTRY)?)
            .map_err(|e| {
                PackageError::MalformedPackage(format!("{} is invalid: {}", PACKAGE_METADATA_ENTRY, e))
            })?;
        let guid_table = GuidTable::parse(&read_required_text(&*archive, GUID_TABLE_ENTRY)?)?;
        let folders = FolderTree::parse(&read_required_text(&*archive, HIERARCHY_ENTRY)?)?;
        let tags = TagTable::parse(&read_required_text(&*archive, TAG_TABLE_ENTRY)?)?;
        let all: HashSet<AssetId> = folders.all_assets().collect();

        debug!(
            package = %metadata.name,
            id = %metadata.id,
            assets = guid_table.len(),
            folders = folders.len(),
            tags = tags.len(),
            "opened asset package"
        );

        Ok(Self {
            metadata,
            archive: RwLock::new(Some(archive)),
            guid_table,
            folders,
            tags,
            all,
            registry: registry.into(),
            metadata_cache: RwLock::new(HashMap::new()),
            objects: ObjectCache::default(),
            lock: ReentrantRwLock::new(),
            state: Mutex::new(LoadState::Idle),
            closed: AtomicBool::new(false),
        })
    }

    /// Open a package stored in the container format on disk
    pub fn open_file<P: AsRef<Path>>(
        path: P,
        registry: impl Into<Arc<DeserializerRegistry>>,
    ) -> Result<Self> {
        Self::open(ArchiveReader::open(path)?, registry)
    }

    /// Open a package from a container-format stream
    pub fn from_reader<R>(reader: R, registry: impl Into<Arc<DeserializerRegistry>>) -> Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        Self::open(ArchiveReader::from_reader(reader)?, registry)
    }

    /// Package record from `package.json`
    pub fn metadata(&self) -> &PackageMetadata {
        &self.metadata
    }

    pub fn id(&self) -> PackageId {
        self.metadata.id
    }

    pub fn registry(&self) -> &DeserializerRegistry {
        &self.registry
    }

    /// Path of an asset inside the package
    pub fn get_path(&self, id: AssetId) -> Result<&str> {
        require_some(id)?;
        self.guid_table
            .get(id)
            .ok_or_else(|| PackageError::NotFound(format!("asset {} does not exist", id)))
    }

    /// Whether the guid table knows the id
    pub fn has_asset(&self, id: AssetId) -> bool {
        !id.is_none() && self.guid_table.contains(id)
    }

    /// Handle to an asset's metadata and payload
    pub fn get_asset(&self, id: AssetId) -> Result<Asset> {
        let path = self.get_path(id)?;
        let key = asset_entry_key(path);

        let archive = self.archive()?;
        if !archive.has_entry(&key) {
            return Err(PackageError::MalformedPackage(format!(
                "asset {} at path {:?} has no payload",
                id, path
            )));
        }

        let metadata = self.get_metadata(id)?;
        let weak: Weak<dyn ReadArchive> = Arc::downgrade(&archive);
        Ok(Asset::new(metadata, move || open_payload(&weak, &key)))
    }

    /// Metadata record of an asset, read once and then served from memory
    pub fn get_metadata(&self, id: AssetId) -> Result<Arc<AssetMetadata>> {
        let path = self.get_path(id)?;

        if let Some(metadata) = self.metadata_cache.read().get(&id) {
            return Ok(Arc::clone(metadata));
        }

        let key = metadata_entry_key(path);
        let archive = self.archive()?;
        let mut stream = archive.open_entry(&key)?.ok_or_else(|| {
            PackageError::MalformedPackage(format!(
                "asset {} at path {:?} has no metadata",
                id, path
            ))
        })?;
        let mut json = Vec::new();
        stream.read_to_end(&mut json)?;
        let metadata = AssetMetadata::from_json(&json)
            .map_err(|e| PackageError::MalformedPackage(format!("{} is invalid: {}", key, e)))?;

        // Another thread may have raced us here; keep whichever landed first
        let mut cache = self.metadata_cache.write();
        let metadata = cache.entry(id).or_insert_with(|| Arc::new(metadata));
        Ok(Arc::clone(metadata))
    }

    /// Load an asset as `T`, deserializing it on first use
    ///
    /// Every later call returns the same shared object. Asking for a type
    /// other than the one the asset was first loaded as is an error.
    pub fn load<T: PackageAsset>(&self, id: AssetId) -> Result<Arc<T>> {
        {
            let _read = self.lock.read();
            self.ensure_open()?;
            self.get_metadata(id)?;
            if let Some(cached) = self.objects.get(id) {
                trace!(%id, "asset cache hit");
                return downcast_cached(id, &cached);
            }
        }

        let upgradeable = self.lock.upgradeable()?;
        self.ensure_open()?;

        if let Some(cached) = self.objects.get(id) {
            return downcast_cached(id, &cached);
        }

        if *self.state.lock() == LoadState::Deserializing {
            return Err(PackageError::ReentrancyViolation(id));
        }

        let _write = upgradeable.upgrade()?;
        let _scope = DeserializingScope::enter(&self.state);

        debug!(%id, target_type = type_name::<T>(), "deserializing asset");
        let asset = self.get_asset(id)?;
        let object = self
            .registry
            .deserialize::<T>(id, &asset, self)?
            .ok_or(PackageError::NullResult(id))?;
        let object = Arc::new(object);
        let cached = CachedObject::new(Arc::clone(&object));

        // A deserializer that closed the package already ran its teardown
        if self.is_closed() {
            debug!(%id, "package closed during deserialization, disposing result");
            cached.dispose();
            return Err(PackageError::Disposed);
        }

        self.objects.insert(id, cached)?;
        debug!(%id, "asset deserialized and cached");
        Ok(object)
    }

    /// Load an asset by path; see [`AssetPackage::load`]
    pub fn load_path<T: PackageAsset>(&self, path: &str) -> Result<Arc<T>> {
        self.load(AssetId::from_path(path))
    }

    /// Deserialize a fresh object that the package does not keep
    ///
    /// The caller owns the result and is responsible for its lifetime.
    pub fn load_uncached<T: PackageAsset>(&self, id: AssetId) -> Result<T> {
        require_some(id)?;
        let _write = self.lock.write()?;
        self.ensure_open()?;

        debug!(%id, target_type = type_name::<T>(), "deserializing uncached asset");
        let asset = self.get_asset(id)?;
        self.registry
            .deserialize::<T>(id, &asset, self)?
            .ok_or(PackageError::NullResult(id))
    }

    /// Drop a cached object and run its dispose hook
    ///
    /// Does nothing if the asset is not cached.
    pub fn dispose_of(&self, id: AssetId) -> Result<()> {
        let _write = self.lock.write()?;
        if let Some(object) = self.objects.remove(id) {
            debug!(%id, cached_type = object.type_name(), "disposing cached asset");
            object.dispose();
        }
        Ok(())
    }

    pub fn is_cached(&self, id: AssetId) -> bool {
        self.objects.contains(id)
    }

    /// The cached object for an id, whatever type it was loaded as
    pub fn try_get_cached(&self, id: AssetId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.objects.get(id).map(|cached| cached.value())
    }

    /// The cached object for an id if it was loaded as `T`
    pub fn try_get_cached_as<T: PackageAsset>(&self, id: AssetId) -> Option<Arc<T>> {
        self.objects.get(id)?.downcast::<T>()
    }

    /// Assets in a folder, optionally including every subfolder
    ///
    /// An unknown folder yields nothing.
    pub fn enumerate(&self, folder: &str, recursive: bool) -> Vec<AssetId> {
        self.folders.enumerate(folder, recursive)
    }

    /// Names of the direct subfolders of a folder
    pub fn subfolders(&self, folder: &str) -> Vec<&str> {
        self.folders.subfolders(folder)
    }

    pub fn has_folder(&self, folder: &str) -> bool {
        self.folders.resolve(folder).is_some()
    }

    /// Folder node at a path, with its name and direct assets
    pub fn folder(&self, folder: &str) -> Option<&AssetFolder> {
        self.folders.resolve(folder).and_then(|index| self.folders.folder(index))
    }

    /// Assets carrying a tag; empty for unknown tags
    pub fn query_tags(&self, tag: &str) -> &[AssetId] {
        self.tags.query(tag)
    }

    /// Every tag used in the package
    pub fn tags(&self) -> Vec<&str> {
        self.tags.tags().collect()
    }

    /// Every asset listed in the hierarchy
    pub fn all(&self) -> &HashSet<AssetId> {
        &self.all
    }

    /// Dispose every cached object and release the archive
    ///
    /// Safe to call more than once. Index queries keep working afterwards,
    /// anything that needs the archive fails with [`PackageError::Disposed`].
    pub fn close(&self) -> Result<()> {
        let _write = self.lock.write()?;
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let objects = self.objects.drain();
        debug!(package = %self.metadata.name, disposed = objects.len(), "closing asset package");
        for (_, object) in objects {
            object.dispose();
        }
        self.metadata_cache.write().clear();
        self.archive.write().take();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(PackageError::Disposed);
        }
        Ok(())
    }

    fn archive(&self) -> Result<Arc<dyn ReadArchive>> {
        self.archive.read().clone().ok_or(PackageError::Disposed)
    }
}

impl Drop for AssetPackage {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!(error = %e, "failed to close asset package on drop");
        }
    }
}

impl fmt::Debug for AssetPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetPackage")
            .field("id", &self.metadata.id)
            .field("name", &self.metadata.name)
            .field("assets", &self.guid_table.len())
            .field("cached", &self.objects.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn require_some(id: AssetId) -> Result<()> {
    if id.is_none() {
        return Err(PackageError::InvalidArgument("asset id is None".to_string()));
    }
    Ok(())
}

fn downcast_cached<T: PackageAsset>(id: AssetId, cached: &CachedObject) -> Result<Arc<T>> {
    cached.downcast::<T>().ok_or(PackageError::TypeMismatch {
        id,
        cached: cached.type_name(),
        requested: type_name::<T>(),
    })
}

fn open_payload(archive: &Weak<dyn ReadArchive>, key: &str) -> Result<EntryStream> {
    let archive = archive.upgrade().ok_or(PackageError::Disposed)?;
    archive
        .open_entry(key)?
        .ok_or_else(|| PackageError::MalformedPackage(format!("entry {} disappeared", key)))
}

fn read_required(archive: &dyn ReadArchive, entry: &str) -> Result<Vec<u8>> {
    let mut stream = archive.open_entry(entry)?.ok_or_else(|| {
        PackageError::MalformedPackage(format!("archive has no {}", entry))
    })?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}

fn read_required_text(archive: &dyn ReadArchive, entry: &str) -> Result<String> {
    String::from_utf8(read_required(archive, entry)?)
        .map_err(|_| PackageError::MalformedPackage(format!("{} is not valid UTF-8", entry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;

    fn metadata_json(id: i32, path: &str, mime: &str) -> Vec<u8> {
        let mut metadata = AssetMetadata::new(path, mime);
        metadata.id = AssetId::new(id);
        metadata.to_json().unwrap()
    }

    fn sample_archive() -> MemoryArchive {
        MemoryArchive::new()
            .with_entry("package.json", PackageMetadata::new("sample").to_json().unwrap())
            .with_entry("guid_table.txt", "1\nfoo/bar.txt\n2\nfoo/baz.txt\n")
            .with_entry("hierarchy.txt", "foo\n2\n1\n2\n")
            .with_entry("tag_table.txt", "text\n2\n1\n2\n")
            .with_entry("assets/foo/bar.txt", "bar")
            .with_entry("assets/foo/baz.txt", "baz")
            .with_entry("metadata/foo/bar.txt.json", metadata_json(1, "foo/bar.txt", "text/plain"))
            .with_entry("metadata/foo/baz.txt.json", metadata_json(2, "foo/baz.txt", "text/plain"))
    }

    fn sample() -> AssetPackage {
        AssetPackage::open(sample_archive(), DeserializerRegistry::with_defaults()).unwrap()
    }

    #[test]
    fn test_open_and_query() {
        let package = sample();
        assert_eq!(package.metadata().name, "sample");
        assert_eq!(package.get_path(AssetId::new(1)).unwrap(), "foo/bar.txt");
        assert_eq!(package.enumerate("foo", false), vec![AssetId::new(1), AssetId::new(2)]);
        assert_eq!(package.query_tags("text").len(), 2);
        assert!(package.query_tags("audio").is_empty());
        assert_eq!(package.all().len(), 2);
        assert!(package.has_folder("/foo/"));
    }

    #[test]
    fn test_metadata_is_memoized() {
        let package = sample();
        let first = package.get_metadata(AssetId::new(1)).unwrap();
        let second = package.get_metadata(AssetId::new(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.mime_type, "text/plain");
    }

    #[test]
    fn test_load_caches() {
        let package = sample();
        let first = package.load::<String>(AssetId::new(1)).unwrap();
        let second = package.load::<String>(AssetId::new(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.as_str(), "bar");
        assert!(package.is_cached(AssetId::new(1)));
        assert!(package.try_get_cached_as::<Vec<u8>>(AssetId::new(1)).is_none());
    }

    #[test]
    fn test_scope_resets_state_on_error() {
        let package = sample();
        // No deserializer for this type
        struct Unknown;
        impl PackageAsset for Unknown {}
        assert!(matches!(
            package.load::<Unknown>(AssetId::new(1)),
            Err(PackageError::NoDeserializer { .. })
        ));
        assert_eq!(*package.state.lock(), LoadState::Idle);
        assert!(package.load::<String>(AssetId::new(1)).is_ok());
    }

    #[test]
    fn test_errors_report_requested_id() {
        // Metadata record claims a different id than the guid table
        let archive = sample_archive()
            .with_entry("metadata/foo/bar.txt.json", metadata_json(99, "foo/bar.txt", "text/plain"));
        let package = AssetPackage::open(archive, DeserializerRegistry::with_defaults()).unwrap();

        struct Unknown;
        impl PackageAsset for Unknown {}
        match package.load::<Unknown>(AssetId::new(1)) {
            Err(PackageError::NoDeserializer { id, .. }) => assert_eq!(id, AssetId::new(1)),
            other => panic!("Expected NoDeserializer, got: {:?}", other.map(|_| ())),
        }
        assert!(matches!(
            package.load_uncached::<Unknown>(AssetId::new(1)),
            Err(PackageError::NoDeserializer { id, .. }) if id == AssetId::new(1)
        ));
    }

    #[test]
    fn test_bad_package_json_is_malformed() {
        let archive = sample_archive().with_entry("package.json", "not json");
        assert!(matches!(
            AssetPackage::open(archive, DeserializerRegistry::new()),
            Err(PackageError::MalformedPackage(_))
        ));
    }

    #[test]
    fn test_asset_outlived_by_close() {
        let package = sample();
        let asset = package.get_asset(AssetId::new(2)).unwrap();
        assert_eq!(asset.read_string().unwrap(), "baz");
        package.close().unwrap();
        assert!(matches!(asset.open(), Err(PackageError::Disposed)));
    }
}
