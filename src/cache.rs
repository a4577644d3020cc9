use crate::asset::PackageAsset;
use crate::error::{PackageError, Result};
use crate::id::AssetId;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type AnyObject = dyn Any + Send + Sync;

fn dispose_as<T: PackageAsset>(value: &AnyObject) {
    if let Some(value) = value.downcast_ref::<T>() {
        value.dispose();
    }
}

/// A deserialized object together with the type it was loaded as
#[derive(Clone)]
pub(crate) struct CachedObject {
    value: Arc<AnyObject>,
    type_id: TypeId,
    type_name: &'static str,
    dispose: fn(&AnyObject),
}

impl CachedObject {
    pub fn new<T: PackageAsset>(value: Arc<T>) -> Self {
        Self {
            value,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            dispose: dispose_as::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn value(&self) -> Arc<AnyObject> {
        Arc::clone(&self.value)
    }

    /// The object as `T`, or `None` if it was loaded as another type
    pub fn downcast<T: PackageAsset>(&self) -> Option<Arc<T>> {
        if self.type_id != TypeId::of::<T>() {
            return None;
        }
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    pub fn dispose(&self) {
        (self.dispose)(self.value.as_ref());
    }
}

/// Id → object map; at most one object per id
#[derive(Default)]
pub(crate) struct ObjectCache {
    objects: RwLock<HashMap<AssetId, CachedObject>>,
}

impl ObjectCache {
    pub fn get(&self, id: AssetId) -> Option<CachedObject> {
        self.objects.read().get(&id).cloned()
    }

    pub fn contains(&self, id: AssetId) -> bool {
        self.objects.read().contains_key(&id)
    }

    /// Insert a freshly deserialized object; an existing entry is an error
    pub fn insert(&self, id: AssetId, object: CachedObject) -> Result<()> {
        let mut objects = self.objects.write();
        if objects.contains_key(&id) {
            return Err(PackageError::InternalInconsistency(format!(
                "asset {} was cached while it was being deserialized",
                id
            )));
        }
        objects.insert(id, object);
        Ok(())
    }

    pub fn remove(&self, id: AssetId) -> Option<CachedObject> {
        self.objects.write().remove(&id)
    }

    /// Remove and return every cached object
    pub fn drain(&self) -> Vec<(AssetId, CachedObject)> {
        self.objects.write().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }
}
