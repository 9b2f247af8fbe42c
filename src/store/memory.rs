//! store::memory
//!
//! Deterministic in-memory object store.
//!
//! # Design
//!
//! `MemoryStore` backs the abstract [`ObjectStore`] contract with a single
//! owned object tree. It exists for deterministic testing and fixtures:
//! unit tests, the integration suite, and documentation examples all run
//! against it. A store opened read-only answers every read and refuses
//! every mutation with [`StoreError::Blocked`], which is exactly how the
//! engine sees a pre-run snapshot.
//!
//! # Example
//!
//! ```
//! use restage::core::types::{ContentPath, IdentityToken};
//! use restage::store::memory::MemoryStore;
//! use restage::store::{ContentObject, ObjectStore};
//!
//! let mut store = MemoryStore::new();
//! store
//!     .put(
//!         &ContentPath::root(),
//!         "projA",
//!         ContentObject::container(IdentityToken::new("p1").unwrap()),
//!     )
//!     .unwrap();
//!
//! let mut snapshot = store.read_only_view();
//! assert!(snapshot.contains(&ContentPath::new("projA").unwrap()).unwrap());
//! assert!(snapshot
//!     .put(
//!         &ContentPath::root(),
//!         "projB",
//!         ContentObject::container(IdentityToken::new("p2").unwrap()),
//!     )
//!     .is_err());
//! ```

use crate::core::types::{ContentPath, IdentityToken};
use crate::store::snapshot::SnapshotConfig;
use crate::store::{capsule, ContentObject, ObjectStore, StoreError, TargetRef, TransferCapsule};

/// In-memory hierarchical object store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    root: ContentObject,
    read_only: bool,
}

impl MemoryStore {
    /// Create an empty writable store with a generated root identity.
    pub fn new() -> Self {
        Self {
            root: ContentObject::container(IdentityToken::generate()),
            read_only: false,
        }
    }

    /// Create a store around an existing root container.
    pub fn with_root(root: ContentObject) -> Self {
        Self {
            root,
            read_only: false,
        }
    }

    /// A read-only view over the current contents.
    ///
    /// The view is an independent snapshot: later writes to this store are
    /// not visible through it.
    pub fn read_only_view(&self) -> Self {
        Self {
            root: self.root.clone(),
            read_only: true,
        }
    }

    /// Open a read-only snapshot described by `config`.
    ///
    /// Models `openReadOnlySnapshot(descriptor)`: the descriptor is
    /// validated before anything is touched, and an unusable descriptor
    /// fails with [`StoreError::Unavailable`] before any mutation can
    /// occur anywhere.
    pub fn open_read_only(config: &SnapshotConfig, contents: &MemoryStore) -> Result<Self, StoreError> {
        config
            .validate()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(contents.read_only_view())
    }

    /// Check whether this store refuses mutation.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The root container object.
    pub fn root(&self) -> &ContentObject {
        &self.root
    }

    fn resolve(&self, path: &ContentPath) -> Option<&ContentObject> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = current.children().get(segment)?;
        }
        Some(current)
    }

    fn resolve_mut(&mut self, path: &ContentPath) -> Option<&mut ContentObject> {
        let mut current = &mut self.root;
        for segment in path.segments() {
            current = current.children_mut().get_mut(segment)?;
        }
        Some(current)
    }

    fn refuse_if_read_only(&self, container: &ContentPath) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::Blocked {
                container: container.to_string(),
                reason: "store is read-only".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, path: &ContentPath) -> Result<Option<ContentObject>, StoreError> {
        Ok(self.resolve(path).cloned())
    }

    fn contains(&self, path: &ContentPath) -> Result<bool, StoreError> {
        Ok(self.resolve(path).is_some())
    }

    fn list_children(&self, path: &ContentPath) -> Result<Vec<String>, StoreError> {
        let obj = self.resolve(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;
        if !obj.is_container() {
            return Err(StoreError::NotAContainer {
                path: path.to_string(),
            });
        }
        Ok(obj.children().keys().cloned().collect())
    }

    fn put(
        &mut self,
        container: &ContentPath,
        name: &str,
        obj: ContentObject,
    ) -> Result<TargetRef, StoreError> {
        self.refuse_if_read_only(container)?;
        let path = container.join(name).map_err(|e| StoreError::NotFound {
            path: format!("{}/{} ({})", container, name, e),
        })?;
        let parent = self
            .resolve_mut(container)
            .ok_or_else(|| StoreError::NotFound {
                path: container.to_string(),
            })?;
        if !parent.is_container() {
            return Err(StoreError::NotAContainer {
                path: container.to_string(),
            });
        }
        let identity = obj.identity().clone();
        parent.children_mut().insert(name.to_string(), obj);
        Ok(TargetRef { path, identity })
    }

    fn delete(&mut self, container: &ContentPath, name: &str) -> Result<(), StoreError> {
        self.refuse_if_read_only(container)?;
        let parent = self
            .resolve_mut(container)
            .ok_or_else(|| StoreError::NotFound {
                path: container.to_string(),
            })?;
        if parent.children_mut().remove(name).is_none() {
            return Err(StoreError::NotFound {
                path: format!("{}/{}", container, name),
            });
        }
        Ok(())
    }

    fn export_capsule(&self, path: &ContentPath) -> Result<TransferCapsule, StoreError> {
        let obj = self.resolve(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })?;
        capsule::encode(obj)
    }

    fn import_capsule(&self, capsule: &TransferCapsule) -> Result<ContentObject, StoreError> {
        capsule::decode(capsule)
    }
}
