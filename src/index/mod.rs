//! index
//!
//! Search-index collaborator and the explicit content enumerator.
//!
//! # Design
//!
//! The search index is write-only from the engine's point of view: after
//! content copy, the whole site index is rebuilt synchronously through
//! [`SearchIndex::rebuild_all`]. There is no incremental API.
//!
//! Enumeration is deliberately NOT the index's job. Entity enumeration is
//! a pure traversal over the [`ObjectStore`] doorway, returning normalized
//! path lists in stable preorder. This keeps "what exists" decoupled from
//! "what is indexed": an index can be stale or mid-rebuild without
//! changing what the engine enumerates.

use thiserror::Error;

use crate::core::types::{ContentPath, IdentityToken};
use crate::store::{ContentKind, ObjectStore, StoreError};

/// Errors from index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The rebuild failed in the index backend.
    #[error("index rebuild failed: {0}")]
    RebuildFailed(String),
}

/// Full-rebuild search index collaborator.
pub trait SearchIndex {
    /// Rebuild the whole index for the subtree rooted at `site`.
    ///
    /// Synchronous; returns only when the rebuild is complete.
    fn rebuild_all(&mut self, site: &ContentPath) -> Result<(), IndexError>;
}

/// Recording in-memory index for tests.
///
/// Records every rebuild request; optionally fails each request.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndex {
    rebuilds: Vec<ContentPath>,
    fail_with: Option<String>,
}

impl RecordingIndex {
    /// Create a recording index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure every rebuild to fail with the given message.
    pub fn set_fail_with(&mut self, message: Option<String>) {
        self.fail_with = message;
    }

    /// Sites whose index was rebuilt, in call order.
    pub fn rebuilds(&self) -> &[ContentPath] {
        &self.rebuilds
    }
}

impl SearchIndex for RecordingIndex {
    fn rebuild_all(&mut self, site: &ContentPath) -> Result<(), IndexError> {
        if let Some(message) = &self.fail_with {
            return Err(IndexError::RebuildFailed(message.clone()));
        }
        self.rebuilds.push(site.clone());
        Ok(())
    }
}

/// Enumerate schema-bearing objects under `root`, in stable preorder.
///
/// Schema-bearing means `Definition`-kind: form definitions and their
/// field-group children. Paths are full store paths.
///
/// # Errors
///
/// `NotFound` if nothing is bound at `root`.
pub fn schema_bearing_paths(
    store: &dyn ObjectStore,
    root: &ContentPath,
) -> Result<Vec<ContentPath>, StoreError> {
    let subtree = store.get(root)?.ok_or_else(|| StoreError::NotFound {
        path: root.to_string(),
    })?;
    let mut out = Vec::new();
    for (rel, obj) in subtree.walk() {
        if matches!(obj.kind(), ContentKind::Definition(_)) {
            out.push(rebase(root, &rel));
        }
    }
    Ok(out)
}

/// Enumerate form-instance identities under `root`, in stable preorder.
///
/// # Errors
///
/// `NotFound` if nothing is bound at `root`.
pub fn form_identities(
    store: &dyn ObjectStore,
    root: &ContentPath,
) -> Result<Vec<IdentityToken>, StoreError> {
    let subtree = store.get(root)?.ok_or_else(|| StoreError::NotFound {
        path: root.to_string(),
    })?;
    Ok(subtree
        .walk()
        .into_iter()
        .filter(|(_, obj)| matches!(obj.kind(), ContentKind::FormInstance { .. }))
        .map(|(_, obj)| obj.identity().clone())
        .collect())
}

fn rebase(root: &ContentPath, rel: &ContentPath) -> ContentPath {
    let mut out = root.clone();
    for segment in rel.segments() {
        out = out.join(segment).expect("validated segment");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaDefinition;
    use crate::store::memory::MemoryStore;
    use crate::store::ContentObject;

    fn token(s: &str) -> IdentityToken {
        IdentityToken::new(s).unwrap()
    }

    fn path(s: &str) -> ContentPath {
        ContentPath::new(s).unwrap()
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .put(&ContentPath::root(), "campus", ContentObject::container(token("site")))
            .unwrap();
        store
            .put(&path("campus"), "projA", ContentObject::container(token("p1")))
            .unwrap();
        store
            .put(
                &path("campus/projA"),
                "defn",
                ContentObject::definition(token("d1"), SchemaDefinition::new("<s/>")),
            )
            .unwrap();
        store
            .put(
                &path("campus/projA/defn"),
                "group-1",
                ContentObject::definition(token("g1"), SchemaDefinition::new("<g/>")),
            )
            .unwrap();
        store
            .put(
                &path("campus/projA"),
                "form1",
                ContentObject::form_instance(token("f1"), serde_json::json!({})),
            )
            .unwrap();
        store
    }

    mod recording_index {
        use super::*;

        #[test]
        fn records_rebuilds() {
            let mut index = RecordingIndex::new();
            index.rebuild_all(&path("campus")).unwrap();
            assert_eq!(index.rebuilds(), &[path("campus")]);
        }

        #[test]
        fn configured_failure_fires() {
            let mut index = RecordingIndex::new();
            index.set_fail_with(Some("catalog offline".into()));
            let err = index.rebuild_all(&path("campus")).unwrap_err();
            assert!(err.to_string().contains("catalog offline"));
            assert!(index.rebuilds().is_empty());
        }
    }

    mod enumerate {
        use super::*;

        #[test]
        fn definitions_and_field_groups_found() {
            let store = seeded();
            let paths = schema_bearing_paths(&store, &path("campus")).unwrap();
            assert_eq!(
                paths,
                vec![path("campus/projA/defn"), path("campus/projA/defn/group-1")]
            );
        }

        #[test]
        fn form_identities_found() {
            let store = seeded();
            let ids = form_identities(&store, &path("campus")).unwrap();
            assert_eq!(ids, vec![token("f1")]);
        }

        #[test]
        fn missing_root_fails() {
            let store = seeded();
            assert!(matches!(
                schema_bearing_paths(&store, &path("missing")),
                Err(StoreError::NotFound { .. })
            ));
            assert!(matches!(
                form_identities(&store, &path("missing")),
                Err(StoreError::NotFound { .. })
            ));
        }

        #[test]
        fn empty_when_no_matches() {
            let mut store = MemoryStore::new();
            store
                .put(&ContentPath::root(), "empty", ContentObject::container(token("e")))
                .unwrap();
            assert!(schema_bearing_paths(&store, &path("empty"))
                .unwrap()
                .is_empty());
        }
    }
}
