//! store
//!
//! The single doorway to hierarchical object stores.
//!
//! This module defines the abstract store contract consumed by the engine.
//! All store interactions flow through the [`ObjectStore`] trait, which
//! provides structured results and normalizes failures into typed error
//! categories. No module outside `store` touches a concrete store type
//! except to construct one.
//!
//! # Architecture
//!
//! - [`ObjectStore`] - blocking get/put/delete/export/import contract
//! - [`ContentObject`] - tagged union of known content kinds
//! - [`TransferCapsule`] - opaque serialized subtree (see [`capsule`])
//! - [`memory`] - deterministic in-memory store for tests and fixtures
//! - [`snapshot`] - read-only snapshot descriptor configuration
//!
//! # Error Handling
//!
//! Store errors are categorized into typed variants:
//! - [`StoreError::NotFound`]: referenced path/object absent
//! - [`StoreError::Blocked`]: container refuses mutation (fatal)
//! - [`StoreError::NotAContainer`]: path exists but cannot hold children
//! - [`StoreError::InvalidCapsule`]: capsule bytes cannot be decoded
//! - [`StoreError::Unavailable`]: store connection failed
//!
//! # Example
//!
//! ```
//! use restage::core::types::{ContentPath, IdentityToken};
//! use restage::store::{ContentObject, ObjectStore};
//! use restage::store::memory::MemoryStore;
//!
//! let mut store = MemoryStore::new();
//! let obj = ContentObject::container(IdentityToken::new("site1").unwrap());
//! store.put(&ContentPath::root(), "campus", obj).unwrap();
//! assert!(store.contains(&ContentPath::new("campus").unwrap()).unwrap());
//! ```

pub mod capsule;
pub mod memory;
pub mod snapshot;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{ContentPath, IdentityToken};
use crate::schema::SchemaDefinition;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced path/object is absent.
    #[error("object not found: {path}")]
    NotFound {
        /// The path that was looked up
        path: String,
    },

    /// The container refuses mutation (read-only store, frozen subtree).
    ///
    /// Fatal: the engine never retries a blocked mutation.
    #[error("container refuses mutation: {container}: {reason}")]
    Blocked {
        /// The container that refused
        container: String,
        /// Why the mutation was refused
        reason: String,
    },

    /// The path exists but the object there cannot hold children.
    #[error("not a container: {path}")]
    NotAContainer {
        /// The offending path
        path: String,
    },

    /// Capsule bytes could not be decoded.
    #[error("invalid capsule: {0}")]
    InvalidCapsule(String),

    /// Connection to the store failed.
    ///
    /// Fatal before any mutation occurs.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The known content kinds.
///
/// Content objects are a closed tagged union rather than duck-typed
/// records; each kind carries an explicit field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentKind {
    /// A folderish node with no payload of its own.
    Container,

    /// A form definition (or field-group child) carrying schema source
    /// plus style/rule metadata.
    Definition(SchemaDefinition),

    /// A saved form instance with an opaque payload.
    FormInstance {
        /// Store-defined payload; the engine never interprets it.
        payload: serde_json::Value,
    },
}

/// A content entity: stable identity, kind-specific fields, internal
/// cross-references, and an owned subtree.
///
/// The identity token is preserved verbatim across export/import. `links`
/// holds references to other entities by identity; references into the same
/// subtree survive transfer via local-id remapping (see [`capsule`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentObject {
    identity: IdentityToken,
    #[serde(flatten)]
    kind: ContentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    links: Vec<IdentityToken>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<String, ContentObject>,
}

impl ContentObject {
    /// Create a new object of the given kind.
    pub fn new(identity: IdentityToken, kind: ContentKind) -> Self {
        Self {
            identity,
            kind,
            links: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    /// Create an empty container.
    pub fn container(identity: IdentityToken) -> Self {
        Self::new(identity, ContentKind::Container)
    }

    /// Create a definition.
    pub fn definition(identity: IdentityToken, schema: SchemaDefinition) -> Self {
        Self::new(identity, ContentKind::Definition(schema))
    }

    /// Create a form instance.
    pub fn form_instance(identity: IdentityToken, payload: serde_json::Value) -> Self {
        Self::new(identity, ContentKind::FormInstance { payload })
    }

    /// The stable identity token.
    pub fn identity(&self) -> &IdentityToken {
        &self.identity
    }

    /// The content kind.
    pub fn kind(&self) -> &ContentKind {
        &self.kind
    }

    /// Internal cross-references held by this object.
    pub fn links(&self) -> &[IdentityToken] {
        &self.links
    }

    /// Add an internal cross-reference.
    pub fn add_link(&mut self, target: IdentityToken) {
        self.links.push(target);
    }

    /// Replace all internal cross-references.
    pub fn set_links(&mut self, links: Vec<IdentityToken>) {
        self.links = links;
    }

    /// Check whether this object can hold children.
    ///
    /// Every kind is folderish here: definitions hold field-group children
    /// and containers hold anything. Form instances are leaves.
    pub fn is_container(&self) -> bool {
        !matches!(self.kind, ContentKind::FormInstance { .. })
    }

    /// Direct children, keyed by binding name.
    pub fn children(&self) -> &BTreeMap<String, ContentObject> {
        &self.children
    }

    /// Mutable access to direct children.
    ///
    /// Callers building detached trees (fixtures, importers) attach
    /// children here; objects bound in a store are mutated via
    /// [`ObjectStore::put`].
    pub fn children_mut(&mut self) -> &mut BTreeMap<String, ContentObject> {
        &mut self.children
    }

    /// Schema metadata, for definition objects.
    pub fn schema(&self) -> Option<&SchemaDefinition> {
        match &self.kind {
            ContentKind::Definition(schema) => Some(schema),
            _ => None,
        }
    }

    /// Mutable schema metadata, for definition objects.
    pub fn schema_mut(&mut self) -> Option<&mut SchemaDefinition> {
        match &mut self.kind {
            ContentKind::Definition(schema) => Some(schema),
            _ => None,
        }
    }

    /// Opaque payload, for form instances.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match &self.kind {
            ContentKind::FormInstance { payload } => Some(payload),
            _ => None,
        }
    }

    /// Preorder walk over this object and its whole subtree.
    ///
    /// Yields `(relative path, object)` pairs; the root is yielded first
    /// with the root-relative path `ContentPath::root()`.
    pub fn walk(&self) -> Vec<(ContentPath, &ContentObject)> {
        let mut out = Vec::new();
        self.walk_into(ContentPath::root(), &mut out);
        out
    }

    fn walk_into<'a>(&'a self, at: ContentPath, out: &mut Vec<(ContentPath, &'a ContentObject)>) {
        out.push((at.clone(), self));
        for (name, child) in &self.children {
            let child_path = at.join(name).expect("validated binding name");
            child.walk_into(child_path, out);
        }
    }

    /// Find an object in this subtree by identity token.
    pub fn find(&self, identity: &IdentityToken) -> Option<&ContentObject> {
        self.walk().into_iter().map(|(_, o)| o).find(|o| o.identity() == identity)
    }
}

/// A reference to an object bound in the target store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    /// Full path where the object is bound.
    pub path: ContentPath,
    /// The object's stable identity token.
    pub identity: IdentityToken,
}

/// An opaque serialized subtree.
///
/// The byte layout is store-defined; callers only move capsules between
/// `export_capsule` and `import_capsule`. This is the only persisted byte
/// format owned by this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCapsule(Vec<u8>);

impl TransferCapsule {
    /// Wrap raw capsule bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The raw capsule bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Byte length of the capsule.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the capsule is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Blocking contract for a hierarchical, identity-bearing object store.
///
/// Implementations are the only components that know their physical layout;
/// the engine sees paths, objects, and capsules. All operations are
/// blocking and sequential (no intra-run parallelism is modeled).
pub trait ObjectStore {
    /// Look up the object bound at `path`, cloning its whole subtree.
    ///
    /// Returns `Ok(None)` when nothing is bound there. An error is reserved
    /// for store-level failures, not missing objects.
    fn get(&self, path: &ContentPath) -> Result<Option<ContentObject>, StoreError>;

    /// Check whether an object is bound at `path`.
    fn contains(&self, path: &ContentPath) -> Result<bool, StoreError> {
        Ok(self.get(path)?.is_some())
    }

    /// List direct child binding names under `path`, in stable order.
    ///
    /// # Errors
    ///
    /// `NotFound` if nothing is bound at `path`; `NotAContainer` if the
    /// object there is a leaf.
    fn list_children(&self, path: &ContentPath) -> Result<Vec<String>, StoreError>;

    /// Bind `obj` (with its subtree) as `container/name`, replacing any
    /// existing binding of that name.
    ///
    /// # Errors
    ///
    /// `NotFound` if `container` is absent, `NotAContainer` if it is a
    /// leaf, `Blocked` if the store refuses mutation.
    fn put(
        &mut self,
        container: &ContentPath,
        name: &str,
        obj: ContentObject,
    ) -> Result<TargetRef, StoreError>;

    /// Remove the binding `container/name` and its subtree.
    ///
    /// # Errors
    ///
    /// `NotFound` if the binding is absent, `Blocked` if the store refuses
    /// mutation.
    fn delete(&mut self, container: &ContentPath, name: &str) -> Result<(), StoreError>;

    /// Serialize the subtree at `path` into a portable capsule.
    ///
    /// The capsule preserves the stable identity token of every node and
    /// the internal reference graph.
    fn export_capsule(&self, path: &ContentPath) -> Result<TransferCapsule, StoreError>;

    /// Materialize a capsule back into a detached object tree.
    ///
    /// The returned object is not bound anywhere; use [`ObjectStore::put`]
    /// to attach it.
    fn import_capsule(&self, capsule: &TransferCapsule) -> Result<ContentObject, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> IdentityToken {
        IdentityToken::new(s).unwrap()
    }

    mod content_object {
        use super::*;

        #[test]
        fn container_accessors() {
            let obj = ContentObject::container(token("c1"));
            assert_eq!(obj.identity().as_str(), "c1");
            assert!(obj.is_container());
            assert!(obj.schema().is_none());
            assert!(obj.payload().is_none());
        }

        #[test]
        fn definition_holds_schema() {
            let schema = SchemaDefinition::new("<schema/>");
            let obj = ContentObject::definition(token("d1"), schema);
            assert!(obj.is_container());
            assert_eq!(obj.schema().unwrap().source(), "<schema/>");
        }

        #[test]
        fn form_instance_is_leaf() {
            let obj = ContentObject::form_instance(token("f1"), serde_json::json!({"a": 1}));
            assert!(!obj.is_container());
            assert_eq!(obj.payload().unwrap()["a"], 1);
        }

        #[test]
        fn walk_is_preorder() {
            let mut root = ContentObject::container(token("root"));
            let mut a = ContentObject::container(token("a"));
            a.children_mut().insert(
                "leaf".to_string(),
                ContentObject::form_instance(token("leaf"), serde_json::Value::Null),
            );
            root.children_mut().insert("a".to_string(), a);
            root.children_mut()
                .insert("b".to_string(), ContentObject::container(token("b")));

            let walked: Vec<String> = root
                .walk()
                .into_iter()
                .map(|(p, o)| format!("{}={}", p.as_str(), o.identity()))
                .collect();
            assert_eq!(walked, vec!["=root", "a=a", "a/leaf=leaf", "b=b"]);
        }

        #[test]
        fn find_by_identity() {
            let mut root = ContentObject::container(token("root"));
            root.children_mut()
                .insert("x".to_string(), ContentObject::container(token("x1")));
            assert!(root.find(&token("x1")).is_some());
            assert!(root.find(&token("missing")).is_none());
        }

        #[test]
        fn links_roundtrip() {
            let mut obj = ContentObject::container(token("c1"));
            obj.add_link(token("other"));
            assert_eq!(obj.links().len(), 1);
            obj.set_links(vec![]);
            assert!(obj.links().is_empty());
        }

        #[test]
        fn serde_roundtrip() {
            let mut root = ContentObject::container(token("root"));
            root.children_mut().insert(
                "d".to_string(),
                ContentObject::definition(token("d1"), SchemaDefinition::new("<s/>")),
            );
            let json = serde_json::to_string(&root).unwrap();
            let parsed: ContentObject = serde_json::from_str(&json).unwrap();
            assert_eq!(root, parsed);
        }
    }

    mod store_error {
        use super::*;

        #[test]
        fn display_formatting() {
            let err = StoreError::NotFound {
                path: "projA/form1".to_string(),
            };
            assert!(err.to_string().contains("projA/form1"));

            let err = StoreError::Blocked {
                container: "campus".to_string(),
                reason: "read-only".to_string(),
            };
            let msg = err.to_string();
            assert!(msg.contains("refuses mutation"));
            assert!(msg.contains("read-only"));
        }
    }

    mod transfer_capsule {
        use super::*;

        #[test]
        fn byte_accessors() {
            let capsule = TransferCapsule::from_bytes(vec![1, 2, 3]);
            assert_eq!(capsule.as_bytes(), &[1, 2, 3]);
            assert_eq!(capsule.len(), 3);
            assert!(!capsule.is_empty());
        }
    }
}
