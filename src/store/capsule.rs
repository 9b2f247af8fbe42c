//! store::capsule
//!
//! The capsule codec: portable serialization of an entity subtree.
//!
//! # Design
//!
//! A capsule flattens a subtree into a version-tagged node table in
//! preorder. Each node records its identity token, kind, binding name, and
//! parent slot. Internal cross-references are remapped to local ids at
//! export time: a link whose referent lives inside the exported subtree is
//! written as `local` (a table index), and any other link is written as
//! `external` (the raw identity token). Import resolves `local` links back
//! to the identity tokens of the rebuilt nodes.
//!
//! This remapping is what lets a capsule carry a reference graph between
//! stores without deep-copying referenced siblings, while identity tokens
//! pass through unchanged.
//!
//! # Invariants
//!
//! - Node 0 is the subtree root; every other node names a parent with a
//!   smaller index (preorder).
//! - Identity tokens are unique within a capsule.
//! - Unknown capsule versions are rejected, never guessed at.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{ContentPath, IdentityToken};
use crate::store::{ContentObject, StoreError, TransferCapsule};

/// Capsule wire format version.
const CAPSULE_VERSION: u32 = 1;

/// A cross-reference as encoded in a capsule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
enum LinkRef {
    /// Referent lives inside the exported subtree; `id` indexes the
    /// capsule node table.
    Local { id: usize },
    /// Referent lives outside the subtree; the token crosses unchanged.
    External { token: IdentityToken },
}

/// One flattened node of the subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CapsuleNode {
    identity: IdentityToken,
    #[serde(flatten)]
    kind: crate::store::ContentKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    links: Vec<LinkRef>,
    /// Index of the parent node; `None` only for node 0.
    parent: Option<usize>,
    /// Binding name under the parent; `None` only for node 0.
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CapsuleEnvelope {
    version: u32,
    nodes: Vec<CapsuleNode>,
}

/// Serialize a subtree into a capsule.
///
/// # Errors
///
/// Returns `StoreError::InvalidCapsule` if the subtree violates identity
/// uniqueness (which would make local-id remapping ambiguous).
pub fn encode(root: &ContentObject) -> Result<TransferCapsule, StoreError> {
    let flattened = root.walk();

    // First pass: local id per identity token.
    let mut local_ids: BTreeMap<&IdentityToken, usize> = BTreeMap::new();
    for (i, (_, obj)) in flattened.iter().enumerate() {
        if local_ids.insert(obj.identity(), i).is_some() {
            return Err(StoreError::InvalidCapsule(format!(
                "duplicate identity token in subtree: {}",
                obj.identity()
            )));
        }
    }

    // Second pass: emit nodes with remapped links.
    let mut nodes = Vec::with_capacity(flattened.len());
    for (path, obj) in &flattened {
        let links = obj
            .links()
            .iter()
            .map(|token| match local_ids.get(token) {
                Some(&id) => LinkRef::Local { id },
                None => LinkRef::External {
                    token: token.clone(),
                },
            })
            .collect();

        let (parent, name) = if path.is_root() {
            (None, None)
        } else {
            let parent_path = path.parent().expect("non-root has a parent");
            let parent_obj = if parent_path.is_root() {
                root
            } else {
                lookup(root, &parent_path)
            };
            let parent_id = local_ids[parent_obj.identity()];
            (
                Some(parent_id),
                Some(path.name().expect("non-root has a name").to_string()),
            )
        };

        nodes.push(CapsuleNode {
            identity: obj.identity().clone(),
            kind: obj.kind().clone(),
            links,
            parent,
            name,
        });
    }

    let envelope = CapsuleEnvelope {
        version: CAPSULE_VERSION,
        nodes,
    };
    let bytes = serde_json::to_vec(&envelope)
        .map_err(|e| StoreError::InvalidCapsule(format!("encode failed: {}", e)))?;
    Ok(TransferCapsule::from_bytes(bytes))
}

fn lookup<'a>(root: &'a ContentObject, path: &ContentPath) -> &'a ContentObject {
    let mut current = root;
    for segment in path.segments() {
        current = current
            .children()
            .get(segment)
            .expect("walked path resolves in its own subtree");
    }
    current
}

/// Rebuild a detached subtree from a capsule.
///
/// # Errors
///
/// Returns `StoreError::InvalidCapsule` for unknown versions, malformed
/// node tables (missing parents, forward parent references, dangling
/// local links), or children attached to leaf nodes.
pub fn decode(capsule: &TransferCapsule) -> Result<ContentObject, StoreError> {
    let envelope: CapsuleEnvelope = serde_json::from_slice(capsule.as_bytes())
        .map_err(|e| StoreError::InvalidCapsule(format!("decode failed: {}", e)))?;

    if envelope.version != CAPSULE_VERSION {
        return Err(StoreError::InvalidCapsule(format!(
            "unsupported capsule version {}",
            envelope.version
        )));
    }
    if envelope.nodes.is_empty() {
        return Err(StoreError::InvalidCapsule("capsule has no nodes".into()));
    }
    if envelope.nodes[0].parent.is_some() {
        return Err(StoreError::InvalidCapsule(
            "capsule root cannot have a parent".into(),
        ));
    }

    let identities: Vec<IdentityToken> = envelope
        .nodes
        .iter()
        .map(|n| n.identity.clone())
        .collect();

    // Materialize nodes with links resolved back to identity tokens.
    let mut objects: Vec<Option<ContentObject>> = Vec::with_capacity(envelope.nodes.len());
    for node in &envelope.nodes {
        let mut obj = ContentObject::new(node.identity.clone(), node.kind.clone());
        let mut links = Vec::with_capacity(node.links.len());
        for link in &node.links {
            match link {
                LinkRef::Local { id } => {
                    let token = identities.get(*id).ok_or_else(|| {
                        StoreError::InvalidCapsule(format!("dangling local link id {}", id))
                    })?;
                    links.push(token.clone());
                }
                LinkRef::External { token } => links.push(token.clone()),
            }
        }
        obj.set_links(links);
        objects.push(Some(obj));
    }

    // Attach children from the deepest nodes up; preorder guarantees
    // parent < child, so reverse iteration sees complete subtrees.
    for i in (1..envelope.nodes.len()).rev() {
        let node = &envelope.nodes[i];
        let parent = node.parent.ok_or_else(|| {
            StoreError::InvalidCapsule(format!("node {} has no parent", i))
        })?;
        if parent >= i {
            return Err(StoreError::InvalidCapsule(format!(
                "node {} references forward parent {}",
                i, parent
            )));
        }
        let name = node
            .name
            .clone()
            .ok_or_else(|| StoreError::InvalidCapsule(format!("node {} has no name", i)))?;
        // Binding names must be valid single path segments.
        ContentPath::root()
            .join(&name)
            .map_err(|e| StoreError::InvalidCapsule(format!("bad binding name: {}", e)))?;

        let child = objects[i].take().expect("child taken once");
        let parent_obj = objects[parent]
            .as_mut()
            .ok_or_else(|| StoreError::InvalidCapsule(format!("node {} parent missing", i)))?;
        if !parent_obj.is_container() {
            return Err(StoreError::InvalidCapsule(format!(
                "node {} attaches a child to a leaf",
                parent
            )));
        }
        parent_obj.children_mut().insert(name, child);
    }

    Ok(objects[0].take().expect("root taken once"))
}
