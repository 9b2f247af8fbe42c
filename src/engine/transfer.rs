//! engine::transfer
//!
//! Identity-preserving subtree transfer between stores.
//!
//! # Design
//!
//! A transfer serializes the source subtree into a capsule, replaces any
//! existing object at the destination (last-writer-wins, decided by an
//! existence check alone), and imports the capsule under the destination
//! name. The entity's stable identity token and internal reference graph
//! survive the trip; the binding name is the only thing rebound.
//!
//! Replacement is not an error: a destination collision is recovered
//! locally by delete-then-import, and the replaced identity is emitted as
//! an [`ObjectReplaced`](crate::engine::progress::ProgressEvent) audit
//! event before anything is deleted.
//!
//! Transfer never touches an index. The caller reindexes the site
//! separately, once, after all content is copied.
//!
//! # Idempotence
//!
//! Re-running a transfer against an already-migrated destination converges:
//! the existing copy is replaced by an identical one, so the final identity
//! token and payload equal those of a single transfer.

use thiserror::Error;

use crate::core::types::{ContentPath, IdentityToken};
use crate::engine::progress::{ProgressEvent, Reporter};
use crate::store::{ObjectStore, StoreError, TargetRef};

/// Errors from transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The source object is absent. Fatal to the current phase.
    #[error("source object not found: {path}")]
    NotFound {
        /// The missing source path
        path: String,
    },

    /// The target container refuses mutation. Fatal.
    #[error("target refuses mutation: {container}: {reason}")]
    Blocked {
        /// The refusing container
        container: String,
        /// Why it refused
        reason: String,
    },

    /// The destination name is not a valid binding name.
    #[error("invalid destination name '{name}': {detail}")]
    InvalidDestination {
        /// The offending name
        name: String,
        /// What was wrong with it
        detail: String,
    },

    /// Another store failure, with its own context.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl TransferError {
    /// Re-categorize a store error, surfacing refused mutations as
    /// [`TransferError::Blocked`].
    fn from_store(err: StoreError) -> Self {
        match err {
            StoreError::Blocked { container, reason } => TransferError::Blocked { container, reason },
            other => TransferError::Store(other),
        }
    }
}

/// Result of one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Where the object now lives in the target store.
    pub target: TargetRef,
    /// Identity of the object that was replaced, if the destination was
    /// occupied.
    pub replaced: Option<IdentityToken>,
}

/// Transfer the subtree at `source_path` into `container/name` in the
/// target store.
///
/// # Errors
///
/// - [`TransferError::NotFound`] if the source object is absent
/// - [`TransferError::Blocked`] if the target refuses mutation
/// - [`TransferError::InvalidDestination`] for an unusable binding name
pub fn transfer(
    source: &dyn ObjectStore,
    target: &mut dyn ObjectStore,
    source_path: &ContentPath,
    container: &ContentPath,
    name: &str,
    reporter: &mut dyn Reporter,
) -> Result<TransferOutcome, TransferError> {
    let destination = container
        .join(name)
        .map_err(|e| TransferError::InvalidDestination {
            name: name.to_string(),
            detail: e.to_string(),
        })?;

    if !source.contains(source_path).map_err(TransferError::from_store)? {
        return Err(TransferError::NotFound {
            path: source_path.to_string(),
        });
    }
    let capsule = source
        .export_capsule(source_path)
        .map_err(TransferError::from_store)?;

    // Remove a possibly newer copy at the destination; the snapshot's
    // content wins. The replaced identity is surfaced for audit first.
    let replaced = match target.get(&destination).map_err(TransferError::from_store)? {
        Some(existing) => {
            let identity = existing.identity().clone();
            reporter.record(ProgressEvent::object_replaced(
                destination.to_string(),
                identity.to_string(),
            ));
            target
                .delete(container, name)
                .map_err(TransferError::from_store)?;
            Some(identity)
        }
        None => None,
    };

    let obj = target
        .import_capsule(&capsule)
        .map_err(TransferError::from_store)?;
    let target_ref = target
        .put(container, name, obj)
        .map_err(TransferError::from_store)?;

    Ok(TransferOutcome {
        target: target_ref,
        replaced,
    })
}
