//! engine::txn
//!
//! The run's transaction boundary.
//!
//! # Design
//!
//! An entire migration run executes inside one long-lived transactional
//! context. Intermediate phase effects are visible only within that
//! context; the underlying store's atomic commit applies exactly once, at
//! the explicit final [`Transaction::commit`]. Never committing is the
//! run's sole cancellation mechanism; there is no partial-abort API.
//!
//! Notes attached before commit become the operator-facing audit trail
//! (the undo path and run message).

use thiserror::Error;

/// Errors from transaction operations.
#[derive(Debug, Error)]
pub enum TxnError {
    /// The transaction was already committed; commit is exactly-once.
    #[error("transaction already committed")]
    AlreadyCommitted,

    /// The transaction backend failed to commit.
    #[error("commit failed: {0}")]
    CommitFailed(String),
}

/// One run-scoped transactional context.
pub trait Transaction {
    /// Attach an audit note to the transaction.
    fn note(&mut self, message: &str);

    /// Commit the transaction. Exactly-once per run.
    ///
    /// # Errors
    ///
    /// `AlreadyCommitted` on reuse; `CommitFailed` if the backend refuses.
    fn commit(&mut self) -> Result<(), TxnError>;
}

/// In-memory transaction that records notes and commit state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransaction {
    notes: Vec<String>,
    committed: bool,
    fail_commit_with: Option<String>,
}

impl MemoryTransaction {
    /// Create an open transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next commit to fail.
    pub fn set_fail_commit_with(&mut self, message: Option<String>) {
        self.fail_commit_with = message;
    }

    /// All notes attached so far.
    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Whether this transaction committed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

impl Transaction for MemoryTransaction {
    fn note(&mut self, message: &str) {
        self.notes.push(message.to_string());
    }

    fn commit(&mut self) -> Result<(), TxnError> {
        if self.committed {
            return Err(TxnError::AlreadyCommitted);
        }
        if let Some(message) = &self.fail_commit_with {
            return Err(TxnError::CommitFailed(message.clone()));
        }
        self.committed = true;
        Ok(())
    }
}
