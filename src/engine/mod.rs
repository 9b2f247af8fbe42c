//! engine
//!
//! Orchestrates the migration lifecycle:
//! Provision -> Copy -> Reindex -> Principals -> Trim -> Schemas -> Warm -> Commit.
//!
//! # Architecture
//!
//! The engine is the central coordinator for a migration run. It enforces
//! the run model:
//!
//! 1. **Provision**: ensure the target site container exists
//! 2. **Copy**: identity-preserving transfer of each project subtree
//! 3. **Reindex**: full synchronous index rebuild
//! 4. **Principals**: copy account plugin namespaces
//! 5. **Trim**: membership collection + principal garbage collection
//! 6. **Schemas**: content-hash deduplication of schema artifacts
//! 7. **Warm**: best-effort derived-cache recomputation
//! 8. **Commit**: exactly-once transaction commit
//!
//! # Invariants
//!
//! - Phases run strictly sequentially, single-threaded, blocking
//! - Every phase before `Committed` is idempotent (at-least-once)
//! - A fatal error aborts immediately; no automatic rollback or retry
//! - All collaborators are threaded explicitly; nothing is ambient
//!
//! # Example
//!
//! ```ignore
//! use restage::engine::{Context, Orchestrator, RunSpec};
//!
//! let spec = RunSpec::new(site, source_root, projects);
//! let run = Orchestrator {
//!     spec: &spec,
//!     source: &snapshot,
//!     target: &mut target,
//!     search: &mut index,
//!     source_directory: &source_directory,
//!     target_directory: &mut target_directory,
//!     rosters: &rosters,
//!     schemas: &mut schemas,
//!     cache: &mut cache,
//!     txn: &mut txn,
//!     reporter: &mut reporter,
//!     ctx: Context::default(),
//! }
//! .run()?;
//! println!("run {} committed", run.id);
//! ```

pub mod orchestrator;
pub mod progress;
pub mod run;
pub mod transfer;
pub mod trim;
pub mod txn;
pub mod warm;

// Re-exports for convenience
pub use orchestrator::{
    MigrationError, Orchestrator, PhaseError, RunSpec, DEFAULT_PLUGIN_NAMESPACES,
};
pub use progress::{MemoryReporter, NullReporter, ProgressEvent, Reporter};
pub use run::{MigrationRun, Phase, PhaseRecord, RunError, RunId};
pub use transfer::{transfer, TransferError, TransferOutcome};
pub use trim::{gc, reachable, TrimError};
pub use txn::{MemoryTransaction, Transaction, TxnError};
pub use warm::{warm, CacheDomain, DerivedCache, MemoryCache, WarmStats};

/// Execution context for a run.
///
/// Global settings that affect narration, not semantics.
#[derive(Debug, Clone)]
pub struct Context {
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            debug: false,
            quiet: true,
        }
    }
}
