//! engine::run
//!
//! The migration run record and its phase state machine.
//!
//! # Phases
//!
//! A run advances through a strictly sequential phase chain:
//!
//! ```text
//! Init -> SiteProvisioned -> ContentCopied -> Reindexed
//!      -> PrincipalsCopied -> PrincipalsTrimmed -> SchemasLoaded
//!      -> CachesWarmed -> Committed
//! ```
//!
//! `Committed` is terminal and exactly-once. `Aborted` is terminal and
//! reachable from any non-terminal phase on fatal error. Every phase other
//! than `Committed` is safely re-invocable (at-least-once semantics), so
//! operator-driven recovery is simply re-running the run.
//!
//! The run record keeps per-phase counters and wall-clock durations, the
//! structured equivalent of narrating elapsed time after each pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::{ContentPath, UtcTimestamp};

/// Errors from run bookkeeping.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RunError {
    /// Attempted a transition that skips or reorders phases.
    #[error("invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
    },

    /// Attempted to advance a terminal run.
    #[error("run is terminal in phase {phase}")]
    Terminal {
        /// The terminal phase
        phase: Phase,
    },
}

/// Unique identifier for a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generate a new unique run id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, ordered step of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Run created; nothing migrated yet.
    Init,
    /// Target site container exists.
    SiteProvisioned,
    /// Project subtrees copied into the target.
    ContentCopied,
    /// Target search index rebuilt.
    Reindexed,
    /// Principal plugin namespaces copied.
    PrincipalsCopied,
    /// Unreferenced principals garbage-collected.
    PrincipalsTrimmed,
    /// Schema artifacts registered and deduplicated.
    SchemasLoaded,
    /// Derived caches warmed.
    CachesWarmed,
    /// Transaction committed. Terminal.
    Committed,
    /// Fatal error; run halted. Terminal.
    Aborted,
}

impl Phase {
    /// Stable phase name (matches progress-event phase fields).
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Init => "init",
            Phase::SiteProvisioned => "site_provisioned",
            Phase::ContentCopied => "content_copied",
            Phase::Reindexed => "reindexed",
            Phase::PrincipalsCopied => "principals_copied",
            Phase::PrincipalsTrimmed => "principals_trimmed",
            Phase::SchemasLoaded => "schemas_loaded",
            Phase::CachesWarmed => "caches_warmed",
            Phase::Committed => "committed",
            Phase::Aborted => "aborted",
        }
    }

    /// The next phase in the chain, or `None` for terminal phases.
    pub fn successor(&self) -> Option<Phase> {
        match self {
            Phase::Init => Some(Phase::SiteProvisioned),
            Phase::SiteProvisioned => Some(Phase::ContentCopied),
            Phase::ContentCopied => Some(Phase::Reindexed),
            Phase::Reindexed => Some(Phase::PrincipalsCopied),
            Phase::PrincipalsCopied => Some(Phase::PrincipalsTrimmed),
            Phase::PrincipalsTrimmed => Some(Phase::SchemasLoaded),
            Phase::SchemasLoaded => Some(Phase::CachesWarmed),
            Phase::CachesWarmed => Some(Phase::Committed),
            Phase::Committed | Phase::Aborted => None,
        }
    }

    /// Check whether this phase ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Committed | Phase::Aborted)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Bookkeeping for one completed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// The completed phase.
    pub phase: Phase,
    /// Per-phase counters (what was created, replaced, removed, ...).
    pub counters: BTreeMap<String, u64>,
    /// Wall-clock duration.
    pub elapsed_ms: u64,
}

/// The record of one migration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRun {
    /// Unique run id.
    pub id: RunId,
    /// When the run started.
    pub started_at: UtcTimestamp,
    /// Target site path.
    pub site: ContentPath,
    /// Project names in copy order.
    pub projects: Vec<String>,
    /// Current phase.
    phase: Phase,
    /// Completed-phase bookkeeping, in order.
    records: Vec<PhaseRecord>,
}

impl MigrationRun {
    /// Create a run record in `Init`.
    pub fn new(site: ContentPath, projects: Vec<String>) -> Self {
        Self {
            id: RunId::new(),
            started_at: UtcTimestamp::now(),
            site,
            projects,
            phase: Phase::Init,
            records: Vec::new(),
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Completed-phase records, in order.
    pub fn records(&self) -> &[PhaseRecord] {
        &self.records
    }

    /// Check whether the run is finished (committed or aborted).
    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Advance to the next phase, recording its bookkeeping.
    ///
    /// # Errors
    ///
    /// `Terminal` if the run already ended; `InvalidTransition` if `to` is
    /// not the immediate successor of the current phase.
    pub fn advance(
        &mut self,
        to: Phase,
        counters: BTreeMap<String, u64>,
        elapsed_ms: u64,
    ) -> Result<(), RunError> {
        if self.phase.is_terminal() {
            return Err(RunError::Terminal { phase: self.phase });
        }
        if self.phase.successor() != Some(to) {
            return Err(RunError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        self.records.push(PhaseRecord {
            phase: to,
            counters,
            elapsed_ms,
        });
        Ok(())
    }

    /// Abort the run from any non-terminal phase.
    ///
    /// # Errors
    ///
    /// `Terminal` if the run already ended.
    pub fn abort(&mut self) -> Result<(), RunError> {
        if self.phase.is_terminal() {
            return Err(RunError::Terminal { phase: self.phase });
        }
        self.phase = Phase::Aborted;
        Ok(())
    }
}
