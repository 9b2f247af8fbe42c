//! engine::progress
//!
//! Structured phase-level progress events.
//!
//! # Design
//!
//! The engine narrates a run through typed events delivered to a
//! [`Reporter`] collaborator, not through print statements. Events carry
//! everything an observability layer needs: phase names, per-phase
//! counters, elapsed times, and audit records for replaced objects and
//! failed best-effort items.
//!
//! Reporters must not fail: event delivery is fire-and-forget from the
//! engine's point of view.
//!
//! # Event Categories
//!
//! - `RunStarted` / `RunCommitted`: run lifecycle boundaries
//! - `PhaseStarted` / `PhaseCompleted` / `PhaseFailed`: phase lifecycle
//! - `ObjectReplaced`: audit record for replace-on-conflict transfers
//! - `WarmItemFailed`: a single best-effort cache item failed

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A structured progress event.
///
/// Serialized with a `type` tag so collectors can route on event kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A migration run began.
    RunStarted {
        /// Run id (matches the run record).
        run_id: String,
        /// Target site path.
        site: String,
        /// Timestamp.
        timestamp: String,
    },

    /// A phase began.
    PhaseStarted {
        /// Phase name.
        phase: String,
        /// Timestamp.
        timestamp: String,
    },

    /// A phase completed successfully.
    PhaseCompleted {
        /// Phase name.
        phase: String,
        /// Per-phase counters.
        counters: BTreeMap<String, u64>,
        /// Wall-clock duration of the phase.
        elapsed_ms: u64,
        /// Timestamp.
        timestamp: String,
    },

    /// A phase failed fatally; the run aborts.
    PhaseFailed {
        /// Phase name.
        phase: String,
        /// Error detail.
        reason: String,
        /// Timestamp.
        timestamp: String,
    },

    /// An existing target object was replaced during transfer.
    ///
    /// Emitted for audit before the replacement happens.
    ObjectReplaced {
        /// Destination path.
        path: String,
        /// Identity token of the object being replaced.
        replaced_identity: String,
        /// Timestamp.
        timestamp: String,
    },

    /// A single cache-warm item failed (best-effort; the run continues).
    WarmItemFailed {
        /// Cache domain.
        domain: String,
        /// Content identity that failed.
        identity: String,
        /// Error detail.
        reason: String,
        /// Timestamp.
        timestamp: String,
    },

    /// The run's transaction committed.
    RunCommitted {
        /// Run id.
        run_id: String,
        /// The transaction note.
        note: String,
        /// Timestamp.
        timestamp: String,
    },
}

impl ProgressEvent {
    /// Create a RunStarted event.
    pub fn run_started(run_id: impl Into<String>, site: impl Into<String>) -> Self {
        ProgressEvent::RunStarted {
            run_id: run_id.into(),
            site: site.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create a PhaseStarted event.
    pub fn phase_started(phase: impl Into<String>) -> Self {
        ProgressEvent::PhaseStarted {
            phase: phase.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create a PhaseCompleted event.
    pub fn phase_completed(
        phase: impl Into<String>,
        counters: BTreeMap<String, u64>,
        elapsed_ms: u64,
    ) -> Self {
        ProgressEvent::PhaseCompleted {
            phase: phase.into(),
            counters,
            elapsed_ms,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create a PhaseFailed event.
    pub fn phase_failed(phase: impl Into<String>, reason: impl Into<String>) -> Self {
        ProgressEvent::PhaseFailed {
            phase: phase.into(),
            reason: reason.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create an ObjectReplaced event.
    pub fn object_replaced(path: impl Into<String>, replaced_identity: impl Into<String>) -> Self {
        ProgressEvent::ObjectReplaced {
            path: path.into(),
            replaced_identity: replaced_identity.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create a WarmItemFailed event.
    pub fn warm_item_failed(
        domain: impl Into<String>,
        identity: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ProgressEvent::WarmItemFailed {
            domain: domain.into(),
            identity: identity.into(),
            reason: reason.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Create a RunCommitted event.
    pub fn run_committed(run_id: impl Into<String>, note: impl Into<String>) -> Self {
        ProgressEvent::RunCommitted {
            run_id: run_id.into(),
            note: note.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// The event's kind as a short label (for debug narration).
    pub fn label(&self) -> &'static str {
        match self {
            ProgressEvent::RunStarted { .. } => "run_started",
            ProgressEvent::PhaseStarted { .. } => "phase_started",
            ProgressEvent::PhaseCompleted { .. } => "phase_completed",
            ProgressEvent::PhaseFailed { .. } => "phase_failed",
            ProgressEvent::ObjectReplaced { .. } => "object_replaced",
            ProgressEvent::WarmItemFailed { .. } => "warm_item_failed",
            ProgressEvent::RunCommitted { .. } => "run_committed",
        }
    }
}

/// Sink for progress events.
pub trait Reporter {
    /// Record one event. Must not fail.
    fn record(&mut self, event: ProgressEvent);
}

/// Reporter that keeps every event in memory, for tests and inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    events: Vec<ProgressEvent>,
}

impl MemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, in order.
    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Labels of all recorded events, in order.
    pub fn labels(&self) -> Vec<&'static str> {
        self.events.iter().map(ProgressEvent::label).collect()
    }
}

impl Reporter for MemoryReporter {
    fn record(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}

/// Reporter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn record(&mut self, _event: ProgressEvent) {}
}
