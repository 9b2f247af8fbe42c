//! Restage - identity-preserving content migration between object stores
//!
//! Restage transfers a bounded subtree of persistent, uniquely-identified
//! entities from a read-only source snapshot into a target object store,
//! deduplicates structural schema artifacts by content signature,
//! garbage-collects principals no longer referenced by any workspace
//! roster, warms derived caches, and commits the whole run as a single
//! transaction.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`engine`] - Orchestrates the phase lifecycle and owns the run's
//!   transaction boundary
//! - [`core`] - Domain types and cross-tree path resolution
//! - [`store`] - Single doorway to object stores; content model, capsule
//!   codec, in-memory store, snapshot descriptor
//! - [`schema`] - Content-addressable schema deduplication
//! - [`directory`] - Principal directory and workspace roster collaborators
//! - [`index`] - Search-index collaborator and explicit content enumerator
//!
//! # Correctness Invariants
//!
//! Restage maintains the following invariants:
//!
//! 1. Identity tokens are unique and stable before and after transfer
//! 2. A schema signature is a pure function of normalized source bytes;
//!    identical source never produces two artifacts
//! 3. Garbage collection never removes a principal still named by a roster,
//!    and never empties a populated directory
//! 4. Transfer is idempotent: re-running converges to the same end state
//! 5. One committed transaction groups exactly one completed run

pub mod core;
pub mod directory;
pub mod engine;
pub mod index;
pub mod schema;
pub mod store;
