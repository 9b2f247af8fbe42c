//! engine::orchestrator
//!
//! The migration orchestrator: sequences phases, owns the transaction
//! boundary, reports progress and failure per phase.
//!
//! # Architecture
//!
//! The orchestrator is the single mutation pathway of a run. It drives the
//! phase chain strictly sequentially over explicitly-threaded
//! collaborators: source snapshot, target store, search index, principal
//! directories, roster provider, schema index, derived cache, transaction,
//! and reporter. No collaborator is ever resolved from ambient state.
//!
//! # Failure Contract
//!
//! On fatal error the run halts immediately: the run record moves to
//! `Aborted`, a `PhaseFailed` event reports the failing phase name and
//! error detail, and [`MigrationError`] carries both to the caller. No
//! automatic rollback is attempted and no phase is retried. Every phase
//! before `Committed` is idempotent, so recovery is operator-driven
//! re-invocation (or restoring the target from the pre-run snapshot).
//! Because the transaction only commits in the final phase, a run that
//! never reaches it leaves the committed state of the target untouched.

use std::collections::BTreeMap;
use std::time::Instant;

use thiserror::Error;

use crate::core::paths::PathResolver;
use crate::core::types::{ContentPath, IdentityToken};
use crate::directory::{
    copy_plugin_namespace, protected_principals, DirectoryError, PrincipalDirectory, PrincipalKind,
    RosterProvider,
};
use crate::engine::progress::{ProgressEvent, Reporter};
use crate::engine::run::{MigrationRun, Phase, RunError};
use crate::engine::transfer::{transfer, TransferError};
use crate::engine::trim::{gc, reachable, TrimError};
use crate::engine::txn::{Transaction, TxnError};
use crate::engine::warm::{warm, DerivedCache};
use crate::engine::Context;
use crate::index::{self, IndexError, SearchIndex};
use crate::schema::SchemaIndex;
use crate::store::{ContentObject, ObjectStore, StoreError};

/// Default plugin namespaces copied by the principals phase.
pub const DEFAULT_PLUGIN_NAMESPACES: [&str; 2] = ["source_users", "source_groups"];

/// Errors from a single phase.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Transfer failed.
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Membership collection or GC failed.
    #[error(transparent)]
    Trim(#[from] TrimError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Directory operation failed.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Index rebuild failed.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Transaction operation failed.
    #[error("transaction error: {0}")]
    Txn(#[from] TxnError),

    /// Run bookkeeping rejected a transition.
    #[error("run bookkeeping error: {0}")]
    Run(#[from] RunError),

    /// The run spec is unusable.
    #[error("invalid run spec: {0}")]
    Spec(String),
}

/// A fatal, phase-tagged migration failure.
#[derive(Debug, Error)]
#[error("phase {phase} failed: {source}")]
pub struct MigrationError {
    /// The phase that failed.
    pub phase: Phase,
    /// The underlying failure.
    #[source]
    pub source: PhaseError,
}

/// Operator-supplied parameters of one migration run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    /// Target site path (must not be the store root).
    pub site: ContentPath,
    /// Root of the source tree inside the snapshot.
    pub source_root: ContentPath,
    /// Project paths to copy, in order, relative to the source root.
    /// A leading slash or an explicit source-root prefix is tolerated.
    pub projects: Vec<String>,
    /// Site policy identifier recorded when the site is provisioned.
    pub policy: Option<String>,
    /// Plugin namespaces to copy in the principals phase.
    pub plugin_namespaces: Vec<String>,
    /// Virtual-host base for the transaction's undo-path note.
    pub vhost_base: Option<String>,
    /// Commit message for the final transaction note.
    pub commit_message: String,
}

impl RunSpec {
    /// Create a spec with default namespaces and commit message.
    pub fn new(site: ContentPath, source_root: ContentPath, projects: Vec<String>) -> Self {
        Self {
            site,
            source_root,
            projects,
            policy: None,
            plugin_namespaces: DEFAULT_PLUGIN_NAMESPACES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vhost_base: None,
            commit_message: "Copied site content".to_string(),
        }
    }
}

/// The migration orchestrator.
///
/// Borrows every collaborator for the duration of one run. Construct with
/// a struct literal; call [`Orchestrator::run`] exactly once.
pub struct Orchestrator<'a> {
    /// Run parameters.
    pub spec: &'a RunSpec,
    /// Read-only source snapshot.
    pub source: &'a dyn ObjectStore,
    /// Target store.
    pub target: &'a mut dyn ObjectStore,
    /// Target search index.
    pub search: &'a mut dyn SearchIndex,
    /// Source site account database.
    pub source_directory: &'a dyn PrincipalDirectory,
    /// Target site account database.
    pub target_directory: &'a mut dyn PrincipalDirectory,
    /// Target site workspace rosters.
    pub rosters: &'a dyn RosterProvider,
    /// Schema deduplication index.
    pub schemas: &'a mut SchemaIndex,
    /// Derived-cache collaborator.
    pub cache: &'a mut dyn DerivedCache,
    /// The run's transaction.
    pub txn: &'a mut dyn Transaction,
    /// Progress event sink.
    pub reporter: &'a mut dyn Reporter,
    /// Execution context (debug narration, quiet mode).
    pub ctx: Context,
}

type Counters = BTreeMap<String, u64>;

impl Orchestrator<'_> {
    /// Execute the full migration run.
    ///
    /// Phases run strictly sequentially; the first fatal error aborts the
    /// run. On success the returned record is terminal in `Committed` with
    /// per-phase counters and durations.
    pub fn run(mut self) -> Result<MigrationRun, MigrationError> {
        let mut run = MigrationRun::new(self.spec.site.clone(), self.spec.projects.clone());
        self.reporter.record(ProgressEvent::run_started(
            run.id.to_string(),
            self.spec.site.to_string(),
        ));
        self.debug(format_args!(
            "run {} starting for site {}",
            run.id, self.spec.site
        ));

        self.phase(&mut run, Phase::SiteProvisioned, Self::provision_site)?;
        self.phase(&mut run, Phase::ContentCopied, Self::copy_content)?;
        self.phase(&mut run, Phase::Reindexed, Self::reindex)?;
        self.phase(&mut run, Phase::PrincipalsCopied, Self::copy_principals)?;
        self.phase(&mut run, Phase::PrincipalsTrimmed, Self::trim_principals)?;
        self.phase(&mut run, Phase::SchemasLoaded, Self::load_schemas)?;
        self.phase(&mut run, Phase::CachesWarmed, Self::warm_caches)?;
        self.phase(&mut run, Phase::Committed, Self::commit)?;

        self.reporter.record(ProgressEvent::run_committed(
            run.id.to_string(),
            self.commit_note(),
        ));
        Ok(run)
    }

    /// Run one phase with uniform bookkeeping: events, timing, counters,
    /// and abort-on-error.
    fn phase<F>(
        &mut self,
        run: &mut MigrationRun,
        to: Phase,
        body: F,
    ) -> Result<(), MigrationError>
    where
        F: FnOnce(&mut Self) -> Result<Counters, PhaseError>,
    {
        self.reporter.record(ProgressEvent::phase_started(to.name()));
        self.narrate(format_args!("phase {}...", to));
        let started = Instant::now();

        let counters = match body(&mut *self) {
            Ok(counters) => counters,
            Err(err) => return Err(self.fail(run, to, err)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Err(err) = run.advance(to, counters.clone(), elapsed_ms) {
            return Err(self.fail(run, to, PhaseError::Run(err)));
        }
        self.reporter
            .record(ProgressEvent::phase_completed(to.name(), counters, elapsed_ms));
        self.debug(format_args!("phase {} done in {}ms", to, elapsed_ms));
        Ok(())
    }

    /// Halt the run: mark it aborted, report, and build the caller-facing
    /// error. Already-completed phases are left as they are.
    fn fail(&mut self, run: &mut MigrationRun, phase: Phase, source: PhaseError) -> MigrationError {
        let _ = run.abort();
        self.reporter
            .record(ProgressEvent::phase_failed(phase.name(), source.to_string()));
        self.debug(format_args!("phase {} failed: {}", phase, source));
        MigrationError { phase, source }
    }

    fn debug(&self, message: std::fmt::Arguments<'_>) {
        if self.ctx.debug {
            eprintln!("[debug] {}", message);
        }
    }

    fn narrate(&self, message: std::fmt::Arguments<'_>) {
        if !self.ctx.quiet {
            println!("{}", message);
        }
    }

    // =========================================================================
    // Phase bodies
    // =========================================================================

    /// Ensure the target site container exists.
    fn provision_site(&mut self) -> Result<Counters, PhaseError> {
        let (container, name) = self.spec.site.split_container().ok_or_else(|| {
            PhaseError::Spec("target site cannot be the store root".to_string())
        })?;

        let mut counters = Counters::new();
        if self.target.contains(&self.spec.site)? {
            counters.insert("existing".to_string(), 1);
            return Ok(counters);
        }

        let site = ContentObject::container(IdentityToken::generate());
        self.target.put(&container, name, site)?;
        if let Some(policy) = &self.spec.policy {
            self.txn
                .note(&format!("provisioned /{} with policy {}", self.spec.site, policy));
        }
        counters.insert("created".to_string(), 1);
        Ok(counters)
    }

    /// Copy each project subtree from the snapshot into the target site.
    fn copy_content(&mut self) -> Result<Counters, PhaseError> {
        let resolver = PathResolver::new(self.spec.source_root.clone(), self.spec.site.clone());

        let mut copied = 0u64;
        let mut replaced = 0u64;
        for project in &self.spec.projects {
            // Project paths may arrive catalog-style, with a leading slash
            // or the source root prefix; normalize tolerates both.
            let rel = resolver
                .normalize(project)
                .map_err(|e| PhaseError::Spec(format!("bad project path '{}': {}", project, e)))?;
            let source_path = resolver.to_source(&rel);
            let (container_rel, name) = rel
                .split_container()
                .expect("validated project path is not the root");
            let target_container = resolver.to_target(&container_rel);

            self.debug(format_args!(
                "copying {} -> {}/{}",
                source_path, target_container, name
            ));
            let outcome = transfer(
                self.source,
                &mut *self.target,
                &source_path,
                &target_container,
                name,
                &mut *self.reporter,
            )?;
            copied += 1;
            if outcome.replaced.is_some() {
                replaced += 1;
            }
        }

        let mut counters = Counters::new();
        counters.insert("copied".to_string(), copied);
        counters.insert("replaced".to_string(), replaced);
        Ok(counters)
    }

    /// Rebuild the target site's search index, fully and synchronously.
    fn reindex(&mut self) -> Result<Counters, PhaseError> {
        self.search.rebuild_all(&self.spec.site)?;
        let mut counters = Counters::new();
        counters.insert("rebuilds".to_string(), 1);
        Ok(counters)
    }

    /// Copy the configured principal plugin namespaces.
    fn copy_principals(&mut self) -> Result<Counters, PhaseError> {
        let mut counters = Counters::new();
        let mut total = 0u64;
        for name in &self.spec.plugin_namespaces {
            let count = copy_plugin_namespace(
                self.source_directory,
                &mut *self.target_directory,
                name,
            )? as u64;
            counters.insert(name.clone(), count);
            total += count;
        }
        counters.insert("principals".to_string(), total);
        Ok(counters)
    }

    /// Remove principals no roster references: groups first, then users,
    /// against one reachable-set computation.
    fn trim_principals(&mut self) -> Result<Counters, PhaseError> {
        let reachable_ids = reachable(self.rosters)?;
        let protected = protected_principals();

        let groups = gc(
            &mut *self.target_directory,
            PrincipalKind::Group,
            &reachable_ids,
            &protected,
        )?;
        let users = gc(
            &mut *self.target_directory,
            PrincipalKind::User,
            &reachable_ids,
            &protected,
        )?;

        let mut counters = Counters::new();
        counters.insert("reachable".to_string(), reachable_ids.len() as u64);
        counters.insert("groups_removed".to_string(), groups.len() as u64);
        counters.insert("users_removed".to_string(), users.len() as u64);
        Ok(counters)
    }

    /// Register every schema-bearing object with the deduplicating index
    /// and record its signature on the object.
    fn load_schemas(&mut self) -> Result<Counters, PhaseError> {
        let paths = index::schema_bearing_paths(&*self.target, &self.spec.site)?;

        let mut registered = 0u64;
        let mut deduplicated = 0u64;
        let mut skipped = 0u64;
        let mut blank = 0u64;
        for path in paths {
            let mut obj = self
                .target
                .get(&path)?
                .ok_or_else(|| StoreError::NotFound {
                    path: path.to_string(),
                })?;
            let Some(schema) = obj.schema() else {
                continue;
            };

            // Objects whose current signature is already known are skipped.
            if let Some(sig) = schema.signature() {
                if self.schemas.contains(sig) {
                    skipped += 1;
                    continue;
                }
            }

            if schema.is_blank() {
                blank += 1;
            } else if self.schemas.contains(&crate::schema::Signature::compute(schema.source())) {
                deduplicated += 1;
            } else {
                registered += 1;
            }
            let signature = self.schemas.register(schema);

            obj.schema_mut()
                .expect("schema-bearing object is a definition")
                .set_signature(signature);
            let (container, name) = path
                .split_container()
                .expect("schema-bearing path is not the root");
            self.target.put(&container, name, obj)?;
        }

        let mut counters = Counters::new();
        counters.insert("registered".to_string(), registered);
        counters.insert("deduplicated".to_string(), deduplicated);
        counters.insert("skipped".to_string(), skipped);
        counters.insert("blank".to_string(), blank);
        Ok(counters)
    }

    /// Warm derived caches for every form identity in the target site.
    fn warm_caches(&mut self) -> Result<Counters, PhaseError> {
        let identities = index::form_identities(&*self.target, &self.spec.site)?;
        let stats = warm(&mut *self.cache, &identities, &mut *self.reporter);

        let mut counters = Counters::new();
        counters.insert("attempted".to_string(), stats.attempted);
        counters.insert("failed".to_string(), stats.failed);
        Ok(counters)
    }

    /// Note the undo path and run message, then commit exactly once.
    fn commit(&mut self) -> Result<Counters, PhaseError> {
        let mut notes = 0u64;
        if let Some(vhost_base) = &self.spec.vhost_base {
            self.txn.note(&format!("{}/{}", vhost_base, self.spec.site));
            notes += 1;
        }
        self.txn.note(&self.commit_note());
        notes += 1;
        self.txn.commit()?;

        let mut counters = Counters::new();
        counters.insert("notes".to_string(), notes);
        Ok(counters)
    }

    fn commit_note(&self) -> String {
        format!("{} -- for /{}", self.spec.commit_message, self.spec.site)
    }
}
