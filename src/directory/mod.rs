//! directory
//!
//! Principal directory and workspace roster collaborators.
//!
//! # Architecture
//!
//! The engine never owns account data; it consumes two abstract
//! collaborators. A [`PrincipalDirectory`] is the account database of one
//! site (explicitly constructed, never resolved from ambient state): it
//! lists and removes principals and exports/installs whole plugin
//! namespaces. A [`RosterProvider`] yields the workspaces of a site and the
//! set of principal ids each workspace considers members.
//!
//! Fixed system roles are never garbage-collected; see
//! [`protected_principals`].
//!
//! # Modules
//!
//! - [`memory`]: deterministic in-memory implementations for testing

pub mod memory;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::PrincipalId;

/// Errors from directory and roster operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The named principal does not exist.
    #[error("principal not found: {id}")]
    PrincipalNotFound {
        /// The missing principal id
        id: String,
    },

    /// The named plugin namespace does not exist.
    #[error("plugin namespace not found: {name}")]
    NamespaceNotFound {
        /// The missing namespace name
        name: String,
    },

    /// The directory backend failed.
    #[error("directory backend error: {0}")]
    Backend(String),
}

/// The kind of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    /// An individual user account.
    User,
    /// A group of accounts.
    Group,
}

impl std::fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalKind::User => write!(f, "user"),
            PrincipalKind::Group => write!(f, "group"),
        }
    }
}

/// A principal: account identifier plus kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account identifier.
    pub id: PrincipalId,
    /// User or group.
    pub kind: PrincipalKind,
}

impl Principal {
    /// Create a user principal.
    pub fn user(id: PrincipalId) -> Self {
        Self {
            id,
            kind: PrincipalKind::User,
        }
    }

    /// Create a group principal.
    pub fn group(id: PrincipalId) -> Self {
        Self {
            id,
            kind: PrincipalKind::Group,
        }
    }
}

/// Fixed system role ids that garbage collection never removes.
pub const PROTECTED_ROLE_IDS: [&str; 4] = [
    "administrators",
    "authenticated-users",
    "site-administrators",
    "reviewers",
];

/// The protected principal set as validated ids.
pub fn protected_principals() -> BTreeSet<PrincipalId> {
    PROTECTED_ROLE_IDS
        .iter()
        .map(|id| PrincipalId::new(*id).expect("protected role ids are valid"))
        .collect()
}

/// A named account namespace: the unit of principal-directory copying.
///
/// Namespaces correspond to the source-of-record plugins of a site's
/// account database (canonically `source_users` and `source_groups`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginNamespace {
    /// Namespace name.
    pub name: String,
    /// Principals recorded in this namespace, keyed by id.
    pub entries: BTreeMap<PrincipalId, Principal>,
}

impl PluginNamespace {
    /// Create an empty namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Number of principals in this namespace.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the namespace is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The account database of one site.
///
/// One handle per site; callers hold separate handles for source and
/// target directories.
pub trait PrincipalDirectory {
    /// List all principals of the given kind, in stable order.
    fn list_principals(&self, kind: PrincipalKind) -> Result<Vec<Principal>, DirectoryError>;

    /// Remove a principal.
    ///
    /// # Errors
    ///
    /// `PrincipalNotFound` if no such principal exists.
    fn remove_principal(&mut self, id: &PrincipalId) -> Result<(), DirectoryError>;

    /// Export a whole plugin namespace.
    ///
    /// # Errors
    ///
    /// `NamespaceNotFound` if no namespace of that name exists.
    fn export_namespace(&self, name: &str) -> Result<PluginNamespace, DirectoryError>;

    /// Install a plugin namespace, replacing any same-named namespace
    /// wholesale.
    fn install_namespace(&mut self, namespace: PluginNamespace) -> Result<(), DirectoryError>;
}

/// Copy one plugin namespace from `source` into `target`.
///
/// The target's existing namespace of the same name, if any, is replaced
/// wholesale. Returns the number of principals copied.
pub fn copy_plugin_namespace(
    source: &dyn PrincipalDirectory,
    target: &mut dyn PrincipalDirectory,
    name: &str,
) -> Result<usize, DirectoryError> {
    let namespace = source.export_namespace(name)?;
    let count = namespace.len();
    target.install_namespace(namespace)?;
    Ok(count)
}

/// A workspace whose roster defines principal reachability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace identifier.
    pub id: String,
}

impl Workspace {
    /// Create a workspace reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Provider of workspaces and their rosters for one site.
pub trait RosterProvider {
    /// List all workspaces of the site.
    fn list_workspaces(&self) -> Result<Vec<Workspace>, DirectoryError>;

    /// The roster of a workspace: ids of its active members.
    fn roster(&self, workspace: &Workspace) -> Result<BTreeSet<PrincipalId>, DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PrincipalId {
        PrincipalId::new(s).unwrap()
    }

    #[test]
    fn protected_set_contents() {
        let protected = protected_principals();
        assert_eq!(protected.len(), 4);
        assert!(protected.contains(&id("administrators")));
        assert!(protected.contains(&id("authenticated-users")));
        assert!(protected.contains(&id("site-administrators")));
        assert!(protected.contains(&id("reviewers")));
    }

    #[test]
    fn principal_constructors() {
        let user = Principal::user(id("alice"));
        assert_eq!(user.kind, PrincipalKind::User);
        let group = Principal::group(id("managers"));
        assert_eq!(group.kind, PrincipalKind::Group);
    }

    #[test]
    fn kind_display() {
        assert_eq!(PrincipalKind::User.to_string(), "user");
        assert_eq!(PrincipalKind::Group.to_string(), "group");
    }

    #[test]
    fn namespace_basics() {
        let mut ns = PluginNamespace::new("source_users");
        assert!(ns.is_empty());
        ns.entries.insert(id("alice"), Principal::user(id("alice")));
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn copy_namespace_between_memory_directories() {
        use super::memory::MemoryDirectory;

        let mut source = MemoryDirectory::new();
        source.seed_namespace("source_users", [Principal::user(id("alice"))]);

        let mut target = MemoryDirectory::new();
        target.seed_namespace("source_users", [Principal::user(id("stale"))]);

        let copied = copy_plugin_namespace(&source, &mut target, "source_users").unwrap();
        assert_eq!(copied, 1);

        let installed = target.export_namespace("source_users").unwrap();
        assert!(installed.entries.contains_key(&id("alice")));
        assert!(!installed.entries.contains_key(&id("stale")));
    }

    #[test]
    fn copy_missing_namespace_fails() {
        use super::memory::MemoryDirectory;

        let source = MemoryDirectory::new();
        let mut target = MemoryDirectory::new();
        let err = copy_plugin_namespace(&source, &mut target, "source_users").unwrap_err();
        assert!(matches!(err, DirectoryError::NamespaceNotFound { .. }));
    }
}
