//! directory::memory
//!
//! In-memory directory and roster implementations for deterministic
//! testing.
//!
//! # Design
//!
//! `MemoryDirectory` stores plugin namespaces directly and derives the
//! principal listing from them. `MemoryRosters` maps workspace ids to
//! member sets. Both support configuring a failure for a specific
//! operation, so error paths can be exercised without a real backend.
//!
//! # Example
//!
//! ```
//! use restage::core::types::PrincipalId;
//! use restage::directory::memory::MemoryDirectory;
//! use restage::directory::{Principal, PrincipalDirectory, PrincipalKind};
//!
//! let mut directory = MemoryDirectory::new();
//! directory.seed_namespace(
//!     "source_users",
//!     [Principal::user(PrincipalId::new("alice").unwrap())],
//! );
//!
//! let users = directory.list_principals(PrincipalKind::User).unwrap();
//! assert_eq!(users.len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::PrincipalId;
use crate::directory::{
    DirectoryError, PluginNamespace, Principal, PrincipalDirectory, PrincipalKind, RosterProvider,
    Workspace,
};

/// Configuration for which directory operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `list_principals` with the given backend message.
    ListPrincipals(String),
    /// Fail `remove_principal` with the given backend message.
    RemovePrincipal(String),
    /// Fail `export_namespace` with the given backend message.
    ExportNamespace(String),
    /// Fail `install_namespace` with the given backend message.
    InstallNamespace(String),
}

/// In-memory principal directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    namespaces: BTreeMap<String, PluginNamespace>,
    fail_on: Option<FailOn>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a namespace with the given principals, replacing any existing
    /// namespace of that name.
    pub fn seed_namespace(
        &mut self,
        name: impl Into<String>,
        principals: impl IntoIterator<Item = Principal>,
    ) {
        let name = name.into();
        let mut namespace = PluginNamespace::new(name.clone());
        for principal in principals {
            namespace.entries.insert(principal.id.clone(), principal);
        }
        self.namespaces.insert(name, namespace);
    }

    /// Configure one operation to fail.
    pub fn set_fail_on(&mut self, fail_on: Option<FailOn>) {
        self.fail_on = fail_on;
    }

    /// All principal ids currently present, across namespaces.
    pub fn all_ids(&self) -> BTreeSet<PrincipalId> {
        self.namespaces
            .values()
            .flat_map(|ns| ns.entries.keys().cloned())
            .collect()
    }
}

impl PrincipalDirectory for MemoryDirectory {
    fn list_principals(&self, kind: PrincipalKind) -> Result<Vec<Principal>, DirectoryError> {
        if let Some(FailOn::ListPrincipals(message)) = &self.fail_on {
            return Err(DirectoryError::Backend(message.clone()));
        }
        let mut out: Vec<Principal> = self
            .namespaces
            .values()
            .flat_map(|ns| ns.entries.values())
            .filter(|p| p.kind == kind)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);
        Ok(out)
    }

    fn remove_principal(&mut self, id: &PrincipalId) -> Result<(), DirectoryError> {
        if let Some(FailOn::RemovePrincipal(message)) = &self.fail_on {
            return Err(DirectoryError::Backend(message.clone()));
        }
        let mut removed = false;
        for namespace in self.namespaces.values_mut() {
            removed |= namespace.entries.remove(id).is_some();
        }
        if removed {
            Ok(())
        } else {
            Err(DirectoryError::PrincipalNotFound {
                id: id.to_string(),
            })
        }
    }

    fn export_namespace(&self, name: &str) -> Result<PluginNamespace, DirectoryError> {
        if let Some(FailOn::ExportNamespace(message)) = &self.fail_on {
            return Err(DirectoryError::Backend(message.clone()));
        }
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| DirectoryError::NamespaceNotFound {
                name: name.to_string(),
            })
    }

    fn install_namespace(&mut self, namespace: PluginNamespace) -> Result<(), DirectoryError> {
        if let Some(FailOn::InstallNamespace(message)) = &self.fail_on {
            return Err(DirectoryError::Backend(message.clone()));
        }
        self.namespaces
            .insert(namespace.name.clone(), namespace);
        Ok(())
    }
}

/// In-memory workspace roster provider.
#[derive(Debug, Clone, Default)]
pub struct MemoryRosters {
    rosters: BTreeMap<String, BTreeSet<PrincipalId>>,
}

impl MemoryRosters {
    /// Create a provider with no workspaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a workspace roster.
    pub fn seed_workspace(
        &mut self,
        id: impl Into<String>,
        members: impl IntoIterator<Item = PrincipalId>,
    ) {
        self.rosters.insert(id.into(), members.into_iter().collect());
    }
}

impl RosterProvider for MemoryRosters {
    fn list_workspaces(&self) -> Result<Vec<Workspace>, DirectoryError> {
        Ok(self.rosters.keys().map(|id| Workspace::new(id.clone())).collect())
    }

    fn roster(&self, workspace: &Workspace) -> Result<BTreeSet<PrincipalId>, DirectoryError> {
        self.rosters
            .get(&workspace.id)
            .cloned()
            .ok_or_else(|| DirectoryError::Backend(format!("unknown workspace: {}", workspace.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PrincipalId {
        PrincipalId::new(s).unwrap()
    }

    mod directory {
        use super::*;

        fn seeded() -> MemoryDirectory {
            let mut directory = MemoryDirectory::new();
            directory.seed_namespace(
                "source_users",
                [Principal::user(id("alice")), Principal::user(id("bob"))],
            );
            directory.seed_namespace("source_groups", [Principal::group(id("managers"))]);
            directory
        }

        #[test]
        fn list_filters_by_kind() {
            let directory = seeded();
            let users = directory.list_principals(PrincipalKind::User).unwrap();
            assert_eq!(users.len(), 2);
            let groups = directory.list_principals(PrincipalKind::Group).unwrap();
            assert_eq!(groups.len(), 1);
            assert_eq!(groups[0].id, id("managers"));
        }

        #[test]
        fn list_is_sorted() {
            let directory = seeded();
            let users = directory.list_principals(PrincipalKind::User).unwrap();
            assert_eq!(users[0].id, id("alice"));
            assert_eq!(users[1].id, id("bob"));
        }

        #[test]
        fn remove_deletes_from_namespaces() {
            let mut directory = seeded();
            directory.remove_principal(&id("alice")).unwrap();
            assert!(!directory.all_ids().contains(&id("alice")));
        }

        #[test]
        fn remove_missing_fails() {
            let mut directory = seeded();
            let err = directory.remove_principal(&id("nobody")).unwrap_err();
            assert!(matches!(err, DirectoryError::PrincipalNotFound { .. }));
        }

        #[test]
        fn install_replaces_wholesale() {
            let mut directory = seeded();
            directory.install_namespace(PluginNamespace::new("source_users")).unwrap();
            let ns = directory.export_namespace("source_users").unwrap();
            assert!(ns.is_empty());
        }

        #[test]
        fn configured_failure_fires() {
            let mut directory = seeded();
            directory.set_fail_on(Some(FailOn::RemovePrincipal("backend down".into())));
            let err = directory.remove_principal(&id("alice")).unwrap_err();
            assert!(matches!(err, DirectoryError::Backend(_)));

            directory.set_fail_on(None);
            directory.remove_principal(&id("alice")).unwrap();
        }
    }

    mod rosters {
        use super::*;

        #[test]
        fn list_and_lookup() {
            let mut rosters = MemoryRosters::new();
            rosters.seed_workspace("proj-a", [id("alice"), id("bob")]);
            rosters.seed_workspace("proj-b", [id("bob")]);

            let workspaces = rosters.list_workspaces().unwrap();
            assert_eq!(workspaces.len(), 2);

            let roster = rosters.roster(&Workspace::new("proj-a")).unwrap();
            assert_eq!(roster.len(), 2);
        }

        #[test]
        fn unknown_workspace_fails() {
            let rosters = MemoryRosters::new();
            assert!(rosters.roster(&Workspace::new("missing")).is_err());
        }
    }
}
