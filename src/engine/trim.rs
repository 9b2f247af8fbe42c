//! engine::trim
//!
//! Membership graph collection and principal garbage collection.
//!
//! # Design
//!
//! Reachability is defined entirely by workspace rosters: a principal is
//! reachable iff at least one workspace's roster names it. The reachable
//! set is computed once per run and reused for both GC passes (groups,
//! then users).
//!
//! GC removes exactly `candidates \ (reachable ∪ protected)`. One safety
//! invariant guards the whole pass: if removal would leave zero survivors
//! in a non-empty candidate population, the pass aborts with
//! [`TrimError::Inconsistent`] and removes nothing. All-or-nothing per
//! invocation.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::types::PrincipalId;
use crate::directory::{DirectoryError, PrincipalDirectory, PrincipalKind, RosterProvider};

/// Errors from membership collection and GC.
#[derive(Debug, Error)]
pub enum TrimError {
    /// Removal would leave no surviving principals of this kind.
    ///
    /// The pass aborts with zero partial effect.
    #[error("gc would remove all {count} {kind} principals; aborting with no removals")]
    Inconsistent {
        /// Which population was at risk
        kind: PrincipalKind,
        /// Size of the candidate population
        count: usize,
    },

    /// Directory or roster backend failed.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Compute the set of principal ids reachable from all workspace rosters.
///
/// The union of every workspace's roster; a principal named by any roster
/// is reachable.
pub fn reachable(rosters: &dyn RosterProvider) -> Result<BTreeSet<PrincipalId>, TrimError> {
    let mut out = BTreeSet::new();
    for workspace in rosters.list_workspaces()? {
        out.extend(rosters.roster(&workspace)?);
    }
    Ok(out)
}

/// Garbage-collect principals of one kind.
///
/// A principal is removed iff it is listed by the directory, absent from
/// `reachable`, and absent from `protected`. Returns the removed set.
///
/// # Errors
///
/// [`TrimError::Inconsistent`] if removal would empty a non-empty
/// population; nothing is removed in that case.
pub fn gc(
    directory: &mut dyn PrincipalDirectory,
    kind: PrincipalKind,
    reachable: &BTreeSet<PrincipalId>,
    protected: &BTreeSet<PrincipalId>,
) -> Result<BTreeSet<PrincipalId>, TrimError> {
    let candidates: Vec<PrincipalId> = directory
        .list_principals(kind)?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let removals: BTreeSet<PrincipalId> = candidates
        .iter()
        .filter(|id| !reachable.contains(*id) && !protected.contains(*id))
        .cloned()
        .collect();

    // Decide the whole pass before touching the directory.
    if !candidates.is_empty() && removals.len() == candidates.len() {
        return Err(TrimError::Inconsistent {
            kind,
            count: candidates.len(),
        });
    }

    for id in &removals {
        directory.remove_principal(id)?;
    }
    Ok(removals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::memory::{MemoryDirectory, MemoryRosters};
    use crate::directory::Principal;

    fn id(s: &str) -> PrincipalId {
        PrincipalId::new(s).unwrap()
    }

    fn ids(items: &[&str]) -> BTreeSet<PrincipalId> {
        items.iter().map(|s| id(s)).collect()
    }

    mod reachable_set {
        use super::*;

        #[test]
        fn union_of_all_rosters() {
            let mut rosters = MemoryRosters::new();
            rosters.seed_workspace("proj-a", [id("alice"), id("bob")]);
            rosters.seed_workspace("proj-b", [id("bob"), id("carol")]);

            let set = reachable(&rosters).unwrap();
            assert_eq!(set, ids(&["alice", "bob", "carol"]));
        }

        #[test]
        fn no_workspaces_means_empty() {
            let rosters = MemoryRosters::new();
            assert!(reachable(&rosters).unwrap().is_empty());
        }
    }

    mod gc_pass {
        use super::*;

        fn directory_with_users(users: &[&str]) -> MemoryDirectory {
            let mut directory = MemoryDirectory::new();
            directory.seed_namespace(
                "source_users",
                users.iter().map(|u| Principal::user(id(u))),
            );
            directory
        }

        #[test]
        fn removes_exactly_unreachable_unprotected() {
            let mut directory = directory_with_users(&["alice", "bob", "carol"]);
            let removed = gc(
                &mut directory,
                PrincipalKind::User,
                &ids(&["alice", "bob"]),
                &BTreeSet::new(),
            )
            .unwrap();
            assert_eq!(removed, ids(&["carol"]));
            assert_eq!(directory.all_ids(), ids(&["alice", "bob"]));
        }

        #[test]
        fn protected_survive_even_unreachable() {
            let mut directory = MemoryDirectory::new();
            directory.seed_namespace(
                "source_groups",
                [
                    Principal::group(id("administrators")),
                    Principal::group(id("proj-a.members")),
                ],
            );
            let removed = gc(
                &mut directory,
                PrincipalKind::Group,
                &BTreeSet::new(),
                &crate::directory::protected_principals(),
            )
            .unwrap();
            assert_eq!(removed, ids(&["proj-a.members"]));
            assert!(directory.all_ids().contains(&id("administrators")));
        }

        #[test]
        fn fully_covered_population_is_noop() {
            let mut directory = directory_with_users(&["alice", "bob"]);
            let removed = gc(
                &mut directory,
                PrincipalKind::User,
                &ids(&["alice"]),
                &ids(&["bob"]),
            )
            .unwrap();
            assert!(removed.is_empty());
            assert_eq!(directory.all_ids().len(), 2);
        }

        #[test]
        fn refusing_to_empty_the_population() {
            let mut directory = directory_with_users(&["admin"]);
            let err = gc(
                &mut directory,
                PrincipalKind::User,
                &BTreeSet::new(),
                &BTreeSet::new(),
            )
            .unwrap_err();
            assert!(matches!(
                err,
                TrimError::Inconsistent {
                    kind: PrincipalKind::User,
                    count: 1
                }
            ));
            // Zero partial effect.
            assert!(directory.all_ids().contains(&id("admin")));
        }

        #[test]
        fn empty_population_is_noop_not_inconsistent() {
            let mut directory = MemoryDirectory::new();
            directory.seed_namespace("source_users", []);
            let removed = gc(
                &mut directory,
                PrincipalKind::User,
                &BTreeSet::new(),
                &BTreeSet::new(),
            )
            .unwrap();
            assert!(removed.is_empty());
        }

        #[test]
        fn kinds_are_independent() {
            let mut directory = MemoryDirectory::new();
            directory.seed_namespace("source_users", [Principal::user(id("alice"))]);
            directory.seed_namespace(
                "source_groups",
                [
                    Principal::group(id("administrators")),
                    Principal::group(id("stale-group")),
                ],
            );
            let reachable = ids(&["alice"]);
            let protected = crate::directory::protected_principals();

            let groups = gc(&mut directory, PrincipalKind::Group, &reachable, &protected).unwrap();
            assert_eq!(groups, ids(&["stale-group"]));

            let users = gc(&mut directory, PrincipalKind::User, &reachable, &protected).unwrap();
            assert!(users.is_empty());
        }

        #[test]
        fn backend_failure_propagates() {
            use crate::directory::memory::FailOn;

            let mut directory = directory_with_users(&["alice"]);
            directory.set_fail_on(Some(FailOn::ListPrincipals("down".into())));
            let err = gc(
                &mut directory,
                PrincipalKind::User,
                &ids(&["alice"]),
                &BTreeSet::new(),
            )
            .unwrap_err();
            assert!(matches!(err, TrimError::Directory(_)));
        }
    }
}
