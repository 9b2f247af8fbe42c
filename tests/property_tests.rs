//! Property-based tests for core domain invariants.
//!
//! These tests use proptest to verify invariants hold across randomly
//! generated inputs: signature determinism, GC set algebra, path
//! normalization, and capsule round-trips.

use std::collections::BTreeSet;

use proptest::prelude::*;

use restage::core::paths::PathResolver;
use restage::core::types::{ContentPath, IdentityToken, PrincipalId};
use restage::directory::memory::MemoryDirectory;
use restage::directory::{Principal, PrincipalKind};
use restage::engine::trim::{gc, TrimError};
use restage::schema::{normalize_schema, SchemaDefinition, SchemaIndex, Signature};
use restage::store::capsule;
use restage::store::ContentObject;

/// Strategy for a lowercase identifier segment.
fn segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z0-9][a-z0-9-]{0,8}").expect("valid regex")
}

/// Strategy for a relative content path of 1..4 segments.
fn content_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..4).prop_map(|segments| segments.join("/"))
}

/// Strategy for principal id sets.
fn principal_ids() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(segment(), 0..8)
}

/// Strategy for schema source text, including whitespace noise.
fn schema_source() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[ -~\\r\\n\\t]{0,64}").expect("valid regex")
}

fn pid(s: &str) -> PrincipalId {
    PrincipalId::new(s).unwrap()
}

proptest! {
    /// Any valid content path round-trips through serde.
    #[test]
    fn content_path_serde_roundtrip(raw in content_path()) {
        let path = ContentPath::new(&raw).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        let parsed: ContentPath = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(path, parsed);
    }

    /// join then split_container is the identity.
    #[test]
    fn content_path_join_split_inverse(raw in content_path(), name in segment()) {
        let base = ContentPath::new(&raw).unwrap();
        let joined = base.join(&name).unwrap();
        let (container, split_name) = joined.split_container().unwrap();
        prop_assert_eq!(container, base);
        prop_assert_eq!(split_name, name.as_str());
    }

    /// Normalization strips the leading slash and source-root prefix no
    /// matter how the raw path arrives.
    #[test]
    fn resolver_normalize_is_prefix_insensitive(root in segment(), rel in content_path()) {
        prop_assume!(!rel.starts_with(&format!("{}/", root)) && rel != root);
        let resolver = PathResolver::new(
            ContentPath::new(&root).unwrap(),
            ContentPath::new("target").unwrap(),
        );

        let plain = resolver.normalize(&rel).unwrap();
        let slashed = resolver.normalize(&format!("/{}", rel)).unwrap();
        let rooted = resolver.normalize(&format!("{}/{}", root, rel)).unwrap();
        let both = resolver.normalize(&format!("/{}/{}", root, rel)).unwrap();

        prop_assert_eq!(&plain, &slashed);
        prop_assert_eq!(&plain, &rooted);
        prop_assert_eq!(&plain, &both);
        prop_assert_eq!(plain.as_str(), rel.as_str());
    }

    /// Signatures are deterministic and normalization-insensitive.
    #[test]
    fn signature_deterministic(source in schema_source()) {
        prop_assert_eq!(Signature::compute(&source), Signature::compute(&source));

        // Trailing newline noise never changes the signature.
        let noisy = format!("{}\r\n", source);
        prop_assert_eq!(Signature::compute(&source), Signature::compute(&noisy));
    }

    /// Registering byte-identical-after-normalization sources yields one
    /// signature and exactly one stored artifact.
    #[test]
    fn register_is_idempotent(source in schema_source()) {
        let mut index = SchemaIndex::new();
        let a = index.register(&SchemaDefinition::new(source.clone()));
        let b = index.register(&SchemaDefinition::new(format!("{}\n", source)));
        prop_assert_eq!(&a, &b);

        if normalize_schema(&source).is_empty() {
            prop_assert!(a.is_reserved_default());
            prop_assert_eq!(index.len(), 0);
        } else {
            prop_assert_eq!(index.len(), 1);
        }
    }

    /// gc removes exactly `P \ (R ∪ Q)`, or refuses when nothing would
    /// survive; either way the surviving set is `P ∩ (R ∪ Q)` afterwards
    /// (P itself when the pass refused).
    #[test]
    fn gc_set_algebra(
        population in principal_ids(),
        reachable_raw in principal_ids(),
        protected_raw in principal_ids(),
    ) {
        let mut directory = MemoryDirectory::new();
        directory.seed_namespace(
            "source_users",
            population.iter().map(|id| Principal::user(pid(id))),
        );

        let reachable: BTreeSet<PrincipalId> = reachable_raw.iter().map(|s| pid(s)).collect();
        let protected: BTreeSet<PrincipalId> = protected_raw.iter().map(|s| pid(s)).collect();
        let covered: BTreeSet<PrincipalId> = reachable.union(&protected).cloned().collect();

        let expected_removals: BTreeSet<PrincipalId> = population
            .iter()
            .map(|s| pid(s))
            .filter(|id| !covered.contains(id))
            .collect();

        let result = gc(&mut directory, PrincipalKind::User, &reachable, &protected);

        if !population.is_empty() && expected_removals.len() == population.len() {
            let is_inconsistent = matches!(result, Err(TrimError::Inconsistent { .. }));
            prop_assert!(is_inconsistent);
            // Zero partial effect.
            prop_assert_eq!(directory.all_ids().len(), population.len());
        } else {
            let removed = result.unwrap();
            prop_assert_eq!(&removed, &expected_removals);

            // Survivors are exactly the covered members of the population.
            let expected_survivors: BTreeSet<PrincipalId> = population
                .iter()
                .map(|s| pid(s))
                .filter(|id| covered.contains(id))
                .collect();
            prop_assert_eq!(directory.all_ids(), expected_survivors);
        }
    }

    /// A capsule round-trip reproduces the subtree exactly, identities
    /// included.
    #[test]
    fn capsule_roundtrip(
        names in prop::collection::vec(segment(), 1..5),
        link_outside in any::<bool>(),
    ) {
        let mut root = ContentObject::container(IdentityToken::new("root").unwrap());
        let mut previous = IdentityToken::new("root").unwrap();
        for (i, name) in names.iter().enumerate() {
            let identity = IdentityToken::new(format!("id-{}", i)).unwrap();
            let mut child = ContentObject::definition(
                identity.clone(),
                SchemaDefinition::new(format!("<s{}/>", i)),
            );
            // Link each child at the previously created node; mix in an
            // external reference sometimes.
            child.add_link(previous.clone());
            if link_outside {
                child.add_link(IdentityToken::new("elsewhere").unwrap());
            }
            root.children_mut().insert(format!("{}-{}", name, i), child);
            previous = identity;
        }

        let encoded = capsule::encode(&root).unwrap();
        let decoded = capsule::decode(&encoded).unwrap();
        prop_assert_eq!(root, decoded);
    }
}
