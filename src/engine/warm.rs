//! engine::warm
//!
//! Best-effort derived-cache warming.
//!
//! # Design
//!
//! After migration, derived aggregates (summaries computed from form
//! content) are stale. Warming walks every known cache domain and forces
//! recomputation for each content identity. The contract is "attempted all
//! items": a failure on one item is reported as a
//! [`WarmItemFailed`](crate::engine::progress::ProgressEvent) event and the
//! sweep continues. Nothing here can abort a run.
//!
//! Cache backends report failures as opaque [`anyhow::Error`] values; the
//! engine only ever displays them.

use serde::{Deserialize, Serialize};

use crate::core::types::IdentityToken;
use crate::engine::progress::{ProgressEvent, Reporter};

/// A named domain of derived aggregates (one cache keyspace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheDomain(String);

impl CacheDomain {
    /// Create a cache domain name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The domain name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derived-cache collaborator.
pub trait DerivedCache {
    /// The known cache domains, in warm order.
    fn domains(&self) -> Vec<CacheDomain>;

    /// Force recomputation of the aggregate for one identity in one
    /// domain.
    fn recompute(&mut self, domain: &CacheDomain, identity: &IdentityToken) -> anyhow::Result<()>;
}

/// Outcome of a warming sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WarmStats {
    /// Domain-identity pairs attempted.
    pub attempted: u64,
    /// Pairs that failed (and were skipped past).
    pub failed: u64,
}

/// Warm every domain for every identity. Never fails.
///
/// Failures are recorded through the reporter; the sweep always visits
/// every pair.
pub fn warm(
    cache: &mut dyn DerivedCache,
    identities: &[IdentityToken],
    reporter: &mut dyn Reporter,
) -> WarmStats {
    let mut stats = WarmStats::default();
    for domain in cache.domains() {
        for identity in identities {
            stats.attempted += 1;
            if let Err(err) = cache.recompute(&domain, identity) {
                stats.failed += 1;
                reporter.record(ProgressEvent::warm_item_failed(
                    domain.to_string(),
                    identity.to_string(),
                    format!("{:#}", err),
                ));
            }
        }
    }
    stats
}

/// In-memory cache for tests: records recomputations, fails on demand.
#[derive(Debug, Default)]
pub struct MemoryCache {
    domains: Vec<CacheDomain>,
    recomputed: Vec<(CacheDomain, IdentityToken)>,
    fail_for: Vec<IdentityToken>,
}

impl MemoryCache {
    /// Create a cache with the given domains.
    pub fn with_domains(names: &[&str]) -> Self {
        Self {
            domains: names.iter().map(|name| CacheDomain::new(*name)).collect(),
            recomputed: Vec::new(),
            fail_for: Vec::new(),
        }
    }

    /// Make recomputation fail for the given identity in every domain.
    pub fn fail_for(&mut self, identity: IdentityToken) {
        self.fail_for.push(identity);
    }

    /// All successful recomputations, in order.
    pub fn recomputed(&self) -> &[(CacheDomain, IdentityToken)] {
        &self.recomputed
    }
}

impl DerivedCache for MemoryCache {
    fn domains(&self) -> Vec<CacheDomain> {
        self.domains.clone()
    }

    fn recompute(&mut self, domain: &CacheDomain, identity: &IdentityToken) -> anyhow::Result<()> {
        if self.fail_for.contains(identity) {
            anyhow::bail!("no data points for {}", identity);
        }
        self.recomputed.push((domain.clone(), identity.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::progress::MemoryReporter;

    fn token(s: &str) -> IdentityToken {
        IdentityToken::new(s).unwrap()
    }

    #[test]
    fn warms_every_domain_identity_pair() {
        let mut cache = MemoryCache::with_domains(&["datapoints", "summaries"]);
        let mut reporter = MemoryReporter::new();
        let identities = vec![token("f1"), token("f2")];

        let stats = warm(&mut cache, &identities, &mut reporter);
        assert_eq!(stats.attempted, 4);
        assert_eq!(stats.failed, 0);
        assert_eq!(cache.recomputed().len(), 4);
        assert!(reporter.events().is_empty());
    }

    #[test]
    fn failure_is_logged_and_sweep_continues() {
        let mut cache = MemoryCache::with_domains(&["datapoints"]);
        cache.fail_for(token("f2"));
        let mut reporter = MemoryReporter::new();
        let identities = vec![token("f1"), token("f2"), token("f3")];

        let stats = warm(&mut cache, &identities, &mut reporter);
        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.failed, 1);
        // f3 was still attempted after f2 failed.
        assert_eq!(cache.recomputed().len(), 2);

        assert_eq!(reporter.labels(), vec!["warm_item_failed"]);
        match &reporter.events()[0] {
            ProgressEvent::WarmItemFailed {
                domain,
                identity,
                reason,
                ..
            } => {
                assert_eq!(domain, "datapoints");
                assert_eq!(identity, "f2");
                assert!(reason.contains("no data points"));
            }
            _ => panic!("wrong event"),
        }
    }

    #[test]
    fn no_identities_is_a_clean_noop() {
        let mut cache = MemoryCache::with_domains(&["datapoints"]);
        let mut reporter = MemoryReporter::new();
        let stats = warm(&mut cache, &[], &mut reporter);
        assert_eq!(stats, WarmStats::default());
    }

    #[test]
    fn no_domains_is_a_clean_noop() {
        let mut cache = MemoryCache::with_domains(&[]);
        let mut reporter = MemoryReporter::new();
        let stats = warm(&mut cache, &[token("f1")], &mut reporter);
        assert_eq!(stats, WarmStats::default());
    }
}
