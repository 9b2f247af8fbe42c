//! core::paths
//!
//! Centralized path mapping between differently-rooted content trees.
//!
//! # Architecture
//!
//! A migration run reads from a source tree and writes into a target tree,
//! and the two are rooted at different site containers. All cross-tree path
//! arithmetic goes through [`PathResolver`]; no other module rebases or
//! strips root prefixes ad hoc.
//!
//! Raw paths arriving from enumerators or operator input may carry a leading
//! `/` and may or may not include the source root prefix.
//! [`PathResolver::normalize`] accepts both shapes and produces a
//! root-relative [`ContentPath`].
//!
//! # Example
//!
//! ```
//! use restage::core::paths::PathResolver;
//! use restage::core::types::ContentPath;
//!
//! let resolver = PathResolver::new(
//!     ContentPath::new("teamspace").unwrap(),
//!     ContentPath::new("campus").unwrap(),
//! );
//!
//! // Leading slash and source-root prefix are both stripped.
//! let rel = resolver.normalize("/teamspace/projA/form1").unwrap();
//! assert_eq!(rel.as_str(), "projA/form1");
//!
//! assert_eq!(resolver.to_source(&rel).as_str(), "teamspace/projA/form1");
//! assert_eq!(resolver.to_target(&rel).as_str(), "campus/projA/form1");
//! ```

use crate::core::types::{ContentPath, TypeError};

/// Maps logical content paths between a source tree and a target tree.
///
/// Both roots are explicit constructor arguments; nothing here consults
/// ambient "current site" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    /// Root of the read-only source tree.
    source_root: ContentPath,
    /// Root of the target tree.
    target_root: ContentPath,
}

impl PathResolver {
    /// Create a resolver for the given source and target roots.
    pub fn new(source_root: ContentPath, target_root: ContentPath) -> Self {
        Self {
            source_root,
            target_root,
        }
    }

    /// The source tree root.
    pub fn source_root(&self) -> &ContentPath {
        &self.source_root
    }

    /// The target tree root.
    pub fn target_root(&self) -> &ContentPath {
        &self.target_root
    }

    /// Normalize a raw path into a root-relative [`ContentPath`].
    ///
    /// Strips a single leading `/` and, if the remainder starts with the
    /// source root on a segment boundary, strips that prefix too. The
    /// normalized result never includes either root.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidContentPath` if the stripped remainder is
    /// not a valid path, or if it is empty (the roots themselves are not
    /// transferable entries).
    pub fn normalize(&self, raw: &str) -> Result<ContentPath, TypeError> {
        let trimmed = raw.strip_prefix('/').unwrap_or(raw);
        let path = ContentPath::new(trimmed)?;
        match path.strip_prefix(&self.source_root) {
            Some(rest) if rest.is_root() => Err(TypeError::InvalidContentPath(format!(
                "path '{}' names the source root itself",
                raw
            ))),
            Some(rest) => Ok(rest),
            None => Ok(path),
        }
    }

    /// Rebase a root-relative path under the source root.
    pub fn to_source(&self, rel: &ContentPath) -> ContentPath {
        Self::rebase(&self.source_root, rel)
    }

    /// Rebase a root-relative path under the target root.
    pub fn to_target(&self, rel: &ContentPath) -> ContentPath {
        Self::rebase(&self.target_root, rel)
    }

    fn rebase(root: &ContentPath, rel: &ContentPath) -> ContentPath {
        let mut out = root.clone();
        for segment in rel.segments() {
            // Segments of an already-validated path revalidate trivially.
            out = out.join(segment).expect("validated segment");
        }
        out
    }
}
