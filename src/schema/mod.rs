//! schema
//!
//! Content-addressable deduplication of schema artifacts.
//!
//! # Design
//!
//! A schema definition's [`Signature`] is a pure deterministic function of
//! its normalized source bytes: identical source never produces two stored
//! artifacts. The [`SchemaIndex`] maps signature to the single canonical
//! artifact; entries are created once and never mutated or deleted within a
//! migration run.
//!
//! Blank or whitespace-only source is special-cased: it maps to the
//! reserved default signature and is never registered as an artifact.
//!
//! # Example
//!
//! ```
//! use restage::schema::{SchemaDefinition, SchemaIndex, Signature};
//!
//! let mut index = SchemaIndex::new();
//!
//! let sig = index.register(&SchemaDefinition::new("<schema/>"));
//! assert_eq!(index.len(), 1);
//!
//! // Identical source after normalization deduplicates.
//! let again = index.register(&SchemaDefinition::new("<schema/>\r\n"));
//! assert_eq!(sig, again);
//! assert_eq!(index.len(), 1);
//!
//! // Blank source maps to the reserved default and stores nothing.
//! let blank = index.register(&SchemaDefinition::new("   "));
//! assert!(blank.is_reserved_default());
//! assert_eq!(index.len(), 1);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Normalize schema source for signing.
///
/// Strips a UTF-8 BOM, normalizes CRLF and bare CR line endings to LF, and
/// trims leading/trailing whitespace. The signature contract ("identical
/// after normalization") is defined over the output of this function.
pub fn normalize_schema(source: &str) -> String {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let unified = source.replace("\r\n", "\n").replace('\r', "\n");
    unified.trim().to_string()
}

/// A deterministic content signature over normalized schema source.
///
/// Signatures are lowercase hex SHA-256 digests. The signature of empty
/// (blank or whitespace-only) source is the reserved default signature,
/// which denotes "no schema" and is never stored in an index.
///
/// # Example
///
/// ```
/// use restage::schema::Signature;
///
/// let a = Signature::compute("<schema/>");
/// let b = Signature::compute("<schema/>\n");
/// assert_eq!(a, b); // normalization strips the trailing newline
///
/// assert!(Signature::compute("").is_reserved_default());
/// assert!(Signature::compute("  \n ").is_reserved_default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature(String);

impl Signature {
    /// Compute the signature of the given schema source.
    ///
    /// Normalizes first; the result depends only on the normalized bytes.
    pub fn compute(source: &str) -> Self {
        let normalized = normalize_schema(source);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The reserved default signature: the signature of empty source.
    pub fn reserved_default() -> Self {
        Self::compute("")
    }

    /// Check whether this is the reserved default signature.
    pub fn is_reserved_default(&self) -> bool {
        *self == Self::reserved_default()
    }

    /// Get the signature as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema source plus associated style/rule metadata.
///
/// `styles` and `rules` mirror the presentation metadata carried next to
/// the schema source on form definitions; they default to an empty
/// stylesheet and an empty rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    source: String,
    #[serde(default)]
    styles: String,
    #[serde(default = "SchemaDefinition::default_rules")]
    rules: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<Signature>,
}

impl SchemaDefinition {
    fn default_rules() -> String {
        "{}".to_string()
    }

    /// Create a definition from schema source with default metadata.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            styles: String::new(),
            rules: Self::default_rules(),
            signature: None,
        }
    }

    /// Create a definition with explicit style/rule metadata.
    pub fn with_metadata(
        source: impl Into<String>,
        styles: impl Into<String>,
        rules: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            styles: styles.into(),
            rules: rules.into(),
            signature: None,
        }
    }

    /// The raw schema source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Associated stylesheet text.
    pub fn styles(&self) -> &str {
        &self.styles
    }

    /// Associated field rules (serialized).
    pub fn rules(&self) -> &str {
        &self.rules
    }

    /// The signature recorded on this definition, if any.
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Record a signature on this definition.
    pub fn set_signature(&mut self, signature: Signature) {
        self.signature = Some(signature);
    }

    /// Check whether the source is blank (normalizes to empty).
    pub fn is_blank(&self) -> bool {
        normalize_schema(&self.source).is_empty()
    }
}

/// A stored canonical schema artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaArtifact {
    /// Normalized schema source.
    pub source: String,
    /// Stylesheet carried with the first registration.
    pub styles: String,
    /// Field rules carried with the first registration.
    pub rules: String,
}

/// Content-hash-indexed store of schema artifacts.
///
/// Maps signature to the single canonical artifact for that source.
/// Registration is idempotent by construction: re-registering identical
/// source returns the existing signature and stores nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaIndex {
    entries: BTreeMap<Signature, SchemaArtifact>,
}

impl SchemaIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register schema source, returning its signature.
    ///
    /// - Blank source returns the reserved default signature; nothing is
    ///   stored.
    /// - A signature already present is returned unchanged; the existing
    ///   artifact is kept.
    /// - Otherwise the artifact (normalized source plus the definition's
    ///   style/rule metadata) is stored under the new signature.
    pub fn register(&mut self, defn: &SchemaDefinition) -> Signature {
        let normalized = normalize_schema(defn.source());
        if normalized.is_empty() {
            return Signature::reserved_default();
        }
        let signature = Signature::compute(&normalized);
        self.entries
            .entry(signature.clone())
            .or_insert_with(|| SchemaArtifact {
                source: normalized,
                styles: defn.styles().to_string(),
                rules: defn.rules().to_string(),
            });
        signature
    }

    /// Check whether a signature is present.
    ///
    /// The reserved default signature is always considered known: blank
    /// source needs no artifact.
    pub fn contains(&self, signature: &Signature) -> bool {
        signature.is_reserved_default() || self.entries.contains_key(signature)
    }

    /// Look up the canonical artifact for a signature.
    pub fn get(&self, signature: &Signature) -> Option<&SchemaArtifact> {
        self.entries.get(signature)
    }

    /// Number of stored artifacts (the reserved default never counts).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the index holds no artifacts.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over stored (signature, artifact) pairs in stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&Signature, &SchemaArtifact)> {
        self.entries.iter()
    }
}
