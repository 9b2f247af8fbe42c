//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`IdentityToken`] - Stable entity identity, preserved across stores
//! - [`ContentPath`] - Normalized logical content path
//! - [`PrincipalId`] - Account identifier (user or group)
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use restage::core::types::{ContentPath, IdentityToken, PrincipalId};
//!
//! // Valid constructions
//! let token = IdentityToken::new("u123").unwrap();
//! let path = ContentPath::new("projA/form1").unwrap();
//! let principal = PrincipalId::new("alice").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(IdentityToken::new("").is_err());
//! assert!(ContentPath::new("/absolute").is_err());
//! assert!(PrincipalId::new("  ").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identity token: {0}")]
    InvalidIdentityToken(String),

    #[error("invalid content path: {0}")]
    InvalidContentPath(String),

    #[error("invalid principal id: {0}")]
    InvalidPrincipalId(String),
}

/// A stable identity token for a content entity.
///
/// Identity tokens are unique within a store and stable across transfer:
/// exporting an object from one store and importing it into another must
/// yield an object with the same token.
///
/// Tokens must be non-empty and must not contain whitespace, `/`, or
/// control characters.
///
/// # Example
///
/// ```
/// use restage::core::types::IdentityToken;
///
/// let token = IdentityToken::new("u123").unwrap();
/// assert_eq!(token.as_str(), "u123");
///
/// // Freshly generated tokens are unique
/// let a = IdentityToken::generate();
/// let b = IdentityToken::generate();
/// assert_ne!(a, b);
///
/// assert!(IdentityToken::new("").is_err());
/// assert!(IdentityToken::new("has space").is_err());
/// assert!(IdentityToken::new("a/b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityToken(String);

impl IdentityToken {
    /// Create a new validated identity token.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidIdentityToken` if the token is empty or
    /// contains whitespace, `/`, or control characters.
    pub fn new(token: impl Into<String>) -> Result<Self, TypeError> {
        let token = token.into();
        Self::validate(&token)?;
        Ok(Self(token))
    }

    /// Generate a fresh unique token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    fn validate(token: &str) -> Result<(), TypeError> {
        if token.is_empty() {
            return Err(TypeError::InvalidIdentityToken(
                "identity token cannot be empty".into(),
            ));
        }
        if token.contains('/') {
            return Err(TypeError::InvalidIdentityToken(
                "identity token cannot contain '/'".into(),
            ));
        }
        for c in token.chars() {
            if c.is_whitespace() || c.is_control() {
                return Err(TypeError::InvalidIdentityToken(
                    "identity token cannot contain whitespace or control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdentityToken {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<IdentityToken> for String {
    fn from(token: IdentityToken) -> Self {
        token.0
    }
}

impl AsRef<str> for IdentityToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A normalized logical content path.
///
/// Content paths are relative, `/`-joined, and validated:
/// - No leading or trailing `/`
/// - No empty segments (`//`)
/// - No `.` or `..` segments
/// - No control characters; segments cannot be whitespace-only
///
/// The empty path denotes the store root and can only be obtained via
/// [`ContentPath::root`].
///
/// # Example
///
/// ```
/// use restage::core::types::ContentPath;
///
/// let path = ContentPath::new("projA/form-library/form1").unwrap();
/// assert_eq!(path.name(), Some("form1"));
/// assert_eq!(path.parent().unwrap().as_str(), "projA/form-library");
///
/// let (container, name) = path.split_container().unwrap();
/// assert_eq!(container.as_str(), "projA/form-library");
/// assert_eq!(name, "form1");
///
/// assert!(ContentPath::new("/leading").is_err());
/// assert!(ContentPath::new("a//b").is_err());
/// assert!(ContentPath::new("a/../b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentPath(String);

impl ContentPath {
    /// Create a new validated content path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidContentPath` if the path is empty, absolute,
    /// or contains invalid segments.
    pub fn new(path: impl Into<String>) -> Result<Self, TypeError> {
        let path = path.into();
        Self::validate(&path)?;
        Ok(Self(path))
    }

    /// The store root (empty path).
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Check whether this is the store root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(path: &str) -> Result<(), TypeError> {
        if path.is_empty() {
            return Err(TypeError::InvalidContentPath(
                "content path cannot be empty (use ContentPath::root)".into(),
            ));
        }
        if path.starts_with('/') {
            return Err(TypeError::InvalidContentPath(
                "content path cannot start with '/'".into(),
            ));
        }
        if path.ends_with('/') {
            return Err(TypeError::InvalidContentPath(
                "content path cannot end with '/'".into(),
            ));
        }
        for segment in path.split('/') {
            Self::validate_segment(segment)?;
        }
        Ok(())
    }

    fn validate_segment(segment: &str) -> Result<(), TypeError> {
        if segment.is_empty() {
            return Err(TypeError::InvalidContentPath(
                "content path cannot contain empty segments".into(),
            ));
        }
        if segment == "." || segment == ".." {
            return Err(TypeError::InvalidContentPath(
                "content path cannot contain '.' or '..' segments".into(),
            ));
        }
        if segment.chars().all(char::is_whitespace) {
            return Err(TypeError::InvalidContentPath(
                "content path segment cannot be whitespace-only".into(),
            ));
        }
        for c in segment.chars() {
            if c.is_control() {
                return Err(TypeError::InvalidContentPath(
                    "content path cannot contain control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Append a name, producing a child path.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidContentPath` if `name` is not a valid
    /// single segment.
    pub fn join(&self, name: &str) -> Result<Self, TypeError> {
        if name.contains('/') {
            return Err(TypeError::InvalidContentPath(
                "joined name cannot contain '/'".into(),
            ));
        }
        Self::validate_segment(name)?;
        if self.is_root() {
            Ok(Self(name.to_string()))
        } else {
            Ok(Self(format!("{}/{}", self.0, name)))
        }
    }

    /// The final segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }

    /// The containing path, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(i) => Some(Self(self.0[..i].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Split into (container, name), or `None` for the root.
    pub fn split_container(&self) -> Option<(Self, &str)> {
        let parent = self.parent()?;
        let name = self.name()?;
        Some((parent, name))
    }

    /// Iterate over path segments. Empty for the root.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Check whether this path starts with `prefix` on a segment boundary.
    pub fn starts_with(&self, prefix: &ContentPath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.0 == prefix.0 || self.0.starts_with(&format!("{}/", prefix.0))
    }

    /// Strip a prefix on a segment boundary.
    ///
    /// Returns the remainder as a path (the root if the paths are equal),
    /// or `None` if `prefix` is not a prefix of this path.
    pub fn strip_prefix(&self, prefix: &ContentPath) -> Option<Self> {
        if prefix.is_root() {
            return Some(self.clone());
        }
        if self.0 == prefix.0 {
            return Some(Self::root());
        }
        self.0
            .strip_prefix(&format!("{}/", prefix.0))
            .map(|rest| Self(rest.to_string()))
    }

    /// Get the path as a string slice. The root is the empty string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentPath {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        // Serde round-trips may carry the root as an empty string.
        if s.is_empty() {
            Ok(Self::root())
        } else {
            Self::new(s)
        }
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.0
    }
}

impl AsRef<str> for ContentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// A validated principal (account) identifier.
///
/// # Example
///
/// ```
/// use restage::core::types::PrincipalId;
///
/// let id = PrincipalId::new("alice").unwrap();
/// assert_eq!(id.as_str(), "alice");
///
/// assert!(PrincipalId::new("").is_err());
/// assert!(PrincipalId::new("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Create a new validated principal id.
    ///
    /// Surrounding whitespace is rejected rather than normalized away.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPrincipalId` if the id is empty,
    /// has surrounding whitespace, or contains control characters.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        if id.is_empty() {
            return Err(TypeError::InvalidPrincipalId(
                "principal id cannot be empty".into(),
            ));
        }
        if id.trim() != id {
            return Err(TypeError::InvalidPrincipalId(
                "principal id cannot have surrounding whitespace".into(),
            ));
        }
        for c in id.chars() {
            if c.is_control() {
                return Err(TypeError::InvalidPrincipalId(
                    "principal id cannot contain control characters".into(),
                ));
            }
        }
        Ok(())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PrincipalId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PrincipalId> for String {
    fn from(id: PrincipalId) -> Self {
        id.0
    }
}

impl AsRef<str> for PrincipalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp in RFC3339 format.
///
/// # Example
///
/// ```
/// use restage::core::types::UtcTimestamp;
///
/// let now = UtcTimestamp::now();
/// println!("Current time: {}", now);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
