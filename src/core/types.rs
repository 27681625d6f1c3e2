//! core::types
//!
//! Strong types for the domain vocabulary.
//!
//! - [`BranchName`] - validated Git branch name
//! - [`Oid`] - Git object identifier (SHA-1 or SHA-256 hex)
//! - [`RefName`] - validated full reference name
//! - [`UtcTimestamp`] - RFC3339 timestamp
//!
//! All of these enforce validity at construction time, so invalid values
//! cannot flow into the store or the adapter.
//!
//! # Examples
//!
//! ```
//! use arbor::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("feature/login").unwrap();
//! assert_eq!(branch.as_str(), "feature/login");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName { name: String, reason: &'static str },

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid ref name '{name}': {reason}")]
    InvalidRefName { name: String, reason: &'static str },
}

/// Characters git rejects anywhere in a refname.
const FORBIDDEN_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Check a refname-ish string against git's `check-ref-format` rules.
///
/// Returns the reason for rejection, or `None` when the name is acceptable.
/// Branch names and full refs share the same character rules.
fn refname_violation(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        return Some("name is empty");
    }
    if name == "@" {
        return Some("'@' is reserved");
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Some("leading or trailing '/'");
    }
    if name.starts_with('-') {
        return Some("leading '-'");
    }
    if name.ends_with(".lock") {
        return Some("ends with '.lock'");
    }
    if name.contains("..") {
        return Some("contains '..'");
    }
    if name.contains("@{") {
        return Some("contains '@{'");
    }
    if name.contains("//") {
        return Some("contains '//'");
    }
    if name.chars().any(|c| FORBIDDEN_CHARS.contains(&c)) {
        return Some("contains a forbidden character");
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Some("contains a control character");
    }
    for component in name.split('/') {
        if component.starts_with('.') {
            return Some("component starts with '.'");
        }
        if component.ends_with(".lock") {
            return Some("component ends with '.lock'");
        }
    }
    None
}

/// A validated Git branch name.
///
/// Follows `git check-ref-format --branch` rules; construction is the only
/// entry point, so a held `BranchName` is always a usable refname component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// `TypeError::InvalidBranchName` when the name violates git's rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        match refname_violation(&name) {
            None => Ok(Self(name)),
            Some(reason) => Err(TypeError::InvalidBranchName { name, reason }),
        }
    }

    /// The branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Git object identifier, normalized to lowercase hex.
///
/// Accepts SHA-1 (40 chars) and SHA-256 (64 chars) ids. The stack engine
/// treats these as opaque; only equality and display matter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id, lowercasing on the way in.
    ///
    /// # Errors
    ///
    /// `TypeError::InvalidOid` when the string is not 40 or 64 hex chars.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid("not hexadecimal".into()));
        }
        Ok(Self(oid))
    }

    /// Abbreviated form: the first `len` characters (clamped to the full id).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// The object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated full Git reference name (`refs/...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    /// Create a new validated ref name.
    ///
    /// # Errors
    ///
    /// `TypeError::InvalidRefName` when the name violates git's rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        match refname_violation(&name) {
            None => Ok(Self(name)),
            Some(reason) => Err(TypeError::InvalidRefName { name, reason }),
        }
    }

    /// The local ref for a branch: `refs/heads/<branch>`.
    pub fn for_branch(branch: &BranchName) -> Self {
        // Branch names are validated, so the composed ref is too.
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// The remote-tracking ref for a branch: `refs/remotes/<remote>/<branch>`.
    pub fn for_remote_branch(remote: &str, branch: &BranchName) -> Self {
        Self(format!("refs/remotes/{}/{}", remote, branch.as_str()))
    }

    /// The ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RefName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RefName> for String {
    fn from(name: RefName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A UTC timestamp serialized as RFC3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// The current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// The underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
