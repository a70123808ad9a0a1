//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA) for blobs, trees and commits
//! - [`RefName`] - Fully qualified reference name (`refs/heads/...`)
//!
//! # Validation
//!
//! These types enforce validity at construction time. A branch name that
//! the host would reject can never reach a `create ref` call.
//!
//! # Examples
//!
//! ```
//! use govpub::core::types::{BranchName, Oid, RefName};
//!
//! let branch = BranchName::new("schema/add-address-v1-1700000000000").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let refname = RefName::for_branch(&branch);
//! assert_eq!(refname.as_str(), "refs/heads/schema/add-address-v1-1700000000000");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@`
///
/// # Example
///
/// ```
/// use govpub::core::types::BranchName;
///
/// let name = BranchName::new("vocab/update-terms-1700000000000").unwrap();
/// assert_eq!(name.as_str(), "vocab/update-terms-1700000000000");
///
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new(".hidden").is_err());
/// assert!(BranchName::new("branch.lock").is_err());
/// assert!(BranchName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" {
            return reject("branch name cannot be '@' (reserved)");
        }
        if name.starts_with('.') {
            return reject("branch name cannot start with '.'");
        }
        if name.starts_with('-') {
            return reject("branch name cannot start with '-'");
        }
        if name.ends_with(".lock") {
            return reject("branch name cannot end with '.lock'");
        }
        if name.ends_with('/') {
            return reject("branch name cannot end with '/'");
        }
        if name.contains("..") {
            return reject("branch name cannot contain '..'");
        }
        if name.contains("@{") {
            return reject("branch name cannot contain '@{'");
        }
        if name.contains("//") {
            return reject("branch name cannot contain '//'");
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = INVALID_CHARS.iter().find(|c| name.contains(**c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }

        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
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
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// Used for every content-addressed object the host hands back: file
/// content hashes, blobs, trees and commits. OIDs are normalized to
/// lowercase so hashes read from different endpoints compare equal.
///
/// # Example
///
/// ```
/// use govpub::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a valid hex OID.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        Self::validate(&oid)?;
        Ok(Self(oid))
    }

    /// Object id from the first 20 bytes of a digest, hex encoded.
    ///
    /// Digests shorter than 20 bytes are zero-padded.
    pub fn from_digest(digest: &[u8]) -> Self {
        let mut bytes = [0u8; 20];
        let n = digest.len().min(20);
        bytes[..n].copy_from_slice(&digest[..n]);
        Self(hex::encode(bytes))
    }

    /// Get an abbreviated form of the OID.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(oid: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the object id as a string slice.
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
        write!(f, "{}", self.0)
    }
}

/// A fully qualified Git reference name.
///
/// Only branch refs are ever created by the publishing engine, so the
/// sole constructor is [`RefName::for_branch`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefName(String);

impl RefName {
    /// Create a ref name for a branch (`refs/heads/<branch>`).
    pub fn for_branch(branch: &BranchName) -> Self {
        Self(format!("refs/heads/{}", branch.as_str()))
    }

    /// Get the ref name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn valid_branch_names() {
            assert!(BranchName::new("main").is_ok());
            assert!(BranchName::new("schema/add-address-v1-1700000000000").is_ok());
            assert!(BranchName::new("asset/logo/add-acme-png-1700000000000").is_ok());
            assert!(BranchName::new("user@feature").is_ok());
        }

        #[test]
        fn empty_name_rejected() {
            assert!(BranchName::new("").is_err());
        }

        #[test]
        fn starts_with_dot_or_dash_rejected() {
            assert!(BranchName::new(".hidden").is_err());
            assert!(BranchName::new("-flag").is_err());
            assert!(BranchName::new("schema/.hidden").is_err());
        }

        #[test]
        fn bad_suffixes_rejected() {
            assert!(BranchName::new("branch.lock").is_err());
            assert!(BranchName::new("branch/").is_err());
        }

        #[test]
        fn bad_sequences_rejected() {
            assert!(BranchName::new("a..b").is_err());
            assert!(BranchName::new("a@{b").is_err());
            assert!(BranchName::new("a//b").is_err());
            assert!(BranchName::new("@").is_err());
        }

        #[test]
        fn special_chars_rejected() {
            for c in [' ', '~', '^', ':', '\\', '?', '*', '['] {
                let name = format!("a{c}b");
                assert!(BranchName::new(&name).is_err(), "should reject {name:?}");
            }
            assert!(BranchName::new("a\x07b").is_err());
        }

        #[test]
        fn serde_roundtrip() {
            let name = BranchName::new("entity/update-entities-1").unwrap();
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, "\"entity/update-entities-1\"");
            let parsed: BranchName = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, name);
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn valid_sha1_and_sha256() {
            assert!(Oid::new("a".repeat(40)).is_ok());
            assert!(Oid::new("b".repeat(64)).is_ok());
        }

        #[test]
        fn normalizes_to_lowercase() {
            let oid = Oid::new("ABCDEF".repeat(6) + "ABCD").unwrap();
            assert_eq!(oid.as_str(), ("abcdef".repeat(6) + "abcd").as_str());
        }

        #[test]
        fn invalid_length_and_non_hex_rejected() {
            assert!(Oid::new("abc").is_err());
            assert!(Oid::new("g".repeat(40)).is_err());
        }

        #[test]
        fn short_form() {
            let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
            assert_eq!(oid.short(7), "abc123d");
            assert_eq!(oid.short(100).len(), 40);
        }

        #[test]
        fn from_digest_takes_sha1_width() {
            let oid = Oid::from_digest(&[0xab; 32]);
            assert_eq!(oid.as_str(), "ab".repeat(20));
            assert_eq!(Oid::from_digest(&[1]).as_str().len(), 40);
        }

        #[test]
        fn deserialize_rejects_invalid() {
            let parsed: Result<Oid, _> = serde_json::from_str("\"nope\"");
            assert!(parsed.is_err());
        }
    }

    #[test]
    fn ref_name_for_branch() {
        let branch = BranchName::new("vct/add-membership-1").unwrap();
        assert_eq!(
            RefName::for_branch(&branch).as_str(),
            "refs/heads/vct/add-membership-1"
        );
    }
}
