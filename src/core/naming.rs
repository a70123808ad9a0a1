//! core::naming
//!
//! Branch naming rules for publish branches.
//!
//! # Format
//!
//! Every publish allocates a fresh branch named
//! `{prefix}/{verb}-{slug}-{unixMillis}`, for example
//! `schema/add-address-v1-1700000000000`. The millisecond timestamp is the
//! only collision-avoidance mechanism: two publishes of the same document
//! in the same millisecond produce the same name, and the second
//! `create ref` fails with a conflict.

use chrono::{DateTime, Utc};

use super::types::{BranchName, TypeError};

/// Upper bound on slug length inside a branch name.
const MAX_SLUG_LEN: usize = 50;

/// Slug used when the description slugifies to nothing.
const FALLBACK_SLUG: &str = "document";

/// What a publish does to the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchVerb {
    /// The path does not exist on the base branch yet.
    Add,
    /// The path exists, or the change touches many paths.
    Update,
}

impl BranchVerb {
    /// Lowercase form used inside branch names.
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchVerb::Add => "add",
            BranchVerb::Update => "update",
        }
    }

    /// Capitalized form used in titles and commit messages.
    pub fn title(&self) -> &'static str {
        match self {
            BranchVerb::Add => "Add",
            BranchVerb::Update => "Update",
        }
    }
}

impl std::fmt::Display for BranchVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate a branch name slug from a human-readable description.
///
/// Converts the first line into a valid branch name component:
/// - Lowercase
/// - Spaces, underscores and dots become hyphens
/// - Other invalid characters are dropped
/// - Truncated to a reasonable length
///
/// # Example
///
/// ```
/// use govpub::core::naming::slugify;
///
/// assert_eq!(slugify("address-v1"), "address-v1");
/// assert_eq!(slugify("Acme Logo.png"), "acme-logo-png");
/// ```
pub fn slugify(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or("");

    let slug: String = first_line
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if matches!(c, ' ' | '_' | '.' | '-') {
                Some('-')
            } else {
                None
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(MAX_SLUG_LEN)
        .collect();

    slug.trim_end_matches('-').to_string()
}

/// Compose the branch name for one publish attempt.
///
/// `prefix` is the target-kind prefix without a trailing slash
/// (`schema`, `vct`, `asset/logo`, ...).
///
/// # Errors
///
/// Returns `TypeError::InvalidBranchName` if the prefix produces a name
/// Git would reject.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use govpub::core::naming::{publish_branch_name, BranchVerb};
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
/// let name = publish_branch_name("schema", BranchVerb::Add, "address-v1", at).unwrap();
/// assert_eq!(name.as_str(), "schema/add-address-v1-1700000000000");
/// ```
pub fn publish_branch_name(
    prefix: &str,
    verb: BranchVerb,
    description: &str,
    at: DateTime<Utc>,
) -> Result<BranchName, TypeError> {
    let slug = slugify(description);
    let slug = if slug.is_empty() {
        FALLBACK_SLUG
    } else {
        slug.as_str()
    };

    BranchName::new(format!(
        "{}/{}-{}-{}",
        prefix.trim_matches('/'),
        verb,
        slug,
        at.timestamp_millis()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("fix: something"), "fix-something");
        assert_eq!(slugify("update-entities"), "update-entities");
    }

    #[test]
    fn slugify_removes_invalid_chars() {
        assert_eq!(slugify("Membership [Draft]"), "membership-draft");
        assert_eq!(slugify("a/b"), "ab");
    }

    #[test]
    fn slugify_handles_empty_and_uses_first_line() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("First line\nSecond line"), "first-line");
    }

    #[test]
    fn slugify_truncates() {
        let long = "x".repeat(200);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn branch_name_add_schema() {
        let name = publish_branch_name("schema", BranchVerb::Add, "address-v1", at(42)).unwrap();
        assert_eq!(name.as_str(), "schema/add-address-v1-42");
    }

    #[test]
    fn branch_name_nested_prefix() {
        let name =
            publish_branch_name("asset/logo/", BranchVerb::Update, "acme.png", at(7)).unwrap();
        assert_eq!(name.as_str(), "asset/logo/update-acme-png-7");
    }

    #[test]
    fn branch_name_empty_slug_falls_back() {
        let name = publish_branch_name("vocab", BranchVerb::Update, "???", at(1)).unwrap();
        assert_eq!(name.as_str(), "vocab/update-document-1");
    }

    #[test]
    fn distinct_timestamps_give_distinct_names() {
        let a = publish_branch_name("entity", BranchVerb::Add, "acme", at(1)).unwrap();
        let b = publish_branch_name("entity", BranchVerb::Add, "acme", at(2)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verb_display() {
        assert_eq!(BranchVerb::Add.to_string(), "add");
        assert_eq!(BranchVerb::Update.title(), "Update");
    }
}
