//! core::config::schema
//!
//! On-disk configuration schema.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$GOVPUB_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/govpub/config.toml`
//! 3. `~/.govpub/config.toml`
//!
//! Every field is optional in the file; environment variables override
//! file values and defaults fill the rest (see [`super::PublisherConfig`]).

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration file contents.
///
/// # Example
///
/// ```toml
/// public_base_url = "https://registry.example.org"
/// update_policy = "strict"
///
/// [repository]
/// owner = "governance-org"
/// name = "registry"
/// base_branch = "main"
///
/// [folders]
/// schemas = "schemas"
/// vocabulary = "vocab/terms"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Target repository
    pub repository: Option<RepositorySection>,

    /// Folder per document kind
    pub folders: Option<FoldersSection>,

    /// Public site serving the published repository
    pub public_base_url: Option<String>,

    /// GitHub API base URL (GitHub Enterprise)
    pub api_base: Option<String>,

    /// How expected content hashes are enforced on updates
    pub update_policy: Option<UpdatePolicy>,
}

/// `[repository]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySection {
    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub name: Option<String>,

    /// Pinned base branch; skips the default-branch lookup
    pub base_branch: Option<String>,
}

/// `[folders]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FoldersSection {
    pub schemas: Option<String>,
    pub credential_types: Option<String>,
    pub entities: Option<String>,
    pub vocabulary: Option<String>,
    pub mappings: Option<String>,
    pub assets: Option<String>,
}

/// How the single-file publisher treats expected content hashes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePolicy {
    /// The hash is checked only when the caller supplies one.
    #[default]
    Advisory,
    /// Updating an existing path requires the caller's hash.
    Strict,
}

impl UpdatePolicy {
    /// Valid policy names.
    pub const VALID_NAMES: &'static [&'static str] = &["advisory", "strict"];

    /// Parse a policy name (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(UpdatePolicy::Advisory),
            "strict" => Ok(UpdatePolicy::Strict),
            other => Err(ConfigError::InvalidValue(format!(
                "invalid update policy '{}', must be one of: {}",
                other,
                Self::VALID_NAMES.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdatePolicy::Advisory => write!(f, "advisory"),
            UpdatePolicy::Strict => write!(f, "strict"),
        }
    }
}
