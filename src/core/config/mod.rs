//! core::config
//!
//! Publisher configuration: schema, loading and validation.
//!
//! # Overview
//!
//! All process-wide settings live in one [`PublisherConfig`] value that is
//! built once at startup and passed by reference into every component.
//! No other module reads the environment.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file (see [`schema`] for locations)
//! 3. Environment variables (`GOVPUB_*`)
//! 4. CLI flags (not handled here)
//!
//! # Example
//!
//! ```
//! use govpub::core::config::PublisherConfig;
//!
//! let config = PublisherConfig::for_repository("gov", "registry").unwrap();
//! assert_eq!(config.folders.schemas, "schemas");
//! assert!(config.repository.base_branch.is_none());
//! ```

pub mod schema;

pub use schema::{ConfigFile, FoldersSection, RepositorySection, UpdatePolicy};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::BranchName;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Environment variable names.
pub mod env {
    pub const CONFIG: &str = "GOVPUB_CONFIG";
    pub const REPO_OWNER: &str = "GOVPUB_REPO_OWNER";
    pub const REPO_NAME: &str = "GOVPUB_REPO_NAME";
    pub const BASE_BRANCH: &str = "GOVPUB_BASE_BRANCH";
    pub const SCHEMA_FOLDER: &str = "GOVPUB_SCHEMA_FOLDER";
    pub const VCT_FOLDER: &str = "GOVPUB_VCT_FOLDER";
    pub const ENTITY_FOLDER: &str = "GOVPUB_ENTITY_FOLDER";
    pub const VOCAB_FOLDER: &str = "GOVPUB_VOCAB_FOLDER";
    pub const MAPPING_FOLDER: &str = "GOVPUB_MAPPING_FOLDER";
    pub const ASSET_FOLDER: &str = "GOVPUB_ASSET_FOLDER";
    pub const PUBLIC_BASE_URL: &str = "GOVPUB_PUBLIC_BASE_URL";
    pub const API_BASE: &str = "GOVPUB_API_BASE";
    pub const UPDATE_POLICY: &str = "GOVPUB_UPDATE_POLICY";
}

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("missing required config value: {0}")]
    Missing(&'static str),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Where documents are published: repository owner, name and an
/// optional pinned base branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCoordinates {
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Administrator-pinned base branch; `None` means "use the default branch"
    pub base_branch: Option<BranchName>,
}

/// Repository folder per document kind.
///
/// Folders are stored normalized: relative, no leading or trailing `/`.
/// An empty string places documents at the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub schemas: String,
    pub credential_types: String,
    pub entities: String,
    pub vocabulary: String,
    pub mappings: String,
    pub assets: String,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            schemas: "schemas".to_string(),
            credential_types: "credential-types".to_string(),
            entities: "entities".to_string(),
            vocabulary: "vocabulary".to_string(),
            mappings: "mappings".to_string(),
            assets: "assets".to_string(),
        }
    }
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The resolved configuration.
    pub config: PublisherConfig,
    /// The config file that was read, if any.
    pub loaded_from: Option<PathBuf>,
}

/// Fully resolved publisher configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PublisherConfig {
    pub repository: RepositoryCoordinates,
    pub folders: FolderLayout,
    /// Base URL of the public site serving the repository (links only)
    pub public_base_url: Option<String>,
    /// GitHub API base URL
    pub api_base: String,
    pub update_policy: UpdatePolicy,
}

impl PublisherConfig {
    /// Build a configuration for a repository with default settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if owner or name is empty.
    pub fn for_repository(
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() {
            return Err(ConfigError::Missing("repository owner"));
        }
        if name.trim().is_empty() {
            return Err(ConfigError::Missing("repository name"));
        }

        Ok(Self {
            repository: RepositoryCoordinates {
                owner,
                name,
                base_branch: None,
            },
            folders: FolderLayout::default(),
            public_base_url: None,
            api_base: DEFAULT_API_BASE.to_string(),
            update_policy: UpdatePolicy::default(),
        })
    }

    /// Pin the base branch.
    pub fn with_base_branch(mut self, branch: BranchName) -> Self {
        self.repository.base_branch = Some(branch);
        self
    }

    /// Set the public base URL.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the update policy.
    pub fn with_update_policy(mut self, policy: UpdatePolicy) -> Self {
        self.update_policy = policy;
        self
    }

    /// Load configuration from the process environment and the default
    /// config file locations.
    ///
    /// `explicit_path` (e.g. a `--config` flag) takes precedence over the
    /// searched locations and must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed, or if
    /// the resolved values are missing or invalid.
    pub fn load(explicit_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        Self::load_with(explicit_path, |key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_with<F>(
        explicit_path: Option<&Path>,
        lookup: F,
    ) -> Result<ConfigLoadResult, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = match explicit_path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(&lookup),
        };

        let file = match &path {
            Some(path) => Self::read_config_file(path)?,
            None => ConfigFile::default(),
        };

        let config = Self::resolve(file, &lookup)?;
        Ok(ConfigLoadResult {
            config,
            loaded_from: path,
        })
    }

    /// Search the standard config file locations.
    fn find_config_file<F>(lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 1. Check $GOVPUB_CONFIG
        if let Some(path) = lookup(env::CONFIG) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/govpub/config.toml
        if let Some(xdg_home) = lookup("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("govpub/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.govpub/config.toml
        dirs::home_dir()
            .map(|home| home.join(".govpub/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read and parse a config file.
    fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Merge file values, environment overrides and defaults.
    pub fn resolve<F>(file: ConfigFile, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let repo = file.repository.unwrap_or_default();
        let owner = non_empty(env::REPO_OWNER)
            .or(repo.owner)
            .ok_or(ConfigError::Missing("repository owner"))?;
        let name = non_empty(env::REPO_NAME)
            .or(repo.name)
            .ok_or(ConfigError::Missing("repository name"))?;

        let mut config = Self::for_repository(owner, name)?;

        if let Some(base) = non_empty(env::BASE_BRANCH).or(repo.base_branch) {
            let branch = BranchName::new(base.trim()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid base branch: {}", e))
            })?;
            config.repository.base_branch = Some(branch);
        }

        let folders = file.folders.unwrap_or_default();
        let defaults = FolderLayout::default();
        let folder = |key: &str, from_file: Option<String>, default: String| {
            match non_empty(key).or(from_file) {
                Some(raw) => normalize_folder(&raw),
                None => Ok(default),
            }
        };
        config.folders = FolderLayout {
            schemas: folder(env::SCHEMA_FOLDER, folders.schemas, defaults.schemas)?,
            credential_types: folder(
                env::VCT_FOLDER,
                folders.credential_types,
                defaults.credential_types,
            )?,
            entities: folder(env::ENTITY_FOLDER, folders.entities, defaults.entities)?,
            vocabulary: folder(env::VOCAB_FOLDER, folders.vocabulary, defaults.vocabulary)?,
            mappings: folder(env::MAPPING_FOLDER, folders.mappings, defaults.mappings)?,
            assets: folder(env::ASSET_FOLDER, folders.assets, defaults.assets)?,
        };

        if let Some(url) = non_empty(env::PUBLIC_BASE_URL).or(file.public_base_url) {
            config = config.with_public_base_url(url.trim());
        }

        if let Some(api_base) = non_empty(env::API_BASE).or(file.api_base) {
            config.api_base = api_base.trim().trim_end_matches('/').to_string();
        }

        config.update_policy = match non_empty(env::UPDATE_POLICY) {
            Some(raw) => UpdatePolicy::parse(&raw)?,
            None => file.update_policy.unwrap_or_default(),
        };

        Ok(config)
    }

    /// Compose the public link for a repository path, if a public base URL
    /// is configured.
    ///
    /// # Example
    ///
    /// ```
    /// use govpub::core::config::PublisherConfig;
    ///
    /// let config = PublisherConfig::for_repository("gov", "registry")
    ///     .unwrap()
    ///     .with_public_base_url("https://registry.example.org/");
    /// assert_eq!(
    ///     config.public_url("schemas/address-v1.json").as_deref(),
    ///     Some("https://registry.example.org/schemas/address-v1.json")
    /// );
    /// ```
    pub fn public_url(&self, path: &str) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{}/{}", base, path.trim_start_matches('/')))
    }
}

/// Normalize a configured folder: relative, no `..`, no surrounding slashes.
fn normalize_folder(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') {
        return Err(ConfigError::InvalidValue(format!(
            "folder '{}' must be relative to the repository root",
            trimmed
        )));
    }
    if trimmed.split('/').any(|segment| segment == "..") {
        return Err(ConfigError::InvalidValue(format!(
            "folder '{}' cannot contain '..'",
            trimmed
        )));
    }
    if trimmed.contains('\\') {
        return Err(ConfigError::InvalidValue(format!(
            "folder '{}' cannot contain '\\'",
            trimmed
        )));
    }

    Ok(trimmed
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn resolve_from_env_only() {
        let lookup = env_of(&[
            (env::REPO_OWNER, "gov"),
            (env::REPO_NAME, "registry"),
            (env::BASE_BRANCH, "develop"),
        ]);

        let config = PublisherConfig::resolve(ConfigFile::default(), &lookup).unwrap();
        assert_eq!(config.repository.owner, "gov");
        assert_eq!(config.repository.name, "registry");
        assert_eq!(
            config.repository.base_branch.as_ref().map(|b| b.as_str()),
            Some("develop")
        );
        assert_eq!(config.folders, FolderLayout::default());
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.update_policy, UpdatePolicy::Advisory);
    }

    #[test]
    fn missing_owner_rejected() {
        let lookup = env_of(&[(env::REPO_NAME, "registry")]);
        let err = PublisherConfig::resolve(ConfigFile::default(), &lookup).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("repository owner")));
    }

    #[test]
    fn blank_env_value_ignored() {
        let lookup = env_of(&[
            (env::REPO_OWNER, "gov"),
            (env::REPO_NAME, "registry"),
            (env::BASE_BRANCH, "  "),
        ]);
        let config = PublisherConfig::resolve(ConfigFile::default(), &lookup).unwrap();
        assert!(config.repository.base_branch.is_none());
    }

    #[test]
    fn env_overrides_file() {
        let file = ConfigFile {
            repository: Some(RepositorySection {
                owner: Some("file-owner".into()),
                name: Some("file-repo".into()),
                base_branch: Some("main".into()),
            }),
            folders: Some(FoldersSection {
                schemas: Some("file-schemas".into()),
                vocabulary: Some("/vocab/terms/".into()),
                ..Default::default()
            }),
            update_policy: Some(UpdatePolicy::Strict),
            ..Default::default()
        };
        let lookup = env_of(&[
            (env::REPO_OWNER, "env-owner"),
            (env::SCHEMA_FOLDER, "env/schemas"),
            (env::UPDATE_POLICY, "advisory"),
        ]);

        let err = PublisherConfig::resolve(file.clone(), &lookup).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)), "absolute folder");

        let mut file = file;
        if let Some(folders) = file.folders.as_mut() {
            folders.vocabulary = Some("vocab/terms/".into());
        }
        let config = PublisherConfig::resolve(file, &lookup).unwrap();
        assert_eq!(config.repository.owner, "env-owner");
        assert_eq!(config.repository.name, "file-repo");
        assert_eq!(config.folders.schemas, "env/schemas");
        assert_eq!(config.folders.vocabulary, "vocab/terms");
        assert_eq!(config.folders.entities, "entities");
        assert_eq!(config.update_policy, UpdatePolicy::Advisory);
    }

    #[test]
    fn invalid_base_branch_rejected() {
        let lookup = env_of(&[
            (env::REPO_OWNER, "gov"),
            (env::REPO_NAME, "registry"),
            (env::BASE_BRANCH, "bad..branch"),
        ]);
        assert!(PublisherConfig::resolve(ConfigFile::default(), &lookup).is_err());
    }

    #[test]
    fn parent_folder_rejected() {
        assert!(normalize_folder("schemas/../secrets").is_err());
        assert_eq!(normalize_folder("./a//b/").unwrap(), "a/b");
        assert_eq!(normalize_folder("").unwrap(), "");
    }

    #[test]
    fn load_from_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            public_base_url = "https://registry.example.org/"
            api_base = "https://github.example.com/api/v3/"

            [repository]
            owner = "gov"
            name = "registry"
            "#,
        )
        .unwrap();

        let result = PublisherConfig::load_with(Some(&path), |_| None).unwrap();
        assert_eq!(result.loaded_from.as_deref(), Some(path.as_path()));
        assert_eq!(
            result.config.public_base_url.as_deref(),
            Some("https://registry.example.org")
        );
        assert_eq!(result.config.api_base, "https://github.example.com/api/v3");
    }

    #[test]
    fn load_from_config_env_var() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("govpub.toml");
        fs::write(&path, "[repository]\nowner = \"gov\"\nname = \"registry\"\n").unwrap();
        let path_str = path.to_string_lossy().to_string();

        let result = PublisherConfig::load_with(None, |key| {
            (key == env::CONFIG).then(|| path_str.clone())
        })
        .unwrap();
        assert_eq!(result.config.repository.name, "registry");
    }

    #[test]
    fn malformed_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[repository\nowner = ").unwrap();

        let err = PublisherConfig::load_with(Some(&path), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn missing_explicit_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.toml");
        let err = PublisherConfig::load_with(Some(&path), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn public_url_requires_base() {
        let config = PublisherConfig::for_repository("gov", "registry").unwrap();
        assert!(config.public_url("schemas/a.json").is_none());
    }
}
