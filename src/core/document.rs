//! core::document
//!
//! Publish targets and the document encoder.
//!
//! # Targets
//!
//! Each [`DocumentKind`] maps to a fixed row of the publish-target table:
//! the configured folder, the file extension, the branch prefix and the
//! label used in titles. The table never changes at runtime.
//!
//! | kind                   | folder (config)      | ext    | branch prefix   |
//! |------------------------|----------------------|--------|-----------------|
//! | `Schema`               | `folders.schemas`    | `.json`| `schema`        |
//! | `CredentialType`       | `folders.credential_types` | `.json` | `vct`  |
//! | `EntityStatement`      | `folders.entities`   | `.json`| `entity`        |
//! | `VocabularyTerm`       | `folders.vocabulary` | `.json`| `vocab`         |
//! | `HarmonizationMapping` | `folders.mappings`   | `.json`| `mapping`       |
//! | `Asset { asset_type }` | `folders.assets/<asset_type>` | as given | `asset/<type>` |
//!
//! # Encoding
//!
//! [`encode`] turns a [`Document`] into an [`EncodedDocument`]: canonical
//! bytes plus the repository path they will occupy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::config::FolderLayout;

/// Errors from document validation and encoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document name is required")]
    MissingName,

    #[error("invalid document name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("invalid asset type '{0}'")]
    InvalidAssetType(String),

    #[error("failed to encode '{name}': {message}")]
    Encode { name: String, message: String },
}

/// Logical document kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DocumentKind {
    Schema,
    CredentialType,
    EntityStatement,
    VocabularyTerm,
    HarmonizationMapping,
    /// Binary or text asset grouped by type (e.g. `logo`, `image`)
    Asset { asset_type: String },
}

impl DocumentKind {
    /// Parse a kind from its command-line name.
    ///
    /// Assets need a type, supplied separately.
    ///
    /// # Example
    ///
    /// ```
    /// use govpub::core::document::DocumentKind;
    ///
    /// assert_eq!(DocumentKind::parse("vct", None), Some(DocumentKind::CredentialType));
    /// assert_eq!(
    ///     DocumentKind::parse("asset", Some("logo")),
    ///     Some(DocumentKind::Asset { asset_type: "logo".into() })
    /// );
    /// assert_eq!(DocumentKind::parse("asset", None), None);
    /// ```
    pub fn parse(name: &str, asset_type: Option<&str>) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "schema" => Some(DocumentKind::Schema),
            "vct" | "credential-type" => Some(DocumentKind::CredentialType),
            "entity" | "entity-statement" => Some(DocumentKind::EntityStatement),
            "vocab" | "vocabulary-term" => Some(DocumentKind::VocabularyTerm),
            "mapping" | "harmonization-mapping" => Some(DocumentKind::HarmonizationMapping),
            "asset" => asset_type.map(|t| DocumentKind::Asset {
                asset_type: t.to_string(),
            }),
            _ => None,
        }
    }

    /// Folder this kind publishes into.
    pub fn folder(&self, folders: &FolderLayout) -> String {
        match self {
            DocumentKind::Schema => folders.schemas.clone(),
            DocumentKind::CredentialType => folders.credential_types.clone(),
            DocumentKind::EntityStatement => folders.entities.clone(),
            DocumentKind::VocabularyTerm => folders.vocabulary.clone(),
            DocumentKind::HarmonizationMapping => folders.mappings.clone(),
            DocumentKind::Asset { asset_type } => join_path(&folders.assets, asset_type),
        }
    }

    /// File extension appended to structured documents; `None` for assets,
    /// which keep the extension in their name.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            DocumentKind::Asset { .. } => None,
            _ => Some(".json"),
        }
    }

    /// Branch prefix, without a trailing slash.
    pub fn branch_prefix(&self) -> String {
        match self {
            DocumentKind::Schema => "schema".to_string(),
            DocumentKind::CredentialType => "vct".to_string(),
            DocumentKind::EntityStatement => "entity".to_string(),
            DocumentKind::VocabularyTerm => "vocab".to_string(),
            DocumentKind::HarmonizationMapping => "mapping".to_string(),
            DocumentKind::Asset { asset_type } => format!("asset/{}", asset_type),
        }
    }

    /// Human label used in titles and commit messages.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Schema => "Schema",
            DocumentKind::CredentialType => "Credential Type",
            DocumentKind::EntityStatement => "Entity Statement",
            DocumentKind::VocabularyTerm => "Vocabulary Term",
            DocumentKind::HarmonizationMapping => "Harmonization Mapping",
            DocumentKind::Asset { .. } => "Asset",
        }
    }

    /// Plural label for batch titles.
    pub fn plural_label(&self) -> String {
        format!("{}s", self.label())
    }

    /// Validate kind-specific parameters.
    pub fn validate(&self) -> Result<(), DocumentError> {
        if let DocumentKind::Asset { asset_type } = self {
            let valid = !asset_type.is_empty()
                && asset_type
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(DocumentError::InvalidAssetType(asset_type.clone()));
            }
        }
        Ok(())
    }

    /// Repository path for a document name of this kind.
    ///
    /// # Errors
    ///
    /// Returns a `DocumentError` if the name is empty or unsafe as a path
    /// segment.
    ///
    /// # Example
    ///
    /// ```
    /// use govpub::core::config::FolderLayout;
    /// use govpub::core::document::DocumentKind;
    ///
    /// let folders = FolderLayout::default();
    /// assert_eq!(
    ///     DocumentKind::Schema.path_for("address-v1", &folders).unwrap(),
    ///     "schemas/address-v1.json"
    /// );
    /// assert_eq!(
    ///     DocumentKind::Schema.path_for("address-v1.json", &folders).unwrap(),
    ///     "schemas/address-v1.json"
    /// );
    /// ```
    pub fn path_for(&self, name: &str, folders: &FolderLayout) -> Result<String, DocumentError> {
        self.validate()?;
        validate_name(name)?;

        let file_name = match self.extension() {
            Some(ext) if !name.ends_with(ext) => format!("{}{}", name, ext),
            _ => name.to_string(),
        };
        Ok(join_path(&self.folder(folders), &file_name))
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Asset { asset_type } => write!(f, "asset ({})", asset_type),
            other => f.write_str(other.label()),
        }
    }
}

/// Document payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    /// Structured document, stored as pretty-printed JSON
    Json(Value),
    /// Raw text stored verbatim
    Text(String),
    /// Raw bytes stored verbatim
    Binary(Vec<u8>),
}

/// An in-memory document waiting to be published.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifying name; becomes the file name
    pub name: String,
    pub content: DocumentContent,
}

impl Document {
    /// Create a JSON document.
    pub fn json(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            content: DocumentContent::Json(value),
        }
    }

    /// Create a text document.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: DocumentContent::Text(text.into()),
        }
    }

    /// Create a binary document.
    pub fn binary(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content: DocumentContent::Binary(bytes),
        }
    }
}

/// Canonical bytes plus the path they will occupy.
///
/// Exists only for the duration of one publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub name: String,
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Encode a document for a target kind.
///
/// JSON is pretty-printed with a trailing newline so repeated publishes of
/// the same value produce identical bytes.
pub fn encode(
    kind: &DocumentKind,
    document: &Document,
    folders: &FolderLayout,
) -> Result<EncodedDocument, DocumentError> {
    if document.name.trim().is_empty() {
        return Err(DocumentError::MissingName);
    }

    let path = kind.path_for(&document.name, folders)?;
    let bytes = match &document.content {
        DocumentContent::Json(value) => {
            let mut text =
                serde_json::to_string_pretty(value).map_err(|e| DocumentError::Encode {
                    name: document.name.clone(),
                    message: e.to_string(),
                })?;
            text.push('\n');
            text.into_bytes()
        }
        DocumentContent::Text(text) => text.clone().into_bytes(),
        DocumentContent::Binary(bytes) => bytes.clone(),
    };

    Ok(EncodedDocument {
        name: document.name.clone(),
        path,
        bytes,
    })
}

/// Reject names that are empty or could escape their folder.
fn validate_name(name: &str) -> Result<(), DocumentError> {
    let invalid = |reason: &str| {
        Err(DocumentError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.trim().is_empty() {
        return Err(DocumentError::MissingName);
    }
    if name.contains('/') || name.contains('\\') {
        return invalid("cannot contain path separators");
    }
    if name.contains("..") {
        return invalid("cannot contain '..'");
    }
    if name.starts_with('.') {
        return invalid("cannot start with '.'");
    }
    if name.chars().any(|c| c.is_control()) {
        return invalid("cannot contain control characters");
    }
    Ok(())
}

fn join_path(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", folder, name)
    }
}
