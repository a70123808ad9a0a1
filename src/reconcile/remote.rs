//! reconcile::remote
//!
//! Fetching the remote document set.
//!
//! The remote set is always read fresh from the base branch. A collection
//! file or folder the host reports as missing is the empty set: the first
//! publish into a new folder reconciles with everything added.

use serde_json::Value;
use tracing::debug;

use super::{reconcile, DiffResult, ReconcileError, ReconcileProfile};
use crate::core::config::PublisherConfig;
use crate::core::document::DocumentKind;
use crate::core::types::BranchName;
use crate::forge::{EntryKind, Forge};
use crate::publish::base::resolve_base_branch;

/// Where the published collection lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteSource {
    /// One JSON file holding an array, optionally nested under a field.
    CollectionFile {
        path: String,
        array_field: Option<String>,
    },
    /// Every `.json` file in a folder, one document each.
    Directory { folder: String },
}

impl RemoteSource {
    /// The folder a document kind publishes into.
    pub fn for_kind(kind: &DocumentKind, config: &PublisherConfig) -> Self {
        RemoteSource::Directory {
            folder: kind.folder(&config.folders),
        }
    }
}

/// Read the remote document set on `branch`.
///
/// # Errors
///
/// Returns `ReconcileError::MalformedRemote` if a file is not valid JSON
/// or has the wrong shape, and `ReconcileError::Host` for host failures.
pub async fn fetch_remote_set(
    forge: &dyn Forge,
    source: &RemoteSource,
    branch: &BranchName,
) -> Result<Vec<Value>, ReconcileError> {
    match source {
        RemoteSource::CollectionFile { path, array_field } => {
            let Some(file) = forge.get_file(path, branch).await? else {
                debug!(path = %path, "remote collection not found, treating as empty");
                return Ok(Vec::new());
            };
            let root = parse(path, &file.content)?;
            let items = match array_field {
                Some(field) => root.get(field).cloned(),
                None => Some(root),
            };
            match items {
                Some(Value::Array(items)) => Ok(items),
                _ => Err(ReconcileError::MalformedRemote {
                    path: path.clone(),
                    message: match array_field {
                        Some(field) => format!("field '{}' is not an array", field),
                        None => "expected a JSON array".to_string(),
                    },
                }),
            }
        }
        RemoteSource::Directory { folder } => {
            let Some(mut entries) = forge.list_directory(folder, branch).await? else {
                debug!(folder = %folder, "remote folder not found, treating as empty");
                return Ok(Vec::new());
            };
            entries.retain(|e| e.kind == EntryKind::File && e.name.ends_with(".json"));
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            let mut docs = Vec::with_capacity(entries.len());
            for entry in entries {
                // Removed between listing and reading.
                if let Some(file) = forge.get_file(&entry.path, branch).await? {
                    docs.push(parse(&entry.path, &file.content)?);
                }
            }
            Ok(docs)
        }
    }
}

/// Resolve the base branch, fetch the remote set and reconcile `local`
/// against it.
pub async fn preview(
    forge: &dyn Forge,
    config: &PublisherConfig,
    source: &RemoteSource,
    profile: &ReconcileProfile,
    local: &[Value],
) -> Result<DiffResult, ReconcileError> {
    let base = resolve_base_branch(forge, &config.repository).await?;
    let remote = fetch_remote_set(forge, source, &base).await?;
    debug!(
        base = %base,
        local = local.len(),
        remote = remote.len(),
        "reconciling"
    );
    reconcile(local, &remote, profile)
}

fn parse(path: &str, bytes: &[u8]) -> Result<Value, ReconcileError> {
    serde_json::from_slice(bytes).map_err(|e| ReconcileError::MalformedRemote {
        path: path.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;
    use serde_json::json;

    fn main() -> BranchName {
        BranchName::new("main").unwrap()
    }

    #[tokio::test]
    async fn missing_collection_is_empty() {
        let forge = MockForge::new();
        let source = RemoteSource::CollectionFile {
            path: "entities/index.json".into(),
            array_field: None,
        };
        assert!(fetch_remote_set(&forge, &source, &main())
            .await
            .unwrap()
            .is_empty());

        let dir = RemoteSource::Directory {
            folder: "vocabulary".into(),
        };
        assert!(fetch_remote_set(&forge, &dir, &main())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn nested_array_field() {
        let body = serde_json::to_vec(&json!({"entities": [{"id": "a"}, {"id": "b"}]})).unwrap();
        let forge = MockForge::new().with_files(&[("registry.json", body.as_slice())]);
        let source = RemoteSource::CollectionFile {
            path: "registry.json".into(),
            array_field: Some("entities".into()),
        };
        let docs = fetch_remote_set(&forge, &source, &main()).await.unwrap();
        assert_eq!(docs, vec![json!({"id": "a"}), json!({"id": "b"})]);

        let wrong = RemoteSource::CollectionFile {
            path: "registry.json".into(),
            array_field: Some("terms".into()),
        };
        assert!(matches!(
            fetch_remote_set(&forge, &wrong, &main()).await,
            Err(ReconcileError::MalformedRemote { .. })
        ));
    }

    #[tokio::test]
    async fn directory_reads_json_files_only() {
        let forge = MockForge::new().with_files(&[
            ("vocabulary/b.json", br#"{"id": "b"}"#.as_slice()),
            ("vocabulary/a.json", br#"{"id": "a"}"#.as_slice()),
            ("vocabulary/README.md", b"# Terms".as_slice()),
            ("vocabulary/archive/old.json", br#"{"id": "old"}"#.as_slice()),
        ]);
        let source = RemoteSource::Directory {
            folder: "vocabulary".into(),
        };
        let docs = fetch_remote_set(&forge, &source, &main()).await.unwrap();
        assert_eq!(docs, vec![json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[tokio::test]
    async fn invalid_json_is_malformed() {
        let forge = MockForge::new().with_files(&[("entities/x.json", b"{nope".as_slice())]);
        let source = RemoteSource::Directory {
            folder: "entities".into(),
        };
        assert!(matches!(
            fetch_remote_set(&forge, &source, &main()).await,
            Err(ReconcileError::MalformedRemote { .. })
        ));
    }
}
