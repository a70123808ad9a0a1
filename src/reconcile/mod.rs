//! reconcile
//!
//! Diff reconciler: compares a local document collection against the
//! remote published collection.
//!
//! # Classification
//!
//! Both collections are indexed by the profile's identifier field. Every
//! local item is then **added** (no remote counterpart), **unchanged**
//! (deep-equal to its counterpart) or **modified** (with a field-level
//! change list). Every remote item without a local counterpart is
//! **deleted**.
//!
//! [`reconcile`] is a pure function: no I/O, safe to call repeatedly and
//! speculatively. Fetching the remote side lives in [`remote`].
//!
//! # Example
//!
//! ```
//! use govpub::reconcile::{reconcile, ReconcileProfile};
//! use serde_json::json;
//!
//! let local = vec![json!({"id": "a"}), json!({"id": "b"})];
//! let remote = vec![json!({"id": "a"}), json!({"id": "c"})];
//!
//! let diff = reconcile(&local, &remote, &ReconcileProfile::entities()).unwrap();
//! assert_eq!(diff.added[0].id, "b");
//! assert_eq!(diff.deleted[0].id, "c");
//! assert_eq!(diff.unchanged[0].id, "a");
//! ```

pub mod profile;
pub mod remote;

pub use profile::ReconcileProfile;
pub use remote::{fetch_remote_set, preview, RemoteSource};

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::forge::ForgeError;

/// Which collection a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Local,
    Remote,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Local => write!(f, "local"),
            Side::Remote => write!(f, "remote"),
        }
    }
}

/// Errors from reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{side} document at index {index} has no usable '{field}' identifier")]
    MissingKey {
        side: Side,
        index: usize,
        field: String,
    },

    #[error("duplicate identifier '{id}' in {side} collection")]
    DuplicateKey { side: Side, id: String },

    #[error("malformed remote collection '{path}': {message}")]
    MalformedRemote { path: String, message: String },

    #[error("failed to fetch remote collection: {0}")]
    Host(#[from] ForgeError),
}

/// One field-level difference of a modified item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum FieldChange {
    /// A watched field differs by value.
    Changed { field: String },
    /// A set-valued field gained or lost members.
    SetChanged {
        field: String,
        added: Vec<Value>,
        removed: Vec<Value>,
    },
    /// A nested collection changed size.
    CountChanged {
        field: String,
        before: usize,
        after: usize,
    },
    /// The documents differ only in fields the profile does not inspect.
    Other,
}

impl FieldChange {
    /// The field this change names, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            FieldChange::Changed { field }
            | FieldChange::SetChanged { field, .. }
            | FieldChange::CountChanged { field, .. } => Some(field),
            FieldChange::Other => None,
        }
    }
}

/// A classified document and its identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffItem {
    pub id: String,
    pub document: Value,
}

/// A document present on both sides with different content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModifiedItem {
    pub id: String,
    pub local: Value,
    pub remote: Value,
    pub changes: Vec<FieldChange>,
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub added: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub total_local: usize,
    pub total_remote: usize,
}

/// Result of one reconciliation. The four lists are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffResult {
    pub added: Vec<DiffItem>,
    pub modified: Vec<ModifiedItem>,
    pub unchanged: Vec<DiffItem>,
    pub deleted: Vec<DiffItem>,
    pub counts: DiffCounts,
}

impl DiffResult {
    /// True if publishing the local set would change anything.
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }
}

/// Classify `local` against `remote`.
///
/// Added, modified and unchanged items follow local order; deleted items
/// follow remote order.
///
/// # Errors
///
/// Returns `ReconcileError::MissingKey` if a document lacks a string or
/// numeric identifier, and `ReconcileError::DuplicateKey` if an identifier
/// repeats within one collection.
pub fn reconcile(
    local: &[Value],
    remote: &[Value],
    profile: &ReconcileProfile,
) -> Result<DiffResult, ReconcileError> {
    let local_ids = index(local, Side::Local, &profile.id_field)?;
    let remote_ids = index(remote, Side::Remote, &profile.id_field)?;

    let remote_by_id: HashMap<&str, &Value> = remote_ids
        .iter()
        .map(String::as_str)
        .zip(remote.iter())
        .collect();

    let mut result = DiffResult::default();

    for (id, doc) in local_ids.iter().zip(local.iter()) {
        match remote_by_id.get(id.as_str()) {
            None => result.added.push(DiffItem {
                id: id.clone(),
                document: doc.clone(),
            }),
            Some(remote_doc) if *remote_doc == doc => result.unchanged.push(DiffItem {
                id: id.clone(),
                document: doc.clone(),
            }),
            Some(remote_doc) => result.modified.push(ModifiedItem {
                id: id.clone(),
                local: doc.clone(),
                remote: (*remote_doc).clone(),
                changes: field_changes(doc, remote_doc, profile),
            }),
        }
    }

    let local_set: HashSet<&str> = local_ids.iter().map(String::as_str).collect();
    for (id, doc) in remote_ids.iter().zip(remote.iter()) {
        if !local_set.contains(id.as_str()) {
            result.deleted.push(DiffItem {
                id: id.clone(),
                document: doc.clone(),
            });
        }
    }

    result.counts = DiffCounts {
        added: result.added.len(),
        modified: result.modified.len(),
        unchanged: result.unchanged.len(),
        deleted: result.deleted.len(),
        total_local: local.len(),
        total_remote: remote.len(),
    };
    Ok(result)
}

/// Extract a document's identifier: a non-empty string or a number.
pub fn document_id(doc: &Value, id_field: &str) -> Option<String> {
    match doc.get(id_field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Identifiers in collection order, rejecting missing and repeated ones.
fn index(docs: &[Value], side: Side, id_field: &str) -> Result<Vec<String>, ReconcileError> {
    let mut seen = HashSet::new();
    docs.iter()
        .enumerate()
        .map(|(index, doc)| {
            let id = document_id(doc, id_field).ok_or_else(|| ReconcileError::MissingKey {
                side,
                index,
                field: id_field.to_string(),
            })?;
            if !seen.insert(id.clone()) {
                return Err(ReconcileError::DuplicateKey { side, id });
            }
            Ok(id)
        })
        .collect()
}

fn field_changes(local: &Value, remote: &Value, profile: &ReconcileProfile) -> Vec<FieldChange> {
    let mut changes = Vec::new();

    for field in &profile.watched_fields {
        if local.get(field) != remote.get(field) {
            changes.push(FieldChange::Changed {
                field: field.clone(),
            });
        }
    }

    for field in &profile.set_fields {
        let ours = members(local.get(field));
        let theirs = members(remote.get(field));
        let added = difference(&ours, &theirs);
        let removed = difference(&theirs, &ours);
        if !added.is_empty() || !removed.is_empty() {
            changes.push(FieldChange::SetChanged {
                field: field.clone(),
                added,
                removed,
            });
        }
    }

    for field in &profile.count_fields {
        let after = count(local.get(field));
        let before = count(remote.get(field));
        if before != after {
            changes.push(FieldChange::CountChanged {
                field: field.clone(),
                before,
                after,
            });
        }
    }

    if changes.is_empty() {
        changes.push(FieldChange::Other);
    }
    changes
}

/// Array members; a missing or non-array field is the empty set.
fn members(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}

/// Members of `a` not in `b`, first occurrence only.
fn difference(a: &[&Value], b: &[&Value]) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in a {
        if !b.contains(item) && !out.iter().any(|o| o == *item) {
            out.push((*item).clone());
        }
    }
    out
}

fn count(value: Option<&Value>) -> usize {
    match value {
        Some(Value::Array(items)) => items.len(),
        Some(Value::Object(map)) => map.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_collections_unchanged() {
        let docs = vec![json!({"id": "a", "name": "A"}), json!({"id": "b"})];
        let diff = reconcile(&docs, &docs, &ReconcileProfile::entities()).unwrap();
        assert!(!diff.has_changes());
        assert_eq!(diff.counts.unchanged, 2);
    }

    #[test]
    fn watched_field_change_named() {
        let local = vec![json!({"id": "a", "name": "Acme Corp"})];
        let remote = vec![json!({"id": "a", "name": "Acme"})];
        let diff = reconcile(&local, &remote, &ReconcileProfile::entities()).unwrap();
        assert_eq!(diff.modified.len(), 1);
        assert_eq!(
            diff.modified[0].changes,
            vec![FieldChange::Changed {
                field: "name".into()
            }]
        );
    }

    #[test]
    fn set_field_ignores_order() {
        let profile = ReconcileProfile::entities();
        let local = vec![json!({"id": "a", "categories": ["x", "y"]})];
        let remote = vec![json!({"id": "a", "categories": ["y", "x"]})];
        let diff = reconcile(&local, &remote, &profile).unwrap();
        assert_eq!(diff.modified[0].changes, vec![FieldChange::Other]);

        let local = vec![json!({"id": "a", "categories": ["x", "z"]})];
        let diff = reconcile(&local, &remote, &profile).unwrap();
        assert_eq!(
            diff.modified[0].changes,
            vec![FieldChange::SetChanged {
                field: "categories".into(),
                added: vec![json!("z")],
                removed: vec![json!("y")],
            }]
        );
    }

    #[test]
    fn count_field_compares_sizes() {
        let local = vec![json!({"id": 7, "credentials": [{}, {}, {}]})];
        let remote = vec![json!({"id": 7, "credentials": [{}]})];
        let diff = reconcile(&local, &remote, &ReconcileProfile::entities()).unwrap();
        assert_eq!(diff.modified[0].id, "7");
        assert_eq!(
            diff.modified[0].changes,
            vec![FieldChange::CountChanged {
                field: "credentials".into(),
                before: 1,
                after: 3,
            }]
        );
    }

    #[test]
    fn ordering_follows_sources() {
        let local = vec![json!({"id": "z"}), json!({"id": "m"}), json!({"id": "a"})];
        let remote = vec![json!({"id": "q"}), json!({"id": "b"})];
        let diff = reconcile(&local, &remote, &ReconcileProfile::generic()).unwrap();
        let added: Vec<_> = diff.added.iter().map(|d| d.id.as_str()).collect();
        let deleted: Vec<_> = diff.deleted.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(added, vec!["z", "m", "a"]);
        assert_eq!(deleted, vec!["q", "b"]);
        assert_eq!(diff.counts.total_remote, 2);
    }

    #[test]
    fn missing_and_duplicate_ids_rejected() {
        let profile = ReconcileProfile::generic();
        let err = reconcile(&[json!({"name": "x"})], &[], &profile).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MissingKey {
                side: Side::Local,
                index: 0,
                ..
            }
        ));

        let err = reconcile(&[], &[json!({"id": ""})], &profile).unwrap_err();
        assert!(matches!(err, ReconcileError::MissingKey { side: Side::Remote, .. }));

        let dup = vec![json!({"id": "a"}), json!({"id": "a"})];
        let err = reconcile(&dup, &[], &profile).unwrap_err();
        assert!(matches!(err, ReconcileError::DuplicateKey { .. }));
    }

    #[test]
    fn field_change_serializes_tagged() {
        let change = FieldChange::CountChanged {
            field: "examples".into(),
            before: 0,
            after: 2,
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({"change": "count_changed", "field": "examples", "before": 0, "after": 2})
        );
        assert_eq!(change.field(), Some("examples"));
    }
}
