//! publish::atomic
//!
//! Atomic multi-file publisher.
//!
//! Builds one commit from the bottom up (blobs, then one tree overlaid on
//! the base tree, then one commit whose parent is the base head) and only
//! then creates the branch. A failure before the last step leaves nothing
//! visible on the host except unreferenced objects.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::base::resolve_base_branch;
use super::branch::create_branch_at;
use super::error::PublishError;
use super::pr::BranchCommit;
use super::request::BatchRequest;
use crate::core::config::PublisherConfig;
use crate::core::document::{encode, DocumentKind};
use crate::core::naming::{publish_branch_name, slugify, BranchVerb};
use crate::forge::{CreateCommitRequest, FileMode, Forge, TreeEntry};

/// Commit message summarizing the batch size and its first document.
pub(crate) fn batch_commit_message(
    kind: &DocumentKind,
    names: &[String],
    removed: &[String],
) -> String {
    match (names, removed) {
        ([name], []) => format!("Update {}: {}", kind.label(), name),
        ([], [name]) => format!("Remove {}: {}", kind.label(), name),
        _ => {
            let first = names.first().or(removed.first()).map(String::as_str).unwrap_or("");
            let mut message = format!(
                "Update {} {} (first: {})",
                names.len() + removed.len(),
                kind.plural_label(),
                first
            );
            if !removed.is_empty() {
                message.push_str(&format!("\n\nRemoves {} of them.", removed.len()));
            }
            message
        }
    }
}

/// Publish a batch of documents as a single commit on a new branch.
pub(crate) async fn publish_atomic(
    forge: &dyn Forge,
    config: &PublisherConfig,
    request: &BatchRequest,
    now: DateTime<Utc>,
) -> Result<BranchCommit, PublishError> {
    let kind = &request.kind;
    kind.validate()?;
    if request.documents.is_empty() && request.deletions.is_empty() {
        return Err(PublishError::Validation(
            "a batch needs at least one document or deletion".to_string(),
        ));
    }

    let encoded = request
        .documents
        .iter()
        .map(|doc| encode(kind, doc, &config.folders))
        .collect::<Result<Vec<_>, _>>()?;
    let removed = request
        .deletions
        .iter()
        .map(|name| kind.path_for(name, &config.folders))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    for path in encoded.iter().map(|e| &e.path).chain(&removed) {
        if !seen.insert(path.as_str()) {
            return Err(PublishError::Validation(format!(
                "'{}' appears more than once in the batch",
                path
            )));
        }
    }

    let slug = match request.slug.as_deref().map(slugify).filter(|s| !s.is_empty()) {
        Some(slug) => slug,
        None => slugify(&kind.plural_label()),
    };
    let branch = publish_branch_name(&kind.branch_prefix(), BranchVerb::Update, &slug, now)?;

    let base = resolve_base_branch(forge, &config.repository).await?;
    let base_commit = forge.get_branch_head(&base).await?;
    let base_tree = forge.get_commit(&base_commit).await?.tree;
    debug!(
        base = %base,
        base_commit = %base_commit.short(7),
        writes = encoded.len(),
        removals = removed.len(),
        "atomic publish"
    );

    for path in &removed {
        if forge.get_file(path, &base).await?.is_none() {
            return Err(PublishError::Conflict(format!(
                "cannot remove '{}': it does not exist on '{}'",
                path, base
            )));
        }
    }

    let mut entries = Vec::with_capacity(encoded.len() + removed.len());
    for doc in &encoded {
        let blob = forge.create_blob(&doc.bytes).await?;
        entries.push(TreeEntry {
            path: doc.path.clone(),
            mode: FileMode::Regular,
            blob: Some(blob),
        });
    }
    for path in &removed {
        entries.push(TreeEntry {
            path: path.clone(),
            mode: FileMode::Regular,
            blob: None,
        });
    }

    let tree = forge.create_tree(&base_tree, &entries).await?;
    if tree == base_tree {
        return Err(PublishError::Validation(format!(
            "the batch matches '{}' exactly; nothing to publish",
            base
        )));
    }
    let names: Vec<String> = encoded.iter().map(|e| e.name.clone()).collect();
    let commit = forge
        .create_commit(CreateCommitRequest {
            message: batch_commit_message(kind, &names, &request.deletions),
            tree,
            parents: vec![base_commit],
        })
        .await?;

    // The ref is the only visible effect and comes last.
    create_branch_at(forge, &branch, &commit).await?;
    info!(
        branch = %branch,
        commit = %commit.short(7),
        paths = entries.len(),
        "published batch"
    );

    Ok(BranchCommit {
        branch,
        base,
        commit,
        verb: BranchVerb::Update,
        kind: kind.clone(),
        names,
        written: encoded.into_iter().map(|e| e.path).collect(),
        removed_names: request.deletions.clone(),
        removed,
        content_sha: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn message_for_one_document() {
        assert_eq!(
            batch_commit_message(&DocumentKind::VocabularyTerm, &strings(&["given-name"]), &[]),
            "Update Vocabulary Term: given-name"
        );
        assert_eq!(
            batch_commit_message(&DocumentKind::VocabularyTerm, &[], &strings(&["old"])),
            "Remove Vocabulary Term: old"
        );
    }

    #[test]
    fn message_for_many_documents() {
        assert_eq!(
            batch_commit_message(
                &DocumentKind::EntityStatement,
                &strings(&["acme", "globex", "initech"]),
                &[]
            ),
            "Update 3 Entity Statements (first: acme)"
        );
        let with_removal = batch_commit_message(
            &DocumentKind::EntityStatement,
            &strings(&["acme"]),
            &strings(&["hooli"]),
        );
        assert!(with_removal.starts_with("Update 2 Entity Statements (first: acme)"));
        assert!(with_removal.ends_with("Removes 1 of them."));
    }
}
