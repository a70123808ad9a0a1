//! publish::single
//!
//! Single-file publisher.
//!
//! # Flow
//!
//! 1. Encode the document (no network before this succeeds)
//! 2. Resolve the base branch
//! 3. Probe the target path on the base branch
//! 4. Check the update precondition
//! 5. Allocate a branch at the base head
//! 6. Write the file as one commit on the new branch
//!
//! The expected content hash is always compared with the file on the
//! *base* branch: that is the version the caller saw.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::base::resolve_base_branch;
use super::branch::allocate;
use super::error::PublishError;
use super::pr::{default_title, BranchCommit};
use super::request::PublishRequest;
use crate::core::config::{PublisherConfig, UpdatePolicy};
use crate::core::document::{encode, Document, DocumentKind};
use crate::core::naming::BranchVerb;
use crate::core::types::Oid;
use crate::forge::{Forge, PutFileRequest, RemoteFile};

/// Decide whether the write may proceed and which hash to send with it.
///
/// Returns the current content hash of the path on the base branch, or
/// `None` if the write is a create.
pub(crate) fn check_precondition(
    policy: UpdatePolicy,
    path: &str,
    existing: Option<&RemoteFile>,
    expected: Option<&Oid>,
    update_of: Option<&str>,
) -> Result<Option<Oid>, PublishError> {
    match (existing, expected) {
        (Some(current), Some(expected)) if &current.sha != expected => {
            Err(PublishError::Conflict(format!(
                "'{}' changed on the base branch: expected {}, found {}",
                path,
                expected.short(7),
                current.sha.short(7)
            )))
        }
        (None, Some(expected)) => Err(PublishError::Conflict(format!(
            "'{}' does not exist on the base branch but content hash {} was expected",
            path,
            expected.short(7)
        ))),
        (None, None) if update_of.is_some() => Err(PublishError::Conflict(format!(
            "cannot update '{}': '{}' does not exist on the base branch",
            update_of.unwrap_or_default(),
            path
        ))),
        (Some(_), None) if policy == UpdatePolicy::Strict => Err(PublishError::Conflict(format!(
            "'{}' already exists; an expected content hash is required to update it",
            path
        ))),
        (existing, _) => Ok(existing.map(|file| file.sha.clone())),
    }
}

/// Publish one document on its own branch.
pub(crate) async fn publish_single(
    forge: &dyn Forge,
    config: &PublisherConfig,
    kind: &DocumentKind,
    request: &PublishRequest,
    now: DateTime<Utc>,
) -> Result<BranchCommit, PublishError> {
    // An update targets the existing document's path.
    let document = match &request.update_of {
        Some(name) => Document {
            name: name.clone(),
            content: request.document.content.clone(),
        },
        None => request.document.clone(),
    };
    let encoded = encode(kind, &document, &config.folders)?;

    let base = resolve_base_branch(forge, &config.repository).await?;
    let existing = forge.get_file(&encoded.path, &base).await?;

    let current_sha = check_precondition(
        config.update_policy,
        &encoded.path,
        existing.as_ref(),
        request.expected_sha.as_ref(),
        request.update_of.as_deref(),
    )?;
    if existing.as_ref().is_some_and(|f| f.content == encoded.bytes) {
        return Err(PublishError::Validation(format!(
            "'{}' already has this content on '{}'",
            encoded.path, base
        )));
    }

    let verb = if current_sha.is_some() {
        BranchVerb::Update
    } else {
        BranchVerb::Add
    };
    debug!(path = %encoded.path, %verb, "single-file publish");

    let branch = allocate(
        forge,
        &base,
        &kind.branch_prefix(),
        verb,
        &encoded.name,
        now,
    )
    .await?;

    let mut commit = BranchCommit {
        branch: branch.name,
        base,
        commit: branch.base_commit,
        verb,
        kind: kind.clone(),
        names: vec![encoded.name],
        written: vec![encoded.path.clone()],
        removed_names: Vec::new(),
        removed: Vec::new(),
        content_sha: None,
    };

    let written = forge
        .put_file(PutFileRequest {
            path: encoded.path,
            branch: commit.branch.clone(),
            message: default_title(&commit),
            content: encoded.bytes,
            sha: current_sha,
        })
        .await
        .map_err(|e| {
            warn!(branch = %commit.branch, error = %e, "file write failed; branch left in place");
            PublishError::from(e)
        })?;

    info!(
        branch = %commit.branch,
        path = %written.path,
        commit = %written.commit_sha.short(7),
        "wrote file"
    );
    commit.commit = written.commit_sha;
    commit.content_sha = Some(written.content_sha);
    Ok(commit)
}
