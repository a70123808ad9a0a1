//! publish::pr
//!
//! Pull request composer.
//!
//! Only a [`BranchCommit`] can be turned into a pull request, and only the
//! publishers construct one, so a pull request is never opened for a
//! branch without a commit beyond its base.

use tracing::{info, warn};

use super::error::PublishError;
use super::request::Actor;
use crate::core::config::PublisherConfig;
use crate::core::document::DocumentKind;
use crate::core::naming::BranchVerb;
use crate::core::types::{BranchName, Oid};
use crate::forge::{CreatePrRequest, Forge, PullRequest};

/// A publish branch carrying its new commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchCommit {
    pub(crate) branch: BranchName,
    pub(crate) base: BranchName,
    pub(crate) commit: Oid,
    pub(crate) verb: BranchVerb,
    pub(crate) kind: DocumentKind,
    /// Names of written documents, in request order
    pub(crate) names: Vec<String>,
    pub(crate) written: Vec<String>,
    /// Names and paths of removed documents
    pub(crate) removed_names: Vec<String>,
    pub(crate) removed: Vec<String>,
    pub(crate) content_sha: Option<Oid>,
}

impl BranchCommit {
    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    pub fn base(&self) -> &BranchName {
        &self.base
    }

    pub fn commit(&self) -> &Oid {
        &self.commit
    }

    pub fn written_paths(&self) -> &[String] {
        &self.written
    }

    pub fn removed_paths(&self) -> &[String] {
        &self.removed
    }

    pub fn content_sha(&self) -> Option<&Oid> {
        self.content_sha.as_ref()
    }

    /// Written then removed paths.
    pub fn all_paths(&self) -> Vec<String> {
        self.written.iter().chain(&self.removed).cloned().collect()
    }

    fn document_count(&self) -> usize {
        self.names.len() + self.removed_names.len()
    }

    fn first_name(&self) -> &str {
        self.names
            .first()
            .or_else(|| self.removed_names.first())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// `Add Schema: address-v1`, `Update 3 Vocabulary Terms`, ...
///
/// Also used as the commit message of single-document changes.
pub fn default_title(commit: &BranchCommit) -> String {
    let label = commit.kind.label();
    match commit.document_count() {
        1 if commit.names.is_empty() => format!("Remove {}: {}", label, commit.first_name()),
        1 => format!("{} {}: {}", commit.verb.title(), label, commit.first_name()),
        n => format!("{} {} {}", commit.verb.title(), n, commit.kind.plural_label()),
    }
}

fn default_summary(commit: &BranchCommit) -> String {
    let label = commit.kind.label();
    match (commit.names.len(), commit.removed_names.len()) {
        (1, 0) => {
            let action = match commit.verb {
                BranchVerb::Add => "Adds",
                BranchVerb::Update => "Updates",
            };
            format!("{} {} `{}`.", action, label, commit.first_name())
        }
        (0, 1) => format!("Removes {} `{}`.", label, commit.first_name()),
        (written, removed) => {
            let mut parts = Vec::new();
            if written > 0 {
                parts.push(format!("writes {}", written));
            }
            if removed > 0 {
                parts.push(format!("removes {}", removed));
            }
            format!(
                "Atomic change that {} {}.",
                parts.join(" and "),
                commit.kind.plural_label()
            )
        }
    }
}

/// Pull request body: summary (or the caller's description), paths,
/// public links and attribution.
pub fn compose_body(
    commit: &BranchCommit,
    description: Option<&str>,
    actor: &Actor,
    config: &PublisherConfig,
) -> String {
    let mut body = match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(text) => text.to_string(),
        None => default_summary(commit),
    };

    body.push_str("\n\n**Files**\n");
    for path in &commit.written {
        body.push_str(&format!("- `{}`\n", path));
    }
    for path in &commit.removed {
        body.push_str(&format!("- `{}` (removed)\n", path));
    }

    let links: Vec<String> = commit
        .written
        .iter()
        .filter_map(|path| config.public_url(path))
        .collect();
    if !links.is_empty() {
        body.push_str("\n**Published at**\n");
        for link in links {
            body.push_str(&format!("- {}\n", link));
        }
    }

    body.push_str(&format!("\nSubmitted by {}\n", actor.attribution()));
    body
}

/// Open the pull request for a published branch.
///
/// Not idempotent: calling twice opens two pull requests.
///
/// # Errors
///
/// Any host failure becomes `PublishError::PullRequestFailed`, naming the
/// branch and commit left behind.
pub async fn open_pull_request(
    forge: &dyn Forge,
    config: &PublisherConfig,
    commit: &BranchCommit,
    title: Option<&str>,
    description: Option<&str>,
    actor: &Actor,
) -> Result<PullRequest, PublishError> {
    let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => title.to_string(),
        None => default_title(commit),
    };

    let request = CreatePrRequest {
        head: commit.branch.to_string(),
        base: commit.base.to_string(),
        title,
        body: Some(compose_body(commit, description, actor, config)),
        draft: false,
    };

    match forge.create_pr(request).await {
        Ok(pr) => {
            info!(number = pr.number, url = %pr.url, branch = %commit.branch, "opened pull request");
            Ok(pr)
        }
        Err(source) => {
            warn!(
                branch = %commit.branch,
                commit = %commit.commit.short(7),
                error = %source,
                "pull request failed; branch left in place"
            );
            Err(PublishError::PullRequestFailed {
                branch: commit.branch.clone(),
                commit: commit.commit.clone(),
                source,
            })
        }
    }
}
