//! publish::error
//!
//! Publish error taxonomy.

use thiserror::Error;

use crate::core::document::DocumentError;
use crate::core::types::{BranchName, Oid, TypeError};
use crate::forge::ForgeError;

/// Errors from a publish attempt.
///
/// Nothing is retried and nothing is rolled back: a failure after the
/// branch exists leaves the branch on the host.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The request was rejected before any network call.
    #[error("invalid publish request: {0}")]
    Validation(String),

    /// A ref collision or a stale expected content hash.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other host failure (auth, rate limit, network, API).
    #[error("host error: {0}")]
    Host(#[source] ForgeError),

    /// The branch and commit exist but the pull request could not be opened.
    #[error(
        "branch '{branch}' (commit {short}) was published but the pull request failed: {source}",
        short = .commit.short(7)
    )]
    PullRequestFailed {
        branch: BranchName,
        commit: Oid,
        #[source]
        source: ForgeError,
    },
}

impl PublishError {
    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::Validation(_) => "validation",
            PublishError::Conflict(_) => "conflict",
            PublishError::Host(_) => "host",
            PublishError::PullRequestFailed { .. } => "pull_request_failed",
        }
    }

    /// Branch left behind by this failure, if known.
    pub fn orphaned_branch(&self) -> Option<&BranchName> {
        match self {
            PublishError::PullRequestFailed { branch, .. } => Some(branch),
            _ => None,
        }
    }
}

impl From<ForgeError> for PublishError {
    fn from(err: ForgeError) -> Self {
        match err {
            ForgeError::Conflict(message) => PublishError::Conflict(message),
            other => PublishError::Host(other),
        }
    }
}

impl From<DocumentError> for PublishError {
    fn from(err: DocumentError) -> Self {
        PublishError::Validation(err.to_string())
    }
}

impl From<TypeError> for PublishError {
    fn from(err: TypeError) -> Self {
        PublishError::Validation(err.to_string())
    }
}
