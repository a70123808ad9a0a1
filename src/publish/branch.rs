//! publish::branch
//!
//! Branch allocation.
//!
//! A publish branch is created exactly once, pointing at a commit that
//! already exists: the base head for single-file publishes, the new batch
//! commit for atomic publishes. Ref creation is safe to re-run: a ref that
//! already points at the requested commit counts as created.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::error::PublishError;
use crate::core::naming::{publish_branch_name, BranchVerb};
use crate::core::types::{BranchName, Oid};
use crate::forge::{Forge, ForgeError};

/// A freshly created branch and the base commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedBranch {
    pub name: BranchName,
    pub base: BranchName,
    pub base_commit: Oid,
}

/// Create `branch` at `commit`.
///
/// # Errors
///
/// Returns `PublishError::Conflict` if the branch already exists at a
/// different commit.
pub async fn create_branch_at(
    forge: &dyn Forge,
    branch: &BranchName,
    commit: &Oid,
) -> Result<(), PublishError> {
    match forge.create_ref(branch, commit).await {
        Ok(()) => {
            info!(branch = %branch, commit = %commit.short(7), "created branch");
            Ok(())
        }
        Err(ForgeError::Conflict(message)) => {
            let existing = forge.get_branch_head(branch).await?;
            if &existing == commit {
                debug!(branch = %branch, "branch already exists at the same commit");
                Ok(())
            } else {
                Err(PublishError::Conflict(format!(
                    "branch '{}' already exists at {} ({})",
                    branch,
                    existing.short(7),
                    message
                )))
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Allocate a new branch at the current head of `base`.
///
/// The name is `{prefix}/{verb}-{slug}-{unixMillis}` with the timestamp
/// taken from `at`.
pub async fn allocate(
    forge: &dyn Forge,
    base: &BranchName,
    prefix: &str,
    verb: BranchVerb,
    slug: &str,
    at: DateTime<Utc>,
) -> Result<AllocatedBranch, PublishError> {
    let base_commit = forge.get_branch_head(base).await?;
    let name = publish_branch_name(prefix, verb, slug, at)?;
    create_branch_at(forge, &name, &base_commit).await?;

    Ok(AllocatedBranch {
        name,
        base: base.clone(),
        base_commit,
    })
}
