//! publish::base
//!
//! Base branch resolution.

use tracing::debug;

use crate::core::config::RepositoryCoordinates;
use crate::core::types::BranchName;
use crate::forge::{Forge, ForgeError};

/// Branch new work is proposed against.
///
/// A pinned base branch is returned without a network call; otherwise the
/// repository's default branch is read once. Host errors propagate as-is.
pub async fn resolve_base_branch(
    forge: &dyn Forge,
    repository: &RepositoryCoordinates,
) -> Result<BranchName, ForgeError> {
    if let Some(pinned) = &repository.base_branch {
        debug!(base = %pinned, "using pinned base branch");
        return Ok(pinned.clone());
    }

    let info = forge.get_repository().await?;
    debug!(base = %info.default_branch, repo = %info.full_name, "resolved default branch");
    Ok(info.default_branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};

    fn coordinates(base: Option<&str>) -> RepositoryCoordinates {
        RepositoryCoordinates {
            owner: "gov".into(),
            name: "registry".into(),
            base_branch: base.map(|b| BranchName::new(b).unwrap()),
        }
    }

    #[tokio::test]
    async fn pinned_branch_skips_host() {
        let forge = MockForge::new().fail_on(FailOn::GetRepository(ForgeError::RateLimited));
        let base = resolve_base_branch(&forge, &coordinates(Some("develop")))
            .await
            .unwrap();
        assert_eq!(base.as_str(), "develop");
        assert!(forge.operations().is_empty());
    }

    #[tokio::test]
    async fn default_branch_fetched_once() {
        let forge = MockForge::with_default_branch("trunk");
        let base = resolve_base_branch(&forge, &coordinates(None)).await.unwrap();
        assert_eq!(base.as_str(), "trunk");
        assert_eq!(forge.operations(), vec![MockOperation::GetRepository]);
    }

    #[tokio::test]
    async fn host_error_propagates() {
        let forge = MockForge::new().fail_on(FailOn::GetRepository(ForgeError::AuthRequired));
        assert_eq!(
            resolve_base_branch(&forge, &coordinates(None)).await,
            Err(ForgeError::AuthRequired)
        );
    }
}
