//! publish
//!
//! The publishing engine.
//!
//! # Architecture
//!
//! Every publish flows through the same steps:
//!
//! ```text
//! encode → resolve base → allocate branch → commit → open pull request
//! ```
//!
//! - [`base`]: base branch resolution (pinned or the repository default)
//! - [`branch`]: branch allocation with idempotent ref creation
//! - `single`: one file, one commit, optimistic concurrency on the base hash
//! - `atomic`: many files, one commit built from blobs and an overlay tree
//! - [`pr`]: pull request composition
//!
//! [`Publisher`] is the facade: one operation per document kind plus the
//! batch operation. It holds no mutable state; concurrent publishes share
//! nothing but the forge.
//!
//! # Failure
//!
//! Nothing is retried and nothing is rolled back. Validation happens
//! before any network call. A failure after the branch exists leaves the
//! branch (and its commit) on the host; [`PublishError::orphaned_branch`]
//! names it when known.
//!
//! # Example
//!
//! ```
//! use govpub::core::config::PublisherConfig;
//! use govpub::core::document::Document;
//! use govpub::forge::mock::MockForge;
//! use govpub::publish::{Actor, PublishRequest, Publisher};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//! let config = PublisherConfig::for_repository("gov", "registry").unwrap();
//! let publisher = Publisher::new(&forge, &config);
//!
//! let request = PublishRequest::new(Document::json("address-v1", json!({"type": "object"})));
//! let outcome = publisher
//!     .publish_schema(request, &Actor::new("alice"))
//!     .await
//!     .unwrap();
//!
//! assert!(outcome.success);
//! assert!(outcome.branch.as_str().starts_with("schema/add-address-v1-"));
//! assert_eq!(outcome.paths, vec!["schemas/address-v1.json".to_string()]);
//! # });
//! ```

mod atomic;
pub mod base;
pub mod branch;
mod error;
pub mod pr;
mod request;
mod single;

pub use error::PublishError;
pub use pr::BranchCommit;
pub use request::{
    Actor, BatchRequest, PublishOutcome, PublishRequest, PullRequestSummary,
};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::core::config::PublisherConfig;
use crate::core::document::DocumentKind;
use crate::forge::Forge;

/// Source of the timestamp embedded in branch names.
pub type Clock = fn() -> DateTime<Utc>;

/// Publishing facade over one forge and one configuration.
pub struct Publisher<'a> {
    forge: &'a dyn Forge,
    config: &'a PublisherConfig,
    clock: Clock,
}

impl<'a> Publisher<'a> {
    pub fn new(forge: &'a dyn Forge, config: &'a PublisherConfig) -> Self {
        Self {
            forge,
            config,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock (tests pin branch names with this).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PublisherConfig {
        self.config
    }

    /// Publish one document of `kind` on its own branch and open a pull
    /// request for it.
    ///
    /// # Errors
    ///
    /// - `Validation` if the document cannot be encoded (no network call)
    /// - `Conflict` for a stale or unexpected content hash, or a ref collision
    /// - `Host` for any other host failure
    /// - `PullRequestFailed` if only the final step failed
    pub async fn publish(
        &self,
        kind: &DocumentKind,
        request: PublishRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        let commit =
            single::publish_single(self.forge, self.config, kind, &request, (self.clock)()).await?;
        let pr = pr::open_pull_request(
            self.forge,
            self.config,
            &commit,
            request.title.as_deref(),
            request.description.as_deref(),
            actor,
        )
        .await?;

        info!(kind = %kind, number = pr.number, "published document");
        Ok(PublishOutcome::new(&commit, &pr, self.config))
    }

    pub async fn publish_schema(
        &self,
        request: PublishRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        self.publish(&DocumentKind::Schema, request, actor).await
    }

    pub async fn publish_credential_type(
        &self,
        request: PublishRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        self.publish(&DocumentKind::CredentialType, request, actor)
            .await
    }

    pub async fn publish_entity_statement(
        &self,
        request: PublishRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        self.publish(&DocumentKind::EntityStatement, request, actor)
            .await
    }

    pub async fn publish_vocabulary_term(
        &self,
        request: PublishRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        self.publish(&DocumentKind::VocabularyTerm, request, actor)
            .await
    }

    pub async fn publish_mapping(
        &self,
        request: PublishRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        self.publish(&DocumentKind::HarmonizationMapping, request, actor)
            .await
    }

    /// Publish an asset under `assets/<asset_type>/`.
    pub async fn publish_asset(
        &self,
        asset_type: &str,
        request: PublishRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        let kind = DocumentKind::Asset {
            asset_type: asset_type.to_string(),
        };
        self.publish(&kind, request, actor).await
    }

    /// Publish a batch as one atomic commit and open one pull request.
    ///
    /// Either every document lands in the single commit or the branch is
    /// never created.
    pub async fn publish_batch(
        &self,
        request: BatchRequest,
        actor: &Actor,
    ) -> Result<PublishOutcome, PublishError> {
        let commit =
            atomic::publish_atomic(self.forge, self.config, &request, (self.clock)()).await?;
        let pr = pr::open_pull_request(
            self.forge,
            self.config,
            &commit,
            request.title.as_deref(),
            request.description.as_deref(),
            actor,
        )
        .await?;

        info!(
            kind = %request.kind,
            number = pr.number,
            paths = commit.all_paths().len(),
            "published batch"
        );
        Ok(PublishOutcome::new(&commit, &pr, self.config))
    }
}
