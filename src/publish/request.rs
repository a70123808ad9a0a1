//! publish::request
//!
//! Publish requests, caller identity and outcomes.

use serde::Serialize;
use serde_json::Value;

use super::error::PublishError;
use super::pr::BranchCommit;
use crate::core::config::PublisherConfig;
use crate::core::document::{Document, DocumentKind};
use crate::core::types::{BranchName, Oid};
use crate::forge::PullRequest;
use crate::reconcile::DiffResult;

/// The acting user, as supplied by the caller's authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub login: String,
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// `Display Name (@login)`, or `@login` without a display name.
    pub fn attribution(&self) -> String {
        match self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => format!("{} (@{})", name, self.login),
            None => format!("@{}", self.login),
        }
    }
}

/// One document to publish as its own pull request.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub document: Document,
    /// Overrides the generated pull request title
    pub title: Option<String>,
    /// Replaces the generated summary in the pull request body
    pub description: Option<String>,
    /// Name of the existing document being updated; it must exist
    pub update_of: Option<String>,
    /// Content hash the caller last saw on the base branch
    pub expected_sha: Option<Oid>,
}

impl PublishRequest {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            title: None,
            description: None,
            update_of: None,
            expected_sha: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this publish as an update of an existing document.
    pub fn updating(mut self, name: impl Into<String>) -> Self {
        self.update_of = Some(name.into());
        self
    }

    pub fn with_expected_sha(mut self, sha: Oid) -> Self {
        self.expected_sha = Some(sha);
        self
    }
}

/// Many documents of one kind published as a single atomic commit.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub kind: DocumentKind,
    pub documents: Vec<Document>,
    /// Document names whose files are removed in the same commit
    pub deletions: Vec<String>,
    /// Branch slug; defaults to the kind's plural label
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl BatchRequest {
    pub fn new(kind: DocumentKind, documents: Vec<Document>) -> Self {
        Self {
            kind,
            documents,
            deletions: Vec::new(),
            slug: None,
            title: None,
            description: None,
        }
    }

    pub fn with_deletions(mut self, names: Vec<String>) -> Self {
        self.deletions = names;
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Turn a reconciliation result into a batch.
    ///
    /// Added and modified items become documents, deleted items become
    /// deletions. `name_field` names the field that becomes the file name.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Validation` if an item has no usable name.
    ///
    /// # Example
    ///
    /// ```
    /// use govpub::core::document::DocumentKind;
    /// use govpub::publish::BatchRequest;
    /// use govpub::reconcile::{reconcile, ReconcileProfile};
    /// use serde_json::json;
    ///
    /// let local = vec![json!({"id": "a", "label": "A"}), json!({"id": "b"})];
    /// let remote = vec![json!({"id": "a"}), json!({"id": "c"})];
    /// let diff = reconcile(&local, &remote, &ReconcileProfile::vocabulary()).unwrap();
    ///
    /// let batch = BatchRequest::from_diff(DocumentKind::VocabularyTerm, &diff, "id").unwrap();
    /// let names: Vec<_> = batch.documents.iter().map(|d| d.name.as_str()).collect();
    /// assert_eq!(names, vec!["b", "a"]);
    /// assert_eq!(batch.deletions, vec!["c".to_string()]);
    /// ```
    pub fn from_diff(
        kind: DocumentKind,
        diff: &DiffResult,
        name_field: &str,
    ) -> Result<Self, PublishError> {
        let name_of = |doc: &Value| {
            crate::reconcile::document_id(doc, name_field).ok_or_else(|| {
                PublishError::Validation(format!("document has no usable '{}' field", name_field))
            })
        };

        let mut documents = Vec::with_capacity(diff.added.len() + diff.modified.len());
        for item in &diff.added {
            documents.push(Document::json(name_of(&item.document)?, item.document.clone()));
        }
        for item in &diff.modified {
            documents.push(Document::json(name_of(&item.local)?, item.local.clone()));
        }

        let deletions = diff
            .deleted
            .iter()
            .map(|item| name_of(&item.document))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(kind, documents).with_deletions(deletions))
    }
}

/// Pull request fields returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub url: String,
    pub title: String,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub success: bool,
    pub pull_request: PullRequestSummary,
    pub branch: BranchName,
    pub commit: Oid,
    /// Paths written or removed
    pub paths: Vec<String>,
    /// New content hash, for single-file publishes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_sha: Option<Oid>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub public_urls: Vec<String>,
}

impl PublishOutcome {
    pub(crate) fn new(commit: &BranchCommit, pr: &PullRequest, config: &PublisherConfig) -> Self {
        Self {
            success: true,
            pull_request: PullRequestSummary {
                number: pr.number,
                url: pr.url.clone(),
                title: pr.title.clone(),
            },
            branch: commit.branch().clone(),
            commit: commit.commit().clone(),
            paths: commit.all_paths(),
            content_sha: commit.content_sha().cloned(),
            public_urls: commit
                .written_paths()
                .iter()
                .filter_map(|path| config.public_url(path))
                .collect(),
        }
    }
}
