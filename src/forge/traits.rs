//! forge::traits
//!
//! Forge trait definition for the version-control host.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is network I/O.
//! It exposes exactly the host operations the publishing engine needs:
//! repository metadata, ref and commit reads, content reads (used both as
//! an existence probe and as an optimistic-concurrency read), ref creation,
//! single-file commits, and the blob → tree → commit object model for
//! atomic multi-file commits, plus pull request creation.
//!
//! Absence is a value, not an error: [`Forge::get_file`] and
//! [`Forge::list_directory`] return `Ok(None)` when the host reports
//! not-found.
//!
//! # Example
//!
//! ```ignore
//! use govpub::forge::{Forge, CreatePrRequest};
//!
//! async fn open(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let pr = forge.create_pr(CreatePrRequest {
//!         head: "schema/add-address-v1-1700000000000".to_string(),
//!         base: "main".to_string(),
//!         title: "Add Schema: address-v1".to_string(),
//!         body: None,
//!         draft: false,
//!     }).await?;
//!     println!("Created PR #{}: {}", pr.number, pr.url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::core::types::{BranchName, Oid};

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A ref already exists, or an expected content hash is stale.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Repository metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    /// `owner/name`
    pub full_name: String,
    /// The repository's default branch
    pub default_branch: BranchName,
}

/// A commit and the root tree it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: Oid,
    pub tree: Oid,
}

/// A file read from the host: its path, content hash and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    /// Content (blob) hash; the optimistic-concurrency token for updates
    pub sha: Oid,
    pub content: Vec<u8>,
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub sha: Oid,
    pub kind: EntryKind,
}

/// Request to create or update exactly one file as one commit.
///
/// `sha` is `None` for a create and the file's current content hash for an
/// update; the host rejects an update whose hash is stale.
#[derive(Debug, Clone)]
pub struct PutFileRequest {
    pub path: String,
    pub branch: BranchName,
    pub message: String,
    pub content: Vec<u8>,
    pub sha: Option<Oid>,
}

/// Result of a single-file commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommit {
    pub path: String,
    /// New content hash of the file
    pub content_sha: Oid,
    /// The commit that wrote it
    pub commit_sha: Oid,
}

/// Git file mode for tree entries. Registry documents are always plain
/// files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// `100644`
    #[default]
    Regular,
}

impl FileMode {
    /// Octal mode string as the host expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
        }
    }
}

/// One overlay entry of a new tree.
///
/// `blob: None` removes the path from the base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub mode: FileMode,
    pub blob: Option<Oid>,
}

/// Request to create a commit object.
#[derive(Debug, Clone)]
pub struct CreateCommitRequest {
    pub message: String,
    pub tree: Oid,
    pub parents: Vec<Oid>,
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes)
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
    /// Create as draft
    pub draft: bool,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body
    pub body: Option<String>,
    /// Whether the PR is a draft
    pub is_draft: bool,
}

/// The Forge trait for interacting with the version-control host.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; concurrent publishes share one
/// forge and never coordinate.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Nothing is retried here;
/// callers decide whether to retry a whole publish.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Fetch repository metadata (used for the default branch).
    async fn get_repository(&self) -> Result<RepositoryInfo, ForgeError>;

    /// Fetch the commit a branch currently points at.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn get_branch_head(&self, branch: &BranchName) -> Result<Oid, ForgeError>;

    /// Fetch a commit and its root tree.
    async fn get_commit(&self, sha: &Oid) -> Result<CommitInfo, ForgeError>;

    /// Fetch a file's content and content hash on a branch.
    ///
    /// Returns `Ok(None)` when the path (or the branch) does not exist.
    async fn get_file(
        &self,
        path: &str,
        branch: &BranchName,
    ) -> Result<Option<RemoteFile>, ForgeError>;

    /// List the entries of a directory on a branch.
    ///
    /// Returns `Ok(None)` when the directory does not exist.
    async fn list_directory(
        &self,
        path: &str,
        branch: &BranchName,
    ) -> Result<Option<Vec<DirectoryEntry>>, ForgeError>;

    /// Create a branch ref pointing at a commit.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the ref already exists
    async fn create_ref(&self, branch: &BranchName, sha: &Oid) -> Result<(), ForgeError>;

    /// Create or update a single file as one commit on a branch.
    ///
    /// # Errors
    ///
    /// - `Conflict` if `sha` does not match the file's current hash, or is
    ///   missing for an existing file
    async fn put_file(&self, request: PutFileRequest) -> Result<FileCommit, ForgeError>;

    /// Create a content blob and return its hash.
    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError>;

    /// Create a tree by overlaying `entries` on `base_tree`.
    ///
    /// Paths not named in `entries` keep their base-tree values.
    async fn create_tree(&self, base_tree: &Oid, entries: &[TreeEntry])
        -> Result<Oid, ForgeError>;

    /// Create a commit object. Does not move any ref.
    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError>;

    /// Create a new pull request.
    ///
    /// # Errors
    ///
    /// - `ApiError` with status 422 if validation fails (e.g., head doesn't
    ///   exist or has no commits beyond base)
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;
}
