//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub:
//! - Repository, ref and commit reads via `repos/{o}/{r}` and the Git data API
//! - Content reads and single-file commits via the contents API
//! - Atomic multi-file commits via `git/blobs`, `git/trees`, `git/commits`
//! - Pull requests via `pulls`
//!
//! # Authentication
//!
//! The caller supplies an already-authorized token; obtaining and
//! refreshing it is outside this crate.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not retry anything (caller's responsibility)
//!
//! # Example
//!
//! ```ignore
//! use govpub::forge::github::GitHubForge;
//! use govpub::forge::Forge;
//!
//! let forge = GitHubForge::new("ghp_xxx", "governance-org", "registry");
//! let info = forge.get_repository().await?;
//! println!("default branch: {}", info.default_branch);
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::traits::{
    CommitInfo, CreateCommitRequest, CreatePrRequest, DirectoryEntry, EntryKind, FileCommit,
    Forge, ForgeError, PullRequest, PutFileRequest, RemoteFile, RepositoryInfo, TreeEntry,
};
use crate::core::config::{PublisherConfig, DEFAULT_API_BASE};
use crate::core::types::{BranchName, Oid, RefName};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "govpub";

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token
    token: String,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &!self.token.is_empty())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge against `api.github.com`.
    pub fn new(token: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_API_BASE)
    }

    /// Create a GitHub forge with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations and for tests against a
    /// local mock server.
    pub fn with_api_base(
        token: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a GitHub forge for the configured repository.
    pub fn from_config(config: &PublisherConfig, token: impl Into<String>) -> Self {
        Self::with_api_base(
            token,
            config.repository.owner.clone(),
            config.repository.name.clone(),
            config.api_base.clone(),
        )
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        if self.token.is_empty() {
            return Err(ForgeError::AuthRequired);
        }

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Build the contents URL for a repository path, percent-encoding each
    /// segment.
    fn contents_url(&self, path: &str) -> Result<Url, ForgeError> {
        let mut url = Url::parse(&self.repo_url("contents")).map_err(|e| ForgeError::ApiError {
            status: 0,
            message: format!("invalid API base URL: {}", e),
        })?;
        url.path_segments_mut()
            .map_err(|_| ForgeError::ApiError {
                status: 0,
                message: "API base URL cannot carry a path".into(),
            })?
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// Send a request with the standard headers.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        let request = request
            .headers(self.headers()?)
            .build()
            .map_err(|e| ForgeError::NetworkError(e.to_string()))?;
        debug!(method = %request.method(), url = %request.url(), "github request");

        self.client
            .execute(request)
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // GitHub Apps use X-Accepted-GitHub-Permissions to name what was missing.
        let required_permissions = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let rate_exhausted = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(map_status(
            status,
            message,
            required_permissions,
            rate_exhausted,
        ))
    }
}

/// Map a non-success status to a `ForgeError`.
fn map_status(
    status: StatusCode,
    message: String,
    required_permissions: Option<String>,
    rate_exhausted: bool,
) -> ForgeError {
    match status {
        StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
        StatusCode::FORBIDDEN if rate_exhausted => ForgeError::RateLimited,
        StatusCode::FORBIDDEN => {
            let mut err_msg = format!("Permission denied: {}", message);
            if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                err_msg.push_str(&format!(" [required: {}]", perms));
            }
            ForgeError::AuthFailed(err_msg)
        }
        StatusCode::NOT_FOUND => ForgeError::NotFound(message),
        StatusCode::CONFLICT => ForgeError::Conflict(message),
        StatusCode::UNPROCESSABLE_ENTITY if is_conflict_message(&message) => {
            ForgeError::Conflict(message)
        }
        StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
        _ if status.is_server_error() => ForgeError::ApiError {
            status: status.as_u16(),
            message: format!("GitHub server error: {}", message),
        },
        _ => ForgeError::ApiError {
            status: status.as_u16(),
            message,
        },
    }
}

/// 422 responses that mean "someone else got there first".
fn is_conflict_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("already exists")
        || lower.contains("does not match")
        || lower.contains("\"sha\" wasn't supplied")
}

/// Turn a not-found error into `None`.
fn absent_on_not_found<T>(result: Result<T, ForgeError>) -> Result<Option<T>, ForgeError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ForgeError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, ForgeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(compact).map_err(|e| ForgeError::ApiError {
        status: 200,
        message: format!("Failed to decode base64 content: {}", e),
    })
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_repository(&self) -> Result<RepositoryInfo, ForgeError> {
        let url = format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo);
        let response = self.send(self.client.get(&url)).await?;
        let repo: GitHubRepository = self.handle_response(response).await?;

        let default_branch =
            BranchName::new(repo.default_branch).map_err(|e| ForgeError::ApiError {
                status: 200,
                message: format!("repository reports an invalid default branch: {}", e),
            })?;

        Ok(RepositoryInfo {
            full_name: repo.full_name,
            default_branch,
        })
    }

    async fn get_branch_head(&self, branch: &BranchName) -> Result<Oid, ForgeError> {
        let url = self.repo_url(&format!("git/ref/heads/{}", branch));
        let response = self.send(self.client.get(&url)).await?;
        let reference: GitHubRef = self.handle_response(response).await?;
        Ok(reference.object.sha)
    }

    async fn get_commit(&self, sha: &Oid) -> Result<CommitInfo, ForgeError> {
        let url = self.repo_url(&format!("git/commits/{}", sha));
        let response = self.send(self.client.get(&url)).await?;
        let commit: GitHubCommit = self.handle_response(response).await?;
        Ok(CommitInfo {
            sha: commit.sha,
            tree: commit.tree.sha,
        })
    }

    #[instrument(skip(self), fields(branch = %branch))]
    async fn get_file(
        &self,
        path: &str,
        branch: &BranchName,
    ) -> Result<Option<RemoteFile>, ForgeError> {
        let url = self.contents_url(path)?;
        let request = self.client.get(url).query(&[("ref", branch.as_str())]);
        let response = self.send(request).await?;
        let contents = absent_on_not_found(
            self.handle_response::<GitHubContents>(response).await,
        )?;

        let item = match contents {
            None => return Ok(None),
            Some(GitHubContents::Directory(_)) => {
                return Err(ForgeError::ApiError {
                    status: 200,
                    message: format!("'{}' is a directory, not a file", path),
                })
            }
            Some(GitHubContents::File(item)) => item,
        };

        let content = match (item.encoding.as_deref(), item.content.as_deref()) {
            (Some("base64"), Some(encoded)) => decode_base64(encoded)?,
            // Files over 1 MB come back without inline content; read the blob.
            _ => {
                let url = self.repo_url(&format!("git/blobs/{}", item.sha));
                let response = self.send(self.client.get(&url)).await?;
                let blob: GitHubBlob = self.handle_response(response).await?;
                decode_base64(&blob.content)?
            }
        };

        Ok(Some(RemoteFile {
            path: item.path,
            sha: item.sha,
            content,
        }))
    }

    #[instrument(skip(self), fields(branch = %branch))]
    async fn list_directory(
        &self,
        path: &str,
        branch: &BranchName,
    ) -> Result<Option<Vec<DirectoryEntry>>, ForgeError> {
        let url = self.contents_url(path)?;
        let request = self.client.get(url).query(&[("ref", branch.as_str())]);
        let response = self.send(request).await?;
        let contents = absent_on_not_found(
            self.handle_response::<GitHubContents>(response).await,
        )?;

        match contents {
            None => Ok(None),
            Some(GitHubContents::File(_)) => Err(ForgeError::ApiError {
                status: 200,
                message: format!("'{}' is a file, not a directory", path),
            }),
            Some(GitHubContents::Directory(items)) => Ok(Some(
                items
                    .into_iter()
                    .map(|item| DirectoryEntry {
                        kind: if item.kind == "dir" {
                            EntryKind::Directory
                        } else {
                            EntryKind::File
                        },
                        name: item.name,
                        path: item.path,
                        sha: item.sha,
                    })
                    .collect(),
            )),
        }
    }

    #[instrument(skip(self), fields(branch = %branch, sha = %sha))]
    async fn create_ref(&self, branch: &BranchName, sha: &Oid) -> Result<(), ForgeError> {
        let url = self.repo_url("git/refs");
        let refname = RefName::for_branch(branch);
        let body = CreateRefBody {
            ref_name: refname.as_str(),
            sha: sha.as_str(),
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let _created: GitHubRef = self.handle_response(response).await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(path = %request.path, branch = %request.branch))]
    async fn put_file(&self, request: PutFileRequest) -> Result<FileCommit, ForgeError> {
        let url = self.contents_url(&request.path)?;
        let encoded = BASE64.encode(&request.content);
        let body = PutFileBody {
            message: &request.message,
            content: &encoded,
            branch: request.branch.as_str(),
            sha: request.sha.as_ref().map(|s| s.as_str()),
        };

        let response = self.send(self.client.put(url).json(&body)).await?;
        let result: GitHubPutFileResponse = self.handle_response(response).await?;
        Ok(FileCommit {
            path: result.content.path,
            content_sha: result.content.sha,
            commit_sha: result.commit.sha,
        })
    }

    #[instrument(skip(self, content), fields(size = content.len()))]
    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError> {
        let url = self.repo_url("git/blobs");
        let encoded = BASE64.encode(content);
        let body = CreateBlobBody {
            content: &encoded,
            encoding: "base64",
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let created: GitHubSha = self.handle_response(response).await?;
        Ok(created.sha)
    }

    #[instrument(skip(self, entries), fields(base_tree = %base_tree, entries = entries.len()))]
    async fn create_tree(
        &self,
        base_tree: &Oid,
        entries: &[TreeEntry],
    ) -> Result<Oid, ForgeError> {
        let url = self.repo_url("git/trees");
        let body = CreateTreeBody {
            base_tree: base_tree.as_str(),
            tree: entries
                .iter()
                .map(|entry| TreeEntryBody {
                    path: &entry.path,
                    mode: entry.mode.as_str(),
                    kind: "blob",
                    sha: entry.blob.as_ref().map(|s| s.as_str()),
                })
                .collect(),
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let created: GitHubSha = self.handle_response(response).await?;
        Ok(created.sha)
    }

    #[instrument(skip(self, request), fields(tree = %request.tree))]
    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError> {
        let url = self.repo_url("git/commits");
        let body = CreateCommitBody {
            message: &request.message,
            tree: request.tree.as_str(),
            parents: request.parents.iter().map(|p| p.as_str()).collect(),
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let created: GitHubSha = self.handle_response(response).await?;
        Ok(created.sha)
    }

    #[instrument(skip(self, request), fields(head = %request.head, base = %request.base))]
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url("pulls");
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
            draft: request.draft,
        };

        let response = self.send(self.client.post(&url).json(&body)).await?;
        let pr: GitHubPullRequest = self.handle_response(response).await?;
        Ok(pr.into())
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: &'a str,
    sha: &'a str,
}

/// Request body for the contents PUT endpoint.
#[derive(Serialize)]
struct PutFileBody<'a> {
    message: &'a str,
    content: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: Vec<TreeEntryBody<'a>>,
}

/// One tree entry. A `null` sha deletes the path.
#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    sha: Option<&'a str>,
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    draft: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct GitHubRepository {
    full_name: String,
    default_branch: String,
}

#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubSha {
    sha: Oid,
}

#[derive(Deserialize)]
struct GitHubCommit {
    sha: Oid,
    tree: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubBlob {
    content: String,
}

/// The contents endpoint returns an object for a file and an array for a
/// directory.
#[derive(Deserialize)]
#[serde(untagged)]
enum GitHubContents {
    Directory(Vec<GitHubContentItem>),
    File(GitHubContentItem),
}

#[derive(Deserialize)]
struct GitHubContentItem {
    #[serde(rename = "type")]
    kind: String,
    name: String,
    path: String,
    sha: Oid,
    content: Option<String>,
    encoding: Option<String>,
}

#[derive(Deserialize)]
struct GitHubPutFileResponse {
    content: GitHubContentRef,
    commit: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubContentRef {
    path: String,
    sha: Oid,
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    #[serde(default)]
    draft: bool,
    head: GitHubBranchRef,
    base: GitHubBranchRef,
    title: String,
    body: Option<String>,
}

/// GitHub ref (head/base) format.
#[derive(Deserialize)]
struct GitHubBranchRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            url: pr.html_url,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            title: pr.title,
            body: pr.body,
            is_draft: pr.draft,
        }
    }
}
