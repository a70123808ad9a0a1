//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps a small content-addressed repository in memory:
//! blobs, flat trees (path → blob), commits and branch refs. Object ids are
//! SHA-256 digests truncated to Git's 40-character width, so identical
//! content always gets the same id. It enforces the host rules the
//! publishing engine depends on (stale content hashes, existing refs, empty
//! pull requests) and allows configuring failure scenarios.
//!
//! # Example
//!
//! ```
//! use govpub::core::types::BranchName;
//! use govpub::forge::mock::MockForge;
//! use govpub::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_files(&[("schemas/a.json", b"{}\n".as_slice())]);
//! let main = BranchName::new("main").unwrap();
//!
//! let file = forge.get_file("schemas/a.json", &main).await.unwrap().unwrap();
//! assert_eq!(file.content, b"{}\n".to_vec());
//! assert!(forge.get_file("schemas/b.json", &main).await.unwrap().is_none());
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{
    CommitInfo, CreateCommitRequest, CreatePrRequest, DirectoryEntry, EntryKind, FileCommit,
    Forge, ForgeError, PullRequest, PutFileRequest, RemoteFile, RepositoryInfo, TreeEntry,
};
use crate::core::types::{BranchName, Oid};

/// Flat tree: full path → blob id.
type Tree = BTreeMap<String, Oid>;

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// A stored commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub message: String,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    default_branch: BranchName,
    blobs: HashMap<Oid, Vec<u8>>,
    trees: HashMap<Oid, Tree>,
    commits: HashMap<Oid, MockCommit>,
    /// Branch name → commit.
    refs: BTreeMap<String, Oid>,
    prs: Vec<PullRequest>,
    /// Bumped per commit so equal trees still get distinct commits.
    sequence: u64,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetRepository(ForgeError),
    GetBranchHead(ForgeError),
    GetCommit(ForgeError),
    GetFile(ForgeError),
    ListDirectory(ForgeError),
    CreateRef(ForgeError),
    PutFile(ForgeError),
    CreateBlob(ForgeError),
    CreateTree(ForgeError),
    CreateCommit(ForgeError),
    CreatePr(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRepository,
    GetBranchHead { branch: String },
    GetCommit { sha: Oid },
    GetFile { path: String, branch: String },
    ListDirectory { path: String, branch: String },
    CreateRef { branch: String, sha: Oid },
    PutFile { path: String, branch: String, sha: Option<Oid> },
    CreateBlob { size: usize },
    CreateTree { base_tree: Oid, paths: Vec<String> },
    CreateCommit { message: String, parents: Vec<Oid> },
    CreatePr { head: String, base: String, title: String },
}

impl MockOperation {
    /// True for operations that change host state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateRef { .. }
                | MockOperation::PutFile { .. }
                | MockOperation::CreateBlob { .. }
                | MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
                | MockOperation::CreatePr { .. }
        )
    }
}

/// Content-addressed id for a typed object.
fn object_id(kind: &str, data: &[u8]) -> Oid {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(data);
    Oid::from_digest(&hasher.finalize())
}

fn tree_id(tree: &Tree) -> Oid {
    let mut serialized = Vec::new();
    for (path, blob) in tree {
        serialized.extend_from_slice(path.as_bytes());
        serialized.push(0);
        serialized.extend_from_slice(blob.as_str().as_bytes());
        serialized.push(b'\n');
    }
    object_id("tree", &serialized)
}

fn unprocessable(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

impl MockForgeInner {
    fn store_blob(&mut self, content: &[u8]) -> Oid {
        let id = object_id("blob", content);
        self.blobs.entry(id.clone()).or_insert_with(|| content.to_vec());
        id
    }

    fn store_tree(&mut self, tree: Tree) -> Oid {
        let id = tree_id(&tree);
        self.trees.entry(id.clone()).or_insert(tree);
        id
    }

    fn store_commit(&mut self, commit: MockCommit) -> Oid {
        self.sequence += 1;
        let mut data = format!("{}\n{}\n", commit.tree, self.sequence);
        for parent in &commit.parents {
            data.push_str(parent.as_str());
            data.push('\n');
        }
        data.push_str(&commit.message);
        let id = object_id("commit", data.as_bytes());
        self.commits.insert(id.clone(), commit);
        id
    }

    fn head_tree(&self, branch: &str) -> Option<&Tree> {
        let head = self.refs.get(branch)?;
        let commit = self.commits.get(head)?;
        self.trees.get(&commit.tree)
    }

    /// Commit `tree` on top of `branch` and move the ref.
    fn commit_on(&mut self, branch: &str, tree: Tree, message: &str) -> Option<Oid> {
        let parent = self.refs.get(branch)?.clone();
        let tree = self.store_tree(tree);
        let commit = self.store_commit(MockCommit {
            tree,
            parents: vec![parent],
            message: message.to_string(),
        });
        self.refs.insert(branch.to_string(), commit.clone());
        Some(commit)
    }
}

impl MockForge {
    /// Create a mock forge whose default branch `main` holds one empty commit.
    pub fn new() -> Self {
        Self::with_default_branch("main")
    }

    /// Create a mock forge with a differently named default branch.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid branch name.
    pub fn with_default_branch(name: &str) -> Self {
        let default_branch = BranchName::new(name).expect("valid default branch name");
        let mut inner = MockForgeInner {
            default_branch: default_branch.clone(),
            blobs: HashMap::new(),
            trees: HashMap::new(),
            commits: HashMap::new(),
            refs: BTreeMap::new(),
            prs: Vec::new(),
            sequence: 0,
            fail_on: None,
            operations: Vec::new(),
        };
        let tree = inner.store_tree(Tree::new());
        let root = inner.store_commit(MockCommit {
            tree,
            parents: Vec::new(),
            message: "Initial commit".to_string(),
        });
        inner.refs.insert(default_branch.to_string(), root);

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Seed the default branch with files in one commit.
    pub fn with_files(self, files: &[(&str, &[u8])]) -> Self {
        {
            let mut inner = self.state();
            let branch = inner.default_branch.to_string();
            let mut tree = inner.head_tree(&branch).cloned().unwrap_or_default();
            for (path, content) in files {
                let blob = inner.store_blob(content);
                tree.insert(path.to_string(), blob);
            }
            inner.commit_on(&branch, tree, "Seed files");
        }
        self
    }

    /// Create another branch at the current default-branch head.
    pub fn with_branch(self, name: &str) -> Self {
        {
            let mut inner = self.state();
            let head = inner.refs.get(inner.default_branch.as_str()).cloned();
            if let Some(head) = head {
                inner.refs.insert(name.to_string(), head);
            }
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use govpub::forge::mock::{MockForge, FailOn};
    /// use govpub::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreatePr(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Configure a failure on a shared handle.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.state().fail_on = Some(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Commit a change straight onto a branch, as another writer would.
    ///
    /// `content: None` deletes the path. Returns the new head, or `None` if
    /// the branch does not exist.
    pub fn advance_branch(&self, branch: &str, path: &str, content: Option<&[u8]>) -> Option<Oid> {
        let mut inner = self.state();
        let mut tree = inner.head_tree(branch)?.clone();
        match content {
            Some(bytes) => {
                let blob = inner.store_blob(bytes);
                tree.insert(path.to_string(), blob);
            }
            None => {
                tree.remove(path);
            }
        }
        inner.commit_on(branch, tree, &format!("Concurrent edit of {}", path))
    }

    /// Read a file's bytes on a branch (for test verification).
    pub fn read_file(&self, branch: &str, path: &str) -> Option<Vec<u8>> {
        let inner = self.state();
        let blob = inner.head_tree(branch)?.get(path)?;
        inner.blobs.get(blob).cloned()
    }

    /// All file paths on a branch, sorted.
    pub fn tree_paths(&self, branch: &str) -> Vec<String> {
        self.state()
            .head_tree(branch)
            .map(|tree| tree.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Look up a stored commit.
    pub fn commit(&self, sha: &Oid) -> Option<MockCommit> {
        self.state().commits.get(sha).cloned()
    }

    /// Current head of a branch.
    pub fn branch_head(&self, branch: &str) -> Option<Oid> {
        self.state().refs.get(branch).cloned()
    }

    /// All branch names, sorted.
    pub fn branches(&self) -> Vec<String> {
        self.state().refs.keys().cloned().collect()
    }

    /// All pull requests in creation order.
    pub fn pull_requests(&self) -> Vec<PullRequest> {
        self.state().prs.clone()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.state();
        let err = match &inner.fail_on {
            Some(FailOn::GetRepository(e)) if expected == "get_repository" => e,
            Some(FailOn::GetBranchHead(e)) if expected == "get_branch_head" => e,
            Some(FailOn::GetCommit(e)) if expected == "get_commit" => e,
            Some(FailOn::GetFile(e)) if expected == "get_file" => e,
            Some(FailOn::ListDirectory(e)) if expected == "list_directory" => e,
            Some(FailOn::CreateRef(e)) if expected == "create_ref" => e,
            Some(FailOn::PutFile(e)) if expected == "put_file" => e,
            Some(FailOn::CreateBlob(e)) if expected == "create_blob" => e,
            Some(FailOn::CreateTree(e)) if expected == "create_tree" => e,
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => e,
            Some(FailOn::CreatePr(e)) if expected == "create_pr" => e,
            _ => return Ok(()),
        };
        Err(err.clone())
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_repository(&self) -> Result<RepositoryInfo, ForgeError> {
        self.record(MockOperation::GetRepository);
        self.check_fail("get_repository")?;

        Ok(RepositoryInfo {
            full_name: "mock/repo".to_string(),
            default_branch: self.state().default_branch.clone(),
        })
    }

    async fn get_branch_head(&self, branch: &BranchName) -> Result<Oid, ForgeError> {
        self.record(MockOperation::GetBranchHead {
            branch: branch.to_string(),
        });
        self.check_fail("get_branch_head")?;

        self.branch_head(branch.as_str())
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", branch)))
    }

    async fn get_commit(&self, sha: &Oid) -> Result<CommitInfo, ForgeError> {
        self.record(MockOperation::GetCommit { sha: sha.clone() });
        self.check_fail("get_commit")?;

        self.commit(sha)
            .map(|commit| CommitInfo {
                sha: sha.clone(),
                tree: commit.tree,
            })
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", sha)))
    }

    async fn get_file(
        &self,
        path: &str,
        branch: &BranchName,
    ) -> Result<Option<RemoteFile>, ForgeError> {
        self.record(MockOperation::GetFile {
            path: path.to_string(),
            branch: branch.to_string(),
        });
        self.check_fail("get_file")?;

        let inner = self.state();
        let file = inner
            .head_tree(branch.as_str())
            .and_then(|tree| tree.get(path))
            .and_then(|blob| {
                inner.blobs.get(blob).map(|content| RemoteFile {
                    path: path.to_string(),
                    sha: blob.clone(),
                    content: content.clone(),
                })
            });
        Ok(file)
    }

    async fn list_directory(
        &self,
        path: &str,
        branch: &BranchName,
    ) -> Result<Option<Vec<DirectoryEntry>>, ForgeError> {
        self.record(MockOperation::ListDirectory {
            path: path.to_string(),
            branch: branch.to_string(),
        });
        self.check_fail("list_directory")?;

        let inner = self.state();
        let Some(tree) = inner.head_tree(branch.as_str()) else {
            return Ok(None);
        };

        let folder = path.trim_matches('/');
        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{}/", folder)
        };

        let mut entries = Vec::new();
        let mut seen_dirs = BTreeSet::new();
        for (full_path, blob) in tree.range(prefix.clone()..) {
            let Some(rest) = full_path.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                None => entries.push(DirectoryEntry {
                    name: rest.to_string(),
                    path: full_path.clone(),
                    sha: blob.clone(),
                    kind: EntryKind::File,
                }),
                Some((dir, _)) => {
                    if seen_dirs.insert(dir.to_string()) {
                        let dir_path = format!("{}{}", prefix, dir);
                        entries.push(DirectoryEntry {
                            name: dir.to_string(),
                            sha: object_id("dir", dir_path.as_bytes()),
                            path: dir_path,
                            kind: EntryKind::Directory,
                        });
                    }
                }
            }
        }

        if entries.is_empty() && !folder.is_empty() {
            return Ok(None);
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(entries))
    }

    async fn create_ref(&self, branch: &BranchName, sha: &Oid) -> Result<(), ForgeError> {
        self.record(MockOperation::CreateRef {
            branch: branch.to_string(),
            sha: sha.clone(),
        });
        self.check_fail("create_ref")?;

        let mut inner = self.state();
        if inner.refs.contains_key(branch.as_str()) {
            return Err(ForgeError::Conflict("Reference already exists".to_string()));
        }
        if !inner.commits.contains_key(sha) {
            return Err(unprocessable("Object does not exist"));
        }
        inner.refs.insert(branch.to_string(), sha.clone());
        Ok(())
    }

    async fn put_file(&self, request: PutFileRequest) -> Result<FileCommit, ForgeError> {
        self.record(MockOperation::PutFile {
            path: request.path.clone(),
            branch: request.branch.to_string(),
            sha: request.sha.clone(),
        });
        self.check_fail("put_file")?;

        let mut inner = self.state();
        let branch = request.branch.as_str();
        let mut tree = inner
            .head_tree(branch)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", branch)))?;

        match (tree.get(&request.path), &request.sha) {
            (Some(_), None) => {
                return Err(ForgeError::Conflict(
                    "Invalid request.\n\n\"sha\" wasn't supplied.".to_string(),
                ))
            }
            (Some(current), Some(expected)) if current != expected => {
                return Err(ForgeError::Conflict(format!(
                    "{} does not match {}",
                    request.path, expected
                )))
            }
            (None, Some(expected)) => {
                return Err(ForgeError::Conflict(format!(
                    "{} does not match {}: file does not exist",
                    request.path, expected
                )))
            }
            _ => {}
        }

        let blob = inner.store_blob(&request.content);
        tree.insert(request.path.clone(), blob.clone());
        let commit = inner
            .commit_on(branch, tree, &request.message)
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", branch)))?;

        Ok(FileCommit {
            path: request.path,
            content_sha: blob,
            commit_sha: commit,
        })
    }

    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateBlob {
            size: content.len(),
        });
        self.check_fail("create_blob")?;

        Ok(self.state().store_blob(content))
    }

    async fn create_tree(
        &self,
        base_tree: &Oid,
        entries: &[TreeEntry],
    ) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateTree {
            base_tree: base_tree.clone(),
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        });
        self.check_fail("create_tree")?;

        let mut inner = self.state();
        let mut tree = inner
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| unprocessable("base_tree is not a valid tree oid"))?;

        for entry in entries {
            match &entry.blob {
                Some(blob) => {
                    if !inner.blobs.contains_key(blob) {
                        return Err(unprocessable(format!("tree.sha {} is not a valid blob", blob)));
                    }
                    tree.insert(entry.path.clone(), blob.clone());
                }
                None => {
                    if tree.remove(&entry.path).is_none() {
                        return Err(unprocessable(format!(
                            "tree.path {} does not exist in base_tree",
                            entry.path
                        )));
                    }
                }
            }
        }

        Ok(inner.store_tree(tree))
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateCommit {
            message: request.message.clone(),
            parents: request.parents.clone(),
        });
        self.check_fail("create_commit")?;

        let mut inner = self.state();
        if !inner.trees.contains_key(&request.tree) {
            return Err(unprocessable("Tree SHA does not exist"));
        }
        if let Some(missing) = request.parents.iter().find(|p| !inner.commits.contains_key(*p)) {
            return Err(unprocessable(format!("Parent SHA {} does not exist", missing)));
        }

        Ok(inner.store_commit(MockCommit {
            tree: request.tree,
            parents: request.parents,
            message: request.message,
        }))
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        });
        self.check_fail("create_pr")?;

        let mut inner = self.state();
        let head = inner
            .refs
            .get(&request.head)
            .cloned()
            .ok_or_else(|| unprocessable("Validation Failed: head invalid"))?;
        let base = inner
            .refs
            .get(&request.base)
            .cloned()
            .ok_or_else(|| unprocessable("Validation Failed: base invalid"))?;
        if head == base {
            return Err(unprocessable(format!(
                "No commits between {} and {}",
                request.base, request.head
            )));
        }

        let number = inner.prs.len() as u64 + 1;
        let pr = PullRequest {
            number,
            url: format!("https://github.com/mock/repo/pull/{}", number),
            head: request.head,
            base: request.base,
            title: request.title,
            body: request.body,
            is_draft: request.draft,
        };
        inner.prs.push(pr.clone());
        Ok(pr)
    }
}
