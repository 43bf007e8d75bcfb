//! forge::traits
//!
//! Forge trait definition for interacting with remote hosting services.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is a remote call.
//! It covers two API families:
//!
//! - Git data: refs, blobs, trees, commits and comparisons. Ref names are
//!   passed without the leading `refs/` (`heads/main`, `meta/_draftwork`).
//! - Pull requests and commit statuses.
//!
//! Nothing in this module retries. Callers decide which failures to absorb.
//!
//! # Example
//!
//! ```ignore
//! use draftwork::forge::{Forge, ForgeError, CreatePrRequest};
//!
//! async fn open(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let pr = forge.create_pr(CreatePrRequest {
//!         head: "cms/posts/hello".to_string(),
//!         base: "main".to_string(),
//!         title: "Create Post “hello”".to_string(),
//!         body: Some("Automatically generated by Draftwork".to_string()),
//!     }).await?;
//!     println!("Created PR #{}: {}", pr.number, pr.url);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Oid;

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error)]
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

    /// A ref update was not a fast-forward, or the ref already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The pull request cannot be merged as-is (HTTP 405).
    #[error("merge conflict: {0}")]
    MergeConflict(String),

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

    /// The operation is not supported by this forge.
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

impl ForgeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ForgeError::NotFound(_))
    }
}

/// Authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeUser {
    pub login: String,
    pub name: Option<String>,
}

/// A ref as returned by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefInfo {
    /// Full ref name, e.g. `refs/heads/cms/posts/a`
    pub name: String,
    pub sha: Oid,
}

/// A file read from a tree at a given ref.
#[derive(Debug, Clone)]
pub struct FileContent {
    /// Blob sha
    pub sha: Oid,
    /// Decoded bytes
    pub content: Vec<u8>,
}

/// Kind of tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Blob,
    Tree,
}

/// One change applied on top of a base tree.
///
/// `sha: None` deletes `path` and is sent as `"sha": null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeChange {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub sha: Option<Oid>,
}

impl TreeChange {
    pub fn is_deletion(&self) -> bool {
        self.sha.is_none()
    }
}

/// Commit author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub date: chrono::DateTime<chrono::Utc>,
}

/// A commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: Oid,
    pub tree: Oid,
    /// Parent shas, first parent first
    pub parents: Vec<Oid>,
    pub message: String,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
}

/// Request to create a commit.
#[derive(Debug, Clone)]
pub struct CreateCommitRequest {
    pub message: String,
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub author: Option<Signature>,
    pub committer: Option<Signature>,
}

/// Status of a file in a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Removed,
    Modified,
    Renamed,
    /// Anything else the API reports (copied, changed, unchanged)
    #[serde(other)]
    Other,
}

/// One file entry of a comparison or commit diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub filename: String,
    pub status: FileStatus,
    /// Blob sha after the change; absent for removals
    pub sha: Option<Oid>,
    /// Original path for renames
    pub previous_filename: Option<String>,
}

/// Result of comparing two commits.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Merge base of the two commits
    pub base_commit: Commit,
    /// Commits reachable from head but not base, oldest first
    pub commits: Vec<Commit>,
    /// Net file changes between base and head
    pub files: Vec<ChangedFile>,
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Head branch name; `owner:branch` for a fork head
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: Option<String>,
}

/// Request to update a pull request.
#[derive(Debug, Clone, Default)]
pub struct UpdatePrRequest {
    /// PR number
    pub number: u64,
    /// New title (if changing)
    pub title: Option<String>,
    /// New body (if changing)
    pub body: Option<String>,
    /// New state (only `Open` or `Closed` are meaningful)
    pub state: Option<PrState>,
}

/// Pull request information returned from the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
    /// PR state (open, closed, merged)
    pub state: PrState,
    /// Head branch name
    pub head: String,
    /// Head commit sha
    pub head_sha: Oid,
    /// Full name of the repository holding the head branch
    pub head_repo: Option<String>,
    /// Base branch name
    pub base: String,
    /// PR title
    pub title: String,
    pub body: Option<String>,
}

/// PR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    /// PR is open and awaiting review/merge
    Open,
    /// PR is closed without being merged
    Closed,
    /// PR has been merged
    Merged,
}

impl std::fmt::Display for PrState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrState::Open => write!(f, "open"),
            PrState::Closed => write!(f, "closed"),
            PrState::Merged => write!(f, "merged"),
        }
    }
}

/// Filter for listing pull requests.
#[derive(Debug, Clone, Default)]
pub struct ListPullsOpts {
    /// `None` lists open PRs only
    pub state: Option<PrState>,
    pub base: Option<String>,
    /// `owner:branch`
    pub head: Option<String>,
}

/// Merge method for merging a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Create a merge commit
    #[default]
    Merge,
    /// Squash all commits and merge
    Squash,
    /// Rebase commits onto base branch
    Rebase,
}

impl MergeMethod {
    /// Parse a merge method name as used in config files.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "merge" => Some(MergeMethod::Merge),
            "squash" => Some(MergeMethod::Squash),
            "rebase" => Some(MergeMethod::Rebase),
            _ => None,
        }
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMethod::Merge => write!(f, "merge"),
            MergeMethod::Squash => write!(f, "squash"),
            MergeMethod::Rebase => write!(f, "rebase"),
        }
    }
}

/// Request to merge a pull request.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub method: MergeMethod,
    /// Expected head sha; the merge is refused when the head moved
    pub sha: Option<Oid>,
    pub commit_message: Option<String>,
}

/// A commit status (CI check, deploy preview).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStatus {
    pub context: String,
    pub state: String,
    pub target_url: Option<String>,
}

/// The Forge trait for interacting with remote hosting services.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: missing or insufficient credentials
/// - `NotFound`: resource doesn't exist
/// - `Conflict`: ref creation or non-force update lost a race
/// - `MergeConflict`: merge refused, a forced merge may be attempted
/// - `ApiError`: display error message to user
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github", "mock").
    fn name(&self) -> &'static str;

    /// Full name of the repository this forge talks to (`owner/repo`).
    fn full_name(&self) -> String;

    /// The authenticated user.
    async fn current_user(&self) -> Result<ForgeUser, ForgeError>;

    // Git data

    /// Resolve a ref (`heads/main`) to the commit it points at.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ref doesn't exist
    async fn get_ref(&self, name: &str) -> Result<Oid, ForgeError>;

    /// Create a ref.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the ref already exists
    async fn create_ref(&self, name: &str, sha: &Oid) -> Result<(), ForgeError>;

    /// Move a ref. Without `force` only fast-forwards are accepted.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ref doesn't exist
    /// - `Conflict` if `force` is false and the update is not a fast-forward
    async fn update_ref(&self, name: &str, sha: &Oid, force: bool) -> Result<(), ForgeError>;

    /// Delete a ref.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ref doesn't exist
    async fn delete_ref(&self, name: &str) -> Result<(), ForgeError>;

    /// List refs whose name starts with `prefix` (`heads/cms/`).
    async fn list_refs(&self, prefix: &str) -> Result<Vec<RefInfo>, ForgeError>;

    /// Read a blob's bytes by sha.
    async fn get_blob(&self, sha: &Oid) -> Result<Vec<u8>, ForgeError>;

    /// Read a file at `path` in the tree of `git_ref`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ref or file doesn't exist
    async fn get_file(&self, path: &str, git_ref: &str) -> Result<FileContent, ForgeError>;

    /// Create a blob from base64-encoded content.
    async fn create_blob(&self, content_base64: &str) -> Result<Oid, ForgeError>;

    /// Create a tree by applying `changes` on top of `base`.
    async fn create_tree(
        &self,
        base: Option<&Oid>,
        changes: Vec<TreeChange>,
    ) -> Result<Oid, ForgeError>;

    async fn get_commit(&self, sha: &Oid) -> Result<Commit, ForgeError>;

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Commit, ForgeError>;

    /// Compare two commits; `head` may be written `owner:sha` for forks.
    async fn compare(&self, base: &str, head: &str) -> Result<Comparison, ForgeError>;

    // Pull requests

    /// Create a new pull request.
    ///
    /// # Errors
    ///
    /// - `ApiError` with status 422 if validation fails (e.g., head doesn't exist)
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;

    /// Update an existing pull request.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the PR doesn't exist
    async fn update_pr(&self, request: UpdatePrRequest) -> Result<PullRequest, ForgeError>;

    /// Get a pull request by number.
    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError>;

    /// Find an open pull request by head (`owner:branch`).
    ///
    /// Used for idempotent PR creation when resuming a migration.
    async fn find_pr_by_head(&self, head: &str) -> Result<Option<PullRequest>, ForgeError>;

    async fn list_prs(&self, opts: ListPullsOpts) -> Result<Vec<PullRequest>, ForgeError>;

    /// Merge a pull request.
    ///
    /// # Errors
    ///
    /// - `MergeConflict` if the forge refuses the merge (HTTP 405)
    /// - `ApiError` with status 409 if the head moved past `request.sha`
    async fn merge_pr(&self, number: u64, request: MergeRequest) -> Result<(), ForgeError>;

    // Statuses

    async fn get_statuses(&self, sha: &Oid) -> Result<Vec<CommitStatus>, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_state_display() {
        assert_eq!(format!("{}", PrState::Open), "open");
        assert_eq!(format!("{}", PrState::Closed), "closed");
        assert_eq!(format!("{}", PrState::Merged), "merged");
    }

    #[test]
    fn merge_method_parse_and_display() {
        for m in [MergeMethod::Merge, MergeMethod::Squash, MergeMethod::Rebase] {
            assert_eq!(MergeMethod::parse(&m.to_string()), Some(m));
        }
        assert_eq!(MergeMethod::parse("fast-forward"), None);
    }

    #[test]
    fn merge_method_default_is_merge() {
        assert_eq!(MergeMethod::default(), MergeMethod::Merge);
    }

    #[test]
    fn tree_change_deletion_serializes_null_sha() {
        let change = TreeChange {
            path: "content/a.md".into(),
            mode: "100644".into(),
            kind: EntryKind::Blob,
            sha: None,
        };
        assert!(change.is_deletion());
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["sha"], serde_json::Value::Null);
        assert_eq!(json["type"], "blob");
    }

    #[test]
    fn file_status_unknown_maps_to_other() {
        let status: FileStatus = serde_json::from_str("\"copied\"").unwrap();
        assert_eq!(status, FileStatus::Other);
        let status: FileStatus = serde_json::from_str("\"renamed\"").unwrap();
        assert_eq!(status, FileStatus::Renamed);
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!("{}", ForgeError::Conflict("heads/main".into())),
            "conflict: heads/main"
        );
        assert_eq!(
            format!("{}", ForgeError::MergeConflict("PR #3".into())),
            "merge conflict: PR #3"
        );
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 422,
                    message: "Validation failed".into()
                }
            ),
            "API error: 422 - Validation failed"
        );
        assert!(ForgeError::NotFound("x".into()).is_not_found());
        assert!(!ForgeError::RateLimited.is_not_found());
    }
}
