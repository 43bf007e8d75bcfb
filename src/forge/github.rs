//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! Git data (refs, blobs, trees, commits) goes through the `git/*`
//! endpoints, pull requests through `pulls/*`, and commit statuses through
//! the combined status endpoint. Every call is a single request; there is
//! no retry and no pagination beyond one page of 100 items.
//!
//! # Error Mapping
//!
//! - 401/403 become `AuthFailed` (403 includes the permissions GitHub asks for)
//! - 404 becomes `NotFound`, 429 becomes `RateLimited`
//! - 422 on ref endpoints becomes `Conflict`, or `NotFound` when the ref
//!   does not exist
//! - 405 on merge becomes `MergeConflict`
//!
//! # Example
//!
//! ```ignore
//! use draftwork::forge::github::GitHubForge;
//! use draftwork::forge::Forge;
//!
//! let forge = GitHubForge::new(token, "octocat", "blog");
//! let main = forge.get_ref("heads/main").await?;
//! ```

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{
    ChangedFile, Commit, CommitStatus, Comparison, CreateCommitRequest, CreatePrRequest,
    FileContent, FileStatus, Forge, ForgeError, ForgeUser, ListPullsOpts, MergeRequest, PrState,
    PullRequest, RefInfo, Signature, TreeChange, UpdatePrRequest,
};
use crate::core::types::Oid;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "draftwork";

/// Which family of endpoint a request targets; selects error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Refs,
    Merge,
    Other,
}

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
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
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge for `owner/repo` on github.com.
    pub fn new(token: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_API_BASE)
    }

    /// Create a GitHub forge with a custom API base URL (GitHub Enterprise, tests).
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

    /// Create a GitHub forge from a remote URL or `owner/repo`.
    ///
    /// # Example
    ///
    /// ```
    /// use draftwork::forge::github::GitHubForge;
    ///
    /// let forge = GitHubForge::from_remote_url("git@github.com:owner/repo.git", "token");
    /// assert!(forge.is_some());
    /// ```
    pub fn from_remote_url(url: &str, token: impl Into<String>) -> Option<Self> {
        let (owner, repo) = parse_github_url(url)?;
        Some(Self::new(token, owner, repo))
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
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, bearer);
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

    async fn send(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Send and decode a JSON response.
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        endpoint: Endpoint,
    ) -> Result<T, ForgeError> {
        let response = self.send(request).await?;
        self.handle_response(response, endpoint).await
    }

    /// Send and discard the response body.
    async fn execute(&self, request: RequestBuilder, endpoint: Endpoint) -> Result<(), ForgeError> {
        let response = self.send(request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            self.handle_error_response(response, status, endpoint).await
        }
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: Endpoint,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status, endpoint).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
        endpoint: Endpoint,
    ) -> Result<T, ForgeError> {
        // GitHub Apps use X-Accepted-GitHub-Permissions, classic OAuth uses X-Accepted-OAuth-Scopes.
        let headers = response.headers();
        let required_permissions = headers
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let required_scopes = headers
            .get("X-Accepted-OAuth-Scopes")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                } else if let Some(scopes) = required_scopes.filter(|s| !s.is_empty()) {
                    err_msg.push_str(&format!(" [required scopes: {}]", scopes));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY if endpoint == Endpoint::Refs => {
                if message.to_lowercase().contains("does not exist") {
                    ForgeError::NotFound(message)
                } else {
                    ForgeError::Conflict(message)
                }
            }
            StatusCode::METHOD_NOT_ALLOWED if endpoint == Endpoint::Merge => {
                ForgeError::MergeConflict(message)
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
        })
    }
}

fn decode_base64(content: &str) -> Result<Vec<u8>, ForgeError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| ForgeError::ApiError {
            status: 200,
            message: format!("invalid base64 content: {e}"),
        })
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    async fn current_user(&self) -> Result<ForgeUser, ForgeError> {
        let url = format!("{}/user", self.api_base);
        self.fetch(self.client.get(url), Endpoint::Other).await
    }

    async fn get_ref(&self, name: &str) -> Result<Oid, ForgeError> {
        let url = self.repo_url(&format!("git/ref/{name}"));
        let git_ref: GitHubRef = self.fetch(self.client.get(url), Endpoint::Refs).await?;
        Ok(git_ref.object.sha)
    }

    async fn create_ref(&self, name: &str, sha: &Oid) -> Result<(), ForgeError> {
        let body = CreateRefBody {
            ref_name: format!("refs/{name}"),
            sha,
        };
        let request = self.client.post(self.repo_url("git/refs")).json(&body);
        self.execute(request, Endpoint::Refs).await
    }

    async fn update_ref(&self, name: &str, sha: &Oid, force: bool) -> Result<(), ForgeError> {
        let url = self.repo_url(&format!("git/refs/{name}"));
        let request = self.client.patch(url).json(&UpdateRefBody { sha, force });
        self.execute(request, Endpoint::Refs).await
    }

    async fn delete_ref(&self, name: &str) -> Result<(), ForgeError> {
        let url = self.repo_url(&format!("git/refs/{name}"));
        self.execute(self.client.delete(url), Endpoint::Refs).await
    }

    async fn list_refs(&self, prefix: &str) -> Result<Vec<RefInfo>, ForgeError> {
        let url = self.repo_url(&format!(
            "git/matching-refs/{}",
            prefix.trim_end_matches('/')
        ));
        let refs: Vec<GitHubRef> = self.fetch(self.client.get(url), Endpoint::Refs).await?;
        let full_prefix = format!("refs/{prefix}");
        Ok(refs
            .into_iter()
            .filter(|r| r.ref_name.starts_with(&full_prefix))
            .map(|r| RefInfo {
                name: r.ref_name,
                sha: r.object.sha,
            })
            .collect())
    }

    async fn get_blob(&self, sha: &Oid) -> Result<Vec<u8>, ForgeError> {
        let url = self.repo_url(&format!("git/blobs/{sha}"));
        let blob: GitHubBlob = self.fetch(self.client.get(url), Endpoint::Other).await?;
        decode_base64(&blob.content)
    }

    async fn get_file(&self, path: &str, git_ref: &str) -> Result<FileContent, ForgeError> {
        let url = self.repo_url(&format!("contents/{}", path.trim_start_matches('/')));
        let request = self.client.get(url).query(&[("ref", git_ref)]);
        let file: GitHubContent = self.fetch(request, Endpoint::Other).await?;
        // Files above 1 MB come back without inline content.
        let content = match file.content.as_deref() {
            Some(c) if !c.is_empty() && file.encoding.as_deref() == Some("base64") => {
                decode_base64(c)?
            }
            _ => self.get_blob(&file.sha).await?,
        };
        Ok(FileContent {
            sha: file.sha,
            content,
        })
    }

    async fn create_blob(&self, content_base64: &str) -> Result<Oid, ForgeError> {
        let body = CreateBlobBody {
            content: content_base64,
            encoding: "base64",
        };
        let request = self.client.post(self.repo_url("git/blobs")).json(&body);
        let created: GitHubSha = self.fetch(request, Endpoint::Other).await?;
        Ok(created.sha)
    }

    async fn create_tree(
        &self,
        base: Option<&Oid>,
        changes: Vec<TreeChange>,
    ) -> Result<Oid, ForgeError> {
        let body = CreateTreeBody {
            base_tree: base,
            tree: &changes,
        };
        let request = self.client.post(self.repo_url("git/trees")).json(&body);
        let created: GitHubSha = self.fetch(request, Endpoint::Other).await?;
        Ok(created.sha)
    }

    async fn get_commit(&self, sha: &Oid) -> Result<Commit, ForgeError> {
        let url = self.repo_url(&format!("git/commits/{sha}"));
        let commit: GitHubGitCommit = self.fetch(self.client.get(url), Endpoint::Other).await?;
        Ok(commit.into())
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Commit, ForgeError> {
        let body = CreateCommitBody {
            message: &request.message,
            tree: &request.tree,
            parents: &request.parents,
            author: request.author.as_ref(),
            committer: request.committer.as_ref(),
        };
        let http = self.client.post(self.repo_url("git/commits")).json(&body);
        let commit: GitHubGitCommit = self.fetch(http, Endpoint::Other).await?;
        Ok(commit.into())
    }

    async fn compare(&self, base: &str, head: &str) -> Result<Comparison, ForgeError> {
        let url = self.repo_url(&format!("compare/{base}...{head}"));
        let cmp: GitHubComparison = self.fetch(self.client.get(url), Endpoint::Other).await?;
        Ok(Comparison {
            base_commit: cmp.merge_base_commit.into(),
            commits: cmp.commits.into_iter().map(Into::into).collect(),
            files: cmp.files.into_iter().map(Into::into).collect(),
        })
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
        };
        let http = self.client.post(self.repo_url("pulls")).json(&body);
        let pr: GitHubPullRequest = self.fetch(http, Endpoint::Other).await?;
        pr.try_into()
    }

    async fn update_pr(&self, request: UpdatePrRequest) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(&format!("pulls/{}", request.number));
        let body = UpdatePrBody {
            title: request.title.as_deref(),
            body: request.body.as_deref(),
            state: request.state.map(|s| match s {
                PrState::Open => "open",
                PrState::Closed | PrState::Merged => "closed",
            }),
        };
        let pr: GitHubPullRequest = self
            .fetch(self.client.patch(url).json(&body), Endpoint::Other)
            .await?;
        pr.try_into()
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError> {
        let url = self.repo_url(&format!("pulls/{}", number));
        let pr: GitHubPullRequest = self.fetch(self.client.get(url), Endpoint::Other).await?;
        pr.try_into()
    }

    async fn find_pr_by_head(&self, head: &str) -> Result<Option<PullRequest>, ForgeError> {
        // GitHub API requires owner:branch format for cross-fork PRs
        let head = if head.contains(':') {
            head.to_string()
        } else {
            format!("{}:{}", self.owner, head)
        };
        let prs = self
            .list_prs(ListPullsOpts {
                state: Some(PrState::Open),
                base: None,
                head: Some(head),
            })
            .await?;
        Ok(prs.into_iter().next())
    }

    async fn list_prs(&self, opts: ListPullsOpts) -> Result<Vec<PullRequest>, ForgeError> {
        let state = match opts.state {
            None | Some(PrState::Open) => "open",
            Some(PrState::Closed) | Some(PrState::Merged) => "closed",
        };
        let mut query: Vec<(&str, String)> = vec![
            ("state", state.to_string()),
            ("per_page", "100".to_string()),
        ];
        if let Some(base) = opts.base {
            query.push(("base", base));
        }
        if let Some(head) = opts.head {
            query.push(("head", head));
        }
        let request = self.client.get(self.repo_url("pulls")).query(&query);
        let prs: Vec<GitHubPullRequest> = self.fetch(request, Endpoint::Other).await?;
        prs.into_iter().map(PullRequest::try_from).collect()
    }

    async fn merge_pr(&self, number: u64, request: MergeRequest) -> Result<(), ForgeError> {
        let url = self.repo_url(&format!("pulls/{}/merge", number));
        let merge_method = request.method.to_string();
        let body = MergePrBody {
            merge_method: &merge_method,
            sha: request.sha.as_ref(),
            commit_message: request.commit_message.as_deref(),
        };
        self.execute(self.client.put(url).json(&body), Endpoint::Merge)
            .await
    }

    async fn get_statuses(&self, sha: &Oid) -> Result<Vec<CommitStatus>, ForgeError> {
        let url = self.repo_url(&format!("commits/{sha}/status"));
        let combined: GitHubCombinedStatus =
            self.fetch(self.client.get(url), Endpoint::Other).await?;
        Ok(combined.statuses)
    }
}

// --------------------------------------------------------------------------
// Wire types
// --------------------------------------------------------------------------

#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a Oid,
}

#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a Oid,
    force: bool,
}

#[derive(Serialize)]
struct CreateBlobBody<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Serialize)]
struct CreateTreeBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a Oid>,
    tree: &'a [TreeChange],
}

#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a Oid,
    parents: &'a [Oid],
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'a Signature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    committer: Option<&'a Signature>,
}

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

/// Request body for updating a PR.
#[derive(Serialize)]
struct UpdatePrBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
}

/// Request body for merging a PR.
#[derive(Serialize)]
struct MergePrBody<'a> {
    merge_method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a Oid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit_message: Option<&'a str>,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

#[derive(Deserialize)]
struct GitHubSha {
    sha: Oid,
}

#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
    object: GitHubSha,
}

#[derive(Deserialize)]
struct GitHubBlob {
    content: String,
}

#[derive(Deserialize)]
struct GitHubContent {
    sha: Oid,
    content: Option<String>,
    encoding: Option<String>,
}

/// Commit as returned by the git-data endpoints.
#[derive(Deserialize)]
struct GitHubGitCommit {
    sha: Oid,
    tree: GitHubSha,
    #[serde(default)]
    parents: Vec<GitHubSha>,
    message: String,
    author: Option<Signature>,
    committer: Option<Signature>,
}

impl From<GitHubGitCommit> for Commit {
    fn from(c: GitHubGitCommit) -> Self {
        Commit {
            sha: c.sha,
            tree: c.tree.sha,
            parents: c.parents.into_iter().map(|p| p.sha).collect(),
            message: c.message,
            author: c.author,
            committer: c.committer,
        }
    }
}

/// Commit as returned by the compare endpoint (wrapped form).
#[derive(Deserialize)]
struct GitHubRepoCommit {
    sha: Oid,
    commit: GitHubRepoCommitDetail,
    #[serde(default)]
    parents: Vec<GitHubSha>,
}

#[derive(Deserialize)]
struct GitHubRepoCommitDetail {
    message: String,
    tree: GitHubSha,
    author: Option<Signature>,
    committer: Option<Signature>,
}

impl From<GitHubRepoCommit> for Commit {
    fn from(c: GitHubRepoCommit) -> Self {
        Commit {
            sha: c.sha,
            tree: c.commit.tree.sha,
            parents: c.parents.into_iter().map(|p| p.sha).collect(),
            message: c.commit.message,
            author: c.commit.author,
            committer: c.commit.committer,
        }
    }
}

#[derive(Deserialize)]
struct GitHubComparison {
    merge_base_commit: GitHubRepoCommit,
    #[serde(default)]
    commits: Vec<GitHubRepoCommit>,
    #[serde(default)]
    files: Vec<GitHubFile>,
}

#[derive(Deserialize)]
struct GitHubFile {
    filename: String,
    status: FileStatus,
    sha: Option<Oid>,
    previous_filename: Option<String>,
}

impl From<GitHubFile> for ChangedFile {
    fn from(f: GitHubFile) -> Self {
        let sha = match f.status {
            FileStatus::Removed => None,
            _ => f.sha,
        };
        ChangedFile {
            filename: f.filename,
            status: f.status,
            sha,
            previous_filename: f.previous_filename,
        }
    }
}

/// GitHub PR response format.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    state: String,
    merged_at: Option<String>,
    head: GitHubPrHead,
    base: GitHubPrBase,
    title: String,
    body: Option<String>,
}

#[derive(Deserialize)]
struct GitHubPrHead {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
    /// None for deleted forks
    repo: Option<GitHubRepoInfo>,
}

#[derive(Deserialize)]
struct GitHubPrBase {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Deserialize)]
struct GitHubRepoInfo {
    full_name: String,
}

impl TryFrom<GitHubPullRequest> for PullRequest {
    type Error = ForgeError;

    fn try_from(pr: GitHubPullRequest) -> Result<Self, Self::Error> {
        let state = if pr.merged_at.is_some() {
            PrState::Merged
        } else if pr.state == "closed" {
            PrState::Closed
        } else {
            PrState::Open
        };
        let head_sha = Oid::new(pr.head.sha).map_err(|e| ForgeError::ApiError {
            status: 200,
            message: format!("PR #{} has an invalid head sha: {e}", pr.number),
        })?;

        Ok(PullRequest {
            number: pr.number,
            url: pr.html_url,
            state,
            head: pr.head.ref_name,
            head_sha,
            head_repo: pr.head.repo.map(|r| r.full_name),
            base: pr.base.ref_name,
            title: pr.title,
            body: pr.body,
        })
    }
}

#[derive(Deserialize)]
struct GitHubCombinedStatus {
    #[serde(default)]
    statuses: Vec<CommitStatus>,
}

// --------------------------------------------------------------------------
// URL Parsing
// --------------------------------------------------------------------------

/// Parse a GitHub remote URL to extract owner and repo.
///
/// Supports SSH and HTTPS formats, plus the bare `owner/repo` shorthand:
/// - `git@github.com:owner/repo.git`
/// - `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo`
/// - `owner/repo`
///
/// # Example
///
/// ```
/// use draftwork::forge::github::parse_github_url;
///
/// let (owner, repo) = parse_github_url("git@github.com:octocat/hello-world.git").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// ```
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    // SSH format: git@github.com:owner/repo.git
    if let Some(rest) = url.strip_prefix("git@github.com:") {
        return split_owner_repo(rest);
    }

    // HTTPS format: https://github.com/owner/repo.git
    if let Some(rest) = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
    {
        return split_owner_repo(rest);
    }

    // Shorthand: owner/repo
    if !url.contains(':') && url.matches('/').count() == 1 {
        return split_owner_repo(url);
    }

    None
}

fn split_owner_repo(rest: &str) -> Option<(String, String)> {
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, repo) = rest.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_github_url {
        use super::*;

        #[test]
        fn ssh_with_git_suffix() {
            let (owner, repo) = parse_github_url("git@github.com:octo/blog.git").unwrap();
            assert_eq!(owner, "octo");
            assert_eq!(repo, "blog");
        }

        #[test]
        fn https_without_git_suffix() {
            let (owner, repo) = parse_github_url("https://github.com/octo/blog").unwrap();
            assert_eq!(owner, "octo");
            assert_eq!(repo, "blog");
        }

        #[test]
        fn shorthand() {
            let (owner, repo) = parse_github_url("octo/my.site").unwrap();
            assert_eq!(owner, "octo");
            assert_eq!(repo, "my.site");
        }

        #[test]
        fn non_github_url() {
            assert!(parse_github_url("https://gitlab.com/octo/blog").is_none());
            assert!(parse_github_url("git@gitlab.com:octo/blog.git").is_none());
        }

        #[test]
        fn invalid_format() {
            assert!(parse_github_url("octo").is_none());
            assert!(parse_github_url("https://github.com/octo").is_none());
            assert!(parse_github_url("a/b/c").is_none());
        }
    }

    #[test]
    fn full_name_and_url() {
        let forge = GitHubForge::with_api_base("t", "octo", "blog", "http://localhost:1/");
        assert_eq!(forge.full_name(), "octo/blog");
        assert_eq!(
            forge.repo_url("git/refs"),
            "http://localhost:1/repos/octo/blog/git/refs"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let forge = GitHubForge::new("ghp_secret", "octo", "blog");
        let debug = format!("{:?}", forge);
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("octo"));
    }

    #[test]
    fn empty_token_requires_auth() {
        let forge = GitHubForge::new("", "octo", "blog");
        assert!(matches!(forge.headers(), Err(ForgeError::AuthRequired)));
    }

    #[test]
    fn removed_files_drop_sha() {
        let file = GitHubFile {
            filename: "a.md".into(),
            status: FileStatus::Removed,
            sha: Some(Oid::new("a".repeat(40)).unwrap()),
            previous_filename: None,
        };
        let changed: ChangedFile = file.into();
        assert!(changed.sha.is_none());
    }

    #[test]
    fn pr_state_from_merged_at() {
        let json = serde_json::json!({
            "number": 5,
            "html_url": "https://github.com/octo/blog/pull/5",
            "state": "closed",
            "merged_at": "2024-01-01T00:00:00Z",
            "head": { "ref": "cms/posts/a", "sha": "a".repeat(40), "repo": { "full_name": "octo/blog" } },
            "base": { "ref": "main" },
            "title": "Create Post “a”",
            "body": null
        });
        let pr: GitHubPullRequest = serde_json::from_value(json).unwrap();
        let pr: PullRequest = pr.try_into().unwrap();
        assert_eq!(pr.state, PrState::Merged);
        assert_eq!(pr.head_repo.as_deref(), Some("octo/blog"));
    }
}
