//! engine
//!
//! The editorial workflow: draft, review and publish on branches and pull
//! requests.
//!
//! # Architecture
//!
//! [`Workflow`] is the entry point for every operation. It owns the
//! metadata store and reaches the remote only through `dyn Forge`:
//!
//! ```text
//! persist_entry ──► ObjectWriter ──► Rebaser (existing entries) ──► MetadataStore
//! update_status ──► pull request transition ──► MetadataStore
//! publish       ──► merge_pr | forced merge ──► branch + metadata teardown
//! list          ──► reconcile (open authoring) | open PR filter (standard)
//! ```
//!
//! Two variants exist. The standard variant keeps branches, pull requests
//! and metadata in one repository. The open authoring variant keeps
//! branches, objects and metadata in the contributor's fork and opens pull
//! requests against the upstream repository, whose state maintainers can
//! change at any time. [`reconcile`] corrects that drift.
//!
//! # Invariants
//!
//! - One entry has exactly one branch and at most one tracked pull request
//! - Metadata is written after the branch it describes exists
//! - Nothing is retried; out-of-process writers surface as
//!   [`WorkflowError::Conflict`]
//! - Concurrent operations on the same entry must be serialized by the caller
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use draftwork::engine::{EntryDraft, PersistFile, Workflow, WorkflowOptions};
//! use draftwork::forge::mock::MockForge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new("octo/blog");
//! forge.seed_branch("main", &[("README.md", "blog")]);
//!
//! let workflow = Workflow::new(Arc::new(forge), WorkflowOptions::default());
//! let outcome = workflow
//!     .persist_entry(EntryDraft::new(
//!         "posts",
//!         "hello",
//!         PersistFile::new("content/posts/hello.md", "# Hello"),
//!         "Create Post “hello”",
//!     ))
//!     .await
//!     .unwrap();
//! assert_eq!(outcome.branch.as_str(), "cms/posts/hello");
//! # });
//! ```

pub mod listing;
pub mod persist;
pub mod publish;
pub mod reconcile;
pub mod status;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;

use crate::core::metadata::{EntryStatus, Metadata, MetadataError, MetadataStore, StoreError};
use crate::core::naming::{branch_from_content_key, KeyScheme};
use crate::core::types::{BranchName, ContentKey, Oid, TypeError};
use crate::forge::{Forge, ForgeError, ForgeUser, MergeMethod};
use crate::git::RebaseError;

pub use listing::{BranchSummary, UnpublishedEntry};
pub use persist::{DirectCommit, EntryDraft, PersistFile, PersistOutcome};
pub use publish::PublishOutcome;
pub use reconcile::Reconciled;

/// Body of every pull request opened by the workflow.
pub const PR_BODY: &str = "Automatically generated by Draftwork";

/// Errors from workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The entry has no metadata document.
    #[error("entry is not under editorial workflow: {0}")]
    NotUnderWorkflow(ContentKey),

    /// A ref moved underneath this operation.
    #[error("concurrent update detected: {0}")]
    Conflict(String),

    /// The requested status is not reachable in this workflow variant.
    #[error("invalid status change: {0}")]
    InvalidStatus(String),

    /// The operation needs a pull request and the entry tracks none.
    #[error("entry {0} has no pull request")]
    MissingPullRequest(ContentKey),

    /// The operation is not available to open authoring contributors.
    #[error("not permitted in open authoring mode: {0}")]
    NotPermitted(String),

    /// Transport or API failure, tagged with the backend that produced it.
    #[error("{backend} API error: {source}")]
    Forge {
        backend: &'static str,
        #[source]
        source: ForgeError,
    },

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A branch could not be replayed onto the default branch.
    #[error("rebase failed: {0}")]
    Rebase(RebaseError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Which workflow variant is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Branches, pull requests and metadata in one repository.
    Standard,
    /// Branches in `fork_owner`'s fork, pull requests upstream.
    OpenAuthoring { fork_owner: String },
}

/// Settings for one workflow instance.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Branch entries are published to.
    pub default_branch: BranchName,
    /// How pull requests are merged on publish.
    pub merge_method: MergeMethod,
    /// Status of new entries that don't request one.
    pub initial_status: EntryStatus,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            default_branch: BranchName::main(),
            merge_method: MergeMethod::Merge,
            initial_status: EntryStatus::Draft,
        }
    }
}

/// Editorial workflow over one repository (or one fork and its upstream).
pub struct Workflow {
    /// Holds entry branches, objects and metadata.
    repo: Arc<dyn Forge>,
    /// Holds pull requests and the default branch.
    upstream: Arc<dyn Forge>,
    metadata: MetadataStore,
    scheme: KeyScheme,
    mode: Mode,
    options: WorkflowOptions,
    user: OnceCell<ForgeUser>,
}

impl Workflow {
    /// Standard workflow on a single repository.
    pub fn new(forge: Arc<dyn Forge>, options: WorkflowOptions) -> Self {
        Self {
            metadata: MetadataStore::new(Arc::clone(&forge)),
            upstream: Arc::clone(&forge),
            repo: forge,
            scheme: KeyScheme::standard(),
            mode: Mode::Standard,
            options,
            user: OnceCell::new(),
        }
    }

    /// Open authoring workflow: entries live in `fork`, reviews in `upstream`.
    pub fn open_authoring(
        fork: Arc<dyn Forge>,
        upstream: Arc<dyn Forge>,
        options: WorkflowOptions,
    ) -> Self {
        let full_name = fork.full_name();
        let fork_owner = full_name
            .split_once('/')
            .map(|(owner, _)| owner.to_string())
            .unwrap_or_else(|| full_name.clone());
        Self {
            metadata: MetadataStore::new(Arc::clone(&fork)),
            scheme: KeyScheme::scoped(full_name),
            repo: fork,
            upstream,
            mode: Mode::OpenAuthoring { fork_owner },
            options,
            user: OnceCell::new(),
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn scheme(&self) -> &KeyScheme {
        &self.scheme
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    pub fn is_open_authoring(&self) -> bool {
        matches!(self.mode, Mode::OpenAuthoring { .. })
    }

    /// Content key and branch for an entry.
    pub fn locate(&self, collection: &str, slug: &str) -> Result<(ContentKey, BranchName), WorkflowError> {
        let key = self.scheme.content_key(collection, slug)?;
        let branch = branch_from_content_key(&key)?;
        Ok((key, branch))
    }

    /// The authenticated user, fetched once per instance.
    pub async fn current_user(&self) -> Result<&ForgeUser, WorkflowError> {
        self.user
            .get_or_try_init(|| async { self.repo.current_user().await })
            .await
            .map_err(self.forge_err())
    }

    /// Current tip of the default branch in the upstream repository.
    pub(crate) async fn default_tip(&self) -> Result<Oid, WorkflowError> {
        self.upstream
            .get_ref(&self.options.default_branch.ref_path())
            .await
            .map_err(self.forge_err())
    }

    /// Load metadata, mapping a missing document to `NotUnderWorkflow`.
    pub(crate) async fn load(&self, key: &ContentKey) -> Result<Metadata, WorkflowError> {
        self.metadata.get(key).await.map_err(self.store_err())
    }

    pub(crate) async fn store(&self, key: &ContentKey, metadata: &Metadata) -> Result<(), WorkflowError> {
        self.metadata.put(key, metadata).await.map_err(self.store_err())
    }

    /// Delete a branch, treating an already-missing branch as deleted.
    pub(crate) async fn delete_branch(&self, branch: &BranchName) -> Result<(), WorkflowError> {
        match self.repo.delete_ref(&branch.ref_path()).await {
            Ok(()) => Ok(()),
            Err(ForgeError::NotFound(_)) => {
                tracing::debug!(%branch, "branch already deleted");
                Ok(())
            }
            Err(e) => Err(self.forge_err()(e)),
        }
    }

    /// Head reference for pull requests on this entry's branch.
    pub(crate) fn pr_head(&self, branch: &BranchName) -> String {
        match &self.mode {
            Mode::Standard => branch.to_string(),
            Mode::OpenAuthoring { fork_owner } => format!("{fork_owner}:{branch}"),
        }
    }

    pub(crate) fn forge_err(&self) -> impl Fn(ForgeError) -> WorkflowError {
        let backend = self.repo.name();
        move |source| WorkflowError::Forge { backend, source }
    }

    pub(crate) fn store_err(&self) -> impl Fn(StoreError) -> WorkflowError {
        let backend = self.repo.name();
        move |e| match e {
            StoreError::NotFound(key) => WorkflowError::NotUnderWorkflow(key),
            StoreError::Conflict(message) => WorkflowError::Conflict(message),
            StoreError::Parse(e) => WorkflowError::Metadata(e),
            StoreError::Serialize(e) => {
                WorkflowError::Metadata(MetadataError::InvalidValue(e.to_string()))
            }
            StoreError::Forge(source) => WorkflowError::Forge { backend, source },
        }
    }

    pub(crate) fn rebase_err(&self) -> impl Fn(RebaseError) -> WorkflowError {
        let backend = self.repo.name();
        move |e| match e {
            RebaseError::Forge(source) => WorkflowError::Forge { backend, source },
            other => WorkflowError::Rebase(other),
        }
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("repo", &self.repo.full_name())
            .field("upstream", &self.upstream.full_name())
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::forge::mock::MockForge;

    pub fn standard() -> (MockForge, Workflow) {
        let forge = MockForge::new("octo/blog");
        forge.seed_branch("main", &[("README.md", "blog")]);
        let workflow = Workflow::new(Arc::new(forge.clone()), WorkflowOptions::default());
        (forge, workflow)
    }

    /// Returns `(upstream, fork, workflow)` with the fork owned by `alice`.
    pub fn open_authoring() -> (MockForge, MockForge, Workflow) {
        let upstream = MockForge::new("octo/blog");
        upstream.seed_branch("main", &[("README.md", "blog")]);
        let fork = upstream.fork("alice");
        let workflow = Workflow::open_authoring(
            Arc::new(fork.clone()),
            Arc::new(upstream.clone()),
            WorkflowOptions::default(),
        );
        (upstream, fork, workflow)
    }

    pub fn draft(slug: &str, body: &str) -> EntryDraft {
        EntryDraft::new(
            "posts",
            slug,
            PersistFile::new(format!("content/posts/{slug}.md"), body),
            format!("Create Post “{slug}”"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::forge::mock::{FailOn, Op};

    #[test]
    fn open_authoring_scopes_keys_to_fork() {
        let (_, _, workflow) = open_authoring();
        let (key, branch) = workflow.locate("posts", "hello").unwrap();
        assert_eq!(key.as_str(), "alice/blog/posts/hello");
        assert_eq!(branch.as_str(), "cms/alice/blog/posts/hello");
        assert_eq!(workflow.pr_head(&branch), "alice:cms/alice/blog/posts/hello");
        assert_eq!(
            workflow.mode(),
            &Mode::OpenAuthoring {
                fork_owner: "alice".into()
            }
        );
    }

    #[tokio::test]
    async fn current_user_is_fetched_once() {
        let (forge, workflow) = standard();
        let first = workflow.current_user().await.unwrap().login.clone();
        let second = workflow.current_user().await.unwrap().login.clone();
        assert_eq!(first, "octo");
        assert_eq!(first, second);
        assert_eq!(forge.count(Op::CurrentUser), 1);
    }

    #[tokio::test]
    async fn forge_errors_carry_backend_name() {
        let (forge, workflow) = standard();
        forge.inject(FailOn::always(Op::GetRef, ForgeError::RateLimited));
        match workflow.default_tip().await {
            Err(WorkflowError::Forge { backend, source }) => {
                assert_eq!(backend, "mock");
                assert!(matches!(source, ForgeError::RateLimited));
            }
            other => panic!("expected Forge error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_metadata_is_not_under_workflow() {
        let (_, workflow) = standard();
        let (key, _) = workflow.locate("posts", "nope").unwrap();
        assert!(matches!(
            workflow.load(&key).await,
            Err(WorkflowError::NotUnderWorkflow(k)) if k == key
        ));
    }
}
