//! engine::listing
//!
//! Read paths: the unpublished entry list, one entry's content, and its
//! commit statuses.
//!
//! A standard listing shows the workflow branches that have an open pull
//! request against the default branch. An open authoring listing shows
//! every workflow branch in the fork, each reconciled against upstream
//! first. Entries that fail to load are logged and skipped so one broken
//! document never hides the rest.

use std::collections::HashSet;

use crate::core::metadata::Metadata;
use crate::core::naming::content_key_from_branch;
use crate::core::types::{BranchName, ContentKey};
use crate::forge::{CommitStatus, ListPullsOpts, RefInfo};

use super::reconcile::Reconciled;
use super::{Workflow, WorkflowError};

/// One unpublished entry in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSummary {
    pub branch: BranchName,
    pub content_key: ContentKey,
    pub metadata: Metadata,
}

/// An unpublished entry with its content.
#[derive(Debug, Clone)]
pub struct UnpublishedEntry {
    pub key: ContentKey,
    pub metadata: Metadata,
    /// Entry file content as saved.
    pub content: Vec<u8>,
    pub media: Vec<String>,
}

impl Workflow {
    /// All entries currently under editorial workflow.
    pub async fn list_unpublished(&self) -> Result<Vec<BranchSummary>, WorkflowError> {
        let prefix = format!("heads/{}", self.scheme.branch_prefix());
        let refs = self
            .repo
            .list_refs(&prefix)
            .await
            .map_err(self.forge_err())?;

        let keys: Vec<ContentKey> = if self.is_open_authoring() {
            refs.iter().filter_map(|r| content_key_from_branch(&r.name)).collect()
        } else {
            self.with_open_pr(refs).await?
        };

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            match self.summarize(&key).await {
                Ok(Some(summary)) => entries.push(summary),
                Ok(None) => {}
                Err(e) => tracing::warn!(%key, error = %e, "skipping entry"),
            }
        }
        Ok(entries)
    }

    /// Keys of the branches that are the head of an open pull request.
    async fn with_open_pr(&self, refs: Vec<RefInfo>) -> Result<Vec<ContentKey>, WorkflowError> {
        let prs = self
            .upstream
            .list_prs(ListPullsOpts {
                state: None,
                base: Some(self.options.default_branch.to_string()),
                head: None,
            })
            .await
            .map_err(self.forge_err())?;
        let repo = self.repo.full_name();
        let heads: HashSet<String> = prs
            .into_iter()
            .filter(|pr| pr.head_repo.as_deref().map_or(true, |r| r == repo))
            .map(|pr| pr.head)
            .collect();

        Ok(refs
            .iter()
            .filter(|r| {
                let branch = r.name.strip_prefix("refs/heads/").unwrap_or(&r.name);
                heads.contains(branch)
            })
            .filter_map(|r| content_key_from_branch(&r.name))
            .collect())
    }

    async fn summarize(&self, key: &ContentKey) -> Result<Option<BranchSummary>, WorkflowError> {
        let (key, metadata) = if self.is_open_authoring() {
            match self.reconcile(key).await? {
                Reconciled::Kept(key, metadata) => (key, metadata),
                Reconciled::Removed(_) => return Ok(None),
            }
        } else {
            let metadata = self.load(key).await?;
            if metadata.is_legacy() {
                self.migrate_legacy(key, metadata).await?
            } else {
                (key.clone(), metadata)
            }
        };
        Ok(Some(BranchSummary {
            branch: metadata.branch.clone(),
            content_key: key,
            metadata,
        }))
    }

    /// Metadata and saved content of one entry.
    pub async fn unpublished_entry(
        &self,
        collection: &str,
        slug: &str,
    ) -> Result<UnpublishedEntry, WorkflowError> {
        let (key, _) = self.locate(collection, slug)?;
        let metadata = self.load(&key).await?;
        let content = self
            .repo
            .get_blob(&metadata.objects.entry.sha)
            .await
            .map_err(self.forge_err())?;
        let media = metadata.media_paths().into_iter().map(str::to_string).collect();
        Ok(UnpublishedEntry {
            key,
            metadata,
            content,
            media,
        })
    }

    /// Commit statuses (CI, deploy previews) for an entry's head commit.
    ///
    /// Statuses are read from the upstream repository, where checks on pull
    /// requests report.
    pub async fn entry_statuses(
        &self,
        collection: &str,
        slug: &str,
    ) -> Result<Vec<CommitStatus>, WorkflowError> {
        let (key, branch) = self.locate(collection, slug)?;
        let metadata = self.load(&key).await?;
        let sha = match &metadata.pr {
            Some(pr) => pr.head.clone(),
            None => self
                .repo
                .get_ref(&branch.ref_path())
                .await
                .map_err(self.forge_err())?,
        };
        self.upstream
            .get_statuses(&sha)
            .await
            .map_err(self.forge_err())
    }
}
