//! engine::reconcile
//!
//! Bringing stored metadata back in line with remote state.
//!
//! # Drift
//!
//! In open authoring, maintainers act on upstream pull requests directly:
//! they merge, close or reopen them without the contributor's workflow
//! seeing it. Before an entry is shown, its status is recomputed from the
//! tracked pull request:
//!
//! | Pull request | Result                                   |
//! |--------------|------------------------------------------|
//! | none         | `draft`                                  |
//! | open         | `pending_review`                         |
//! | closed       | `draft`                                  |
//! | merged       | branch and metadata removed              |
//!
//! # Legacy documents
//!
//! Documents without a `version` were written under the old key scheme
//! (`<slug>` instead of `<collection>/<slug>`). They are moved to the new
//! key before anything else. Every migration step tolerates having already
//! run, so an interrupted migration completes on the next listing.

use crate::core::metadata::{EntryStatus, Metadata, MetadataPr, METADATA_VERSION};
use crate::core::naming::branch_from_content_key;
use crate::core::types::{BranchName, ContentKey, Oid, UtcTimestamp};
use crate::forge::{ForgeError, PrState};

use super::{Workflow, WorkflowError};

/// Result of reconciling one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The entry is still unpublished.
    Kept(ContentKey, Metadata),
    /// The entry was published upstream and has been cleaned up.
    Removed(ContentKey),
}

impl Workflow {
    /// Recompute an entry's status from its pull request.
    pub async fn reconcile(&self, key: &ContentKey) -> Result<Reconciled, WorkflowError> {
        let metadata = self.load(key).await?;
        let (key, mut metadata) = if metadata.is_legacy() {
            self.migrate_legacy(key, metadata).await?
        } else {
            (key.clone(), metadata)
        };

        let expected = match &metadata.pr {
            None => EntryStatus::Draft,
            Some(tracked) => {
                let pr = self
                    .upstream
                    .get_pr(tracked.number)
                    .await
                    .map_err(self.forge_err())?;
                match pr.state {
                    PrState::Merged => {
                        self.delete_branch(&metadata.branch).await?;
                        self.metadata.delete(&key).await;
                        tracing::info!(%key, number = pr.number, "removed entry merged upstream");
                        return Ok(Reconciled::Removed(key));
                    }
                    PrState::Closed => EntryStatus::Draft,
                    PrState::Open => EntryStatus::PendingReview,
                }
            }
        };

        if metadata.status != expected {
            tracing::debug!(%key, from = %metadata.status, to = %expected, "correcting status");
            metadata.status = expected;
            metadata.timestamp = UtcTimestamp::now();
            self.store(&key, &metadata).await?;
        }
        Ok(Reconciled::Kept(key, metadata))
    }

    /// Move a legacy document and its branch to the current key scheme.
    pub async fn migrate_legacy(
        &self,
        old_key: &ContentKey,
        metadata: Metadata,
    ) -> Result<(ContentKey, Metadata), WorkflowError> {
        let new_key = self.scheme.upgrade_legacy(old_key, &metadata.collection)?;
        let new_branch = branch_from_content_key(&new_key)?;
        let old_branch = metadata.branch.clone();

        let head = match &metadata.pr {
            Some(pr) => pr.head.clone(),
            None => self.legacy_head(&old_branch, &new_branch).await?,
        };

        match self.repo.create_ref(&new_branch.ref_path(), &head).await {
            Ok(()) => {}
            Err(ForgeError::Conflict(_)) => {
                tracing::debug!(branch = %new_branch, "migrated branch already exists");
            }
            Err(e) => return Err(self.forge_err()(e)),
        }

        let pr = if metadata.pr.is_some() || !self.is_open_authoring() {
            let existing = self
                .upstream
                .find_pr_by_head(&self.pr_head(&new_branch))
                .await
                .map_err(self.forge_err())?;
            match existing {
                Some(pr) => Some(MetadataPr {
                    number: pr.number,
                    head: pr.head_sha,
                }),
                None => Some(self.open_pr(&new_branch, &metadata.commit_message).await?),
            }
        } else {
            None
        };

        let old_pr = metadata.pr.as_ref().map(|p| p.number);
        let migrated = Metadata {
            branch: new_branch,
            pr,
            version: Some(METADATA_VERSION.to_string()),
            ..metadata
        };
        self.store(&new_key, &migrated).await?;

        if let Some(number) = old_pr.filter(|n| Some(*n) != migrated.pr.as_ref().map(|p| p.number)) {
            self.close_if_open(number).await?;
        }
        self.delete_branch(&old_branch).await?;
        self.metadata.delete(old_key).await;

        tracing::info!(from = %old_key, to = %new_key, "migrated legacy entry");
        Ok((new_key, migrated))
    }

    /// Head of a PR-less legacy entry: the old branch, or the new one when a
    /// previous migration already removed the old branch.
    async fn legacy_head(
        &self,
        old_branch: &BranchName,
        new_branch: &BranchName,
    ) -> Result<Oid, WorkflowError> {
        match self.repo.get_ref(&old_branch.ref_path()).await {
            Ok(sha) => Ok(sha),
            Err(ForgeError::NotFound(_)) => self
                .repo
                .get_ref(&new_branch.ref_path())
                .await
                .map_err(self.forge_err()),
            Err(e) => Err(self.forge_err()(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::{ObjectRef, Objects};
    use crate::engine::test_support::*;
    use crate::forge::mock::Op;

    #[tokio::test]
    async fn prless_review_status_falls_back_to_draft() {
        let (_, _, workflow) = open_authoring();
        let outcome = workflow
            .persist_entry(draft("a", "a").with_status(EntryStatus::PendingReview))
            .await
            .unwrap();

        let Reconciled::Kept(_, meta) = workflow.reconcile(&outcome.key).await.unwrap() else {
            panic!("entry should be kept");
        };
        assert_eq!(meta.status, EntryStatus::Draft);
    }

    #[tokio::test]
    async fn closed_upstream_pr_means_draft() {
        let (upstream, _, workflow) = open_authoring();
        let key = workflow.persist_entry(draft("a", "a")).await.unwrap().key;
        let number = workflow
            .update_status("posts", "a", EntryStatus::PendingReview)
            .await
            .unwrap()
            .pr
            .unwrap()
            .number;
        upstream.close_pr_externally(number).unwrap();

        match workflow.reconcile(&key).await.unwrap() {
            Reconciled::Kept(_, meta) => assert_eq!(meta.status, EntryStatus::Draft),
            other => panic!("expected Kept, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn merged_upstream_pr_removes_entry() {
        let (upstream, fork, workflow) = open_authoring();
        let key = workflow.persist_entry(draft("a", "a")).await.unwrap().key;
        let number = workflow
            .update_status("posts", "a", EntryStatus::PendingReview)
            .await
            .unwrap()
            .pr
            .unwrap()
            .number;
        upstream.merge_pr_externally(number).unwrap();

        assert_eq!(
            workflow.reconcile(&key).await.unwrap(),
            Reconciled::Removed(key.clone())
        );
        assert!(fork.ref_sha("heads/cms/alice/blog/posts/a").is_none());
        assert!(matches!(
            workflow.load(&key).await,
            Err(WorkflowError::NotUnderWorkflow(_))
        ));
        // A merged PR is never closed.
        assert_eq!(upstream.count(Op::UpdatePr), 0);
    }

    #[tokio::test]
    async fn in_sync_entry_is_not_rewritten() {
        let (_, fork, workflow) = open_authoring();
        let key = workflow.persist_entry(draft("a", "a")).await.unwrap().key;
        fork.clear_operations();
        workflow.reconcile(&key).await.unwrap();
        assert_eq!(fork.count(Op::UpdateRef), 0);
    }

    fn legacy_metadata(entry_sha: Oid, pr: Option<MetadataPr>) -> Metadata {
        Metadata {
            kind: "PR".into(),
            status: EntryStatus::PendingReview,
            objects: Objects {
                entry: ObjectRef {
                    path: "content/posts/old.md".into(),
                    sha: entry_sha,
                },
                files: vec![],
            },
            branch: BranchName::new("cms/old").unwrap(),
            collection: "posts".into(),
            commit_message: "Create Post “old”".into(),
            user: "octo".into(),
            title: None,
            description: None,
            pr,
            version: None,
            timestamp: UtcTimestamp::now(),
        }
    }

    #[tokio::test]
    async fn legacy_entry_moves_to_collection_key() {
        let (forge, workflow) = standard();
        let head = forge.seed_branch("cms/old", &[("content/posts/old.md", "old")]);
        let old_key = ContentKey::new("old").unwrap();
        workflow
            .store(&old_key, &legacy_metadata(head.clone(), None))
            .await
            .unwrap();

        let (new_key, meta) = workflow
            .migrate_legacy(&old_key, workflow.load(&old_key).await.unwrap())
            .await
            .unwrap();

        assert_eq!(new_key.as_str(), "posts/old");
        assert_eq!(meta.branch.as_str(), "cms/posts/old");
        assert_eq!(meta.version.as_deref(), Some("1"));
        assert_eq!(forge.ref_sha("heads/cms/posts/old"), Some(head));
        assert!(forge.ref_sha("heads/cms/old").is_none());
        assert!(meta.pr.is_some(), "standard entries always get a pull request");
        assert!(matches!(
            workflow.load(&old_key).await,
            Err(WorkflowError::NotUnderWorkflow(_))
        ));
        assert_eq!(workflow.load(&new_key).await.unwrap(), meta);
    }

    #[tokio::test]
    async fn interrupted_migration_resumes() {
        let (forge, workflow) = standard();
        let head = forge.seed_branch("cms/old", &[("content/posts/old.md", "old")]);
        // A previous run created the new branch and removed the old one.
        forge.seed_branch("cms/posts/old", &[("content/posts/old.md", "old")]);
        forge.clear_operations();
        let new_head = forge.ref_sha("heads/cms/posts/old").unwrap();
        let old_key = ContentKey::new("old").unwrap();
        let legacy = legacy_metadata(head, None);
        workflow.store(&old_key, &legacy).await.unwrap();
        workflow.delete_branch(&legacy.branch).await.unwrap();

        let (new_key, meta) = workflow.migrate_legacy(&old_key, legacy).await.unwrap();
        assert_eq!(new_key.as_str(), "posts/old");
        assert_eq!(forge.ref_sha("heads/cms/posts/old"), Some(new_head.clone()));
        assert_eq!(meta.pr.map(|p| p.head), Some(new_head));
    }

    #[tokio::test]
    async fn reconcile_migrates_legacy_fork_entry_without_pr() {
        let (_, fork, workflow) = open_authoring();
        let head = fork.seed_branch("cms/alice/blog/old", &[("content/posts/old.md", "old")]);
        let old_key = ContentKey::new("alice/blog/old").unwrap();
        let mut legacy = legacy_metadata(head, None);
        legacy.branch = BranchName::new("cms/alice/blog/old").unwrap();
        workflow.store(&old_key, &legacy).await.unwrap();

        let Reconciled::Kept(key, meta) = workflow.reconcile(&old_key).await.unwrap() else {
            panic!("entry should be kept");
        };
        assert_eq!(key.as_str(), "alice/blog/posts/old");
        assert!(meta.pr.is_none());
        assert_eq!(meta.status, EntryStatus::Draft);
        assert!(fork.ref_sha("heads/cms/alice/blog/posts/old").is_some());
        assert!(fork.ref_sha("heads/cms/alice/blog/old").is_none());
    }
}
