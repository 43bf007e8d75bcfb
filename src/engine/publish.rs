//! engine::publish
//!
//! Publishing and discarding entries.
//!
//! Publishing merges the tracked pull request, which lives upstream in open
//! authoring mode. When the hosting service
//! refuses the merge (HTTP 405, usually because the default branch moved in
//! a way it cannot reconcile), the entry's files are committed directly on
//! the default tip instead and the default branch is force-updated. Either way the
//! entry branch and metadata are removed afterwards.

use crate::core::metadata::Metadata;
use crate::core::types::{BranchName, ContentKey, Oid};
use crate::forge::{ForgeError, MergeRequest, PrState};
use crate::git::ObjectWriter;

use super::persist::object_changes;
use super::{Workflow, WorkflowError};

/// How an entry reached the default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The pull request was merged by the hosting service.
    Merged { number: u64 },
    /// The merge was refused and the files were committed directly.
    ForceMerged { number: u64, commit: Oid },
}

impl Workflow {
    /// Publish an entry to the default branch.
    ///
    /// In open authoring mode the upstream pull request is merged at the
    /// fork branch's current head. It is found by head when the metadata
    /// does not track one.
    ///
    /// Once the merge has landed, branch and metadata cleanup are
    /// best-effort.
    ///
    /// # Errors
    ///
    /// - `WorkflowError::MissingPullRequest` if no pull request is tracked
    ///   or, in open authoring mode, open for the branch
    pub async fn publish(&self, collection: &str, slug: &str) -> Result<PublishOutcome, WorkflowError> {
        let (key, branch) = self.locate(collection, slug)?;
        let metadata = self.load(&key).await?;
        let (number, head) = self.merge_target(&key, &branch, &metadata).await?;

        let request = MergeRequest {
            method: self.options.merge_method,
            sha: Some(head),
            commit_message: Some(metadata.commit_message.clone()),
        };
        let outcome = match self.upstream.merge_pr(number, request).await {
            Ok(()) => PublishOutcome::Merged { number },
            Err(ForgeError::MergeConflict(reason)) => {
                tracing::warn!(%key, number, %reason, "merge refused, forcing merge");
                let commit = self.force_merge(&metadata).await?;
                self.close_quietly(number).await;
                PublishOutcome::ForceMerged { number, commit }
            }
            Err(e) => return Err(self.forge_err()(e)),
        };

        if let Err(e) = self.delete_branch(&branch).await {
            tracing::warn!(%branch, error = %e, "failed to delete published branch");
        }
        self.metadata.delete(&key).await;
        tracing::info!(%key, ?outcome, "published entry");
        Ok(outcome)
    }

    /// Pull request number and head sha to merge for an entry.
    async fn merge_target(
        &self,
        key: &ContentKey,
        branch: &BranchName,
        metadata: &Metadata,
    ) -> Result<(u64, Oid), WorkflowError> {
        if !self.is_open_authoring() {
            let pr = metadata
                .pr
                .as_ref()
                .ok_or_else(|| WorkflowError::MissingPullRequest(key.clone()))?;
            return Ok((pr.number, pr.head.clone()));
        }

        let number = match &metadata.pr {
            Some(pr) => pr.number,
            None => self
                .upstream
                .find_pr_by_head(&self.pr_head(branch))
                .await
                .map_err(self.forge_err())?
                .map(|pr| pr.number)
                .ok_or_else(|| WorkflowError::MissingPullRequest(key.clone()))?,
        };
        let head = self
            .repo
            .get_ref(&branch.ref_path())
            .await
            .map_err(self.forge_err())?;
        Ok((number, head))
    }

    /// Commit the entry's files on the default tip and force the branch there.
    async fn force_merge(&self, metadata: &Metadata) -> Result<Oid, WorkflowError> {
        let writer = ObjectWriter::new(self.upstream.as_ref());
        let tip = self.default_tip().await?;
        let base = self.upstream.get_commit(&tip).await.map_err(self.forge_err())?;
        let tree = writer
            .build_tree(Some(&base.tree), object_changes(&metadata.objects))
            .await
            .map_err(self.forge_err())?;
        let commit = writer
            .create_commit(&force_merge_message(metadata), &tree, vec![tip], None, None)
            .await
            .map_err(self.forge_err())?;
        self.upstream
            .update_ref(&self.options.default_branch.ref_path(), &commit.sha, true)
            .await
            .map_err(self.forge_err())?;
        Ok(commit.sha)
    }

    /// Discard an unpublished entry.
    ///
    /// Closes its pull request, deletes its branch and removes its metadata.
    /// An entry that is already gone is not an error.
    pub async fn delete_entry(&self, collection: &str, slug: &str) -> Result<(), WorkflowError> {
        let (key, branch) = self.locate(collection, slug)?;
        match self.load(&key).await {
            Ok(metadata) => {
                if let Some(pr) = &metadata.pr {
                    self.close_if_open(pr.number).await?;
                }
            }
            Err(WorkflowError::NotUnderWorkflow(_)) => {
                tracing::debug!(%key, "no metadata, deleting branch only");
            }
            Err(e) => return Err(e),
        }
        self.delete_branch(&branch).await?;
        self.metadata.delete(&key).await;
        tracing::info!(%key, "deleted entry");
        Ok(())
    }

    /// Close a pull request unless it is already closed, merged or gone.
    pub(crate) async fn close_if_open(&self, number: u64) -> Result<(), WorkflowError> {
        let pr = match self.upstream.get_pr(number).await {
            Ok(pr) => pr,
            Err(ForgeError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(self.forge_err()(e)),
        };
        if pr.state != PrState::Open {
            return Ok(());
        }
        match self.set_pr_state(number, PrState::Closed).await {
            Err(WorkflowError::Forge {
                source: ForgeError::NotFound(_),
                ..
            }) => Ok(()),
            other => other,
        }
    }

    async fn close_quietly(&self, number: u64) {
        if let Err(e) = self.close_if_open(number).await {
            tracing::warn!(number, error = %e, "failed to close force-merged pull request");
        }
    }
}

fn force_merge_message(metadata: &Metadata) -> String {
    let files: Vec<String> = std::iter::once(&metadata.objects.entry)
        .chain(metadata.objects.files.iter())
        .map(|o| format!("* \"{}\"", o.path))
        .collect();
    format!(
        "Automatically generated. Merged on Draftwork.\n\nForce merge of:\n{}",
        files.join("\n")
    )
}
