//! engine::status
//!
//! Status transitions and the pull request changes they imply.
//!
//! | Variant  | New status        | Pull request effect                          |
//! |----------|-------------------|----------------------------------------------|
//! | standard | `draft`           | none                                         |
//! | standard | review / publish  | opened if none is tracked, reopened if closed |
//! | fork     | `draft`           | tracked PR closed if open                    |
//! | fork     | `pending_review`  | opened upstream, or reopened if closed       |
//! | fork     | `pending_publish` | rejected: only maintainers publish           |

use crate::core::metadata::{EntryStatus, Metadata, MetadataPr};
use crate::core::types::{BranchName, UtcTimestamp};
use crate::forge::{CreatePrRequest, PrState, UpdatePrRequest};

use super::{Workflow, WorkflowError, PR_BODY};

impl Workflow {
    /// Move an entry to `status`, adjusting its pull request.
    ///
    /// Returns the stored metadata.
    pub async fn update_status(
        &self,
        collection: &str,
        slug: &str,
        status: EntryStatus,
    ) -> Result<Metadata, WorkflowError> {
        let (key, branch) = self.locate(collection, slug)?;
        let mut metadata = self.load(&key).await?;

        if self.is_open_authoring() {
            self.fork_transition(&branch, &mut metadata, status).await?;
        } else if status != EntryStatus::Draft {
            self.ensure_open_pr(&branch, &mut metadata).await?;
        }

        tracing::debug!(%key, from = %metadata.status, to = %status, "updating status");
        metadata.status = status;
        metadata.timestamp = UtcTimestamp::now();
        self.store(&key, &metadata).await?;
        Ok(metadata)
    }

    async fn fork_transition(
        &self,
        branch: &BranchName,
        metadata: &mut Metadata,
        status: EntryStatus,
    ) -> Result<(), WorkflowError> {
        match status {
            EntryStatus::PendingPublish => Err(WorkflowError::InvalidStatus(
                "open authoring entries cannot be marked ready to publish".into(),
            )),
            EntryStatus::PendingReview => self.ensure_open_pr(branch, metadata).await,
            EntryStatus::Draft => {
                if let Some(tracked) = &metadata.pr {
                    let pr = self
                        .upstream
                        .get_pr(tracked.number)
                        .await
                        .map_err(self.forge_err())?;
                    if pr.state == PrState::Open {
                        self.set_pr_state(tracked.number, PrState::Closed).await?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Open a pull request when none is tracked, or reopen a closed one.
    async fn ensure_open_pr(
        &self,
        branch: &BranchName,
        metadata: &mut Metadata,
    ) -> Result<(), WorkflowError> {
        let Some(number) = metadata.pr.as_ref().map(|pr| pr.number) else {
            metadata.pr = Some(self.open_pr(branch, &metadata.commit_message).await?);
            return Ok(());
        };
        let pr = self.upstream.get_pr(number).await.map_err(self.forge_err())?;
        match pr.state {
            PrState::Open => Ok(()),
            PrState::Closed => {
                tracing::debug!(%branch, number, "reopening pull request");
                self.set_pr_state(number, PrState::Open).await
            }
            PrState::Merged => Err(WorkflowError::InvalidStatus(format!(
                "pull request #{number} is already merged"
            ))),
        }
    }

    /// Open a pull request for `branch` against the default branch.
    pub(crate) async fn open_pr(
        &self,
        branch: &BranchName,
        title: &str,
    ) -> Result<MetadataPr, WorkflowError> {
        let pr = self
            .upstream
            .create_pr(CreatePrRequest {
                head: self.pr_head(branch),
                base: self.options.default_branch.to_string(),
                title: title.to_string(),
                body: Some(PR_BODY.to_string()),
            })
            .await
            .map_err(self.forge_err())?;
        tracing::debug!(%branch, number = pr.number, "opened pull request");
        Ok(MetadataPr {
            number: pr.number,
            head: pr.head_sha,
        })
    }

    pub(crate) async fn set_pr_state(&self, number: u64, state: PrState) -> Result<(), WorkflowError> {
        self.upstream
            .update_pr(UpdatePrRequest {
                number,
                state: Some(state),
                ..Default::default()
            })
            .await
            .map_err(self.forge_err())?;
        Ok(())
    }
}
