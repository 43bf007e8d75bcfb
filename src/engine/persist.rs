//! engine::persist
//!
//! Saving entries: the workflow path and the direct path.
//!
//! # Workflow path
//!
//! A new entry gets a branch cut from the default tip, a pull request in the
//! standard variant, and a metadata document. An existing entry is rebased
//! onto the current default tip first, then the new content is committed on
//! top and the branch is force-updated.
//!
//! # Direct path
//!
//! [`Workflow::persist_direct`] and [`Workflow::delete_files`] commit to the
//! default branch with a fast-forward-only update. They never rebase: a
//! moved default branch surfaces as a conflict.

use crate::core::metadata::{
    EntryStatus, Metadata, ObjectRef, Objects, METADATA_KIND, METADATA_VERSION,
};
use crate::core::types::{BranchName, ContentKey, Oid, UtcTimestamp};
use crate::forge::{ForgeError, TreeChange};
use crate::git::{blob_change, ObjectWriter, RebaseOutcome, Rebaser};

use super::{Workflow, WorkflowError};

/// One file to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistFile {
    pub path: String,
    pub content: Vec<u8>,
}

impl PersistFile {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// An entry save request.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub collection: String,
    pub slug: String,
    pub entry: PersistFile,
    pub media: Vec<PersistFile>,
    pub commit_message: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Status of a new entry. Ignored when the entry already exists.
    pub status: Option<EntryStatus>,
}

impl EntryDraft {
    pub fn new(
        collection: impl Into<String>,
        slug: impl Into<String>,
        entry: PersistFile,
        commit_message: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            slug: slug.into(),
            entry,
            media: Vec::new(),
            commit_message: commit_message.into(),
            title: None,
            description: None,
            status: None,
        }
    }

    pub fn with_media(mut self, media: PersistFile) -> Self {
        self.media.push(media);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Result of [`Workflow::persist_entry`].
#[derive(Debug, Clone)]
pub struct PersistOutcome {
    pub key: ContentKey,
    pub branch: BranchName,
    /// New head of the entry branch.
    pub head: Oid,
    /// True when the entry entered the workflow with this save.
    pub created: bool,
    /// Commits replayed onto the default tip before the save.
    pub replayed: usize,
    pub metadata: Metadata,
}

/// A commit straight to the default branch.
#[derive(Debug, Clone)]
pub struct DirectCommit {
    pub files: Vec<PersistFile>,
    pub commit_message: String,
}

impl Workflow {
    /// Save an entry under editorial workflow.
    ///
    /// # Errors
    ///
    /// - `WorkflowError::Conflict` if the metadata ref moved concurrently
    /// - `WorkflowError::Rebase` if the entry branch cannot be replayed
    pub async fn persist_entry(&self, draft: EntryDraft) -> Result<PersistOutcome, WorkflowError> {
        let (key, branch) = self.locate(&draft.collection, &draft.slug)?;
        let entry = self.upload(&draft.entry).await?;
        let mut media = Vec::with_capacity(draft.media.len());
        for file in &draft.media {
            media.push(self.upload(file).await?);
        }
        let objects = Objects {
            entry,
            files: media,
        };

        match self.load(&key).await {
            Ok(existing) => self.update_entry(key, branch, draft, objects, existing).await,
            Err(WorkflowError::NotUnderWorkflow(_)) => {
                self.create_entry(key, branch, draft, objects).await
            }
            Err(e) => Err(e),
        }
    }

    async fn create_entry(
        &self,
        key: ContentKey,
        branch: BranchName,
        draft: EntryDraft,
        objects: Objects,
    ) -> Result<PersistOutcome, WorkflowError> {
        let writer = ObjectWriter::new(self.repo.as_ref());
        let tip = self.default_tip().await?;
        let base = self.repo.get_commit(&tip).await.map_err(self.forge_err())?;
        let tree = writer
            .build_tree(Some(&base.tree), object_changes(&objects))
            .await
            .map_err(self.forge_err())?;
        let commit = writer
            .create_commit(&draft.commit_message, &tree, vec![tip], None, None)
            .await
            .map_err(self.forge_err())?;

        match self.repo.create_ref(&branch.ref_path(), &commit.sha).await {
            Ok(()) => {}
            Err(ForgeError::Conflict(_)) => {
                // Left behind by a discard whose metadata delete went through
                // but whose branch delete did not.
                tracing::warn!(%branch, "reusing untracked workflow branch");
                self.repo
                    .update_ref(&branch.ref_path(), &commit.sha, true)
                    .await
                    .map_err(self.forge_err())?;
            }
            Err(e) => return Err(self.forge_err()(e)),
        }

        let pr = if self.is_open_authoring() {
            None
        } else {
            Some(self.open_pr(&branch, &draft.commit_message).await?)
        };

        let user = self.current_user().await?.login.clone();
        let metadata = Metadata {
            kind: METADATA_KIND.to_string(),
            status: draft.status.unwrap_or(self.options.initial_status),
            objects,
            branch: branch.clone(),
            collection: draft.collection,
            commit_message: draft.commit_message,
            user,
            title: draft.title,
            description: draft.description,
            pr,
            version: Some(METADATA_VERSION.to_string()),
            timestamp: UtcTimestamp::now(),
        };
        self.store(&key, &metadata).await?;

        Ok(PersistOutcome {
            key,
            branch,
            head: commit.sha,
            created: true,
            replayed: 0,
            metadata,
        })
    }

    async fn update_entry(
        &self,
        key: ContentKey,
        branch: BranchName,
        draft: EntryDraft,
        objects: Objects,
        mut metadata: Metadata,
    ) -> Result<PersistOutcome, WorkflowError> {
        let removed: Vec<TreeChange> = metadata
            .objects
            .files
            .iter()
            .filter(|old| !objects.files.iter().any(|new| new.path == old.path))
            .map(|old| blob_change(&old.path, None))
            .collect();

        let tip = self.default_tip().await?;
        let rebased = Rebaser::new(self.repo.as_ref())
            .rebase(&branch, &tip)
            .await
            .map_err(self.rebase_err())?;
        let replayed = match &rebased {
            RebaseOutcome::Replayed { replayed, .. } => *replayed,
            RebaseOutcome::UpToDate(_) => 0,
        };
        let head = rebased.into_head();

        let mut changes = removed;
        changes.extend(object_changes(&objects));
        let writer = ObjectWriter::new(self.repo.as_ref());
        let tree = writer
            .build_tree(Some(&head.tree), changes)
            .await
            .map_err(self.forge_err())?;
        let commit = writer
            .create_commit(&draft.commit_message, &tree, vec![head.sha], None, None)
            .await
            .map_err(self.forge_err())?;
        self.repo
            .update_ref(&branch.ref_path(), &commit.sha, true)
            .await
            .map_err(self.forge_err())?;

        if let Some(pr) = metadata.pr.as_mut() {
            pr.head = commit.sha.clone();
        }
        metadata.title = draft.title;
        metadata.description = draft.description;
        metadata.objects = objects;
        metadata.timestamp = UtcTimestamp::now();
        self.store(&key, &metadata).await?;

        Ok(PersistOutcome {
            key,
            branch,
            head: commit.sha,
            created: false,
            replayed,
            metadata,
        })
    }

    /// Commit files straight to the default branch, bypassing the workflow.
    ///
    /// Returns the new default tip.
    pub async fn persist_direct(&self, commit: DirectCommit) -> Result<Oid, WorkflowError> {
        self.ensure_direct_allowed("direct commits")?;
        let mut changes = Vec::with_capacity(commit.files.len());
        for file in &commit.files {
            let object = self.upload(file).await?;
            changes.push(blob_change(&object.path, Some(object.sha)));
        }
        self.commit_to_default(changes, &commit.commit_message).await
    }

    /// Remove files from the default branch.
    pub async fn delete_files(&self, paths: &[String], message: &str) -> Result<Oid, WorkflowError> {
        self.ensure_direct_allowed("deleting files")?;
        let changes = paths.iter().map(|p| blob_change(p, None)).collect();
        self.commit_to_default(changes, message).await
    }

    async fn commit_to_default(
        &self,
        changes: Vec<TreeChange>,
        message: &str,
    ) -> Result<Oid, WorkflowError> {
        let writer = ObjectWriter::new(self.upstream.as_ref());
        let tip = self.default_tip().await?;
        let base = self.upstream.get_commit(&tip).await.map_err(self.forge_err())?;
        let tree = writer
            .build_tree(Some(&base.tree), changes)
            .await
            .map_err(self.forge_err())?;
        let commit = writer
            .create_commit(message, &tree, vec![tip], None, None)
            .await
            .map_err(self.forge_err())?;
        match self
            .upstream
            .update_ref(&self.options.default_branch.ref_path(), &commit.sha, false)
            .await
        {
            Ok(()) => Ok(commit.sha),
            Err(ForgeError::Conflict(message)) => Err(WorkflowError::Conflict(message)),
            Err(e) => Err(self.forge_err()(e)),
        }
    }

    fn ensure_direct_allowed(&self, what: &str) -> Result<(), WorkflowError> {
        if self.is_open_authoring() {
            return Err(WorkflowError::NotPermitted(format!(
                "{what} require write access to {}",
                self.upstream.full_name()
            )));
        }
        Ok(())
    }

    async fn upload(&self, file: &PersistFile) -> Result<ObjectRef, WorkflowError> {
        let sha = ObjectWriter::new(self.repo.as_ref())
            .upload_blob(&file.content)
            .await
            .map_err(self.forge_err())?;
        Ok(ObjectRef {
            path: file.path.trim_start_matches('/').to_string(),
            sha,
        })
    }
}

/// Tree changes writing the entry and every media file.
pub(crate) fn object_changes(objects: &Objects) -> Vec<TreeChange> {
    std::iter::once(&objects.entry)
        .chain(objects.files.iter())
        .map(|o| blob_change(&o.path, Some(o.sha.clone())))
        .collect()
}
