//! git::objects
//!
//! Blob, tree and commit creation through the hosting API.
//!
//! # Example
//!
//! ```
//! use draftwork::forge::mock::MockForge;
//! use draftwork::forge::Forge;
//! use draftwork::git::{blob_change, ObjectWriter};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new("octo/blog");
//! let main = forge.seed_branch("main", &[("README.md", "hi")]);
//!
//! let writer = ObjectWriter::new(&forge);
//! let blob = writer.upload_blob(b"# Hello").await.unwrap();
//! let base = forge.get_commit(&main).await.unwrap().tree;
//! let tree = writer
//!     .build_tree(Some(&base), vec![blob_change("/posts/hello.md", Some(blob))])
//!     .await
//!     .unwrap();
//! let commit = writer
//!     .create_commit("Create Post “hello”", &tree, vec![main], None, None)
//!     .await
//!     .unwrap();
//! assert_eq!(commit.tree, tree);
//! # });
//! ```

use base64::Engine as _;

use crate::core::types::Oid;
use crate::forge::{
    ChangedFile, Commit, CreateCommitRequest, EntryKind, FileStatus, Forge, ForgeError,
    Signature, TreeChange,
};

/// File mode of every blob written by this crate.
pub const BLOB_MODE: &str = "100644";

/// Creates objects on the remote repository.
pub struct ObjectWriter<'a> {
    forge: &'a dyn Forge,
}

impl<'a> ObjectWriter<'a> {
    pub fn new(forge: &'a dyn Forge) -> Self {
        Self { forge }
    }

    /// Upload raw bytes as a blob.
    ///
    /// Content always travels base64-encoded, so text and binary files take
    /// the same path.
    pub async fn upload_blob(&self, bytes: &[u8]) -> Result<Oid, ForgeError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.forge.create_blob(&encoded).await
    }

    /// Create one tree from `base` plus `changes`.
    pub async fn build_tree(
        &self,
        base: Option<&Oid>,
        changes: Vec<TreeChange>,
    ) -> Result<Oid, ForgeError> {
        tracing::debug!(changes = changes.len(), "creating tree");
        self.forge.create_tree(base, changes).await
    }

    pub async fn create_commit(
        &self,
        message: &str,
        tree: &Oid,
        parents: Vec<Oid>,
        author: Option<Signature>,
        committer: Option<Signature>,
    ) -> Result<Commit, ForgeError> {
        self.forge
            .create_commit(CreateCommitRequest {
                message: message.to_string(),
                tree: tree.clone(),
                parents,
                author,
                committer,
            })
            .await
    }
}

/// A blob entry for `path`; `None` deletes it.
pub fn blob_change(path: &str, sha: Option<Oid>) -> TreeChange {
    TreeChange {
        path: path.trim_start_matches('/').to_string(),
        mode: BLOB_MODE.to_string(),
        kind: EntryKind::Blob,
        sha,
    }
}

/// Turn a comparison's file list into tree changes.
///
/// Renames become a deletion of the old path plus an addition of the new
/// one; removals become deletions.
pub fn tree_changes_from_diff(files: &[ChangedFile]) -> Vec<TreeChange> {
    let mut changes = Vec::with_capacity(files.len());
    for file in files {
        match file.status {
            FileStatus::Removed => changes.push(blob_change(&file.filename, None)),
            FileStatus::Renamed => {
                if let Some(previous) = &file.previous_filename {
                    changes.push(blob_change(previous, None));
                }
                changes.push(blob_change(&file.filename, file.sha.clone()));
            }
            _ => changes.push(blob_change(&file.filename, file.sha.clone())),
        }
    }
    changes
}
