//! core::metadata::store
//!
//! Metadata storage on a dedicated ref.
//!
//! # Architecture
//!
//! Every entry's document lives at `<contentKey>.json` in the tree of
//! `refs/meta/_draftwork`. That ref is never merged anywhere; each write is
//! a commit on top of the previous tip followed by a fast-forward update.
//!
//! The ref is created lazily on the first write with a README so that the
//! tree is never empty.
//!
//! # Serialization
//!
//! Writes are read-modify-write sequences over several remote calls. All
//! `put` and `delete` calls on one store are totally ordered by a FIFO
//! single-permit semaphore. Writers in other processes are detected by the
//! fast-forward check and surface as [`StoreError::Conflict`]; nothing is
//! retried.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use draftwork::core::metadata::store::{MetadataStore, StoreError};
//! use draftwork::core::types::ContentKey;
//! use draftwork::forge::mock::MockForge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new("octo/blog");
//! let store = MetadataStore::new(Arc::new(forge));
//! let key = ContentKey::new("posts/hello").unwrap();
//! assert!(matches!(store.get(&key).await, Err(StoreError::NotFound(_))));
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use super::schema::{parse_metadata, Metadata, MetadataError};
use crate::core::types::{ContentKey, Oid};
use crate::forge::{Forge, ForgeError};
use crate::git::{blob_change, ObjectWriter};

/// Ref holding all metadata documents (as passed to the git-data API).
pub const METADATA_REF: &str = "meta/_draftwork";

/// How long a written document is served from memory.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

const README: &str = "This ref holds Draftwork editorial workflow metadata.\n\
                      It is not meant to be merged or edited by hand.\n";

/// Errors from metadata storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document for this key, or no metadata ref at all.
    #[error("metadata not found for entry: {0}")]
    NotFound(ContentKey),

    /// The metadata ref moved underneath this write.
    #[error("metadata ref was updated concurrently: {0}")]
    Conflict(String),

    #[error(transparent)]
    Parse(#[from] MetadataError),

    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Forge(#[from] ForgeError),
}

#[derive(Debug, Clone)]
struct CachedEntry {
    metadata: Metadata,
    expires: Instant,
}

/// Metadata store for one repository.
pub struct MetadataStore {
    forge: Arc<dyn Forge>,
    gate: Semaphore,
    cache: Mutex<HashMap<ContentKey, CachedEntry>>,
    ttl: Duration,
}

impl MetadataStore {
    pub fn new(forge: Arc<dyn Forge>) -> Self {
        Self {
            forge,
            gate: Semaphore::new(1),
            cache: Mutex::new(HashMap::new()),
            ttl: CACHE_TTL,
        }
    }

    /// Read the document for `key`, from cache when fresh.
    pub async fn get(&self, key: &ContentKey) -> Result<Metadata, StoreError> {
        if let Some(hit) = self.cached(key) {
            tracing::debug!(%key, "metadata cache hit");
            return Ok(hit);
        }

        let git_ref = format!("refs/{METADATA_REF}");
        let file = match self.forge.get_file(&key.metadata_path(), &git_ref).await {
            Ok(file) => file,
            Err(ForgeError::NotFound(_)) => return Err(StoreError::NotFound(key.clone())),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_metadata(&file.content)?)
    }

    /// Write the document for `key`.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if another writer moved the ref first
    pub async fn put(&self, key: &ContentKey, metadata: &Metadata) -> Result<(), StoreError> {
        let _permit = self.permit().await?;

        let tip = self.ensure_ref().await?;
        let json = serde_json::to_vec_pretty(metadata)?;
        let writer = ObjectWriter::new(self.forge.as_ref());
        let blob = writer.upload_blob(&json).await?;
        self.commit_change(&tip, key, Some(blob), &format!("Updating “{key}” metadata"))
            .await?;

        let expires = Instant::now() + self.ttl;
        self.lock_cache().insert(
            key.clone(),
            CachedEntry {
                metadata: metadata.clone(),
                expires,
            },
        );
        Ok(())
    }

    /// Remove the document for `key`.
    ///
    /// Best-effort: failures are logged and swallowed, and deleting a
    /// missing document succeeds.
    pub async fn delete(&self, key: &ContentKey) {
        let result = match self.permit().await {
            Ok(_permit) => self.delete_locked(key).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(%key, error = %e, "failed to delete metadata");
        }
        self.lock_cache().remove(key);
    }

    async fn delete_locked(&self, key: &ContentKey) -> Result<(), StoreError> {
        let tip = match self.forge.get_ref(METADATA_REF).await {
            Ok(tip) => tip,
            Err(ForgeError::NotFound(_)) => {
                tracing::debug!(%key, "no metadata ref, nothing to delete");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.commit_change(&tip, key, None, &format!("Deleting “{key}” metadata"))
            .await
    }

    async fn permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>, StoreError> {
        // The semaphore is never closed while the store is alive.
        self.gate
            .acquire()
            .await
            .map_err(|e| StoreError::Conflict(e.to_string()))
    }

    /// Commit one path change on top of `tip` and fast-forward the ref.
    async fn commit_change(
        &self,
        tip: &Oid,
        key: &ContentKey,
        blob: Option<Oid>,
        message: &str,
    ) -> Result<(), StoreError> {
        let writer = ObjectWriter::new(self.forge.as_ref());
        let parent = self.forge.get_commit(tip).await?;
        let tree = writer
            .build_tree(
                Some(&parent.tree),
                vec![blob_change(&key.metadata_path(), blob)],
            )
            .await?;
        let commit = writer
            .create_commit(message, &tree, vec![tip.clone()], None, None)
            .await?;
        match self.forge.update_ref(METADATA_REF, &commit.sha, false).await {
            Ok(()) => Ok(()),
            Err(ForgeError::Conflict(message)) => Err(StoreError::Conflict(message)),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the metadata ref, creating it on first use.
    async fn ensure_ref(&self) -> Result<Oid, StoreError> {
        match self.forge.get_ref(METADATA_REF).await {
            Ok(tip) => return Ok(tip),
            Err(ForgeError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        tracing::debug!("bootstrapping metadata ref");
        let writer = ObjectWriter::new(self.forge.as_ref());
        let readme = writer.upload_blob(README.as_bytes()).await?;
        let tree = writer
            .build_tree(None, vec![blob_change("README.md", Some(readme))])
            .await?;
        let commit = writer
            .create_commit("First Commit", &tree, Vec::new(), None, None)
            .await?;
        match self.forge.create_ref(METADATA_REF, &commit.sha).await {
            Ok(()) => Ok(commit.sha),
            Err(ForgeError::Conflict(_)) => {
                tracing::debug!("metadata ref created concurrently");
                Ok(self.forge.get_ref(METADATA_REF).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn cached(&self, key: &ContentKey) -> Option<Metadata> {
        let mut cache = self.lock_cache();
        match cache.get(key) {
            Some(entry) if entry.expires > Instant::now() => Some(entry.metadata.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<ContentKey, CachedEntry>> {
        // A poisoned cache only means a panic elsewhere; the map is still usable.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore")
            .field("forge", &self.forge.full_name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::schema::{EntryStatus, ObjectRef, Objects, METADATA_VERSION};
    use crate::core::types::{BranchName, UtcTimestamp};
    use crate::forge::mock::{MockForge, Op};

    fn sample(status: EntryStatus) -> Metadata {
        Metadata {
            kind: "PR".into(),
            status,
            objects: Objects {
                entry: ObjectRef {
                    path: "posts/a.md".into(),
                    sha: Oid::new("a".repeat(40)).unwrap(),
                },
                files: vec![],
            },
            branch: BranchName::new("cms/posts/a").unwrap(),
            collection: "posts".into(),
            commit_message: "Create Post “a”".into(),
            user: "alice".into(),
            title: None,
            description: None,
            pr: None,
            version: Some(METADATA_VERSION.into()),
            timestamp: UtcTimestamp::now(),
        }
    }

    #[tokio::test]
    async fn first_put_bootstraps_ref_with_readme() {
        let forge = MockForge::new("octo/blog");
        let store = MetadataStore::new(Arc::new(forge.clone()));
        let key = ContentKey::new("posts/a").unwrap();

        store.put(&key, &sample(EntryStatus::Draft)).await.unwrap();

        assert!(forge.ref_sha("meta/_draftwork").is_some());
        let paths = forge.paths_at("meta/_draftwork");
        assert_eq!(paths, vec!["README.md".to_string(), "posts/a.json".to_string()]);
    }

    #[tokio::test]
    async fn put_then_get_served_from_cache() {
        let forge = MockForge::new("octo/blog");
        let store = MetadataStore::new(Arc::new(forge.clone()));
        let key = ContentKey::new("posts/a").unwrap();
        let meta = sample(EntryStatus::PendingReview);

        store.put(&key, &meta).await.unwrap();
        let read = store.get(&key).await.unwrap();

        assert_eq!(read, meta);
        assert_eq!(forge.count(Op::GetFile), 0);
    }

    #[tokio::test]
    async fn get_reads_remote_document() {
        let forge = MockForge::new("octo/blog");
        let key = ContentKey::new("posts/a").unwrap();
        let meta = sample(EntryStatus::Draft);
        MetadataStore::new(Arc::new(forge.clone()))
            .put(&key, &meta)
            .await
            .unwrap();

        let fresh = MetadataStore::new(Arc::new(forge.clone()));
        assert_eq!(fresh.get(&key).await.unwrap(), meta);
        assert_eq!(forge.count(Op::GetFile), 1);
    }

    #[tokio::test]
    async fn bootstrap_race_between_stores_never_fails_on_create() {
        // Two stores stand in for two processes; only their final
        // fast-forward can collide.
        let forge = MockForge::new("octo/blog");
        let a = MetadataStore::new(Arc::new(forge.clone()));
        let b = MetadataStore::new(Arc::new(forge.clone()));
        let key_a = ContentKey::new("posts/a").unwrap();
        let key_b = ContentKey::new("posts/b").unwrap();
        let meta = sample(EntryStatus::Draft);

        let (ra, rb) = tokio::join!(a.put(&key_a, &meta), b.put(&key_b, &meta));

        for result in [&ra, &rb] {
            assert!(matches!(result, Ok(()) | Err(StoreError::Conflict(_))));
        }
        assert!(ra.is_ok() || rb.is_ok());
        assert_eq!(forge.count(Op::CreateRef), 2);
        assert!(forge.file_at("meta/_draftwork", "README.md").is_some());
    }

    #[tokio::test]
    async fn delete_without_ref_is_quiet() {
        let forge = MockForge::new("octo/blog");
        let store = MetadataStore::new(Arc::new(forge.clone()));
        let key = ContentKey::new("posts/a").unwrap();

        store.delete(&key).await;
        assert!(forge.ref_sha("meta/_draftwork").is_none());
    }
}
