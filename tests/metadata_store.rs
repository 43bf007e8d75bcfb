//! Metadata store behavior across store instances: caching, write
//! serialization and idempotent deletes.

use std::sync::Arc;
use std::time::Duration;

use draftwork::core::metadata::{
    EntryStatus, Metadata, MetadataStore, ObjectRef, Objects, StoreError, CACHE_TTL, METADATA_REF,
    METADATA_VERSION,
};
use draftwork::core::types::{BranchName, ContentKey, Oid, UtcTimestamp};
use draftwork::forge::mock::{FailOn, MockForge, Op};
use draftwork::forge::ForgeError;

fn key(s: &str) -> ContentKey {
    ContentKey::new(s).unwrap()
}

fn metadata(slug: &str, status: EntryStatus) -> Metadata {
    Metadata {
        kind: "PR".into(),
        status,
        objects: Objects {
            entry: ObjectRef {
                path: format!("content/posts/{slug}.md"),
                sha: Oid::new("b".repeat(40)).unwrap(),
            },
            files: vec![],
        },
        branch: BranchName::new(format!("cms/posts/{slug}")).unwrap(),
        collection: "posts".into(),
        commit_message: format!("Create Post “{slug}”"),
        user: "octo".into(),
        title: Some(slug.to_string()),
        description: None,
        pr: None,
        version: Some(METADATA_VERSION.into()),
        timestamp: UtcTimestamp::now(),
    }
}

#[tokio::test(start_paused = true)]
async fn cached_document_expires_after_ttl() {
    let forge = MockForge::new("octo/blog");
    let ours = MetadataStore::new(Arc::new(forge.clone()));
    let theirs = MetadataStore::new(Arc::new(forge.clone()));
    let k = key("posts/a");

    ours.put(&k, &metadata("a", EntryStatus::Draft)).await.unwrap();
    theirs
        .put(&k, &metadata("a", EntryStatus::PendingReview))
        .await
        .unwrap();

    forge.clear_operations();
    assert_eq!(ours.get(&k).await.unwrap().status, EntryStatus::Draft);
    assert_eq!(forge.count(Op::GetFile), 0, "fresh write is served from memory");

    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(ours.get(&k).await.unwrap().status, EntryStatus::Draft);
    assert_eq!(forge.count(Op::GetFile), 0);

    tokio::time::advance(CACHE_TTL - Duration::from_secs(299) + Duration::from_secs(1)).await;
    assert_eq!(ours.get(&k).await.unwrap().status, EntryStatus::PendingReview);
    assert_eq!(forge.count(Op::GetFile), 1);
}

#[tokio::test]
async fn concurrent_puts_on_one_store_both_land() {
    let forge = MockForge::new("octo/blog");
    let store = MetadataStore::new(Arc::new(forge.clone()));
    let (a, b) = (key("posts/a"), key("posts/b"));
    let meta_a = metadata("a", EntryStatus::Draft);
    let meta_b = metadata("b", EntryStatus::PendingPublish);

    let (first, second) = tokio::join!(store.put(&a, &meta_a), store.put(&b, &meta_b));
    first.unwrap();
    second.unwrap();

    let paths = forge.paths_at(METADATA_REF);
    assert!(paths.contains(&"posts/a.json".to_string()));
    assert!(paths.contains(&"posts/b.json".to_string()));

    // A fresh store has no cache and must read both from the ref.
    let fresh = MetadataStore::new(Arc::new(forge));
    assert_eq!(fresh.get(&a).await.unwrap().status, EntryStatus::Draft);
    assert_eq!(fresh.get(&b).await.unwrap().status, EntryStatus::PendingPublish);
}

#[tokio::test]
async fn deleting_twice_succeeds() {
    let forge = MockForge::new("octo/blog");
    let store = MetadataStore::new(Arc::new(forge.clone()));
    let k = key("posts/a");
    store.put(&k, &metadata("a", EntryStatus::Draft)).await.unwrap();

    store.delete(&k).await;
    store.delete(&k).await;

    assert!(matches!(store.get(&k).await, Err(StoreError::NotFound(_))));
    assert!(!forge
        .paths_at(METADATA_REF)
        .contains(&"posts/a.json".to_string()));
}

#[tokio::test]
async fn conflicting_ref_update_is_not_retried() {
    let forge = MockForge::new("octo/blog");
    let store = MetadataStore::new(Arc::new(forge.clone()));
    let k = key("posts/a");
    store.put(&k, &metadata("a", EntryStatus::Draft)).await.unwrap();

    forge.clear_operations();
    forge.inject(
        FailOn::always(Op::UpdateRef, ForgeError::Conflict("ref moved".into()))
            .on_target("meta"),
    );
    let result = store
        .put(&k, &metadata("a", EntryStatus::PendingReview))
        .await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
    assert_eq!(forge.count(Op::UpdateRef), 1);
    // The failed write must not reach the cache.
    assert_eq!(store.get(&k).await.unwrap().status, EntryStatus::Draft);
}

#[tokio::test]
async fn transport_errors_propagate_from_get() {
    let forge = MockForge::new("octo/blog");
    let store = MetadataStore::new(Arc::new(forge.clone()));
    forge.inject(FailOn::once(Op::GetFile, ForgeError::RateLimited));

    let result = store.get(&key("posts/missing")).await;
    assert!(matches!(
        result,
        Err(StoreError::Forge(ForgeError::RateLimited))
    ));
}
