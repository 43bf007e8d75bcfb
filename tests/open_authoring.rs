//! Open authoring: a contributor saves in a fork and asks for review
//! upstream, while maintainers act on the pull request directly.

use std::sync::Arc;

use draftwork::core::metadata::{EntryStatus, METADATA_REF};
use draftwork::engine::{
    EntryDraft, PersistFile, PublishOutcome, Workflow, WorkflowError, WorkflowOptions,
};
use draftwork::forge::mock::{MockForge, Op};
use draftwork::forge::PrState;

struct Network {
    upstream: MockForge,
    fork: MockForge,
    workflow: Workflow,
}

fn network() -> Network {
    let upstream = MockForge::new("octo/blog");
    upstream.seed_branch("main", &[("README.md", "blog")]);
    let fork = upstream.fork("alice");
    let workflow = Workflow::open_authoring(
        Arc::new(fork.clone()),
        Arc::new(upstream.clone()),
        WorkflowOptions::default(),
    );
    Network {
        upstream,
        fork,
        workflow,
    }
}

fn post(slug: &str) -> EntryDraft {
    EntryDraft::new(
        "posts",
        slug,
        PersistFile::new(format!("content/posts/{slug}.md"), format!("# {slug}")),
        format!("Create Post “{slug}”"),
    )
}

#[tokio::test]
async fn entry_lives_in_fork_until_review() {
    let net = network();
    let saved = net.workflow.persist_entry(post("a")).await.unwrap();

    assert_eq!(saved.key.as_str(), "alice/blog/posts/a");
    assert!(saved.metadata.pr.is_none());
    assert!(net.fork.ref_sha("heads/cms/alice/blog/posts/a").is_some());
    assert!(net.fork.ref_sha(METADATA_REF).is_some());
    assert!(net.upstream.ref_sha(METADATA_REF).is_none());
    assert!(net.upstream.all_prs().is_empty());

    let meta = net
        .workflow
        .update_status("posts", "a", EntryStatus::PendingReview)
        .await
        .unwrap();
    let pr = net.upstream.pr(meta.pr.unwrap().number).unwrap();
    assert_eq!(pr.state, PrState::Open);
    assert_eq!(pr.head, "cms/alice/blog/posts/a");
    assert_eq!(pr.head_repo.as_deref(), Some("alice/blog"));
}

#[tokio::test]
async fn external_merge_removes_entry_from_listing() {
    let net = network();
    net.workflow.persist_entry(post("a")).await.unwrap();
    net.workflow.persist_entry(post("b")).await.unwrap();
    let number = net
        .workflow
        .update_status("posts", "a", EntryStatus::PendingReview)
        .await
        .unwrap()
        .pr
        .unwrap()
        .number;

    net.upstream.merge_pr_externally(number).unwrap();
    assert_eq!(
        net.upstream.file_at("main", "content/posts/a.md").as_deref(),
        Some("# a")
    );

    let listed = net.workflow.list_unpublished().await.unwrap();
    let keys: Vec<&str> = listed.iter().map(|e| e.content_key.as_str()).collect();
    assert_eq!(keys, vec!["alice/blog/posts/b"]);
    assert!(net.fork.ref_sha("heads/cms/alice/blog/posts/a").is_none());
    assert!(!net
        .fork
        .paths_at(METADATA_REF)
        .contains(&"alice/blog/posts/a.json".to_string()));
    assert!(matches!(
        net.workflow.unpublished_entry("posts", "a").await,
        Err(WorkflowError::NotUnderWorkflow(_))
    ));
}

#[tokio::test]
async fn closed_then_reopened_keeps_one_pull_request() {
    let net = network();
    net.workflow.persist_entry(post("a")).await.unwrap();
    let number = net
        .workflow
        .update_status("posts", "a", EntryStatus::PendingReview)
        .await
        .unwrap()
        .pr
        .unwrap()
        .number;

    net.upstream.close_pr_externally(number).unwrap();
    let listed = net.workflow.list_unpublished().await.unwrap();
    assert_eq!(listed[0].metadata.status, EntryStatus::Draft);

    let meta = net
        .workflow
        .update_status("posts", "a", EntryStatus::PendingReview)
        .await
        .unwrap();
    assert_eq!(meta.pr.map(|p| p.number), Some(number));
    assert_eq!(net.upstream.pr(number).unwrap().state, PrState::Open);
    assert_eq!(net.upstream.count(Op::CreatePr), 1);
}

#[tokio::test]
async fn back_to_draft_closes_upstream_pr() {
    let net = network();
    net.workflow.persist_entry(post("a")).await.unwrap();
    let number = net
        .workflow
        .update_status("posts", "a", EntryStatus::PendingReview)
        .await
        .unwrap()
        .pr
        .unwrap()
        .number;

    net.workflow
        .update_status("posts", "a", EntryStatus::Draft)
        .await
        .unwrap();

    assert_eq!(net.upstream.pr(number).unwrap().state, PrState::Closed);
}

#[tokio::test]
async fn contributors_cannot_mark_ready() {
    let net = network();
    net.workflow.persist_entry(post("a")).await.unwrap();

    assert!(matches!(
        net.workflow
            .update_status("posts", "a", EntryStatus::PendingPublish)
            .await,
        Err(WorkflowError::InvalidStatus(_))
    ));
    assert!(net.upstream.all_prs().is_empty());
}

#[tokio::test]
async fn review_then_publish_merges_upstream() {
    let net = network();
    net.workflow.persist_entry(post("a")).await.unwrap();
    let number = net
        .workflow
        .update_status("posts", "a", EntryStatus::PendingReview)
        .await
        .unwrap()
        .pr
        .unwrap()
        .number;

    let outcome = net.workflow.publish("posts", "a").await.unwrap();

    assert_eq!(outcome, PublishOutcome::Merged { number });
    assert_eq!(net.upstream.pr(number).unwrap().state, PrState::Merged);
    assert_eq!(
        net.upstream.file_at("main", "content/posts/a.md").as_deref(),
        Some("# a")
    );
    assert!(net.fork.ref_sha("heads/cms/alice/blog/posts/a").is_none());
    assert!(net.workflow.list_unpublished().await.unwrap().is_empty());
}

#[tokio::test]
async fn edits_after_review_update_the_pull_request_head() {
    let net = network();
    net.workflow.persist_entry(post("a")).await.unwrap();
    let number = net
        .workflow
        .update_status("posts", "a", EntryStatus::PendingReview)
        .await
        .unwrap()
        .pr
        .unwrap()
        .number;

    let saved = net.workflow.persist_entry(post("a")).await.unwrap();

    assert_eq!(saved.metadata.pr.as_ref().map(|p| p.number), Some(number));
    assert_eq!(net.upstream.pr(number).unwrap().head_sha, saved.head);
    assert_eq!(saved.metadata.status, EntryStatus::PendingReview);
}
