//! End-to-end editorial workflow on a single repository.

use std::sync::Arc;

use draftwork::core::metadata::{EntryStatus, METADATA_REF};
use draftwork::engine::{
    EntryDraft, PersistFile, PublishOutcome, Workflow, WorkflowError, WorkflowOptions,
};
use draftwork::forge::mock::{MockForge, Op};
use draftwork::forge::{MergeMethod, PrState};

fn setup() -> (MockForge, Workflow) {
    let forge = MockForge::new("octo/blog");
    forge.seed_branch("main", &[("README.md", "blog")]);
    let workflow = Workflow::new(Arc::new(forge.clone()), WorkflowOptions::default());
    (forge, workflow)
}

fn post(slug: &str, body: &str) -> EntryDraft {
    EntryDraft::new(
        "posts",
        slug,
        PersistFile::new(format!("content/posts/{slug}.md"), body),
        format!("Create Post “{slug}”"),
    )
}

#[tokio::test]
async fn draft_review_publish() {
    let (forge, workflow) = setup();

    let saved = workflow
        .persist_entry(post("hello", "# Hello").with_media(PersistFile::new("static/hello.png", "png")))
        .await
        .unwrap();
    assert!(saved.created);
    assert_eq!(saved.metadata.status, EntryStatus::Draft);

    let listed = workflow.list_unpublished().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content_key.as_str(), "posts/hello");

    workflow
        .update_status("posts", "hello", EntryStatus::PendingReview)
        .await
        .unwrap();
    let ready = workflow
        .update_status("posts", "hello", EntryStatus::PendingPublish)
        .await
        .unwrap();
    assert_eq!(ready.pr, saved.metadata.pr, "status changes keep the pull request");
    assert_eq!(forge.count(Op::CreatePr), 1);

    let outcome = workflow.publish("posts", "hello").await.unwrap();
    let number = saved.metadata.pr.unwrap().number;
    assert_eq!(outcome, PublishOutcome::Merged { number });

    assert_eq!(forge.file_at("main", "content/posts/hello.md").as_deref(), Some("# Hello"));
    assert_eq!(forge.file_at("main", "static/hello.png").as_deref(), Some("png"));
    assert_eq!(forge.pr(number).unwrap().state, PrState::Merged);
    assert!(forge.ref_sha("heads/cms/posts/hello").is_none());
    assert!(!forge
        .paths_at(METADATA_REF)
        .contains(&"posts/hello.json".to_string()));
    assert!(workflow.list_unpublished().await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_after_main_moved_then_publish() {
    let (forge, workflow) = setup();
    workflow.persist_entry(post("hello", "v1")).await.unwrap();
    forge.commit_files("main", &[("about.md", Some("about"))], "unrelated change");

    let updated = workflow.persist_entry(post("hello", "v2")).await.unwrap();
    assert!(!updated.created);
    assert_eq!(updated.replayed, 1);

    // The rebased branch sits on the new tip, so a normal merge works.
    let outcome = workflow.publish("posts", "hello").await.unwrap();
    assert!(matches!(outcome, PublishOutcome::Merged { .. }));
    assert_eq!(forge.file_at("main", "content/posts/hello.md").as_deref(), Some("v2"));
    assert_eq!(forge.file_at("main", "about.md").as_deref(), Some("about"));
}

#[tokio::test]
async fn refused_merge_falls_back_to_direct_commit() {
    let (forge, workflow) = setup();
    let saved = workflow.persist_entry(post("hello", "# Hello")).await.unwrap();
    let number = saved.metadata.pr.unwrap().number;
    forge.commit_files("main", &[("about.md", Some("about"))], "unrelated change");

    let outcome = workflow.publish("posts", "hello").await.unwrap();

    let PublishOutcome::ForceMerged { commit, .. } = &outcome else {
        panic!("expected forced merge, got {outcome:?}");
    };
    assert_eq!(forge.ref_sha("heads/main").as_ref(), Some(commit));
    let message = forge.commit_info(commit).unwrap().message;
    assert!(message.contains("* \"content/posts/hello.md\""));
    assert_eq!(forge.file_at("main", "content/posts/hello.md").as_deref(), Some("# Hello"));
    assert_eq!(forge.file_at("main", "about.md").as_deref(), Some("about"));
    assert_eq!(forge.count(Op::MergePr), 1);
    assert_eq!(forge.pr(number).unwrap().state, PrState::Closed);
    assert!(forge.ref_sha("heads/cms/posts/hello").is_none());
}

#[tokio::test]
async fn squash_method_is_passed_through() {
    let forge = MockForge::new("octo/blog");
    forge.seed_branch("main", &[("README.md", "blog")]);
    let options = WorkflowOptions {
        merge_method: MergeMethod::Squash,
        ..WorkflowOptions::default()
    };
    let workflow = Workflow::new(Arc::new(forge.clone()), options);
    workflow.persist_entry(post("hello", "x")).await.unwrap();

    workflow.publish("posts", "hello").await.unwrap();

    assert!(forge.operations().iter().any(|op| matches!(
        op,
        draftwork::forge::mock::MockOperation::MergePr {
            method: MergeMethod::Squash,
            ..
        }
    )));
}

#[tokio::test]
async fn discarded_entry_is_gone_everywhere() {
    let (forge, workflow) = setup();
    let saved = workflow.persist_entry(post("hello", "x")).await.unwrap();
    let number = saved.metadata.pr.unwrap().number;

    workflow.delete_entry("posts", "hello").await.unwrap();

    assert_eq!(forge.pr(number).unwrap().state, PrState::Closed);
    assert!(forge.ref_sha("heads/cms/posts/hello").is_none());
    assert!(matches!(
        workflow.unpublished_entry("posts", "hello").await,
        Err(WorkflowError::NotUnderWorkflow(_))
    ));
    assert_eq!(forge.paths_at("main"), vec!["README.md".to_string()]);
}

#[tokio::test]
async fn slugs_with_slashes_map_to_nested_branches() {
    let (forge, workflow) = setup();
    workflow.persist_entry(post("2024/hello", "x")).await.unwrap();

    assert!(forge.ref_sha("heads/cms/posts/2024/hello").is_some());
    let entry = workflow.unpublished_entry("posts", "2024/hello").await.unwrap();
    assert_eq!(entry.key.as_str(), "posts/2024/hello");
    assert_eq!(entry.content, b"x");
}
