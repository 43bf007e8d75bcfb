//! Property-based tests for core domain types.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use draftwork::core::metadata::parse_metadata;
use draftwork::core::naming::{branch_from_content_key, content_key_from_branch, KeyScheme};
use draftwork::core::types::{BranchName, ContentKey};

/// Collection names: no slashes.
fn collection() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,12}"
}

/// Slugs: one to three path segments.
fn slug() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9][a-z0-9-]{0,12}", 1..4).prop_map(|parts| parts.join("/"))
}

/// `owner/repo` of a fork.
fn fork_name() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9-]{0,10}", "[a-z][a-z0-9_-]{0,10}").prop_map(|(o, r)| format!("{o}/{r}"))
}

proptest! {
    #[test]
    fn branch_round_trips_to_key(collection in collection(), slug in slug()) {
        let scheme = KeyScheme::standard();
        let key = scheme.content_key(&collection, &slug).unwrap();
        let branch = branch_from_content_key(&key).unwrap();

        prop_assert_eq!(content_key_from_branch(branch.as_str()), Some(key.clone()));
        prop_assert_eq!(content_key_from_branch(&branch.ref_path()), Some(key.clone()));
        prop_assert_eq!(scheme.split(&key), Some((collection, slug)));
    }

    #[test]
    fn scoped_keys_split_back(fork in fork_name(), collection in collection(), slug in slug()) {
        let scheme = KeyScheme::scoped(fork.clone());
        let key = scheme.content_key(&collection, &slug).unwrap();
        let branch = branch_from_content_key(&key).unwrap();

        prop_assert!(branch.as_str().starts_with(&scheme.branch_prefix()));
        prop_assert_eq!(content_key_from_branch(branch.as_str()), Some(key.clone()));
        prop_assert_eq!(scheme.split(&key), Some((collection.clone(), slug.clone())));
        // A standard scheme reads the scoped key as a different collection.
        prop_assert_ne!(KeyScheme::standard().split(&key), Some((collection, slug)));
    }

    #[test]
    fn non_workflow_branches_have_no_key(name in "[a-bd-z][a-z0-9-]{0,20}") {
        prop_assume!(BranchName::new(name.as_str()).is_ok());
        prop_assert_eq!(content_key_from_branch(&name), None);
    }

    #[test]
    fn legacy_upgrade_keeps_slug(collection in collection(), slug in slug()) {
        let scheme = KeyScheme::standard();
        let old = ContentKey::new(slug.clone()).unwrap();
        let upgraded = scheme.upgrade_legacy(&old, &collection).unwrap();
        prop_assert_eq!(upgraded.as_str(), format!("{collection}/{slug}"));
    }

    #[test]
    fn metadata_parse_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = parse_metadata(&bytes);
    }
}
