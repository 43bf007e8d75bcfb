//! core::naming
//!
//! Content keys and workflow branch names.
//!
//! # Scheme
//!
//! An entry is addressed by a content key derived from its collection and
//! slug. The key determines both the branch that holds the entry's commits
//! and the path of its metadata document:
//!
//! | Variant   | Content key                      | Branch                               |
//! |-----------|----------------------------------|--------------------------------------|
//! | standard  | `posts/hello`                    | `cms/posts/hello`                    |
//! | fork      | `alice/blog/posts/hello`         | `cms/alice/blog/posts/hello`         |
//!
//! Collection names never contain `/`; slugs may.
//!
//! # Example
//!
//! ```
//! use draftwork::core::naming::{branch_from_content_key, content_key_from_branch, KeyScheme};
//!
//! let scheme = KeyScheme::standard();
//! let key = scheme.content_key("posts", "2024/hello").unwrap();
//! let branch = branch_from_content_key(&key).unwrap();
//! assert_eq!(branch.as_str(), "cms/posts/2024/hello");
//!
//! let back = content_key_from_branch("refs/heads/cms/posts/2024/hello").unwrap();
//! assert_eq!(scheme.split(&back), Some(("posts".to_string(), "2024/hello".to_string())));
//! ```

use crate::core::types::{BranchName, ContentKey, TypeError};

/// Prefix of every workflow branch.
pub const CMS_BRANCH_PREFIX: &str = "cms";

/// How content keys are formed for one workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    /// `owner/repo` of the fork holding entry branches, fork variant only
    namespace: Option<String>,
}

impl KeyScheme {
    /// Keys of the form `collection/slug`.
    pub fn standard() -> Self {
        Self { namespace: None }
    }

    /// Keys of the form `owner/repo/collection/slug`.
    pub fn scoped(repo_full_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(repo_full_name.into()),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Derive the content key for an entry.
    pub fn content_key(&self, collection: &str, slug: &str) -> Result<ContentKey, TypeError> {
        match &self.namespace {
            Some(ns) => ContentKey::new(format!("{ns}/{collection}/{slug}")),
            None => ContentKey::new(format!("{collection}/{slug}")),
        }
    }

    /// Recover `(collection, slug)` from a key produced by this scheme.
    ///
    /// Returns `None` when the key belongs to another namespace or has no
    /// collection part.
    pub fn split(&self, key: &ContentKey) -> Option<(String, String)> {
        let rest = match &self.namespace {
            Some(ns) => key.as_str().strip_prefix(ns.as_str())?.strip_prefix('/')?,
            None => key.as_str(),
        };
        let (collection, slug) = rest.split_once('/')?;
        if collection.is_empty() || slug.is_empty() {
            return None;
        }
        Some((collection.to_string(), slug.to_string()))
    }

    /// Ref-listing prefix for this scheme's branches (without `heads/`).
    pub fn branch_prefix(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{CMS_BRANCH_PREFIX}/{ns}/"),
            None => format!("{CMS_BRANCH_PREFIX}/"),
        }
    }

    /// Map a legacy key (the bare slug, optionally namespaced) to the
    /// current `collection/slug` form.
    pub fn upgrade_legacy(&self, old: &ContentKey, collection: &str) -> Result<ContentKey, TypeError> {
        let slug = match &self.namespace {
            Some(ns) => old
                .as_str()
                .strip_prefix(ns.as_str())
                .and_then(|s| s.strip_prefix('/'))
                .unwrap_or(old.as_str()),
            None => old.as_str(),
        };
        self.content_key(collection, slug)
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self::standard()
    }
}

/// Branch holding the commits of `key`.
pub fn branch_from_content_key(key: &ContentKey) -> Result<BranchName, TypeError> {
    BranchName::new(format!("{CMS_BRANCH_PREFIX}/{key}"))
}

/// Inverse of [`branch_from_content_key`].
///
/// Accepts `cms/<key>` and `refs/heads/cms/<key>`; anything else is not a
/// workflow branch.
pub fn content_key_from_branch(branch: &str) -> Option<ContentKey> {
    let branch = branch.strip_prefix("refs/heads/").unwrap_or(branch);
    let key = branch
        .strip_prefix(CMS_BRANCH_PREFIX)?
        .strip_prefix('/')?;
    ContentKey::new(key).ok()
}
