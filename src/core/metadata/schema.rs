//! core::metadata::schema
//!
//! Entry metadata document.
//!
//! # Schema Design
//!
//! One JSON document per entry, stored at `<contentKey>.json` on the
//! metadata ref. Field names are camelCase on the wire:
//!
//! ```json
//! {
//!   "type": "PR",
//!   "status": "pending_review",
//!   "objects": {
//!     "entry": { "path": "content/posts/hello.md", "sha": "…" },
//!     "files": [{ "path": "static/img/a.png", "sha": "…" }]
//!   },
//!   "branch": "cms/posts/hello",
//!   "collection": "posts",
//!   "commitMessage": "Create Post “hello”",
//!   "user": "alice",
//!   "pr": { "number": 7, "head": "…" },
//!   "version": "1",
//!   "timestamp": "2024-01-01T00:00:00Z"
//! }
//! ```
//!
//! A document without `version` was written by the legacy key scheme and
//! must be migrated before use.
//!
//! # Example
//!
//! ```
//! use draftwork::core::metadata::schema::{parse_metadata, EntryStatus};
//!
//! let json = r#"{
//!     "type": "PR",
//!     "status": "draft",
//!     "objects": {
//!         "entry": { "path": "posts/a.md", "sha": "abc123def4567890abc123def4567890abc12345" },
//!         "files": []
//!     },
//!     "branch": "cms/posts/a",
//!     "collection": "posts",
//!     "commitMessage": "Create Post “a”",
//!     "user": "alice",
//!     "version": "1",
//!     "timeStamp": "2024-01-01T00:00:00Z"
//! }"#;
//!
//! let meta = parse_metadata(json.as_bytes()).unwrap();
//! assert_eq!(meta.status, EntryStatus::Draft);
//! assert!(!meta.is_legacy());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, Oid, UtcTimestamp};

/// The `type` tag of every metadata document.
pub const METADATA_KIND: &str = "PR";

/// Current document version. Absent on legacy documents.
pub const METADATA_VERSION: &str = "1";

/// Errors from metadata parsing.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to parse metadata: {0}")]
    ParseError(String),

    #[error("invalid type '{found}', expected '{}'", METADATA_KIND)]
    InvalidKind { found: String },

    #[error("unsupported metadata version {0}, supported: {METADATA_VERSION}")]
    UnsupportedVersion(String),

    #[error("invalid metadata value: {0}")]
    InvalidValue(String),
}

/// Workflow status of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Draft,
    PendingReview,
    PendingPublish,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "draft",
            EntryStatus::PendingReview => "pending_review",
            EntryStatus::PendingPublish => "pending_publish",
        }
    }

    /// Parse a wire name (`draft`, `pending_review`, `pending_publish`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EntryStatus::Draft),
            "pending_review" => Some(EntryStatus::PendingReview),
            "pending_publish" => Some(EntryStatus::PendingPublish),
            _ => None,
        }
    }
}

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::Draft
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A path together with the blob sha it had when the entry was saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub path: String,
    pub sha: Oid,
}

/// The entry file and its media files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objects {
    pub entry: ObjectRef,
    #[serde(default)]
    pub files: Vec<ObjectRef>,
}

/// Pull request linkage. Only the number and head commit are recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPr {
    pub number: u64,
    pub head: Oid,
}

/// Metadata for one unpublished entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(rename = "type")]
    pub kind: String,
    pub status: EntryStatus,
    pub objects: Objects,
    pub branch: BranchName,
    pub collection: String,
    pub commit_message: String,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<MetadataPr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(alias = "timeStamp")]
    pub timestamp: UtcTimestamp,
}

impl Metadata {
    /// Written by the legacy key scheme.
    pub fn is_legacy(&self) -> bool {
        self.version.is_none()
    }

    /// Paths of the tracked media files.
    pub fn media_paths(&self) -> Vec<&str> {
        self.objects.files.iter().map(|f| f.path.as_str()).collect()
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.kind != METADATA_KIND {
            return Err(MetadataError::InvalidKind {
                found: self.kind.clone(),
            });
        }
        if let Some(version) = &self.version {
            if version != METADATA_VERSION {
                return Err(MetadataError::UnsupportedVersion(version.clone()));
            }
        }
        if self.objects.entry.path.is_empty() {
            return Err(MetadataError::InvalidValue(
                "objects.entry.path cannot be empty".into(),
            ));
        }
        if self.collection.is_empty() || self.collection.contains('/') {
            return Err(MetadataError::InvalidValue(format!(
                "invalid collection name '{}'",
                self.collection
            )));
        }
        Ok(())
    }
}

/// Parse and validate a metadata document.
pub fn parse_metadata(bytes: &[u8]) -> Result<Metadata, MetadataError> {
    let meta: Metadata =
        serde_json::from_slice(bytes).map_err(|e| MetadataError::ParseError(e.to_string()))?;
    meta.validate()?;
    Ok(meta)
}
