//! git
//!
//! Remote Git object construction and history rewriting.
//!
//! # Architecture
//!
//! There is no local repository. Blobs, trees and commits are created on
//! the host through [`Forge`](crate::forge::Forge) calls, and history is
//! rewritten by replaying commits remotely.
//!
//! # Modules
//!
//! - [`objects`] - Blob, tree and commit creation
//! - [`rebase`] - Replay a branch onto a new base
//!
//! # Invariants
//!
//! - Objects are immutable; only refs move
//! - Objects orphaned by a failed pipeline are left for the host to collect

pub mod objects;
pub mod rebase;

pub use objects::{blob_change, tree_changes_from_diff, ObjectWriter, BLOB_MODE};
pub use rebase::{RebaseError, RebaseOutcome, Rebaser};
