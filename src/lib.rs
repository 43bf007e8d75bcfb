//! Draftwork - editorial workflow on Git branches and pull requests
//!
//! Draftwork keeps unpublished content on per-entry branches of a hosted
//! Git repository. Each entry moves from `draft` through `pending_review`
//! to `pending_publish`, backed by a pull request against the default
//! branch, and is published by merging that pull request. Workflow state
//! lives in JSON documents on a dedicated metadata ref.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Workflow operations: persist, status, publish, listing
//! - [`core`] - Domain types, content-key naming, metadata, configuration
//! - [`git`] - Commit-graph building and rebasing over the forge API
//! - [`forge`] - Abstraction for remote hosting services (GitHub, in-memory)
//!
//! # Invariants
//!
//! 1. An entry branch and its metadata document share one content key
//! 2. Metadata writes to one store are serialized
//! 3. Every remote change goes through the [`forge::Forge`] trait

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
