//! core
//!
//! Core domain types, schemas and storage for Draftwork.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, ContentKey, UtcTimestamp
//! - [`naming`] - Content keys and the branches derived from them
//! - [`metadata`] - Workflow metadata schema and its ref-backed store
//! - [`config`] - Configuration schema and loading

pub mod config;
pub mod metadata;
pub mod naming;
pub mod types;
