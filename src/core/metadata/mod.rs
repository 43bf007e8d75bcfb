//! core::metadata
//!
//! Entry metadata schema and storage.
//!
//! # Modules
//!
//! - [`schema`] - Metadata document types
//! - [`store`] - Storage on the `refs/meta/_draftwork` ref
//!
//! # Architecture
//!
//! The metadata ref is an orphan history whose tree holds one
//! `<contentKey>.json` document per unpublished entry. It is the only
//! place workflow status is recorded; pull requests are linked from it.

pub mod schema;
pub mod store;

// Re-export commonly used types
pub use schema::{
    parse_metadata, EntryStatus, Metadata, MetadataError, MetadataPr, ObjectRef, Objects,
    METADATA_KIND, METADATA_VERSION,
};
pub use store::{MetadataStore, StoreError, CACHE_TTL, METADATA_REF};
