//! forge
//!
//! Abstraction for remote hosting services.
//!
//! # Architecture
//!
//! The `Forge` trait is the only way the rest of the crate reaches the
//! remote repository. Commands use the [`create_forge`] factory function
//! rather than importing specific forge implementations directly.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: Forge selection and creation
//!
//! # Example
//!
//! ```ignore
//! use draftwork::forge::{create_forge, Forge};
//!
//! let forge = create_forge("octo/blog", &token, None, None)?;
//! let main = forge.get_ref("heads/main").await?;
//! ```

mod factory;
pub mod github;
pub mod mock;
mod traits;

pub use factory::{create_forge, detect_provider, valid_forge_names, ForgeProvider};
pub use traits::*;
