//! forge
//!
//! Abstraction for the version-control host.
//!
//! # Architecture
//!
//! The `Forge` trait defines every host operation the publishing engine
//! performs. The engine only ever sees `&dyn Forge`, so production code uses
//! [`github::GitHubForge`] and tests use [`mock::MockForge`].
//!
//! - Forge operations are invoked only after local validation has passed
//! - Forge calls are never retried here
//! - Absence (a missing file or folder) is `Ok(None)`, not an error
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: In-memory implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use govpub::forge::github::GitHubForge;
//! use govpub::forge::Forge;
//!
//! let forge = GitHubForge::from_config(&config, token);
//! let head = forge.get_branch_head(&base).await?;
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
