//! govpub - Publish governance documents to a Git-hosted registry
//!
//! govpub turns schemas, credential types, entity statements, vocabulary
//! terms, mappings and binary assets into pull requests against a
//! registry repository. Every change lands on a fresh branch; nothing is
//! ever written to the base branch directly.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to publish/reconcile)
//! - [`publish`] - Single and atomic batch publishing, pull request composition
//! - [`reconcile`] - Local vs published collection diffing
//! - [`forge`] - Abstraction over the Git host (GitHub, plus an in-memory mock)
//! - [`core`] - Domain types, document kinds, naming and configuration
//!
//! # Guarantees
//!
//! 1. The base branch is never modified
//! 2. A batch publish is one commit, and its branch exists only once the commit does
//! 3. Updates are checked against the content hash the caller last saw

pub mod cli;
pub mod core;
pub mod forge;
pub mod publish;
pub mod reconcile;
