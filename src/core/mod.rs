//! core
//!
//! Core domain types, schemas, and configuration for govpub.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RefName
//! - [`naming`] - Publish branch naming rules
//! - [`config`] - Configuration schema and loading
//! - [`document`] - Publish targets and the document encoder
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here performs network I/O

pub mod config;
pub mod document;
pub mod naming;
pub mod types;
