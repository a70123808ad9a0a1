//! cli::commands::publish
//!
//! Publish one document as its own pull request.
//!
//! # Example
//!
//! ```bash
//! govpub publish schema ./address-v1.json --actor alice
//! govpub publish vocab ./given-name.json --update-of given-name --expected-sha 3f2a...
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use super::input::{actor, github_forge, load_config, parse_kind, read_document};
use crate::cli::args::HostArgs;
use crate::core::types::Oid;
use crate::publish::{PublishRequest, Publisher};

/// Arguments of `govpub publish`.
#[derive(Debug)]
pub struct PublishArgs {
    pub kind: String,
    pub file: PathBuf,
    pub name: Option<String>,
    pub asset_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub update_of: Option<String>,
    pub expected_sha: Option<String>,
}

/// Run the publish command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn publish(config_path: Option<&Path>, args: PublishArgs, host: &HostArgs) -> Result<Value> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(publish_async(config_path, args, host))
}

async fn publish_async(
    config_path: Option<&Path>,
    args: PublishArgs,
    host: &HostArgs,
) -> Result<Value> {
    let kind = parse_kind(&args.kind, args.asset_type.as_deref())?;
    let document = read_document(&kind, &args.file, args.name.as_deref())?;

    let mut request = PublishRequest::new(document);
    request.title = args.title;
    request.description = args.description;
    request.update_of = args.update_of;
    request.expected_sha = args
        .expected_sha
        .map(Oid::new)
        .transpose()
        .context("Invalid --expected-sha")?;

    let config = load_config(config_path)?;
    let forge = github_forge(&config, host.token.as_deref())?;
    let publisher = Publisher::new(&forge, &config);

    let outcome = publisher
        .publish(&kind, request, &actor(host))
        .await
        .with_context(|| format!("Failed to publish {}", kind))?;

    Ok(serde_json::to_value(&outcome)?)
}
