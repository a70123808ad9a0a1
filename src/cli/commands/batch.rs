//! cli::commands::batch
//!
//! Publish many documents of one kind as a single atomic commit.
//!
//! # Example
//!
//! ```bash
//! govpub batch vocab terms/*.json --delete retired-term --slug spring-terms
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use super::input::{actor, github_forge, load_config, parse_kind, read_document};
use crate::cli::args::HostArgs;
use crate::publish::{BatchRequest, Publisher};

/// Arguments of `govpub batch`.
#[derive(Debug)]
pub struct BatchArgs {
    pub kind: String,
    pub files: Vec<PathBuf>,
    pub deletions: Vec<String>,
    pub slug: Option<String>,
    pub asset_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Run the batch command.
pub fn batch(config_path: Option<&Path>, args: BatchArgs, host: &HostArgs) -> Result<Value> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(batch_async(config_path, args, host))
}

async fn batch_async(config_path: Option<&Path>, args: BatchArgs, host: &HostArgs) -> Result<Value> {
    let kind = parse_kind(&args.kind, args.asset_type.as_deref())?;
    let documents = args
        .files
        .iter()
        .map(|file| read_document(&kind, file, None))
        .collect::<Result<Vec<_>>>()?;

    let mut request = BatchRequest::new(kind.clone(), documents).with_deletions(args.deletions);
    request.slug = args.slug;
    request.title = args.title;
    request.description = args.description;

    let config = load_config(config_path)?;
    let forge = github_forge(&config, host.token.as_deref())?;
    let publisher = Publisher::new(&forge, &config);

    let outcome = publisher
        .publish_batch(request, &actor(host))
        .await
        .with_context(|| format!("Failed to publish batch of {}", kind.plural_label()))?;

    Ok(serde_json::to_value(&outcome)?)
}
