//! Shared helpers: configuration, forge construction and document files.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use crate::cli::args::HostArgs;
use crate::core::config::PublisherConfig;
use crate::core::document::{Document, DocumentKind};
use crate::forge::github::GitHubForge;
use crate::publish::Actor;

pub fn load_config(config_path: Option<&Path>) -> Result<PublisherConfig> {
    let loaded = PublisherConfig::load(config_path).context("Failed to load configuration")?;
    Ok(loaded.config)
}

pub fn github_forge(config: &PublisherConfig, token: Option<&str>) -> Result<GitHubForge> {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => Ok(GitHubForge::from_config(config, token)),
        None => bail!("No GitHub token. Pass --token or set GITHUB_TOKEN."),
    }
}

pub fn actor(host: &HostArgs) -> Actor {
    let actor = Actor::new(host.actor.trim());
    match &host.actor_name {
        Some(name) => actor.with_display_name(name.trim()),
        None => actor,
    }
}

pub fn parse_kind(kind: &str, asset_type: Option<&str>) -> Result<DocumentKind> {
    match DocumentKind::parse(kind, asset_type) {
        Some(kind) => Ok(kind),
        None if kind.eq_ignore_ascii_case("asset") => {
            bail!("Kind 'asset' needs --asset-type")
        }
        None => bail!(
            "Unknown document kind '{}'. Expected one of: schema, vct, entity, vocab, mapping, asset",
            kind
        ),
    }
}

/// Read a document file.
///
/// Assets are taken verbatim and named after the file; every other kind
/// must be JSON and is named after the file stem.
pub fn read_document(kind: &DocumentKind, path: &Path, name: Option<&str>) -> Result<Document> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;

    let default_name = match kind {
        DocumentKind::Asset { .. } => path.file_name(),
        _ => path.file_stem(),
    }
    .map(|n| n.to_string_lossy().to_string());
    let name = match name.map(str::to_string).or(default_name) {
        Some(name) => name,
        None => bail!("Cannot derive a document name from '{}'", path.display()),
    };

    match kind {
        DocumentKind::Asset { .. } => Ok(Document::binary(name, bytes)),
        _ => {
            let value: Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("'{}' is not valid JSON", path.display()))?;
            Ok(Document::json(name, value))
        }
    }
}
