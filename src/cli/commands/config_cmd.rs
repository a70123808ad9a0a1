//! config command - Show the resolved configuration

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::core::config::{PublisherConfig, RepositoryCoordinates};

/// Show the resolved configuration and the file it was loaded from.
pub fn show(config_path: Option<&Path>) -> Result<Value> {
    let loaded = PublisherConfig::load(config_path).context("Failed to load configuration")?;
    Ok(describe(&loaded.config, loaded.loaded_from.as_deref()))
}

/// JSON view of a configuration. Never includes credentials.
pub fn describe(config: &PublisherConfig, loaded_from: Option<&Path>) -> Value {
    let RepositoryCoordinates {
        owner,
        name,
        base_branch,
    } = &config.repository;
    let folders = &config.folders;

    json!({
        "loaded_from": loaded_from.map(|p| p.display().to_string()),
        "repository": {
            "owner": owner,
            "name": name,
            "base_branch": base_branch.as_ref().map(|b| b.as_str()),
        },
        "folders": {
            "schemas": folders.schemas,
            "credential_types": folders.credential_types,
            "entities": folders.entities,
            "vocabulary": folders.vocabulary,
            "mappings": folders.mappings,
            "assets": folders.assets,
        },
        "public_base_url": config.public_base_url,
        "api_base": config.api_base,
        "update_policy": config.update_policy.to_string(),
    })
}
