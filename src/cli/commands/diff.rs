//! cli::commands::diff
//!
//! Preview how a local collection differs from the published one.
//!
//! Read-only: nothing is written to the host.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::input::{github_forge, load_config, parse_kind};
use crate::reconcile::{preview, ReconcileProfile, RemoteSource};

/// Arguments of `govpub diff`.
#[derive(Debug)]
pub struct DiffArgs {
    pub kind: String,
    pub local_file: PathBuf,
    pub remote_path: Option<String>,
    pub remote_dir: Option<String>,
    pub array_field: Option<String>,
    pub id_field: Option<String>,
}

/// Run the diff command.
pub fn diff(config_path: Option<&Path>, args: DiffArgs, token: Option<&str>) -> Result<Value> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(diff_async(config_path, args, token))
}

/// Read the local collection: a JSON array, optionally under `array_field`.
pub fn read_collection(path: &Path, array_field: Option<&str>) -> Result<Vec<Value>> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let root: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("'{}' is not valid JSON", path.display()))?;

    let items = match array_field {
        Some(field) => root.get(field).cloned(),
        None => Some(root),
    };
    match items {
        Some(Value::Array(items)) => Ok(items),
        _ => bail!("'{}' does not hold a JSON array", path.display()),
    }
}

async fn diff_async(config_path: Option<&Path>, args: DiffArgs, token: Option<&str>) -> Result<Value> {
    let kind = parse_kind(&args.kind, None)?;
    let local = read_collection(&args.local_file, args.array_field.as_deref())?;

    let config = load_config(config_path)?;
    let source = match (args.remote_path, args.remote_dir) {
        (Some(path), _) => RemoteSource::CollectionFile {
            path,
            array_field: args.array_field.clone(),
        },
        (None, Some(folder)) => RemoteSource::Directory { folder },
        (None, None) => RemoteSource::for_kind(&kind, &config),
    };

    let mut profile = ReconcileProfile::for_kind(&kind);
    if let Some(id_field) = args.id_field {
        profile.id_field = id_field;
    }

    let forge = github_forge(&config, token)?;
    let result = preview(&forge, &config, &source, &profile, &local)
        .await
        .context("Failed to reconcile with the published collection")?;

    Ok(serde_json::to_value(&result)?)
}
