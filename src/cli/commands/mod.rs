//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and validates command-specific arguments
//! 2. Calls the publishing engine or the reconciler
//! 3. Returns its JSON output for `cli::run` to print
//!
//! # Async Commands
//!
//! Commands that talk to the host are async. Each one builds its own
//! tokio runtime and blocks on the async implementation.

mod batch;
mod config_cmd;
mod diff;
mod input;
mod publish;

pub use batch::batch;
pub use config_cmd::show as config_show;
pub use diff::diff;
pub use publish::publish;

use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::cli::args::{Command, ConfigAction};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, config_path: Option<&Path>) -> Result<Value> {
    match command {
        Command::Publish {
            kind,
            file,
            name,
            asset_type,
            title,
            description,
            update_of,
            expected_sha,
            host,
        } => publish::publish(
            config_path,
            publish::PublishArgs {
                kind,
                file,
                name,
                asset_type,
                title,
                description,
                update_of,
                expected_sha,
            },
            &host,
        ),
        Command::Batch {
            kind,
            files,
            deletions,
            slug,
            asset_type,
            title,
            description,
            host,
        } => batch::batch(
            config_path,
            batch::BatchArgs {
                kind,
                files,
                deletions,
                slug,
                asset_type,
                title,
                description,
            },
            &host,
        ),
        Command::Diff {
            kind,
            local_file,
            remote_path,
            remote_dir,
            array_field,
            id_field,
            token,
        } => diff::diff(
            config_path,
            diff::DiffArgs {
                kind,
                local_file,
                remote_path,
                remote_dir,
                array_field,
                id_field,
            },
            token.as_deref(),
        ),
        Command::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(config_path),
        },
    }
}
