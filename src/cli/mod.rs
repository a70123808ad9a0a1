//! cli
//!
//! Command-line interface layer for govpub.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install the log subscriber (stderr)
//! - Load configuration once and hand it to command handlers
//! - Print one JSON document on stdout per invocation
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers build a forge from the configuration
//! and delegate to [`crate::publish`] and [`crate::reconcile`]. Failures
//! print `{"success": false, "error": ...}` and exit non-zero.

pub mod args;
pub mod commands;

pub use args::Cli;

use std::process::ExitCode;

use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::publish::PublishError;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> ExitCode {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    match commands::dispatch(cli.command, cli.config.as_deref()) {
        Ok(output) => {
            print_json(&output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_json(&error_output(&err));
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; `RUST_LOG` wins unless `--debug` is given.
fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("govpub=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

/// JSON shape of a failed invocation.
pub fn error_output(err: &anyhow::Error) -> serde_json::Value {
    let mut output = json!({
        "success": false,
        "error": format!("{:#}", err),
    });

    if let Some(publish) = err.downcast_ref::<PublishError>() {
        output["kind"] = json!(publish.kind());
        if let Some(branch) = publish.orphaned_branch() {
            output["orphaned_branch"] = json!(branch.as_str());
        }
    }
    output
}
