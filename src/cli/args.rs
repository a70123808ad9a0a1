//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--debug`: Enable debug logging (stderr)
//! - `--config <path>`: Read this config file instead of searching

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// govpub - Publish governance documents as reviewable pull requests
#[derive(Parser, Debug)]
#[command(name = "govpub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file to use instead of the default locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Host credentials and the acting user.
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// GitHub token with contents and pull request write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Login of the user the change is attributed to
    #[arg(long, env = "GOVPUB_ACTOR", default_value = "govpub")]
    pub actor: String,

    /// Display name of the acting user
    #[arg(long, value_name = "NAME")]
    pub actor_name: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish one document as its own pull request
    #[command(after_help = "\
EXAMPLES:
    # Add a schema (name taken from the file stem)
    govpub publish schema ./address-v1.json

    # Update an entity statement, failing if it changed since you read it
    govpub publish entity ./acme.json --update-of acme --expected-sha <sha>

    # Publish a logo asset
    govpub publish asset ./acme.png --asset-type logo")]
    Publish {
        /// Document kind: schema, vct, entity, vocab, mapping, asset
        kind: String,

        /// File holding the document (JSON for every kind except asset)
        file: PathBuf,

        /// Document name; defaults to the file stem (file name for assets)
        #[arg(long)]
        name: Option<String>,

        /// Asset type (required for kind asset)
        #[arg(long)]
        asset_type: Option<String>,

        /// Pull request title
        #[arg(long)]
        title: Option<String>,

        /// Pull request description
        #[arg(long)]
        description: Option<String>,

        /// Name of the existing document this updates
        #[arg(long, value_name = "NAME")]
        update_of: Option<String>,

        /// Content hash last seen on the base branch
        #[arg(long, value_name = "SHA")]
        expected_sha: Option<String>,

        #[command(flatten)]
        host: HostArgs,
    },

    /// Publish many documents of one kind as a single atomic commit
    Batch {
        /// Document kind: schema, vct, entity, vocab, mapping, asset
        kind: String,

        /// Files holding the documents
        files: Vec<PathBuf>,

        /// Remove the named document in the same commit (repeatable)
        #[arg(long = "delete", value_name = "NAME")]
        deletions: Vec<String>,

        /// Branch slug
        #[arg(long)]
        slug: Option<String>,

        /// Asset type (required for kind asset)
        #[arg(long)]
        asset_type: Option<String>,

        /// Pull request title
        #[arg(long)]
        title: Option<String>,

        /// Pull request description
        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        host: HostArgs,
    },

    /// Compare a local collection with the published one
    Diff {
        /// Document kind: schema, vct, entity, vocab, mapping
        kind: String,

        /// JSON file holding the local collection (an array)
        local_file: PathBuf,

        /// Remote collection file instead of the kind's folder
        #[arg(long, conflicts_with = "remote_dir", value_name = "PATH")]
        remote_path: Option<String>,

        /// Remote folder instead of the kind's folder
        #[arg(long, value_name = "FOLDER")]
        remote_dir: Option<String>,

        /// Field holding the array in the local file and remote collection file
        #[arg(long, value_name = "FIELD")]
        array_field: Option<String>,

        /// Identifier field; defaults to the kind's profile
        #[arg(long, value_name = "FIELD")]
        id_field: Option<String>,

        /// GitHub token
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the resolved configuration and where it came from
    Show,
}
