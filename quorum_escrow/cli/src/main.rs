//! `quorum` command line front end for the escrow vault.
//!
//! Entries live in a directory store (one JSON file per fingerprint), so
//! successive invocations see each other's entries.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use quorum_engine::logging::init_logging;
use quorum_engine::{DirectoryEntryStore, Role, Vault, VaultConfig};
use serde_json::Value;
use tracing::debug;

#[derive(Parser)]
#[command(name = "quorum", version, about = "Threshold escrow vault CLI")]
struct Cli {
    /// Directory holding one JSON document per entry
    #[arg(long, env = "QUORUM_STORE_DIR", default_value = "./vault-data")]
    store_dir: PathBuf,

    /// Also write daily rolling logs to this directory
    #[arg(long, env = "QUORUM_LOG_DIR")]
    log_dir: Option<String>,

    /// Write file logs as JSON instead of logfmt
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a JSON payload and split its key across the configured roles
    Create {
        /// Inline JSON payload
        #[arg(long, conflicts_with = "payload_file", required_unless_present = "payload_file")]
        payload: Option<String>,

        /// Read the JSON payload from a file
        #[arg(long)]
        payload_file: Option<PathBuf>,

        /// Shares required to reconstruct (defaults to QUORUM_THRESHOLD)
        #[arg(short, long)]
        threshold: Option<u8>,

        /// Shares to issue (defaults to QUORUM_PARTS)
        #[arg(short, long)]
        parts: Option<u8>,
    },

    /// Recover a payload from a quorum of role shares
    Reconstruct {
        #[arg(short, long)]
        fingerprint: String,

        /// Role share as `role=wrapped-share`; repeat once per role
        #[arg(short, long = "share", value_parser = parse_share)]
        shares: Vec<(Role, String)>,
    },

    /// Show the metadata of one entry
    Show {
        #[arg(short, long)]
        fingerprint: String,
    },

    /// List every entry in the store
    List,

    /// Print an entry's persisted JSON document
    Export {
        #[arg(short, long)]
        fingerprint: String,
    },

    /// Register an entry from an exported JSON document
    Import {
        #[arg(long)]
        file: PathBuf,
    },
}

fn parse_share(raw: &str) -> std::result::Result<(Role, String), String> {
    let (role, wrapped) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected role=share, got {raw:?}"))?;
    let role = Role::new(role).map_err(|e| e.to_string())?;
    if wrapped.is_empty() {
        return Err(format!("empty share for role {role}"));
    }
    Ok((role, wrapped.to_string()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive until exit so buffered file logs are flushed
    let _guard = init_logging(cli.log_dir.as_deref(), cli.json_logs);

    let config = VaultConfig::from_env().context("invalid QUORUM_* configuration")?;
    let store = DirectoryEntryStore::open(&cli.store_dir)
        .with_context(|| format!("cannot open store at {}", cli.store_dir.display()))?;
    debug!(store = %store.root().display(), "opened directory store");
    let vault = Vault::new(config, Arc::new(store))?;

    match cli.command {
        Commands::Create { payload, payload_file, threshold, parts } => {
            let raw = match (payload, payload_file) {
                (Some(inline), _) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                (None, None) => bail!("either --payload or --payload-file is required"),
            };
            let payload: Value = serde_json::from_str(&raw).context("payload is not valid JSON")?;

            let threshold = threshold.unwrap_or(vault.config().default_threshold);
            let parts = parts.unwrap_or(vault.config().default_parts);
            let receipt = vault.create(&payload, threshold, parts)?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }

        Commands::Reconstruct { fingerprint, shares } => {
            let mut provided = BTreeMap::new();
            for (role, wrapped) in shares {
                if provided.insert(role.clone(), wrapped).is_some() {
                    bail!("role {role} given more than once");
                }
            }
            let out = vault.reconstruct(&fingerprint, &provided)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Commands::Show { fingerprint } => {
            let entry = vault.lookup(&fingerprint)?;
            println!("{}", serde_json::to_string_pretty(&entry.summary())?);
        }

        Commands::List => {
            println!("{}", serde_json::to_string_pretty(&vault.list()?)?);
        }

        Commands::Export { fingerprint } => {
            println!("{}", vault.export(&fingerprint)?);
        }

        Commands::Import { file } => {
            let document = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let fingerprint = vault.import(&document)?;
            println!("{fingerprint}");
        }
    }

    Ok(())
}
