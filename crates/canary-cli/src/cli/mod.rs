//! CLI for the canary checksum verifier.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use canary_core::config::{self, CanaryConfig};
use canary_core::digest::ChecksumAlgorithm;
use std::path::PathBuf;

use commands::{run_completions, run_digest, run_list, run_verify};

/// Top-level CLI for canary.
#[derive(Debug, Parser)]
#[command(name = "canary")]
#[command(about = "canary: verify catalog checksums against the assets they describe", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Catalog location overrides shared by commands that open the catalog.
#[derive(Debug, Clone, Default, Args)]
pub struct CatalogArgs {
    /// SQLite catalog file or `sqlite:` URL (default: from config, else the state dir).
    #[arg(long, value_name = "PATH")]
    pub database: Option<String>,
    /// Table holding the catalog entries.
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,
}

impl CatalogArgs {
    fn apply(&self, cfg: &mut CanaryConfig) {
        if let Some(db) = &self.database {
            cfg.database_url = Some(db.clone());
        }
        if let Some(collection) = &self.collection {
            cfg.collection = collection.clone();
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Verify every catalog entry once and correct drifted checksums.
    Run {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Maximum number of fetches in flight at once.
        #[arg(long, value_name = "N")]
        max_fetches: Option<usize>,
        /// Digest algorithm of the stored checksums (md5 or sha256).
        #[arg(long, value_name = "ALGO")]
        algorithm: Option<ChecksumAlgorithm>,
        /// Print the run report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List catalog entries.
    List {
        #[command(flatten)]
        catalog: CatalogArgs,
    },

    /// Compute the digest of a local file.
    Digest {
        /// Path to the file.
        path: PathBuf,
        /// Digest algorithm (default: from config).
        #[arg(long, value_name = "ALGO")]
        algorithm: Option<ChecksumAlgorithm>,
    },

    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            return run_completions(shell);
        }

        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run {
                catalog,
                max_fetches,
                algorithm,
                json,
            } => {
                catalog.apply(&mut cfg);
                if let Some(n) = max_fetches {
                    cfg.max_concurrent_fetches = n;
                }
                if let Some(algorithm) = algorithm {
                    cfg.algorithm = algorithm;
                }
                run_verify(&cfg, json).await?;
            }
            CliCommand::List { catalog } => {
                catalog.apply(&mut cfg);
                run_list(&cfg).await?;
            }
            CliCommand::Digest { path, algorithm } => {
                run_digest(&path, algorithm.unwrap_or(cfg.algorithm))?;
            }
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
