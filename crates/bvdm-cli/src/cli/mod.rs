//! CLI for the BVDM market-data downloader.

mod commands;

use anyhow::Result;
use bvdm_core::config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_checksum, run_crawl, run_extract, run_fetch, run_status};

/// Top-level CLI for the BVDM downloader.
#[derive(Debug, Parser)]
#[command(name = "bvdm")]
#[command(about = "BVDM: bulk downloader for Binance Vision market-data archives", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Crawl the remote directory listing and persist the path index.
    Crawl {
        /// Number of parallel listing workers.
        #[arg(long, default_value = "64", value_name = "N")]
        workers: usize,
        /// Maximum directory depth below the start prefix (0 = root only).
        #[arg(long, default_value = "10", value_name = "DEPTH")]
        max_depth: u32,
        /// Directory the path index is written to.
        #[arg(long, default_value = "./data", value_name = "DIR")]
        save_dir: PathBuf,
        /// Remote prefix the crawl starts from.
        #[arg(long, default_value = "data/", value_name = "PREFIX")]
        start_prefix: String,
        /// Record every listed key, not just data archives.
        #[arg(long)]
        all_files: bool,
    },

    /// Download indexed archives, optionally filtered to one year/month.
    Fetch {
        /// Year to download (requires --month).
        #[arg(short = 'y', long)]
        year: Option<u16>,
        /// Month to download, 1-12 (requires --year).
        #[arg(short = 'm', long)]
        month: Option<u8>,
        /// Number of parallel download workers.
        #[arg(long, default_value = "8", value_name = "N")]
        workers: usize,
        /// Directory archives are downloaded into.
        #[arg(long, default_value = "./downloads", value_name = "DIR")]
        download_dir: PathBuf,
        /// Directory holding the path index from `bvdm crawl`.
        #[arg(long, default_value = "./data", value_name = "DIR")]
        data_dir: PathBuf,
    },

    /// Show what the path index covers, grouped by month.
    Status {
        /// Directory holding the path index from `bvdm crawl`.
        #[arg(long, default_value = "./data", value_name = "DIR")]
        data_dir: PathBuf,
    },

    /// Extract downloaded zip archives in place.
    Extract {
        /// Directory to search for archives.
        #[arg(long, default_value = "./downloads", value_name = "DIR")]
        download_dir: PathBuf,
        /// Number of parallel extraction workers.
        #[arg(long, default_value = "8", value_name = "N")]
        workers: usize,
        /// Delete each archive after it extracts cleanly.
        #[arg(long)]
        remove_archives: bool,
    },

    /// Compute SHA-256 of a file and check its .CHECKSUM sidecar if present.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Crawl {
                workers,
                max_depth,
                save_dir,
                start_prefix,
                all_files,
            } => {
                run_crawl(&cfg, workers, max_depth, &save_dir, start_prefix, all_files).await?;
            }
            CliCommand::Fetch {
                year,
                month,
                workers,
                download_dir,
                data_dir,
            } => {
                run_fetch(&cfg, year, month, workers, download_dir, &data_dir).await?;
            }
            CliCommand::Status { data_dir } => run_status(&data_dir)?,
            CliCommand::Extract {
                download_dir,
                workers,
                remove_archives,
            } => {
                run_extract(download_dir, workers, remove_archives).await?;
            }
            CliCommand::Checksum { path } => run_checksum(&path)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
