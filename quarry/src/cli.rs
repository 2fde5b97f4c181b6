// quarry/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use quarry_core::application::Stage;

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Batch ETL for order and user extracts, with quality gates", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the full ETL (raw CSV -> cleaned + analytics parquet)
    Run {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Config file (default: quarry.yaml in the project directory)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// 🪜 Runs a single pipeline stage
    Stage {
        #[arg(value_enum)]
        stage: StageArg,

        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Config file (default: quarry.yaml in the project directory)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// 📊 Prints the missingness report of a table
    Report {
        /// CSV or parquet file to profile
        #[arg(long, short)]
        input: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: ReportFormat,
    },

    /// 🔍 Inspects a table file (columns + sample rows)
    Inspect {
        /// CSV or parquet file
        #[arg(long, short)]
        input: PathBuf,

        /// Number of sample rows to display
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// 🌐 Fetches JSON through the on-disk cache
    Fetch {
        #[arg(long)]
        url: String,

        /// Cache file
        #[arg(long)]
        cache: PathBuf,

        /// Max cache age in seconds (no TTL: any cached copy is used)
        #[arg(long)]
        ttl: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageArg {
    Load,
    Clean,
    Analytics,
}

impl From<StageArg> for Stage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Load => Stage::Load,
            StageArg::Clean => Stage::Clean,
            StageArg::Analytics => Stage::Analytics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Csv,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_run_defaults() -> Result<()> {
        let args = Cli::parse_from(["quarry", "run"]);
        match args.command {
            Commands::Run {
                project_dir,
                config,
            } => {
                assert_eq!(project_dir.to_string_lossy(), ".");
                assert_eq!(config, None);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_stage() -> Result<()> {
        let args = Cli::parse_from(["quarry", "stage", "analytics", "--project-dir", "/tmp"]);
        match args.command {
            Commands::Stage {
                stage, project_dir, ..
            } => {
                assert_eq!(Stage::from(stage), Stage::Analytics);
                assert_eq!(project_dir.to_string_lossy(), "/tmp");
                Ok(())
            }
            _ => bail!("Expected Stage command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_stage() {
        assert!(Cli::try_parse_from(["quarry", "stage", "publish"]).is_err());
    }

    #[test]
    fn test_cli_parse_inspect() -> Result<()> {
        let args = Cli::parse_from(["quarry", "inspect", "--input", "orders.csv", "--limit", "10"]);
        match args.command {
            Commands::Inspect { input, limit } => {
                assert_eq!(input.to_string_lossy(), "orders.csv");
                assert_eq!(limit, 10);
                Ok(())
            }
            _ => bail!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_cli_parse_fetch_ttl() -> Result<()> {
        let args = Cli::parse_from([
            "quarry",
            "fetch",
            "--url",
            "https://example.com/x.json",
            "--cache",
            "data/cache/x.json",
            "--ttl",
            "60",
        ]);
        match args.command {
            Commands::Fetch { ttl, .. } => {
                assert_eq!(ttl, Some(60));
                Ok(())
            }
            _ => bail!("Expected Fetch command"),
        }
    }
}
