//! packtrack CLI
//!
//! # Commands
//! - `packtrack serve` - Run the HTTP service
//! - `packtrack generate [--count N]` - Issue new package codes
//! - `packtrack show CODE` - Print one package
//! - `packtrack advance CODE STATUS` - Move a package to a new status
//! - `packtrack list [--status S]` - List packages
//! - `packtrack schematic` - Print the status update pipeline as JSON

mod packages;
mod serve;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use packtrack_core::config::AppConfig;
use packtrack_core::telemetry::init_tracing;
use std::path::PathBuf;

/// packtrack: package status tracking
#[derive(Parser)]
#[command(name = "packtrack")]
#[command(author, version, about = "Package tracking service and tools")]
struct Cli {
    /// TOML config file (PACKTRACK_* variables override it)
    #[arg(short, long, global = true, env = "PACKTRACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen address (overrides `bind` from the config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Issue new PENDING packages with today's codes
    Generate {
        /// How many codes to issue (1-500)
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,
    },

    /// Print one package
    Show {
        /// Package code
        code: String,
    },

    /// Move a package to a new status
    Advance {
        /// Package code
        code: String,

        /// Requested status (PENDING, PACKED, DISPATCHED, DELIVERED)
        status: String,

        /// Weight, applied when packing
        #[arg(long)]
        weight: Option<String>,

        /// Packer name, applied when packing
        #[arg(long)]
        packer: Option<String>,

        /// Shipping location, applied when dispatching
        #[arg(long)]
        location: Option<String>,
    },

    /// List packages, newest first
    List {
        /// Only packages in this status
        #[arg(short, long)]
        status: Option<String>,

        /// Only codes starting with this prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Maximum rows
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Print the status update pipeline as JSON
    Schematic,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.log).context("Failed to initialise logging")?;

    match cli.command {
        Commands::Serve { bind } => serve::run_serve_command(config, bind).await,
        Commands::Generate { count } => packages::run_generate_command(&config, count).await,
        Commands::Show { code } => packages::run_show_command(&config, &code).await,
        Commands::Advance {
            code,
            status,
            weight,
            packer,
            location,
        } => {
            let update = packages::build_update(&status, weight, packer, location)?;
            packages::run_advance_command(&config, &code, update).await
        }
        Commands::List {
            status,
            prefix,
            limit,
        } => packages::run_list_command(&config, status.as_deref(), prefix, limit).await,
        Commands::Schematic => packages::run_schematic_command(&config).await,
    }
}
