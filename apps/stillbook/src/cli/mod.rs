//! # Stillbook CLI Module
//!
//! This module implements the CLI interface for Stillbook.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show ledger status
//! - `create-batch` - Create a new batch
//! - `show` - Show a batch's full log
//! - `record` - Create a stage record in a batch slot
//! - `search` - List or search batches
//! - `export` - Export a batch as CSV
//! - `init` - Initialize new database

mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stillbook_core::StillbookError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stillbook - Distillery Batch Ledger
///
/// Tracks distillation batches through their production stages and derives
/// the alcohol-volume figures from the recorded measurements.
#[derive(Parser, Debug)]
#[command(name = "stillbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the ledger database
    #[arg(short = 'D', long, global = true, default_value = "stillbook.redb")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (ephemeral)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Path to a TOML server config file (overrides host/port)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show ledger status
    Status,

    /// Create a new batch
    CreateBatch {
        /// Batch number (unique, immutable)
        #[arg(short, long)]
        number: u32,

        /// Recipe name
        #[arg(short, long)]
        recipe: String,
    },

    /// Show a batch's full log
    Show {
        /// Batch number
        #[arg(short, long)]
        number: u32,
    },

    /// Create a stage record in a batch slot
    Record {
        /// Batch number
        #[arg(short, long)]
        number: u32,

        /// Section name (Fermentor, Wash, Spirit 1, Spirit 2, Totals)
        #[arg(short, long)]
        section: String,

        /// Slot index within the section
        #[arg(short, long)]
        index: usize,

        /// Record description
        #[arg(short, long)]
        description: String,

        /// Source location label
        #[arg(long)]
        from: Option<String>,

        /// Destination location label
        #[arg(long)]
        to: Option<String>,

        /// Volume in litres
        #[arg(short, long)]
        volume: Option<f64>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Starting specific gravity
        #[arg(long)]
        sg_start: Option<f64>,

        /// Ending specific gravity
        #[arg(long)]
        sg_end: Option<f64>,

        /// Explicit ABV (skips derivation)
        #[arg(long)]
        abv: Option<f64>,

        /// Explicit LAL (skips derivation)
        #[arg(long)]
        lal: Option<f64>,

        /// Faints in (L), distillation slots only
        #[arg(long)]
        faints_in: Option<f64>,

        /// Fores out (L), distillation slots only
        #[arg(long)]
        fores_out: Option<f64>,

        /// Heads out (L), distillation slots only
        #[arg(long)]
        heads_out: Option<f64>,

        /// Hearts out (L), distillation slots only
        #[arg(long)]
        hearts_out: Option<f64>,

        /// Tails out (L), distillation slots only
        #[arg(long)]
        tails_out: Option<f64>,

        /// Waste out (L), distillation slots only
        #[arg(long)]
        waste_out: Option<f64>,
    },

    /// List or search batches
    Search {
        /// Search term (recipe or batch number substring); empty lists recent
        query: Option<String>,
    },

    /// Export a batch's full history as CSV
    Export {
        /// Batch number
        #[arg(short, long)]
        number: u32,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), StillbookError> {
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, config }) => {
            cmd_server(&cli.database, backend, &host, port, config.as_deref()).await
        }
        Some(Commands::Status) => cmd_status(&cli.database, backend, json_mode),
        Some(Commands::CreateBatch { number, recipe }) => {
            cmd_create_batch(&cli.database, backend, json_mode, number, &recipe)
        }
        Some(Commands::Show { number }) => cmd_show(&cli.database, backend, json_mode, number),
        Some(Commands::Record {
            number,
            section,
            index,
            description,
            from,
            to,
            volume,
            start_date,
            end_date,
            sg_start,
            sg_end,
            abv,
            lal,
            faints_in,
            fores_out,
            heads_out,
            hearts_out,
            tails_out,
            waste_out,
        }) => cmd_record(
            &cli.database,
            backend,
            json_mode,
            number,
            &section,
            index,
            RecordFields {
                description,
                from,
                to,
                volume,
                start_date,
                end_date,
                sg_start,
                sg_end,
                abv,
                lal,
                faints_in,
                fores_out,
                heads_out,
                hearts_out,
                tails_out,
                waste_out,
            },
        ),
        Some(Commands::Search { query }) => cmd_search(
            &cli.database,
            backend,
            json_mode,
            query.as_deref().unwrap_or(""),
        ),
        Some(Commands::Export { number, output }) => {
            cmd_export(&cli.database, backend, number, &output)
        }
        Some(Commands::Init { force }) => cmd_init(&cli.database, backend, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, backend, json_mode)
        }
    }
}
