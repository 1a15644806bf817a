//! # Stillbook - Distillery Batch Ledger
//!
//! The main binary for the Stillbook record-keeping system.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for batch operations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │             apps/stillbook (THE BINARY)           │
//! │                                                   │
//! │   ┌─────────────┐         ┌─────────────┐        │
//! │   │   CLI       │         │   HTTP API  │        │
//! │   │  (clap)     │         │   (axum)    │        │
//! │   └──────┬──────┘         └──────┬──────┘        │
//! │          │                       │                │
//! │          └───────────┬───────────┘                │
//! │                      ▼                            │
//! │            ┌──────────────────┐                   │
//! │            │  stillbook-core  │                   │
//! │            │   (THE LOGIC)    │                   │
//! │            └──────────────────┘                   │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! stillbook server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! stillbook create-batch -n 42 -r "Rye Whiskey"
//! stillbook record -n 42 -s Fermentor -i 0 -d "Fermentation" --sg-start 1.05 --sg-end 0.99
//! stillbook export -n 42 -o batch42.csv
//! ```

use clap::Parser;
use stillbook::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — STILLBOOK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STILLBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stillbook=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Stillbook startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗████████╗██╗██╗     ██╗     ██████╗  ██████╗  ██████╗ ██╗  ██╗
  ██╔════╝╚══██╔══╝██║██║     ██║     ██╔══██╗██╔═══██╗██╔═══██╗██║ ██╔╝
  ███████╗   ██║   ██║██║     ██║     ██████╔╝██║   ██║██║   ██║█████╔╝
  ╚════██║   ██║   ██║██║     ██║     ██╔══██╗██║   ██║██║   ██║██╔═██╗
  ███████║   ██║   ██║███████╗███████╗██████╔╝╚██████╔╝╚██████╔╝██║  ██╗
  ╚══════╝   ╚═╝   ╚═╝╚══════╝╚══════╝╚═════╝  ╚═════╝  ╚═════╝ ╚═╝  ╚═╝

  Distillery Batch Ledger v{}

  Recorded • Derived • Exported
"#,
        env!("CARGO_PKG_VERSION")
    );
}
