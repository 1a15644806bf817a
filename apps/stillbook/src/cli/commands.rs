//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use stillbook_core::{
    Batch, BatchNumber, DistillationCuts, Ledger, RecordDraft, StillbookError, export_csv,
};

// =============================================================================
// SERVER CONFIG
// =============================================================================

/// TOML server configuration file.
///
/// ```toml
/// host = "0.0.0.0"
/// port = 9000
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: Option<String>,
    /// Port to bind to.
    pub port: Option<u16>,
}

impl ServerConfig {
    /// Load a server config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, StillbookError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StillbookError::IoError(format!("Read config: {}", e)))?;
        toml::from_str(&contents)
            .map_err(|e| StillbookError::SerializationError(format!("Parse config: {}", e)))
    }
}

// =============================================================================
// ADMIN BOOTSTRAP
// =============================================================================

/// Default operator account name; overridable via `STILLBOOK_ADMIN`.
const DEFAULT_ADMIN: &str = "admin";

/// Run the idempotent operator bootstrap and log the outcome.
fn run_bootstrap(ledger: &mut Ledger) -> Result<(), StillbookError> {
    let name = std::env::var("STILLBOOK_ADMIN").unwrap_or_else(|_| DEFAULT_ADMIN.to_string());
    if ledger.ensure_operator(&name)? {
        tracing::info!("Operator account '{}' created", name);
    } else {
        tracing::info!("Operator account '{}' already exists, skipping", name);
    }
    Ok(())
}

// =============================================================================
// PATH VALIDATION
// =============================================================================

/// Validate output path for security.
///
/// For output files, we validate the parent directory exists and is writable.
fn validate_output_path(path: &Path) -> Result<PathBuf, StillbookError> {
    // Get parent directory
    let parent = path.parent().unwrap_or(Path::new("."));

    // Canonicalize parent to resolve ".." and symlinks
    let canonical_parent = parent.canonicalize().map_err(|e| {
        StillbookError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    // Ensure parent is a directory
    if !canonical_parent.is_dir() {
        return Err(StillbookError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    // Return the path with canonical parent + original filename
    let filename = path
        .file_name()
        .ok_or_else(|| StillbookError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &PathBuf,
    backend: &str,
    host: &str,
    port: u16,
    config: Option<&Path>,
) -> Result<(), StillbookError> {
    let mut ledger = load_or_create_ledger(db_path, backend)?;
    run_bootstrap(&mut ledger)?;

    // Config file overrides the command-line host/port.
    let (host, port) = match config {
        Some(path) => {
            let cfg = ServerConfig::load(path)?;
            (
                cfg.host.unwrap_or_else(|| host.to_string()),
                cfg.port.unwrap_or(port),
            )
        }
        None => (host.to_string(), port),
    };

    println!("Stillbook Batch Ledger Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!();
    println!("Endpoints:");
    println!("  GET  /health           - Health check");
    println!("  GET  /status           - Ledger metrics");
    println!("  GET  /batches?q=       - List or search batches");
    println!("  POST /batches          - Create a batch");
    println!("  GET  /batches/:n       - Full batch log");
    println!("  GET  /batches/:n/export - Export batch as CSV");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, ledger).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show ledger status.
pub fn cmd_status(db_path: &PathBuf, backend: &str, json_mode: bool) -> Result<(), StillbookError> {
    let ledger = load_or_create_ledger(db_path, backend)?;
    let metrics = ledger.metrics()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "batch_count": metrics.batch_count,
            "record_count": metrics.record_count,
            "product_count": metrics.product_count,
            "latest_batch": metrics.latest_batch.map(|n| n.0)
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Stillbook Ledger Status");
    println!("=======================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Batches:  {}", metrics.batch_count);
    println!("Records:  {}", metrics.record_count);
    println!("Products: {}", metrics.product_count);
    match metrics.latest_batch {
        Some(number) => println!("Latest:   batch {}", number),
        None => println!("Latest:   (none)"),
    }

    Ok(())
}

// =============================================================================
// CREATE-BATCH COMMAND
// =============================================================================

/// Create a new batch.
pub fn cmd_create_batch(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    number: u32,
    recipe: &str,
) -> Result<(), StillbookError> {
    let mut ledger = load_or_create_ledger(db_path, backend)?;
    let batch = ledger.create_batch(BatchNumber(number), recipe)?;

    if json_mode {
        let output = serde_json::json!({
            "number": batch.number.0,
            "recipe": batch.recipe,
            "sections": batch.sections.len(),
            "slots": batch.slot_count()
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "Created batch {} ({}) with {} sections, {} slots",
        batch.number,
        batch.recipe,
        batch.sections.len(),
        batch.slot_count()
    );

    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Show a batch's full log.
pub fn cmd_show(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    number: u32,
) -> Result<(), StillbookError> {
    let ledger = load_or_create_ledger(db_path, backend)?;
    let batch = ledger.batch(BatchNumber(number))?;

    if json_mode {
        return print_batch_json(&ledger, &batch);
    }

    println!("Batch {} — {}", batch.number, batch.recipe);
    println!("Created: {}", batch.created_at.to_rfc3339());
    println!("Updated: {}", batch.updated_at.to_rfc3339());

    for section in &batch.sections {
        println!();
        println!("{} ({})", section.name, section.kind);
        for slot in &section.slots {
            let record = match slot.link {
                Some(link) => ledger.resolve(link)?,
                None => None,
            };
            match record {
                Some(record) => {
                    print!("  {:<28} {}", slot.label, record.description);
                    if let Some(volume) = record.volume_l {
                        print!("  {} L", volume);
                    }
                    if let Some(abv) = record.abv {
                        print!("  ABV {}", abv);
                    }
                    if let Some(lal) = record.lal {
                        print!("  LAL {}", lal);
                    }
                    println!();
                }
                None => println!("  {:<28} (no data)", slot.label),
            }
        }
    }

    Ok(())
}

/// JSON variant of the batch log.
fn print_batch_json(ledger: &Ledger, batch: &Batch) -> Result<(), StillbookError> {
    let mut sections = Vec::new();
    for section in &batch.sections {
        let mut slots = Vec::new();
        for slot in &section.slots {
            let record = match slot.link {
                Some(link) => ledger.resolve(link)?,
                None => None,
            };
            slots.push(serde_json::json!({
                "label": slot.label,
                "record": record.map(|r| serde_json::json!({
                    "id": r.id.0,
                    "description": r.description,
                    "volume_l": r.volume_l,
                    "abv": r.abv,
                    "lal": r.lal
                }))
            }));
        }
        sections.push(serde_json::json!({
            "name": section.name,
            "kind": section.kind.name(),
            "slots": slots
        }));
    }

    let output = serde_json::json!({
        "number": batch.number.0,
        "recipe": batch.recipe,
        "created_at": batch.created_at.to_rfc3339(),
        "updated_at": batch.updated_at.to_rfc3339(),
        "sections": sections
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).unwrap_or_default()
    );
    Ok(())
}

// =============================================================================
// RECORD COMMAND
// =============================================================================

/// Measurement fields of the `record` command, grouped to keep the
/// dispatcher readable.
#[derive(Debug, Clone)]
pub struct RecordFields {
    pub description: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub volume: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub sg_start: Option<f64>,
    pub sg_end: Option<f64>,
    pub abv: Option<f64>,
    pub lal: Option<f64>,
    pub faints_in: Option<f64>,
    pub fores_out: Option<f64>,
    pub heads_out: Option<f64>,
    pub hearts_out: Option<f64>,
    pub tails_out: Option<f64>,
    pub waste_out: Option<f64>,
}

/// Create a stage record in a batch slot.
pub fn cmd_record(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    number: u32,
    section: &str,
    index: usize,
    fields: RecordFields,
) -> Result<(), StillbookError> {
    let mut ledger = load_or_create_ledger(db_path, backend)?;

    let draft = RecordDraft {
        description: fields.description,
        from_location: fields.from,
        to_location: fields.to,
        volume_l: fields.volume,
        start_date: fields.start_date,
        end_date: fields.end_date,
        sg_start: fields.sg_start,
        sg_end: fields.sg_end,
        abv: fields.abv,
        lal: fields.lal,
        cuts: DistillationCuts {
            faints_in_l: fields.faints_in,
            fores_out_l: fields.fores_out,
            heads_out_l: fields.heads_out,
            hearts_out_l: fields.hearts_out,
            tails_out_l: fields.tails_out,
            waste_out_l: fields.waste_out,
        },
    };

    let record = ledger.create_record(BatchNumber(number), section, index, draft)?;

    if json_mode {
        let output = serde_json::json!({
            "id": record.id.0,
            "kind": record.kind.name(),
            "description": record.description,
            "abv": record.abv,
            "lal": record.lal
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "Created {} record {} in batch {} ({} / slot {})",
        record.kind, record.id.0, number, section, index
    );
    if let Some(abv) = record.abv {
        println!("  ABV: {}", abv);
    }
    if let Some(lal) = record.lal {
        println!("  LAL: {}", lal);
    }

    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// List or search batches.
pub fn cmd_search(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    query: &str,
) -> Result<(), StillbookError> {
    let ledger = load_or_create_ledger(db_path, backend)?;
    let batches = ledger.search_batches(query)?;

    if json_mode {
        let output: Vec<serde_json::Value> = batches
            .iter()
            .map(|b| {
                serde_json::json!({
                    "number": b.number.0,
                    "recipe": b.recipe,
                    "linked_slots": b.linked_count(),
                    "updated_at": b.updated_at.to_rfc3339()
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    if batches.is_empty() {
        if query.trim().is_empty() {
            println!("No batches recorded.");
        } else {
            println!("No batches match '{}'.", query);
        }
        return Ok(());
    }

    for batch in &batches {
        println!(
            "Batch {:<8} {:<32} {} slots linked",
            batch.number,
            batch.recipe,
            batch.linked_count()
        );
    }

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Export a batch's full history as CSV.
pub fn cmd_export(
    db_path: &PathBuf,
    backend: &str,
    number: u32,
    output: &Path,
) -> Result<(), StillbookError> {
    // Validate output path before touching the ledger
    let validated_output = validate_output_path(output)?;

    let ledger = load_or_create_ledger(db_path, backend)?;
    let csv = export_csv(&ledger, BatchNumber(number))?;

    std::fs::write(&validated_output, &csv)
        .map_err(|e| StillbookError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Exported batch {} ({} bytes) to {:?}",
        number,
        csv.len(),
        validated_output
    );

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(db_path: &PathBuf, backend: &str, force: bool) -> Result<(), StillbookError> {
    if db_path.exists() && !force {
        return Err(StillbookError::IoError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }

    match backend {
        "redb" => {
            if force && db_path.exists() {
                std::fs::remove_file(db_path)
                    .map_err(|e| StillbookError::IoError(format!("Remove database: {}", e)))?;
            }
            let mut ledger = Ledger::with_redb(db_path)?;
            run_bootstrap(&mut ledger)?;
            println!("Initialized new redb database at {:?}", db_path);
        }
        "memory" => {
            println!("Memory backend holds no files; nothing to initialize.");
        }
        other => {
            return Err(StillbookError::InvalidInput(format!(
                "Unknown backend: {}. Use: redb, memory",
                other
            )));
        }
    }

    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a ledger from a database path with specified backend.
pub fn load_or_create_ledger(db_path: &PathBuf, backend: &str) -> Result<Ledger, StillbookError> {
    match backend {
        "redb" => Ledger::with_redb(db_path),
        "memory" => Ok(Ledger::new()),
        other => Err(StillbookError::InvalidInput(format!(
            "Unknown backend: {}. Use: redb, memory",
            other
        ))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
