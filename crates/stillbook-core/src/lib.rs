//! # stillbook-core
//!
//! The batch ledger for Stillbook - THE LOGIC.
//!
//! This crate implements the record-keeping substrate for a distillery:
//! batches with a fixed stage-slot template, stage records with derived
//! alcohol figures, bottled products hanging off batch totals, and a CSV
//! report exporter over the lot.
//!
//! ## Architectural Constraints
//!
//! The core:
//! - Is the ONLY place where ledger state exists (stateful)
//! - Owns every derived-field calculation; callers submit measurements,
//!   never computed figures the core would have to trust
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod batch;
pub mod calc;
pub mod ledger;
pub mod record;
pub mod report;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    BatchNumber, Operator, ProductId, RecordId, RecordKind, SlotRef, StillbookError,
};

// =============================================================================
// RE-EXPORTS: Ledger
// =============================================================================

pub use batch::{Batch, Section, Slot};
pub use calc::{ABV_FACTOR, Measurements, Resolved, round2};
pub use ledger::{Ledger, LedgerMetrics, SEARCH_DEFAULT_LIMIT, StorageBackend};
pub use record::{
    DistillationCuts, ProductDraft, ProductRecord, RecordDraft, StageRecord,
};
pub use store::{LedgerStore, MemoryStore, RedbStore};

// =============================================================================
// RE-EXPORTS: Report Exporter
// =============================================================================

pub use report::{ReportRow, ReportSource, export_csv, flatten, render_csv};
