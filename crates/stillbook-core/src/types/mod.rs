//! # Core Type Definitions
//!
//! Identifiers, slot links, and error types for the Stillbook ledger:
//! - Batch and record identifiers (`BatchNumber`, `RecordId`, `ProductId`)
//! - Typed stage-record links (`RecordKind`, `SlotRef`)
//! - Operator accounts (`Operator`)
//! - Error types (`StillbookError`)
//!
//! ## Ordering Guarantees
//!
//! All identifier types implement `Ord` for deterministic ordering in
//! `BTreeMap`/`BTreeSet` backed stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Operator-assigned batch number.
///
/// Unique and immutable once assigned. This is the sole external identifier
/// for a batch; surrogate keys never leave the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchNumber(pub u32);

impl std::fmt::Display for BatchNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stage record, allocated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

/// Unique identifier for a product record, allocated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u64);

// =============================================================================
// RECORD KIND & SLOT LINK
// =============================================================================

/// The kind of a stage record.
///
/// Every slot declares the kind it accepts, and every persisted record
/// carries its kind. A slot link is only valid when the two agree, which
/// removes the "guessed the type tag wrong" failure mode of an untyped
/// record-id link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Fermentation run (specific-gravity progression).
    Fermentation,
    /// Distillation run (wash or spirit, with cut volumes).
    Distillation,
    /// Batch totals (storage and loss accounting).
    Totals,
}

impl RecordKind {
    /// Human-readable name for display surfaces.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fermentation => "Fermentation",
            Self::Distillation => "Distillation",
            Self::Totals => "Totals",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed link from a batch slot to a persisted stage record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRef {
    /// The kind the referenced record must have.
    pub kind: RecordKind,
    /// The referenced record.
    pub record: RecordId,
}

impl SlotRef {
    /// Create a new slot link.
    #[must_use]
    pub const fn new(kind: RecordKind, record: RecordId) -> Self {
        Self { kind, record }
    }
}

// =============================================================================
// OPERATOR
// =============================================================================

/// An operator account in the user store.
///
/// Stillbook does not manage credentials; API access is gated by the app
/// layer. The operator store exists so that process startup can run an
/// idempotent bootstrap check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Login name, unique within the store.
    pub name: String,
    /// When the account was first created.
    pub created_at: DateTime<Utc>,
}

impl Operator {
    /// Create a new operator account.
    #[must_use]
    pub fn new(name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Stillbook system.
///
/// - No silent failures
/// - Use `Result<T, StillbookError>` for fallible operations
/// - All errors are recoverable at the single-operation level; none are
///   process-fatal
#[derive(Debug, Error)]
pub enum StillbookError {
    /// Operator input failed validation; nothing was persisted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A batch with this number already exists.
    #[error("Batch #{0} already exists")]
    DuplicateBatch(BatchNumber),

    /// The requested batch does not exist.
    #[error("Batch #{0} not found")]
    BatchNotFound(BatchNumber),

    /// The requested stage record does not exist.
    #[error("Record {0:?} not found")]
    RecordNotFound(RecordId),

    /// The requested product record does not exist.
    #[error("Product {0:?} not found")]
    ProductNotFound(ProductId),

    /// The named section/index does not exist in the batch template.
    #[error("Unknown slot: section '{section}', index {index}")]
    UnknownSlot {
        /// The section name that was requested.
        section: String,
        /// The slot index within the section.
        index: usize,
    },

    /// A record of the wrong kind was offered to a slot.
    #[error("Slot expects a {expected} record, got {actual}")]
    KindMismatch {
        /// The kind declared by the slot.
        expected: RecordKind,
        /// The kind of the offered record.
        actual: RecordKind,
    },

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
