//! # Storage Backends
//!
//! The `LedgerStore` trait is the seam between the ledger operations and
//! persistence. Two backends implement it:
//!
//! - [`MemoryStore`]: BTreeMap-backed, volatile, used for tests and
//!   ephemeral sessions
//! - [`RedbStore`]: disk-backed via redb, ACID, crash-safe
//!
//! Stores are deliberately dumb: they persist and fetch entities by
//! identifier and allocate surrogate keys. Slot-link consistency, duplicate
//! checks, and cascades are the ledger's responsibility.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::batch::Batch;
use crate::record::{ProductRecord, StageRecord};
use crate::types::{BatchNumber, Operator, ProductId, RecordId, StillbookError};

/// Persistence operations required by the ledger.
pub trait LedgerStore {
    // =========================================================================
    // BATCHES
    // =========================================================================

    /// Insert a new batch. Fails if the batch number is already taken.
    fn insert_batch(&mut self, batch: &Batch) -> Result<(), StillbookError>;

    /// Fetch a batch by number.
    fn get_batch(&self, number: BatchNumber) -> Result<Option<Batch>, StillbookError>;

    /// Overwrite an existing batch. Fails if the batch does not exist.
    fn update_batch(&mut self, batch: &Batch) -> Result<(), StillbookError>;

    /// All batches, ascending by batch number.
    fn batches(&self) -> Result<Vec<Batch>, StillbookError>;

    /// Number of stored batches.
    fn batch_count(&self) -> Result<usize, StillbookError>;

    // =========================================================================
    // STAGE RECORDS
    // =========================================================================

    /// Allocate the next stage-record identifier.
    fn allocate_record_id(&mut self) -> Result<RecordId, StillbookError>;

    /// Insert or overwrite a stage record under its identifier.
    fn put_record(&mut self, record: &StageRecord) -> Result<(), StillbookError>;

    /// Fetch a stage record by identifier.
    fn get_record(&self, id: RecordId) -> Result<Option<StageRecord>, StillbookError>;

    /// Delete a stage record. Returns whether it existed.
    fn delete_record(&mut self, id: RecordId) -> Result<bool, StillbookError>;

    /// Number of stored stage records.
    fn record_count(&self) -> Result<usize, StillbookError>;

    // =========================================================================
    // PRODUCTS
    // =========================================================================

    /// Allocate the next product identifier.
    fn allocate_product_id(&mut self) -> Result<ProductId, StillbookError>;

    /// Insert or overwrite a product record under its identifier.
    fn put_product(&mut self, product: &ProductRecord) -> Result<(), StillbookError>;

    /// Fetch a product record by identifier.
    fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>, StillbookError>;

    /// All products belonging to a Totals record, ascending by identifier.
    fn products_for(&self, totals: RecordId) -> Result<Vec<ProductRecord>, StillbookError>;

    /// Delete a product record. Returns whether it existed.
    fn delete_product(&mut self, id: ProductId) -> Result<bool, StillbookError>;

    /// Delete all products belonging to a Totals record. Returns the count.
    fn delete_products_for(&mut self, totals: RecordId) -> Result<usize, StillbookError>;

    /// Number of stored product records.
    fn product_count(&self) -> Result<usize, StillbookError>;

    // =========================================================================
    // OPERATORS
    // =========================================================================

    /// Fetch an operator account by name.
    fn get_operator(&self, name: &str) -> Result<Option<Operator>, StillbookError>;

    /// Insert or overwrite an operator account.
    fn put_operator(&mut self, operator: &Operator) -> Result<(), StillbookError>;
}
