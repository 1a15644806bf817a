//! # Ledger Module
//!
//! The ledger is the high-level interface over a storage backend:
//! - Batch registry (create, fetch, search, slot linkage)
//! - Stage record store (create, update, delete)
//! - Product records (attach to Totals, cascade delete)
//! - Operator bootstrap (idempotent startup check)
//!
//! ## Storage Backends
//!
//! - `InMemory`: BTreeMap store (fast, volatile)
//! - `Persistent`: `RedbStore` for disk-backed ACID storage
//!
//! Each operation is an independent unit of work; the ledger holds no
//! mutable state beyond the store itself. Concurrent slot updates are
//! last-write-wins — callers wanting isolation must serialize access.

use crate::batch::Batch;
use crate::record::{ProductDraft, ProductRecord, RecordDraft, StageRecord};
use crate::store::{LedgerStore, MemoryStore, RedbStore};
use crate::types::{
    BatchNumber, Operator, ProductId, RecordId, RecordKind, SlotRef, StillbookError,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result cap for a search with no query term.
pub const SEARCH_DEFAULT_LIMIT: usize = 5;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for a ledger.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

// =============================================================================
// METRICS
// =============================================================================

/// Counters for the status surfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMetrics {
    /// Number of batches.
    pub batch_count: usize,
    /// Number of stage records.
    pub record_count: usize,
    /// Number of product records.
    pub product_count: usize,
    /// Highest batch number, if any batch exists.
    pub latest_batch: Option<BatchNumber>,
}

// =============================================================================
// LEDGER
// =============================================================================

/// A ledger over a storage backend.
#[derive(Debug, Default)]
pub struct Ledger {
    backend: StorageBackend,
}

impl Ledger {
    /// Create a new empty ledger with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger over an existing in-memory store.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Create a ledger with persistent redb storage.
    ///
    /// Opens or creates a database at the given path. All changes are
    /// persisted to disk as they happen.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, StillbookError> {
        let store = RedbStore::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(store),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn store(&self) -> &dyn LedgerStore {
        match &self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    fn store_mut(&mut self) -> &mut dyn LedgerStore {
        match &mut self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
        }
    }

    // =========================================================================
    // BATCH REGISTRY
    // =========================================================================

    /// Create a batch with the fixed stage-slot template.
    ///
    /// Rejects duplicate batch numbers before anything is written.
    pub fn create_batch(
        &mut self,
        number: BatchNumber,
        recipe: &str,
    ) -> Result<Batch, StillbookError> {
        if self.store().get_batch(number)?.is_some() {
            return Err(StillbookError::DuplicateBatch(number));
        }
        let batch = Batch::new(number, recipe, Utc::now())?;
        self.store_mut().insert_batch(&batch)?;
        Ok(batch)
    }

    /// Fetch a batch by number.
    pub fn batch(&self, number: BatchNumber) -> Result<Batch, StillbookError> {
        self.store()
            .get_batch(number)?
            .ok_or(StillbookError::BatchNotFound(number))
    }

    /// List or search batches, ordered by descending batch number.
    ///
    /// An empty query truncates to the most recent [`SEARCH_DEFAULT_LIMIT`]
    /// batches; a non-empty query returns every case-insensitive substring
    /// match on the recipe or the decimal batch number, unbounded.
    pub fn search_batches(&self, query: &str) -> Result<Vec<Batch>, StillbookError> {
        let mut batches = self.store().batches()?;
        // Store iteration is ascending; display order is newest first.
        batches.reverse();

        let term = query.trim().to_lowercase();
        if term.is_empty() {
            batches.truncate(SEARCH_DEFAULT_LIMIT);
            return Ok(batches);
        }

        batches.retain(|b| {
            b.recipe.to_lowercase().contains(&term) || b.number.to_string().contains(&term)
        });
        Ok(batches)
    }

    // =========================================================================
    // STAGE RECORDS
    // =========================================================================

    /// Create a stage record and link it into a batch slot.
    ///
    /// The slot is validated first: an unknown section/index fails before
    /// any state is written. Re-attachment over an existing link replaces
    /// it; the previous record stays in the store, unlinked.
    pub fn create_record(
        &mut self,
        number: BatchNumber,
        section: &str,
        index: usize,
        draft: RecordDraft,
    ) -> Result<StageRecord, StillbookError> {
        let mut batch = self.batch(number)?;
        let kind = batch.slot_kind(section, index)?;
        draft.validate(kind)?;

        let now = Utc::now();
        let id = self.store_mut().allocate_record_id()?;
        let record = draft.into_record(id, kind, now)?;
        self.store_mut().put_record(&record)?;

        batch.attach(section, index, SlotRef::new(kind, id), now)?;
        self.store_mut().update_batch(&batch)?;
        Ok(record)
    }

    /// Fetch a stage record by identifier.
    pub fn record(&self, id: RecordId) -> Result<StageRecord, StillbookError> {
        self.store()
            .get_record(id)?
            .ok_or(StillbookError::RecordNotFound(id))
    }

    /// Replace a stage record's fields from a fresh draft.
    ///
    /// The record keeps its identity, kind, and creation timestamp; the
    /// derived-field calculation runs again over the new draft.
    pub fn update_record(
        &mut self,
        id: RecordId,
        draft: RecordDraft,
    ) -> Result<StageRecord, StillbookError> {
        let existing = self.record(id)?;
        let mut record = draft.into_record(id, existing.kind, Utc::now())?;
        record.created_at = existing.created_at;
        self.store_mut().put_record(&record)?;
        Ok(record)
    }

    /// Delete a stage record.
    ///
    /// Batch slots still pointing at the record are left in place; reads
    /// resolve them to "no record". Deleting a Totals record cascades to
    /// its products.
    pub fn delete_record(&mut self, id: RecordId) -> Result<(), StillbookError> {
        let record = self.record(id)?;
        if record.kind == RecordKind::Totals {
            self.store_mut().delete_products_for(id)?;
        }
        self.store_mut().delete_record(id)?;
        Ok(())
    }

    /// Resolve a slot link to its record, treating dangling links as absent.
    pub fn resolve(&self, link: SlotRef) -> Result<Option<StageRecord>, StillbookError> {
        Ok(self
            .store()
            .get_record(link.record)?
            .filter(|r| r.kind == link.kind))
    }

    // =========================================================================
    // PRODUCTS
    // =========================================================================

    /// Attach a product to a Totals record.
    pub fn add_product(
        &mut self,
        totals: RecordId,
        draft: ProductDraft,
    ) -> Result<ProductRecord, StillbookError> {
        let parent = self.record(totals)?;
        if parent.kind != RecordKind::Totals {
            return Err(StillbookError::KindMismatch {
                expected: RecordKind::Totals,
                actual: parent.kind,
            });
        }
        draft.validate()?;
        let id = self.store_mut().allocate_product_id()?;
        let product = draft.into_product(id, totals, Utc::now())?;
        self.store_mut().put_product(&product)?;
        Ok(product)
    }

    /// All products belonging to a Totals record.
    pub fn products_for(&self, totals: RecordId) -> Result<Vec<ProductRecord>, StillbookError> {
        self.store().products_for(totals)
    }

    /// Delete a single product record.
    pub fn delete_product(&mut self, id: ProductId) -> Result<(), StillbookError> {
        if !self.store_mut().delete_product(id)? {
            return Err(StillbookError::ProductNotFound(id));
        }
        Ok(())
    }

    // =========================================================================
    // OPERATORS
    // =========================================================================

    /// Ensure an operator account exists.
    ///
    /// Idempotent: returns `true` when the account was created on this
    /// call, `false` when it already existed.
    pub fn ensure_operator(&mut self, name: &str) -> Result<bool, StillbookError> {
        if name.trim().is_empty() {
            return Err(StillbookError::InvalidInput(
                "operator name is required".to_string(),
            ));
        }
        if self.store().get_operator(name)?.is_some() {
            return Ok(false);
        }
        let operator = Operator::new(name, Utc::now());
        self.store_mut().put_operator(&operator)?;
        Ok(true)
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Counters for the status surfaces.
    pub fn metrics(&self) -> Result<LedgerMetrics, StillbookError> {
        let latest_batch = self.store().batches()?.last().map(|b| b.number);
        Ok(LedgerMetrics {
            batch_count: self.store().batch_count()?,
            record_count: self.store().record_count()?,
            product_count: self.store().product_count()?,
            latest_batch,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(description: &str) -> RecordDraft {
        RecordDraft {
            description: description.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn create_and_fetch_batch() {
        let mut ledger = Ledger::new();
        ledger
            .create_batch(BatchNumber(1), "Single Malt")
            .expect("create");
        let batch = ledger.batch(BatchNumber(1)).expect("fetch");
        assert_eq!(batch.recipe, "Single Malt");
        assert_eq!(batch.linked_count(), 0);
    }

    #[test]
    fn duplicate_batch_number_is_rejected() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");
        assert!(matches!(
            ledger.create_batch(BatchNumber(1), "Vodka"),
            Err(StillbookError::DuplicateBatch(BatchNumber(1)))
        ));
        // The original batch is untouched.
        assert_eq!(ledger.batch(BatchNumber(1)).expect("fetch").recipe, "Gin");
    }

    #[test]
    fn missing_batch_is_not_found() {
        let ledger = Ledger::new();
        assert!(matches!(
            ledger.batch(BatchNumber(99)),
            Err(StillbookError::BatchNotFound(BatchNumber(99)))
        ));
    }

    #[test]
    fn empty_search_caps_at_five_descending() {
        let mut ledger = Ledger::new();
        for n in 1..=8u32 {
            ledger
                .create_batch(BatchNumber(n), "Rum")
                .expect("create");
        }
        let results = ledger.search_batches("").expect("search");
        let numbers: Vec<u32> = results.iter().map(|b| b.number.0).collect();
        assert_eq!(numbers, vec![8, 7, 6, 5, 4]);
    }

    #[test]
    fn query_search_returns_all_matches() {
        let mut ledger = Ledger::new();
        for n in 1..=8u32 {
            ledger
                .create_batch(BatchNumber(n), "Heavy Rum")
                .expect("create");
        }
        ledger
            .create_batch(BatchNumber(9), "Light Gin")
            .expect("create");

        let results = ledger.search_batches("rum").expect("search");
        assert_eq!(results.len(), 8);
        assert_eq!(results[0].number, BatchNumber(8));

        // Substring match on the batch number too.
        let results = ledger.search_batches("9").expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].recipe, "Light Gin");
    }

    #[test]
    fn create_record_links_slot_and_derives_metrics() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");

        let record = ledger
            .create_record(
                BatchNumber(1),
                "Fermentor",
                0,
                RecordDraft {
                    description: "Fermentation".to_string(),
                    sg_start: Some(1.0500),
                    sg_end: Some(0.9900),
                    volume_l: Some(100.0),
                    ..Default::default()
                },
            )
            .expect("record");
        assert_eq!(record.kind, RecordKind::Fermentation);
        assert_eq!(record.abv, Some(7.88));
        assert_eq!(record.lal, Some(7.88));

        let batch = ledger.batch(BatchNumber(1)).expect("fetch");
        let link = batch.slot("Fermentor", 0).expect("slot").link;
        assert_eq!(link, Some(SlotRef::new(RecordKind::Fermentation, record.id)));
    }

    #[test]
    fn unknown_slot_writes_nothing() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");

        let err = ledger
            .create_record(BatchNumber(1), "Bottling", 0, draft("x"))
            .expect_err("should fail");
        assert!(matches!(err, StillbookError::UnknownSlot { .. }));
        assert_eq!(ledger.metrics().expect("metrics").record_count, 0);
    }

    #[test]
    fn reattachment_replaces_link_and_keeps_old_record() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");

        let first = ledger
            .create_record(BatchNumber(1), "Fermentor", 0, draft("first"))
            .expect("first");
        let second = ledger
            .create_record(BatchNumber(1), "Fermentor", 0, draft("second"))
            .expect("second");

        let batch = ledger.batch(BatchNumber(1)).expect("fetch");
        let link = batch.slot("Fermentor", 0).expect("slot").link.expect("link");
        assert_eq!(link.record, second.id);
        // The replaced record is still addressable.
        assert_eq!(ledger.record(first.id).expect("record").description, "first");
    }

    #[test]
    fn deleted_record_leaves_dangling_link_resolving_to_none() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");
        let record = ledger
            .create_record(BatchNumber(1), "Wash", 1, draft("Still in"))
            .expect("record");

        ledger.delete_record(record.id).expect("delete");

        let batch = ledger.batch(BatchNumber(1)).expect("fetch");
        let link = batch.slot("Wash", 1).expect("slot").link.expect("link");
        assert_eq!(ledger.resolve(link).expect("resolve"), None);
    }

    #[test]
    fn update_record_keeps_identity_and_rederives() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");
        let record = ledger
            .create_record(BatchNumber(1), "Fermentor", 0, draft("Fermentation"))
            .expect("record");
        assert_eq!(record.abv, None);

        let updated = ledger
            .update_record(
                record.id,
                RecordDraft {
                    description: "Fermentation".to_string(),
                    sg_start: Some(1.0500),
                    sg_end: Some(0.9900),
                    ..Default::default()
                },
            )
            .expect("update");
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.kind, record.kind);
        assert_eq!(updated.created_at, record.created_at);
        assert_eq!(updated.abv, Some(7.88));
    }

    #[test]
    fn products_cascade_with_totals_record() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");
        let totals = ledger
            .create_record(BatchNumber(1), "Totals", 0, draft("Totals"))
            .expect("totals");

        ledger
            .add_product(
                totals.id,
                ProductDraft {
                    name: "A".to_string(),
                    final_abv: Some(40.0),
                    final_volume_l: Some(100.0),
                    ..Default::default()
                },
            )
            .expect("product");
        assert_eq!(ledger.products_for(totals.id).expect("products").len(), 1);

        ledger.delete_record(totals.id).expect("delete");
        assert_eq!(ledger.metrics().expect("metrics").product_count, 0);
    }

    #[test]
    fn product_requires_totals_parent() {
        let mut ledger = Ledger::new();
        ledger.create_batch(BatchNumber(1), "Gin").expect("create");
        let ferment = ledger
            .create_record(BatchNumber(1), "Fermentor", 0, draft("Fermentation"))
            .expect("record");

        let err = ledger
            .add_product(
                ferment.id,
                ProductDraft {
                    name: "A".to_string(),
                    ..Default::default()
                },
            )
            .expect_err("should fail");
        assert!(matches!(err, StillbookError::KindMismatch { .. }));
    }

    #[test]
    fn operator_bootstrap_is_idempotent() {
        let mut ledger = Ledger::new();
        assert!(ledger.ensure_operator("admin").expect("first"));
        assert!(!ledger.ensure_operator("admin").expect("second"));
    }

    #[test]
    fn metrics_track_latest_batch() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.metrics().expect("metrics").latest_batch, None);
        ledger.create_batch(BatchNumber(4), "Gin").expect("create");
        ledger.create_batch(BatchNumber(2), "Rum").expect("create");
        let metrics = ledger.metrics().expect("metrics");
        assert_eq!(metrics.batch_count, 2);
        assert_eq!(metrics.latest_batch, Some(BatchNumber(4)));
    }
}
