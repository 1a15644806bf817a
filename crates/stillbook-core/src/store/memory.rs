//! # In-Memory Store
//!
//! BTreeMap-backed store with deterministic iteration order. Volatile:
//! contents are lost when the store is dropped.

use super::LedgerStore;
use crate::batch::Batch;
use crate::record::{ProductRecord, StageRecord};
use crate::types::{BatchNumber, Operator, ProductId, RecordId, StillbookError};
use std::collections::BTreeMap;

/// A volatile, BTreeMap-backed ledger store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    batches: BTreeMap<BatchNumber, Batch>,
    records: BTreeMap<RecordId, StageRecord>,
    products: BTreeMap<ProductId, ProductRecord>,
    operators: BTreeMap<String, Operator>,
    next_record_id: u64,
    next_product_id: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryStore {
    fn insert_batch(&mut self, batch: &Batch) -> Result<(), StillbookError> {
        if self.batches.contains_key(&batch.number) {
            return Err(StillbookError::DuplicateBatch(batch.number));
        }
        self.batches.insert(batch.number, batch.clone());
        Ok(())
    }

    fn get_batch(&self, number: BatchNumber) -> Result<Option<Batch>, StillbookError> {
        Ok(self.batches.get(&number).cloned())
    }

    fn update_batch(&mut self, batch: &Batch) -> Result<(), StillbookError> {
        if !self.batches.contains_key(&batch.number) {
            return Err(StillbookError::BatchNotFound(batch.number));
        }
        self.batches.insert(batch.number, batch.clone());
        Ok(())
    }

    fn batches(&self) -> Result<Vec<Batch>, StillbookError> {
        Ok(self.batches.values().cloned().collect())
    }

    fn batch_count(&self) -> Result<usize, StillbookError> {
        Ok(self.batches.len())
    }

    fn allocate_record_id(&mut self) -> Result<RecordId, StillbookError> {
        let id = RecordId(self.next_record_id);
        self.next_record_id = self.next_record_id.saturating_add(1);
        Ok(id)
    }

    fn put_record(&mut self, record: &StageRecord) -> Result<(), StillbookError> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    fn get_record(&self, id: RecordId) -> Result<Option<StageRecord>, StillbookError> {
        Ok(self.records.get(&id).cloned())
    }

    fn delete_record(&mut self, id: RecordId) -> Result<bool, StillbookError> {
        Ok(self.records.remove(&id).is_some())
    }

    fn record_count(&self) -> Result<usize, StillbookError> {
        Ok(self.records.len())
    }

    fn allocate_product_id(&mut self) -> Result<ProductId, StillbookError> {
        let id = ProductId(self.next_product_id);
        self.next_product_id = self.next_product_id.saturating_add(1);
        Ok(id)
    }

    fn put_product(&mut self, product: &ProductRecord) -> Result<(), StillbookError> {
        self.products.insert(product.id, product.clone());
        Ok(())
    }

    fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>, StillbookError> {
        Ok(self.products.get(&id).cloned())
    }

    fn products_for(&self, totals: RecordId) -> Result<Vec<ProductRecord>, StillbookError> {
        Ok(self
            .products
            .values()
            .filter(|p| p.totals == totals)
            .cloned()
            .collect())
    }

    fn delete_product(&mut self, id: ProductId) -> Result<bool, StillbookError> {
        Ok(self.products.remove(&id).is_some())
    }

    fn delete_products_for(&mut self, totals: RecordId) -> Result<usize, StillbookError> {
        let ids: Vec<ProductId> = self
            .products
            .values()
            .filter(|p| p.totals == totals)
            .map(|p| p.id)
            .collect();
        for id in &ids {
            self.products.remove(id);
        }
        Ok(ids.len())
    }

    fn product_count(&self) -> Result<usize, StillbookError> {
        Ok(self.products.len())
    }

    fn get_operator(&self, name: &str) -> Result<Option<Operator>, StillbookError> {
        Ok(self.operators.get(name).cloned())
    }

    fn put_operator(&mut self, operator: &Operator) -> Result<(), StillbookError> {
        self.operators
            .insert(operator.name.clone(), operator.clone());
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
