//! # redb-backed Ledger Store
//!
//! A disk-backed store using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! Rows are serialized with postcard. Surrogate-key allocation state lives
//! in the metadata table and is cached in memory; the cache is only updated
//! after a successful commit.

use super::LedgerStore;
use crate::batch::Batch;
use crate::record::{ProductRecord, StageRecord};
use crate::types::{BatchNumber, Operator, ProductId, RecordId, StillbookError};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for batches: batch number -> serialized Batch bytes.
const BATCHES: TableDefinition<u32, &[u8]> = TableDefinition::new("batches");

/// Table for stage records: RecordId(u64) -> serialized StageRecord bytes.
const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records");

/// Table for products: ProductId(u64) -> serialized ProductRecord bytes.
const PRODUCTS: TableDefinition<u64, &[u8]> = TableDefinition::new("products");

/// Index for the product -> totals relation: (totals_id, product_id) -> unit.
/// The composite key enables range scans per Totals record.
const PRODUCT_PARENTS: TableDefinition<(u64, u64), ()> = TableDefinition::new("product_parents");

/// Table for operator accounts: name -> serialized Operator bytes.
const OPERATORS: TableDefinition<&str, &[u8]> = TableDefinition::new("operators");

/// Table for metadata: key string -> value u64.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const META_NEXT_RECORD_ID: &str = "next_record_id";
const META_NEXT_PRODUCT_ID: &str = "next_product_id";

fn io_err(e: impl std::fmt::Display) -> StillbookError {
    StillbookError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StillbookError> {
    postcard::to_allocvec(value).map_err(|e| StillbookError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StillbookError> {
    postcard::from_bytes(bytes).map_err(|e| StillbookError::SerializationError(e.to_string()))
}

/// A disk-backed ledger store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
    /// Next available stage-record identifier.
    next_record_id: u64,
    /// Next available product identifier.
    next_product_id: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("next_record_id", &self.next_record_id)
            .field("next_product_id", &self.next_product_id)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a ledger database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StillbookError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(BATCHES).map_err(io_err)?;
            let _ = write_txn.open_table(RECORDS).map_err(io_err)?;
            let _ = write_txn.open_table(PRODUCTS).map_err(io_err)?;
            let _ = write_txn.open_table(PRODUCT_PARENTS).map_err(io_err)?;
            let _ = write_txn.open_table(OPERATORS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        // Load id-allocation metadata
        let read_txn = db.begin_read().map_err(io_err)?;
        let (next_record_id, next_product_id) = {
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            let record = table
                .get(META_NEXT_RECORD_ID)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            let product = table
                .get(META_NEXT_PRODUCT_ID)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            (record, product)
        };

        Ok(Self {
            db,
            next_record_id,
            next_product_id,
        })
    }

    fn bump_meta(&self, key: &str, value: u64) -> Result<(), StillbookError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(METADATA).map_err(io_err)?;
            table.insert(key, value).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }
}

impl LedgerStore for RedbStore {
    fn insert_batch(&mut self, batch: &Batch) -> Result<(), StillbookError> {
        let bytes = encode(batch)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(BATCHES).map_err(io_err)?;
            if table.get(batch.number.0).map_err(io_err)?.is_some() {
                return Err(StillbookError::DuplicateBatch(batch.number));
            }
            table
                .insert(batch.number.0, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn get_batch(&self, number: BatchNumber) -> Result<Option<Batch>, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(BATCHES).map_err(io_err)?;
        table
            .get(number.0)
            .map_err(io_err)?
            .map(|bytes| decode(bytes.value()))
            .transpose()
    }

    fn update_batch(&mut self, batch: &Batch) -> Result<(), StillbookError> {
        let bytes = encode(batch)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(BATCHES).map_err(io_err)?;
            if table.get(batch.number.0).map_err(io_err)?.is_none() {
                return Err(StillbookError::BatchNotFound(batch.number));
            }
            table
                .insert(batch.number.0, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn batches(&self) -> Result<Vec<Batch>, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(BATCHES).map_err(io_err)?;

        let mut batches = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            batches.push(decode(value.value())?);
        }
        Ok(batches)
    }

    fn batch_count(&self) -> Result<usize, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(BATCHES).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn allocate_record_id(&mut self) -> Result<RecordId, StillbookError> {
        let id = self.next_record_id;
        let next = id.saturating_add(1);
        self.bump_meta(META_NEXT_RECORD_ID, next)?;
        self.next_record_id = next;
        Ok(RecordId(id))
    }

    fn put_record(&mut self, record: &StageRecord) -> Result<(), StillbookError> {
        let bytes = encode(record)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(RECORDS).map_err(io_err)?;
            table
                .insert(record.id.0, bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn get_record(&self, id: RecordId) -> Result<Option<StageRecord>, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RECORDS).map_err(io_err)?;
        table
            .get(id.0)
            .map_err(io_err)?
            .map(|bytes| decode(bytes.value()))
            .transpose()
    }

    fn delete_record(&mut self, id: RecordId) -> Result<bool, StillbookError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let existed = {
            let mut table = write_txn.open_table(RECORDS).map_err(io_err)?;
            table.remove(id.0).map_err(io_err)?.is_some()
        };
        write_txn.commit().map_err(io_err)?;
        Ok(existed)
    }

    fn record_count(&self) -> Result<usize, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(RECORDS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn allocate_product_id(&mut self) -> Result<ProductId, StillbookError> {
        let id = self.next_product_id;
        let next = id.saturating_add(1);
        self.bump_meta(META_NEXT_PRODUCT_ID, next)?;
        self.next_product_id = next;
        Ok(ProductId(id))
    }

    fn put_product(&mut self, product: &ProductRecord) -> Result<(), StillbookError> {
        let bytes = encode(product)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(PRODUCTS).map_err(io_err)?;
            table
                .insert(product.id.0, bytes.as_slice())
                .map_err(io_err)?;
            let mut parents = write_txn.open_table(PRODUCT_PARENTS).map_err(io_err)?;
            parents
                .insert((product.totals.0, product.id.0), ())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PRODUCTS).map_err(io_err)?;
        table
            .get(id.0)
            .map_err(io_err)?
            .map(|bytes| decode(bytes.value()))
            .transpose()
    }

    fn products_for(&self, totals: RecordId) -> Result<Vec<ProductRecord>, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let parents = read_txn.open_table(PRODUCT_PARENTS).map_err(io_err)?;
        let products = read_txn.open_table(PRODUCTS).map_err(io_err)?;

        let mut result = Vec::new();
        for entry in parents
            .range((totals.0, 0)..=(totals.0, u64::MAX))
            .map_err(io_err)?
        {
            let (key, _) = entry.map_err(io_err)?;
            let (_, product_id) = key.value();
            if let Some(bytes) = products.get(product_id).map_err(io_err)? {
                result.push(decode(bytes.value())?);
            }
        }
        Ok(result)
    }

    fn delete_product(&mut self, id: ProductId) -> Result<bool, StillbookError> {
        // The parent index key needs the totals id, so fetch before deleting.
        let Some(product) = self.get_product(id)? else {
            return Ok(false);
        };

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(PRODUCTS).map_err(io_err)?;
            table.remove(id.0).map_err(io_err)?;
            let mut parents = write_txn.open_table(PRODUCT_PARENTS).map_err(io_err)?;
            parents
                .remove((product.totals.0, id.0))
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(true)
    }

    fn delete_products_for(&mut self, totals: RecordId) -> Result<usize, StillbookError> {
        let ids: Vec<u64> = {
            let read_txn = self.db.begin_read().map_err(io_err)?;
            let parents = read_txn.open_table(PRODUCT_PARENTS).map_err(io_err)?;
            let mut ids = Vec::new();
            for entry in parents
                .range((totals.0, 0)..=(totals.0, u64::MAX))
                .map_err(io_err)?
            {
                let (key, _) = entry.map_err(io_err)?;
                ids.push(key.value().1);
            }
            ids
        };

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(PRODUCTS).map_err(io_err)?;
            let mut parents = write_txn.open_table(PRODUCT_PARENTS).map_err(io_err)?;
            for id in &ids {
                table.remove(*id).map_err(io_err)?;
                parents.remove((totals.0, *id)).map_err(io_err)?;
            }
        }
        write_txn.commit().map_err(io_err)?;
        Ok(ids.len())
    }

    fn product_count(&self) -> Result<usize, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PRODUCTS).map_err(io_err)?;
        Ok(table.len().map_err(io_err)? as usize)
    }

    fn get_operator(&self, name: &str) -> Result<Option<Operator>, StillbookError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(OPERATORS).map_err(io_err)?;
        table
            .get(name)
            .map_err(io_err)?
            .map(|bytes| decode(bytes.value()))
            .transpose()
    }

    fn put_operator(&mut self, operator: &Operator) -> Result<(), StillbookError> {
        let bytes = encode(operator)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(OPERATORS).map_err(io_err)?;
            table
                .insert(operator.name.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordDraft;
    use crate::types::RecordKind;
    use chrono::Utc;

    fn temp_store() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RedbStore::open(dir.path().join("ledger.redb")).expect("open");
        (dir, store)
    }

    #[test]
    fn batch_round_trips_through_disk() {
        let (_dir, mut store) = temp_store();
        let batch = Batch::new(BatchNumber(12), "Rye", Utc::now()).expect("batch");
        store.insert_batch(&batch).expect("insert");

        let loaded = store
            .get_batch(BatchNumber(12))
            .expect("get")
            .expect("present");
        assert_eq!(loaded, batch);
    }

    #[test]
    fn duplicate_batch_insert_fails_without_write() {
        let (_dir, mut store) = temp_store();
        let batch = Batch::new(BatchNumber(1), "Rye", Utc::now()).expect("batch");
        store.insert_batch(&batch).expect("insert");
        assert!(matches!(
            store.insert_batch(&batch),
            Err(StillbookError::DuplicateBatch(BatchNumber(1)))
        ));
        assert_eq!(store.batch_count().expect("count"), 1);
    }

    #[test]
    fn record_ids_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("ledger.redb");
        {
            let mut store = RedbStore::open(&path).expect("open");
            assert_eq!(store.allocate_record_id().expect("id"), RecordId(0));
            assert_eq!(store.allocate_record_id().expect("id"), RecordId(1));
        }
        let mut store = RedbStore::open(&path).expect("reopen");
        assert_eq!(store.allocate_record_id().expect("id"), RecordId(2));
    }

    #[test]
    fn record_round_trip_and_delete() {
        let (_dir, mut store) = temp_store();
        let id = store.allocate_record_id().expect("id");
        let record = RecordDraft {
            description: "Wash Run".to_string(),
            volume_l: Some(120.0),
            ..Default::default()
        }
        .into_record(id, RecordKind::Distillation, Utc::now())
        .expect("record");

        store.put_record(&record).expect("put");
        assert_eq!(
            store.get_record(id).expect("get").expect("present"),
            record
        );
        assert!(store.delete_record(id).expect("delete"));
        assert!(store.get_record(id).expect("get").is_none());
        assert!(!store.delete_record(id).expect("second delete"));
    }

    #[test]
    fn products_index_by_totals_record() {
        use crate::record::ProductDraft;

        let (_dir, mut store) = temp_store();
        let totals = RecordId(7);
        let other = RecordId(8);
        for (name, parent) in [("A", totals), ("B", totals), ("C", other)] {
            let id = store.allocate_product_id().expect("id");
            let product = ProductDraft {
                name: name.to_string(),
                ..Default::default()
            }
            .into_product(id, parent, Utc::now())
            .expect("product");
            store.put_product(&product).expect("put");
        }

        let names: Vec<String> = store
            .products_for(totals)
            .expect("products")
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);

        assert_eq!(store.delete_products_for(totals).expect("cascade"), 2);
        assert_eq!(store.product_count().expect("count"), 1);
    }

    #[test]
    fn operator_bootstrap_round_trip() {
        let (_dir, mut store) = temp_store();
        assert!(store.get_operator("admin").expect("get").is_none());
        let operator = Operator::new("admin", Utc::now());
        store.put_operator(&operator).expect("put");
        assert_eq!(
            store.get_operator("admin").expect("get"),
            Some(operator)
        );
    }
}
