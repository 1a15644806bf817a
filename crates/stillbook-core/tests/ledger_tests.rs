//! # Ledger Integration Tests
//!
//! End-to-end tests over the persistent redb backend: the distillation
//! workflow from batch creation through record linking, product bottling,
//! CSV export, and reopen-after-restart durability.

use stillbook_core::{
    BatchNumber, Ledger, ProductDraft, RecordDraft, RecordKind, StillbookError, export_csv,
};
use tempfile::TempDir;

fn temp_db() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("stillbook.redb");
    (dir, path)
}

fn fermentation_draft() -> RecordDraft {
    RecordDraft {
        description: "Fermentation run".to_string(),
        to_location: Some("Fermenter 1".to_string()),
        volume_l: Some(1000.0),
        sg_start: Some(1.0500),
        sg_end: Some(0.9900),
        ..Default::default()
    }
}

// =============================================================================
// WORKFLOW
// =============================================================================

#[test]
fn full_batch_workflow_on_redb() {
    let (_dir, path) = temp_db();
    let mut ledger = Ledger::with_redb(&path).expect("open");
    assert!(ledger.is_persistent());

    ledger
        .create_batch(BatchNumber(42), "Rye Whiskey")
        .expect("create batch");

    let fermentation = ledger
        .create_record(BatchNumber(42), "Fermentor", 0, fermentation_draft())
        .expect("fermentation");
    assert_eq!(fermentation.kind, RecordKind::Fermentation);
    assert_eq!(fermentation.abv, Some(7.88));
    assert_eq!(fermentation.lal, Some(78.8));

    let totals = ledger
        .create_record(
            BatchNumber(42),
            "Totals",
            0,
            RecordDraft {
                description: "Bulk storage".to_string(),
                ..Default::default()
            },
        )
        .expect("totals");
    assert_eq!(totals.kind, RecordKind::Totals);

    let product = ledger
        .add_product(
            totals.id,
            ProductDraft {
                name: "High Proof".to_string(),
                final_abv: Some(63.5),
                final_volume_l: Some(200.0),
                ..Default::default()
            },
        )
        .expect("product");
    assert_eq!(product.lal, Some(127.0));

    let metrics = ledger.metrics().expect("metrics");
    assert_eq!(metrics.batch_count, 1);
    assert_eq!(metrics.record_count, 2);
    assert_eq!(metrics.product_count, 1);
    assert_eq!(metrics.latest_batch, Some(BatchNumber(42)));
}

#[test]
fn ledger_state_survives_reopen() {
    let (_dir, path) = temp_db();
    let record_id = {
        let mut ledger = Ledger::with_redb(&path).expect("open");
        ledger
            .create_batch(BatchNumber(7), "Gin Base")
            .expect("create");
        let record = ledger
            .create_record(BatchNumber(7), "Fermentor", 0, fermentation_draft())
            .expect("record");
        assert!(ledger.ensure_operator("admin").expect("operator"));
        record.id
    };

    let mut ledger = Ledger::with_redb(&path).expect("reopen");
    let batch = ledger.batch(BatchNumber(7)).expect("batch");
    assert_eq!(batch.recipe, "Gin Base");
    assert_eq!(batch.linked_count(), 1);

    let record = ledger.record(record_id).expect("record");
    assert_eq!(record.abv, Some(7.88));

    // Bootstrap stays idempotent across restarts.
    assert!(!ledger.ensure_operator("admin").expect("operator"));

    // Fresh records keep allocating past the persisted counter.
    let next = ledger
        .create_record(BatchNumber(7), "Wash", 0, {
            RecordDraft {
                description: "Wash run".to_string(),
                ..Default::default()
            }
        })
        .expect("next record");
    assert!(next.id.0 > record_id.0);
}

#[test]
fn duplicate_batch_rejected_on_redb() {
    let (_dir, path) = temp_db();
    let mut ledger = Ledger::with_redb(&path).expect("open");
    ledger
        .create_batch(BatchNumber(1), "First")
        .expect("create");
    assert!(matches!(
        ledger.create_batch(BatchNumber(1), "Second"),
        Err(StillbookError::DuplicateBatch(BatchNumber(1)))
    ));
    // The original recipe is untouched.
    assert_eq!(ledger.batch(BatchNumber(1)).expect("batch").recipe, "First");
}

// =============================================================================
// SEARCH
// =============================================================================

#[test]
fn search_over_persistent_backend() {
    let (_dir, path) = temp_db();
    let mut ledger = Ledger::with_redb(&path).expect("open");
    for n in 1..=8 {
        let recipe = if n % 2 == 0 { "Peated Malt" } else { "Bourbon" };
        ledger.create_batch(BatchNumber(n), recipe).expect("create");
    }

    // Empty query: five most recent, newest first.
    let recent = ledger.search_batches("").expect("search");
    let numbers: Vec<u32> = recent.iter().map(|b| b.number.0).collect();
    assert_eq!(numbers, vec![8, 7, 6, 5, 4]);

    // Recipe matches are case-insensitive and unbounded.
    let peated = ledger.search_batches("peated").expect("search");
    assert_eq!(peated.len(), 4);

    // A numeric query matches the batch number's decimal form.
    let by_number = ledger.search_batches("3").expect("search");
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].number, BatchNumber(3));
}

// =============================================================================
// DELETION & CASCADE
// =============================================================================

#[test]
fn totals_deletion_cascades_to_products() {
    let (_dir, path) = temp_db();
    let mut ledger = Ledger::with_redb(&path).expect("open");
    ledger
        .create_batch(BatchNumber(5), "Vodka")
        .expect("create");
    let totals = ledger
        .create_record(
            BatchNumber(5),
            "Totals",
            0,
            RecordDraft {
                description: "Totals".to_string(),
                ..Default::default()
            },
        )
        .expect("totals");
    for name in ["A", "B"] {
        ledger
            .add_product(
                totals.id,
                ProductDraft {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .expect("product");
    }

    ledger.delete_record(totals.id).expect("delete");
    assert_eq!(ledger.metrics().expect("metrics").product_count, 0);

    // The slot is now dangling; reads and exports degrade, not fail.
    assert!(
        ledger
            .batch(BatchNumber(5))
            .expect("batch")
            .linked_count()
            > 0
    );
    let csv = export_csv(&ledger, BatchNumber(5)).expect("csv");
    assert!(csv.contains("no data"));
}

#[test]
fn slot_kind_enforced_on_redb() {
    let (_dir, path) = temp_db();
    let mut ledger = Ledger::with_redb(&path).expect("open");
    ledger
        .create_batch(BatchNumber(9), "Brandy")
        .expect("create");

    // Cut volumes only belong on distillation slots.
    let with_cuts = RecordDraft {
        description: "Fermentation".to_string(),
        cuts: stillbook_core::DistillationCuts {
            hearts_out_l: Some(50.0),
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(
        ledger.create_record(BatchNumber(9), "Fermentor", 0, with_cuts),
        Err(StillbookError::InvalidInput(_))
    ));

    // Unknown slots fail before any state is written.
    assert!(matches!(
        ledger.create_record(BatchNumber(9), "Fermentor", 3, fermentation_draft()),
        Err(StillbookError::UnknownSlot { .. })
    ));
    assert_eq!(ledger.metrics().expect("metrics").record_count, 0);
}
