//! # Report Exporter
//!
//! Flattens a batch and its linked records into an ordered row sequence and
//! renders it as CSV: a header block (batch number, recipe, timestamps),
//! then one row per slot in the template's declaration order, then product
//! rows for every linked Totals record.
//!
//! Unlinked slots and dangling links render as a "no data" placeholder row,
//! never an error. The column layout is the externally observable format;
//! changes here break downstream spreadsheets.

use crate::batch::Batch;
use crate::ledger::Ledger;
use crate::record::{ProductRecord, StageRecord};
use crate::types::{BatchNumber, RecordId, StillbookError};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Placeholder for a slot with no resolvable record.
pub const NO_DATA: &str = "no data";

/// Column header row for the stage-record table.
pub const REPORT_COLUMNS: [&str; 17] = [
    "Section",
    "Description",
    "From",
    "To",
    "Volume (L)",
    "Start Date",
    "SG Start",
    "End Date",
    "SG End",
    "ABV",
    "LAL",
    "Faints In (L)",
    "Fores (L)",
    "Heads (L)",
    "Hearts (L)",
    "Tails (L)",
    "Waste (L)",
];

/// Column header row for the product table.
pub const PRODUCT_COLUMNS: [&str; 6] = [
    "Product",
    "Name",
    "Location",
    "Final ABV",
    "Final Volume (L)",
    "LAL",
];

// =============================================================================
// REPORT SOURCE
// =============================================================================

/// Everything the exporter needs, resolved up front.
///
/// Dangling slot links are simply absent from `records`; the flattener
/// turns them into placeholder rows.
#[derive(Debug, Clone)]
pub struct ReportSource {
    /// The batch being exported.
    pub batch: Batch,
    /// Resolved stage records, keyed by identifier.
    pub records: BTreeMap<RecordId, StageRecord>,
    /// Products of every linked Totals record, in store order.
    pub products: Vec<ProductRecord>,
}

impl ReportSource {
    /// Resolve a batch's links against the ledger.
    pub fn from_ledger(ledger: &Ledger, number: BatchNumber) -> Result<Self, StillbookError> {
        let batch = ledger.batch(number)?;

        let mut records = BTreeMap::new();
        let mut products = Vec::new();
        for section in &batch.sections {
            for slot in &section.slots {
                let Some(link) = slot.link else { continue };
                let Some(record) = ledger.resolve(link)? else {
                    continue;
                };
                if record.kind == crate::types::RecordKind::Totals {
                    products.extend(ledger.products_for(record.id)?);
                }
                records.insert(record.id, record);
            }
        }

        Ok(Self {
            batch,
            records,
            products,
        })
    }
}

// =============================================================================
// REPORT ROWS
// =============================================================================

/// One row of the flattened report.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRow {
    /// A key/value row of the header block.
    Header {
        /// Field label.
        field: &'static str,
        /// Rendered value.
        value: String,
    },
    /// A slot whose link resolved to a record.
    Linked {
        /// Section name.
        section: String,
        /// Slot label.
        label: String,
        /// The resolved record.
        record: StageRecord,
    },
    /// A slot with no link, or whose link no longer resolves.
    Missing {
        /// Section name.
        section: String,
        /// Slot label.
        label: String,
    },
    /// A product of a linked Totals record.
    Product(ProductRecord),
}

/// Flatten a resolved batch into the fixed row order.
#[must_use]
pub fn flatten(source: &ReportSource) -> Vec<ReportRow> {
    let batch = &source.batch;
    let mut rows = vec![
        ReportRow::Header {
            field: "Batch",
            value: batch.number.to_string(),
        },
        ReportRow::Header {
            field: "Recipe",
            value: batch.recipe.clone(),
        },
        ReportRow::Header {
            field: "Created",
            value: batch.created_at.to_rfc3339(),
        },
        ReportRow::Header {
            field: "Updated",
            value: batch.updated_at.to_rfc3339(),
        },
    ];

    for section in &batch.sections {
        for slot in &section.slots {
            let resolved = slot
                .link
                .and_then(|link| source.records.get(&link.record))
                .cloned();
            rows.push(match resolved {
                Some(record) => ReportRow::Linked {
                    section: section.name.clone(),
                    label: slot.label.clone(),
                    record,
                },
                None => ReportRow::Missing {
                    section: section.name.clone(),
                    label: slot.label.clone(),
                },
            });
        }
    }

    for product in &source.products {
        rows.push(ReportRow::Product(product.clone()));
    }

    rows
}

// =============================================================================
// CSV RENDERING
// =============================================================================

fn fmt_f64(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn fmt_text(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

/// Render flattened rows as CSV.
pub fn render_csv(rows: &[ReportRow]) -> Result<String, StillbookError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    let ser = |e: csv::Error| StillbookError::SerializationError(e.to_string());

    let mut columns_written = false;
    let mut product_columns_written = false;

    for row in rows {
        match row {
            ReportRow::Header { field, value } => {
                writer.write_record([*field, value.as_str()]).map_err(ser)?;
            }
            ReportRow::Linked { section, label, record } => {
                if !columns_written {
                    writer.write_record(REPORT_COLUMNS).map_err(ser)?;
                    columns_written = true;
                }
                writer
                    .write_record([
                        section.clone(),
                        label.clone(),
                        fmt_text(record.from_location.as_ref()),
                        fmt_text(record.to_location.as_ref()),
                        fmt_f64(record.volume_l),
                        fmt_date(record.start_date),
                        fmt_f64(record.sg_start),
                        fmt_date(record.end_date),
                        fmt_f64(record.sg_end),
                        fmt_f64(record.abv),
                        fmt_f64(record.lal),
                        fmt_f64(record.cuts.faints_in_l),
                        fmt_f64(record.cuts.fores_out_l),
                        fmt_f64(record.cuts.heads_out_l),
                        fmt_f64(record.cuts.hearts_out_l),
                        fmt_f64(record.cuts.tails_out_l),
                        fmt_f64(record.cuts.waste_out_l),
                    ])
                    .map_err(ser)?;
            }
            ReportRow::Missing { section, label } => {
                if !columns_written {
                    writer.write_record(REPORT_COLUMNS).map_err(ser)?;
                    columns_written = true;
                }
                let mut fields = vec![section.clone(), label.clone(), NO_DATA.to_string()];
                fields.resize(REPORT_COLUMNS.len(), String::new());
                writer.write_record(&fields).map_err(ser)?;
            }
            ReportRow::Product(product) => {
                if !product_columns_written {
                    writer.write_record(PRODUCT_COLUMNS).map_err(ser)?;
                    product_columns_written = true;
                }
                writer
                    .write_record([
                        "Product".to_string(),
                        product.name.clone(),
                        fmt_text(product.location.as_ref()),
                        fmt_f64(product.final_abv),
                        fmt_f64(product.final_volume_l),
                        fmt_f64(product.lal),
                    ])
                    .map_err(ser)?;
            }
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| StillbookError::SerializationError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StillbookError::SerializationError(e.to_string()))
}

/// Export a batch's full history as CSV.
pub fn export_csv(ledger: &Ledger, number: BatchNumber) -> Result<String, StillbookError> {
    let source = ReportSource::from_ledger(ledger, number)?;
    render_csv(&flatten(&source))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ProductDraft, RecordDraft};

    fn ledger_with_batch() -> Ledger {
        let mut ledger = Ledger::new();
        ledger
            .create_batch(BatchNumber(7), "Single Malt")
            .expect("create");
        ledger
    }

    #[test]
    fn empty_batch_flattens_to_placeholders() {
        let ledger = ledger_with_batch();
        let source = ReportSource::from_ledger(&ledger, BatchNumber(7)).expect("source");
        let rows = flatten(&source);

        // 4 header rows + one row per template slot.
        let batch = ledger.batch(BatchNumber(7)).expect("batch");
        assert_eq!(rows.len(), 4 + batch.slot_count());
        assert!(
            rows[4..]
                .iter()
                .all(|r| matches!(r, ReportRow::Missing { .. }))
        );
    }

    #[test]
    fn rows_follow_section_declaration_order() {
        let ledger = ledger_with_batch();
        let source = ReportSource::from_ledger(&ledger, BatchNumber(7)).expect("source");
        let rows = flatten(&source);

        let sections: Vec<&str> = rows
            .iter()
            .filter_map(|r| match r {
                ReportRow::Missing { section, .. } => Some(section.as_str()),
                _ => None,
            })
            .collect();
        let mut deduped = sections.clone();
        deduped.dedup();
        assert_eq!(
            deduped,
            vec!["Fermentor", "Wash", "Spirit 1", "Spirit 2", "Totals"]
        );
    }

    #[test]
    fn linked_slot_renders_field_values() {
        let mut ledger = ledger_with_batch();
        ledger
            .create_record(
                BatchNumber(7),
                "Fermentor",
                0,
                RecordDraft {
                    description: "Fermentation".to_string(),
                    to_location: Some("Fermenter 1".to_string()),
                    sg_start: Some(1.0500),
                    sg_end: Some(0.9900),
                    volume_l: Some(100.0),
                    ..Default::default()
                },
            )
            .expect("record");

        let csv = export_csv(&ledger, BatchNumber(7)).expect("csv");
        let fermentor_line = csv
            .lines()
            .find(|l| l.starts_with("Fermentor,"))
            .expect("fermentor row");
        assert!(fermentor_line.contains("Fermenter 1"));
        assert!(fermentor_line.contains("7.88"));
        assert!(!fermentor_line.contains(NO_DATA));
    }

    #[test]
    fn dangling_link_renders_placeholder_not_error() {
        let mut ledger = ledger_with_batch();
        let record = ledger
            .create_record(
                BatchNumber(7),
                "Wash",
                0,
                RecordDraft {
                    description: "Faints".to_string(),
                    ..Default::default()
                },
            )
            .expect("record");
        ledger.delete_record(record.id).expect("delete");

        let csv = export_csv(&ledger, BatchNumber(7)).expect("csv");
        let wash_line = csv
            .lines()
            .find(|l| l.starts_with("Wash,"))
            .expect("wash row");
        assert!(wash_line.contains(NO_DATA));
    }

    #[test]
    fn products_append_after_sections() {
        let mut ledger = ledger_with_batch();
        let totals = ledger
            .create_record(
                BatchNumber(7),
                "Totals",
                0,
                RecordDraft {
                    description: "Totals".to_string(),
                    ..Default::default()
                },
            )
            .expect("totals");
        ledger
            .add_product(
                totals.id,
                ProductDraft {
                    name: "A".to_string(),
                    final_abv: Some(40.0),
                    final_volume_l: Some(100.0),
                    location: Some("Tank 1".to_string()),
                    ..Default::default()
                },
            )
            .expect("product");

        let csv = export_csv(&ledger, BatchNumber(7)).expect("csv");
        let last_line = csv.lines().last().expect("last line");
        assert!(last_line.starts_with("Product,A"));
        assert!(last_line.contains("40"));
    }

    #[test]
    fn header_block_carries_batch_identity() {
        let ledger = ledger_with_batch();
        let csv = export_csv(&ledger, BatchNumber(7)).expect("csv");
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Batch,7"));
        assert_eq!(lines.next(), Some("Recipe,Single Malt"));
    }

    #[test]
    fn export_of_missing_batch_is_not_found() {
        let ledger = Ledger::new();
        assert!(matches!(
            export_csv(&ledger, BatchNumber(1)),
            Err(StillbookError::BatchNotFound(BatchNumber(1)))
        ));
    }
}
