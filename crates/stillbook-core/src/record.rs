//! # Stage and Product Records
//!
//! A stage record is one row of a batch's production log: description,
//! source/destination locations, volume, dates, gravities, and the alcohol
//! metrics. Distillation records additionally carry the run's cut volumes.
//!
//! Drafts are the validation boundary: operator input enters as a
//! `RecordDraft` / `ProductDraft`, is checked, has its derived fields
//! resolved, and only then becomes a persisted record.

use crate::calc::{Measurements, round2};
use crate::types::{ProductId, RecordId, RecordKind, StillbookError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a record description, in bytes.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// Maximum length of a location label, in bytes.
pub const MAX_LOCATION_LENGTH: usize = 100;

// =============================================================================
// DISTILLATION CUTS
// =============================================================================

/// Per-run cut volumes of a distillation record, all in litres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistillationCuts {
    /// Faints charged into the still alongside the wash.
    pub faints_in_l: Option<f64>,
    /// Foreshots drawn off.
    pub fores_out_l: Option<f64>,
    /// Heads drawn off.
    pub heads_out_l: Option<f64>,
    /// Hearts collected.
    pub hearts_out_l: Option<f64>,
    /// Tails drawn off.
    pub tails_out_l: Option<f64>,
    /// Waste discarded.
    pub waste_out_l: Option<f64>,
}

impl DistillationCuts {
    /// True when no cut field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faints_in_l.is_none()
            && self.fores_out_l.is_none()
            && self.heads_out_l.is_none()
            && self.hearts_out_l.is_none()
            && self.tails_out_l.is_none()
            && self.waste_out_l.is_none()
    }

    fn values(&self) -> [Option<f64>; 6] {
        [
            self.faints_in_l,
            self.fores_out_l,
            self.heads_out_l,
            self.hearts_out_l,
            self.tails_out_l,
            self.waste_out_l,
        ]
    }
}

// =============================================================================
// STAGE RECORD
// =============================================================================

/// A persisted stage record.
///
/// All measurement fields are optional; only the description is required.
/// `abv`/`lal` hold either the operator-entered value or the derived one,
/// never a redundant recomputation of a present value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Store-allocated identifier.
    pub id: RecordId,
    /// The kind of this record.
    pub kind: RecordKind,
    /// Description of the record.
    pub description: String,
    /// Source location label.
    pub from_location: Option<String>,
    /// Destination location label.
    pub to_location: Option<String>,
    /// Volume in litres.
    pub volume_l: Option<f64>,
    /// Start date.
    pub start_date: Option<NaiveDate>,
    /// End date.
    pub end_date: Option<NaiveDate>,
    /// Starting specific gravity.
    pub sg_start: Option<f64>,
    /// Ending specific gravity.
    pub sg_end: Option<f64>,
    /// Alcohol by volume, percent.
    pub abv: Option<f64>,
    /// Litres of absolute alcohol.
    pub lal: Option<f64>,
    /// Cut volumes (distillation records only).
    pub cuts: DistillationCuts,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// RECORD DRAFT
// =============================================================================

/// Operator input for creating or updating a stage record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    /// Description of the record (required).
    pub description: String,
    /// Source location label.
    pub from_location: Option<String>,
    /// Destination location label.
    pub to_location: Option<String>,
    /// Volume in litres.
    pub volume_l: Option<f64>,
    /// Start date.
    pub start_date: Option<NaiveDate>,
    /// End date.
    pub end_date: Option<NaiveDate>,
    /// Starting specific gravity.
    pub sg_start: Option<f64>,
    /// Ending specific gravity.
    pub sg_end: Option<f64>,
    /// Explicit alcohol by volume, percent.
    pub abv: Option<f64>,
    /// Explicit litres of absolute alcohol.
    pub lal: Option<f64>,
    /// Cut volumes (only valid for distillation records).
    #[serde(default)]
    pub cuts: DistillationCuts,
}

fn check_finite(name: &str, value: Option<f64>) -> Result<(), StillbookError> {
    if let Some(v) = value
        && !v.is_finite()
    {
        return Err(StillbookError::InvalidInput(format!(
            "{} must be a finite number",
            name
        )));
    }
    Ok(())
}

fn check_non_negative(name: &str, value: Option<f64>) -> Result<(), StillbookError> {
    check_finite(name, value)?;
    if let Some(v) = value
        && v < 0.0
    {
        return Err(StillbookError::InvalidInput(format!(
            "{} must not be negative",
            name
        )));
    }
    Ok(())
}

fn check_location(name: &str, value: Option<&String>) -> Result<(), StillbookError> {
    if let Some(s) = value
        && s.len() > MAX_LOCATION_LENGTH
    {
        return Err(StillbookError::InvalidInput(format!(
            "{} exceeds {} bytes",
            name, MAX_LOCATION_LENGTH
        )));
    }
    Ok(())
}

impl RecordDraft {
    /// Validate the draft for the given record kind.
    ///
    /// Checks field lengths and numeric sanity. Cut volumes are rejected on
    /// non-distillation records, matching the per-stage schemas of the log.
    pub fn validate(&self, kind: RecordKind) -> Result<(), StillbookError> {
        if self.description.trim().is_empty() {
            return Err(StillbookError::InvalidInput(
                "description is required".to_string(),
            ));
        }
        if self.description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(StillbookError::InvalidInput(format!(
                "description exceeds {} bytes",
                MAX_DESCRIPTION_LENGTH
            )));
        }
        check_location("from", self.from_location.as_ref())?;
        check_location("to", self.to_location.as_ref())?;

        check_non_negative("volume", self.volume_l)?;
        check_non_negative("abv", self.abv)?;
        check_non_negative("lal", self.lal)?;
        check_finite("sg start", self.sg_start)?;
        check_finite("sg end", self.sg_end)?;
        const CUT_NAMES: [&str; 6] = [
            "faints in",
            "fores out",
            "heads out",
            "hearts out",
            "tails out",
            "waste out",
        ];
        for (name, value) in CUT_NAMES.iter().zip(self.cuts.values()) {
            check_non_negative(name, value)?;
        }

        if kind != RecordKind::Distillation && !self.cuts.is_empty() {
            return Err(StillbookError::InvalidInput(format!(
                "cut volumes are only valid on distillation records, not {}",
                kind
            )));
        }
        Ok(())
    }

    /// Validate and resolve into a persistable record.
    ///
    /// Runs the derived-field calculation: explicit ABV/LAL values are kept,
    /// missing ones are derived from the gravities and volume where possible.
    pub fn into_record(
        self,
        id: RecordId,
        kind: RecordKind,
        now: DateTime<Utc>,
    ) -> Result<StageRecord, StillbookError> {
        self.validate(kind)?;

        let resolved = Measurements {
            sg_start: self.sg_start,
            sg_end: self.sg_end,
            volume_l: self.volume_l,
            abv: self.abv,
            lal: self.lal,
        }
        .resolve();

        Ok(StageRecord {
            id,
            kind,
            description: self.description,
            from_location: self.from_location,
            to_location: self.to_location,
            volume_l: self.volume_l,
            start_date: self.start_date,
            end_date: self.end_date,
            sg_start: self.sg_start,
            sg_end: self.sg_end,
            abv: resolved.abv,
            lal: resolved.lal,
            cuts: self.cuts,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// PRODUCT RECORD
// =============================================================================

/// A finished-product split, owned by exactly one Totals record.
///
/// Deleted in cascade when its parent Totals record is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Store-allocated identifier.
    pub id: ProductId,
    /// The owning Totals record.
    pub totals: RecordId,
    /// Product label, e.g. "A", "B".
    pub name: String,
    /// Final alcohol by volume, percent.
    pub final_abv: Option<f64>,
    /// Final volume in litres.
    pub final_volume_l: Option<f64>,
    /// Where the product was distilled or stored.
    pub location: Option<String>,
    /// Litres of absolute alcohol (explicit or derived).
    pub lal: Option<f64>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Operator input for creating a product record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    /// Product label (required).
    pub name: String,
    /// Final alcohol by volume, percent.
    pub final_abv: Option<f64>,
    /// Final volume in litres.
    pub final_volume_l: Option<f64>,
    /// Where the product was distilled or stored.
    pub location: Option<String>,
    /// Explicit litres of absolute alcohol.
    pub lal: Option<f64>,
}

impl ProductDraft {
    /// Validate the draft.
    pub fn validate(&self) -> Result<(), StillbookError> {
        if self.name.trim().is_empty() {
            return Err(StillbookError::InvalidInput(
                "product name is required".to_string(),
            ));
        }
        if self.name.len() > MAX_DESCRIPTION_LENGTH {
            return Err(StillbookError::InvalidInput(format!(
                "product name exceeds {} bytes",
                MAX_DESCRIPTION_LENGTH
            )));
        }
        check_location("location", self.location.as_ref())?;
        check_non_negative("final abv", self.final_abv)?;
        check_non_negative("final volume", self.final_volume_l)?;
        check_non_negative("lal", self.lal)?;
        Ok(())
    }

    /// Validate and resolve into a persistable product record.
    pub fn into_product(
        self,
        id: ProductId,
        totals: RecordId,
        now: DateTime<Utc>,
    ) -> Result<ProductRecord, StillbookError> {
        self.validate()?;

        // Same precedence as stage records: an explicit LAL is never
        // overwritten by the derived volume * abv / 100.
        let lal = match (self.lal, self.final_volume_l, self.final_abv) {
            (Some(explicit), _, _) => Some(explicit),
            (None, Some(v), Some(a)) => Some(round2(v * (a / 100.0))),
            _ => None,
        };

        Ok(ProductRecord {
            id,
            totals,
            name: self.name,
            final_abv: self.final_abv,
            final_volume_l: self.final_volume_l,
            location: self.location,
            lal,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn draft_requires_description() {
        let draft = RecordDraft::default();
        assert!(matches!(
            draft.validate(RecordKind::Fermentation),
            Err(StillbookError::InvalidInput(_))
        ));
    }

    #[test]
    fn draft_rejects_cuts_on_fermentation() {
        let draft = RecordDraft {
            description: "Fermentation".to_string(),
            cuts: DistillationCuts {
                hearts_out_l: Some(70.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(draft.validate(RecordKind::Fermentation).is_err());
        assert!(draft.validate(RecordKind::Distillation).is_ok());
    }

    #[test]
    fn draft_rejects_negative_volume() {
        let draft = RecordDraft {
            description: "Wash Run".to_string(),
            volume_l: Some(-1.0),
            ..Default::default()
        };
        assert!(draft.validate(RecordKind::Distillation).is_err());
    }

    #[test]
    fn draft_rejects_nan_gravity() {
        let draft = RecordDraft {
            description: "Fermentation".to_string(),
            sg_start: Some(f64::NAN),
            ..Default::default()
        };
        assert!(draft.validate(RecordKind::Fermentation).is_err());
    }

    #[test]
    fn into_record_derives_metrics() {
        let draft = RecordDraft {
            description: "Fermentation".to_string(),
            sg_start: Some(1.0500),
            sg_end: Some(0.9900),
            volume_l: Some(100.0),
            ..Default::default()
        };
        let record = draft
            .into_record(RecordId(1), RecordKind::Fermentation, now())
            .expect("valid draft");
        assert_eq!(record.abv, Some(7.88));
        assert_eq!(record.lal, Some(7.88));
    }

    #[test]
    fn into_record_keeps_explicit_metrics() {
        let draft = RecordDraft {
            description: "Fermentation".to_string(),
            sg_start: Some(1.0500),
            sg_end: Some(0.9900),
            abv: Some(8.5),
            lal: Some(3.0),
            ..Default::default()
        };
        let record = draft
            .into_record(RecordId(1), RecordKind::Fermentation, now())
            .expect("valid draft");
        assert_eq!(record.abv, Some(8.5));
        assert_eq!(record.lal, Some(3.0));
    }

    #[test]
    fn product_draft_derives_lal() {
        let draft = ProductDraft {
            name: "A".to_string(),
            final_abv: Some(40.0),
            final_volume_l: Some(100.0),
            ..Default::default()
        };
        let product = draft
            .into_product(ProductId(1), RecordId(9), now())
            .expect("valid draft");
        assert_eq!(product.lal, Some(40.0));
    }

    #[test]
    fn product_draft_requires_name() {
        let draft = ProductDraft::default();
        assert!(draft.into_product(ProductId(1), RecordId(9), now()).is_err());
    }

    #[test]
    fn cuts_is_empty_tracks_all_fields() {
        assert!(DistillationCuts::default().is_empty());
        let cuts = DistillationCuts {
            waste_out_l: Some(20.0),
            ..Default::default()
        };
        assert!(!cuts.is_empty());
        assert_eq!(cuts.values()[5], Some(20.0));
    }
}
