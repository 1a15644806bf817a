//! # Batch Model
//!
//! A batch is one production run: a unique number, a recipe label, and the
//! fixed template of stage sections whose slots get linked to stage records
//! as the run progresses.
//!
//! Slots carry typed links (`SlotRef`): each section declares the record
//! kind it accepts, and attachment is rejected when the kinds disagree.

use crate::types::{BatchNumber, RecordKind, SlotRef, StillbookError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a recipe label, in bytes.
pub const MAX_RECIPE_LENGTH: usize = 255;

// =============================================================================
// SLOTS & SECTIONS
// =============================================================================

/// A named slot in a batch section.
///
/// Either empty or linked to exactly one persisted record of the section's
/// declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Operator-facing label, fixed by the template.
    pub label: String,
    /// The linked record, if any.
    pub link: Option<SlotRef>,
}

impl Slot {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            link: None,
        }
    }
}

/// An ordered group of slots for one production stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section name, fixed by the template.
    pub name: String,
    /// The record kind this section's slots accept.
    pub kind: RecordKind,
    /// The slots, in declaration order.
    pub slots: Vec<Slot>,
}

impl Section {
    fn new(name: &str, kind: RecordKind, labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind,
            slots: labels.iter().map(|l| Slot::new(l)).collect(),
        }
    }
}

/// The fixed stage-section template every batch starts with.
///
/// Section and slot ordering here is the declaration order the report
/// exporter must reproduce.
fn default_sections() -> Vec<Section> {
    vec![
        Section::new("Fermentor", RecordKind::Fermentation, &["Fermentor"]),
        Section::new(
            "Wash",
            RecordKind::Distillation,
            &[
                "Faints in",
                "Still in",
                "Fores out",
                "Heads out",
                "Hearts out",
                "Tails out",
                "Low Wines out",
                "Waste out",
            ],
        ),
        Section::new(
            "Spirit 1",
            RecordKind::Distillation,
            &[
                "Still in",
                "Water In",
                "Fores out",
                "Heads out",
                "Hearts out",
                "Tails out",
                "High Wines out",
                "Waste out",
                "Filter",
                "Low Proof Neutral",
            ],
        ),
        Section::new(
            "Spirit 2",
            RecordKind::Distillation,
            &[
                "Still in",
                "Water In",
                "Fores out",
                "Heads out",
                "Hearts out",
                "Tails out",
                "High Wines out",
                "Waste out",
                "Filter",
                "Low Proof Neutral",
            ],
        ),
        Section::new(
            "Totals",
            RecordKind::Totals,
            &[
                "High Proof Product Bulk Storage",
                "Total Faints Storage",
                "Water In",
                "Total Low Proof Product A",
                "Total Low Proof Product B",
                "Carbon Filter",
                "Low Proof Product Bulk Store",
                "Waste/loss",
                "Faints Destroyed",
            ],
        ),
    ]
}

// =============================================================================
// BATCH
// =============================================================================

/// A production batch with its stage-record slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique, immutable batch number.
    pub number: BatchNumber,
    /// Recipe label.
    pub recipe: String,
    /// Stage sections in declaration order.
    pub sections: Vec<Section>,
    /// When the batch was created.
    pub created_at: DateTime<Utc>,
    /// When the batch (or its slot links) was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Create a batch pre-populated with the fixed stage-slot template.
    pub fn new(
        number: BatchNumber,
        recipe: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, StillbookError> {
        let recipe = recipe.into();
        if recipe.trim().is_empty() {
            return Err(StillbookError::InvalidInput(
                "recipe is required".to_string(),
            ));
        }
        if recipe.len() > MAX_RECIPE_LENGTH {
            return Err(StillbookError::InvalidInput(format!(
                "recipe exceeds {} bytes",
                MAX_RECIPE_LENGTH
            )));
        }
        Ok(Self {
            number,
            recipe,
            sections: default_sections(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Look up a section by name (ASCII case-insensitive).
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Look up a slot by section name and index.
    pub fn slot(&self, section: &str, index: usize) -> Result<&Slot, StillbookError> {
        self.section(section)
            .and_then(|s| s.slots.get(index))
            .ok_or_else(|| StillbookError::UnknownSlot {
                section: section.to_string(),
                index,
            })
    }

    /// The record kind a slot accepts.
    pub fn slot_kind(&self, section: &str, index: usize) -> Result<RecordKind, StillbookError> {
        let kind = self
            .section(section)
            .filter(|s| index < s.slots.len())
            .map(|s| s.kind);
        kind.ok_or_else(|| StillbookError::UnknownSlot {
            section: section.to_string(),
            index,
        })
    }

    /// Attach a record link to a slot, replacing any previous link.
    ///
    /// Fails without mutating the batch when the slot does not exist or the
    /// link's kind does not match the section's declared kind.
    pub fn attach(
        &mut self,
        section: &str,
        index: usize,
        link: SlotRef,
        now: DateTime<Utc>,
    ) -> Result<(), StillbookError> {
        let expected = self.slot_kind(section, index)?;
        if link.kind != expected {
            return Err(StillbookError::KindMismatch {
                expected,
                actual: link.kind,
            });
        }
        let slot = self
            .sections
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(section))
            .and_then(|s| s.slots.get_mut(index))
            .ok_or_else(|| StillbookError::UnknownSlot {
                section: section.to_string(),
                index,
            })?;
        slot.link = Some(link);
        self.updated_at = now;
        Ok(())
    }

    /// Total number of slots across all sections.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.sections.iter().map(|s| s.slots.len()).sum()
    }

    /// Number of slots currently holding a link.
    #[must_use]
    pub fn linked_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.slots)
            .filter(|slot| slot.link.is_some())
            .count()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    fn batch() -> Batch {
        Batch::new(BatchNumber(1), "Single Malt", Utc::now()).expect("valid batch")
    }

    #[test]
    fn template_has_five_sections_in_order() {
        let b = batch();
        let names: Vec<&str> = b.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Fermentor", "Wash", "Spirit 1", "Spirit 2", "Totals"]
        );
        assert_eq!(b.slot_count(), 1 + 8 + 10 + 10 + 9);
        assert_eq!(b.linked_count(), 0);
    }

    #[test]
    fn empty_recipe_is_rejected() {
        assert!(Batch::new(BatchNumber(1), "  ", Utc::now()).is_err());
    }

    #[test]
    fn attach_links_a_slot() {
        let mut b = batch();
        let link = SlotRef::new(RecordKind::Distillation, RecordId(7));
        b.attach("Wash", 2, link, Utc::now()).expect("valid slot");
        assert_eq!(b.slot("Wash", 2).expect("slot").link, Some(link));
        assert_eq!(b.linked_count(), 1);
    }

    #[test]
    fn attach_replaces_previous_link() {
        let mut b = batch();
        let first = SlotRef::new(RecordKind::Fermentation, RecordId(1));
        let second = SlotRef::new(RecordKind::Fermentation, RecordId(2));
        b.attach("Fermentor", 0, first, Utc::now()).expect("attach");
        b.attach("Fermentor", 0, second, Utc::now())
            .expect("re-attach");
        assert_eq!(b.slot("Fermentor", 0).expect("slot").link, Some(second));
    }

    #[test]
    fn attach_rejects_unknown_section() {
        let mut b = batch();
        let link = SlotRef::new(RecordKind::Totals, RecordId(1));
        let err = b.attach("Bottling", 0, link, Utc::now()).expect_err("should fail");
        assert!(matches!(err, StillbookError::UnknownSlot { .. }));
    }

    #[test]
    fn attach_rejects_out_of_range_index() {
        let mut b = batch();
        let link = SlotRef::new(RecordKind::Fermentation, RecordId(1));
        let err = b.attach("Fermentor", 5, link, Utc::now()).expect_err("should fail");
        assert!(matches!(err, StillbookError::UnknownSlot { index: 5, .. }));
    }

    #[test]
    fn attach_rejects_kind_mismatch() {
        let mut b = batch();
        let link = SlotRef::new(RecordKind::Totals, RecordId(1));
        let err = b.attach("Wash", 0, link, Utc::now()).expect_err("should fail");
        assert!(matches!(
            err,
            StillbookError::KindMismatch {
                expected: RecordKind::Distillation,
                actual: RecordKind::Totals,
            }
        ));
    }

    #[test]
    fn section_lookup_is_case_insensitive() {
        let b = batch();
        assert!(b.section("totals").is_some());
        assert!(b.section("SPIRIT 1").is_some());
    }
}
