//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stillbook_core::{
    Batch, DistillationCuts, ProductDraft, ProductRecord, RecordDraft, StageRecord,
    StillbookError,
    record::{MAX_DESCRIPTION_LENGTH, MAX_LOCATION_LENGTH},
};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Ledger status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub batch_count: usize,
    pub record_count: usize,
    pub product_count: usize,
    pub latest_batch: Option<u32>,
}

// =============================================================================
// BATCH JSON
// =============================================================================

/// One-line batch summary for list and create responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub number: u32,
    pub recipe: String,
    pub created_at: String,
    pub updated_at: String,
    pub linked_slots: usize,
}

impl From<&Batch> for BatchSummary {
    fn from(batch: &Batch) -> Self {
        Self {
            number: batch.number.0,
            recipe: batch.recipe.clone(),
            created_at: batch.created_at.to_rfc3339(),
            updated_at: batch.updated_at.to_rfc3339(),
            linked_slots: batch.linked_count(),
        }
    }
}

/// A slot in the batch detail view, with its record resolved inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotJson {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub record: Option<RecordJson>,
}

/// A section of the batch detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionJson {
    pub name: String,
    pub kind: String,
    pub slots: Vec<SlotJson>,
}

/// Full batch log: summary plus every section and resolved slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetail {
    pub number: u32,
    pub recipe: String,
    pub created_at: String,
    pub updated_at: String,
    pub sections: Vec<SectionJson>,
}

// =============================================================================
// RECORD JSON
// =============================================================================

/// Distillation cut volumes in litres.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CutsJson {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub faints_in_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fores_out_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub heads_out_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub hearts_out_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tails_out_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub waste_out_l: Option<f64>,
}

impl From<DistillationCuts> for CutsJson {
    fn from(cuts: DistillationCuts) -> Self {
        Self {
            faints_in_l: cuts.faints_in_l,
            fores_out_l: cuts.fores_out_l,
            heads_out_l: cuts.heads_out_l,
            hearts_out_l: cuts.hearts_out_l,
            tails_out_l: cuts.tails_out_l,
            waste_out_l: cuts.waste_out_l,
        }
    }
}

impl From<CutsJson> for DistillationCuts {
    fn from(cuts: CutsJson) -> Self {
        Self {
            faints_in_l: cuts.faints_in_l,
            fores_out_l: cuts.fores_out_l,
            heads_out_l: cuts.heads_out_l,
            hearts_out_l: cuts.hearts_out_l,
            tails_out_l: cuts.tails_out_l,
            waste_out_l: cuts.waste_out_l,
        }
    }
}

/// Stage record JSON representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordJson {
    pub id: u64,
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub from_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub to_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sg_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sg_end: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub abv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lal: Option<f64>,
    #[serde(default)]
    pub cuts: CutsJson,
}

impl From<&StageRecord> for RecordJson {
    fn from(record: &StageRecord) -> Self {
        Self {
            id: record.id.0,
            kind: record.kind.name().to_string(),
            description: record.description.clone(),
            from_location: record.from_location.clone(),
            to_location: record.to_location.clone(),
            volume_l: record.volume_l,
            start_date: record.start_date,
            end_date: record.end_date,
            sg_start: record.sg_start,
            sg_end: record.sg_end,
            abv: record.abv,
            lal: record.lal,
            cuts: record.cuts.into(),
        }
    }
}

// =============================================================================
// BATCH REQUEST/RESPONSE
// =============================================================================

/// Batch creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub number: u32,
    pub recipe: String,
}

/// Batch creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub batch: Option<BatchSummary>,
    pub error: Option<String>,
}

impl BatchResponse {
    pub fn success(batch: &Batch) -> Self {
        Self {
            success: true,
            batch: Some(batch.into()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            batch: None,
            error: Some(msg.into()),
        }
    }
}

/// Batch detail response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchDetailResponse {
    pub success: bool,
    pub batch: Option<BatchDetail>,
    pub error: Option<String>,
}

impl BatchDetailResponse {
    pub fn success(detail: BatchDetail) -> Self {
        Self {
            success: true,
            batch: Some(detail),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            batch: None,
            error: Some(msg.into()),
        }
    }
}

/// Batch list/search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub batches: Vec<BatchSummary>,
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn success(batches: &[Batch]) -> Self {
        Self {
            success: true,
            batches: batches.iter().map(BatchSummary::from).collect(),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            batches: vec![],
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// RECORD REQUEST/RESPONSE
// =============================================================================

/// Stage record create/update request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordRequest {
    pub description: String,
    #[serde(default)]
    pub from_location: Option<String>,
    #[serde(default)]
    pub to_location: Option<String>,
    #[serde(default)]
    pub volume_l: Option<f64>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub sg_start: Option<f64>,
    #[serde(default)]
    pub sg_end: Option<f64>,
    #[serde(default)]
    pub abv: Option<f64>,
    #[serde(default)]
    pub lal: Option<f64>,
    #[serde(default)]
    pub cuts: CutsJson,
}

impl RecordRequest {
    /// Convert to a draft, enforcing size caps at the API boundary.
    ///
    /// Field semantics (kind checks, numeric range checks, the derived-field
    /// calculation) stay in the core; the boundary only rejects payloads
    /// oversized enough to be abuse rather than typos.
    pub fn to_draft(&self) -> Result<RecordDraft, StillbookError> {
        if self.description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(StillbookError::InvalidInput(format!(
                "description length {} exceeds maximum {} bytes",
                self.description.len(),
                MAX_DESCRIPTION_LENGTH
            )));
        }
        for location in [self.from_location.as_ref(), self.to_location.as_ref()]
            .into_iter()
            .flatten()
        {
            if location.len() > MAX_LOCATION_LENGTH {
                return Err(StillbookError::InvalidInput(format!(
                    "location length {} exceeds maximum {} bytes",
                    location.len(),
                    MAX_LOCATION_LENGTH
                )));
            }
        }

        Ok(RecordDraft {
            description: self.description.clone(),
            from_location: self.from_location.clone(),
            to_location: self.to_location.clone(),
            volume_l: self.volume_l,
            start_date: self.start_date,
            end_date: self.end_date,
            sg_start: self.sg_start,
            sg_end: self.sg_end,
            abv: self.abv,
            lal: self.lal,
            cuts: self.cuts.into(),
        })
    }
}

/// Stage record response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordResponse {
    pub success: bool,
    pub record: Option<RecordJson>,
    pub error: Option<String>,
}

impl RecordResponse {
    pub fn success(record: &StageRecord) -> Self {
        Self {
            success: true,
            record: Some(record.into()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            record: None,
            error: Some(msg.into()),
        }
    }
}

/// Bare success/error acknowledgement, used by deletions and by endpoints
/// whose success body is not JSON (CSV export).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl AckResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// PRODUCT REQUEST/RESPONSE
// =============================================================================

/// Product creation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub final_abv: Option<f64>,
    #[serde(default)]
    pub final_volume_l: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub lal: Option<f64>,
}

impl ProductRequest {
    /// Convert to a draft, enforcing size caps at the API boundary.
    pub fn to_draft(&self) -> Result<ProductDraft, StillbookError> {
        if self.name.len() > MAX_DESCRIPTION_LENGTH {
            return Err(StillbookError::InvalidInput(format!(
                "name length {} exceeds maximum {} bytes",
                self.name.len(),
                MAX_DESCRIPTION_LENGTH
            )));
        }
        if let Some(location) = &self.location
            && location.len() > MAX_LOCATION_LENGTH
        {
            return Err(StillbookError::InvalidInput(format!(
                "location length {} exceeds maximum {} bytes",
                location.len(),
                MAX_LOCATION_LENGTH
            )));
        }

        Ok(ProductDraft {
            name: self.name.clone(),
            final_abv: self.final_abv,
            final_volume_l: self.final_volume_l,
            location: self.location.clone(),
            lal: self.lal,
        })
    }
}

/// Product JSON representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductJson {
    pub id: u64,
    pub totals: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub final_abv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub final_volume_l: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lal: Option<f64>,
}

impl From<&ProductRecord> for ProductJson {
    fn from(product: &ProductRecord) -> Self {
        Self {
            id: product.id.0,
            totals: product.totals.0,
            name: product.name.clone(),
            final_abv: product.final_abv,
            final_volume_l: product.final_volume_l,
            location: product.location.clone(),
            lal: product.lal,
        }
    }
}

/// Product creation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub success: bool,
    pub product: Option<ProductJson>,
    pub error: Option<String>,
}

impl ProductResponse {
    pub fn success(product: &ProductRecord) -> Self {
        Self {
            success: true,
            product: Some(product.into()),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            product: None,
            error: Some(msg.into()),
        }
    }
}
