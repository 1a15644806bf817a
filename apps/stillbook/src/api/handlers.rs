//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        AckResponse, BatchDetail, BatchDetailResponse, BatchResponse, CreateBatchRequest,
        HealthResponse, ProductRequest, ProductResponse, RecordRequest, RecordResponse,
        SearchResponse, SectionJson, SlotJson, StatusResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use stillbook_core::{BatchNumber, Ledger, ProductId, RecordId, StillbookError, export_csv};

/// Map a core error to the HTTP status it should surface as.
fn error_status(error: &StillbookError) -> StatusCode {
    match error {
        StillbookError::InvalidInput(_)
        | StillbookError::UnknownSlot { .. }
        | StillbookError::KindMismatch { .. } => StatusCode::BAD_REQUEST,
        StillbookError::DuplicateBatch(_) => StatusCode::CONFLICT,
        StillbookError::BatchNotFound(_)
        | StillbookError::RecordNotFound(_)
        | StillbookError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        StillbookError::SerializationError(_) | StillbookError::IoError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get ledger status.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    match ledger.metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            Json(StatusResponse {
                batch_count: metrics.batch_count,
                record_count: metrics.record_count,
                product_count: metrics.product_count,
                latest_batch: metrics.latest_batch.map(|n| n.0),
            }),
        )
            .into_response(),
        Err(e) => (
            error_status(&e),
            Json(AckResponse::error(format!("Status failed: {}", e))),
        )
            .into_response(),
    }
}

// =============================================================================
// BATCH HANDLERS
// =============================================================================

/// Query parameters for the batch list endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// List or search batches.
pub async fn search_batches_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    match ledger.search_batches(&params.q) {
        Ok(batches) => (StatusCode::OK, Json(SearchResponse::success(&batches))),
        Err(e) => (
            error_status(&e),
            Json(SearchResponse::error(format!("Search failed: {}", e))),
        ),
    }
}

/// Create a batch.
pub async fn create_batch_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateBatchRequest>,
) -> impl IntoResponse {
    let mut ledger = state.ledger.write().await;
    match ledger.create_batch(BatchNumber(request.number), &request.recipe) {
        Ok(batch) => (StatusCode::CREATED, Json(BatchResponse::success(&batch))),
        Err(e) => (
            error_status(&e),
            Json(BatchResponse::error(format!("Create failed: {}", e))),
        ),
    }
}

/// Full batch log with every slot resolved.
pub async fn batch_handler(
    State(state): State<AppState>,
    Path(number): Path<u32>,
) -> impl IntoResponse {
    let ledger = state.ledger.read().await;
    match build_batch_detail(&ledger, BatchNumber(number)) {
        Ok(detail) => (StatusCode::OK, Json(BatchDetailResponse::success(detail))),
        Err(e) => (
            error_status(&e),
            Json(BatchDetailResponse::error(format!("Fetch failed: {}", e))),
        ),
    }
}

/// Resolve a batch's slots into the detail view.
fn build_batch_detail(ledger: &Ledger, number: BatchNumber) -> Result<BatchDetail, StillbookError> {
    let batch = ledger.batch(number)?;

    let mut sections = Vec::with_capacity(batch.sections.len());
    for section in &batch.sections {
        let mut slots = Vec::with_capacity(section.slots.len());
        for slot in &section.slots {
            // Dangling links read as empty slots.
            let record = match slot.link {
                Some(link) => ledger.resolve(link)?,
                None => None,
            };
            slots.push(SlotJson {
                label: slot.label.clone(),
                record: record.as_ref().map(Into::into),
            });
        }
        sections.push(SectionJson {
            name: section.name.clone(),
            kind: section.kind.name().to_string(),
            slots,
        });
    }

    Ok(BatchDetail {
        number: batch.number.0,
        recipe: batch.recipe.clone(),
        created_at: batch.created_at.to_rfc3339(),
        updated_at: batch.updated_at.to_rfc3339(),
        sections,
    })
}

// =============================================================================
// RECORD HANDLERS
// =============================================================================

/// Create a stage record and link it into a batch slot.
pub async fn create_record_handler(
    State(state): State<AppState>,
    Path((number, section, index)): Path<(u32, String, usize)>,
    Json(request): Json<RecordRequest>,
) -> impl IntoResponse {
    let draft = match request.to_draft() {
        Ok(d) => d,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RecordResponse::error(format!("Invalid record: {}", e))),
            );
        }
    };

    let mut ledger = state.ledger.write().await;
    match ledger.create_record(BatchNumber(number), &section, index, draft) {
        Ok(record) => (StatusCode::CREATED, Json(RecordResponse::success(&record))),
        Err(e) => (
            error_status(&e),
            Json(RecordResponse::error(format!("Create failed: {}", e))),
        ),
    }
}

/// Replace a stage record's fields.
pub async fn update_record_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<RecordRequest>,
) -> impl IntoResponse {
    let draft = match request.to_draft() {
        Ok(d) => d,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RecordResponse::error(format!("Invalid record: {}", e))),
            );
        }
    };

    let mut ledger = state.ledger.write().await;
    match ledger.update_record(RecordId(id), draft) {
        Ok(record) => (StatusCode::OK, Json(RecordResponse::success(&record))),
        Err(e) => (
            error_status(&e),
            Json(RecordResponse::error(format!("Update failed: {}", e))),
        ),
    }
}

/// Delete a stage record.
pub async fn delete_record_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let mut ledger = state.ledger.write().await;
    match ledger.delete_record(RecordId(id)) {
        Ok(()) => (StatusCode::OK, Json(AckResponse::success())),
        Err(e) => (
            error_status(&e),
            Json(AckResponse::error(format!("Delete failed: {}", e))),
        ),
    }
}

// =============================================================================
// PRODUCT HANDLERS
// =============================================================================

/// Attach a product to a Totals record.
pub async fn create_product_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ProductRequest>,
) -> impl IntoResponse {
    let draft = match request.to_draft() {
        Ok(d) => d,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ProductResponse::error(format!("Invalid product: {}", e))),
            );
        }
    };

    let mut ledger = state.ledger.write().await;
    match ledger.add_product(RecordId(id), draft) {
        Ok(product) => (
            StatusCode::CREATED,
            Json(ProductResponse::success(&product)),
        ),
        Err(e) => (
            error_status(&e),
            Json(ProductResponse::error(format!("Create failed: {}", e))),
        ),
    }
}

/// Delete a product record.
pub async fn delete_product_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    let mut ledger = state.ledger.write().await;
    match ledger.delete_product(ProductId(id)) {
        Ok(()) => (StatusCode::OK, Json(AckResponse::success())),
        Err(e) => (
            error_status(&e),
            Json(AckResponse::error(format!("Delete failed: {}", e))),
        ),
    }
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// Export a batch's full history as CSV.
pub async fn export_handler(State(state): State<AppState>, Path(number): Path<u32>) -> Response {
    let ledger = state.ledger.read().await;
    match export_csv(&ledger, BatchNumber(number)) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
            csv,
        )
            .into_response(),
        Err(e) => (
            error_status(&e),
            Json(AckResponse::error(format!("Export failed: {}", e))),
        )
            .into_response(),
    }
}
