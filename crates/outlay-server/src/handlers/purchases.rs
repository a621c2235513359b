//! Purchase record handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Extension, Json,
};

use outlay_core::models::{NewPurchase, PurchaseRecord};
use outlay_core::Error;

use crate::auth::Identity;
use crate::{AppError, AppState, SuccessResponse, MAX_JSON_BODY};

/// GET /api/purchases - List the caller's purchases in insertion order
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<PurchaseRecord>>, AppError> {
    let purchases = state.db.list_purchases(&identity.user)?;

    // Audit log - read access
    state.db.log_audit(
        &identity.user,
        "list",
        Some("purchase"),
        None,
        Some(&format!("returned={}", purchases.len())),
    )?;

    Ok(Json(purchases))
}

/// POST /api/purchases - Record one purchase
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    request: Request,
) -> Result<Json<PurchaseRecord>, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let new: NewPurchase =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    new.validate().map_err(|e| match e {
        Error::InvalidData(msg) => AppError::bad_request(&msg),
        other => AppError::from(other),
    })?;

    let record = state.db.insert_purchase(&identity.user, &new)?;

    state.db.log_audit(
        &identity.user,
        "create",
        Some("purchase"),
        Some(record.id),
        Some(&format!("{} {:.2}", record.category, record.amount)),
    )?;

    Ok(Json(record))
}

/// PUT /api/purchases - Replace the caller's whole snapshot
///
/// The client edits its copy of the table and sends it back wholesale.
/// Rows come back with fresh ids; the response is the authoritative
/// snapshot the client should adopt.
pub async fn save_purchases(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    request: Request,
) -> Result<Json<Vec<PurchaseRecord>>, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_JSON_BODY)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    let records: Vec<PurchaseRecord> =
        serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))?;

    let count = records.len();
    let snapshot = state.db.replace_purchases(&identity.user, records)?;

    state.db.log_audit(
        &identity.user,
        "save_all",
        Some("purchase"),
        None,
        Some(&format!("count={}", count)),
    )?;

    Ok(Json(snapshot))
}

/// DELETE /api/purchases/:id - Delete one purchase
pub async fn delete_purchase(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_purchase(&identity.user, id).map_err(|e| match e {
        Error::NotFound(_) => AppError::not_found(&format!("Purchase {} not found", id)),
        other => AppError::from(other),
    })?;

    state
        .db
        .log_audit(&identity.user, "delete", Some("purchase"), Some(id), None)?;

    Ok(Json(SuccessResponse { success: true }))
}
