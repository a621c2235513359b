//! Receipt import handler
//!
//! Uploads go to the external parser service; the extracted purchases come
//! back to the client for review. Nothing is stored until the client saves
//! the reviewed rows through `PUT /api/purchases`.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use outlay_core::import::{validate_upload, UploadFile};
use outlay_core::models::NewPurchase;
use outlay_core::Error;

use crate::auth::Identity;
use crate::{AppError, AppState};

/// Response for a parsed receipt batch
#[derive(Serialize)]
pub struct ImportResponse {
    /// Extracted purchases with snapshot defaults applied, not yet stored
    pub purchases: Vec<NewPurchase>,
    pub count: usize,
}

/// POST /api/import - Parse receipt files into purchase rows
///
/// Expects a multipart form with one or more `files` fields
/// (PNG, JPEG, or PDF, max 5MB each).
pub async fn import_files(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let parser = state
        .parser
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("Receipt parser not configured"))?;

    let mut files: Vec<UploadFile> = Vec::new();

    // Extract file fields from the multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name != "files" {
            continue;
        }

        let filename = field.file_name().unwrap_or("receipt").to_string();
        let content_type = field.content_type().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;

        files.push(UploadFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    if files.is_empty() {
        return Err(AppError::bad_request("No files provided"));
    }

    for file in &files {
        validate_upload(file).map_err(|e| match e {
            Error::InvalidData(msg) => AppError::bad_request(&msg),
            other => AppError::from(other),
        })?;
    }

    // Hash the uploads so the audit trail can tie parsed rows back to the
    // exact bytes that produced them
    let mut names = Vec::with_capacity(files.len());
    for file in &files {
        let mut hasher = Sha256::new();
        hasher.update(&file.bytes);
        let content_hash = format!("{:x}", hasher.finalize());
        info!(
            user = %identity.user,
            filename = %file.filename,
            size = file.bytes.len(),
            hash = %content_hash,
            "Receipt upload"
        );
        names.push(format!("{}:{}", file.filename, &content_hash[..12]));
    }

    state.db.log_audit(
        &identity.user,
        "import",
        Some("receipt"),
        None,
        Some(&format!("files={} [{}]", files.len(), names.join(", "))),
    )?;

    let parsed = match parser.parse_files(&identity.user, &files).await {
        Ok(parsed) => parsed,
        Err(e) => {
            // Parser failures carry upstream detail we don't echo to clients
            error!(user = %identity.user, error = %e, "Receipt parsing failed");
            return Err(AppError::internal("Import failed"));
        }
    };

    let today = chrono::Local::now().date_naive();
    let purchases: Vec<NewPurchase> = parsed.into_iter().map(|p| p.into_new(today)).collect();
    let count = purchases.len();

    info!(user = %identity.user, count, "Receipt parsing complete");

    Ok(Json(ImportResponse { purchases, count }))
}
