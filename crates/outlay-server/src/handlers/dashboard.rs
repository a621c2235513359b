//! Dashboard aggregation handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use outlay_core::{dashboard_summary, DashboardSummary};

use crate::auth::Identity;
use crate::{AppError, AppState};

/// Query parameters for the dashboard
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Reference date (YYYY-MM-DD); defaults to today
    pub reference: Option<String>,
}

/// GET /api/dashboard - Aggregated spend and installment projections
///
/// All aggregation runs server-side over the caller's stored purchases;
/// the client renders the summary as-is.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(params): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let reference = params
        .reference
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| AppError::bad_request("Invalid reference date format (use YYYY-MM-DD)"))?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let purchases = state.db.list_purchases(&identity.user)?;
    let summary = dashboard_summary(&purchases, reference);

    state.db.log_audit(
        &identity.user,
        "report",
        Some("dashboard"),
        None,
        Some(&format!(
            "reference={}, records={}",
            reference, summary.record_count
        )),
    )?;

    Ok(Json(summary))
}
