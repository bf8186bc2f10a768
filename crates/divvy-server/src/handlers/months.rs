//! Planning month handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState};
use divvy_core::models::{Month, MonthStateVersion};

/// Request body for creating or updating a planning month
#[derive(Debug, Deserialize)]
pub struct CreateMonthRequest {
    /// Month id in YYYY-MM form
    pub month_id: String,
    pub monthly_income: f64,
    pub note: Option<String>,
}

/// POST /api/months - Create or update a planning month
pub async fn create_month(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateMonthRequest>,
) -> Result<Json<Month>, AppError> {
    let user_email = get_user_email(&headers);

    let month = state
        .db
        .upsert_month(&req.month_id, req.monthly_income, req.note.as_deref())
        .map_err(AppError::from_core)?;

    state.db.log_audit(
        &user_email,
        "upsert_month",
        Some("month"),
        None,
        Some(&format!(
            "month_id={}, income={}",
            month.id, month.monthly_income
        )),
    )?;

    Ok(Json(month))
}

/// GET /api/months - List all planning months, newest first
pub async fn list_months(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Month>>, AppError> {
    let months = state.db.list_months().map_err(AppError::from_core)?;
    Ok(Json(months))
}

/// GET /api/months/:id - Get a single planning month
pub async fn get_month(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Month>, AppError> {
    let month = state
        .db
        .get_month(&id)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found(&format!("Month {} not found", id)))?;

    Ok(Json(month))
}

/// GET /api/months/:id/versions - Committed state versions, newest first
pub async fn list_month_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MonthStateVersion>>, AppError> {
    let versions = state.db.list_month_states(&id).map_err(AppError::from_core)?;
    Ok(Json(versions))
}

/// GET /api/months/:id/versions/latest - Latest committed state version
pub async fn latest_month_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MonthStateVersion>, AppError> {
    let version = state
        .db
        .latest_month_state(&id)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found(&format!("Month {} has no committed version", id)))?;

    Ok(Json(version))
}
