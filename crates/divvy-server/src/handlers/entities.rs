//! Entity listing handlers
//!
//! Goals, debts, categories, and constraints are seeded through the CLI;
//! the API exposes read-only listings for planning clients.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{AppError, AppState};
use divvy_core::models::{Constraint, Debt, Goal, SpendingCategory};

/// GET /api/goals - List all goals
pub async fn list_goals(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Goal>>, AppError> {
    let goals = state.db.list_goals().map_err(AppError::from_core)?;
    Ok(Json(goals))
}

/// GET /api/debts - List all debts
pub async fn list_debts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Debt>>, AppError> {
    let debts = state.db.list_debts().map_err(AppError::from_core)?;
    Ok(Json(debts))
}

/// GET /api/categories - List spending categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SpendingCategory>>, AppError> {
    let categories = state.db.list_categories().map_err(AppError::from_core)?;
    Ok(Json(categories))
}

/// GET /api/constraints - List category constraints
pub async fn list_constraints(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Constraint>>, AppError> {
    let constraints = state.db.list_constraints().map_err(AppError::from_core)?;
    Ok(Json(constraints))
}
