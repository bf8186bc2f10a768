//! Decision-support workflow handlers
//!
//! Thin wrappers over the orchestrator: decode the wire request, run the
//! stage, map core errors onto HTTP statuses. Preview handlers never
//! mutate committed state; apply and finalize write through the
//! orchestrator, which also records the audit rows.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;

use crate::{get_user_email, AppError, AppState, SuccessResponse};
use divvy_core::ahp::AhpResult;
use divvy_core::allocator::AllocationScenario;
use divvy_core::debt::DebtStrategyResult;
use divvy_core::models::MonthStateVersion;
use divvy_core::scoring::ScoringResult;
use divvy_core::tradeoff::TradeoffResult;
use divvy_core::workflow::{
    ApplyDebtStrategyRequest, ApplyGoalDebtTradeoffRequest, AutoScoringRequest,
    DebtStrategyRequest, FinalizeDssRequest, GoalPrioritizationRequest,
    PreviewBudgetAllocationRequest, PreviewGoalDebtTradeoffRequest, StageDescriptor,
    WorkflowState,
};

/// GET /api/dss/:month_id/stages - Stages active for this month's entities
pub async fn get_stages(
    State(state): State<Arc<AppState>>,
    Path(month_id): Path<String>,
) -> Result<Json<Vec<StageDescriptor>>, AppError> {
    let stages = state
        .orchestrator
        .stages(&month_id)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(stages))
}

/// GET /api/dss/:month_id/state - Current workflow state snapshot
pub async fn get_workflow_state(
    State(state): State<Arc<AppState>>,
    Path(month_id): Path<String>,
) -> Result<Json<WorkflowState>, AppError> {
    let snapshot = state
        .orchestrator
        .state(&month_id)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(snapshot))
}

/// POST /api/dss/score - Score goals on feasibility, importance, and urgency
pub async fn auto_score(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AutoScoringRequest>,
) -> Result<Json<ScoringResult>, AppError> {
    let result = state
        .orchestrator
        .score(req)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(result))
}

/// POST /api/dss/prioritize - Rank goals with AHP
pub async fn prioritize_goals(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoalPrioritizationRequest>,
) -> Result<Json<AhpResult>, AppError> {
    let result = state
        .orchestrator
        .prioritize(req)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(result))
}

/// POST /api/dss/debt-strategy/preview - Simulate avalanche and snowball payoff
pub async fn preview_debt_strategy(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DebtStrategyRequest>,
) -> Result<Json<DebtStrategyResult>, AppError> {
    let result = state
        .orchestrator
        .preview_debt_strategy(req)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(result))
}

/// POST /api/dss/debt-strategy/apply - Record the selected payoff strategy
pub async fn apply_debt_strategy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ApplyDebtStrategyRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(&headers);

    state
        .orchestrator
        .apply_debt_strategy(req, &user_email)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/dss/tradeoff/preview - Compare goal/debt split scenarios
pub async fn preview_tradeoff(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewGoalDebtTradeoffRequest>,
) -> Result<Json<TradeoffResult>, AppError> {
    let result = state
        .orchestrator
        .preview_tradeoff(req)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(result))
}

/// POST /api/dss/tradeoff/apply - Record the chosen goal/debt split
pub async fn apply_tradeoff(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ApplyGoalDebtTradeoffRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(&headers);

    state
        .orchestrator
        .apply_tradeoff(req, &user_email)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(SuccessResponse { success: true }))
}

/// Response wrapper for allocation previews
#[derive(Debug, Serialize)]
pub struct PreviewAllocationResponse {
    pub scenarios: Vec<AllocationScenario>,
}

/// POST /api/dss/allocation/preview - Build full allocation scenarios
pub async fn preview_allocation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewBudgetAllocationRequest>,
) -> Result<Json<PreviewAllocationResponse>, AppError> {
    let scenarios = state
        .orchestrator
        .preview_allocation(req)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(PreviewAllocationResponse { scenarios }))
}

/// Response for a committed finalize
#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub message: String,
    pub new_state_version: MonthStateVersion,
}

/// POST /api/dss/finalize - Commit the month plan as a new immutable version
pub async fn finalize_month(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<FinalizeDssRequest>,
) -> Result<Json<FinalizeResponse>, AppError> {
    let user_email = get_user_email(&headers);

    let version = state
        .orchestrator
        .finalize(req, &user_email)
        .await
        .map_err(AppError::from_core)?;

    Ok(Json(FinalizeResponse {
        message: format!(
            "Month {} finalized as version {}",
            version.month_id, version.version
        ),
        new_state_version: version,
    }))
}
