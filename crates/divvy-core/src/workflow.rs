//! Workflow orchestration across the planning stages
//!
//! Drives the staged pipeline from goal scoring through finalize. Previews
//! are pure computations cached per month in an in-memory state map; apply
//! records the user's selection; finalize is the only operation with durable
//! side effects and appends one immutable month state version.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::info;

use crate::ahp::{self, AhpResult};
use crate::allocator::{self, AllocationInputs, AllocationScenario, ScenarioParams};
use crate::db::{Database, NewMonthState};
use crate::debt::{self, DebtStrategyResult};
use crate::error::{Error, Result};
use crate::models::{
    AppliedGoalPriority, CriteriaRatings, CriteriaWeights, Debt, DebtPayment, DebtStrategy, Goal,
    GoalFunding, GoalStatus, Month, MonthStateVersion,
};
use crate::scoring::{self, ScoringResult};
use crate::tradeoff::{self, validate_split, TradeoffPreferences, TradeoffResult};

/// Pipeline stages in workflow order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    AutoScore,
    GoalPrioritization,
    DebtStrategy,
    GoalDebtTradeoff,
    BudgetAllocation,
    Finalize,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 6] = [
        Self::AutoScore,
        Self::GoalPrioritization,
        Self::DebtStrategy,
        Self::GoalDebtTradeoff,
        Self::BudgetAllocation,
        Self::Finalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoScore => "auto_score",
            Self::GoalPrioritization => "goal_prioritization",
            Self::DebtStrategy => "debt_strategy",
            Self::GoalDebtTradeoff => "goal_debt_tradeoff",
            Self::BudgetAllocation => "budget_allocation",
            Self::Finalize => "finalize",
        }
    }

    /// Whether the stage participates given which entities exist.
    /// Goal stages need active goals, debt stages need open debts, the
    /// tradeoff needs both. Allocation and finalize always run.
    pub fn is_present(&self, has_goals: bool, has_debts: bool) -> bool {
        match self {
            Self::AutoScore | Self::GoalPrioritization => has_goals,
            Self::DebtStrategy => has_debts,
            Self::GoalDebtTradeoff => has_goals && has_debts,
            Self::BudgetAllocation | Self::Finalize => true,
        }
    }
}

impl std::str::FromStr for WorkflowStage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto_score" => Ok(Self::AutoScore),
            "goal_prioritization" => Ok(Self::GoalPrioritization),
            "debt_strategy" => Ok(Self::DebtStrategy),
            "goal_debt_tradeoff" => Ok(Self::GoalDebtTradeoff),
            "budget_allocation" => Ok(Self::BudgetAllocation),
            "finalize" => Ok(Self::Finalize),
            _ => Err(format!("Unknown workflow stage: {}", s)),
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a stage slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Cached preview/apply state for one stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageSlot {
    pub status: StageStatus,
    /// Parameters of the last preview, for display and replay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Result of the last preview
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// The user's applied selection, for stages with a discrete choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<serde_json::Value>,
}

/// Per-month accumulated workflow state. Lives only in memory until finalize
/// commits a month state version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub month_id: String,
    pub stages: BTreeMap<WorkflowStage, StageSlot>,
    /// Applied tradeoff split, goal side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_allocation_pct: Option<f64>,
    /// Applied tradeoff split, debt side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_allocation_pct: Option<f64>,
    /// Applied debt repayment strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_debt_strategy: Option<DebtStrategy>,
    /// Custom criteria weights from the prioritization stage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_weights: Option<CriteriaWeights>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    fn new(month_id: &str) -> Self {
        Self {
            month_id: month_id.to_string(),
            stages: BTreeMap::new(),
            goal_allocation_pct: None,
            debt_allocation_pct: None,
            applied_debt_strategy: None,
            custom_weights: None,
            updated_at: Utc::now(),
        }
    }

    fn set_slot(
        &mut self,
        stage: WorkflowStage,
        params: serde_json::Value,
        result: serde_json::Value,
    ) {
        let slot = self.stages.entry(stage).or_default();
        slot.status = StageStatus::Ready;
        slot.params = Some(params);
        slot.result = Some(result);
    }

    fn mark_applied(&mut self, stage: WorkflowStage, selection: serde_json::Value) {
        let slot = self.stages.entry(stage).or_default();
        slot.status = StageStatus::Ready;
        slot.applied = Some(selection);
    }

    pub fn status_of(&self, stage: WorkflowStage) -> StageStatus {
        self.stages
            .get(&stage)
            .map(|slot| slot.status)
            .unwrap_or_default()
    }
}

/// One entry of the active stage list
#[derive(Debug, Clone, Serialize)]
pub struct StageDescriptor {
    pub stage: WorkflowStage,
    pub status: StageStatus,
}

/// Request for the auto-scoring stage. Goals and income fall back to the
/// stored month and active goals when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoScoringRequest {
    pub month_id: String,
    #[serde(default)]
    pub monthly_income: Option<f64>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default = "default_goal_allocation_pct")]
    pub goal_allocation_pct: f64,
}

/// Full income reachable by goals until a tradeoff split is applied
fn default_goal_allocation_pct() -> f64 {
    100.0
}

/// Request for the AHP prioritization stage
#[derive(Debug, Clone, Deserialize)]
pub struct GoalPrioritizationRequest {
    pub month_id: String,
    #[serde(default)]
    pub criteria_ratings: Option<CriteriaRatings>,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

/// Request for the debt strategy preview
#[derive(Debug, Clone, Deserialize)]
pub struct DebtStrategyRequest {
    pub month_id: String,
    #[serde(default)]
    pub debts: Vec<Debt>,
    pub total_debt_budget: f64,
}

/// Request applying one debt strategy by name
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyDebtStrategyRequest {
    pub month_id: String,
    pub selected_strategy: DebtStrategy,
}

/// Request for the tradeoff preview
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewGoalDebtTradeoffRequest {
    pub month_id: String,
    #[serde(default)]
    pub preferences: TradeoffPreferences,
}

/// Request applying a goal/debt split; the two percentages must sum to 100
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyGoalDebtTradeoffRequest {
    pub month_id: String,
    pub goal_allocation_percent: f64,
    pub debt_allocation_percent: f64,
}

/// Request for the allocation preview. Split percentages fall back to the
/// applied tradeoff; an empty override list produces the default scenarios.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewBudgetAllocationRequest {
    pub month_id: String,
    #[serde(default)]
    pub goal_allocation_pct: Option<f64>,
    #[serde(default)]
    pub debt_allocation_pct: Option<f64>,
    #[serde(default)]
    pub scenario_overrides: Vec<ScenarioParams>,
}

/// An explicit tradeoff split inside a finalize request
#[derive(Debug, Clone, Deserialize)]
pub struct TradeoffChoice {
    pub goal_allocation_percent: f64,
    pub debt_allocation_percent: f64,
}

/// Request committing one complete month plan
#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeDssRequest {
    pub month_id: String,
    /// Derive goal priorities from the cached AHP ranking
    #[serde(default)]
    pub use_auto_scoring: bool,
    #[serde(default)]
    pub goal_priorities: Vec<AppliedGoalPriority>,
    #[serde(default)]
    pub debt_strategy: Option<DebtStrategy>,
    #[serde(default)]
    pub tradeoff_choice: Option<TradeoffChoice>,
    /// category_id -> committed amount
    #[serde(default)]
    pub budget_allocations: BTreeMap<i64, f64>,
    #[serde(default)]
    pub goal_fundings: Vec<GoalFunding>,
    #[serde(default)]
    pub debt_payments: Vec<DebtPayment>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Drives the staged pipeline for every month. Owns the database handle and
/// an in-memory map of per-month workflow state; previews cache into it,
/// finalize drains it.
pub struct Orchestrator {
    db: Database,
    cache: RwLock<HashMap<String, WorkflowState>>,
}

impl Orchestrator {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Active stage list for a month, with each stage's cached status
    pub async fn stages(&self, month_id: &str) -> Result<Vec<StageDescriptor>> {
        self.month_or_not_found(month_id)?;
        let has_goals = !self.db.list_active_goals()?.is_empty();
        let has_debts = !self.db.list_open_debts()?.is_empty();

        let cache = self.cache.read().await;
        let state = cache.get(month_id);
        Ok(WorkflowStage::ALL
            .iter()
            .filter(|stage| stage.is_present(has_goals, has_debts))
            .map(|stage| StageDescriptor {
                stage: *stage,
                status: state.map(|s| s.status_of(*stage)).unwrap_or_default(),
            })
            .collect())
    }

    /// Snapshot of a month's accumulated workflow state
    pub async fn state(&self, month_id: &str) -> Result<WorkflowState> {
        self.month_or_not_found(month_id)?;
        let cache = self.cache.read().await;
        Ok(cache
            .get(month_id)
            .cloned()
            .unwrap_or_else(|| WorkflowState::new(month_id)))
    }

    /// Score active goals against the monthly goal budget
    pub async fn score(&self, req: AutoScoringRequest) -> Result<ScoringResult> {
        let month = self.month_or_not_found(&req.month_id)?;
        let income = req.monthly_income.unwrap_or(month.monthly_income);
        let goals = self.goals_or_stored(req.goals)?;

        let result = scoring::score_goals(&goals, income, req.goal_allocation_pct, today())?;

        self.with_state(&req.month_id, |state| {
            state.set_slot(
                WorkflowStage::AutoScore,
                json!({
                    "monthly_income": income,
                    "goal_allocation_pct": req.goal_allocation_pct,
                }),
                serde_json::to_value(&result)?,
            );
            Ok(())
        })
        .await?;

        info!(
            month_id = %req.month_id,
            goals = result.goals.len(),
            "Goal scoring preview cached"
        );
        Ok(result)
    }

    /// Rank goals by AHP, reusing cached sub-scores when the scoring stage
    /// already ran for every active goal
    pub async fn prioritize(&self, req: GoalPrioritizationRequest) -> Result<AhpResult> {
        let month = self.month_or_not_found(&req.month_id)?;
        let goals = self.goals_or_stored(req.goals)?;

        let weights = match &req.criteria_ratings {
            Some(ratings) => CriteriaWeights::from_ratings(ratings)?,
            None => CriteriaWeights::even_split(),
        };

        let cached: Option<ScoringResult> = self
            .cached_result(&req.month_id, WorkflowStage::AutoScore)
            .await?;
        let scored = match cached {
            Some(prior) if covers_active_goals(&prior, &goals) => prior.goals,
            _ => scoring::score_goals(&goals, month.monthly_income, 100.0, today())?.goals,
        };

        let result = ahp::prioritize_goals(&goals, &scored, &weights)?;

        self.with_state(&req.month_id, |state| {
            if req.criteria_ratings.is_some() {
                state.custom_weights = Some(weights);
            }
            state.set_slot(
                WorkflowStage::GoalPrioritization,
                json!({ "criteria_weights": weights }),
                serde_json::to_value(&result)?,
            );
            Ok(())
        })
        .await?;

        info!(
            month_id = %req.month_id,
            consistency_ratio = result.consistency_ratio,
            "Goal prioritization preview cached"
        );
        Ok(result)
    }

    /// Simulate both repayment strategies against the given monthly budget
    pub async fn preview_debt_strategy(
        &self,
        req: DebtStrategyRequest,
    ) -> Result<DebtStrategyResult> {
        self.month_or_not_found(&req.month_id)?;
        let debts = self.debts_or_stored(req.debts)?;

        let result = debt::plan_strategies(&debts, req.total_debt_budget)?;

        self.with_state(&req.month_id, |state| {
            state.set_slot(
                WorkflowStage::DebtStrategy,
                json!({ "total_debt_budget": req.total_debt_budget }),
                serde_json::to_value(&result)?,
            );
            Ok(())
        })
        .await?;

        info!(
            month_id = %req.month_id,
            recommended = %result.recommended_strategy,
            "Debt strategy preview cached"
        );
        Ok(result)
    }

    /// Record the selected debt strategy. Requires a cached preview so the
    /// selected scenario's payment plans can be reused verbatim downstream.
    pub async fn apply_debt_strategy(
        &self,
        req: ApplyDebtStrategyRequest,
        user_email: &str,
    ) -> Result<()> {
        self.month_or_not_found(&req.month_id)?;

        let preview: DebtStrategyResult = self
            .cached_result(&req.month_id, WorkflowStage::DebtStrategy)
            .await?
            .ok_or_else(|| {
                Error::InvalidData(
                    "No debt strategy preview is cached for this month; run the preview first"
                        .to_string(),
                )
            })?;
        if preview.scenario(req.selected_strategy).is_none() {
            return Err(Error::InvalidData(format!(
                "No scenario was computed for strategy '{}'",
                req.selected_strategy
            )));
        }

        self.with_state(&req.month_id, |state| {
            state.applied_debt_strategy = Some(req.selected_strategy);
            state.mark_applied(
                WorkflowStage::DebtStrategy,
                json!({ "selected_strategy": req.selected_strategy.as_str() }),
            );
            Ok(())
        })
        .await?;

        self.db.log_audit(
            user_email,
            "apply_debt_strategy",
            Some("month"),
            None,
            Some(
                &json!({
                    "month_id": req.month_id,
                    "strategy": req.selected_strategy.as_str(),
                })
                .to_string(),
            ),
        )?;

        info!(
            month_id = %req.month_id,
            strategy = %req.selected_strategy,
            "Debt strategy applied"
        );
        Ok(())
    }

    /// Score candidate goal/debt splits of the discretionary pool
    pub async fn preview_tradeoff(
        &self,
        req: PreviewGoalDebtTradeoffRequest,
    ) -> Result<TradeoffResult> {
        let month = self.month_or_not_found(&req.month_id)?;
        let goals = self.db.list_active_goals()?;
        let debts = self.db.list_open_debts()?;
        let strategy = self.effective_strategy(&req.month_id).await?;

        let pool = (month.monthly_income - self.db.total_constraint_minimums()?).max(0.0);
        let result =
            tradeoff::preview_tradeoff(&goals, &debts, strategy, pool, &req.preferences, today())?;

        self.with_state(&req.month_id, |state| {
            state.set_slot(
                WorkflowStage::GoalDebtTradeoff,
                json!({
                    "preferences": req.preferences,
                    "applied_strategy": strategy.as_str(),
                    "discretionary_pool": pool,
                }),
                serde_json::to_value(&result)?,
            );
            Ok(())
        })
        .await?;

        info!(
            month_id = %req.month_id,
            recommended = %result.recommended_strategy,
            "Tradeoff preview cached"
        );
        Ok(result)
    }

    /// Record the chosen goal/debt split
    pub async fn apply_tradeoff(
        &self,
        req: ApplyGoalDebtTradeoffRequest,
        user_email: &str,
    ) -> Result<()> {
        self.month_or_not_found(&req.month_id)?;
        validate_split(req.goal_allocation_percent, req.debt_allocation_percent)?;

        self.with_state(&req.month_id, |state| {
            state.goal_allocation_pct = Some(req.goal_allocation_percent);
            state.debt_allocation_pct = Some(req.debt_allocation_percent);
            state.mark_applied(
                WorkflowStage::GoalDebtTradeoff,
                json!({
                    "goal_allocation_percent": req.goal_allocation_percent,
                    "debt_allocation_percent": req.debt_allocation_percent,
                }),
            );
            Ok(())
        })
        .await?;

        self.db.log_audit(
            user_email,
            "apply_tradeoff",
            Some("month"),
            None,
            Some(
                &json!({
                    "month_id": req.month_id,
                    "goal_allocation_percent": req.goal_allocation_percent,
                    "debt_allocation_percent": req.debt_allocation_percent,
                })
                .to_string(),
            ),
        )?;

        info!(
            month_id = %req.month_id,
            goal_pct = req.goal_allocation_percent,
            debt_pct = req.debt_allocation_percent,
            "Tradeoff split applied"
        );
        Ok(())
    }

    /// Build allocation scenarios from the stored entities and the
    /// accumulated workflow state
    pub async fn preview_allocation(
        &self,
        req: PreviewBudgetAllocationRequest,
    ) -> Result<Vec<AllocationScenario>> {
        let month = self.month_or_not_found(&req.month_id)?;
        let categories = self.db.list_categories()?;
        let constraints = self.db.list_constraints()?;
        let goals = self.db.list_active_goals()?;
        let debts = self.db.list_open_debts()?;

        let (state_goal_pct, state_debt_pct, applied_strategy) = {
            let cache = self.cache.read().await;
            match cache.get(&req.month_id) {
                Some(state) => (
                    state.goal_allocation_pct,
                    state.debt_allocation_pct,
                    state.applied_debt_strategy,
                ),
                None => (None, None, None),
            }
        };

        let (goal_pct, debt_pct) = resolve_split(
            req.goal_allocation_pct.or(state_goal_pct),
            req.debt_allocation_pct.or(state_debt_pct),
            !goals.is_empty(),
            !debts.is_empty(),
        );

        let priorities = match self
            .cached_result::<AhpResult>(&req.month_id, WorkflowStage::GoalPrioritization)
            .await?
        {
            Some(result) => Some(result),
            None if !goals.is_empty() => {
                let fresh = scoring::score_goals(&goals, month.monthly_income, goal_pct, today())?;
                Some(ahp::prioritize_goals(
                    &goals,
                    &fresh.goals,
                    &fresh.default_criteria_weights,
                )?)
            }
            None => None,
        };

        let debt_preview: Option<DebtStrategyResult> = self
            .cached_result(&req.month_id, WorkflowStage::DebtStrategy)
            .await?;
        let payment_plans = match (applied_strategy, &debt_preview) {
            (Some(strategy), Some(preview)) => preview
                .scenario(strategy)
                .map(|scenario| scenario.payment_plans.clone()),
            _ => None,
        };

        let params_list = if req.scenario_overrides.is_empty() {
            ScenarioParams::defaults()
        } else {
            req.scenario_overrides.clone()
        };

        let inputs = AllocationInputs {
            income: month.monthly_income,
            categories: &categories,
            constraints: &constraints,
            goals: &goals,
            priorities: priorities.as_ref(),
            debts: &debts,
            payment_plans: payment_plans.as_deref(),
            goal_allocation_pct: goal_pct,
            debt_allocation_pct: debt_pct,
            today: today(),
        };
        let scenarios = allocator::build_scenarios(&inputs, &params_list)?;

        self.with_state(&req.month_id, |state| {
            state.set_slot(
                WorkflowStage::BudgetAllocation,
                json!({
                    "goal_allocation_pct": goal_pct,
                    "debt_allocation_pct": debt_pct,
                    "scenario_types": params_list
                        .iter()
                        .map(|p| p.scenario_type.clone())
                        .collect::<Vec<_>>(),
                }),
                serde_json::to_value(&scenarios)?,
            );
            Ok(())
        })
        .await?;

        info!(
            month_id = %req.month_id,
            scenarios = scenarios.len(),
            "Allocation preview cached"
        );
        Ok(scenarios)
    }

    /// Commit one complete month plan as a new immutable state version.
    ///
    /// The committed total must stay at or below the month's income; on any
    /// rejection no version is created and the cached workflow state is left
    /// untouched. A successful commit drains the month's cached state.
    pub async fn finalize(
        &self,
        req: FinalizeDssRequest,
        user_email: &str,
    ) -> Result<MonthStateVersion> {
        let month = self.month_or_not_found(&req.month_id)?;

        self.validate_finalize_lines(&req)?;

        let total: f64 = req.budget_allocations.values().sum::<f64>()
            + req
                .goal_fundings
                .iter()
                .map(|f| f.effective_amount())
                .sum::<f64>()
            + req
                .debt_payments
                .iter()
                .map(|p| p.effective_amount())
                .sum::<f64>();
        if total > month.monthly_income + 1e-6 {
            return Err(Error::InvalidData(format!(
                "Committed total {:.2} exceeds monthly income {:.2} by {:.2}; reduce allocations and retry",
                total,
                month.monthly_income,
                total - month.monthly_income
            )));
        }

        let goal_priorities = if req.use_auto_scoring && req.goal_priorities.is_empty() {
            let prioritization: AhpResult = self
                .cached_result(&req.month_id, WorkflowStage::GoalPrioritization)
                .await?
                .ok_or_else(|| {
                    Error::InvalidData(
                        "use_auto_scoring requires a cached prioritization; run that stage first"
                            .to_string(),
                    )
                })?;
            prioritization
                .ranking
                .iter()
                .map(|r| AppliedGoalPriority {
                    goal_id: r.alternative_id,
                    priority: r.priority,
                    method: "ahp".to_string(),
                })
                .collect()
        } else {
            req.goal_priorities.clone()
        };

        let (state_goal_pct, state_debt_pct, state_strategy) = {
            let cache = self.cache.read().await;
            match cache.get(&req.month_id) {
                Some(state) => (
                    state.goal_allocation_pct,
                    state.debt_allocation_pct,
                    state.applied_debt_strategy,
                ),
                None => (None, None, None),
            }
        };

        let (goal_pct, debt_pct) = match &req.tradeoff_choice {
            Some(choice) => {
                validate_split(choice.goal_allocation_percent, choice.debt_allocation_percent)?;
                (
                    Some(choice.goal_allocation_percent),
                    Some(choice.debt_allocation_percent),
                )
            }
            None => (state_goal_pct, state_debt_pct),
        };

        let version = self.db.append_month_state(NewMonthState {
            month_id: req.month_id.clone(),
            goal_priorities,
            debt_strategy: req.debt_strategy.or(state_strategy),
            goal_allocation_pct: goal_pct,
            debt_allocation_pct: debt_pct,
            category_allocations: req.budget_allocations.clone(),
            goal_fundings: req.goal_fundings.clone(),
            debt_payments: req.debt_payments.clone(),
            notes: req.notes.clone(),
        })?;

        self.db.log_audit(
            user_email,
            "finalize_month",
            Some("month_state"),
            Some(version.id),
            Some(
                &json!({
                    "month_id": req.month_id,
                    "version": version.version,
                    "total_committed": version.total_committed(),
                })
                .to_string(),
            ),
        )?;

        let mut cache = self.cache.write().await;
        cache.remove(&req.month_id);
        drop(cache);

        info!(
            month_id = %req.month_id,
            version = version.version,
            total = version.total_committed(),
            "Month plan finalized"
        );
        Ok(version)
    }

    fn month_or_not_found(&self, month_id: &str) -> Result<Month> {
        self.db.get_month(month_id)?.ok_or_else(|| {
            Error::NotFound(format!(
                "Month {} is not set up; set its income first",
                month_id
            ))
        })
    }

    /// Request-supplied goals, or the stored active goals when none were sent
    fn goals_or_stored(&self, goals: Vec<Goal>) -> Result<Vec<Goal>> {
        let goals = if goals.is_empty() {
            self.db.list_active_goals()?
        } else {
            goals
        };
        if goals.iter().all(|g| g.status != GoalStatus::Active) {
            return Err(Error::InvalidData(
                "At least one active goal is required for this stage".to_string(),
            ));
        }
        Ok(goals)
    }

    fn debts_or_stored(&self, debts: Vec<Debt>) -> Result<Vec<Debt>> {
        if debts.is_empty() {
            Ok(self.db.list_open_debts()?)
        } else {
            Ok(debts)
        }
    }

    /// Applied strategy, else the cached preview recommendation, else avalanche
    async fn effective_strategy(&self, month_id: &str) -> Result<DebtStrategy> {
        let applied = {
            let cache = self.cache.read().await;
            cache.get(month_id).and_then(|s| s.applied_debt_strategy)
        };
        if let Some(strategy) = applied {
            return Ok(strategy);
        }
        let preview: Option<DebtStrategyResult> = self
            .cached_result(month_id, WorkflowStage::DebtStrategy)
            .await?;
        Ok(preview
            .map(|p| p.recommended_strategy)
            .unwrap_or(DebtStrategy::Avalanche))
    }

    async fn cached_result<T: serde::de::DeserializeOwned>(
        &self,
        month_id: &str,
        stage: WorkflowStage,
    ) -> Result<Option<T>> {
        let value = {
            let cache = self.cache.read().await;
            cache
                .get(month_id)
                .and_then(|state| state.stages.get(&stage))
                .and_then(|slot| slot.result.clone())
        };
        match value {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    async fn with_state<F>(&self, month_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut WorkflowState) -> Result<()>,
    {
        let mut cache = self.cache.write().await;
        let state = cache
            .entry(month_id.to_string())
            .or_insert_with(|| WorkflowState::new(month_id));
        f(state)?;
        state.updated_at = Utc::now();
        Ok(())
    }

    /// Every committed line must reference a stored entity and carry a
    /// non-negative amount
    fn validate_finalize_lines(&self, req: &FinalizeDssRequest) -> Result<()> {
        let categories = self.db.list_categories()?;
        for (category_id, amount) in &req.budget_allocations {
            if !categories.iter().any(|c| c.id == *category_id) {
                return Err(Error::InvalidData(format!(
                    "Unknown category id {} in budget allocations",
                    category_id
                )));
            }
            if *amount < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Category {} allocation must be non-negative, got {}",
                    category_id, amount
                )));
            }
        }

        let goals = self.db.list_goals()?;
        for funding in &req.goal_fundings {
            if !goals.iter().any(|g| g.id == funding.goal_id) {
                return Err(Error::InvalidData(format!(
                    "Unknown goal id {} in goal fundings",
                    funding.goal_id
                )));
            }
            if funding.effective_amount() < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Goal {} funding must be non-negative",
                    funding.goal_id
                )));
            }
        }

        let debts = self.db.list_debts()?;
        for payment in &req.debt_payments {
            if !debts.iter().any(|d| d.id == payment.debt_id) {
                return Err(Error::InvalidData(format!(
                    "Unknown debt id {} in debt payments",
                    payment.debt_id
                )));
            }
            if payment.effective_amount() < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Debt {} payment must be non-negative",
                    payment.debt_id
                )));
            }
        }

        Ok(())
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn covers_active_goals(scoring: &ScoringResult, goals: &[Goal]) -> bool {
    goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .all(|g| scoring.goals.iter().any(|s| s.goal_id == g.id))
}

/// Fill in a missing half of the split, or pick a default from entity
/// presence when nothing was applied
fn resolve_split(
    goal: Option<f64>,
    debt: Option<f64>,
    has_goals: bool,
    has_debts: bool,
) -> (f64, f64) {
    match (goal, debt) {
        (Some(g), Some(d)) => (g, d),
        (Some(g), None) => (g, 100.0 - g),
        (None, Some(d)) => (100.0 - d, d),
        (None, None) => match (has_goals, has_debts) {
            (true, true) => (50.0, 50.0),
            (false, true) => (0.0, 100.0),
            _ => (100.0, 0.0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewDebt, NewGoal};
    use crate::models::{DebtBehavior, GoalPriority};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        db: Database,
        orchestrator: Orchestrator,
        housing: i64,
        food: i64,
        fun: i64,
        goal_cushion: i64,
        goal_laptop: i64,
        debt_card: i64,
        debt_car: i64,
    }

    fn seeded() -> Fixture {
        let db = Database::in_memory().unwrap();
        db.upsert_month("2026-09", 50_000_000.0, None).unwrap();

        let housing = db.upsert_category("Housing").unwrap();
        let food = db.upsert_category("Food").unwrap();
        let fun = db.upsert_category("Entertainment").unwrap();
        db.set_constraint(housing, 10_000_000.0, None, false, 1).unwrap();
        db.set_constraint(food, 6_000_000.0, None, false, 2).unwrap();
        db.set_constraint(fun, 1_000_000.0, Some(4_000_000.0), true, 3)
            .unwrap();

        let goal_cushion = db
            .create_goal(&NewGoal {
                name: "Emergency cushion".to_string(),
                target_amount: 60_000_000.0,
                current_amount: 10_000_000.0,
                target_date: date(2030, 6, 1),
                priority: GoalPriority::High,
                category: None,
            })
            .unwrap();
        let goal_laptop = db
            .create_goal(&NewGoal {
                name: "New laptop".to_string(),
                target_amount: 25_000_000.0,
                current_amount: 0.0,
                target_date: date(2029, 3, 1),
                priority: GoalPriority::Medium,
                category: None,
            })
            .unwrap();

        let debt_card = db
            .create_debt(&NewDebt {
                name: "Credit card".to_string(),
                current_balance: 12_000_000.0,
                interest_rate: 0.24,
                minimum_payment: 500_000.0,
                behavior: DebtBehavior::Revolving,
            })
            .unwrap();
        let debt_car = db
            .create_debt(&NewDebt {
                name: "Car loan".to_string(),
                current_balance: 80_000_000.0,
                interest_rate: 0.07,
                minimum_payment: 1_500_000.0,
                behavior: DebtBehavior::Installment,
            })
            .unwrap();

        Fixture {
            orchestrator: Orchestrator::new(db.clone()),
            db,
            housing,
            food,
            fun,
            goal_cushion,
            goal_laptop,
            debt_card,
            debt_car,
        }
    }

    #[tokio::test]
    async fn test_stage_list_follows_entity_presence() {
        let fx = seeded();
        let stages = fx.orchestrator.stages("2026-09").await.unwrap();
        let names: Vec<&str> = stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "auto_score",
                "goal_prioritization",
                "debt_strategy",
                "goal_debt_tradeoff",
                "budget_allocation",
                "finalize"
            ]
        );
        assert!(stages.iter().all(|s| s.status == StageStatus::Idle));

        let bare = Database::in_memory().unwrap();
        bare.upsert_month("2026-09", 50_000_000.0, None).unwrap();
        let orchestrator = Orchestrator::new(bare);
        let stages = orchestrator.stages("2026-09").await.unwrap();
        let names: Vec<&str> = stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, vec!["budget_allocation", "finalize"]);
    }

    #[tokio::test]
    async fn test_stages_for_unknown_month_is_not_found() {
        let fx = seeded();
        let err = fx.orchestrator.stages("2031-01").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_score_caches_a_ready_slot() {
        let fx = seeded();
        let result = fx
            .orchestrator
            .score(AutoScoringRequest {
                month_id: "2026-09".to_string(),
                monthly_income: None,
                goals: Vec::new(),
                goal_allocation_pct: 40.0,
            })
            .await
            .unwrap();
        assert_eq!(result.goals.len(), 2);

        let state = fx.orchestrator.state("2026-09").await.unwrap();
        assert_eq!(state.status_of(WorkflowStage::AutoScore), StageStatus::Ready);
        let slot = &state.stages[&WorkflowStage::AutoScore];
        assert!(slot.result.is_some());
        assert_eq!(
            slot.params.as_ref().unwrap()["goal_allocation_pct"]
                .as_f64()
                .unwrap(),
            40.0
        );
    }

    #[tokio::test]
    async fn test_prioritize_reuses_cached_scores() {
        let fx = seeded();
        fx.orchestrator
            .score(AutoScoringRequest {
                month_id: "2026-09".to_string(),
                monthly_income: None,
                goals: Vec::new(),
                goal_allocation_pct: 40.0,
            })
            .await
            .unwrap();

        let result = fx
            .orchestrator
            .prioritize(GoalPrioritizationRequest {
                month_id: "2026-09".to_string(),
                criteria_ratings: None,
                goals: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(result.ranking.len(), 2);
        let total: f64 = result.ranking.iter().map(|r| r.priority).sum();
        assert!((total - 1.0).abs() < 1e-6);

        let state = fx.orchestrator.state("2026-09").await.unwrap();
        assert_eq!(
            state.status_of(WorkflowStage::GoalPrioritization),
            StageStatus::Ready
        );
        assert!(state.custom_weights.is_none());
    }

    #[tokio::test]
    async fn test_prioritize_without_scoring_recomputes() {
        let fx = seeded();
        let result = fx
            .orchestrator
            .prioritize(GoalPrioritizationRequest {
                month_id: "2026-09".to_string(),
                criteria_ratings: Some(CriteriaRatings {
                    feasibility: 8.0,
                    importance: 9.0,
                    urgency: 3.0,
                }),
                goals: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(result.ranking.len(), 2);

        let state = fx.orchestrator.state("2026-09").await.unwrap();
        let weights = state.custom_weights.unwrap();
        assert!((weights.feasibility + weights.importance + weights.urgency - 1.0).abs() < 1e-9);
        assert!(weights.importance > weights.urgency);
    }

    #[tokio::test]
    async fn test_apply_debt_strategy_requires_preview() {
        let fx = seeded();
        let err = fx
            .orchestrator
            .apply_debt_strategy(
                ApplyDebtStrategyRequest {
                    month_id: "2026-09".to_string(),
                    selected_strategy: DebtStrategy::Avalanche,
                },
                "user@example.com",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_apply_debt_strategy_records_selection_and_audit() {
        let fx = seeded();
        fx.orchestrator
            .preview_debt_strategy(DebtStrategyRequest {
                month_id: "2026-09".to_string(),
                debts: Vec::new(),
                total_debt_budget: 4_000_000.0,
            })
            .await
            .unwrap();
        fx.orchestrator
            .apply_debt_strategy(
                ApplyDebtStrategyRequest {
                    month_id: "2026-09".to_string(),
                    selected_strategy: DebtStrategy::Avalanche,
                },
                "user@example.com",
            )
            .await
            .unwrap();

        let state = fx.orchestrator.state("2026-09").await.unwrap();
        assert_eq!(state.applied_debt_strategy, Some(DebtStrategy::Avalanche));
        let slot = &state.stages[&WorkflowStage::DebtStrategy];
        assert!(slot.applied.is_some());
        assert!(slot.result.is_some());

        let audit = fx.db.list_audit_log(10).unwrap();
        assert!(audit.iter().any(|e| e.action == "apply_debt_strategy"));
    }

    #[tokio::test]
    async fn test_apply_tradeoff_validates_split() {
        let fx = seeded();
        let err = fx
            .orchestrator
            .apply_tradeoff(
                ApplyGoalDebtTradeoffRequest {
                    month_id: "2026-09".to_string(),
                    goal_allocation_percent: 70.0,
                    debt_allocation_percent: 50.0,
                },
                "user@example.com",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        fx.orchestrator
            .apply_tradeoff(
                ApplyGoalDebtTradeoffRequest {
                    month_id: "2026-09".to_string(),
                    goal_allocation_percent: 60.0,
                    debt_allocation_percent: 40.0,
                },
                "user@example.com",
            )
            .await
            .unwrap();

        let state = fx.orchestrator.state("2026-09").await.unwrap();
        assert_eq!(state.goal_allocation_pct, Some(60.0));
        assert_eq!(state.debt_allocation_pct, Some(40.0));
    }

    #[tokio::test]
    async fn test_tradeoff_preview_uses_discretionary_pool() {
        let fx = seeded();
        let result = fx
            .orchestrator
            .preview_tradeoff(PreviewGoalDebtTradeoffRequest {
                month_id: "2026-09".to_string(),
                preferences: TradeoffPreferences::default(),
            })
            .await
            .unwrap();
        assert_eq!(result.scenarios.len(), 5);

        let state = fx.orchestrator.state("2026-09").await.unwrap();
        let slot = &state.stages[&WorkflowStage::GoalDebtTradeoff];
        // income 50M minus constraint minimums 17M
        assert_eq!(
            slot.params.as_ref().unwrap()["discretionary_pool"]
                .as_f64()
                .unwrap(),
            33_000_000.0
        );
    }

    #[tokio::test]
    async fn test_allocation_preview_reuses_applied_plan() {
        let fx = seeded();
        fx.orchestrator
            .preview_debt_strategy(DebtStrategyRequest {
                month_id: "2026-09".to_string(),
                debts: Vec::new(),
                total_debt_budget: 4_000_000.0,
            })
            .await
            .unwrap();
        fx.orchestrator
            .apply_debt_strategy(
                ApplyDebtStrategyRequest {
                    month_id: "2026-09".to_string(),
                    selected_strategy: DebtStrategy::Avalanche,
                },
                "user@example.com",
            )
            .await
            .unwrap();
        fx.orchestrator
            .apply_tradeoff(
                ApplyGoalDebtTradeoffRequest {
                    month_id: "2026-09".to_string(),
                    goal_allocation_percent: 60.0,
                    debt_allocation_percent: 40.0,
                },
                "user@example.com",
            )
            .await
            .unwrap();

        let scenarios = fx
            .orchestrator
            .preview_allocation(PreviewBudgetAllocationRequest {
                month_id: "2026-09".to_string(),
                goal_allocation_pct: None,
                debt_allocation_pct: None,
                scenario_overrides: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(scenarios.len(), 2);

        for scenario in &scenarios {
            assert!(scenario.is_feasible);
            assert!(scenario.summary.total_allocated <= scenario.summary.total_income + 1e-6);

            // The applied avalanche plan: 2M extra rides on the card's minimum
            let card = scenario
                .debt_allocations
                .iter()
                .find(|d| d.debt_id == fx.debt_card)
                .unwrap();
            assert!((card.amount - 2_500_000.0).abs() < 1e-6);
            assert!((card.extra_payment - 2_000_000.0).abs() < 1e-6);
            let car = scenario
                .debt_allocations
                .iter()
                .find(|d| d.debt_id == fx.debt_car)
                .unwrap();
            assert!((car.amount - 1_500_000.0).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_allocation_preview_without_pipeline_still_works() {
        let fx = seeded();
        let scenarios = fx
            .orchestrator
            .preview_allocation(PreviewBudgetAllocationRequest {
                month_id: "2026-09".to_string(),
                goal_allocation_pct: None,
                debt_allocation_pct: None,
                scenario_overrides: Vec::new(),
            })
            .await
            .unwrap();

        // No applied plan: debts fall back to minimum payments with a warning
        for scenario in &scenarios {
            for alloc in &scenario.debt_allocations {
                assert_eq!(alloc.amount, alloc.minimum_payment);
            }
            assert!(scenario
                .warnings
                .iter()
                .any(|w| w.contains("minimum")));
        }
    }

    #[tokio::test]
    async fn test_finalize_commits_version_and_drains_state() {
        let fx = seeded();
        fx.orchestrator
            .preview_debt_strategy(DebtStrategyRequest {
                month_id: "2026-09".to_string(),
                debts: Vec::new(),
                total_debt_budget: 4_000_000.0,
            })
            .await
            .unwrap();
        fx.orchestrator
            .apply_debt_strategy(
                ApplyDebtStrategyRequest {
                    month_id: "2026-09".to_string(),
                    selected_strategy: DebtStrategy::Avalanche,
                },
                "user@example.com",
            )
            .await
            .unwrap();
        fx.orchestrator
            .apply_tradeoff(
                ApplyGoalDebtTradeoffRequest {
                    month_id: "2026-09".to_string(),
                    goal_allocation_percent: 60.0,
                    debt_allocation_percent: 40.0,
                },
                "user@example.com",
            )
            .await
            .unwrap();

        let version = fx
            .orchestrator
            .finalize(
                FinalizeDssRequest {
                    month_id: "2026-09".to_string(),
                    use_auto_scoring: false,
                    goal_priorities: vec![AppliedGoalPriority {
                        goal_id: fx.goal_cushion,
                        priority: 0.65,
                        method: "manual".to_string(),
                    }],
                    debt_strategy: None,
                    tradeoff_choice: None,
                    budget_allocations: BTreeMap::from([
                        (fx.housing, 10_000_000.0),
                        (fx.food, 6_000_000.0),
                        (fx.fun, 2_000_000.0),
                    ]),
                    goal_fundings: vec![GoalFunding {
                        goal_id: fx.goal_cushion,
                        suggested_amount: 5_000_000.0,
                        user_adjusted_amount: None,
                    }],
                    debt_payments: vec![DebtPayment {
                        debt_id: fx.debt_card,
                        minimum_payment: 500_000.0,
                        suggested_payment: 2_500_000.0,
                        user_adjusted_payment: None,
                    }],
                    notes: Some("September plan".to_string()),
                },
                "user@example.com",
            )
            .await
            .unwrap();

        assert_eq!(version.version, 1);
        assert_eq!(version.debt_strategy, Some(DebtStrategy::Avalanche));
        assert_eq!(version.goal_allocation_pct, Some(60.0));
        assert_eq!(version.checksum.len(), 64);
        assert!((version.total_committed() - 25_500_000.0).abs() < 1e-6);

        let latest = fx.db.latest_month_state("2026-09").unwrap().unwrap();
        assert_eq!(latest.version, 1);

        // The cached workflow state is drained after a commit
        let state = fx.orchestrator.state("2026-09").await.unwrap();
        assert!(state.stages.is_empty());
        assert!(state.applied_debt_strategy.is_none());

        let audit = fx.db.list_audit_log(10).unwrap();
        assert!(audit.iter().any(|e| e.action == "finalize_month"));
    }

    #[tokio::test]
    async fn test_finalize_uses_cached_ahp_ranking() {
        let fx = seeded();
        fx.orchestrator
            .prioritize(GoalPrioritizationRequest {
                month_id: "2026-09".to_string(),
                criteria_ratings: None,
                goals: Vec::new(),
            })
            .await
            .unwrap();

        let version = fx
            .orchestrator
            .finalize(
                FinalizeDssRequest {
                    month_id: "2026-09".to_string(),
                    use_auto_scoring: true,
                    goal_priorities: Vec::new(),
                    debt_strategy: None,
                    tradeoff_choice: Some(TradeoffChoice {
                        goal_allocation_percent: 50.0,
                        debt_allocation_percent: 50.0,
                    }),
                    budget_allocations: BTreeMap::from([(fx.housing, 10_000_000.0)]),
                    goal_fundings: Vec::new(),
                    debt_payments: Vec::new(),
                    notes: None,
                },
                "user@example.com",
            )
            .await
            .unwrap();

        assert_eq!(version.goal_priorities.len(), 2);
        assert!(version.goal_priorities.iter().all(|p| p.method == "ahp"));
        let total: f64 = version.goal_priorities.iter().map(|p| p.priority).sum();
        assert!((total - 1.0).abs() < 1e-6);
        // Canonical storage order is by goal id
        assert_eq!(version.goal_priorities[0].goal_id, fx.goal_cushion);
        assert_eq!(version.goal_priorities[1].goal_id, fx.goal_laptop);
    }

    #[tokio::test]
    async fn test_finalize_rejects_total_over_income() {
        let fx = seeded();
        let err = fx
            .orchestrator
            .finalize(
                FinalizeDssRequest {
                    month_id: "2026-09".to_string(),
                    use_auto_scoring: false,
                    goal_priorities: Vec::new(),
                    debt_strategy: None,
                    tradeoff_choice: None,
                    budget_allocations: BTreeMap::from([(fx.housing, 60_000_000.0)]),
                    goal_fundings: Vec::new(),
                    debt_payments: Vec::new(),
                    notes: None,
                },
                "user@example.com",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().contains("exceeds monthly income"));

        // Nothing was committed
        assert!(fx.db.latest_month_state("2026-09").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_finalize_rejects_unknown_entities() {
        let fx = seeded();
        let err = fx
            .orchestrator
            .finalize(
                FinalizeDssRequest {
                    month_id: "2026-09".to_string(),
                    use_auto_scoring: false,
                    goal_priorities: Vec::new(),
                    debt_strategy: None,
                    tradeoff_choice: None,
                    budget_allocations: BTreeMap::from([(9999, 1_000_000.0)]),
                    goal_fundings: Vec::new(),
                    debt_payments: Vec::new(),
                    notes: None,
                },
                "user@example.com",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown category id 9999"));

        let err = fx
            .orchestrator
            .finalize(
                FinalizeDssRequest {
                    month_id: "2026-09".to_string(),
                    use_auto_scoring: false,
                    goal_priorities: Vec::new(),
                    debt_strategy: None,
                    tradeoff_choice: None,
                    budget_allocations: BTreeMap::new(),
                    goal_fundings: vec![GoalFunding {
                        goal_id: 9999,
                        suggested_amount: 1_000_000.0,
                        user_adjusted_amount: None,
                    }],
                    debt_payments: Vec::new(),
                    notes: None,
                },
                "user@example.com",
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown goal id 9999"));
    }

    #[tokio::test]
    async fn test_sequential_finalizes_advance_the_version() {
        let fx = seeded();
        let request = FinalizeDssRequest {
            month_id: "2026-09".to_string(),
            use_auto_scoring: false,
            goal_priorities: Vec::new(),
            debt_strategy: Some(DebtStrategy::Snowball),
            tradeoff_choice: None,
            budget_allocations: BTreeMap::from([(fx.housing, 10_000_000.0)]),
            goal_fundings: Vec::new(),
            debt_payments: Vec::new(),
            notes: None,
        };

        let first = fx
            .orchestrator
            .finalize(request.clone(), "user@example.com")
            .await
            .unwrap();
        let second = fx
            .orchestrator
            .finalize(request, "user@example.com")
            .await
            .unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);
        assert_eq!(
            fx.db.list_month_states("2026-09").unwrap().len(),
            2
        );
    }

    #[test]
    fn test_resolve_split_defaults() {
        assert_eq!(resolve_split(Some(60.0), Some(40.0), true, true), (60.0, 40.0));
        assert_eq!(resolve_split(Some(70.0), None, true, true), (70.0, 30.0));
        assert_eq!(resolve_split(None, Some(25.0), true, true), (75.0, 25.0));
        assert_eq!(resolve_split(None, None, true, true), (50.0, 50.0));
        assert_eq!(resolve_split(None, None, false, true), (0.0, 100.0));
        assert_eq!(resolve_split(None, None, true, false), (100.0, 0.0));
        assert_eq!(resolve_split(None, None, false, false), (100.0, 0.0));
    }

    #[test]
    fn test_stage_order_and_parsing() {
        assert!(WorkflowStage::AutoScore < WorkflowStage::Finalize);
        assert!(WorkflowStage::DebtStrategy < WorkflowStage::GoalDebtTradeoff);
        for stage in WorkflowStage::ALL {
            assert_eq!(stage.as_str().parse::<WorkflowStage>().unwrap(), stage);
        }
        assert!("upside_down".parse::<WorkflowStage>().is_err());
    }
}
