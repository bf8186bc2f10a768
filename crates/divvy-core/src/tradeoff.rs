//! Goal vs. debt tradeoff
//!
//! Generates candidate splits of the discretionary surplus between goal
//! funding and debt repayment, scores each against the applied debt strategy
//! and goal funding sufficiency, and recommends one. The caller is free to
//! apply a different split through the continuous control.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::debt::simulate;
use crate::error::{Error, Result};
use crate::models::{Debt, DebtStrategy, Goal, GoalStatus};

/// Candidate goal percentages; debt takes the complement
const SPLIT_STEPS: [f64; 5] = [0.0, 25.0, 50.0, 75.0, 100.0];

/// Debts retired within this many months count as quick wins
const QUICK_WIN_MONTHS: i64 = 6;

/// Where the user wants the surplus to lean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeoffPriority {
    DebtFirst,
    Balanced,
    GoalsFirst,
}

impl TradeoffPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DebtFirst => "debt_first",
            Self::Balanced => "balanced",
            Self::GoalsFirst => "goals_first",
        }
    }
}

impl std::str::FromStr for TradeoffPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debt_first" => Ok(Self::DebtFirst),
            "balanced" => Ok(Self::Balanced),
            "goals_first" => Ok(Self::GoalsFirst),
            _ => Err(format!("Unknown tradeoff priority: {}", s)),
        }
    }
}

impl std::fmt::Display for TradeoffPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Appetite for keeping money invested instead of retiring cheap debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for RiskTolerance {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("Unknown risk tolerance: {}", s)),
        }
    }
}

impl std::fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences steering the tradeoff scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeoffPreferences {
    pub priority: TradeoffPriority,
    pub risk_tolerance: RiskTolerance,
    /// Pull toward smaller, earlier wins; only active when priority=balanced
    pub psychological_weight: f64,
    pub accept_investment_risk: bool,
}

impl Default for TradeoffPreferences {
    fn default() -> Self {
        Self {
            priority: TradeoffPriority::Balanced,
            risk_tolerance: RiskTolerance::Medium,
            psychological_weight: 0.5,
            accept_investment_risk: false,
        }
    }
}

/// One candidate split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeoffScenario {
    pub name: String,
    pub debt_percent: f64,
    pub goal_percent: f64,
}

/// Output of the tradeoff stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeoffResult {
    /// Name of the recommended candidate split
    pub recommended_strategy: String,
    pub scenarios: Vec<TradeoffScenario>,
    /// Goal percentage of the recommended split (0-100)
    pub recommended_goal_allocation: f64,
}

/// Score the candidate splits and recommend the best one.
///
/// `discretionary_pool` is the income left after every constraint minimum;
/// each candidate assigns `goal_percent` of it to goals and the rest to the
/// applied debt strategy, re-simulated at that budget.
pub fn preview_tradeoff(
    goals: &[Goal],
    debts: &[Debt],
    applied_strategy: DebtStrategy,
    discretionary_pool: f64,
    preferences: &TradeoffPreferences,
    today: NaiveDate,
) -> Result<TradeoffResult> {
    if goals.iter().all(|g| g.status != GoalStatus::Active) {
        return Err(Error::InvalidData(
            "At least one active goal is required for the tradeoff".to_string(),
        ));
    }
    if debts.is_empty() {
        return Err(Error::InvalidData(
            "At least one debt is required for the tradeoff".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&preferences.psychological_weight) {
        return Err(Error::InvalidData(format!(
            "psychological_weight must be between 0 and 1, got {}",
            preferences.psychological_weight
        )));
    }
    if discretionary_pool < 0.0 {
        return Err(Error::InvalidData(format!(
            "discretionary pool must be non-negative, got {}",
            discretionary_pool
        )));
    }

    let max_rate = debts
        .iter()
        .map(|d| d.interest_rate)
        .fold(0.0, f64::max);
    let (w_debt, w_goal) = preference_weights(preferences, max_rate);

    // Fastest possible payoff is the baseline the debt score normalizes to
    let best_case = simulate(debts, discretionary_pool, applied_strategy)?;

    let mut best: Option<(f64, usize)> = None;
    let mut scenarios = Vec::with_capacity(SPLIT_STEPS.len());

    for (idx, &goal_percent) in SPLIT_STEPS.iter().enumerate() {
        let debt_percent = 100.0 - goal_percent;
        let score = score_split(
            goals,
            debts,
            applied_strategy,
            discretionary_pool,
            goal_percent,
            &best_case,
            preferences,
            w_debt,
            w_goal,
            today,
        )?;

        scenarios.push(TradeoffScenario {
            name: split_name(goal_percent).to_string(),
            debt_percent,
            goal_percent,
        });

        // Strictly-greater keeps the earlier (debt-heavier) split on ties
        if best.map(|(s, _)| score > s).unwrap_or(true) {
            best = Some((score, idx));
        }
    }

    let (_, best_idx) = best.unwrap_or((0.0, 0));
    Ok(TradeoffResult {
        recommended_strategy: scenarios[best_idx].name.clone(),
        recommended_goal_allocation: scenarios[best_idx].goal_percent,
        scenarios,
    })
}

/// Validate an applied (goal_percent, debt_percent) pair
pub fn validate_split(goal_percent: f64, debt_percent: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&goal_percent) || !(0.0..=100.0).contains(&debt_percent) {
        return Err(Error::InvalidData(format!(
            "Split percentages must be between 0 and 100, got goal={} debt={}",
            goal_percent, debt_percent
        )));
    }
    if (goal_percent + debt_percent - 100.0).abs() > 1e-6 {
        return Err(Error::InvalidData(format!(
            "goal_percent + debt_percent must equal 100, got {}",
            goal_percent + debt_percent
        )));
    }
    Ok(())
}

fn split_name(goal_percent: f64) -> &'static str {
    match goal_percent as i64 {
        0 => "debt_focus",
        25 => "debt_leaning",
        50 => "balanced",
        75 => "goal_leaning",
        _ => "goal_focus",
    }
}

/// Base weights from the declared priority, shifted by risk tolerance and
/// the investment-risk flag, clamped at zero
fn preference_weights(preferences: &TradeoffPreferences, max_debt_rate: f64) -> (f64, f64) {
    let (mut w_debt, mut w_goal) = match preferences.priority {
        TradeoffPriority::DebtFirst => (0.7, 0.3),
        TradeoffPriority::Balanced => (0.5, 0.5),
        TradeoffPriority::GoalsFirst => (0.3, 0.7),
    };

    match preferences.risk_tolerance {
        RiskTolerance::Low => {
            w_debt += 0.1;
            w_goal -= 0.1;
        }
        RiskTolerance::High => {
            w_debt -= 0.1;
            w_goal += 0.1;
        }
        RiskTolerance::Medium => {}
    }

    // Cheap debt is worth keeping when the user accepts investment risk
    if preferences.accept_investment_risk && max_debt_rate < 0.10 {
        w_debt -= 0.1;
        w_goal += 0.1;
    }

    (w_debt.max(0.0), w_goal.max(0.0))
}

#[allow(clippy::too_many_arguments)]
fn score_split(
    goals: &[Goal],
    debts: &[Debt],
    strategy: DebtStrategy,
    pool: f64,
    goal_percent: f64,
    best_case: &crate::debt::StrategyScenario,
    preferences: &TradeoffPreferences,
    w_debt: f64,
    w_goal: f64,
    today: NaiveDate,
) -> Result<f64> {
    let debt_budget = pool * (100.0 - goal_percent) / 100.0;
    let goal_budget = pool * goal_percent / 100.0;

    let sim = simulate(debts, debt_budget, strategy)?;
    let debt_score = if sim.is_feasible && best_case.is_feasible {
        best_case.months_to_debt_free as f64 / sim.months_to_debt_free.max(1) as f64
    } else {
        0.0
    };

    let goal_score = goal_sufficiency(goals, goal_budget, today);

    let mut score = w_debt * debt_score + w_goal * goal_score;

    // Small, early wins only count under the balanced stance
    if preferences.priority == TradeoffPriority::Balanced && sim.is_feasible {
        let quick_wins = sim
            .payment_plans
            .iter()
            .filter(|p| p.payoff_month > 0 && p.payoff_month <= QUICK_WIN_MONTHS)
            .count() as f64
            / sim.payment_plans.len().max(1) as f64;
        score += preferences.psychological_weight * quick_wins * 0.2;
    }

    Ok(score)
}

/// Fraction of active goals whose monthly requirement the budget can meet,
/// funding the cheapest requirements first
fn goal_sufficiency(goals: &[Goal], goal_budget: f64, today: NaiveDate) -> f64 {
    let mut required: Vec<f64> = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .map(|g| {
            let months = g.months_until_target(today).max(1);
            g.remaining_amount() / months as f64
        })
        .collect();

    if required.is_empty() {
        return 0.0;
    }

    required.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut budget = goal_budget;
    let mut funded = 0usize;
    for need in &required {
        if *need <= budget {
            funded += 1;
            budget -= need;
        } else {
            break;
        }
    }

    funded as f64 / required.len() as f64
}
