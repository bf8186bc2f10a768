//! Goal scoring
//!
//! Computes per-goal feasibility/importance/urgency sub-scores from raw goal
//! data and the income share available for goal funding. Pure functions of
//! their inputs; the workflow layer caches results per month.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Criterion, CriteriaWeights, Goal, GoalStatus};

/// One sub-score with a human-readable explanation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub score: f64,
    pub reason: String,
}

/// The three enabled sub-scores for a goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalScores {
    pub feasibility: ScoreDetail,
    pub importance: ScoreDetail,
    pub urgency: ScoreDetail,
}

impl GoalScores {
    /// Score for a criterion. The disabled impact criterion scores 0 so the
    /// weighted-total formula stays uniform across all criteria.
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Feasibility => self.feasibility.score,
            Criterion::Importance => self.importance.score,
            Criterion::Urgency => self.urgency.score,
            Criterion::Impact => 0.0,
        }
    }

    /// Weighted total score under the given criteria weights
    pub fn weighted_total(&self, weights: &CriteriaWeights) -> f64 {
        [
            Criterion::Feasibility,
            Criterion::Importance,
            Criterion::Urgency,
            Criterion::Impact,
        ]
        .iter()
        .map(|c| self.get(*c) * weights.get(*c))
        .sum()
    }
}

/// Scores for one goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredGoal {
    pub goal_id: i64,
    pub scores: GoalScores,
}

/// Output of the scoring stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringResult {
    pub goals: Vec<ScoredGoal>,
    /// The even weight split used when the caller supplies no custom weights
    pub default_criteria_weights: CriteriaWeights,
}

/// Score every active goal against the monthly goal budget.
///
/// The budget is `monthly_income * goal_allocation_pct / 100`, pre-split
/// evenly across active goals since priorities do not exist yet at this
/// stage. `today` anchors months-remaining math.
pub fn score_goals(
    goals: &[Goal],
    monthly_income: f64,
    goal_allocation_pct: f64,
    today: NaiveDate,
) -> Result<ScoringResult> {
    if monthly_income < 0.0 {
        return Err(Error::InvalidData(format!(
            "monthly_income must be non-negative, got {}",
            monthly_income
        )));
    }
    if !(0.0..=100.0).contains(&goal_allocation_pct) {
        return Err(Error::InvalidData(format!(
            "goal_allocation_pct must be between 0 and 100, got {}",
            goal_allocation_pct
        )));
    }

    let active: Vec<&Goal> = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .collect();

    let goal_budget = monthly_income * (goal_allocation_pct / 100.0);
    let per_goal_capacity = if active.is_empty() {
        0.0
    } else {
        goal_budget / active.len() as f64
    };

    let scored = active
        .iter()
        .map(|goal| ScoredGoal {
            goal_id: goal.id,
            scores: GoalScores {
                feasibility: feasibility_score(goal, per_goal_capacity, today),
                importance: importance_score(goal),
                urgency: urgency_score(goal, today),
            },
        })
        .collect();

    Ok(ScoringResult {
        goals: scored,
        default_criteria_weights: CriteriaWeights::even_split(),
    })
}

fn feasibility_score(goal: &Goal, per_goal_capacity: f64, today: NaiveDate) -> ScoreDetail {
    let months = goal.months_until_target(today);
    if months < 0 {
        return ScoreDetail {
            score: 0.0,
            reason: format!("Target date {} has already passed", goal.target_date),
        };
    }

    let remaining = goal.remaining_amount();
    if remaining <= 0.0 {
        return ScoreDetail {
            score: 1.0,
            reason: "Goal is already fully funded".to_string(),
        };
    }

    let required_per_month = remaining / months.max(1) as f64;
    let ratio = (per_goal_capacity / required_per_month).clamp(0.0, 1.0);
    ScoreDetail {
        score: ratio,
        reason: format!(
            "Needs {:.0}/month; allocable capacity covers {:.0}% of that",
            required_per_month,
            ratio * 100.0
        ),
    }
}

fn importance_score(goal: &Goal) -> ScoreDetail {
    ScoreDetail {
        score: goal.priority.importance_score(),
        reason: format!("Declared priority is {}", goal.priority),
    }
}

fn urgency_score(goal: &Goal, today: NaiveDate) -> ScoreDetail {
    let months = goal.months_until_target(today);
    if months <= 0 {
        return ScoreDetail {
            score: 1.0,
            reason: "Target date is this month or has passed".to_string(),
        };
    }
    // 1.0 now, 0.5 at one year out, asymptotically 0
    let score = 12.0 / (12.0 + months as f64);
    ScoreDetail {
        score,
        reason: format!("{} months until target date", months),
    }
}
