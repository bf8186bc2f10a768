//! Goal prioritization via the Analytic Hierarchy Process
//!
//! Builds the pairwise-comparison matrix implied by the weighted criterion
//! scores, estimates its principal eigenvector by power iteration, and
//! reports Saaty's consistency ratio. Inconsistency is informational and
//! never blocks the workflow.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Criterion, CriteriaWeights, Goal};
use crate::scoring::ScoredGoal;

/// Power iteration bounds
const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_EPS: f64 = 1e-9;

/// Guard against zero denominators when forming score ratios
const RATIO_EPS: f64 = 1e-6;

/// Saaty's random consistency index, indexed by matrix size n (0 and 1 unused)
const RANDOM_INDEX: [f64; 11] = [0.0, 0.0, 0.0, 0.58, 0.90, 1.12, 1.24, 1.32, 1.41, 1.45, 1.49];

/// One goal's position in the priority ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub alternative_id: i64,
    pub alternative_name: String,
    /// 1-based, ties broken by original input order
    pub rank: i64,
    /// Normalized priority weight; sums to 1 across the ranking
    pub priority: f64,
}

/// Output of the prioritization stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AhpResult {
    pub ranking: Vec<RankedAlternative>,
    pub criteria_weights: CriteriaWeights,
    pub consistency_ratio: f64,
    pub is_consistent: bool,
}

impl AhpResult {
    /// Priority weight for a goal, 0 when the goal is not in the ranking
    pub fn priority_of(&self, goal_id: i64) -> f64 {
        self.ranking
            .iter()
            .find(|r| r.alternative_id == goal_id)
            .map(|r| r.priority)
            .unwrap_or(0.0)
    }
}

/// Rank scored goals by AHP priority.
///
/// `scored` drives the ranking; `goals` supplies display names. Weights must
/// be normalized over the enabled criteria.
pub fn prioritize_goals(
    goals: &[Goal],
    scored: &[ScoredGoal],
    weights: &CriteriaWeights,
) -> Result<AhpResult> {
    if scored.is_empty() {
        return Err(Error::InvalidData(
            "At least one scored goal is required for prioritization".to_string(),
        ));
    }
    if !weights.is_normalized() {
        return Err(Error::InvalidData(format!(
            "Criteria weights must sum to 1, got {}",
            weights.sum()
        )));
    }

    let names: Vec<String> = scored
        .iter()
        .map(|sg| {
            goals
                .iter()
                .find(|g| g.id == sg.goal_id)
                .map(|g| g.name.clone())
                .ok_or_else(|| Error::InvalidData(format!("Unknown goal id {} in scores", sg.goal_id)))
        })
        .collect::<Result<_>>()?;

    let matrix = build_pairwise_matrix(scored, weights);
    let priorities = principal_eigenvector(&matrix);
    let lambda_max = lambda_max(&matrix, &priorities);
    let consistency_ratio = consistency_ratio(lambda_max, matrix.len());

    // Stable sort keeps input order for equal priorities
    let mut order: Vec<usize> = (0..scored.len()).collect();
    order.sort_by(|&a, &b| {
        priorities[b]
            .partial_cmp(&priorities[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let ranking = order
        .iter()
        .enumerate()
        .map(|(position, &idx)| RankedAlternative {
            alternative_id: scored[idx].goal_id,
            alternative_name: names[idx].clone(),
            rank: position as i64 + 1,
            priority: priorities[idx],
        })
        .collect();

    Ok(AhpResult {
        ranking,
        criteria_weights: *weights,
        consistency_ratio,
        is_consistent: consistency_ratio <= 0.10,
    })
}

/// A[i][j] = Σ_c w_c * (s_ic / s_jc), with epsilon-guarded denominators
fn build_pairwise_matrix(scored: &[ScoredGoal], weights: &CriteriaWeights) -> Vec<Vec<f64>> {
    let n = scored.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                matrix[i][j] = 1.0;
                continue;
            }
            let mut entry = 0.0;
            for criterion in Criterion::ENABLED {
                let si = scored[i].scores.get(criterion);
                let sj = scored[j].scores.get(criterion);
                entry += weights.get(criterion) * ((si + RATIO_EPS) / (sj + RATIO_EPS));
            }
            matrix[i][j] = entry;
        }
    }

    matrix
}

/// Power iteration from a uniform start, renormalized to sum 1 each step
fn principal_eigenvector(matrix: &[Vec<f64>]) -> Vec<f64> {
    let n = matrix.len();
    let mut v = vec![1.0 / n as f64; n];

    for _ in 0..MAX_ITERATIONS {
        let next = multiply(matrix, &v);
        let sum: f64 = next.iter().sum();
        if sum <= 0.0 {
            break;
        }
        let normalized: Vec<f64> = next.iter().map(|x| x / sum).collect();
        let delta = normalized
            .iter()
            .zip(&v)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        v = normalized;
        if delta < CONVERGENCE_EPS {
            break;
        }
    }

    v
}

/// λmax = Σ(A·v) when v is normalized to sum 1
fn lambda_max(matrix: &[Vec<f64>], v: &[f64]) -> f64 {
    multiply(matrix, v).iter().sum()
}

fn multiply(matrix: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    matrix
        .iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
        .collect()
}

/// CI = (λmax − n)/(n − 1), CR = CI / RI(n). Matrices of size ≤ 2 cannot be
/// inconsistent, so their ratio is 0 by definition.
fn consistency_ratio(lambda_max: f64, n: usize) -> f64 {
    if n <= 2 {
        return 0.0;
    }
    let ci = ((lambda_max - n as f64) / (n as f64 - 1.0)).max(0.0);
    let ri = RANDOM_INDEX[n.min(RANDOM_INDEX.len() - 1)];
    ci / ri
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalPriority, GoalStatus};
    use crate::scoring::{GoalScores, ScoreDetail};
    use chrono::{NaiveDate, Utc};

    fn goal(id: i64, name: &str) -> Goal {
        Goal {
            id,
            name: name.to_string(),
            target_amount: 1_000_000.0,
            current_amount: 0.0,
            target_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            priority: GoalPriority::Medium,
            status: GoalStatus::Active,
            category: None,
            created_at: Utc::now(),
        }
    }

    fn scored(id: i64, feasibility: f64, importance: f64, urgency: f64) -> ScoredGoal {
        ScoredGoal {
            goal_id: id,
            scores: GoalScores {
                feasibility: ScoreDetail { score: feasibility, reason: String::new() },
                importance: ScoreDetail { score: importance, reason: String::new() },
                urgency: ScoreDetail { score: urgency, reason: String::new() },
            },
        }
    }

    #[test]
    fn test_priorities_sum_to_one() {
        let goals = vec![goal(1, "a"), goal(2, "b"), goal(3, "c"), goal(4, "d")];
        let scored = vec![
            scored(1, 0.9, 0.75, 0.3),
            scored(2, 0.2, 1.0, 0.8),
            scored(3, 0.5, 0.5, 0.5),
            scored(4, 0.1, 0.25, 0.95),
        ];
        let result =
            prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).unwrap();
        let total: f64 = result.ranking.iter().map(|r| r.priority).sum();
        assert!((total - 1.0).abs() < 1e-6, "priorities sum to {}", total);
    }

    #[test]
    fn test_transitive_ratios_are_perfectly_consistent() {
        // Scores of the shape s_ic = alpha_c * k_i collapse every criterion to
        // the same ratio structure, so the matrix is rank-one consistent.
        let k = [2.0, 1.0, 0.5];
        let goals = vec![goal(1, "a"), goal(2, "b"), goal(3, "c")];
        let scored: Vec<ScoredGoal> = k
            .iter()
            .enumerate()
            .map(|(i, ki)| scored(i as i64 + 1, 0.4 * ki, 0.3 * ki, 0.5 * ki))
            .collect();
        let result =
            prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).unwrap();
        assert!(
            result.consistency_ratio < 1e-4,
            "CR should be ~0, got {}",
            result.consistency_ratio
        );
        assert!(result.is_consistent);
        // Priorities mirror the strength ratios 2:1:0.5
        let p: Vec<f64> = result.ranking.iter().map(|r| r.priority).collect();
        assert!((p[0] / p[1] - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_ranking_order_and_ranks() {
        let goals = vec![goal(1, "weak"), goal(2, "strong"), goal(3, "middle")];
        let scored = vec![
            scored(1, 0.2, 0.25, 0.3),
            scored(2, 0.9, 1.0, 0.8),
            scored(3, 0.5, 0.5, 0.5),
        ];
        let result =
            prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).unwrap();
        assert_eq!(result.ranking[0].alternative_id, 2);
        assert_eq!(result.ranking[0].rank, 1);
        assert_eq!(result.ranking[1].alternative_id, 3);
        assert_eq!(result.ranking[2].alternative_id, 1);
        assert_eq!(result.ranking[2].rank, 3);
        assert!(result.ranking[0].priority > result.ranking[2].priority);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let goals = vec![goal(7, "first"), goal(3, "second")];
        let scored = vec![scored(7, 0.5, 0.5, 0.5), scored(3, 0.5, 0.5, 0.5)];
        let result =
            prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).unwrap();
        assert_eq!(result.ranking[0].alternative_id, 7);
        assert_eq!(result.ranking[1].alternative_id, 3);
    }

    #[test]
    fn test_single_goal() {
        let goals = vec![goal(1, "only")];
        let scored = vec![scored(1, 0.4, 0.75, 0.6)];
        let result =
            prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).unwrap();
        assert_eq!(result.ranking.len(), 1);
        assert!((result.ranking[0].priority - 1.0).abs() < 1e-9);
        assert_eq!(result.consistency_ratio, 0.0);
        assert!(result.is_consistent);
    }

    #[test]
    fn test_two_goals_consistent_by_definition() {
        let goals = vec![goal(1, "a"), goal(2, "b")];
        let scored = vec![scored(1, 0.9, 0.2, 0.7), scored(2, 0.1, 0.9, 0.2)];
        let result =
            prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).unwrap();
        assert_eq!(result.consistency_ratio, 0.0);
    }

    #[test]
    fn test_custom_weights_shift_ranking() {
        let goals = vec![goal(1, "feasible-later"), goal(2, "urgent-stretch")];
        // Goal 1 is very feasible but not urgent; goal 2 the opposite
        let scored = vec![scored(1, 1.0, 0.5, 0.1), scored(2, 0.1, 0.5, 1.0)];

        let feasibility_heavy = CriteriaWeights {
            feasibility: 0.8,
            importance: 0.1,
            urgency: 0.1,
            impact: 0.0,
        };
        let result = prioritize_goals(&goals, &scored, &feasibility_heavy).unwrap();
        assert_eq!(result.ranking[0].alternative_id, 1);

        let urgency_heavy = CriteriaWeights {
            feasibility: 0.1,
            importance: 0.1,
            urgency: 0.8,
            impact: 0.0,
        };
        let result = prioritize_goals(&goals, &scored, &urgency_heavy).unwrap();
        assert_eq!(result.ranking[0].alternative_id, 2);
    }

    #[test]
    fn test_unnormalized_weights_rejected() {
        let goals = vec![goal(1, "a")];
        let scored = vec![scored(1, 0.5, 0.5, 0.5)];
        let bad = CriteriaWeights {
            feasibility: 0.9,
            importance: 0.9,
            urgency: 0.9,
            impact: 0.0,
        };
        assert!(prioritize_goals(&goals, &scored, &bad).is_err());
    }

    #[test]
    fn test_unknown_goal_id_rejected() {
        let goals = vec![goal(1, "a")];
        let scored = vec![scored(99, 0.5, 0.5, 0.5)];
        assert!(prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).is_err());
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(prioritize_goals(&[], &[], &CriteriaWeights::even_split()).is_err());
    }

    #[test]
    fn test_priority_of_lookup() {
        let goals = vec![goal(1, "a"), goal(2, "b")];
        let scored = vec![scored(1, 0.9, 0.9, 0.9), scored(2, 0.1, 0.1, 0.1)];
        let result =
            prioritize_goals(&goals, &scored, &CriteriaWeights::even_split()).unwrap();
        assert!(result.priority_of(1) > result.priority_of(2));
        assert_eq!(result.priority_of(42), 0.0);
    }
}
