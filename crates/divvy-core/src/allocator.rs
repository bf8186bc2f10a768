//! Budget allocation
//!
//! Builds complete allocation scenarios from category constraints, AHP goal
//! priorities, the applied debt payment plans, and the applied goal/debt
//! split. Every scenario keeps its total at or below income; unassigned
//! surplus stays "to be budgeted".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ahp::AhpResult;
use crate::debt::PaymentPlan;
use crate::error::{Error, Result};
use crate::models::{Constraint, Debt, Goal, GoalStatus, SpendingCategory};
use crate::tradeoff::validate_split;

/// Fixed currency floor for a nonzero goal contribution
pub const GOAL_CONTRIBUTION_FLOOR: f64 = 100_000.0;

/// Tunable parameters for one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub scenario_type: String,
    /// Multiplier on suggested goal contributions, 0-2
    pub goal_contribution_factor: f64,
    /// 0 = minimum, 1 = maximum interpolation for flexible categories
    pub flexible_spending_level: f64,
    pub emergency_fund_percent: f64,
    pub goals_percent: f64,
    pub flexible_percent: f64,
}

impl ScenarioParams {
    pub fn safe() -> Self {
        Self {
            scenario_type: "safe".to_string(),
            goal_contribution_factor: 0.8,
            flexible_spending_level: 0.2,
            emergency_fund_percent: 0.3,
            goals_percent: 0.4,
            flexible_percent: 0.1,
        }
    }

    pub fn balanced() -> Self {
        Self {
            scenario_type: "balanced".to_string(),
            goal_contribution_factor: 1.0,
            flexible_spending_level: 0.5,
            emergency_fund_percent: 0.2,
            goals_percent: 0.5,
            flexible_percent: 0.2,
        }
    }

    /// The scenario set produced when the caller overrides nothing
    pub fn defaults() -> Vec<Self> {
        vec![Self::safe(), Self::balanced()]
    }

    fn validate(&self) -> Result<()> {
        if self.scenario_type.trim().is_empty() {
            return Err(Error::InvalidData("scenario_type must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.goal_contribution_factor) {
            return Err(Error::InvalidData(format!(
                "goal_contribution_factor must be between 0 and 2, got {}",
                self.goal_contribution_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.flexible_spending_level) {
            return Err(Error::InvalidData(format!(
                "flexible_spending_level must be between 0 and 1, got {}",
                self.flexible_spending_level
            )));
        }
        for (name, value) in [
            ("emergency_fund_percent", self.emergency_fund_percent),
            ("goals_percent", self.goals_percent),
            ("flexible_percent", self.flexible_percent),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidData(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Everything a scenario build reads. The payment plans come from the applied
/// debt strategy and are reused verbatim, never recomputed here.
#[derive(Debug, Clone, Copy)]
pub struct AllocationInputs<'a> {
    pub income: f64,
    pub categories: &'a [SpendingCategory],
    pub constraints: &'a [Constraint],
    pub goals: &'a [Goal],
    pub priorities: Option<&'a AhpResult>,
    pub debts: &'a [Debt],
    pub payment_plans: Option<&'a [PaymentPlan]>,
    pub goal_allocation_pct: f64,
    pub debt_allocation_pct: f64,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub total_income: f64,
    pub total_allocated: f64,
    /// To-be-budgeted remainder
    pub surplus: f64,
    /// (emergency + goal contributions) / income, as a percentage
    pub savings_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAllocation {
    /// None for the synthetic emergency-fund line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub category_name: String,
    pub amount: f64,
    pub is_flexible: bool,
    pub minimum_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalAllocation {
    pub goal_id: i64,
    pub goal_name: String,
    pub amount: f64,
    pub monthly_required: f64,
    pub priority_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtAllocation {
    pub debt_id: i64,
    pub debt_name: String,
    pub amount: f64,
    pub minimum_payment: f64,
    pub extra_payment: f64,
}

/// One complete allocation proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationScenario {
    pub scenario_type: String,
    pub is_feasible: bool,
    pub summary: AllocationSummary,
    pub category_allocations: Vec<CategoryAllocation>,
    pub goal_allocations: Vec<GoalAllocation>,
    pub debt_allocations: Vec<DebtAllocation>,
    pub feasibility_score: f64,
    pub warnings: Vec<String>,
}

/// Build one scenario per parameter set
pub fn build_scenarios(
    inputs: &AllocationInputs,
    params_list: &[ScenarioParams],
) -> Result<Vec<AllocationScenario>> {
    if params_list.is_empty() {
        return Err(Error::InvalidData(
            "At least one scenario parameter set is required".to_string(),
        ));
    }
    params_list
        .iter()
        .map(|params| build_scenario(inputs, params))
        .collect()
}

/// Build a single allocation scenario
pub fn build_scenario(
    inputs: &AllocationInputs,
    params: &ScenarioParams,
) -> Result<AllocationScenario> {
    params.validate()?;
    validate_split(inputs.goal_allocation_pct, inputs.debt_allocation_pct)?;
    if inputs.income < 0.0 {
        return Err(Error::InvalidData(format!(
            "income must be non-negative, got {}",
            inputs.income
        )));
    }

    let mut warnings = Vec::new();

    // Steps 1-2: constraint floors, flexible interpolation at the scenario level
    let mut category_allocations = allocate_categories(inputs, params)?;

    let minimum_committed: f64 = category_allocations.iter().map(|c| c.minimum_amount).sum();
    let is_feasible = minimum_committed <= inputs.income;
    if !is_feasible {
        warnings.push(format!(
            "Minimum commitments exceed income by {:.0}",
            minimum_committed - inputs.income
        ));
        // Nothing above the floors fits; drop every flexible band to minimum
        for c in &mut category_allocations {
            c.amount = c.minimum_amount;
        }
    } else {
        // Interpolated flexible spending may still overshoot; scale the
        // above-minimum portion down so committed spending fits income
        let committed: f64 = category_allocations.iter().map(|c| c.amount).sum();
        if committed > inputs.income {
            let above_min = committed - minimum_committed;
            let room = inputs.income - minimum_committed;
            let scale = if above_min > 0.0 { room / above_min } else { 0.0 };
            for c in &mut category_allocations {
                c.amount = c.minimum_amount + (c.amount - c.minimum_amount) * scale;
            }
            warnings.push("Flexible spending reduced to fit income".to_string());
        }
    }

    // Step 3: post-commitment surplus
    let committed: f64 = category_allocations.iter().map(|c| c.amount).sum();
    let surplus = (inputs.income - committed).max(0.0);

    // Step 4: partition the surplus; scale down proportionally when the
    // three percentages overcommit it
    let mut emergency_pct = params.emergency_fund_percent.max(0.0);
    let mut goals_pct = params.goals_percent.max(0.0);
    let mut flexible_pct = params.flexible_percent.max(0.0);
    let pct_total = emergency_pct + goals_pct + flexible_pct;
    if pct_total > 1.0 {
        emergency_pct /= pct_total;
        goals_pct /= pct_total;
        flexible_pct /= pct_total;
    }

    let emergency_pool = surplus * emergency_pct;
    let goals_debt_pool = surplus * goals_pct;
    let flexible_pool = surplus * flexible_pct;

    let goal_share = goals_debt_pool * inputs.goal_allocation_pct / 100.0;
    let debt_share = goals_debt_pool * inputs.debt_allocation_pct / 100.0;

    // Step 5: goals, proportional to AHP priority
    let goal_allocations = allocate_goals(inputs, params, goal_share);

    // Step 6: debts, reusing the applied plans verbatim
    let debt_allocations = allocate_debts(inputs, debt_share, &mut warnings)?;

    // Step 7: top flexible categories up toward their maximum
    top_up_flexible(&mut category_allocations, flexible_pool);

    if emergency_pool > 0.0 {
        category_allocations.push(CategoryAllocation {
            category_id: None,
            category_name: "Emergency fund".to_string(),
            amount: emergency_pool,
            is_flexible: false,
            minimum_amount: 0.0,
            maximum_amount: None,
        });
    }

    // Step 8: totals, validation, scoring
    let category_total: f64 = category_allocations.iter().map(|c| c.amount).sum();
    let goal_total: f64 = goal_allocations.iter().map(|g| g.amount).sum();
    let debt_total: f64 = debt_allocations.iter().map(|d| d.amount).sum();
    let total_allocated = category_total + goal_total + debt_total;

    if is_feasible && total_allocated > inputs.income + 1e-6 {
        warnings.push(format!(
            "Allocation exceeds income by {:.0}",
            total_allocated - inputs.income
        ));
    }

    for goal in &goal_allocations {
        if goal.amount + 1e-6 < goal.monthly_required {
            warnings.push(format!(
                "Goal '{}' is {:.0}/month short of its target pace",
                goal.goal_name,
                goal.monthly_required - goal.amount
            ));
        }
    }

    let feasibility_score = feasibility_score(
        inputs,
        is_feasible,
        minimum_committed,
        &goal_allocations,
        &debt_allocations,
        debt_share,
    );

    let savings_rate = if inputs.income > 0.0 {
        (emergency_pool + goal_total) / inputs.income * 100.0
    } else {
        0.0
    };

    Ok(AllocationScenario {
        scenario_type: params.scenario_type.clone(),
        is_feasible,
        summary: AllocationSummary {
            total_income: inputs.income,
            total_allocated,
            surplus: inputs.income - total_allocated,
            savings_rate,
        },
        category_allocations,
        goal_allocations,
        debt_allocations,
        feasibility_score,
        warnings,
    })
}

fn allocate_categories(
    inputs: &AllocationInputs,
    params: &ScenarioParams,
) -> Result<Vec<CategoryAllocation>> {
    inputs
        .constraints
        .iter()
        .map(|constraint| {
            let category = inputs
                .categories
                .iter()
                .find(|c| c.id == constraint.category_id)
                .ok_or_else(|| {
                    Error::InvalidData(format!(
                        "Constraint references unknown category {}",
                        constraint.category_id
                    ))
                })?;
            Ok(CategoryAllocation {
                category_id: Some(category.id),
                category_name: category.name.clone(),
                amount: constraint.amount_at_level(params.flexible_spending_level),
                is_flexible: constraint.is_flexible,
                minimum_amount: constraint.minimum_amount,
                maximum_amount: constraint.maximum_amount,
            })
        })
        .collect()
}

/// Proportional-to-priority distribution with the fixed contribution floor.
/// Amounts are floored to whole currency units.
fn allocate_goals(
    inputs: &AllocationInputs,
    params: &ScenarioParams,
    goal_share: f64,
) -> Vec<GoalAllocation> {
    let eligible: Vec<&Goal> = inputs
        .goals
        .iter()
        .filter(|g| g.status == GoalStatus::Active && g.remaining_amount() > 0.0)
        .collect();

    if eligible.is_empty() {
        return vec![];
    }

    // AHP priorities when available, an even split otherwise
    let raw_weights: Vec<f64> = eligible
        .iter()
        .map(|g| match inputs.priorities {
            Some(ahp) => ahp.priority_of(g.id),
            None => 1.0,
        })
        .collect();
    let weight_sum: f64 = raw_weights.iter().sum();
    let weights: Vec<f64> = if weight_sum > 0.0 {
        raw_weights.iter().map(|w| w / weight_sum).collect()
    } else {
        vec![1.0 / eligible.len() as f64; eligible.len()]
    };

    let mut amounts: Vec<f64> = eligible
        .iter()
        .zip(&weights)
        .map(|(g, w)| {
            (goal_share * w * params.goal_contribution_factor).min(g.remaining_amount())
        })
        .collect();

    if goal_share <= 0.0 {
        amounts.iter_mut().for_each(|a| *a = 0.0);
    } else {
        let total: f64 = amounts.iter().sum();
        if total > goal_share {
            let scale = goal_share / total;
            amounts.iter_mut().for_each(|a| *a *= scale);
        }

        // Raise nonzero slivers to the contribution floor
        for (amount, goal) in amounts.iter_mut().zip(&eligible) {
            if *amount > 0.0 && *amount < GOAL_CONTRIBUTION_FLOOR {
                *amount = GOAL_CONTRIBUTION_FLOOR.min(goal.remaining_amount());
            }
        }

        let total: f64 = amounts.iter().sum();
        if total > goal_share {
            // Per-goal floor, zero for goals that received nothing
            let floors: Vec<f64> = amounts
                .iter()
                .zip(&eligible)
                .map(|(a, g)| {
                    if *a > 0.0 {
                        GOAL_CONTRIBUTION_FLOOR.min(g.remaining_amount())
                    } else {
                        0.0
                    }
                })
                .collect();
            let floor_total: f64 = floors.iter().sum();
            if floor_total <= goal_share {
                // Shave the above-floor excess so the total lands on the share
                let excess_total: f64 = amounts
                    .iter()
                    .zip(&floors)
                    .map(|(a, f)| (a - f).max(0.0))
                    .sum();
                let room = goal_share - floor_total;
                let scale = if excess_total > 0.0 { room / excess_total } else { 0.0 };
                for (amount, floor) in amounts.iter_mut().zip(&floors) {
                    let excess = (*amount - *floor).max(0.0);
                    *amount = *floor + excess * scale;
                }
            } else {
                // The share cannot give everyone the floor: fund goals at the
                // floor in priority-rank order until it runs out
                let mut order: Vec<usize> = (0..eligible.len()).collect();
                order.sort_by(|&a, &b| {
                    weights[b]
                        .partial_cmp(&weights[a])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                amounts.iter_mut().for_each(|a| *a = 0.0);
                let mut budget = goal_share;
                for idx in order {
                    let take = GOAL_CONTRIBUTION_FLOOR.min(eligible[idx].remaining_amount());
                    if take <= budget {
                        amounts[idx] = take;
                        budget -= take;
                    }
                }
            }
        }
    }

    eligible
        .iter()
        .zip(&weights)
        .zip(&amounts)
        .map(|((goal, weight), amount)| {
            let months = goal.months_until_target(inputs.today).max(1);
            GoalAllocation {
                goal_id: goal.id,
                goal_name: goal.name.clone(),
                amount: amount.floor(),
                monthly_required: goal.remaining_amount() / months as f64,
                priority_weight: *weight,
            }
        })
        .collect()
}

/// The applied plans are an input contract: amounts come through unchanged,
/// with a warning when the debt share cannot cover them. Without applied
/// plans every open debt falls back to its minimum payment.
fn allocate_debts(
    inputs: &AllocationInputs,
    debt_share: f64,
    warnings: &mut Vec<String>,
) -> Result<Vec<DebtAllocation>> {
    let open: Vec<&Debt> = inputs
        .debts
        .iter()
        .filter(|d| d.current_balance > 0.0)
        .collect();
    if open.is_empty() {
        return Ok(vec![]);
    }

    let allocations = match inputs.payment_plans {
        Some(plans) => open
            .iter()
            .map(|debt| {
                let plan = plans.iter().find(|p| p.debt_id == debt.id).ok_or_else(|| {
                    Error::InvalidData(format!(
                        "Applied payment plans are missing debt '{}'",
                        debt.name
                    ))
                })?;
                Ok(DebtAllocation {
                    debt_id: debt.id,
                    debt_name: debt.name.clone(),
                    amount: plan.monthly_payment,
                    minimum_payment: debt.minimum_payment,
                    extra_payment: plan.extra_payment,
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => {
            warnings.push(
                "No debt strategy applied; defaulting every debt to its minimum payment"
                    .to_string(),
            );
            open.iter()
                .map(|debt| DebtAllocation {
                    debt_id: debt.id,
                    debt_name: debt.name.clone(),
                    amount: debt.minimum_payment.min(debt.current_balance),
                    minimum_payment: debt.minimum_payment,
                    extra_payment: 0.0,
                })
                .collect()
        }
    };

    let plan_total: f64 = allocations.iter().map(|d| d.amount).sum();
    if plan_total > debt_share + 1e-6 {
        warnings.push(format!(
            "Debt payments exceed the debt share of the surplus by {:.0}",
            plan_total - debt_share
        ));
    }

    Ok(allocations)
}

/// Distribute the flexible pool toward category maximums, pro-rata by
/// remaining headroom. Anything beyond every maximum stays unallocated.
fn top_up_flexible(categories: &mut [CategoryAllocation], flexible_pool: f64) {
    if flexible_pool <= 0.0 {
        return;
    }

    let headrooms: Vec<f64> = categories
        .iter()
        .map(|c| {
            if !c.is_flexible {
                return 0.0;
            }
            match c.maximum_amount {
                Some(max) => (max - c.amount).max(0.0),
                None => 0.0,
            }
        })
        .collect();
    let total_headroom: f64 = headrooms.iter().sum();
    if total_headroom <= 0.0 {
        return;
    }

    let spend = flexible_pool.min(total_headroom);
    for (category, headroom) in categories.iter_mut().zip(&headrooms) {
        if *headroom > 0.0 {
            category.amount += spend * headroom / total_headroom;
        }
    }
}

fn feasibility_score(
    inputs: &AllocationInputs,
    is_feasible: bool,
    minimum_committed: f64,
    goals: &[GoalAllocation],
    debts: &[DebtAllocation],
    debt_share: f64,
) -> f64 {
    if inputs.income <= 0.0 {
        return 0.0;
    }

    let mut score = 100.0;

    if !is_feasible {
        let deficit_ratio = ((minimum_committed - inputs.income) / inputs.income).min(1.0);
        score -= 50.0 + 50.0 * deficit_ratio;
    }

    let required: f64 = goals.iter().map(|g| g.monthly_required).sum();
    if required > 0.0 {
        let unmet: f64 = goals
            .iter()
            .map(|g| (g.monthly_required - g.amount).max(0.0))
            .sum();
        score -= 30.0 * (unmet / required).min(1.0);
    }

    let plan_total: f64 = debts.iter().map(|d| d.amount).sum();
    if plan_total > 0.0 && plan_total > debt_share {
        score -= 20.0 * ((plan_total - debt_share) / plan_total).min(1.0);
    }

    score.clamp(0.0, 100.0)
}
