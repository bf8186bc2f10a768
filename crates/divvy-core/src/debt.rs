//! Debt repayment strategy planning
//!
//! Simulates avalanche and snowball amortization schedules over a fixed
//! monthly budget and compares total interest and payoff time. The two
//! strategies share one loop and differ only in debt-selection order.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Debt, DebtStrategy};

/// Simulation horizon. Hitting the cap means the budget cannot retire the
/// debts and the scenario is reported infeasible instead of looping on.
pub const MAX_MONTHS: i64 = 600;

/// Per-debt schedule produced by a simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub debt_id: i64,
    /// Total payment in the first simulated month (minimum + extra)
    pub monthly_payment: f64,
    /// Extra applied in the first simulated month, on top of the minimum
    pub extra_payment: f64,
    /// Interest accrued on this debt across the whole horizon
    pub total_interest: f64,
    /// 1-based month in which the balance reaches zero
    pub payoff_month: i64,
}

/// One strategy's simulated outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyScenario {
    pub strategy: DebtStrategy,
    pub total_interest: f64,
    pub months_to_debt_free: i64,
    pub monthly_allocation: f64,
    pub payment_plans: Vec<PaymentPlan>,
    pub is_feasible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deficit: Option<f64>,
}

/// Output of the debt strategy stage: both scenarios plus a recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtStrategyResult {
    pub recommended_strategy: DebtStrategy,
    pub reasoning: String,
    pub key_facts: Vec<String>,
    pub scenarios: Vec<StrategyScenario>,
}

impl DebtStrategyResult {
    pub fn scenario(&self, strategy: DebtStrategy) -> Option<&StrategyScenario> {
        self.scenarios.iter().find(|s| s.strategy == strategy)
    }
}

/// Simulate both strategies and recommend the one with lower total interest
/// (ties favor avalanche).
pub fn plan_strategies(debts: &[Debt], total_debt_budget: f64) -> Result<DebtStrategyResult> {
    let avalanche = simulate(debts, total_debt_budget, DebtStrategy::Avalanche)?;
    let snowball = simulate(debts, total_debt_budget, DebtStrategy::Snowball)?;

    let recommended_strategy = if snowball.is_feasible && snowball.total_interest < avalanche.total_interest
    {
        DebtStrategy::Snowball
    } else {
        DebtStrategy::Avalanche
    };

    let (reasoning, key_facts) = summarize(&avalanche, &snowball, recommended_strategy);

    Ok(DebtStrategyResult {
        recommended_strategy,
        reasoning,
        key_facts,
        scenarios: vec![avalanche, snowball],
    })
}

/// Run the amortization loop for one strategy. A budget below the open
/// minimum payments short-circuits to an infeasible scenario carrying the
/// deficit; the loop itself never runs under-budget.
pub fn simulate(debts: &[Debt], budget: f64, strategy: DebtStrategy) -> Result<StrategyScenario> {
    validate_inputs(debts, budget)?;

    let open: Vec<&Debt> = debts.iter().filter(|d| d.current_balance > 0.0).collect();
    if open.is_empty() {
        return Err(Error::InvalidData(
            "All debts are already paid off; nothing to plan".to_string(),
        ));
    }

    let minimum_sum: f64 = open.iter().map(|d| d.minimum_payment).sum();
    if budget < minimum_sum {
        return Ok(StrategyScenario {
            strategy,
            total_interest: 0.0,
            months_to_debt_free: 0,
            monthly_allocation: budget,
            payment_plans: vec![],
            is_feasible: false,
            deficit: Some(minimum_sum - budget),
        });
    }

    let order = strategy_order(&open, strategy);
    let (scenario, _) = amortize(&open, &order, budget, strategy);
    Ok(scenario)
}

fn validate_inputs(debts: &[Debt], budget: f64) -> Result<()> {
    if debts.is_empty() {
        return Err(Error::InvalidData("At least one debt is required".to_string()));
    }
    if budget < 0.0 {
        return Err(Error::InvalidData(format!(
            "total_debt_budget must be non-negative, got {}",
            budget
        )));
    }
    for debt in debts {
        if debt.current_balance < 0.0 {
            return Err(Error::InvalidData(format!(
                "Debt '{}' has a negative balance",
                debt.name
            )));
        }
        if debt.interest_rate < 0.0 {
            return Err(Error::InvalidData(format!(
                "Debt '{}' has a negative interest rate",
                debt.name
            )));
        }
        if debt.minimum_payment < 0.0 {
            return Err(Error::InvalidData(format!(
                "Debt '{}' has a negative minimum payment",
                debt.name
            )));
        }
    }
    Ok(())
}

/// Indices into `debts` in the order the strategy attacks them.
/// Stable sort keeps input order for equal keys.
fn strategy_order(debts: &[&Debt], strategy: DebtStrategy) -> Vec<usize> {
    let mut order: Vec<usize> = (0..debts.len()).collect();
    match strategy {
        DebtStrategy::Avalanche => order.sort_by(|&a, &b| {
            debts[b]
                .interest_rate
                .partial_cmp(&debts[a].interest_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
        DebtStrategy::Snowball => order.sort_by(|&a, &b| {
            debts[a]
                .current_balance
                .partial_cmp(&debts[b].current_balance)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
    order
}

/// The shared monthly loop. Returns the scenario plus a trace of which debt
/// received the extra payment each month (used by the tests).
fn amortize(
    debts: &[&Debt],
    order: &[usize],
    budget: f64,
    strategy: DebtStrategy,
) -> (StrategyScenario, Vec<(i64, i64)>) {
    let n = debts.len();
    let mut balances: Vec<f64> = debts.iter().map(|d| d.current_balance).collect();
    let mut interest_accrued = vec![0.0; n];
    let mut payoff_month = vec![0i64; n];
    let mut first_month_paid = vec![0.0; n];
    let mut first_month_extra = vec![0.0; n];
    let mut extra_trace: Vec<(i64, i64)> = Vec::new();

    let mut month = 0i64;
    while balances.iter().any(|b| *b > 0.0) && month < MAX_MONTHS {
        month += 1;
        let mut remaining_budget = budget;

        // Interest accrues on every open balance before any payment lands
        for i in 0..n {
            if balances[i] > 0.0 {
                let interest = balances[i] * debts[i].interest_rate / 12.0;
                balances[i] += interest;
                interest_accrued[i] += interest;
            }
        }

        // Minimums first
        for i in 0..n {
            if balances[i] > 0.0 {
                let payment = debts[i].minimum_payment.min(balances[i]);
                balances[i] -= payment;
                remaining_budget -= payment;
                if month == 1 {
                    first_month_paid[i] += payment;
                }
                if balances[i] <= 0.0 && payoff_month[i] == 0 {
                    payoff_month[i] = month;
                }
            }
        }

        // Whatever is left goes to the first unpaid adjustable debt in
        // strategy order
        if remaining_budget > 0.0 {
            if let Some(&target) = order
                .iter()
                .find(|&&i| balances[i] > 0.0 && debts[i].is_adjustable())
            {
                let extra = remaining_budget.min(balances[target]);
                balances[target] -= extra;
                extra_trace.push((month, debts[target].id));
                if month == 1 {
                    first_month_paid[target] += extra;
                    first_month_extra[target] = extra;
                }
                if balances[target] <= 0.0 && payoff_month[target] == 0 {
                    payoff_month[target] = month;
                }
            }
        }
    }

    let finished = balances.iter().all(|b| *b <= 0.0);
    let months_to_debt_free = if finished {
        payoff_month.iter().copied().max().unwrap_or(0)
    } else {
        MAX_MONTHS
    };

    let payment_plans = (0..n)
        .map(|i| PaymentPlan {
            debt_id: debts[i].id,
            monthly_payment: first_month_paid[i],
            extra_payment: first_month_extra[i],
            total_interest: interest_accrued[i],
            payoff_month: payoff_month[i],
        })
        .collect();

    let scenario = StrategyScenario {
        strategy,
        total_interest: interest_accrued.iter().sum(),
        months_to_debt_free,
        monthly_allocation: budget,
        payment_plans,
        is_feasible: finished,
        deficit: None,
    };

    (scenario, extra_trace)
}

fn summarize(
    avalanche: &StrategyScenario,
    snowball: &StrategyScenario,
    recommended: DebtStrategy,
) -> (String, Vec<String>) {
    let mut key_facts = Vec::new();

    if let Some(deficit) = avalanche.deficit {
        let reasoning = format!(
            "The monthly budget of {:.0} does not cover the required minimum payments; \
             increase it by {:.0} before choosing a strategy.",
            avalanche.monthly_allocation, deficit
        );
        key_facts.push(format!("Budget short of minimum payments by {:.0}", deficit));
        return (reasoning, key_facts);
    }

    if !avalanche.is_feasible || !snowball.is_feasible {
        let reasoning = format!(
            "Neither strategy retires every balance within {} months at this budget; \
             the schedule below shows how far each gets.",
            MAX_MONTHS
        );
        key_facts.push(format!(
            "Simulation stopped at the {}-month horizon with balances outstanding",
            MAX_MONTHS
        ));
        return (reasoning, key_facts);
    }

    let interest_saved = snowball.total_interest - avalanche.total_interest;
    let months_saved = snowball.months_to_debt_free - avalanche.months_to_debt_free;

    if interest_saved.abs() > 0.5 {
        key_facts.push(format!(
            "Avalanche pays {:.0} {} interest than snowball",
            interest_saved.abs(),
            if interest_saved > 0.0 { "less" } else { "more" }
        ));
    } else {
        key_facts.push("Both strategies accrue the same total interest".to_string());
    }

    if months_saved != 0 {
        key_facts.push(format!(
            "Debt-free {} month(s) {} with avalanche",
            months_saved.abs(),
            if months_saved > 0 { "sooner" } else { "later" }
        ));
    } else {
        key_facts.push(format!(
            "Both strategies are debt-free in {} months",
            avalanche.months_to_debt_free
        ));
    }

    let reasoning = match recommended {
        DebtStrategy::Avalanche => format!(
            "Avalanche targets the highest interest rate first and finishes with {:.0} of \
             total interest over {} months, the cheapest path at this budget.",
            avalanche.total_interest, avalanche.months_to_debt_free
        ),
        DebtStrategy::Snowball => format!(
            "Snowball clears the smallest balances first and finishes with {:.0} of total \
             interest over {} months, the cheapest path at this budget.",
            snowball.total_interest, snowball.months_to_debt_free
        ),
    };

    (reasoning, key_facts)
}
