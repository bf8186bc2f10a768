//! Planning pipeline command implementations
//!
//! Each command drives the staged workflow for one month. Previews print
//! results without touching committed state; apply and finalize write
//! through the workflow, which records the audit rows. Commands that need
//! an earlier stage (apply-debts, finalize) run that stage first, since
//! preview results are not persisted between invocations.

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Context, Result};
use divvy_core::allocator::AllocationScenario;
use divvy_core::db::Database;
use divvy_core::models::{CriteriaRatings, DebtPayment, DebtStrategy, GoalFunding};
use divvy_core::workflow::{
    ApplyDebtStrategyRequest, ApplyGoalDebtTradeoffRequest, AutoScoringRequest,
    DebtStrategyRequest, FinalizeDssRequest, GoalPrioritizationRequest, Orchestrator,
    PreviewBudgetAllocationRequest, PreviewGoalDebtTradeoffRequest, StageStatus,
};

use super::{format_amount, truncate};

/// Audit attribution for plans committed from the terminal
const CLI_USER: &str = "local";

/// Score goals on feasibility, importance, and urgency
pub async fn cmd_plan_score(db: &Database, month: &str, goal_pct: f64) -> Result<()> {
    let orchestrator = Orchestrator::new(db.clone());
    let result = orchestrator
        .score(AutoScoringRequest {
            month_id: month.to_string(),
            monthly_income: None,
            goals: Vec::new(),
            goal_allocation_pct: goal_pct,
        })
        .await?;

    let names: HashMap<i64, String> = db
        .list_goals()?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect();

    println!();
    println!("🧮 Goal Scores for {}", month);
    println!("   ──────────────────────────────────────────────────────────");
    println!(
        "   {:20} │ {:>11} │ {:>10} │ {:>7}",
        "Goal", "Feasibility", "Importance", "Urgency"
    );
    println!("   ─────────────────────┼─────────────┼────────────┼─────────");

    for scored in &result.goals {
        let name = names
            .get(&scored.goal_id)
            .map(String::as_str)
            .unwrap_or("?");
        println!(
            "   {:20} │ {:>11.2} │ {:>10.2} │ {:>7.2}",
            truncate(name, 20),
            scored.scores.feasibility.score,
            scored.scores.importance.score,
            scored.scores.urgency.score
        );
    }

    println!();
    println!("   Notes:");
    for scored in &result.goals {
        let name = names
            .get(&scored.goal_id)
            .map(String::as_str)
            .unwrap_or("?");
        println!("   • {}: {}", name, scored.scores.feasibility.reason);
    }

    println!();
    println!("Rank them with: divvy plan prioritize {}", month);
    Ok(())
}

/// Rank goals with AHP pairwise comparison
pub async fn cmd_plan_prioritize(db: &Database, month: &str, ratings: Option<&str>) -> Result<()> {
    let criteria_ratings = ratings.map(parse_ratings).transpose()?;

    let orchestrator = Orchestrator::new(db.clone());
    let result = orchestrator
        .prioritize(GoalPrioritizationRequest {
            month_id: month.to_string(),
            criteria_ratings,
            goals: Vec::new(),
        })
        .await?;

    println!();
    println!("🏆 Goal Ranking for {}", month);
    println!("   ─────────────────────────────────────────");
    println!("   {:>4} │ {:20} │ {:>8}", "Rank", "Goal", "Priority");
    println!("   ─────┼──────────────────────┼──────────");

    for ranked in &result.ranking {
        println!(
            "   {:>4} │ {:20} │ {:>7.1}%",
            ranked.rank,
            truncate(&ranked.alternative_name, 20),
            ranked.priority * 100.0
        );
    }

    println!();
    println!(
        "   Weights: feasibility {:.2}, importance {:.2}, urgency {:.2}",
        result.criteria_weights.feasibility,
        result.criteria_weights.importance,
        result.criteria_weights.urgency
    );
    if result.is_consistent {
        println!("   Consistency ratio: {:.3} (ok)", result.consistency_ratio);
    } else {
        println!(
            "⚠️  Consistency ratio {:.3} exceeds 0.10; the ratings contradict each other",
            result.consistency_ratio
        );
    }

    Ok(())
}

/// Compare avalanche and snowball payoff plans for a monthly budget
pub async fn cmd_plan_debts(db: &Database, month: &str, budget: f64) -> Result<()> {
    let orchestrator = Orchestrator::new(db.clone());
    let result = orchestrator
        .preview_debt_strategy(DebtStrategyRequest {
            month_id: month.to_string(),
            debts: Vec::new(),
            total_debt_budget: budget,
        })
        .await?;

    let names: HashMap<i64, String> = db
        .list_debts()?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();

    println!();
    println!(
        "💳 Debt Strategies for {} ({}/month)",
        month,
        format_amount(budget)
    );
    println!("   ─────────────────────────────────────────────────────────");

    for scenario in &result.scenarios {
        if scenario.is_feasible {
            println!(
                "   {:9} │ debt-free in {} months │ total interest {}",
                scenario.strategy.as_str(),
                scenario.months_to_debt_free,
                format_amount(scenario.total_interest)
            );
        } else {
            let short = scenario.deficit.map(format_amount).unwrap_or_default();
            println!(
                "   {:9} │ infeasible: budget is {} short of the minimum payments",
                scenario.strategy.as_str(),
                short
            );
        }
    }

    println!();
    println!("⭐ Recommended: {}", result.recommended_strategy.as_str());
    println!("   {}", result.reasoning);
    for fact in &result.key_facts {
        println!("   • {}", fact);
    }

    if let Some(recommended) = result.scenario(result.recommended_strategy) {
        if recommended.is_feasible {
            println!();
            println!("   {:20} │ {:>12} │ {:>12} │ {}", "Debt", "Payment", "Extra", "Paid off");
            println!("   ─────────────────────┼──────────────┼──────────────┼──────────");
            for plan in &recommended.payment_plans {
                let name = names.get(&plan.debt_id).map(String::as_str).unwrap_or("?");
                println!(
                    "   {:20} │ {:>12} │ {:>12} │ month {}",
                    truncate(name, 20),
                    format_amount(plan.monthly_payment),
                    format_amount(plan.extra_payment),
                    plan.payoff_month
                );
            }
        }
    }

    println!();
    println!(
        "Apply with: divvy plan apply-debts {} --budget {:.0} --strategy {}",
        month,
        budget,
        result.recommended_strategy.as_str()
    );
    Ok(())
}

/// Apply a debt strategy, simulating it first at the given budget
pub async fn cmd_plan_apply_debts(
    db: &Database,
    month: &str,
    budget: f64,
    strategy: &str,
) -> Result<()> {
    let selected: DebtStrategy = strategy
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{} (valid strategies: avalanche, snowball)", e))?;

    let orchestrator = Orchestrator::new(db.clone());
    let preview = orchestrator
        .preview_debt_strategy(DebtStrategyRequest {
            month_id: month.to_string(),
            debts: Vec::new(),
            total_debt_budget: budget,
        })
        .await?;
    orchestrator
        .apply_debt_strategy(
            ApplyDebtStrategyRequest {
                month_id: month.to_string(),
                selected_strategy: selected,
            },
            CLI_USER,
        )
        .await?;

    println!("✅ Applied {} strategy for {}", selected.as_str(), month);
    if let Some(scenario) = preview.scenario(selected) {
        if scenario.is_feasible {
            println!(
                "   Debt-free in {} months, total interest {}",
                scenario.months_to_debt_free,
                format_amount(scenario.total_interest)
            );
        } else if let Some(deficit) = scenario.deficit {
            println!(
                "⚠️  Budget {} is {} short of the minimum payments",
                format_amount(budget),
                format_amount(deficit)
            );
        }
    }

    Ok(())
}

/// Preview goal-vs-debt splits of the discretionary pool
pub async fn cmd_plan_tradeoff(db: &Database, month: &str) -> Result<()> {
    let orchestrator = Orchestrator::new(db.clone());
    let result = orchestrator
        .preview_tradeoff(PreviewGoalDebtTradeoffRequest {
            month_id: month.to_string(),
            preferences: Default::default(),
        })
        .await?;

    println!();
    println!("⚖️  Goal/Debt Tradeoff for {}", month);
    println!("   ─────────────────────────────────────────");
    println!("   {:24} │ {:>7} │ {:>7}", "Split", "Goals", "Debts");
    println!("   ─────────────────────────┼─────────┼────────");

    for scenario in &result.scenarios {
        let marker = if scenario.name == result.recommended_strategy {
            "⭐"
        } else {
            "  "
        };
        println!(
            "   {:22}{} │ {:>6.0}% │ {:>6.0}%",
            truncate(&scenario.name, 22),
            marker,
            scenario.goal_percent,
            scenario.debt_percent
        );
    }

    println!();
    println!(
        "⭐ Recommended: {} ({:.0}% to goals)",
        result.recommended_strategy, result.recommended_goal_allocation
    );
    println!(
        "Apply with: divvy plan apply-tradeoff {} --goal-pct {:.0} --debt-pct {:.0}",
        month,
        result.recommended_goal_allocation,
        100.0 - result.recommended_goal_allocation
    );
    Ok(())
}

/// Apply a goal/debt split of the discretionary pool
pub async fn cmd_plan_apply_tradeoff(
    db: &Database,
    month: &str,
    goal_pct: f64,
    debt_pct: f64,
) -> Result<()> {
    let orchestrator = Orchestrator::new(db.clone());
    orchestrator
        .apply_tradeoff(
            ApplyGoalDebtTradeoffRequest {
                month_id: month.to_string(),
                goal_allocation_percent: goal_pct,
                debt_allocation_percent: debt_pct,
            },
            CLI_USER,
        )
        .await?;

    println!(
        "✅ Applied {:.0}% goals / {:.0}% debts split for {}",
        goal_pct, debt_pct, month
    );
    Ok(())
}

/// Preview allocation scenarios for a month
pub async fn cmd_plan_allocate(
    db: &Database,
    month: &str,
    goal_pct: Option<f64>,
    debt_pct: Option<f64>,
) -> Result<()> {
    let orchestrator = Orchestrator::new(db.clone());
    let scenarios = orchestrator
        .preview_allocation(PreviewBudgetAllocationRequest {
            month_id: month.to_string(),
            goal_allocation_pct: goal_pct,
            debt_allocation_pct: debt_pct,
            scenario_overrides: Vec::new(),
        })
        .await?;

    for scenario in &scenarios {
        print_scenario(scenario);
    }

    println!();
    println!(
        "Commit one with: divvy plan finalize {} --scenario balanced",
        month
    );
    Ok(())
}

/// Commit a plan version, rebuilding the stages the flags ask for
#[allow(clippy::too_many_arguments)]
pub async fn cmd_plan_finalize(
    db: &Database,
    month: &str,
    scenario_type: &str,
    strategy: Option<&str>,
    budget: Option<f64>,
    goal_pct: Option<f64>,
    debt_pct: Option<f64>,
    auto_priorities: bool,
    notes: Option<&str>,
) -> Result<()> {
    if strategy.is_some() && budget.is_none() {
        bail!("--strategy requires --budget to simulate the payoff plan");
    }
    if goal_pct.is_some() != debt_pct.is_some() {
        bail!("--goal-pct and --debt-pct must be set together");
    }

    let orchestrator = Orchestrator::new(db.clone());

    if auto_priorities {
        let ranking = orchestrator
            .prioritize(GoalPrioritizationRequest {
                month_id: month.to_string(),
                criteria_ratings: None,
                goals: Vec::new(),
            })
            .await?;
        println!("   Ranked {} goals with default weights", ranking.ranking.len());
    }

    if let (Some(strategy), Some(budget)) = (strategy, budget) {
        let selected: DebtStrategy = strategy.parse().map_err(|e: String| {
            anyhow::anyhow!("{} (valid strategies: avalanche, snowball)", e)
        })?;
        orchestrator
            .preview_debt_strategy(DebtStrategyRequest {
                month_id: month.to_string(),
                debts: Vec::new(),
                total_debt_budget: budget,
            })
            .await?;
        orchestrator
            .apply_debt_strategy(
                ApplyDebtStrategyRequest {
                    month_id: month.to_string(),
                    selected_strategy: selected,
                },
                CLI_USER,
            )
            .await?;
        println!("   Applied {} strategy at {}/month", selected.as_str(), format_amount(budget));
    }

    if let (Some(goal_pct), Some(debt_pct)) = (goal_pct, debt_pct) {
        orchestrator
            .apply_tradeoff(
                ApplyGoalDebtTradeoffRequest {
                    month_id: month.to_string(),
                    goal_allocation_percent: goal_pct,
                    debt_allocation_percent: debt_pct,
                },
                CLI_USER,
            )
            .await?;
        println!("   Applied {:.0}% goals / {:.0}% debts split", goal_pct, debt_pct);
    }

    let scenarios = orchestrator
        .preview_allocation(PreviewBudgetAllocationRequest {
            month_id: month.to_string(),
            goal_allocation_pct: None,
            debt_allocation_pct: None,
            scenario_overrides: Vec::new(),
        })
        .await?;

    let chosen = scenarios
        .iter()
        .find(|s| s.scenario_type == scenario_type)
        .ok_or_else(|| {
            let available: Vec<&str> = scenarios.iter().map(|s| s.scenario_type.as_str()).collect();
            anyhow::anyhow!(
                "Scenario '{}' not found (available: {})",
                scenario_type,
                available.join(", ")
            )
        })?;

    for warning in &chosen.warnings {
        println!("⚠️  {}", warning);
    }

    let budget_allocations: BTreeMap<i64, f64> = chosen
        .category_allocations
        .iter()
        .filter_map(|c| c.category_id.map(|id| (id, c.amount)))
        .collect();
    let goal_fundings: Vec<GoalFunding> = chosen
        .goal_allocations
        .iter()
        .map(|g| GoalFunding {
            goal_id: g.goal_id,
            suggested_amount: g.amount,
            user_adjusted_amount: None,
        })
        .collect();
    let debt_payments: Vec<DebtPayment> = chosen
        .debt_allocations
        .iter()
        .map(|d| DebtPayment {
            debt_id: d.debt_id,
            minimum_payment: d.minimum_payment,
            suggested_payment: d.amount,
            user_adjusted_payment: None,
        })
        .collect();

    let version = orchestrator
        .finalize(
            FinalizeDssRequest {
                month_id: month.to_string(),
                use_auto_scoring: auto_priorities,
                goal_priorities: Vec::new(),
                debt_strategy: None,
                tradeoff_choice: None,
                budget_allocations,
                goal_fundings,
                debt_payments,
                notes: notes.map(String::from),
            },
            CLI_USER,
        )
        .await?;

    println!(
        "✅ Committed {} version {} ({} scenario)",
        version.month_id, version.version, chosen.scenario_type
    );
    println!(
        "   Total allocated: {} │ Checksum: {}",
        format_amount(version.total_committed()),
        truncate(&version.checksum, 15)
    );
    Ok(())
}

/// Show pipeline progress and entity counts for a month
pub async fn cmd_plan_status(db: &Database, month: &str) -> Result<()> {
    let found = db.get_month(month)?.ok_or_else(|| {
        anyhow::anyhow!(
            "Month not found: {} (create it with 'divvy month set {} --income ...')",
            month,
            month
        )
    })?;

    let orchestrator = Orchestrator::new(db.clone());
    let stages = orchestrator.stages(month).await?;

    println!();
    println!("📊 Planning status for {}", month);
    println!("   ─────────────────────────────");
    println!("   Income: {}", format_amount(found.monthly_income));
    println!(
        "   Goals: {} active │ Debts: {} open │ Constraints: {}",
        db.list_active_goals()?.len(),
        db.list_open_debts()?.len(),
        db.list_constraints()?.len()
    );

    println!();
    println!("   Pipeline:");
    for descriptor in &stages {
        let icon = match descriptor.status {
            StageStatus::Ready => "✅",
            StageStatus::Loading => "⏳",
            StageStatus::Error => "❌",
            StageStatus::Idle => "··",
        };
        println!("   {} {}", icon, descriptor.stage.as_str());
    }

    println!();
    match db.latest_month_state(month)? {
        Some(version) => println!(
            "   Latest committed: v{} on {} (total {})",
            version.version,
            version.created_at.format("%Y-%m-%d"),
            format_amount(version.total_committed())
        ),
        None => println!("   No versions committed yet"),
    }

    Ok(())
}

/// Print one allocation scenario as an indented block
fn print_scenario(scenario: &AllocationScenario) {
    let feasibility = if scenario.is_feasible {
        format!("feasible, score {:.0}", scenario.feasibility_score)
    } else {
        format!("INFEASIBLE, score {:.0}", scenario.feasibility_score)
    };

    println!();
    println!("📊 {} ({})", scenario.scenario_type, feasibility);
    println!(
        "   Income {} │ Allocated {} │ Surplus {} │ Savings rate {:.1}%",
        format_amount(scenario.summary.total_income),
        format_amount(scenario.summary.total_allocated),
        format_amount(scenario.summary.surplus),
        scenario.summary.savings_rate
    );

    println!("   Categories:");
    for line in &scenario.category_allocations {
        println!(
            "     {:20} {:>12}",
            truncate(&line.category_name, 20),
            format_amount(line.amount)
        );
    }

    if !scenario.goal_allocations.is_empty() {
        println!("   Goals:");
        for line in &scenario.goal_allocations {
            println!(
                "     {:20} {:>12}  (needs {}/month)",
                truncate(&line.goal_name, 20),
                format_amount(line.amount),
                format_amount(line.monthly_required)
            );
        }
    }

    if !scenario.debt_allocations.is_empty() {
        println!("   Debts:");
        for line in &scenario.debt_allocations {
            println!(
                "     {:20} {:>12}  (min {} + extra {})",
                truncate(&line.debt_name, 20),
                format_amount(line.amount),
                format_amount(line.minimum_payment),
                format_amount(line.extra_payment)
            );
        }
    }

    for warning in &scenario.warnings {
        println!("   ⚠️  {}", warning);
    }
}

/// Parse "feasibility,importance,urgency" ratings on the 1-10 scale
fn parse_ratings(raw: &str) -> Result<CriteriaRatings> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        bail!(
            "Expected three comma-separated ratings (feasibility,importance,urgency), e.g. --ratings 8,9,3"
        );
    }
    let mut values = [0.0f64; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .with_context(|| format!("Invalid rating '{}'", part))?;
    }
    Ok(CriteriaRatings {
        feasibility: values[0],
        importance: values[1],
        urgency: values[2],
    })
}
