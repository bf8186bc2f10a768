//! Integration tests for divvy-core
//!
//! These tests exercise the full seed → preview → apply → finalize workflow.

use std::collections::BTreeMap;

use chrono::{Months, Utc};

use divvy_core::{
    db::{Database, NewDebt, NewGoal},
    models::{DebtBehavior, DebtPayment, DebtStrategy, GoalFunding, GoalPriority},
    workflow::{
        ApplyDebtStrategyRequest, ApplyGoalDebtTradeoffRequest, AutoScoringRequest,
        DebtStrategyRequest, FinalizeDssRequest, GoalPrioritizationRequest, Orchestrator,
        PreviewBudgetAllocationRequest, PreviewGoalDebtTradeoffRequest,
    },
    ScenarioParams, TradeoffPreferences,
};

const MONTH: &str = "2026-09";
const INCOME: f64 = 30_000_000.0;

/// One mandatory category, one flexible band, two goals at different
/// horizons, and a single credit card the debt budget can clear quickly.
fn seed_household(db: &Database) -> (i64, i64, i64, i64, i64) {
    db.upsert_month(MONTH, INCOME, Some("integration fixture"))
        .expect("Failed to create month");

    let housing = db.upsert_category("Housing").unwrap();
    let entertainment = db.upsert_category("Entertainment").unwrap();
    db.set_constraint(housing, 10_000_000.0, None, false, 1)
        .expect("Failed to set mandatory constraint");
    db.set_constraint(entertainment, 2_000_000.0, Some(4_000_000.0), true, 2)
        .expect("Failed to set flexible constraint");

    let today = Utc::now().date_naive();
    let g1 = db
        .create_goal(&NewGoal {
            name: "House deposit".to_string(),
            target_amount: 12_000_000.0,
            current_amount: 0.0,
            target_date: today.checked_add_months(Months::new(6)).unwrap(),
            priority: GoalPriority::High,
            category: None,
        })
        .unwrap();
    let g2 = db
        .create_goal(&NewGoal {
            name: "Holiday trip".to_string(),
            target_amount: 6_000_000.0,
            current_amount: 0.0,
            target_date: today.checked_add_months(Months::new(3)).unwrap(),
            priority: GoalPriority::Medium,
            category: None,
        })
        .unwrap();

    let card = db
        .create_debt(&NewDebt {
            name: "Credit card".to_string(),
            current_balance: 5_000_000.0,
            interest_rate: 0.18,
            minimum_payment: 500_000.0,
            behavior: DebtBehavior::Revolving,
        })
        .unwrap();

    (housing, entertainment, g1, g2, card)
}

// =============================================================================
// Full Workflow
// =============================================================================

#[tokio::test]
async fn test_full_planning_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let (housing, entertainment, _g1, _g2, card) = seed_household(&db);
    let orchestrator = Orchestrator::new(db.clone());

    // Stage 1: score the goals
    let scoring = orchestrator
        .score(AutoScoringRequest {
            month_id: MONTH.to_string(),
            monthly_income: None,
            goals: Vec::new(),
            goal_allocation_pct: 50.0,
        })
        .await
        .expect("Scoring failed");
    assert_eq!(scoring.goals.len(), 2);
    for goal in &scoring.goals {
        for score in [
            goal.scores.feasibility.score,
            goal.scores.importance.score,
            goal.scores.urgency.score,
        ] {
            assert!((0.0..=1.0).contains(&score), "sub-score out of range: {}", score);
        }
    }

    // Stage 2: prioritize; priorities must form a distribution
    let prioritization = orchestrator
        .prioritize(GoalPrioritizationRequest {
            month_id: MONTH.to_string(),
            criteria_ratings: None,
            goals: Vec::new(),
        })
        .await
        .expect("Prioritization failed");
    let total: f64 = prioritization.ranking.iter().map(|r| r.priority).sum();
    assert!((total - 1.0).abs() < 1e-6);

    // Stage 3: a 3M budget clears the 5M card in two simulated months
    let strategies = orchestrator
        .preview_debt_strategy(DebtStrategyRequest {
            month_id: MONTH.to_string(),
            debts: Vec::new(),
            total_debt_budget: 3_000_000.0,
        })
        .await
        .expect("Debt preview failed");
    let avalanche = strategies.scenario(DebtStrategy::Avalanche).unwrap();
    assert!(avalanche.is_feasible);
    assert_eq!(avalanche.months_to_debt_free, 2);
    let plan = &avalanche.payment_plans[0];
    assert!((plan.extra_payment - 2_500_000.0).abs() < 1e-6);
    assert!((plan.monthly_payment - 3_000_000.0).abs() < 1e-6);

    orchestrator
        .apply_debt_strategy(
            ApplyDebtStrategyRequest {
                month_id: MONTH.to_string(),
                selected_strategy: DebtStrategy::Avalanche,
            },
            "tester@example.com",
        )
        .await
        .expect("Debt apply failed");

    // Stage 4: tradeoff preview and a chosen split
    let tradeoff = orchestrator
        .preview_tradeoff(PreviewGoalDebtTradeoffRequest {
            month_id: MONTH.to_string(),
            preferences: TradeoffPreferences::default(),
        })
        .await
        .expect("Tradeoff preview failed");
    assert_eq!(tradeoff.scenarios.len(), 5);
    assert!(!tradeoff.recommended_strategy.is_empty());

    orchestrator
        .apply_tradeoff(
            ApplyGoalDebtTradeoffRequest {
                month_id: MONTH.to_string(),
                goal_allocation_percent: 60.0,
                debt_allocation_percent: 40.0,
            },
            "tester@example.com",
        )
        .await
        .expect("Tradeoff apply failed");

    // Stage 5: allocation scenarios stay within income
    let scenarios = orchestrator
        .preview_allocation(PreviewBudgetAllocationRequest {
            month_id: MONTH.to_string(),
            goal_allocation_pct: None,
            debt_allocation_pct: None,
            scenario_overrides: Vec::new(),
        })
        .await
        .expect("Allocation preview failed");
    assert_eq!(scenarios.len(), 2);

    let balanced = scenarios
        .iter()
        .find(|s| s.scenario_type == "balanced")
        .expect("No balanced scenario");
    assert!(balanced.is_feasible);
    assert!(balanced.summary.total_allocated <= INCOME + 1e-6);
    assert!((0.0..=100.0).contains(&balanced.feasibility_score));

    let housing_line = balanced
        .category_allocations
        .iter()
        .find(|c| c.category_id == Some(housing))
        .unwrap();
    assert_eq!(housing_line.amount, 10_000_000.0);

    // The applied avalanche plan rides through unchanged
    let card_line = balanced
        .debt_allocations
        .iter()
        .find(|d| d.debt_id == card)
        .unwrap();
    assert!((card_line.amount - 3_000_000.0).abs() < 1e-6);
    assert!((card_line.extra_payment - 2_500_000.0).abs() < 1e-6);

    // Stage 6: commit the balanced scenario verbatim
    let budget_allocations: BTreeMap<i64, f64> = balanced
        .category_allocations
        .iter()
        .filter_map(|c| c.category_id.map(|id| (id, c.amount)))
        .collect();
    let goal_fundings: Vec<GoalFunding> = balanced
        .goal_allocations
        .iter()
        .map(|g| GoalFunding {
            goal_id: g.goal_id,
            suggested_amount: g.amount,
            user_adjusted_amount: None,
        })
        .collect();
    let debt_payments: Vec<DebtPayment> = balanced
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
                month_id: MONTH.to_string(),
                use_auto_scoring: true,
                goal_priorities: Vec::new(),
                debt_strategy: None,
                tradeoff_choice: None,
                budget_allocations,
                goal_fundings,
                debt_payments,
                notes: Some("First committed plan".to_string()),
            },
            "tester@example.com",
        )
        .await
        .expect("Finalize failed");

    assert_eq!(version.version, 1);
    assert_eq!(version.debt_strategy, Some(DebtStrategy::Avalanche));
    assert_eq!(version.goal_allocation_pct, Some(60.0));
    assert_eq!(version.goal_priorities.len(), 2);
    assert_eq!(version.checksum.len(), 64);
    assert!(version.total_committed() <= INCOME);
    assert_eq!(version.category_allocations[&entertainment], 4_000_000.0);

    // The commit is durable and visible through the read APIs
    let latest = db.latest_month_state(MONTH).unwrap().unwrap();
    assert_eq!(latest.version, 1);
    assert_eq!(latest.checksum, version.checksum);
    assert_eq!(db.list_month_states(MONTH).unwrap().len(), 1);

    let audit = db.list_audit_log(20).unwrap();
    for action in ["apply_debt_strategy", "apply_tradeoff", "finalize_month"] {
        assert!(
            audit.iter().any(|e| e.action == action),
            "Missing audit action {}",
            action
        );
    }
}

// =============================================================================
// Finalize Guards
// =============================================================================

#[tokio::test]
async fn test_finalize_over_income_creates_no_version() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let (housing, ..) = seed_household(&db);
    let orchestrator = Orchestrator::new(db.clone());

    let err = orchestrator
        .finalize(
            FinalizeDssRequest {
                month_id: MONTH.to_string(),
                use_auto_scoring: false,
                goal_priorities: Vec::new(),
                debt_strategy: None,
                tradeoff_choice: None,
                budget_allocations: BTreeMap::from([(housing, 40_000_000.0)]),
                goal_fundings: Vec::new(),
                debt_payments: Vec::new(),
                notes: None,
            },
            "tester@example.com",
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("exceeds monthly income"));
    assert!(db.latest_month_state(MONTH).unwrap().is_none());
    assert!(db.list_month_states(MONTH).unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_finalize_appends_sequential_versions() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let (housing, ..) = seed_household(&db);
    let orchestrator = Orchestrator::new(db.clone());

    let request = FinalizeDssRequest {
        month_id: MONTH.to_string(),
        use_auto_scoring: false,
        goal_priorities: Vec::new(),
        debt_strategy: Some(DebtStrategy::Snowball),
        tradeoff_choice: None,
        budget_allocations: BTreeMap::from([(housing, 10_000_000.0)]),
        goal_fundings: Vec::new(),
        debt_payments: Vec::new(),
        notes: None,
    };

    let first = orchestrator
        .finalize(request.clone(), "tester@example.com")
        .await
        .unwrap();
    let second = orchestrator
        .finalize(request, "tester@example.com")
        .await
        .unwrap();

    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);

    let history = db.list_month_states(MONTH).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 2);
    assert_eq!(history[1].version, 1);
}

// =============================================================================
// Scenario Overrides
// =============================================================================

#[tokio::test]
async fn test_lean_override_pins_flexible_categories_to_minimum() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let (_, entertainment, ..) = seed_household(&db);
    let orchestrator = Orchestrator::new(db.clone());

    let scenarios = orchestrator
        .preview_allocation(PreviewBudgetAllocationRequest {
            month_id: MONTH.to_string(),
            goal_allocation_pct: Some(100.0),
            debt_allocation_pct: Some(0.0),
            scenario_overrides: vec![ScenarioParams {
                scenario_type: "lean".to_string(),
                goal_contribution_factor: 1.0,
                flexible_spending_level: 0.0,
                emergency_fund_percent: 0.2,
                goals_percent: 0.5,
                flexible_percent: 0.0,
            }],
        })
        .await
        .expect("Allocation preview failed");

    assert_eq!(scenarios.len(), 1);
    let lean = &scenarios[0];
    assert_eq!(lean.scenario_type, "lean");

    // Level 0 with no flexible pool keeps every flexible band at its floor
    let ent = lean
        .category_allocations
        .iter()
        .find(|c| c.category_id == Some(entertainment))
        .unwrap();
    assert_eq!(ent.amount, ent.minimum_amount);
    assert!(lean.summary.total_allocated <= INCOME + 1e-6);
}
