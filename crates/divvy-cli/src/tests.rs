//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::NaiveDate;
use divvy_core::db::{Database, NewDebt, NewGoal};
use divvy_core::models::{DebtBehavior, DebtStrategy, GoalPriority, GoalStatus};

use crate::commands::{self, format_amount, truncate};

const MONTH: &str = "2026-09";
const INCOME: f64 = 30_000_000.0;

fn setup_test_db() -> Database {
    let db = Database::in_memory().unwrap();
    db.seed_default_categories().unwrap();
    db
}

/// Seed a month with constraints, goals, and a debt for the plan commands
fn seed_planning_data(db: &Database) {
    db.upsert_month(MONTH, INCOME, None).unwrap();

    let housing = db.get_category_by_name("Housing").unwrap().unwrap();
    db.set_constraint(housing.id, 10_000_000.0, None, false, 1)
        .unwrap();
    let entertainment = db.get_category_by_name("Entertainment").unwrap().unwrap();
    db.set_constraint(entertainment.id, 2_000_000.0, Some(4_000_000.0), true, 5)
        .unwrap();

    db.create_goal(&NewGoal {
        name: "House deposit".to_string(),
        target_amount: 120_000_000.0,
        current_amount: 30_000_000.0,
        target_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
        priority: GoalPriority::High,
        category: Some("savings".to_string()),
    })
    .unwrap();
    db.create_goal(&NewGoal {
        name: "Holiday trip".to_string(),
        target_amount: 12_000_000.0,
        current_amount: 6_000_000.0,
        target_date: NaiveDate::from_ymd_opt(2027, 6, 1).unwrap(),
        priority: GoalPriority::Medium,
        category: Some("travel".to_string()),
    })
    .unwrap();

    db.create_debt(&NewDebt {
        name: "Credit card".to_string(),
        current_balance: 5_000_000.0,
        interest_rate: 0.18,
        minimum_payment: 500_000.0,
        behavior: DebtBehavior::Revolving,
    })
    .unwrap();
}

// ========== Month Command Tests ==========

#[test]
fn test_cmd_month_set() {
    let db = setup_test_db();
    let result = commands::cmd_month_set(&db, MONTH, INCOME, Some("bonus month"));
    assert!(result.is_ok());

    let month = db.get_month(MONTH).unwrap().unwrap();
    assert_eq!(month.monthly_income, INCOME);
    assert_eq!(month.note.as_deref(), Some("bonus month"));
}

#[test]
fn test_cmd_month_set_invalid_id() {
    let db = setup_test_db();
    let result = commands::cmd_month_set(&db, "sep-2026", INCOME, None);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("YYYY-MM"));
}

#[test]
fn test_cmd_month_show() {
    let db = setup_test_db();
    db.upsert_month(MONTH, INCOME, Some("note")).unwrap();

    let result = commands::cmd_month_show(&db, MONTH);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_month_show_not_found() {
    let db = setup_test_db();
    let result = commands::cmd_month_show(&db, "2031-01");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

// ========== Goal Command Tests ==========

#[test]
fn test_cmd_goal_add() {
    let db = setup_test_db();
    let result = commands::cmd_goal_add(
        &db,
        "House deposit",
        120_000_000.0,
        30_000_000.0,
        "2030-06-01",
        "high",
        Some("savings"),
    );
    assert!(result.is_ok());

    let goals = db.list_goals().unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].name, "House deposit");
    assert_eq!(goals[0].priority, GoalPriority::High);
    assert_eq!(
        goals[0].target_date,
        NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()
    );
}

#[test]
fn test_cmd_goal_add_invalid_date() {
    let db = setup_test_db();
    let result = commands::cmd_goal_add(&db, "Trip", 1000.0, 0.0, "06/01/2030", "medium", None);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Invalid --date format"));
}

#[test]
fn test_cmd_goal_add_invalid_priority() {
    let db = setup_test_db();
    let result = commands::cmd_goal_add(&db, "Trip", 1000.0, 0.0, "2030-06-01", "urgent", None);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("valid priorities"));
}

#[test]
fn test_cmd_goal_list_empty() {
    let db = setup_test_db();
    let result = commands::cmd_goal_list(&db);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_goal_list_with_data() {
    let db = setup_test_db();
    seed_planning_data(&db);
    let result = commands::cmd_goal_list(&db);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_goal_list_multibyte_name() {
    let db = setup_test_db();
    commands::cmd_goal_add(
        &db,
        "Tien ve que an Tết 2027",
        4_000_000.0,
        0.0,
        "2026-12-31",
        "high",
        None,
    )
    .unwrap();
    let result = commands::cmd_goal_list(&db);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_goal_set_status() {
    let db = setup_test_db();
    commands::cmd_goal_add(&db, "Trip", 5_000_000.0, 0.0, "2027-01-01", "low", None).unwrap();
    let id = db.list_goals().unwrap()[0].id;

    commands::cmd_goal_set_status(&db, id, "paused").unwrap();
    assert_eq!(db.list_goals().unwrap()[0].status, GoalStatus::Paused);

    let err = commands::cmd_goal_set_status(&db, id, "done").unwrap_err();
    assert!(err.to_string().contains("valid statuses"));

    let err = commands::cmd_goal_set_status(&db, 999, "paused").unwrap_err();
    assert!(err.to_string().contains("not found"));
}

// ========== Debt Command Tests ==========

#[test]
fn test_cmd_debt_add() {
    let db = setup_test_db();
    let result = commands::cmd_debt_add(&db, "Credit card", 5_000_000.0, 0.18, 500_000.0, "revolving");
    assert!(result.is_ok());

    let debts = db.list_debts().unwrap();
    assert_eq!(debts.len(), 1);
    assert_eq!(debts[0].interest_rate, 0.18);
    assert_eq!(debts[0].behavior, DebtBehavior::Revolving);
}

#[test]
fn test_cmd_debt_add_invalid_behavior() {
    let db = setup_test_db();
    let result = commands::cmd_debt_add(&db, "Loan", 1000.0, 0.1, 100.0, "adjustable");
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("valid behaviors"));
}

#[test]
fn test_cmd_debt_list() {
    let db = setup_test_db();
    seed_planning_data(&db);
    let result = commands::cmd_debt_list(&db);
    assert!(result.is_ok());
}

// ========== Category Command Tests ==========

#[test]
fn test_cmd_category_add() {
    let db = setup_test_db();
    let result = commands::cmd_category_add(&db, "Pets");
    assert!(result.is_ok());
    assert!(db.get_category_by_name("Pets").unwrap().is_some());
}

#[test]
fn test_cmd_category_add_existing() {
    let db = setup_test_db();
    let before = db.list_categories().unwrap().len();

    let result = commands::cmd_category_add(&db, "Housing");
    assert!(result.is_ok());
    assert_eq!(db.list_categories().unwrap().len(), before);
}

#[test]
fn test_cmd_category_list() {
    let db = setup_test_db();
    let result = commands::cmd_category_list(&db);
    assert!(result.is_ok());
}

// ========== Constraint Command Tests ==========

#[test]
fn test_cmd_constraint_set() {
    let db = setup_test_db();
    let result = commands::cmd_constraint_set(&db, "Housing", 10_000_000.0, None, false, 1);
    assert!(result.is_ok());

    let constraints = db.list_constraints().unwrap();
    assert_eq!(constraints.len(), 1);
    assert_eq!(constraints[0].minimum_amount, 10_000_000.0);
    assert!(!constraints[0].is_flexible);
}

#[test]
fn test_cmd_constraint_set_unknown_category() {
    let db = setup_test_db();
    let result = commands::cmd_constraint_set(&db, "Yachts", 1000.0, None, true, 1);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

#[test]
fn test_cmd_constraint_list() {
    let db = setup_test_db();
    seed_planning_data(&db);
    let result = commands::cmd_constraint_list(&db);
    assert!(result.is_ok());
}

// ========== Plan Command Tests ==========

#[tokio::test]
async fn test_cmd_plan_score() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_score(&db, MONTH, 100.0).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_plan_score_month_not_set() {
    let db = setup_test_db();
    let result = commands::cmd_plan_score(&db, "2031-01", 100.0).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_plan_prioritize() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_prioritize(&db, MONTH, Some("8,9,3")).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_plan_prioritize_bad_ratings() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_prioritize(&db, MONTH, Some("8,9")).await;
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("three comma-separated"));

    let result = commands::cmd_plan_prioritize(&db, MONTH, Some("a,b,c")).await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Invalid rating"));
}

#[tokio::test]
async fn test_cmd_plan_debts() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_debts(&db, MONTH, 3_000_000.0).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_plan_apply_debts() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_apply_debts(&db, MONTH, 3_000_000.0, "avalanche").await;
    assert!(result.is_ok());

    let entries = db.list_audit_log(10).unwrap();
    assert!(entries
        .iter()
        .any(|e| e.action == "apply_debt_strategy" && e.user_email == "local"));
}

#[tokio::test]
async fn test_cmd_plan_apply_debts_invalid_strategy() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_apply_debts(&db, MONTH, 3_000_000.0, "biggest-first").await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("valid strategies"));
}

#[tokio::test]
async fn test_cmd_plan_tradeoff() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_tradeoff(&db, MONTH).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_plan_apply_tradeoff() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_apply_tradeoff(&db, MONTH, 60.0, 40.0).await;
    assert!(result.is_ok());

    let entries = db.list_audit_log(10).unwrap();
    assert!(entries.iter().any(|e| e.action == "apply_tradeoff"));
}

#[tokio::test]
async fn test_cmd_plan_apply_tradeoff_invalid_split() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_apply_tradeoff(&db, MONTH, 70.0, 50.0).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_cmd_plan_allocate() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_allocate(&db, MONTH, Some(60.0), Some(40.0)).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_plan_finalize() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_finalize(
        &db,
        MONTH,
        "balanced",
        Some("avalanche"),
        Some(3_000_000.0),
        Some(60.0),
        Some(40.0),
        true,
        Some("September commit"),
    )
    .await;
    assert!(result.is_ok());

    let version = db.latest_month_state(MONTH).unwrap().unwrap();
    assert_eq!(version.version, 1);
    assert_eq!(version.debt_strategy, Some(DebtStrategy::Avalanche));
    assert_eq!(version.goal_allocation_pct, Some(60.0));
    assert_eq!(version.notes.as_deref(), Some("September commit"));
    assert_eq!(version.goal_priorities.len(), 2);
    assert!(version.total_committed() <= INCOME + 1.0);

    let entries = db.list_audit_log(10).unwrap();
    assert!(entries
        .iter()
        .any(|e| e.action == "finalize_month" && e.user_email == "local"));
}

#[tokio::test]
async fn test_cmd_plan_finalize_plain() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result =
        commands::cmd_plan_finalize(&db, MONTH, "safe", None, None, None, None, false, None).await;
    assert!(result.is_ok());

    let version = db.latest_month_state(MONTH).unwrap().unwrap();
    assert_eq!(version.version, 1);
    assert!(version.debt_strategy.is_none());
    assert!(version.goal_priorities.is_empty());
}

#[tokio::test]
async fn test_cmd_plan_finalize_unknown_scenario() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result =
        commands::cmd_plan_finalize(&db, MONTH, "yolo", None, None, None, None, false, None).await;
    assert!(result.is_err());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("not found"));
    assert!(message.contains("available"));
}

#[tokio::test]
async fn test_cmd_plan_finalize_strategy_without_budget() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_finalize(
        &db,
        MONTH,
        "balanced",
        Some("avalanche"),
        None,
        None,
        None,
        false,
        None,
    )
    .await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("--budget"));
}

#[tokio::test]
async fn test_cmd_plan_finalize_mismatched_split_flags() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_finalize(
        &db,
        MONTH,
        "balanced",
        None,
        None,
        Some(60.0),
        None,
        false,
        None,
    )
    .await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("together"));
}

#[tokio::test]
async fn test_cmd_plan_status() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_plan_status(&db, MONTH).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_plan_status_month_not_found() {
    let db = setup_test_db();
    let result = commands::cmd_plan_status(&db, "2031-01").await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

// ========== Versions Command Tests ==========

#[test]
fn test_cmd_versions_empty() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_versions(&db, MONTH, None);
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cmd_versions_after_finalize() {
    let db = setup_test_db();
    seed_planning_data(&db);
    commands::cmd_plan_finalize(&db, MONTH, "balanced", None, None, None, None, false, None)
        .await
        .unwrap();

    let result = commands::cmd_versions(&db, MONTH, None);
    assert!(result.is_ok());

    let result = commands::cmd_versions(&db, MONTH, Some(1));
    assert!(result.is_ok());
}

#[test]
fn test_cmd_versions_show_not_found() {
    let db = setup_test_db();
    seed_planning_data(&db);

    let result = commands::cmd_versions(&db, MONTH, Some(99));
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("not found"));
}

// ========== Core Command Tests ==========

#[test]
fn test_cmd_init() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let result = commands::cmd_init(&db_path, true);
    assert!(result.is_ok());

    // Verify database was created
    assert!(db_path.exists());

    // Verify categories were seeded
    let db = Database::new_unencrypted(db_path.to_str().unwrap()).unwrap();
    let categories = db.list_categories().unwrap();
    assert_eq!(categories.len(), 7);
}

#[test]
fn test_cmd_seed_demo() {
    let db = setup_test_db();
    let result = commands::cmd_seed_demo(&db, Some(MONTH));
    assert!(result.is_ok());

    assert!(db.get_month(MONTH).unwrap().is_some());
    assert_eq!(db.list_goals().unwrap().len(), 3);
    assert_eq!(db.list_debts().unwrap().len(), 2);
    assert_eq!(db.list_constraints().unwrap().len(), 5);
}

#[test]
fn test_cmd_seed_demo_default_month() {
    let db = setup_test_db();
    let result = commands::cmd_seed_demo(&db, None);
    assert!(result.is_ok());
    assert_eq!(db.list_months().unwrap().len(), 1);
}

#[test]
fn test_open_db_unencrypted() {
    use tempfile::tempdir;

    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    // Create unencrypted
    let result = commands::open_db(&db_path, true);
    assert!(result.is_ok());

    // Open again unencrypted
    let result = commands::open_db(&db_path, true);
    assert!(result.is_ok());
}

// ========== Helper Function Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a long string that exceeds", 10), "a long ..."); // 7 chars + "..."
    assert_eq!(truncate("exact", 5), "exact");
    assert_eq!(truncate("exactly", 7), "exactly");
    assert_eq!(truncate("toolong", 6), "too...");
    // 20 chars but 25 bytes, fits whole
    assert_eq!(truncate("Tiết kiệm mua xe máy", 20), "Tiết kiệm mua xe máy");
    // byte offset 17 falls inside "ế"
    assert_eq!(truncate("Tien ve que an Tết 2027", 20), "Tien ve que an Tế...");
}

#[test]
fn test_format_amount() {
    assert_eq!(format_amount(0.0), "0");
    assert_eq!(format_amount(999.0), "999");
    assert_eq!(format_amount(1_000.0), "1,000");
    assert_eq!(format_amount(1_234_567.5), "1,234,568");
    assert_eq!(format_amount(-9_000_000.0), "-9,000,000");
}
