//! Month, goal, debt, category, and constraint command implementations

use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use divvy_core::db::{Database, NewDebt, NewGoal};
use divvy_core::models::{DebtBehavior, GoalPriority, GoalStatus};

use super::{format_amount, truncate};

/// Create a month or update its income and note
pub fn cmd_month_set(db: &Database, month: &str, income: f64, note: Option<&str>) -> Result<()> {
    let saved = db.upsert_month(month, income, note)?;
    println!(
        "✅ Set month {} with income {}",
        saved.id,
        format_amount(saved.monthly_income)
    );
    if let Some(note) = saved.note.as_deref() {
        println!("   Note: {}", note);
    }
    Ok(())
}

/// Show a month's income, note, and committed versions
pub fn cmd_month_show(db: &Database, month: &str) -> Result<()> {
    let found = db.get_month(month)?.ok_or_else(|| {
        anyhow::anyhow!(
            "Month not found: {} (create it with 'divvy month set {} --income ...')",
            month,
            month
        )
    })?;

    println!();
    println!("📅 Month {}", found.id);
    println!("   ─────────────────────────────");
    println!("   Income:  {}", format_amount(found.monthly_income));
    if let Some(note) = found.note.as_deref() {
        println!("   Note:    {}", note);
    }
    println!("   Created: {}", found.created_at.format("%Y-%m-%d"));

    let versions = db.list_month_states(&found.id)?;
    if versions.is_empty() {
        println!("   Versions: none committed yet");
    } else if let Some(latest) = versions.last() {
        println!(
            "   Versions: {} committed (latest v{}, total {})",
            versions.len(),
            latest.version,
            format_amount(latest.total_committed())
        );
    }

    Ok(())
}

/// Add a new savings goal
pub fn cmd_goal_add(
    db: &Database,
    name: &str,
    target: f64,
    saved: f64,
    date: &str,
    priority: &str,
    category: Option<&str>,
) -> Result<()> {
    let target_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .context("Invalid --date format (use YYYY-MM-DD)")?;
    let priority: GoalPriority = priority
        .parse()
        .map_err(|e: String| {
            anyhow::anyhow!("{} (valid priorities: critical, high, medium, low)", e)
        })?;

    let goal_id = db.create_goal(&NewGoal {
        name: name.to_string(),
        target_amount: target,
        current_amount: saved,
        target_date,
        priority,
        category: category.map(String::from),
    })?;

    println!(
        "✅ Created goal '{}' targeting {} by {} (id: {})",
        name,
        format_amount(target),
        target_date,
        goal_id
    );

    Ok(())
}

/// List goals
pub fn cmd_goal_list(db: &Database) -> Result<()> {
    let goals = db.list_goals()?;

    if goals.is_empty() {
        println!("No goals found. Add one with:");
        println!("  divvy goal add \"House deposit\" --target 250000000 --date 2030-06-01");
        return Ok(());
    }

    println!();
    println!("🎯 Goals");
    println!("   ──────────────────────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:20} │ {:>12} │ {:>12} │ {:10} │ {:8} │ {}",
        "ID", "Name", "Target", "Saved", "Date", "Priority", "Status"
    );
    println!("   ─────┼──────────────────────┼──────────────┼──────────────┼────────────┼──────────┼─────────");

    for goal in goals {
        println!(
            "   {:>4} │ {:20} │ {:>12} │ {:>12} │ {:10} │ {:8} │ {}",
            goal.id,
            truncate(&goal.name, 20),
            format_amount(goal.target_amount),
            format_amount(goal.current_amount),
            goal.target_date.to_string(),
            goal.priority.as_str(),
            goal.status.as_str()
        );
    }

    Ok(())
}

/// Update a goal's lifecycle status
pub fn cmd_goal_set_status(db: &Database, id: i64, status: &str) -> Result<()> {
    let status: GoalStatus = status.parse().map_err(|e: String| {
        anyhow::anyhow!("{} (valid statuses: active, completed, paused, cancelled)", e)
    })?;

    let goal = db
        .get_goal(id)?
        .ok_or_else(|| anyhow::anyhow!("Goal not found: {} (see 'divvy goal list')", id))?;
    db.update_goal_status(id, status)?;

    println!("✅ Goal '{}' is now {}", goal.name, status.as_str());
    Ok(())
}

/// Add a new debt
pub fn cmd_debt_add(
    db: &Database,
    name: &str,
    balance: f64,
    rate: f64,
    minimum: f64,
    behavior: &str,
) -> Result<()> {
    let behavior: DebtBehavior = behavior.parse().map_err(|e: String| {
        anyhow::anyhow!("{} (valid behaviors: revolving, installment, interest_only)", e)
    })?;

    let debt_id = db.create_debt(&NewDebt {
        name: name.to_string(),
        current_balance: balance,
        interest_rate: rate,
        minimum_payment: minimum,
        behavior,
    })?;

    println!(
        "✅ Created debt '{}' with balance {} at {:.1}% (id: {})",
        name,
        format_amount(balance),
        rate * 100.0,
        debt_id
    );

    Ok(())
}

/// List debts
pub fn cmd_debt_list(db: &Database) -> Result<()> {
    let debts = db.list_debts()?;

    if debts.is_empty() {
        println!("No debts found. Add one with:");
        println!("  divvy debt add \"Credit card\" --balance 12000000 --rate 0.22 --minimum 600000");
        return Ok(());
    }

    println!();
    println!("💳 Debts");
    println!("   ─────────────────────────────────────────────────────────────────────");
    println!(
        "   {:>4} │ {:20} │ {:>12} │ {:>6} │ {:>12} │ {}",
        "ID", "Name", "Balance", "Rate", "Minimum", "Behavior"
    );
    println!("   ─────┼──────────────────────┼──────────────┼────────┼──────────────┼────────────");

    for debt in debts {
        println!(
            "   {:>4} │ {:20} │ {:>12} │ {:>5.1}% │ {:>12} │ {}",
            debt.id,
            truncate(&debt.name, 20),
            format_amount(debt.current_balance),
            debt.interest_rate * 100.0,
            format_amount(debt.minimum_payment),
            debt.behavior.as_str()
        );
    }

    Ok(())
}

/// Add a spending category
pub fn cmd_category_add(db: &Database, name: &str) -> Result<()> {
    if let Some(existing) = db.get_category_by_name(name)? {
        println!("Category '{}' already exists (id: {})", name, existing.id);
        return Ok(());
    }

    let category_id = db.upsert_category(name)?;
    println!("✅ Created category '{}' (id: {})", name, category_id);

    Ok(())
}

/// List spending categories
pub fn cmd_category_list(db: &Database) -> Result<()> {
    let categories = db.list_categories()?;

    if categories.is_empty() {
        println!("No categories found. Seed the defaults with 'divvy init' or add one with:");
        println!("  divvy category add Housing");
        return Ok(());
    }

    println!();
    println!("📂 Spending Categories");
    println!("   ─────────────────────────────");

    for category in categories {
        println!("   {:>4} │ {}", category.id, category.name);
    }

    Ok(())
}

/// Set the spending constraint for a category
pub fn cmd_constraint_set(
    db: &Database,
    category: &str,
    min: f64,
    max: Option<f64>,
    flexible: bool,
    priority: i64,
) -> Result<()> {
    let found = db.get_category_by_name(category)?.ok_or_else(|| {
        anyhow::anyhow!(
            "Category not found: {} (see 'divvy category list')",
            category
        )
    })?;

    db.set_constraint(found.id, min, max, flexible, priority)?;

    let max_display = max.map(format_amount).unwrap_or_else(|| "none".to_string());
    let kind = if flexible { "flexible" } else { "fixed" };
    println!(
        "✅ Set {} constraint for {}: min {}, max {}",
        kind,
        found.name,
        format_amount(min),
        max_display
    );

    Ok(())
}

/// List constraints
pub fn cmd_constraint_list(db: &Database) -> Result<()> {
    let constraints = db.list_constraints()?;

    if constraints.is_empty() {
        println!("No constraints found. Set one with:");
        println!("  divvy constraint set Housing --min 9000000");
        return Ok(());
    }

    let categories: HashMap<i64, String> = db
        .list_categories()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    println!();
    println!("📏 Category Constraints");
    println!("   ──────────────────────────────────────────────────────────────────");
    println!(
        "   {:20} │ {:>12} │ {:>12} │ {:8} │ {}",
        "Category", "Min", "Max", "Kind", "Priority"
    );
    println!("   ─────────────────────┼──────────────┼──────────────┼──────────┼─────────");

    for constraint in &constraints {
        let name = categories
            .get(&constraint.category_id)
            .map(String::as_str)
            .unwrap_or("?");
        let max_display = constraint
            .maximum_amount
            .map(format_amount)
            .unwrap_or_else(|| "-".to_string());
        let kind = if constraint.is_flexible {
            "flexible"
        } else {
            "fixed"
        };
        println!(
            "   {:20} │ {:>12} │ {:>12} │ {:8} │ {}",
            truncate(name, 20),
            format_amount(constraint.minimum_amount),
            max_display,
            kind,
            constraint.priority
        );
    }

    let total = db.total_constraint_minimums()?;
    println!();
    println!("   Total minimums: {}", format_amount(total));

    Ok(())
}
