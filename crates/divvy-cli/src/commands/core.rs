//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - `cmd_seed_demo` - Populate demo data for a quick tour

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Datelike, Local, Months, NaiveDate};
use divvy_core::db::{Database, NewDebt, NewGoal};
use divvy_core::models::{DebtBehavior, GoalPriority};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_str().context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    db.seed_default_categories()
        .context("Failed to seed default categories")?;
    println!("   Seeded default spending categories");

    if db.is_encrypted() {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    }

    let this_month = Local::now().format("%Y-%m");
    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!(
        "  1. Set income: divvy month set {} --income 30000000",
        this_month
    );
    println!("  2. Add goals and debts: divvy goal add / divvy debt add");
    println!("  3. Start planning: divvy plan score {}", this_month);

    Ok(())
}

/// Seed a month of demo data: income, constraints, goals, and debts.
pub fn cmd_seed_demo(db: &Database, month: Option<&str>) -> Result<()> {
    let month_id = match month {
        Some(m) => m.to_string(),
        None => Local::now().format("%Y-%m").to_string(),
    };

    println!("🌱 Seeding demo data for {}...", month_id);

    db.seed_default_categories()
        .context("Failed to seed default categories")?;
    db.upsert_month(&month_id, 30_000_000.0, Some("Demo month"))?;
    println!("   Month {} with income 30,000,000", month_id);

    let constraints: [(&str, f64, Option<f64>, bool, i64); 5] = [
        ("Housing", 9_000_000.0, None, false, 1),
        ("Utilities", 1_200_000.0, None, false, 2),
        ("Food", 4_500_000.0, Some(6_000_000.0), true, 3),
        ("Transport", 1_500_000.0, Some(2_500_000.0), true, 4),
        ("Entertainment", 800_000.0, Some(2_000_000.0), true, 5),
    ];
    for (name, min, max, flexible, priority) in constraints {
        let category = db
            .get_category_by_name(name)?
            .with_context(|| format!("Missing default category '{}'", name))?;
        db.set_constraint(category.id, min, max, flexible, priority)?;
    }
    println!("   5 category constraints");

    let today = Local::now().date_naive();
    let goals = [
        ("Emergency fund", 60_000_000.0, 18_000_000.0, 18, "high", Some("savings")),
        ("House deposit", 250_000_000.0, 40_000_000.0, 46, "high", Some("housing")),
        ("Holiday trip", 15_000_000.0, 3_000_000.0, 10, "medium", Some("travel")),
    ];
    for (name, target, saved, months_out, priority, category) in goals {
        let target_date = add_months(today, months_out)?;
        db.create_goal(&NewGoal {
            name: name.to_string(),
            target_amount: target,
            current_amount: saved,
            target_date,
            priority: priority
                .parse::<GoalPriority>()
                .map_err(|e: String| anyhow::anyhow!(e))?,
            category: category.map(str::to_string),
        })?;
    }
    println!("   3 savings goals");

    db.create_debt(&NewDebt {
        name: "Credit card".to_string(),
        current_balance: 12_000_000.0,
        interest_rate: 0.22,
        minimum_payment: 600_000.0,
        behavior: DebtBehavior::Revolving,
    })?;
    db.create_debt(&NewDebt {
        name: "Car loan".to_string(),
        current_balance: 45_000_000.0,
        interest_rate: 0.09,
        minimum_payment: 1_200_000.0,
        behavior: DebtBehavior::Installment,
    })?;
    println!("   2 debts");

    println!("✅ Demo data ready!");
    println!();
    println!("Next steps:");
    println!("  1. Score goals: divvy plan score {}", month_id);
    println!("  2. Compare strategies: divvy plan debts {} --budget 3000000", month_id);
    println!("  3. Commit a plan: divvy plan finalize {}", month_id);

    Ok(())
}

/// Add `months` to a date, clamping the day when the target month is shorter
fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .with_context(|| format!("Date out of range: {}-{:02} + {} months", date.year(), date.month(), months))
}
