//! Committed plan version listing and inspection

use std::collections::HashMap;

use anyhow::Result;
use divvy_core::db::Database;
use divvy_core::models::MonthStateVersion;

use super::{format_amount, truncate};

/// List committed versions for a month, or show one in full with --show
pub fn cmd_versions(db: &Database, month: &str, show: Option<i64>) -> Result<()> {
    if let Some(version) = show {
        let state = db.get_month_state(month, version)?.ok_or_else(|| {
            anyhow::anyhow!("Version {} not found for {}", version, month)
        })?;
        return print_version_detail(db, &state);
    }

    let versions = db.list_month_states(month)?;
    if versions.is_empty() {
        println!("No versions committed yet for {}. Commit one with:", month);
        println!("  divvy plan finalize {}", month);
        return Ok(());
    }

    println!();
    println!("📜 Versions for {}", month);
    println!("   ──────────────────────────────────────────────────────────────");
    println!(
        "   {:>3} │ {:16} │ {:9} │ {:>6} │ {:>12} │ Note",
        "V", "Created", "Strategy", "Goals", "Total"
    );
    println!("   ────┼──────────────────┼───────────┼────────┼──────────────┼──────");

    for state in &versions {
        let strategy = state
            .debt_strategy
            .map(|s| s.as_str())
            .unwrap_or("-");
        let goals_pct = state
            .goal_allocation_pct
            .map(|p| format!("{:.0}%", p))
            .unwrap_or_else(|| "-".to_string());
        let note = state.notes.as_deref().unwrap_or("");
        println!(
            "   {:>3} │ {:16} │ {:9} │ {:>6} │ {:>12} │ {}",
            state.version,
            state.created_at.format("%Y-%m-%d %H:%M").to_string(),
            strategy,
            goals_pct,
            format_amount(state.total_committed()),
            truncate(note, 24)
        );
    }

    println!();
    println!("Show one with: divvy versions {} --show N", month);
    Ok(())
}

fn print_version_detail(db: &Database, state: &MonthStateVersion) -> Result<()> {
    let goal_names: HashMap<i64, String> = db
        .list_goals()?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect();
    let debt_names: HashMap<i64, String> = db
        .list_debts()?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();
    let category_names: HashMap<i64, String> = db
        .list_categories()?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let name_of = |names: &HashMap<i64, String>, id: i64| {
        names.get(&id).cloned().unwrap_or_else(|| format!("#{}", id))
    };

    println!();
    println!("📜 {} version {}", state.month_id, state.version);
    println!("   ─────────────────────────────");
    println!("   Created:  {}", state.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(strategy) = state.debt_strategy {
        println!("   Strategy: {}", strategy.as_str());
    }
    if let (Some(goal_pct), Some(debt_pct)) =
        (state.goal_allocation_pct, state.debt_allocation_pct)
    {
        println!("   Split:    {:.0}% goals / {:.0}% debts", goal_pct, debt_pct);
    }
    if let Some(note) = state.notes.as_deref() {
        println!("   Note:     {}", note);
    }
    println!("   Checksum: {}", truncate(&state.checksum, 15));

    if !state.goal_priorities.is_empty() {
        println!();
        println!("   Goal priorities:");
        for priority in &state.goal_priorities {
            println!(
                "     {:20} {:>6.1}%  ({})",
                truncate(&name_of(&goal_names, priority.goal_id), 20),
                priority.priority * 100.0,
                priority.method
            );
        }
    }

    if !state.category_allocations.is_empty() {
        println!();
        println!("   Categories:");
        for (category_id, amount) in &state.category_allocations {
            println!(
                "     {:20} {:>12}",
                truncate(&name_of(&category_names, *category_id), 20),
                format_amount(*amount)
            );
        }
    }

    if !state.goal_fundings.is_empty() {
        println!();
        println!("   Goal fundings:");
        for funding in &state.goal_fundings {
            let adjusted = funding
                .user_adjusted_amount
                .map(|_| format!("  (suggested {})", format_amount(funding.suggested_amount)))
                .unwrap_or_default();
            println!(
                "     {:20} {:>12}{}",
                truncate(&name_of(&goal_names, funding.goal_id), 20),
                format_amount(funding.effective_amount()),
                adjusted
            );
        }
    }

    if !state.debt_payments.is_empty() {
        println!();
        println!("   Debt payments:");
        for payment in &state.debt_payments {
            let adjusted = payment
                .user_adjusted_payment
                .map(|_| format!("  (suggested {})", format_amount(payment.suggested_payment)))
                .unwrap_or_default();
            println!(
                "     {:20} {:>12}{}",
                truncate(&name_of(&debt_names, payment.debt_id), 20),
                format_amount(payment.effective_amount()),
                adjusted
            );
        }
    }

    println!();
    println!("   Total committed: {}", format_amount(state.total_committed()));
    Ok(())
}
