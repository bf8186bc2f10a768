//! Divvy CLI - Household budget planner
//!
//! Usage:
//!   divvy init                       Initialize database
//!   divvy month set 2026-09 --income 30000000
//!   divvy plan score 2026-09         Score goals for a month
//!   divvy plan finalize 2026-09      Commit a plan version
//!   divvy serve --port 3000          Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Month { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                MonthAction::Set {
                    month,
                    income,
                    note,
                } => commands::cmd_month_set(&db, &month, income, note.as_deref()),
                MonthAction::Show { month } => commands::cmd_month_show(&db, &month),
            }
        }
        Commands::Goal { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(GoalAction::List) => commands::cmd_goal_list(&db),
                Some(GoalAction::Add {
                    name,
                    target,
                    saved,
                    date,
                    priority,
                    category,
                }) => commands::cmd_goal_add(
                    &db,
                    &name,
                    target,
                    saved,
                    &date,
                    &priority,
                    category.as_deref(),
                ),
                Some(GoalAction::SetStatus { id, status }) => {
                    commands::cmd_goal_set_status(&db, id, &status)
                }
            }
        }
        Commands::Debt { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(DebtAction::List) => commands::cmd_debt_list(&db),
                Some(DebtAction::Add {
                    name,
                    balance,
                    rate,
                    minimum,
                    behavior,
                }) => commands::cmd_debt_add(&db, &name, balance, rate, minimum, &behavior),
            }
        }
        Commands::Category { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(CategoryAction::List) => commands::cmd_category_list(&db),
                Some(CategoryAction::Add { name }) => commands::cmd_category_add(&db, &name),
            }
        }
        Commands::Constraint { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(ConstraintAction::List) => commands::cmd_constraint_list(&db),
                Some(ConstraintAction::Set {
                    category,
                    min,
                    max,
                    flexible,
                    priority,
                }) => commands::cmd_constraint_set(&db, &category, min, max, flexible, priority),
            }
        }
        Commands::Plan { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                PlanAction::Score { month, goal_pct } => {
                    commands::cmd_plan_score(&db, &month, goal_pct).await
                }
                PlanAction::Prioritize { month, ratings } => {
                    commands::cmd_plan_prioritize(&db, &month, ratings.as_deref()).await
                }
                PlanAction::Debts { month, budget } => {
                    commands::cmd_plan_debts(&db, &month, budget).await
                }
                PlanAction::ApplyDebts {
                    month,
                    budget,
                    strategy,
                } => commands::cmd_plan_apply_debts(&db, &month, budget, &strategy).await,
                PlanAction::Tradeoff { month } => commands::cmd_plan_tradeoff(&db, &month).await,
                PlanAction::ApplyTradeoff {
                    month,
                    goal_pct,
                    debt_pct,
                } => commands::cmd_plan_apply_tradeoff(&db, &month, goal_pct, debt_pct).await,
                PlanAction::Allocate {
                    month,
                    goal_pct,
                    debt_pct,
                } => commands::cmd_plan_allocate(&db, &month, goal_pct, debt_pct).await,
                PlanAction::Finalize {
                    month,
                    scenario,
                    strategy,
                    budget,
                    goal_pct,
                    debt_pct,
                    auto_priorities,
                    notes,
                } => {
                    commands::cmd_plan_finalize(
                        &db,
                        &month,
                        &scenario,
                        strategy.as_deref(),
                        budget,
                        goal_pct,
                        debt_pct,
                        auto_priorities,
                        notes.as_deref(),
                    )
                    .await
                }
                PlanAction::Status { month } => commands::cmd_plan_status(&db, &month).await,
            }
        }
        Commands::Versions { month, show } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_versions(&db, &month, show)
        }
        Commands::SeedDemo { month } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_seed_demo(&db, month.as_deref())
        }
        Commands::Serve { port, host } => {
            commands::cmd_serve(&cli.db, &host, port, cli.no_encrypt).await
        }
    }
}
