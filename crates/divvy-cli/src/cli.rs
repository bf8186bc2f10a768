//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Divvy - Plan a month's budget across spending, goals, and debts
#[derive(Parser)]
#[command(name = "divvy")]
#[command(about = "Self-hosted household budget planner", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "divvy.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set DIVVY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage planning months (set income, show details)
    Month {
        #[command(subcommand)]
        action: MonthAction,
    },

    /// Manage savings goals
    Goal {
        #[command(subcommand)]
        action: Option<GoalAction>,
    },

    /// Manage debts
    Debt {
        #[command(subcommand)]
        action: Option<DebtAction>,
    },

    /// Manage spending categories
    Category {
        #[command(subcommand)]
        action: Option<CategoryAction>,
    },

    /// Manage category spending constraints
    Constraint {
        #[command(subcommand)]
        action: Option<ConstraintAction>,
    },

    /// Run the planning pipeline (score, prioritize, allocate, finalize)
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// List committed plan versions for a month
    Versions {
        /// Month to inspect (YYYY-MM)
        month: String,

        /// Show full details for a specific version number
        #[arg(long)]
        show: Option<i64>,
    },

    /// Populate the database with demo data for a quick tour
    SeedDemo {
        /// Month to seed (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
pub enum MonthAction {
    /// Create a month or update its income and note
    Set {
        /// Month identifier (YYYY-MM)
        month: String,

        /// Monthly income for the month
        #[arg(long)]
        income: f64,

        /// Optional note (e.g., "bonus month")
        #[arg(long)]
        note: Option<String>,
    },

    /// Show a month's income and latest committed version
    Show {
        /// Month identifier (YYYY-MM)
        month: String,
    },
}

#[derive(Subcommand)]
pub enum GoalAction {
    /// Add a new savings goal
    Add {
        /// Goal name (e.g., "House deposit")
        name: String,

        /// Target amount to save
        #[arg(long)]
        target: f64,

        /// Amount already saved
        #[arg(long, default_value = "0")]
        saved: f64,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Priority: critical, high, medium, low
        #[arg(long, default_value = "medium")]
        priority: String,

        /// Optional category label (e.g., "savings", "travel")
        #[arg(long)]
        category: Option<String>,
    },

    /// List goals
    List,

    /// Update a goal's lifecycle status
    SetStatus {
        /// Goal id (see `divvy goal list`)
        id: i64,

        /// New status: active, completed, paused, cancelled
        status: String,
    },
}

#[derive(Subcommand)]
pub enum DebtAction {
    /// Add a new debt
    Add {
        /// Debt name (e.g., "Credit card")
        name: String,

        /// Current outstanding balance
        #[arg(long)]
        balance: f64,

        /// Annual interest rate as a fraction (0.18 = 18%)
        #[arg(long)]
        rate: f64,

        /// Minimum monthly payment
        #[arg(long)]
        minimum: f64,

        /// Behavior: revolving, installment, or interest_only
        #[arg(long, default_value = "revolving")]
        behavior: String,
    },

    /// List debts
    List,
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Add a spending category
    Add {
        /// Category name (e.g., "Housing")
        name: String,
    },

    /// List spending categories
    List,
}

#[derive(Subcommand)]
pub enum ConstraintAction {
    /// Set the spending constraint for a category
    Set {
        /// Category name (must exist, see `divvy category list`)
        category: String,

        /// Minimum monthly amount
        #[arg(long)]
        min: f64,

        /// Maximum monthly amount (omit for no cap)
        #[arg(long)]
        max: Option<f64>,

        /// Mark the category as flexible (can scale between min and max)
        #[arg(long)]
        flexible: bool,

        /// Priority for trimming order (lower = kept longer)
        #[arg(long, default_value = "100")]
        priority: i64,
    },

    /// List constraints
    List,
}

#[derive(Subcommand)]
pub enum PlanAction {
    /// Score goals on feasibility, importance, and urgency
    Score {
        /// Month to plan (YYYY-MM)
        month: String,

        /// Percent of free income assumed for goals when scoring feasibility
        #[arg(long, default_value = "100")]
        goal_pct: f64,
    },

    /// Rank goals with pairwise comparison (AHP)
    Prioritize {
        /// Month to plan (YYYY-MM)
        month: String,

        /// Criteria importance ratings 1-10 as "feasibility,importance,urgency"
        #[arg(long)]
        ratings: Option<String>,
    },

    /// Compare debt payoff strategies (avalanche vs snowball)
    Debts {
        /// Month to plan (YYYY-MM)
        month: String,

        /// Total monthly budget for debt payments
        #[arg(long)]
        budget: f64,
    },

    /// Choose a debt payoff strategy for the month
    ApplyDebts {
        /// Month to plan (YYYY-MM)
        month: String,

        /// Total monthly budget for debt payments
        #[arg(long)]
        budget: f64,

        /// Strategy to apply: avalanche or snowball
        #[arg(long)]
        strategy: String,
    },

    /// Preview goal-vs-debt allocation splits
    Tradeoff {
        /// Month to plan (YYYY-MM)
        month: String,
    },

    /// Choose a goal-vs-debt split for the month
    ApplyTradeoff {
        /// Month to plan (YYYY-MM)
        month: String,

        /// Percent of free income for goals
        #[arg(long)]
        goal_pct: f64,

        /// Percent of free income for debts (must sum to 100 with --goal-pct)
        #[arg(long)]
        debt_pct: f64,
    },

    /// Preview budget allocation scenarios
    Allocate {
        /// Month to plan (YYYY-MM)
        month: String,

        /// Override the goal share of free income
        #[arg(long)]
        goal_pct: Option<f64>,

        /// Override the debt share of free income
        #[arg(long)]
        debt_pct: Option<f64>,
    },

    /// Commit a plan version for the month
    Finalize {
        /// Month to plan (YYYY-MM)
        month: String,

        /// Scenario to commit: safe or balanced
        #[arg(long, default_value = "balanced")]
        scenario: String,

        /// Apply a debt strategy first: avalanche or snowball
        #[arg(long)]
        strategy: Option<String>,

        /// Debt budget for --strategy (required when --strategy is set)
        #[arg(long)]
        budget: Option<f64>,

        /// Apply a goal/debt split first (requires --debt-pct)
        #[arg(long)]
        goal_pct: Option<f64>,

        /// Apply a goal/debt split first (requires --goal-pct)
        #[arg(long)]
        debt_pct: Option<f64>,

        /// Rank goals with default criteria weights before committing
        #[arg(long)]
        auto_priorities: bool,

        /// Note to record with the version
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show pipeline progress for a month
    Status {
        /// Month to inspect (YYYY-MM)
        month: String,
    },
}
