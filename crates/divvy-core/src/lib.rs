//! Divvy Core Library
//!
//! Shared functionality for the Divvy household budget planner:
//! - Database access and migrations
//! - Goal scoring against monthly capacity
//! - AHP-based goal prioritization
//! - Debt repayment strategy simulation (avalanche, snowball)
//! - Goal versus debt tradeoff scoring
//! - Multi-scenario budget allocation
//! - Workflow orchestration and immutable month state versioning

pub mod ahp;
pub mod allocator;
pub mod db;
pub mod debt;
pub mod error;
pub mod models;
pub mod scoring;
pub mod tradeoff;
pub mod workflow;

pub use ahp::{AhpResult, RankedAlternative};
pub use allocator::{AllocationScenario, ScenarioParams};
pub use db::{Database, NewDebt, NewGoal, NewMonthState};
pub use debt::{DebtStrategyResult, PaymentPlan, StrategyScenario};
pub use error::{Error, Result};
pub use scoring::ScoringResult;
pub use tradeoff::{TradeoffPreferences, TradeoffResult};
pub use workflow::{Orchestrator, WorkflowStage, WorkflowState};
