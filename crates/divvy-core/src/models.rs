//! Domain models for Divvy

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A savings goal the household is working toward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: NaiveDate,
    pub priority: GoalPriority,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// Amount still needed to reach the target
    pub fn remaining_amount(&self) -> f64 {
        (self.target_amount - self.current_amount).max(0.0)
    }

    /// Whole calendar months from `today` to the target date (negative if passed)
    pub fn months_until_target(&self, today: NaiveDate) -> i64 {
        let years = self.target_date.year() as i64 - today.year() as i64;
        let months = self.target_date.month() as i64 - today.month() as i64;
        years * 12 + months
    }
}

/// Declared goal priority, mapped onto an importance score for the scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl GoalPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Importance sub-score in [0,1]
    pub fn importance_score(&self) -> f64 {
        match self {
            Self::Critical => 1.0,
            Self::High => 0.75,
            Self::Medium => 0.5,
            Self::Low => 0.25,
        }
    }
}

impl std::str::FromStr for GoalPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Unknown goal priority: {}", s)),
        }
    }
}

impl std::fmt::Display for GoalPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Goal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown goal status: {}", s)),
        }
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An outstanding debt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: i64,
    pub name: String,
    pub current_balance: f64,
    /// Annual interest rate as a decimal (0.18 = 18%)
    pub interest_rate: f64,
    pub minimum_payment: f64,
    #[serde(default)]
    pub behavior: DebtBehavior,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Debt {
    /// Whether the monthly payment can be raised above the minimum.
    /// Installment and interest-only debts are always paid at exactly minimum.
    pub fn is_adjustable(&self) -> bool {
        matches!(self.behavior, DebtBehavior::Revolving)
    }
}

/// How a debt's payment schedule behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DebtBehavior {
    /// Balance-carrying debt where extra payments reduce principal (credit cards)
    #[default]
    Revolving,
    /// Fixed schedule, non-adjustable (car loans, mortgages)
    Installment,
    /// Interest-only schedule, non-adjustable
    InterestOnly,
}

impl DebtBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Revolving => "revolving",
            Self::Installment => "installment",
            Self::InterestOnly => "interest_only",
        }
    }
}

impl std::str::FromStr for DebtBehavior {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "revolving" => Ok(Self::Revolving),
            "installment" => Ok(Self::Installment),
            "interest_only" | "interestonly" => Ok(Self::InterestOnly),
            _ => Err(format!("Unknown debt behavior: {}", s)),
        }
    }
}

impl std::fmt::Display for DebtBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Debt repayment ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebtStrategy {
    /// Highest interest rate first
    Avalanche,
    /// Smallest balance first
    Snowball,
}

impl DebtStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avalanche => "avalanche",
            Self::Snowball => "snowball",
        }
    }
}

impl std::str::FromStr for DebtStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "avalanche" => Ok(Self::Avalanche),
            "snowball" => Ok(Self::Snowball),
            _ => Err(format!("Unknown debt strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for DebtStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A spending category (housing, food, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingCategory {
    pub id: i64,
    pub name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// A spending floor or [min,max] band attached to a category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: i64,
    pub category_id: i64,
    pub minimum_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_amount: Option<f64>,
    pub is_flexible: bool,
    pub priority: i64,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Constraint {
    /// Interpolated allocation within the band at the given level (0=min, 1=max).
    /// Non-flexible constraints and bands without a maximum always yield the minimum.
    pub fn amount_at_level(&self, level: f64) -> f64 {
        if !self.is_flexible {
            return self.minimum_amount;
        }
        match self.maximum_amount {
            Some(max) if max > self.minimum_amount => {
                self.minimum_amount + level.clamp(0.0, 1.0) * (max - self.minimum_amount)
            }
            _ => self.minimum_amount,
        }
    }

    /// Remaining headroom between the current level allocation and the maximum
    pub fn headroom_at_level(&self, level: f64) -> f64 {
        match self.maximum_amount {
            Some(max) => (max - self.amount_at_level(level)).max(0.0),
            None => 0.0,
        }
    }
}

/// A planning month and the income to allocate in it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Month {
    /// `YYYY-MM`
    pub id: String,
    pub monthly_income: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Month {
    /// Validate a `YYYY-MM` month identifier
    pub fn is_valid_id(id: &str) -> bool {
        NaiveDate::parse_from_str(&format!("{}-01", id), "%Y-%m-%d").is_ok() && id.len() == 7
    }
}

/// Scoring criteria. "Impact" exists in the data model but is disabled:
/// it always carries weight 0 and is excluded from every scoring formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Feasibility,
    Importance,
    Urgency,
    Impact,
}

impl Criterion {
    /// The criteria that participate in scoring
    pub const ENABLED: [Criterion; 3] = [Self::Feasibility, Self::Importance, Self::Urgency];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feasibility => "feasibility",
            Self::Importance => "importance",
            Self::Urgency => "urgency",
            Self::Impact => "impact",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Impact)
    }
}

impl std::str::FromStr for Criterion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feasibility" => Ok(Self::Feasibility),
            "importance" => Ok(Self::Importance),
            "urgency" => Ok(Self::Urgency),
            "impact" => Ok(Self::Impact),
            _ => Err(format!("Unknown criterion: {}", s)),
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weights over the scoring criteria. Enabled weights sum to 1; the disabled
/// impact criterion is pinned to 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriteriaWeights {
    pub feasibility: f64,
    pub importance: f64,
    pub urgency: f64,
    #[serde(default)]
    pub impact: f64,
}

impl CriteriaWeights {
    /// Even split across enabled criteria
    pub fn even_split() -> Self {
        let share = 1.0 / Criterion::ENABLED.len() as f64;
        Self {
            feasibility: share,
            importance: share,
            urgency: share,
            impact: 0.0,
        }
    }

    /// Convert user ratings on a 1-10 scale into normalized weights
    pub fn from_ratings(ratings: &CriteriaRatings) -> crate::error::Result<Self> {
        for (name, value) in [
            ("feasibility", ratings.feasibility),
            ("importance", ratings.importance),
            ("urgency", ratings.urgency),
        ] {
            if !(1.0..=10.0).contains(&value) {
                return Err(crate::error::Error::InvalidData(format!(
                    "Criteria rating '{}' must be between 1 and 10, got {}",
                    name, value
                )));
            }
        }
        let total = ratings.feasibility + ratings.importance + ratings.urgency;
        Ok(Self {
            feasibility: ratings.feasibility / total,
            importance: ratings.importance / total,
            urgency: ratings.urgency / total,
            impact: 0.0,
        })
    }

    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Feasibility => self.feasibility,
            Criterion::Importance => self.importance,
            Criterion::Urgency => self.urgency,
            Criterion::Impact => self.impact,
        }
    }

    fn set(&mut self, criterion: Criterion, value: f64) {
        match criterion {
            Criterion::Feasibility => self.feasibility = value,
            Criterion::Importance => self.importance = value,
            Criterion::Urgency => self.urgency = value,
            Criterion::Impact => self.impact = value,
        }
    }

    /// Sum over enabled criteria
    pub fn sum(&self) -> f64 {
        Criterion::ENABLED.iter().map(|c| self.get(*c)).sum()
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= 1e-6
    }

    /// Set one enabled criterion to `new_value` and redistribute the remainder
    /// across the other enabled criteria proportionally to their current
    /// weights (evenly when they are all zero), preserving sum = 1.
    ///
    /// Changing the disabled impact criterion is a no-op: it stays at 0.
    pub fn rebalance(&self, changed: Criterion, new_value: f64) -> CriteriaWeights {
        if !changed.is_enabled() {
            return *self;
        }

        let new_value = new_value.clamp(0.0, 1.0);
        let others: Vec<Criterion> = Criterion::ENABLED
            .iter()
            .copied()
            .filter(|c| *c != changed)
            .collect();

        let mut result = *self;
        result.set(changed, new_value);
        result.impact = 0.0;

        let remainder = 1.0 - new_value;
        let old_other_sum: f64 = others.iter().map(|c| self.get(*c)).sum();

        if old_other_sum > f64::EPSILON {
            for c in &others {
                result.set(*c, remainder * self.get(*c) / old_other_sum);
            }
        } else {
            let share = remainder / others.len() as f64;
            for c in &others {
                result.set(*c, share);
            }
        }

        result
    }
}

impl Default for CriteriaWeights {
    fn default() -> Self {
        Self::even_split()
    }
}

/// User ratings for criteria importance on a 1-10 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CriteriaRatings {
    pub feasibility: f64,
    pub importance: f64,
    pub urgency: f64,
}

/// One goal's applied priority inside a finalized month state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedGoalPriority {
    pub goal_id: i64,
    pub priority: f64,
    /// How the priority was produced ("ahp", "manual")
    pub method: String,
}

/// A goal funding line in a finalized month state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalFunding {
    pub goal_id: i64,
    pub suggested_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_adjusted_amount: Option<f64>,
}

impl GoalFunding {
    pub fn effective_amount(&self) -> f64 {
        self.user_adjusted_amount.unwrap_or(self.suggested_amount)
    }
}

/// A debt payment line in a finalized month state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtPayment {
    pub debt_id: i64,
    pub minimum_payment: f64,
    pub suggested_payment: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_adjusted_payment: Option<f64>,
}

impl DebtPayment {
    pub fn effective_amount(&self) -> f64 {
        self.user_adjusted_payment.unwrap_or(self.suggested_payment)
    }
}

/// One immutable, append-only snapshot of a month's committed plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthStateVersion {
    pub id: i64,
    pub month_id: String,
    pub version: i64,
    pub goal_priorities: Vec<AppliedGoalPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_strategy: Option<DebtStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal_allocation_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_allocation_pct: Option<f64>,
    /// category_id -> committed amount
    pub category_allocations: BTreeMap<i64, f64>,
    pub goal_fundings: Vec<GoalFunding>,
    pub debt_payments: Vec<DebtPayment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// SHA-256 over the canonical payload, for audit
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl MonthStateVersion {
    /// Total amount committed across categories, goals, and debts
    pub fn total_committed(&self) -> f64 {
        let categories: f64 = self.category_allocations.values().sum();
        let goals: f64 = self.goal_fundings.iter().map(|g| g.effective_amount()).sum();
        let debts: f64 = self.debt_payments.iter().map(|d| d.effective_amount()).sum();
        categories + goals + debts
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_email: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
}
