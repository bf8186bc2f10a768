//! Month, goal, debt, category, and constraint operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    Constraint, Debt, DebtBehavior, Goal, GoalPriority, GoalStatus, Month, SpendingCategory,
};

/// Fields for creating a goal
#[derive(Debug, Clone)]
pub struct NewGoal {
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub target_date: NaiveDate,
    pub priority: GoalPriority,
    pub category: Option<String>,
}

/// Fields for creating a debt
#[derive(Debug, Clone)]
pub struct NewDebt {
    pub name: String,
    pub current_balance: f64,
    pub interest_rate: f64,
    pub minimum_payment: f64,
    pub behavior: DebtBehavior,
}

impl Database {
    /// Create or update a planning month
    pub fn upsert_month(&self, id: &str, monthly_income: f64, note: Option<&str>) -> Result<Month> {
        if !Month::is_valid_id(id) {
            return Err(Error::InvalidData(format!(
                "Month id must be YYYY-MM, got '{}'",
                id
            )));
        }
        if monthly_income < 0.0 {
            return Err(Error::InvalidData(format!(
                "Monthly income must be non-negative, got {}",
                monthly_income
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO months (id, monthly_income, note) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET monthly_income = excluded.monthly_income,
                                          note = excluded.note
            "#,
            params![id, monthly_income, note],
        )?;

        self.get_month(id)?
            .ok_or_else(|| Error::NotFound(format!("Month {}", id)))
    }

    /// Get a month by id
    pub fn get_month(&self, id: &str) -> Result<Option<Month>> {
        let conn = self.conn()?;
        let month = conn
            .query_row(
                "SELECT id, monthly_income, note, created_at FROM months WHERE id = ?",
                params![id],
                |row| {
                    let created_at_str: String = row.get(3)?;
                    Ok(Month {
                        id: row.get(0)?,
                        monthly_income: row.get(1)?,
                        note: row.get(2)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;
        Ok(month)
    }

    /// List all months, newest first
    pub fn list_months(&self) -> Result<Vec<Month>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, monthly_income, note, created_at FROM months ORDER BY id DESC")?;

        let months = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(3)?;
                Ok(Month {
                    id: row.get(0)?,
                    monthly_income: row.get(1)?,
                    note: row.get(2)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(months)
    }

    /// Create a goal
    pub fn create_goal(&self, goal: &NewGoal) -> Result<i64> {
        if goal.target_amount <= 0.0 {
            return Err(Error::InvalidData(format!(
                "Goal target amount must be positive, got {}",
                goal.target_amount
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO goals (name, target_amount, current_amount, target_date, priority, category)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                goal.name,
                goal.target_amount,
                goal.current_amount,
                goal.target_date.to_string(),
                goal.priority.as_str(),
                goal.category,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List all goals
    pub fn list_goals(&self) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, target_amount, current_amount, target_date, priority, status, category, created_at
            FROM goals ORDER BY id
            "#,
        )?;

        let goals = stmt
            .query_map([], Self::row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// List goals with active status
    pub fn list_active_goals(&self) -> Result<Vec<Goal>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, target_amount, current_amount, target_date, priority, status, category, created_at
            FROM goals WHERE status = 'active' ORDER BY id
            "#,
        )?;

        let goals = stmt
            .query_map([], Self::row_to_goal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(goals)
    }

    /// Get a goal by id
    pub fn get_goal(&self, id: i64) -> Result<Option<Goal>> {
        let conn = self.conn()?;
        let goal = conn
            .query_row(
                r#"
                SELECT id, name, target_amount, current_amount, target_date, priority, status, category, created_at
                FROM goals WHERE id = ?
                "#,
                params![id],
                Self::row_to_goal,
            )
            .optional()?;
        Ok(goal)
    }

    /// Update a goal's status
    pub fn update_goal_status(&self, id: i64, status: GoalStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE goals SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Goal {}", id)));
        }
        Ok(())
    }

    fn row_to_goal(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
        let target_date_str: String = row.get(4)?;
        let priority_str: String = row.get(5)?;
        let status_str: String = row.get(6)?;
        let created_at_str: String = row.get(8)?;

        Ok(Goal {
            id: row.get(0)?,
            name: row.get(1)?,
            target_amount: row.get(2)?,
            current_amount: row.get(3)?,
            target_date: NaiveDate::parse_from_str(&target_date_str, "%Y-%m-%d")
                .unwrap_or_default(),
            priority: priority_str.parse().unwrap_or(GoalPriority::Medium),
            status: status_str.parse().unwrap_or(GoalStatus::Active),
            category: row.get(7)?,
            created_at: parse_datetime(&created_at_str),
        })
    }

    /// Create a debt
    pub fn create_debt(&self, debt: &NewDebt) -> Result<i64> {
        if debt.current_balance < 0.0 || debt.interest_rate < 0.0 || debt.minimum_payment < 0.0 {
            return Err(Error::InvalidData(format!(
                "Debt '{}' must have non-negative balance, rate, and minimum payment",
                debt.name
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO debts (name, current_balance, interest_rate, minimum_payment, behavior)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                debt.name,
                debt.current_balance,
                debt.interest_rate,
                debt.minimum_payment,
                debt.behavior.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List all debts
    pub fn list_debts(&self) -> Result<Vec<Debt>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, name, current_balance, interest_rate, minimum_payment, behavior, created_at
            FROM debts ORDER BY id
            "#,
        )?;

        let debts = stmt
            .query_map([], |row| {
                let behavior_str: String = row.get(5)?;
                let created_at_str: String = row.get(6)?;
                Ok(Debt {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    current_balance: row.get(2)?,
                    interest_rate: row.get(3)?,
                    minimum_payment: row.get(4)?,
                    behavior: behavior_str.parse().unwrap_or(DebtBehavior::Revolving),
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(debts)
    }

    /// List debts that still carry a balance
    pub fn list_open_debts(&self) -> Result<Vec<Debt>> {
        Ok(self
            .list_debts()?
            .into_iter()
            .filter(|d| d.current_balance > 0.0)
            .collect())
    }

    /// Create or get a spending category by name
    pub fn upsert_category(&self, name: &str) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM spending_categories WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO spending_categories (name) VALUES (?)",
            params![name],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List all spending categories
    pub fn list_categories(&self) -> Result<Vec<SpendingCategory>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, created_at FROM spending_categories ORDER BY name")?;

        let categories = stmt
            .query_map([], |row| {
                let created_at_str: String = row.get(2)?;
                Ok(SpendingCategory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Get a category by name
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<SpendingCategory>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, created_at FROM spending_categories WHERE name = ?",
                params![name],
                |row| {
                    let created_at_str: String = row.get(2)?;
                    Ok(SpendingCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    /// Set (or replace) the spending constraint for a category
    pub fn set_constraint(
        &self,
        category_id: i64,
        minimum_amount: f64,
        maximum_amount: Option<f64>,
        is_flexible: bool,
        priority: i64,
    ) -> Result<i64> {
        if minimum_amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Constraint minimum must be non-negative, got {}",
                minimum_amount
            )));
        }
        if let Some(max) = maximum_amount {
            if max < minimum_amount {
                return Err(Error::InvalidData(format!(
                    "Constraint maximum {} is below minimum {}",
                    max, minimum_amount
                )));
            }
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO category_constraints (category_id, minimum_amount, maximum_amount, is_flexible, priority)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(category_id) DO UPDATE SET
                minimum_amount = excluded.minimum_amount,
                maximum_amount = excluded.maximum_amount,
                is_flexible = excluded.is_flexible,
                priority = excluded.priority
            "#,
            params![category_id, minimum_amount, maximum_amount, is_flexible, priority],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM category_constraints WHERE category_id = ?",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// List all constraints, ordered by priority then category
    pub fn list_constraints(&self) -> Result<Vec<Constraint>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, category_id, minimum_amount, maximum_amount, is_flexible, priority, created_at
            FROM category_constraints ORDER BY priority, category_id
            "#,
        )?;

        let constraints = stmt
            .query_map([], |row| {
                let is_flexible_int: i64 = row.get(4)?;
                let created_at_str: String = row.get(6)?;
                Ok(Constraint {
                    id: row.get(0)?,
                    category_id: row.get(1)?,
                    minimum_amount: row.get(2)?,
                    maximum_amount: row.get(3)?,
                    is_flexible: is_flexible_int != 0,
                    priority: row.get(5)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(constraints)
    }

    /// Sum of all constraint minimums (the committed floor for a month)
    pub fn total_constraint_minimums(&self) -> Result<f64> {
        let conn = self.conn()?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(minimum_amount), 0) FROM category_constraints",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }
}
