//! Append-only month-state versions
//!
//! A version row is the durable output of finalize. Rows are immutable once
//! written; version numbers per month are sequential starting at 1, enforced
//! by `UNIQUE(month_id, version)`. A concurrent append for the same month
//! loses the race and surfaces as a version conflict.

use std::collections::BTreeMap;

use rusqlite::params;
use sha2::{Digest, Sha256};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AppliedGoalPriority, DebtPayment, DebtStrategy, GoalFunding, MonthStateVersion};

/// Fields for appending a month-state version. The version number and
/// checksum are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMonthState {
    pub month_id: String,
    pub goal_priorities: Vec<AppliedGoalPriority>,
    pub debt_strategy: Option<DebtStrategy>,
    pub goal_allocation_pct: Option<f64>,
    pub debt_allocation_pct: Option<f64>,
    pub category_allocations: BTreeMap<i64, f64>,
    pub goal_fundings: Vec<GoalFunding>,
    pub debt_payments: Vec<DebtPayment>,
    pub notes: Option<String>,
}

impl Database {
    /// Append a new month-state version.
    ///
    /// Runs in a transaction: the next version number is computed from the
    /// current maximum and the insert relies on `UNIQUE(month_id, version)`
    /// to reject a concurrent writer, which surfaces as `Error::Conflict`.
    pub fn append_month_state(&self, mut new_state: NewMonthState) -> Result<MonthStateVersion> {
        if self.get_month(&new_state.month_id)?.is_none() {
            return Err(Error::NotFound(format!("Month {}", new_state.month_id)));
        }

        // Canonical line order so the stored JSON and checksum are stable
        new_state.goal_priorities.sort_by_key(|p| p.goal_id);
        new_state.goal_fundings.sort_by_key(|f| f.goal_id);
        new_state.debt_payments.sort_by_key(|p| p.debt_id);

        let priorities_json = serde_json::to_string(&new_state.goal_priorities)?;
        let categories_json = serde_json::to_string(&new_state.category_allocations)?;
        let fundings_json = serde_json::to_string(&new_state.goal_fundings)?;
        let payments_json = serde_json::to_string(&new_state.debt_payments)?;

        let conn = self.conn()?;
        conn.execute("BEGIN TRANSACTION", [])?;

        let result = (|| {
            let current: i64 = conn.query_row(
                "SELECT COALESCE(MAX(version), 0) FROM month_state_versions WHERE month_id = ?",
                params![new_state.month_id],
                |row| row.get(0),
            )?;
            let next = current + 1;

            let checksum = compute_checksum(&new_state, next)?;

            conn.execute(
                r#"
                INSERT INTO month_state_versions
                    (month_id, version, goal_priorities, debt_strategy,
                     goal_allocation_pct, debt_allocation_pct,
                     category_allocations, goal_fundings, debt_payments, notes, checksum)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                params![
                    new_state.month_id,
                    next,
                    priorities_json,
                    new_state.debt_strategy.map(|s| s.as_str()),
                    new_state.goal_allocation_pct,
                    new_state.debt_allocation_pct,
                    categories_json,
                    fundings_json,
                    payments_json,
                    new_state.notes,
                    checksum,
                ],
            )?;

            Ok(next)
        })();

        match result {
            Ok(version) => {
                conn.execute("COMMIT", [])?;
                info!(month_id = %new_state.month_id, version, "Month state committed");
                drop(conn);
                self.get_month_state(&new_state.month_id, version)?
                    .ok_or_else(|| {
                        Error::NotFound(format!(
                            "Month state {} v{}",
                            new_state.month_id, version
                        ))
                    })
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", []);
                Err(conflict_on_unique(e, &new_state.month_id))
            }
        }
    }

    /// Get one month-state version
    pub fn get_month_state(&self, month_id: &str, version: i64) -> Result<Option<MonthStateVersion>> {
        let states = self.query_month_states(
            "SELECT id, month_id, version, goal_priorities, debt_strategy, goal_allocation_pct, \
             debt_allocation_pct, category_allocations, goal_fundings, debt_payments, notes, \
             checksum, created_at \
             FROM month_state_versions WHERE month_id = ? AND version = ?",
            params![month_id, version],
        )?;
        Ok(states.into_iter().next())
    }

    /// Get the latest committed version for a month, if any
    pub fn latest_month_state(&self, month_id: &str) -> Result<Option<MonthStateVersion>> {
        let states = self.query_month_states(
            "SELECT id, month_id, version, goal_priorities, debt_strategy, goal_allocation_pct, \
             debt_allocation_pct, category_allocations, goal_fundings, debt_payments, notes, \
             checksum, created_at \
             FROM month_state_versions WHERE month_id = ? ORDER BY version DESC LIMIT 1",
            params![month_id],
        )?;
        Ok(states.into_iter().next())
    }

    /// List all committed versions for a month, newest first
    pub fn list_month_states(&self, month_id: &str) -> Result<Vec<MonthStateVersion>> {
        self.query_month_states(
            "SELECT id, month_id, version, goal_priorities, debt_strategy, goal_allocation_pct, \
             debt_allocation_pct, category_allocations, goal_fundings, debt_payments, notes, \
             checksum, created_at \
             FROM month_state_versions WHERE month_id = ? ORDER BY version DESC",
            params![month_id],
        )
    }

    fn query_month_states(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<MonthStateVersion>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;

        let raw_rows = stmt
            .query_map(params, |row| {
                Ok(RawStateRow {
                    id: row.get(0)?,
                    month_id: row.get(1)?,
                    version: row.get(2)?,
                    goal_priorities: row.get(3)?,
                    debt_strategy: row.get(4)?,
                    goal_allocation_pct: row.get(5)?,
                    debt_allocation_pct: row.get(6)?,
                    category_allocations: row.get(7)?,
                    goal_fundings: row.get(8)?,
                    debt_payments: row.get(9)?,
                    notes: row.get(10)?,
                    checksum: row.get(11)?,
                    created_at: row.get(12)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw_rows.into_iter().map(raw_to_state).collect()
    }
}

struct RawStateRow {
    id: i64,
    month_id: String,
    version: i64,
    goal_priorities: String,
    debt_strategy: Option<String>,
    goal_allocation_pct: Option<f64>,
    debt_allocation_pct: Option<f64>,
    category_allocations: String,
    goal_fundings: String,
    debt_payments: String,
    notes: Option<String>,
    checksum: String,
    created_at: String,
}

fn raw_to_state(raw: RawStateRow) -> Result<MonthStateVersion> {
    let debt_strategy = match raw.debt_strategy {
        Some(s) => Some(
            s.parse::<DebtStrategy>()
                .map_err(Error::InvalidData)?,
        ),
        None => None,
    };

    Ok(MonthStateVersion {
        id: raw.id,
        month_id: raw.month_id,
        version: raw.version,
        goal_priorities: serde_json::from_str(&raw.goal_priorities)?,
        debt_strategy,
        goal_allocation_pct: raw.goal_allocation_pct,
        debt_allocation_pct: raw.debt_allocation_pct,
        category_allocations: serde_json::from_str(&raw.category_allocations)?,
        goal_fundings: serde_json::from_str(&raw.goal_fundings)?,
        debt_payments: serde_json::from_str(&raw.debt_payments)?,
        notes: raw.notes,
        checksum: raw.checksum,
        created_at: parse_datetime(&raw.created_at),
    })
}

/// SHA-256 over the canonical JSON payload of a version. serde_json keeps
/// map keys sorted and the line vectors are pre-sorted, so equal content
/// always hashes the same.
fn compute_checksum(new_state: &NewMonthState, version: i64) -> Result<String> {
    let payload = serde_json::json!({
        "month_id": new_state.month_id,
        "version": version,
        "goal_priorities": new_state.goal_priorities,
        "debt_strategy": new_state.debt_strategy.map(|s| s.as_str()),
        "goal_allocation_pct": new_state.goal_allocation_pct,
        "debt_allocation_pct": new_state.debt_allocation_pct,
        "category_allocations": new_state.category_allocations,
        "goal_fundings": new_state.goal_fundings,
        "debt_payments": new_state.debt_payments,
        "notes": new_state.notes,
    });
    let bytes = serde_json::to_vec(&payload)?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Map a UNIQUE(month_id, version) violation to a version conflict
fn conflict_on_unique(e: Error, month_id: &str) -> Error {
    if let Error::Database(rusqlite::Error::SqliteFailure(f, _)) = &e {
        if f.code == rusqlite::ErrorCode::ConstraintViolation {
            return Error::Conflict(format!(
                "A newer plan version for month {} was committed concurrently; \
                 re-preview against the latest state and retry",
                month_id
            ));
        }
    }
    e
}
