//! Database access layer with connection pooling and migrations
//!
//! Organized by domain:
//! - `entities` - Months, goals, debts, categories, and constraints
//! - `state` - Append-only month-state versions
//! - `audit` - Audit log operations

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod audit;
mod entities;
mod state;

pub use entities::{NewDebt, NewGoal};
pub use state::NewMonthState;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "DIVVY_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"divvy-salt-v1-fi";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
    /// Whether the pool was opened with a SQLCipher key
    encrypted: bool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `DIVVY_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `DIVVY_DB_KEY` is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `DIVVY_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Use with_init to set the key on every new connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
            encrypted: passphrase.is_some(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/divvy_test_{}.db", id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Whether this pool was opened with an encryption key
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Seed the default household spending categories. Idempotent.
    pub fn seed_default_categories(&self) -> Result<()> {
        const DEFAULTS: [&str; 7] = [
            "Housing",
            "Food",
            "Transport",
            "Utilities",
            "Healthcare",
            "Education",
            "Entertainment",
        ];
        for name in DEFAULTS {
            self.upsert_category(name)?;
        }
        Ok(())
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- Performance pragmas for local storage (SSD/M.2 recommended)
            -- WAL mode: better concurrency, readers don't block writers
            -- Note: creates -wal and -shm sidecar files alongside the database
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Store temp tables in memory (faster for complex queries)
            PRAGMA temp_store = MEMORY;

            -- Planning months (one row per month being budgeted)
            CREATE TABLE IF NOT EXISTS months (
                id TEXT PRIMARY KEY,                    -- YYYY-MM
                monthly_income REAL NOT NULL,
                note TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Spending categories (housing, food, ...)
            CREATE TABLE IF NOT EXISTS spending_categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Savings goals
            CREATE TABLE IF NOT EXISTS goals (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                target_amount REAL NOT NULL,
                current_amount REAL NOT NULL DEFAULT 0,
                target_date DATE NOT NULL,
                priority TEXT NOT NULL DEFAULT 'medium',   -- critical, high, medium, low
                status TEXT NOT NULL DEFAULT 'active',     -- active, completed, paused, cancelled
                category TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_goals_status ON goals(status);

            -- Outstanding debts
            CREATE TABLE IF NOT EXISTS debts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                current_balance REAL NOT NULL,
                interest_rate REAL NOT NULL,               -- annual, decimal (0.18 = 18%)
                minimum_payment REAL NOT NULL,
                behavior TEXT NOT NULL DEFAULT 'revolving', -- revolving, installment, interest_only
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Spending floors and bands, one per category
            CREATE TABLE IF NOT EXISTS category_constraints (
                id INTEGER PRIMARY KEY,
                category_id INTEGER NOT NULL REFERENCES spending_categories(id) ON DELETE CASCADE,
                minimum_amount REAL NOT NULL,
                maximum_amount REAL,
                is_flexible BOOLEAN NOT NULL DEFAULT 0,
                priority INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(category_id)
            );

            -- Committed month plans, append-only
            CREATE TABLE IF NOT EXISTS month_state_versions (
                id INTEGER PRIMARY KEY,
                month_id TEXT NOT NULL REFERENCES months(id),
                version INTEGER NOT NULL,
                goal_priorities TEXT NOT NULL,             -- JSON [{goal_id, priority, method}]
                debt_strategy TEXT,                        -- avalanche, snowball
                goal_allocation_pct REAL,
                debt_allocation_pct REAL,
                category_allocations TEXT NOT NULL,        -- JSON {category_id: amount}
                goal_fundings TEXT NOT NULL,               -- JSON [{goal_id, suggested_amount, user_adjusted_amount}]
                debt_payments TEXT NOT NULL,               -- JSON [{debt_id, minimum_payment, suggested_payment, user_adjusted_payment}]
                notes TEXT,
                checksum TEXT NOT NULL,                    -- SHA-256 over the canonical payload
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(month_id, version)
            );

            CREATE INDEX IF NOT EXISTS idx_state_versions_month ON month_state_versions(month_id);

            -- Audit log (tracks apply/finalize operations)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                user_email TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                details TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_user ON audit_log(user_email);
            CREATE INDEX IF NOT EXISTS idx_audit_log_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log(action);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
