//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `users` - User accounts
//! - `budgets` - Budget CRUD, cascade deletion, dashboard totals
//! - `hierarchy` - Department/Project/Vendor CRUD and find-or-create
//! - `transactions` - Transaction CRUD
//! - `feedback` - Budget feedback
//! - `ownership` - Ownership-chain resolution and authorization
//! - `import` - Bulk-import reconciliation

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod budgets;
mod feedback;
mod hierarchy;
mod import;
mod ownership;
mod transactions;
mod users;

pub use import::IMPORT_TIME_BUDGET;
pub use ownership::ChainRoot;
pub use transactions::NewTransaction;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

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
    /// Keeps a throwaway database file alive; the file is deleted when the
    /// last clone drops.
    _temp: Option<std::sync::Arc<tempfile::TempPath>>,
}

impl Database {
    /// Create a new database connection pool and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            // Cascade deletes depend on this; SQLite defaults it off per connection.
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
            _temp: None,
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty in-memory database.
    pub fn in_memory() -> Result<Self> {
        let path = tempfile::Builder::new()
            .prefix("fisc-test-")
            .suffix(".db")
            .tempfile()?
            .into_temp_path();

        let mut db = Self::new(&path.to_string_lossy())?;
        db._temp = Some(std::sync::Arc::new(path));
        Ok(db)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Users (ownership roots)
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Budgets, each owned by exactly one user
            CREATE TABLE IF NOT EXISTS budgets (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                user_id INTEGER NOT NULL REFERENCES users(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(name, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_budgets_user ON budgets(user_id);

            -- Departments. (name, budget_id) is the natural key the bulk
            -- reconciler deduplicates on; the UNIQUE constraint also closes
            -- the race between concurrent same-tuple creates.
            CREATE TABLE IF NOT EXISTS departments (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                budget_id INTEGER NOT NULL REFERENCES budgets(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(name, budget_id)
            );

            CREATE INDEX IF NOT EXISTS idx_departments_budget ON departments(budget_id);

            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                department_id INTEGER NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(name, department_id)
            );

            CREATE INDEX IF NOT EXISTS idx_projects_department ON projects(department_id);

            CREATE TABLE IF NOT EXISTS vendors (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(name, project_id)
            );

            CREATE INDEX IF NOT EXISTS idx_vendors_project ON vendors(project_id);

            -- Transactions (leaf nodes, always appended, never deduplicated)
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                amount REAL NOT NULL,
                description TEXT,
                date DATETIME DEFAULT CURRENT_TIMESTAMP,
                vendor_id INTEGER NOT NULL REFERENCES vendors(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_vendor ON transactions(vendor_id);
            CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

            -- Budget feedback (side entity, outside the authorization chain)
            CREATE TABLE IF NOT EXISTS feedback (
                id INTEGER PRIMARY KEY,
                message TEXT NOT NULL,
                user_id INTEGER REFERENCES users(id),
                budget_id INTEGER NOT NULL REFERENCES budgets(id) ON DELETE CASCADE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_budget ON feedback(budget_id);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
