//! Bulk-import reconciliation: one atomic transaction per uploaded file

use std::time::{Duration, Instant};

use rusqlite::params;
use tracing::{debug, info};

use super::hierarchy::level_find_or_create;
use super::Database;
use crate::error::{Error, Result};
use crate::import::RawRow;

/// Default execution budget for one import transaction.
pub const IMPORT_TIME_BUDGET: Duration = Duration::from_secs(30);

impl Database {
    /// Reconcile parsed rows into the hierarchy and append their transactions.
    ///
    /// Runs as a single SQLite transaction: any validation failure,
    /// persistence failure, or deadline overrun rolls back every row.
    /// Rows are processed strictly in input order, so a later row sees the
    /// nodes an earlier row created.
    ///
    /// Budgets/departments/projects/vendors are find-or-create on their
    /// natural keys; transactions are always appended, so re-importing the
    /// same file doubles the transaction count by design.
    pub fn import_rows(
        &self,
        rows: &[RawRow],
        user_id: i64,
        time_budget: Duration,
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let deadline = Instant::now() + time_budget;

        let tx = conn.transaction()?;

        for (idx, row) in rows.iter().enumerate() {
            if Instant::now() >= deadline {
                // Dropping `tx` without commit rolls everything back.
                return Err(Error::Import(format!(
                    "Import exceeded the {}s time budget at row {}; no rows were committed",
                    time_budget.as_secs(),
                    idx + 1
                )));
            }

            let budget_id = level_find_or_create(&tx, "budgets", "user_id", &row.budget_name, user_id)?;
            let department_id =
                level_find_or_create(&tx, "departments", "budget_id", &row.department_name, budget_id)?;
            let project_id =
                level_find_or_create(&tx, "projects", "department_id", &row.project_name, department_id)?;
            let vendor_id =
                level_find_or_create(&tx, "vendors", "project_id", &row.vendor_name, project_id)?;

            tx.execute(
                "INSERT INTO transactions (amount, description, vendor_id) VALUES (?, ?, ?)",
                params![row.amount, row.description, vendor_id],
            )?;

            debug!(row = idx + 1, vendor_id, "Imported row");
        }

        tx.commit()?;

        info!(rows = rows.len(), user_id, "Bulk import committed");
        Ok(rows.len())
    }
}
