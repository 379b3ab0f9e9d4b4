//! Transaction CRUD

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Transaction;

/// Fields for a new transaction. `date` defaults to ingestion time.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub amount: f64,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub vendor_id: i64,
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let date: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    Ok(Transaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        description: row.get(2)?,
        date: parse_datetime(&date),
        vendor_id: row.get(4)?,
        created_at: parse_datetime(&created_at),
    })
}

const SELECT_TX: &str =
    "SELECT id, amount, description, date, vendor_id, created_at FROM transactions";

impl Database {
    /// Insert a transaction. The amount must already be validated as finite.
    pub fn create_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        if !tx.amount.is_finite() {
            return Err(Error::Validation("Amount must be a finite number".into()));
        }

        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO transactions (amount, description, date, vendor_id) \
             VALUES (?, ?, COALESCE(?, CURRENT_TIMESTAMP), ?)",
            params![
                tx.amount,
                tx.description,
                tx.date.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
                tx.vendor_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(&format!("{} WHERE id = ?", SELECT_TX), params![id], row_to_transaction)
            .map_err(|e| e.into())
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_TX),
            params![id],
            row_to_transaction,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// List transactions visible to a user, optionally under one vendor.
    /// Ownership is filtered at the chain root, never per row.
    pub fn list_transactions(&self, user_id: i64, vendor_id: Option<i64>) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let base = "SELECT t.id, t.amount, t.description, t.date, t.vendor_id, t.created_at \
                    FROM transactions t \
                    JOIN vendors v ON v.id = t.vendor_id \
                    JOIN projects p ON p.id = v.project_id \
                    JOIN departments d ON d.id = p.department_id \
                    JOIN budgets b ON b.id = d.budget_id \
                    WHERE b.user_id = ?";

        if let Some(vendor) = vendor_id {
            let mut stmt = conn.prepare(&format!("{} AND t.vendor_id = ? ORDER BY t.id", base))?;
            let transactions = stmt
                .query_map(params![user_id, vendor], row_to_transaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(transactions)
        } else {
            let mut stmt = conn.prepare(&format!("{} ORDER BY t.id", base))?;
            let transactions = stmt
                .query_map(params![user_id], row_to_transaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(transactions)
        }
    }

    pub fn update_transaction(
        &self,
        id: i64,
        amount: f64,
        description: Option<&str>,
    ) -> Result<Transaction> {
        if !amount.is_finite() {
            return Err(Error::Validation("Amount must be a finite number".into()));
        }

        let conn = self.conn()?;

        conn.execute(
            "UPDATE transactions SET amount = ?, description = ? WHERE id = ?",
            params![amount, description, id],
        )?;

        conn.query_row(
            &format!("{} WHERE id = ?", SELECT_TX),
            params![id],
            row_to_transaction,
        )
        .map_err(|e| e.into())
    }

    pub fn delete_transaction(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?;
        Ok(())
    }
}
