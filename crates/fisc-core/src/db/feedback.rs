//! Budget feedback operations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::Feedback;

fn row_to_feedback(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feedback> {
    let created_at: String = row.get(4)?;
    Ok(Feedback {
        id: row.get(0)?,
        message: row.get(1)?,
        user_id: row.get(2)?,
        budget_id: row.get(3)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Attach a feedback comment to a budget
    pub fn create_feedback(
        &self,
        budget_id: i64,
        message: &str,
        user_id: Option<i64>,
    ) -> Result<Feedback> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feedback (message, user_id, budget_id) VALUES (?, ?, ?)",
            params![message, user_id, budget_id],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, message, user_id, budget_id, created_at FROM feedback WHERE id = ?",
            params![id],
            row_to_feedback,
        )
        .map_err(|e| e.into())
    }

    /// List feedback for one budget, newest first
    pub fn list_feedback(&self, budget_id: i64) -> Result<Vec<Feedback>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, message, user_id, budget_id, created_at FROM feedback \
             WHERE budget_id = ? ORDER BY created_at DESC, id DESC",
        )?;

        let feedback = stmt
            .query_map(params![budget_id], row_to_feedback)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feedback)
    }
}
