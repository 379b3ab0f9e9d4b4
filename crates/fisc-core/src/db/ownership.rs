//! Ownership-chain resolution
//!
//! Every node below a budget reaches exactly one budget through its parent
//! chain, and that budget has exactly one owning user. A user may read or
//! mutate a node iff they own the budget at the root of the node's chain.
//!
//! Each resolution is a single SQL statement that joins the whole chain to
//! the root, the relational-include equivalent of walking
//! Transaction -> Vendor -> Project -> Department -> Budget one query at a
//! time. INNER JOINs mean an orphaned parent reference produces no row at
//! all, so a broken chain resolves to NotFound, never to Allow.

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::{Error, Result};
use crate::models::NodeKind;

/// The resolved root of a node's ownership chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainRoot {
    pub budget_id: i64,
    pub user_id: i64,
}

impl Database {
    /// Resolve the root budget and owning user for a node, in one read.
    ///
    /// Returns `None` when the node does not exist or its chain is broken.
    pub fn budget_owner(&self, kind: NodeKind, id: i64) -> Result<Option<ChainRoot>> {
        let conn = self.conn()?;

        let sql = match kind {
            NodeKind::Budget => "SELECT b.id, b.user_id FROM budgets b WHERE b.id = ?",
            NodeKind::Department => {
                "SELECT b.id, b.user_id FROM departments d \
                 JOIN budgets b ON b.id = d.budget_id \
                 WHERE d.id = ?"
            }
            NodeKind::Project => {
                "SELECT b.id, b.user_id FROM projects p \
                 JOIN departments d ON d.id = p.department_id \
                 JOIN budgets b ON b.id = d.budget_id \
                 WHERE p.id = ?"
            }
            NodeKind::Vendor => {
                "SELECT b.id, b.user_id FROM vendors v \
                 JOIN projects p ON p.id = v.project_id \
                 JOIN departments d ON d.id = p.department_id \
                 JOIN budgets b ON b.id = d.budget_id \
                 WHERE v.id = ?"
            }
            NodeKind::Transaction => {
                "SELECT b.id, b.user_id FROM transactions t \
                 JOIN vendors v ON v.id = t.vendor_id \
                 JOIN projects p ON p.id = v.project_id \
                 JOIN departments d ON d.id = p.department_id \
                 JOIN budgets b ON b.id = d.budget_id \
                 WHERE t.id = ?"
            }
        };

        conn.query_row(sql, params![id], |row| {
            Ok(ChainRoot {
                budget_id: row.get(0)?,
                user_id: row.get(1)?,
            })
        })
        .optional()
        .map_err(|e| e.into())
    }

    /// Authorize `user_id` against a node.
    ///
    /// `Ok(())` only on an exact owner match; `Error::NotFound` for a missing
    /// node or broken chain; `Error::Forbidden` for anyone else's node.
    pub fn authorize(&self, user_id: i64, kind: NodeKind, id: i64) -> Result<ChainRoot> {
        let root = self
            .budget_owner(kind, id)?
            .ok_or_else(|| Error::NotFound(format!("{} {} not found", kind, id)))?;

        if root.user_id != user_id {
            return Err(Error::Forbidden(format!(
                "Not authorized to access this {}",
                kind
            )));
        }

        Ok(root)
    }
}
