//! Budget operations: CRUD, hierarchy loading, and dashboard totals

use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    Budget, BudgetTotal, BudgetTree, Department, DepartmentTree, Project, ProjectTree, Vendor,
};

pub(crate) fn row_to_budget(row: &rusqlite::Row<'_>) -> rusqlite::Result<Budget> {
    let created_at: String = row.get(3)?;
    Ok(Budget {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Create a budget owned by `user_id`
    pub fn create_budget(&self, name: &str, user_id: i64) -> Result<Budget> {
        let conn = self.conn()?;

        let result = conn.execute(
            "INSERT INTO budgets (name, user_id) VALUES (?, ?)",
            params![name, user_id],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::Validation(format!(
                    "Budget '{}' already exists for this user",
                    name
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        drop(conn);
        self.get_budget(id)?
            .ok_or_else(|| Error::NotFound(format!("Budget {} not found after creation", id)))
    }

    /// Get a budget by id
    pub fn get_budget(&self, id: i64) -> Result<Option<Budget>> {
        let conn = self.conn()?;

        conn.query_row(
            "SELECT id, name, user_id, created_at FROM budgets WHERE id = ?",
            params![id],
            row_to_budget,
        )
        .optional()
        .map_err(|e| e.into())
    }

    /// List budgets owned by a user
    pub fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, user_id, created_at FROM budgets WHERE user_id = ? ORDER BY id",
        )?;
        let budgets = stmt
            .query_map(params![user_id], row_to_budget)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(budgets)
    }

    /// Rename a budget
    pub fn update_budget(&self, id: i64, name: &str) -> Result<Budget> {
        let conn = self.conn()?;

        let result = conn.execute(
            "UPDATE budgets SET name = ? WHERE id = ?",
            params![name, id],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(Error::Validation(format!(
                    "Budget '{}' already exists for this user",
                    name
                )));
            }
            Err(e) => return Err(e.into()),
        }
        drop(conn);

        self.get_budget(id)?
            .ok_or_else(|| Error::NotFound(format!("Budget {} not found", id)))
    }

    /// Delete a budget and its entire subtree.
    ///
    /// The ON DELETE CASCADE foreign keys remove departments, projects,
    /// vendors, transactions, and feedback in the same statement, so the
    /// deletion is atomic.
    pub fn delete_budget(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM budgets WHERE id = ?", params![id])?;
        Ok(())
    }

    /// Load a budget with its full department -> project -> vendor tree
    pub fn get_budget_tree(&self, id: i64) -> Result<Option<BudgetTree>> {
        let budget = match self.get_budget(id)? {
            Some(b) => b,
            None => return Ok(None),
        };

        let conn = self.conn()?;

        let mut dept_stmt = conn.prepare(
            "SELECT id, name, budget_id, created_at FROM departments WHERE budget_id = ? ORDER BY id",
        )?;
        let departments: Vec<Department> = dept_stmt
            .query_map(params![id], |row| {
                let created_at: String = row.get(3)?;
                Ok(Department {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    budget_id: row.get(2)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut proj_stmt = conn.prepare(
            "SELECT id, name, department_id, created_at FROM projects WHERE department_id = ? ORDER BY id",
        )?;
        let mut vendor_stmt = conn.prepare(
            "SELECT id, name, project_id, created_at FROM vendors WHERE project_id = ? ORDER BY id",
        )?;

        let mut dept_trees = Vec::with_capacity(departments.len());
        for department in departments {
            let projects: Vec<Project> = proj_stmt
                .query_map(params![department.id], |row| {
                    let created_at: String = row.get(3)?;
                    Ok(Project {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        department_id: row.get(2)?,
                        created_at: parse_datetime(&created_at),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut proj_trees = Vec::with_capacity(projects.len());
            for project in projects {
                let vendors: Vec<Vendor> = vendor_stmt
                    .query_map(params![project.id], |row| {
                        let created_at: String = row.get(3)?;
                        Ok(Vendor {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            project_id: row.get(2)?,
                            created_at: parse_datetime(&created_at),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;

                proj_trees.push(ProjectTree { project, vendors });
            }

            dept_trees.push(DepartmentTree {
                department,
                projects: proj_trees,
            });
        }

        Ok(Some(BudgetTree {
            budget,
            departments: dept_trees,
        }))
    }

    /// Per-budget totals over all descendant transactions.
    ///
    /// This is a full scan of the transaction tree, O(total transactions).
    /// It runs after every mutation to feed the dashboard push, which is
    /// fine at small scale but a known limit for large datasets.
    pub fn budget_totals(&self) -> Result<Vec<BudgetTotal>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT b.id, b.name, b.user_id,
                   COALESCE(SUM(t.amount), 0.0),
                   COUNT(t.id)
            FROM budgets b
            LEFT JOIN departments d ON d.budget_id = b.id
            LEFT JOIN projects p ON p.department_id = d.id
            LEFT JOIN vendors v ON v.project_id = p.id
            LEFT JOIN transactions t ON t.vendor_id = v.id
            GROUP BY b.id
            ORDER BY b.id
            "#,
        )?;

        let totals = stmt
            .query_map([], |row| {
                Ok(BudgetTotal {
                    budget_id: row.get(0)?,
                    name: row.get(1)?,
                    user_id: row.get(2)?,
                    total_amount: row.get(3)?,
                    transaction_count: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(totals)
    }
}
