//! Department, project, and vendor operations
//!
//! The three middle hierarchy levels share one shape: a name, a parent id,
//! and a (name, parent) natural key. One generic row-level helper serves all
//! three instead of three hand-copied CRUD blocks.

use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Department, Project, Vendor};

/// Table metadata for one hierarchy level.
#[derive(Clone, Copy)]
struct Level {
    table: &'static str,
    parent_col: &'static str,
}

const DEPARTMENTS: Level = Level {
    table: "departments",
    parent_col: "budget_id",
};
const PROJECTS: Level = Level {
    table: "projects",
    parent_col: "department_id",
};
const VENDORS: Level = Level {
    table: "vendors",
    parent_col: "project_id",
};

/// A raw hierarchy row before it is wrapped in its typed model.
struct LevelRow {
    id: i64,
    name: String,
    parent_id: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

fn row_to_level(row: &rusqlite::Row<'_>) -> rusqlite::Result<LevelRow> {
    let created_at: String = row.get(3)?;
    Ok(LevelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        created_at: parse_datetime(&created_at),
    })
}

fn level_get(conn: &Connection, level: Level, id: i64) -> Result<Option<LevelRow>> {
    conn.query_row(
        &format!(
            "SELECT id, name, {}, created_at FROM {} WHERE id = ?",
            level.parent_col, level.table
        ),
        params![id],
        row_to_level,
    )
    .optional()
    .map_err(|e| e.into())
}

fn level_insert(conn: &Connection, level: Level, name: &str, parent_id: i64) -> Result<i64> {
    let result = conn.execute(
        &format!(
            "INSERT INTO {} (name, {}) VALUES (?, ?)",
            level.table, level.parent_col
        ),
        params![name, parent_id],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::Validation(format!(
                "A {} named '{}' already exists under this parent",
                level.table.trim_end_matches('s'),
                name
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Find-or-create on the (name, parent) natural key.
///
/// INSERT OR IGNORE then re-select: the UNIQUE constraint makes this safe
/// against a concurrent create of the same tuple, and re-running it resolves
/// to the existing row instead of a duplicate.
pub(crate) fn level_find_or_create(
    conn: &Connection,
    table: &'static str,
    parent_col: &'static str,
    name: &str,
    parent_id: i64,
) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (name, {}) VALUES (?, ?)",
            table, parent_col
        ),
        params![name, parent_id],
    )?;

    let id: i64 = conn.query_row(
        &format!(
            "SELECT id FROM {} WHERE name = ? AND {} = ?",
            table, parent_col
        ),
        params![name, parent_id],
        |row| row.get(0),
    )?;

    Ok(id)
}

fn level_update(conn: &Connection, level: Level, id: i64, name: &str) -> Result<()> {
    let result = conn.execute(
        &format!("UPDATE {} SET name = ? WHERE id = ?", level.table),
        params![name, id],
    );

    match result {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(Error::Validation(format!(
                "A {} named '{}' already exists under this parent",
                level.table.trim_end_matches('s'),
                name
            )))
        }
        Err(e) => Err(e.into()),
    }
}

fn level_delete(conn: &Connection, level: Level, id: i64) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE id = ?", level.table),
        params![id],
    )?;
    Ok(())
}

fn level_list(
    conn: &Connection,
    level: Level,
    user_id: i64,
    parent_id: Option<i64>,
) -> Result<Vec<LevelRow>> {
    // Owner scoping is pushed to the chain root rather than filtering
    // row-by-row after the fact.
    let root_join = match level.table {
        "departments" => "JOIN budgets b ON b.id = n.budget_id",
        "projects" => {
            "JOIN departments d ON d.id = n.department_id \
             JOIN budgets b ON b.id = d.budget_id"
        }
        "vendors" => {
            "JOIN projects p ON p.id = n.project_id \
             JOIN departments d ON d.id = p.department_id \
             JOIN budgets b ON b.id = d.budget_id"
        }
        _ => unreachable!("unknown hierarchy table"),
    };

    let mut sql = format!(
        "SELECT n.id, n.name, n.{}, n.created_at FROM {} n {} WHERE b.user_id = ?",
        level.parent_col, level.table, root_join
    );

    if let Some(parent) = parent_id {
        sql.push_str(&format!(" AND n.{} = ? ORDER BY n.id", level.parent_col));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id, parent], row_to_level)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    } else {
        sql.push_str(" ORDER BY n.id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id], row_to_level)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Database {
    // ----- Departments -----

    pub fn create_department(&self, name: &str, budget_id: i64) -> Result<Department> {
        let conn = self.conn()?;
        let id = level_insert(&conn, DEPARTMENTS, name, budget_id)?;
        let row = level_get(&conn, DEPARTMENTS, id)?
            .ok_or_else(|| Error::NotFound(format!("Department {} not found after creation", id)))?;
        Ok(department_from(row))
    }

    pub fn get_department(&self, id: i64) -> Result<Option<Department>> {
        let conn = self.conn()?;
        Ok(level_get(&conn, DEPARTMENTS, id)?.map(department_from))
    }

    pub fn list_departments(&self, user_id: i64, budget_id: Option<i64>) -> Result<Vec<Department>> {
        let conn = self.conn()?;
        let rows = level_list(&conn, DEPARTMENTS, user_id, budget_id)?;
        Ok(rows.into_iter().map(department_from).collect())
    }

    pub fn update_department(&self, id: i64, name: &str) -> Result<Department> {
        let conn = self.conn()?;
        level_update(&conn, DEPARTMENTS, id, name)?;
        let row = level_get(&conn, DEPARTMENTS, id)?
            .ok_or_else(|| Error::NotFound(format!("Department {} not found", id)))?;
        Ok(department_from(row))
    }

    pub fn delete_department(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        level_delete(&conn, DEPARTMENTS, id)
    }

    // ----- Projects -----

    pub fn create_project(&self, name: &str, department_id: i64) -> Result<Project> {
        let conn = self.conn()?;
        let id = level_insert(&conn, PROJECTS, name, department_id)?;
        let row = level_get(&conn, PROJECTS, id)?
            .ok_or_else(|| Error::NotFound(format!("Project {} not found after creation", id)))?;
        Ok(project_from(row))
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.conn()?;
        Ok(level_get(&conn, PROJECTS, id)?.map(project_from))
    }

    pub fn list_projects(&self, user_id: i64, department_id: Option<i64>) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        let rows = level_list(&conn, PROJECTS, user_id, department_id)?;
        Ok(rows.into_iter().map(project_from).collect())
    }

    pub fn update_project(&self, id: i64, name: &str) -> Result<Project> {
        let conn = self.conn()?;
        level_update(&conn, PROJECTS, id, name)?;
        let row = level_get(&conn, PROJECTS, id)?
            .ok_or_else(|| Error::NotFound(format!("Project {} not found", id)))?;
        Ok(project_from(row))
    }

    pub fn delete_project(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        level_delete(&conn, PROJECTS, id)
    }

    // ----- Vendors -----

    pub fn create_vendor(&self, name: &str, project_id: i64) -> Result<Vendor> {
        let conn = self.conn()?;
        let id = level_insert(&conn, VENDORS, name, project_id)?;
        let row = level_get(&conn, VENDORS, id)?
            .ok_or_else(|| Error::NotFound(format!("Vendor {} not found after creation", id)))?;
        Ok(vendor_from(row))
    }

    pub fn get_vendor(&self, id: i64) -> Result<Option<Vendor>> {
        let conn = self.conn()?;
        Ok(level_get(&conn, VENDORS, id)?.map(vendor_from))
    }

    pub fn list_vendors(&self, user_id: i64, project_id: Option<i64>) -> Result<Vec<Vendor>> {
        let conn = self.conn()?;
        let rows = level_list(&conn, VENDORS, user_id, project_id)?;
        Ok(rows.into_iter().map(vendor_from).collect())
    }

    pub fn update_vendor(&self, id: i64, name: &str) -> Result<Vendor> {
        let conn = self.conn()?;
        level_update(&conn, VENDORS, id, name)?;
        let row = level_get(&conn, VENDORS, id)?
            .ok_or_else(|| Error::NotFound(format!("Vendor {} not found", id)))?;
        Ok(vendor_from(row))
    }

    pub fn delete_vendor(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        level_delete(&conn, VENDORS, id)
    }
}

fn department_from(row: LevelRow) -> Department {
    Department {
        id: row.id,
        name: row.name,
        budget_id: row.parent_id,
        created_at: row.created_at,
    }
}

fn project_from(row: LevelRow) -> Project {
    Project {
        id: row.id,
        name: row.name,
        department_id: row.parent_id,
        created_at: row.created_at,
    }
}

fn vendor_from(row: LevelRow) -> Vendor {
    Vendor {
        id: row.id,
        name: row.name,
        project_id: row.parent_id,
        created_at: row.created_at,
    }
}
