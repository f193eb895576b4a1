//! Task dependency rows.

use super::Database;
use crate::paths;
use anyhow::Result;
use rusqlite::{Connection, params};

/// Insert dependency rows for a task, skipping self-references and duplicates.
/// Returns the normalized dependency list in declaration order.
pub(crate) fn insert_dependencies_internal(
    conn: &Connection,
    task_path: &str,
    dependencies: &[String],
) -> Result<Vec<String>> {
    let mut inserted: Vec<String> = Vec::new();
    for dep in dependencies {
        let dep = paths::normalize(dep);
        if dep.is_empty() || dep == task_path || inserted.contains(&dep) {
            continue;
        }
        conn.execute(
            "INSERT OR IGNORE INTO task_dependencies (task_path, depends_on_path) VALUES (?1, ?2)",
            params![task_path, &dep],
        )?;
        inserted.push(dep);
    }
    Ok(inserted)
}

/// Paths a task depends on, using an existing connection.
pub(crate) fn get_dependencies_internal(conn: &Connection, task_path: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT depends_on_path FROM task_dependencies WHERE task_path = ?1 ORDER BY rowid",
    )?;
    let deps = stmt
        .query_map(params![task_path], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(deps)
}

impl Database {
    /// Paths the given task depends on.
    pub fn get_dependencies(&self, task_path: &str) -> Result<Vec<String>> {
        let task_path = paths::normalize(task_path);
        self.with_conn(|conn| get_dependencies_internal(conn, &task_path))
    }

    /// Paths of tasks that depend on the given task.
    pub fn get_dependents(&self, task_path: &str) -> Result<Vec<String>> {
        let task_path = paths::normalize(task_path);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_path FROM task_dependencies WHERE depends_on_path = ?1 ORDER BY task_path",
            )?;
            let dependents = stmt
                .query_map(params![task_path], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(dependents)
        })
    }
}
