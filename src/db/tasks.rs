//! Task CRUD and tree queries.

use super::deps::{get_dependencies_internal, insert_dependencies_internal};
use super::{Database, now_ms};
use crate::paths;
use crate::store::TaskStore;
use crate::types::{CreateTaskInput, Task, TaskKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;

/// Parse a task row. Dependencies are loaded separately.
pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: i64 = row.get("id")?;
    let path: String = row.get("path")?;
    let name: String = row.get("name")?;
    let kind: String = row.get("kind")?;
    let description: Option<String> = row.get("description")?;
    let metadata_json: String = row.get("metadata")?;
    let parent_path: Option<String> = row.get("parent_path")?;
    let created_at: i64 = row.get("created_at")?;

    Ok(Task {
        id,
        path,
        name,
        kind: TaskKind::parse(&kind),
        description,
        metadata: serde_json::from_str(&metadata_json)
            .unwrap_or_else(|_| Value::Object(Default::default())),
        parent_path,
        dependencies: Vec::new(),
        created_at,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
fn get_task_internal(conn: &Connection, path: &str) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            "SELECT * FROM tasks WHERE path = ?1",
            params![path],
            parse_task_row,
        )
        .optional()?;

    match task {
        Some(mut task) => {
            task.dependencies = get_dependencies_internal(conn, &task.path)?;
            Ok(Some(task))
        }
        None => Ok(None),
    }
}

/// Attach dependency lists to a batch of tasks.
fn with_dependencies(conn: &Connection, mut tasks: Vec<Task>) -> Result<Vec<Task>> {
    for task in tasks.iter_mut() {
        task.dependencies = get_dependencies_internal(conn, &task.path)?;
    }
    Ok(tasks)
}

impl Database {
    /// Create a new task.
    ///
    /// When `parent_path` is absent the parent is inferred from the path.
    /// Fails if a task already exists at the path.
    pub fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        let path = paths::normalize(&input.path);
        if path.is_empty() {
            anyhow::bail!("Task path must not be empty");
        }
        let parent_path = input
            .parent_path
            .as_deref()
            .map(paths::normalize)
            .filter(|p| !p.is_empty())
            .or_else(|| paths::parent_path(&path));
        let metadata_json = serde_json::to_string(&input.metadata)?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO tasks (path, name, kind, description, metadata, parent_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &path,
                    &input.name,
                    input.kind.as_str(),
                    &input.description,
                    metadata_json,
                    &parent_path,
                    now,
                ],
            )
            .with_context(|| format!("Failed to insert task '{}'", path))?;
            let id = tx.last_insert_rowid();

            let dependencies = insert_dependencies_internal(&tx, &path, &input.dependencies)?;

            tx.commit()?;

            Ok(Task {
                id,
                path,
                name: input.name,
                kind: input.kind,
                description: input.description,
                metadata: input.metadata,
                parent_path,
                dependencies,
                created_at: now,
            })
        })
    }

    /// Get a task by path.
    pub fn get_task(&self, path: &str) -> Result<Option<Task>> {
        let path = paths::normalize(path);
        self.with_conn(|conn| get_task_internal(conn, &path))
    }

    /// Check whether a task exists at the path.
    pub fn task_exists(&self, path: &str) -> Result<bool> {
        let path = paths::normalize(path);
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM tasks WHERE path = ?1)",
                params![path],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// List tasks ordered by path, optionally restricted to a subtree.
    pub fn list_tasks(&self, prefix: Option<&str>) -> Result<Vec<Task>> {
        let prefix = prefix.map(paths::normalize).filter(|p| !p.is_empty());

        self.with_conn(|conn| {
            let tasks: Vec<Task> = match prefix {
                Some(ref prefix) => {
                    let subtree = format!("{}/", prefix);
                    let mut stmt = conn.prepare(
                        "SELECT * FROM tasks
                         WHERE path = ?1 OR substr(path, 1, length(?2)) = ?2
                         ORDER BY path",
                    )?;
                    stmt.query_map(params![prefix, subtree], parse_task_row)?
                        .collect::<rusqlite::Result<_>>()?
                }
                None => {
                    let mut stmt = conn.prepare("SELECT * FROM tasks ORDER BY path")?;
                    stmt.query_map([], parse_task_row)?
                        .collect::<rusqlite::Result<_>>()?
                }
            };
            with_dependencies(conn, tasks)
        })
    }

    /// Direct children of a task, ordered by creation.
    pub fn get_children(&self, path: &str) -> Result<Vec<Task>> {
        let path = paths::normalize(path);
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM tasks WHERE parent_path = ?1 ORDER BY id")?;
            let tasks = stmt
                .query_map(params![path], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            with_dependencies(conn, tasks)
        })
    }

    /// Total number of stored tasks.
    pub fn count_tasks(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

#[async_trait]
impl TaskStore for Database {
    async fn get_task(&self, path: &str) -> Result<Option<Task>> {
        Database::get_task(self, path)
    }

    async fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        Database::create_task(self, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(path: &str, kind: TaskKind) -> CreateTaskInput {
        CreateTaskInput {
            path: path.to_string(),
            name: paths::last_segment(path).to_string(),
            kind,
            description: None,
            metadata: json!({}),
            dependencies: Vec::new(),
            parent_path: None,
        }
    }

    #[test]
    fn test_create_and_get_task() {
        let db = Database::open_in_memory().unwrap();
        let mut req = input("proj/api", TaskKind::Task);
        req.metadata = json!({"owner": "ops"});
        req.dependencies = vec!["proj/db".to_string()];

        let created = db.create_task(req).unwrap();
        assert_eq!(created.parent_path.as_deref(), Some("proj"));

        let loaded = db.get_task("proj/api").unwrap().unwrap();
        assert_eq!(loaded.id, created.id);
        assert_eq!(loaded.kind, TaskKind::Task);
        assert_eq!(loaded.metadata, json!({"owner": "ops"}));
        assert_eq!(loaded.dependencies, vec!["proj/db"]);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_task(input("a", TaskKind::Milestone)).unwrap();
        let err = db.create_task(input("a", TaskKind::Milestone)).unwrap_err();
        assert!(err.to_string().contains("Failed to insert task 'a'"));
        assert_eq!(db.count_tasks().unwrap(), 1);
    }

    #[test]
    fn test_explicit_parent_wins() {
        let db = Database::open_in_memory().unwrap();
        let mut req = input("x/y", TaskKind::Task);
        req.parent_path = Some("elsewhere".to_string());
        let task = db.create_task(req).unwrap();
        assert_eq!(task.parent_path.as_deref(), Some("elsewhere"));
    }

    #[test]
    fn test_list_tasks_by_prefix() {
        let db = Database::open_in_memory().unwrap();
        for p in ["a", "a/b", "a/b/c", "ab", "z"] {
            db.create_task(input(p, TaskKind::Task)).unwrap();
        }
        let paths: Vec<String> = db
            .list_tasks(Some("a"))
            .unwrap()
            .into_iter()
            .map(|t| t.path)
            .collect();
        assert_eq!(paths, vec!["a", "a/b", "a/b/c"]);
        assert_eq!(db.list_tasks(None).unwrap().len(), 5);
    }

    #[test]
    fn test_get_children_and_exists() {
        let db = Database::open_in_memory().unwrap();
        for p in ["a", "a/b", "a/c", "a/b/d"] {
            db.create_task(input(p, TaskKind::Task)).unwrap();
        }
        let children: Vec<String> = db
            .get_children("a")
            .unwrap()
            .into_iter()
            .map(|t| t.path)
            .collect();
        assert_eq!(children, vec!["a/b", "a/c"]);
        assert!(db.task_exists("a/b/d").unwrap());
        assert!(!db.task_exists("a/e").unwrap());
    }
}
