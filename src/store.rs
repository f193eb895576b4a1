//! Collaborator contracts consumed by the instantiation core.

use crate::types::{CreateTaskInput, Task, Template, TemplateSummary};
use anyhow::Result;
use async_trait::async_trait;

/// Source of template definitions.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Load a template by id. `Ok(None)` when no such template exists.
    async fn get_template(&self, id: &str) -> Result<Option<Template>>;

    /// List template summaries, optionally restricted to a tag.
    async fn list_templates(&self, tag: Option<&str>) -> Result<Vec<TemplateSummary>>;
}

/// Persistence for materialized tasks, addressed by normalized path.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Look up the task at `path`.
    async fn get_task(&self, path: &str) -> Result<Option<Task>>;

    /// Create a task with its parent and dependency linkage.
    async fn create_task(&self, input: CreateTaskInput) -> Result<Task>;
}
