//! Per-blueprint materialization.

use super::graph::resolve_path;
use super::{CreatedTask, TemplateManager};
use crate::error::{InstantiateError, TemplateResult};
use crate::interpolate::{interpolate_metadata, interpolate_string, unresolved_placeholders};
use crate::metadata;
use crate::paths;
use crate::types::{CreateTaskInput, Task, TaskBlueprint, TaskKind, TemplateRef, VariableContext};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

/// A blueprint with every templated field resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedTask {
    pub path: String,
    pub title: String,
    pub kind: TaskKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub dependencies: Vec<String>,
    /// Normalized metadata, nested directive stripped.
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_ref: Option<TemplateRef>,
}

impl ResolvedTask {
    /// Interpolate and normalize a blueprint against the context.
    pub fn resolve(
        blueprint: &TaskBlueprint,
        ctx: &VariableContext,
        parent_path: Option<&str>,
    ) -> Self {
        for field in [&blueprint.path, &blueprint.title] {
            let missing = unresolved_placeholders(field, ctx);
            if !missing.is_empty() {
                warn!(field = %field, missing = ?missing, "Unresolved placeholders left in place");
            }
        }

        let path = resolve_path(&blueprint.path, ctx, parent_path);
        let dependencies = blueprint
            .dependency_list()
            .iter()
            .map(|dep| resolve_path(dep, ctx, parent_path))
            .collect();

        let raw_metadata = blueprint
            .metadata
            .as_ref()
            .map(|m| interpolate_metadata(m, ctx))
            .unwrap_or(Value::Null);
        let normalized = metadata::transform(&raw_metadata);
        let template_ref = metadata::extract_template_ref(&normalized);
        let metadata = match template_ref {
            Some(_) => metadata::remove_template_ref(&normalized),
            None => normalized,
        };

        Self {
            path,
            title: interpolate_string(&blueprint.title, ctx),
            kind: blueprint.task_type.into(),
            description: blueprint
                .description
                .as_deref()
                .map(|d| interpolate_string(d, ctx)),
            dependencies,
            metadata,
            template_ref,
        }
    }

    fn into_input(self) -> (CreateTaskInput, Option<TemplateRef>) {
        let parent_path = paths::parent_path(&self.path);
        let input = CreateTaskInput {
            path: self.path,
            name: self.title,
            kind: self.kind,
            description: self.description,
            metadata: self.metadata,
            dependencies: self.dependencies,
            parent_path,
        };
        (input, self.template_ref)
    }
}

fn created(task: &Task, auto_generated: bool, template_id: &str) -> CreatedTask {
    CreatedTask {
        id: task.id,
        path: task.path.clone(),
        name: task.name.clone(),
        kind: task.kind,
        auto_generated,
        template_id: template_id.to_string(),
    }
}

impl TemplateManager {
    /// Create one blueprint's task, its missing ancestors, and any nested
    /// template mounted beneath it.
    pub(super) async fn materialize(
        &self,
        blueprint: &TaskBlueprint,
        ctx: &VariableContext,
        parent_path: Option<&str>,
        chain: &[String],
        created_tasks: &mut Vec<CreatedTask>,
    ) -> TemplateResult<()> {
        let template_id = chain.last().map(String::as_str).unwrap_or_default();
        let resolved = ResolvedTask::resolve(blueprint, ctx, parent_path);
        let path = resolved.path.clone();

        self.ensure_ancestors(&path, template_id, created_tasks).await?;

        let (input, template_ref) = resolved.into_input();
        let task = self
            .tasks
            .create_task(input)
            .await
            .map_err(|e| InstantiateError::task_creation(template_id, &path, e))?;
        debug!(template_id = %template_id, path = %task.path, kind = task.kind.as_str(), "Created task");
        created_tasks.push(created(&task, false, template_id));

        if let Some(template_ref) = template_ref {
            debug!(
                template_id = %template_id,
                nested = %template_ref.template,
                mount = %path,
                "Expanding nested template"
            );
            self.instantiate_in_chain(
                template_ref.template,
                template_ref.variables,
                Some(path),
                chain.to_vec(),
                created_tasks,
            )
            .await?;
        }

        Ok(())
    }

    /// Create placeholder milestones for every missing ancestor, root first.
    async fn ensure_ancestors(
        &self,
        path: &str,
        template_id: &str,
        created_tasks: &mut Vec<CreatedTask>,
    ) -> TemplateResult<()> {
        let ancestors = paths::ancestors(path);
        if ancestors.is_empty() {
            return Ok(());
        }

        let _lock = self.ancestors.lock().await;
        for ancestor in ancestors {
            let existing = self
                .tasks
                .get_task(&ancestor)
                .await
                .map_err(|e| InstantiateError::task_lookup(template_id, &ancestor, e))?;
            if existing.is_some() {
                continue;
            }

            let input = CreateTaskInput {
                name: paths::last_segment(&ancestor).to_string(),
                kind: TaskKind::Milestone,
                description: Some(format!("Auto-generated parent for {}", path)),
                metadata: json!({
                    "autoGenerated": true,
                    "childPath": path,
                }),
                dependencies: Vec::new(),
                parent_path: None,
                path: ancestor.clone(),
            };
            let task = self
                .tasks
                .create_task(input)
                .await
                .map_err(|e| InstantiateError::task_creation(template_id, &ancestor, e))?;
            debug!(template_id = %template_id, path = %task.path, "Created placeholder ancestor");
            created_tasks.push(created(&task, true, template_id));
        }

        Ok(())
    }
}
