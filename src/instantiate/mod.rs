//! Template instantiation.
//!
//! Expands a template into concrete tasks:
//!
//! 1. Reject re-entry of a template already on the active call chain
//! 2. Merge supplied variables over declared defaults
//! 3. Validate required variables (before anything is created)
//! 4. Order blueprints by dependencies and implicit parent edges
//! 5. Materialize each blueprint in order, one at a time
//!
//! A blueprint whose metadata carries a `template_ref` directive becomes
//! the mount point of a nested instantiation rooted at its own path.
//!
//! Nothing is rolled back on failure: tasks created before the failing
//! step stay in the store.

pub mod graph;
mod materialize;

pub use graph::{DependencyGraph, build_graph, order};
pub use materialize::ResolvedTask;

use crate::error::{InstantiateError, TemplateResult};
use crate::interpolate::{resolve_variables, validate_required_variables};
use crate::store::{TaskStore, TemplateStore};
use crate::types::{Template, TemplateSummary, VariableContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A task created during an instantiation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTask {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub kind: crate::types::TaskKind,
    /// Placeholder ancestor created on demand.
    pub auto_generated: bool,
    /// Template whose blueprint (or ancestor chain) produced the task.
    pub template_id: String,
}

/// Outcome of a successful `instantiate` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstantiateResult {
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<String>,
    /// Every task created, nested instantiations included, in creation order.
    pub created: Vec<CreatedTask>,
}

impl InstantiateResult {
    pub fn paths(&self) -> Vec<&str> {
        self.created.iter().map(|t| t.path.as_str()).collect()
    }
}

/// Registration of a template id as in flight; released on drop.
struct ActiveGuard<'a> {
    registry: &'a Mutex<HashMap<String, usize>>,
    template_id: String,
}

impl<'a> ActiveGuard<'a> {
    fn acquire(registry: &'a Mutex<HashMap<String, usize>>, template_id: &str) -> Self {
        let mut active = registry.lock().unwrap_or_else(|p| p.into_inner());
        *active.entry(template_id.to_string()).or_insert(0) += 1;
        Self {
            registry,
            template_id: template_id.to_string(),
        }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let mut active = self.registry.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(count) = active.get_mut(&self.template_id) {
            *count -= 1;
            if *count == 0 {
                active.remove(&self.template_id);
            }
        }
    }
}

/// Expands templates from a template store into a task store.
pub struct TemplateManager {
    templates: Arc<dyn TemplateStore>,
    tasks: Arc<dyn TaskStore>,
    /// In-flight template ids with their call counts.
    active: Mutex<HashMap<String, usize>>,
    /// Serializes ancestor lookup-then-create across concurrent calls.
    ancestors: tokio::sync::Mutex<()>,
}

impl TemplateManager {
    pub fn new(templates: Arc<dyn TemplateStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self {
            templates,
            tasks,
            active: Mutex::new(HashMap::new()),
            ancestors: tokio::sync::Mutex::new(()),
        }
    }

    /// Template ids currently being instantiated on this manager, sorted.
    pub fn active_templates(&self) -> Vec<String> {
        let active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        let mut ids: Vec<String> = active.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// List template summaries, optionally filtered by tag.
    pub async fn list_templates(&self, tag: Option<&str>) -> TemplateResult<Vec<TemplateSummary>> {
        self.templates
            .list_templates(tag)
            .await
            .map_err(|e| InstantiateError::TemplateStore {
                template_id: tag.map(|t| format!("tag:{}", t)).unwrap_or_default(),
                source: e.into(),
            })
    }

    /// Load a template or fail with `TemplateNotFound`.
    pub async fn get_template(&self, template_id: &str) -> TemplateResult<Template> {
        self.templates
            .get_template(template_id)
            .await
            .map_err(|e| InstantiateError::TemplateStore {
                template_id: template_id.to_string(),
                source: e.into(),
            })?
            .ok_or_else(|| InstantiateError::TemplateNotFound(template_id.to_string()))
    }

    /// Instantiate a template, optionally beneath `parent_path`.
    pub async fn instantiate(
        &self,
        template_id: &str,
        variables: VariableContext,
        parent_path: Option<&str>,
    ) -> TemplateResult<InstantiateResult> {
        let parent_path = parent_path
            .map(crate::paths::normalize)
            .filter(|p| !p.is_empty());
        let start = Instant::now();
        let mut created = Vec::new();

        let outcome = self
            .instantiate_in_chain(
                template_id.to_string(),
                variables,
                parent_path.clone(),
                Vec::new(),
                &mut created,
            )
            .await;

        match outcome {
            Ok(()) => {
                info!(
                    template_id = %template_id,
                    created = created.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Template instantiated"
                );
                Ok(InstantiateResult {
                    template_id: template_id.to_string(),
                    parent_path,
                    created,
                })
            }
            Err(e) => {
                warn!(
                    template_id = %template_id,
                    created = created.len(),
                    error = %e,
                    "Template instantiation failed; created tasks are left in place"
                );
                Err(e)
            }
        }
    }

    /// Resolve and order a template without creating anything.
    ///
    /// Nested directives are reported on the planned task, not expanded.
    pub async fn plan(
        &self,
        template_id: &str,
        variables: VariableContext,
        parent_path: Option<&str>,
    ) -> TemplateResult<Vec<ResolvedTask>> {
        let parent_path = parent_path
            .map(crate::paths::normalize)
            .filter(|p| !p.is_empty());
        let template = self.get_template(template_id).await?;
        let ctx = Self::resolve_context(&template, &variables)?;
        let ordered = order(&template.tasks, &ctx, parent_path.as_deref())?;
        Ok(ordered
            .into_iter()
            .map(|bp| ResolvedTask::resolve(bp, &ctx, parent_path.as_deref()))
            .collect())
    }

    /// Merge defaults and validate required variables.
    fn resolve_context(
        template: &Template,
        supplied: &VariableContext,
    ) -> TemplateResult<VariableContext> {
        let ctx = resolve_variables(&template.variables, supplied);
        let missing = validate_required_variables(&template.variables, &ctx);
        if !missing.is_empty() {
            return Err(InstantiateError::MissingVariables {
                template_id: template.id.clone(),
                missing,
            });
        }
        Ok(ctx)
    }

    /// One instantiation frame. `chain` holds the template ids of the
    /// enclosing frames, outermost first.
    fn instantiate_in_chain<'a>(
        &'a self,
        template_id: String,
        variables: VariableContext,
        parent_path: Option<String>,
        chain: Vec<String>,
        created: &'a mut Vec<CreatedTask>,
    ) -> BoxFuture<'a, TemplateResult<()>> {
        Box::pin(async move {
            if chain.contains(&template_id) {
                let mut chain = chain;
                chain.push(template_id.clone());
                return Err(InstantiateError::CircularTemplateReference { template_id, chain });
            }
            let _guard = ActiveGuard::acquire(&self.active, &template_id);

            info!(
                template_id = %template_id,
                parent_path = ?parent_path,
                depth = chain.len(),
                "Instantiating template"
            );

            let template = self.get_template(&template_id).await?;
            let ctx = Self::resolve_context(&template, &variables)?;
            let ordered = order(&template.tasks, &ctx, parent_path.as_deref())?;
            debug!(template_id = %template_id, tasks = ordered.len(), "Materializing blueprints");

            let mut frame_chain = chain;
            frame_chain.push(template_id.clone());

            for blueprint in ordered {
                self.materialize(
                    blueprint,
                    &ctx,
                    parent_path.as_deref(),
                    &frame_chain,
                    created,
                )
                .await?;
            }

            Ok(())
        })
    }
}
