//! Core types for task templates and the tasks they expand into.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Resolved variable name -> value mapping for one instantiation call.
pub type VariableContext = HashMap<String, Value>;

/// A reusable, parameterized set of task blueprints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub variables: Vec<VariableDecl>,
    #[serde(default)]
    pub tasks: Vec<TaskBlueprint>,
}

impl Template {
    /// Lightweight summary for listings.
    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.iter().cloned().collect(),
            variable_count: self.variables.len(),
            task_count: self.tasks.len(),
        }
    }

    /// Check whether the template carries the given tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// A declared template variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Declared type of a blueprint.
///
/// Anything other than `TASK` is treated as a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum BlueprintType {
    #[default]
    Task,
    Milestone,
}

impl From<String> for BlueprintType {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("task") {
            BlueprintType::Task
        } else {
            BlueprintType::Milestone
        }
    }
}

/// One task description within a template. Every string field is a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBlueprint {
    /// Path relative to the enclosing instantiation's parent path.
    pub path: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub task_type: BlueprintType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Sibling-relative dependency paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl TaskBlueprint {
    pub fn new(path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            task_type: BlueprintType::Task,
            description: None,
            dependencies: None,
            metadata: None,
        }
    }

    pub fn milestone(mut self) -> Self {
        self.task_type = BlueprintType::Milestone;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(deps.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Declared dependencies, empty when none.
    pub fn dependency_list(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or(&[])
    }
}

/// Template listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub variable_count: usize,
    pub task_count: usize,
}

/// A nested instantiation request found in a task's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub template: String,
    #[serde(default)]
    pub variables: VariableContext,
}

/// Kind of a stored task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Task,
    Milestone,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Task => "task",
            TaskKind::Milestone => "milestone",
        }
    }

    /// Parse the stored representation. Unknown values read as milestones.
    pub fn parse(s: &str) -> Self {
        match s {
            "task" => TaskKind::Task,
            _ => TaskKind::Milestone,
        }
    }
}

impl From<BlueprintType> for TaskKind {
    fn from(t: BlueprintType) -> Self {
        match t {
            BlueprintType::Task => TaskKind::Task,
            BlueprintType::Milestone => TaskKind::Milestone,
        }
    }
}

/// A task as persisted by the task store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub path: String,
    pub name: String,
    pub kind: TaskKind,
    pub description: Option<String>,
    pub metadata: Value,
    pub parent_path: Option<String>,
    pub dependencies: Vec<String>,
    pub created_at: i64,
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub path: String,
    pub name: String,
    pub kind: TaskKind,
    pub description: Option<String>,
    pub metadata: Value,
    pub dependencies: Vec<String>,
    /// Explicit parent. When `None` the store infers placement from the path.
    pub parent_path: Option<String>,
}
