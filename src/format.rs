//! Output formatting utilities for markdown and JSON.

use crate::instantiate::{InstantiateResult, ResolvedTask};
use crate::types::{Task, TaskKind, TemplateSummary};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

fn kind_marker(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Milestone => "◆",
        TaskKind::Task => "-",
    }
}

/// Indentation depth of a path (number of separators).
fn depth(path: &str) -> usize {
    path.matches('/').count()
}

/// Format template summaries as markdown.
pub fn format_templates_markdown(templates: &[TemplateSummary]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Templates ({})\n\n", templates.len()));

    for t in templates {
        md.push_str(&format!("## {}\n", t.name));
        md.push_str(&format!("- **id**: `{}`\n", t.id));
        if !t.tags.is_empty() {
            md.push_str(&format!("- **tags**: {}\n", t.tags.join(", ")));
        }
        md.push_str(&format!(
            "- **variables**: {}, **tasks**: {}\n",
            t.variable_count, t.task_count
        ));
        if let Some(ref desc) = t.description {
            md.push_str(&format!("\n{}\n", desc));
        }
        md.push('\n');
    }

    md
}

/// Format a list of stored tasks as an indented tree.
pub fn format_tasks_markdown(tasks: &[Task]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Tasks ({})\n\n", tasks.len()));

    for task in tasks {
        let deps = if task.dependencies.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = task.dependencies.iter().map(|d| format!("`{}`", d)).collect();
            format!(" (after {})", list.join(", "))
        };
        md.push_str(&format!(
            "{}{} {} `{}`{}\n",
            "  ".repeat(depth(&task.path)),
            kind_marker(task.kind),
            task.name,
            task.path,
            deps,
        ));
    }

    md
}

/// Format the outcome of an instantiation as markdown.
pub fn format_instantiation_markdown(result: &InstantiateResult) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# Instantiated `{}` ({} tasks)\n",
        result.template_id,
        result.created.len()
    ));
    if let Some(ref parent) = result.parent_path {
        md.push_str(&format!("- **parent**: `{}`\n", parent));
    }
    md.push('\n');

    for task in &result.created {
        let mut notes: Vec<&str> = Vec::new();
        if task.auto_generated {
            notes.push("auto");
        }
        if task.template_id != result.template_id {
            notes.push(&task.template_id);
        }
        let notes = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        };
        md.push_str(&format!(
            "{} {} `{}`{}\n",
            kind_marker(task.kind),
            task.name,
            task.path,
            notes
        ));
    }

    md
}

/// Format a dry-run plan as markdown.
pub fn format_plan_markdown(template_id: &str, plan: &[ResolvedTask]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Plan for `{}` ({} tasks)\n\n", template_id, plan.len()));

    for (i, task) in plan.iter().enumerate() {
        md.push_str(&format!("{}. {} `{}`", i + 1, task.title, task.path));
        if let Some(ref nested) = task.template_ref {
            md.push_str(&format!(" → mounts `{}`", nested.template));
        }
        md.push('\n');
    }

    md
}
