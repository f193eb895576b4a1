//! Directory-backed template store.
//!
//! Every `*.yaml`, `*.yml` and `*.json` file in the directory is a template.
//! The template id is the file's `id` field, falling back to the file stem.
//! Files that fail to parse are skipped with a warning.

use super::summarize;
use crate::store::TemplateStore;
use crate::types::{TaskBlueprint, Template, TemplateSummary, VariableDecl};
use anyhow::{Context, Result};
use async_trait::async_trait;
use heck::ToTitleCase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk template layout. `id` and `name` are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateFile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub variables: Vec<VariableDecl>,
    #[serde(default)]
    pub tasks: Vec<TaskBlueprint>,
}

impl TemplateFile {
    /// Parse a template file by extension.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let file = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(content)?,
            _ => serde_yaml::from_str(content)?,
        };
        Ok(file)
    }

    /// Resolve into a template, deriving the id from `stem` when absent.
    pub fn into_template(self, stem: &str) -> Template {
        let id = self
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| stem.to_string());
        let name = self.name.unwrap_or_else(|| id.to_title_case());
        Template {
            id,
            name,
            description: self.description,
            tags: self.tags,
            variables: self.variables,
            tasks: self.tasks,
        }
    }
}

/// Loads templates from a directory on every call.
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    dir: PathBuf,
}

impl FileTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn is_template_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml" | "json")
        )
    }

    /// Load a single template file.
    pub fn load_file(path: &Path) -> Result<Template> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {:?}", path))?;
        let file = TemplateFile::parse(path, &content)
            .with_context(|| format!("Failed to parse template {:?}", path))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");
        Ok(file.into_template(stem))
    }

    /// Load every valid template in the directory, sorted by file name.
    ///
    /// A missing directory yields no templates.
    pub fn load_all(&self) -> Result<Vec<Template>> {
        let mut templates = Vec::new();

        if !self.dir.exists() {
            debug!(dir = ?self.dir, "Template directory does not exist");
            return Ok(templates);
        }

        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read template directory {:?}", self.dir))?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && Self::is_template_file(&path) {
                files.push(path);
            }
        }
        files.sort();

        for path in files {
            match Self::load_file(&path) {
                Ok(template) => {
                    if templates.iter().any(|t: &Template| t.id == template.id) {
                        warn!(path = ?path, template_id = %template.id, "Duplicate template id, keeping first");
                        continue;
                    }
                    templates.push(template);
                }
                Err(e) => {
                    warn!(path = ?path, error = %format!("{:#}", e), "Skipping invalid template");
                }
            }
        }

        Ok(templates)
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn get_template(&self, id: &str) -> Result<Option<Template>> {
        Ok(self.load_all()?.into_iter().find(|t| t.id == id))
    }

    async fn list_templates(&self, tag: Option<&str>) -> Result<Vec<TemplateSummary>> {
        let templates = self.load_all()?;
        Ok(summarize(&templates, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlueprintType;
    use tempfile::TempDir;

    const SERVICE_YAML: &str = r#"
description: Stand up a service
tags: [ops]
variables:
  - name: service
    required: true
  - name: env
    default: staging
tasks:
  - path: "{{service}}"
    title: "Service {{service}}"
    type: MILESTONE
  - path: "{{service}}/deploy"
    title: "Deploy to {{env}}"
    dependencies: ["{{service}}/build"]
  - path: "{{service}}/build"
    title: Build
"#;

    #[tokio::test]
    async fn test_load_yaml_template_with_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("service-setup.yaml"), SERVICE_YAML).unwrap();

        let store = FileTemplateStore::new(dir.path());
        let template = store.get_template("service-setup").await.unwrap().unwrap();

        assert_eq!(template.name, "Service Setup");
        assert!(template.has_tag("ops"));
        assert_eq!(template.variables.len(), 2);
        assert!(template.variables[0].required);
        assert_eq!(template.tasks[0].task_type, BlueprintType::Milestone);
        assert_eq!(template.tasks[2].task_type, BlueprintType::Task);
    }

    #[tokio::test]
    async fn test_json_template_with_explicit_id() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("whatever.json"),
            r#"{"id": "release", "name": "Release Train", "tasks": [{"path": "r", "title": "R"}]}"#,
        )
        .unwrap();

        let store = FileTemplateStore::new(dir.path());
        assert!(store.get_template("whatever").await.unwrap().is_none());
        let template = store.get_template("release").await.unwrap().unwrap();
        assert_eq!(template.name, "Release Train");
    }

    #[tokio::test]
    async fn test_invalid_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("good.yaml"), SERVICE_YAML).unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "tasks: [unclosed").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let store = FileTemplateStore::new(dir.path());
        let summaries = store.list_templates(None).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, "good");
        assert_eq!(summaries[0].task_count, 3);

        assert!(store.list_templates(Some("dev")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let store = FileTemplateStore::new("/nonexistent/task-templates");
        assert!(store.list_templates(None).await.unwrap().is_empty());
        assert!(store.get_template("x").await.unwrap().is_none());
    }
}
