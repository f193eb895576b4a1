//! End-to-end tests: templates loaded from disk, tasks written to SQLite.

use serde_json::json;
use std::fs;
use std::sync::Arc;
use task_templates::db::Database;
use task_templates::store::TemplateStore;
use task_templates::templates::FileTemplateStore;
use task_templates::types::{TaskKind, VariableContext};
use task_templates::{ErrorCode, TemplateManager};
use tempfile::TempDir;

const PROJECT: &str = r#"
name: Project Kickoff
tags: [project]
variables:
  - name: project
    required: true
  - name: service
    default: api
tasks:
  - path: "{{project}}"
    title: "Project {{project}}"
    type: MILESTONE
  - path: "{{project}}/{{service}}"
    title: "Service {{service}}"
    dependencies: ["{{project}}/design"]
    metadata:
      template_ref:
        template: service-setup
        variables:
          name: "{{service}}"
  - path: "{{project}}/design"
    title: Design
"#;

const SERVICE: &str = r#"{
  "variables": [{"name": "name", "required": true}],
  "tasks": [
    {"path": "deploy", "title": "Deploy {{name}}", "dependencies": ["build"]},
    {"path": "build", "title": "Build {{name}}", "metadata": {"owner": "{{name}}-team"}}
  ]
}"#;

fn write_templates(dir: &TempDir) {
    fs::write(dir.path().join("project-kickoff.yaml"), PROJECT).unwrap();
    fs::write(dir.path().join("service-setup.json"), SERVICE).unwrap();
    fs::write(dir.path().join("broken.yaml"), "tasks: [unclosed").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a template").unwrap();
}

#[tokio::test]
async fn lists_templates_from_directory() {
    let dir = TempDir::new().unwrap();
    write_templates(&dir);
    let store = FileTemplateStore::new(dir.path());

    let all = store.list_templates(None).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["project-kickoff", "service-setup"]);
    assert_eq!(all[0].name, "Project Kickoff");
    assert_eq!(all[1].name, "Service Setup");

    let tagged = store.list_templates(Some("project")).await.unwrap();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].task_count, 3);
}

#[tokio::test]
async fn instantiates_nested_templates_from_disk() {
    let dir = TempDir::new().unwrap();
    write_templates(&dir);
    let db = Database::open(dir.path().join("tasks.db")).unwrap();
    let manager = TemplateManager::new(
        Arc::new(FileTemplateStore::new(dir.path())),
        Arc::new(db.clone()),
    );

    let mut vars = VariableContext::new();
    vars.insert("project".to_string(), json!("apollo"));
    let result = manager
        .instantiate("project-kickoff", vars, Some("org"))
        .await
        .unwrap();

    assert_eq!(
        result.paths(),
        vec![
            "org",
            "org/apollo",
            "org/apollo/design",
            "org/apollo/api",
            "org/apollo/api/build",
            "org/apollo/api/deploy",
        ]
    );
    assert!(result.created[0].auto_generated);

    let root = db.get_task("org/apollo").unwrap().unwrap();
    assert_eq!(root.kind, TaskKind::Milestone);

    let build = db.get_task("org/apollo/api/build").unwrap().unwrap();
    assert_eq!(build.name, "Build api");
    assert_eq!(build.metadata, json!({"owner": "api-team"}));

    let deploy = db.get_task("org/apollo/api/deploy").unwrap().unwrap();
    assert_eq!(deploy.dependencies, vec!["org/apollo/api/build"]);
}

#[tokio::test]
async fn missing_variables_reported_for_file_template() {
    let dir = TempDir::new().unwrap();
    write_templates(&dir);
    let db = Database::open_in_memory().unwrap();
    let manager = TemplateManager::new(
        Arc::new(FileTemplateStore::new(dir.path())),
        Arc::new(db.clone()),
    );

    let err = manager
        .instantiate("project-kickoff", VariableContext::new(), None)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::MissingVariables);
    let body = err.to_json();
    assert_eq!(body["code"], json!("MISSING_VARIABLES"));
    assert_eq!(body["missing"], json!(["project"]));
    assert_eq!(db.count_tasks().unwrap(), 0);
}
