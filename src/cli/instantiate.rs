//! Instantiate subcommand for task-templates CLI
//!
//! Expands a template into the task store, optionally beneath a parent path.

use crate::types::VariableContext;
use anyhow::{Context, Result, anyhow};
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

/// Arguments for the instantiate subcommand
#[derive(Args, Debug)]
pub struct InstantiateArgs {
    /// Template id to instantiate
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// Variable assignment as KEY=VALUE (repeatable)
    ///
    /// Values are parsed as JSON when possible (`3`, `true`, `["a"]`),
    /// otherwise taken as plain strings.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// YAML or JSON file with a mapping of variables
    ///
    /// Values given with --var take precedence.
    #[arg(long, value_name = "FILE")]
    pub vars_file: Option<PathBuf>,

    /// Path under which the template's tasks are created
    #[arg(long)]
    pub parent: Option<String>,

    /// Resolve and order the tasks without creating anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Parse a single `KEY=VALUE` assignment.
pub fn parse_var(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid variable '{}', expected KEY=VALUE", assignment))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Invalid variable '{}', empty name", assignment));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

impl InstantiateArgs {
    /// Collect variables from the vars file and `--var` flags.
    pub fn variables(&self) -> Result<VariableContext> {
        let mut vars = match self.vars_file {
            Some(ref path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read variables file {:?}", path))?;
                serde_yaml::from_str::<VariableContext>(&content)
                    .with_context(|| format!("Variables file {:?} must be a mapping", path))?
            }
            None => VariableContext::new(),
        };

        for assignment in &self.vars {
            let (key, value) = parse_var(assignment)?;
            vars.insert(key, value);
        }

        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(vars: &[&str], vars_file: Option<PathBuf>) -> InstantiateArgs {
        InstantiateArgs {
            template: "t".into(),
            vars: vars.iter().map(|s| s.to_string()).collect(),
            vars_file,
            parent: None,
            dry_run: false,
        }
    }

    #[test]
    fn test_parse_var_values() {
        assert_eq!(parse_var("n=3").unwrap(), ("n".into(), json!(3)));
        assert_eq!(parse_var("flag=true").unwrap(), ("flag".into(), json!(true)));
        assert_eq!(parse_var("name=api").unwrap(), ("name".into(), json!("api")));
        assert_eq!(parse_var("url=a=b").unwrap(), ("url".into(), json!("a=b")));
        assert_eq!(parse_var("empty=").unwrap(), ("empty".into(), json!("")));
    }

    #[test]
    fn test_parse_var_rejects_malformed() {
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_vars_file_overridden_by_flags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vars.yaml");
        std::fs::write(&path, "service: web\nreplicas: 2\n").unwrap();

        let vars = args(&["service=api"], Some(path)).variables().unwrap();
        assert_eq!(vars.get("service"), Some(&json!("api")));
        assert_eq!(vars.get("replicas"), Some(&json!(2)));
    }
}
