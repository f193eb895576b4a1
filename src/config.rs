//! Configuration loading and management.
//!
//! Lookup order (first found wins):
//! 1. Explicit path (`--config`)
//! 2. `./task-templates/config.yaml`
//! 3. `~/.task-templates/config.yaml`
//! 4. Built-in defaults
//!
//! Environment variables are applied on top:
//! - `TASK_TEMPLATES_DB_PATH` - database path
//! - `TASK_TEMPLATES_DIR` - template directory

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable overriding the database path.
pub const ENV_DB_PATH: &str = "TASK_TEMPLATES_DB_PATH";

/// Environment variable overriding the template directory.
pub const ENV_TEMPLATES_DIR: &str = "TASK_TEMPLATES_DIR";

/// Project-level config file, relative to the working directory.
pub const PROJECT_CONFIG: &str = "task-templates/config.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Template discovery configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory scanned for template files.
    #[serde(default = "default_templates_dir")]
    pub dir: PathBuf,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_templates_dir(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("task-templates/tasks.db")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("task-templates/templates")
}

/// User-level config file (`~/.task-templates/config.yaml`).
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".task-templates").join("config.yaml"))
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    /// Resolve configuration from an explicit path, the standard locations,
    /// or defaults, then apply environment overrides.
    ///
    /// An explicit path that cannot be loaded is an error; missing standard
    /// files are not.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => Self::load_standard()?,
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_standard() -> Result<Self> {
        let candidates = std::iter::once(PathBuf::from(PROJECT_CONFIG)).chain(user_config_path());
        for path in candidates {
            if path.is_file() {
                debug!(path = ?path, "Loading configuration");
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup(ENV_DB_PATH).filter(|v| !v.is_empty()) {
            self.server.db_path = PathBuf::from(db_path);
        }
        if let Some(dir) = lookup(ENV_TEMPLATES_DIR).filter(|v| !v.is_empty()) {
            self.templates.dir = PathBuf::from(dir);
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.db_path, PathBuf::from("task-templates/tasks.db"));
        assert_eq!(config.templates.dir, PathBuf::from("task-templates/templates"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("templates:\n  dir: /srv/templates\n").unwrap();
        assert_eq!(config.templates.dir, PathBuf::from("/srv/templates"));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  db_path: data/t.db\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.server.db_path, PathBuf::from("data/t.db"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(Config::resolve(Some(&dir.path().join("nope.yaml"))).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_DB_PATH, "/tmp/x.db"), (ENV_TEMPLATES_DIR, "")]
            .into_iter()
            .collect();
        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.db_path, PathBuf::from("/tmp/x.db"));
        // Empty values are ignored
        assert_eq!(config.templates.dir, default_templates_dir());
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.server.db_path = dir.path().join("nested/deeper/tasks.db");
        config.ensure_db_dir().unwrap();
        assert!(dir.path().join("nested/deeper").is_dir());
    }
}
