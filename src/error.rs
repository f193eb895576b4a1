//! Structured error types for template instantiation.

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Boxed collaborator failure carried as an error source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingVariables,
    DuplicateTaskPath,

    // Not found errors
    TemplateNotFound,

    // Conflict errors
    CircularTemplateReference,
    DependencyCycle,

    // Collaborator errors
    TaskCreationFailed,
    TaskLookupFailed,
    TemplateStoreError,
}

/// Failure of an `instantiate` call.
#[derive(Debug, Error)]
pub enum InstantiateError {
    #[error("Circular template reference: {}", chain.join(" -> "))]
    CircularTemplateReference {
        template_id: String,
        /// In-flight template ids, outermost first, ending with the re-entered id.
        chain: Vec<String>,
    },

    #[error("Template '{template_id}' is missing required variables: {}", missing.join(", "))]
    MissingVariables {
        template_id: String,
        missing: Vec<String>,
    },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Dependency cycle between tasks: {}", cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    #[error("Task path '{path}' is declared more than once")]
    DuplicateTaskPath { path: String },

    #[error("Failed to look up task '{path}' while instantiating '{template_id}': {source}")]
    TaskLookupFailed {
        template_id: String,
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to create task '{path}' while instantiating '{template_id}': {source}")]
    TaskCreationFailed {
        template_id: String,
        path: String,
        #[source]
        source: BoxError,
    },

    #[error("Template store failed to load '{template_id}': {source}")]
    TemplateStore {
        template_id: String,
        #[source]
        source: BoxError,
    },
}

impl InstantiateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            InstantiateError::CircularTemplateReference { .. } => {
                ErrorCode::CircularTemplateReference
            }
            InstantiateError::MissingVariables { .. } => ErrorCode::MissingVariables,
            InstantiateError::TemplateNotFound(_) => ErrorCode::TemplateNotFound,
            InstantiateError::DependencyCycle { .. } => ErrorCode::DependencyCycle,
            InstantiateError::DuplicateTaskPath { .. } => ErrorCode::DuplicateTaskPath,
            InstantiateError::TaskLookupFailed { .. } => ErrorCode::TaskLookupFailed,
            InstantiateError::TaskCreationFailed { .. } => ErrorCode::TaskCreationFailed,
            InstantiateError::TemplateStore { .. } => ErrorCode::TemplateStoreError,
        }
    }

    /// Structured `{code, message}` form for machine consumers.
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        match self {
            InstantiateError::MissingVariables { missing, .. } => {
                body["missing"] = json!(missing);
            }
            InstantiateError::CircularTemplateReference { chain, .. } => {
                body["chain"] = json!(chain);
            }
            InstantiateError::DependencyCycle { cycle } => {
                body["cycle"] = json!(cycle);
            }
            _ => {}
        }
        body
    }

    pub(crate) fn task_creation(template_id: &str, path: &str, err: anyhow::Error) -> Self {
        InstantiateError::TaskCreationFailed {
            template_id: template_id.to_string(),
            path: path.to_string(),
            source: err.into(),
        }
    }

    pub(crate) fn task_lookup(template_id: &str, path: &str, err: anyhow::Error) -> Self {
        InstantiateError::TaskLookupFailed {
            template_id: template_id.to_string(),
            path: path.to_string(),
            source: err.into(),
        }
    }
}

/// Result type for instantiation operations.
pub type TemplateResult<T> = std::result::Result<T, InstantiateError>;
