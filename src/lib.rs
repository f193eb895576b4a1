//! Task Templates Library
//!
//! Expands parameterized task templates into hierarchical,
//! dependency-ordered task graphs. This module exports the core
//! components for the CLI, testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod instantiate;
pub mod interpolate;
pub mod logging;
pub mod metadata;
pub mod paths;
pub mod store;
pub mod templates;
pub mod types;

pub use error::{ErrorCode, InstantiateError, TemplateResult};
pub use instantiate::{CreatedTask, InstantiateResult, TemplateManager};
