//! CLI command definitions for task-templates
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod instantiate;

use crate::format::OutputFormat;
use clap::{Args, Parser, Subcommand};
use instantiate::InstantiateArgs;
use std::path::PathBuf;

/// Expand task templates into dependency-ordered task trees
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Template directory (overrides config)
    #[arg(short, long, global = true)]
    pub templates: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available templates
    Templates(TemplatesArgs),

    /// Instantiate a template into the task store
    Instantiate(InstantiateArgs),

    /// List stored tasks
    Tasks(TasksArgs),
}

/// Arguments for the templates subcommand
#[derive(Args, Debug)]
pub struct TemplatesArgs {
    /// Only list templates carrying this tag
    #[arg(long)]
    pub tag: Option<String>,
}

/// Arguments for the tasks subcommand
#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Only list the subtree rooted at this path
    #[arg(long)]
    pub prefix: Option<String>,
}
