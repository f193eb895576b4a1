//! Task Templates CLI
//!
//! Lists templates, instantiates them into a SQLite task store, and
//! shows the resulting task tree.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use task_templates::cli::instantiate::InstantiateArgs;
use task_templates::cli::{Cli, Command, TasksArgs, TemplatesArgs};
use task_templates::config::Config;
use task_templates::db::Database;
use task_templates::format::{self, OutputFormat};
use task_templates::logging::{self, LogTarget};
use task_templates::templates::FileTemplateStore;
use task_templates::{InstantiateError, TemplateManager};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::resolve(cli.config.as_deref())?;

    // Override paths from CLI arguments
    if let Some(ref db_path) = cli.database {
        config.server.db_path = db_path.clone();
    }
    if let Some(ref dir) = cli.templates {
        config.templates.dir = dir.clone();
    }
    debug!(config = ?config, "Configuration resolved");

    match cli.command {
        Command::Templates(ref args) => run_templates(&config, args, cli.format).await,
        Command::Instantiate(ref args) => run_instantiate(&config, args, cli.format).await,
        Command::Tasks(ref args) => run_tasks(&config, args, cli.format),
    }
}

fn open_database(config: &Config) -> Result<Database> {
    config.ensure_db_dir()?;
    Database::open(&config.server.db_path)
        .with_context(|| format!("Failed to open database {:?}", config.server.db_path))
}

fn manager(config: &Config, db: Database) -> TemplateManager {
    let templates = Arc::new(FileTemplateStore::new(config.templates.dir.clone()));
    TemplateManager::new(templates, Arc::new(db))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_templates(config: &Config, args: &TemplatesArgs, format: OutputFormat) -> Result<()> {
    let store = FileTemplateStore::new(config.templates.dir.clone());
    let summaries = task_templates::store::TemplateStore::list_templates(&store, args.tag.as_deref())
        .await
        .with_context(|| format!("Failed to list templates in {:?}", config.templates.dir))?;

    match format {
        OutputFormat::Json => print_json(&summaries),
        OutputFormat::Markdown => {
            print!("{}", format::format_templates_markdown(&summaries));
            Ok(())
        }
    }
}

async fn run_instantiate(
    config: &Config,
    args: &InstantiateArgs,
    format: OutputFormat,
) -> Result<()> {
    let variables = args.variables()?;
    let db = open_database(config)?;
    let manager = manager(config, db);

    if args.dry_run {
        let plan = manager
            .plan(&args.template, variables, args.parent.as_deref())
            .await
            .map_err(report)?;
        return match format {
            OutputFormat::Json => print_json(&plan),
            OutputFormat::Markdown => {
                print!("{}", format::format_plan_markdown(&args.template, &plan));
                Ok(())
            }
        };
    }

    info!(template = %args.template, parent = ?args.parent, "Instantiating template");
    let result = manager
        .instantiate(&args.template, variables, args.parent.as_deref())
        .await
        .map_err(report)?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Markdown => {
            print!("{}", format::format_instantiation_markdown(&result));
            Ok(())
        }
    }
}

fn run_tasks(config: &Config, args: &TasksArgs, format: OutputFormat) -> Result<()> {
    let db = open_database(config)?;
    let tasks = db.list_tasks(args.prefix.as_deref())?;

    match format {
        OutputFormat::Json => print_json(&tasks),
        OutputFormat::Markdown => {
            print!("{}", format::format_tasks_markdown(&tasks));
            Ok(())
        }
    }
}

/// Print the structured error on stdout and hand it back for the exit status.
fn report(err: InstantiateError) -> anyhow::Error {
    let body = err.to_json();
    let rendered = serde_json::to_string_pretty(&body)
        .unwrap_or_else(|_| json!({ "error": err.to_string() }).to_string());
    println!("{}", rendered);
    anyhow::Error::new(err)
}
