//! Shelf - plan, apply, and roll back music library reorganizations
mod config;
mod options;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crate::config::ShelfConfig;
use serde::Serialize;
use shelf_metadata::FfprobeTool;
use shelf_workflow::{PreviewItem, Workflow, WorkflowContext, WorkflowError, WorkflowResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "shelf=info,shelf_workflow=info,shelf_metadata=warn";

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Organize, merge, and deduplicate music libraries", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./shelf.toml when present)
    #[arg(short, long, global = true, env = "SHELF_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
pub struct OptionArgs {
    /// Options bundle as a JSON or TOML file
    #[arg(short, long)]
    pub options: Option<PathBuf>,

    /// Set a single option, overriding the file
    #[arg(short, long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a plan and print its preview without touching any file
    Plan {
        /// cleaner, merge, or dedup
        workflow: Workflow,

        #[command(flatten)]
        options: OptionArgs,

        /// Print the complete plan instead of the preview
        #[arg(long)]
        full: bool,
    },
    /// Build a plan and carry it out
    Apply {
        /// cleaner, merge, or dedup
        workflow: Workflow,

        #[command(flatten)]
        options: OptionArgs,
    },
    /// Run a rollback script written by an earlier apply
    Rollback {
        /// cleaner, merge, or dedup
        workflow: Workflow,

        /// Rollback script path
        #[arg(short, long)]
        script: PathBuf,
    },
    /// List the options a workflow recognizes
    Options {
        /// cleaner, merge, or dedup
        workflow: Workflow,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            match err.downcast_ref::<WorkflowError>() {
                Some(WorkflowError::Validation(_)) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = ShelfConfig::load(cli.config.as_deref())?;
    config.validate()?;
    init_tracing(&config);

    tracing::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Plan {
            workflow,
            options: args,
            full,
        } => {
            let raw = options::collect(&args, workflow, &config)?;
            let ctx = context(&config);
            let plan = workflow.build_plan(&raw, &ctx)?;
            if full {
                print_json(&plan)?;
            } else {
                print_items(&workflow.preview(&plan, &ctx)?)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Apply {
            workflow,
            options: args,
        } => {
            let raw = options::collect(&args, workflow, &config)?;
            let ctx = context(&config);
            let plan = workflow.build_plan(&raw, &ctx)?;
            let result = workflow.apply(&raw, plan, &ctx)?;
            report(&result)
        }
        Commands::Rollback { workflow, script } => {
            let result = workflow.rollback(&script)?;
            report(&result)
        }
        Commands::Options { workflow } => {
            let definitions: Vec<_> = workflow
                .option_definitions()
                .into_iter()
                .map(|definition| (definition.key, definition.label, definition.default))
                .collect();
            print_json(&definitions)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(config: &ShelfConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| match &config.log_level {
            Some(level) => EnvFilter::try_new(level),
            None => EnvFilter::try_new(DEFAULT_LOG_FILTER),
        })
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn context(config: &ShelfConfig) -> WorkflowContext {
    WorkflowContext::new(Box::new(FfprobeTool::new(config.ffprobe_path.clone())))
        .with_preview_limit(config.preview_limit)
}

fn report(result: &WorkflowResult) -> Result<ExitCode> {
    print_items(&result.summary_items)?;
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_items(items: &[PreviewItem]) -> Result<()> {
    print_json(items)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}
