use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use taskflow_engine::{
    ChoiceOption, ChoicePresenter, DemoGameEffects, ScriptedPresenter, VariableStore, Workflow, load_workflow_file,
};
use taskflow_types::ValidationMode;
use taskflow_util::{LoadedConfig, TaskflowConfig};
use tracing::error;

mod console;

use console::{ConsoleLogSink, ConsolePresenter};

/// Run data-driven task workflows from XML, YAML, or JSON documents.
#[derive(Parser, Debug)]
#[command(name = "taskflow", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run workflow files in order over one shared variable store
    Run(RunArgs),
    /// Check workflow files against the task schema
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the configuration file path and the effective settings
    Show,
    /// Write the default settings to the configuration file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Workflow documents, run in the order given
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Schema policy: none, warn-only, or fail-fast (defaults to the configured mode)
    #[arg(long)]
    validation: Option<ValidationMode>,

    /// Answer choices from this list (1, 2, a, b) instead of prompting
    #[arg(long, value_delimiter = ',')]
    choose: Vec<ChoiceOption>,

    /// Print the variable store after each workflow
    #[arg(long)]
    snapshot: bool,

    /// Print snapshots and run reports as JSON (implies --snapshot)
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = TaskflowConfig::load().context("failed to load taskflow configuration")?;
    init_tracing(loaded.config.log_filter.as_deref());
    loaded.log_problems();

    match cli.command {
        Command::Run(args) => run_workflows(args, &loaded.config),
        Command::Validate { files } => validate_workflows(&files, &loaded.config),
        Command::Config { action } => match action {
            ConfigAction::Show => show_config(&loaded),
            ConfigAction::Init { force } => init_config(&loaded.path, &TaskflowConfig::default(), force),
        },
    }
}

fn init_tracing(configured: Option<&str>) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_all(files: &[PathBuf], mode: ValidationMode, config: &TaskflowConfig) -> Result<Vec<Workflow>> {
    files
        .iter()
        .map(|file| {
            let path = config.resolve_workflow_path(file);
            load_workflow_file(&path, mode).with_context(|| format!("failed to load workflow '{}'", path.display()))
        })
        .collect()
}

fn run_workflows(args: RunArgs, config: &TaskflowConfig) -> Result<()> {
    let mode = args.validation.unwrap_or(config.validation_mode);
    let show_snapshot = args.snapshot || args.json;
    let workflows = load_all(&args.files, mode, config)?;

    let mut store = VariableStore::new();
    let mut effects = DemoGameEffects;
    let mut log = ConsoleLogSink::stdout();
    let mut presenter: Box<dyn ChoicePresenter> = if args.choose.is_empty() {
        Box::new(ConsolePresenter::stdio())
    } else {
        Box::new(ScriptedPresenter::new(args.choose.iter().copied()))
    };

    for workflow in &workflows {
        let result = workflow.run_with_log(&mut store, presenter.as_mut(), &mut effects, &mut log);
        match result {
            Ok(report) => {
                if show_snapshot {
                    print_snapshot(workflow.id(), &store, Some(&report), args.json)?;
                }
            }
            Err(run_error) => {
                error!(workflow = %workflow.id(), error = %run_error, "workflow failed");
                if show_snapshot {
                    print_snapshot(workflow.id(), &store, None, args.json)?;
                }
                return Err(run_error).with_context(|| format!("workflow '{}' failed", workflow.id()));
            }
        }
    }
    Ok(())
}

fn print_snapshot(workflow_id: &str, store: &VariableStore, report: Option<&taskflow_engine::RunReport>, json: bool) -> Result<()> {
    if json {
        let payload = serde_json::json!({
            "workflow": workflow_id,
            "completed": report.is_some(),
            "report": report,
            "variables": store,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("--- variables after '{workflow_id}' ---");
    if store.is_empty() {
        println!("(empty)");
    }
    for (key, value) in store.iter() {
        println!("{key}={value}");
    }
    Ok(())
}

fn validate_workflows(files: &[PathBuf], config: &TaskflowConfig) -> Result<()> {
    let mut failures = 0;
    for file in files {
        let path = config.resolve_workflow_path(file);
        match load_workflow_file(&path, ValidationMode::FailFast) {
            Ok(workflow) => println!(
                "ok   {} (workflow '{}', {} tasks)",
                path.display(),
                workflow.id(),
                workflow.catalog().len()
            ),
            Err(load_error) => {
                failures += 1;
                println!("FAIL {}: {load_error}", path.display());
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} workflow file(s) failed validation", files.len());
    }
    Ok(())
}

fn show_config(loaded: &LoadedConfig) -> Result<()> {
    println!("# {}", loaded.path.display());
    println!("{}", serde_json::to_string_pretty(&loaded.config)?);
    Ok(())
}

fn init_config(path: &Path, config: &TaskflowConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("config file '{}' already exists; pass --force to replace it", path.display());
    }
    config
        .save_to(path)
        .with_context(|| format!("failed to write config file '{}'", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}
