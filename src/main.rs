use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod engine;
mod freeze;
mod fsutil;
mod project;
mod render;
mod temp;

use cli::{Command, FreezerCommand, RootArgs};
use freeze::{ComputationResult, RecordStatus};
use project::load_project;
use temp::TempFiles;

fn main() -> ExitCode {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: RootArgs) -> Result<ExitCode> {
    match args.command {
        Command::Freeze(args) => {
            let bytes = fs::read(&args.result)
                .with_context(|| format!("read {}", args.result.display()))?;
            let result: ComputationResult =
                serde_json::from_slice(&bytes).context("parse computation result JSON")?;
            let path = freeze::freeze_execute_result(&args.target.input, &args.target.to, &result)?;
            println!("{}", path.display());
        }
        Command::Defrost(args) => {
            let temp = match args.includes_dir.as_deref() {
                Some(dir) => TempFiles::in_dir(dir)?,
                None => TempFiles::new()?,
            };
            let restored = freeze::defrost_execute_result(
                &args.target.input,
                &args.target.to,
                args.force,
                &temp,
            )?;
            let Some(result) = restored else {
                eprintln!("no valid frozen result for {}", args.target.input.display());
                return Ok(ExitCode::FAILURE);
            };
            let text =
                serde_json::to_string_pretty(&result).context("serialize computation result")?;
            println!("{text}");
        }
        Command::Status(args) => {
            let status = freeze::record_status(&args.target.input, &args.target.to)?;
            let path = freeze::freeze_result_file(&args.target.input, &args.target.to, false)?;
            if args.json {
                let mut value =
                    serde_json::to_value(&status).context("serialize record status")?;
                value["record"] = serde_json::Value::from(path.display().to_string());
                let text =
                    serde_json::to_string_pretty(&value).context("serialize record status")?;
                println!("{text}");
            } else {
                print_status(&path, &status);
            }
        }
        Command::Clean(args) => freeze::remove_freeze_results(&args.files_dir)?,
        Command::Freezer(command) => run_freezer(command)?,
        Command::Render(args) => {
            let project = args.project.as_deref().map(load_project).transpose()?;
            let freeze_mode = args.freeze.unwrap_or_else(|| {
                project
                    .as_ref()
                    .map(|project| project.config.freeze)
                    .unwrap_or_default()
            });
            let engine = engine::CommandEngine::new(args.engine);
            let converter = engine::CommandConverter::new(args.converter);
            let request = render::RenderRequest {
                input: &args.target.input,
                output: &args.target.to,
                project: project.as_ref(),
                freeze: freeze_mode,
                hidden_freezer: args.hidden,
            };
            let outcome = render::render(&request, &engine, &converter)?;
            let source = match outcome.source {
                render::ResultSource::Frozen => "frozen",
                render::ResultSource::Computed => "computed",
            };
            println!("{source}");
            if let Some(path) = outcome.record_path {
                println!("record: {}", path.display());
            }
            if let Some(path) = outcome.freezer_record_path {
                println!("freezer: {}", path.display());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_freezer(command: FreezerCommand) -> Result<()> {
    match command {
        FreezerCommand::CopyIn {
            project,
            files_dir,
            incremental,
        } => {
            let context = load_project(&project.project)?;
            let copied =
                freeze::copy_to_project_freezer(&context, &files_dir, project.hidden, incremental)?;
            println!("copied {copied} file(s)");
        }
        FreezerCommand::CopyOut { project, files_dir } => {
            let context = load_project(&project.project)?;
            if !freeze::copy_from_project_freezer(&context, &files_dir, project.hidden)? {
                println!("nothing frozen for {}", files_dir.display());
            }
        }
        FreezerCommand::Prune {
            project,
            files_dir,
            files,
        } => {
            let context = load_project(&project.project)?;
            freeze::prune_project_freezer_dir(&context, &files_dir, &files, project.hidden)?;
        }
        FreezerCommand::PruneAll { project } => {
            let context = load_project(&project.project)?;
            if freeze::prune_project_freezer(&context, project.hidden)? {
                println!("removed freezer");
            }
        }
    }
    Ok(())
}

fn print_status(path: &Path, status: &RecordStatus) {
    println!("record: {}", path.display());
    println!("status: {}", status.label());
    match status {
        RecordStatus::Missing => {}
        RecordStatus::Corrupt { reason } => println!("reason: {reason}"),
        RecordStatus::Stale { stored, current } => {
            println!("stored hash: {stored}");
            println!("current hash: {current}");
        }
        RecordStatus::Fresh { hash } => println!("hash: {hash}"),
    }
}
