//! CLI argument parsing for the freeze cache.
//!
//! The CLI is thin: each command maps onto one freeze-cache operation so the
//! same logic stays usable from a render pipeline.
use crate::project::FreezeMode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docfreeze",
    version,
    about = "Content-hashed freeze cache for document computation results",
    after_help = "Examples:\n  docfreeze freeze --input doc.md --to html --result result.json\n  docfreeze defrost --input doc.md --to html\n  docfreeze status --input doc.md --to html --json\n  docfreeze freezer copy-in --project . --files-dir posts/doc_files --incremental\n  docfreeze render --input doc.md --to html --engine ./run.sh --converter ./convert.sh --freeze auto",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log cache decisions at debug level
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Freeze(FreezeArgs),
    Defrost(DefrostArgs),
    Status(StatusArgs),
    Clean(CleanArgs),
    #[command(subcommand)]
    Freezer(FreezerCommand),
    Render(RenderArgs),
}

/// Input document and output format shared by record commands.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Input document
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output file or bare format extension (e.g. html)
    #[arg(long, value_name = "EXT")]
    pub to: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Write a frozen record for an input and output format")]
pub struct FreezeArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Computation result JSON to freeze
    #[arg(long, value_name = "FILE")]
    pub result: PathBuf,
}

#[derive(Parser, Debug)]
#[command(about = "Print the frozen result if it is still valid")]
pub struct DefrostArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Use the record even if the input changed
    #[arg(long)]
    pub force: bool,

    /// Keep materialized include files in this directory
    #[arg(long, value_name = "DIR")]
    pub includes_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Report whether the frozen record is fresh, stale, corrupt, or missing")]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Remove frozen results (current and legacy layouts) from a files directory")]
pub struct CleanArgs {
    /// Files directory (e.g. posts/doc_files)
    #[arg(long, value_name = "DIR")]
    pub files_dir: PathBuf,
}

/// Project and freezer visibility shared by freezer commands.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Project root
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    /// Use the freezer in the hidden scratch area instead of _freeze/
    #[arg(long)]
    pub hidden: bool,
}

#[derive(Subcommand, Debug)]
#[command(about = "Manage the project freezer")]
pub enum FreezerCommand {
    /// Copy a files directory into the freezer
    CopyIn {
        #[command(flatten)]
        project: ProjectArgs,
        /// Files directory relative to the project root
        #[arg(long, value_name = "DIR")]
        files_dir: PathBuf,
        /// Only add or overwrite individual records
        #[arg(long)]
        incremental: bool,
    },
    /// Seed a files directory from the freezer
    CopyOut {
        #[command(flatten)]
        project: ProjectArgs,
        /// Files directory relative to the project root
        #[arg(long, value_name = "DIR")]
        files_dir: PathBuf,
    },
    /// Remove entries from a freezer subtree
    Prune {
        #[command(flatten)]
        project: ProjectArgs,
        /// Files directory relative to the project root
        #[arg(long, value_name = "DIR")]
        files_dir: PathBuf,
        /// Entries to remove, relative to the freezer subtree
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,
    },
    /// Remove the freezer root if nothing but the library dir remains
    PruneAll {
        #[command(flatten)]
        project: ProjectArgs,
    },
}

#[derive(Parser, Debug)]
#[command(about = "Render an input through an engine and converter, reusing frozen results")]
pub struct RenderArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Engine command; receives input and output paths, prints result JSON
    #[arg(long, value_name = "CMD")]
    pub engine: String,

    /// Converter command; receives input and output paths, result JSON on stdin
    #[arg(long, value_name = "CMD")]
    pub converter: String,

    /// Project root enabling the freezer (defaults to no project)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Freeze mode: auto, true, or false (defaults to the project config)
    #[arg(long, value_name = "MODE")]
    pub freeze: Option<FreezeMode>,

    /// Use the freezer in the hidden scratch area instead of _freeze/
    #[arg(long)]
    pub hidden: bool,
}
