use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the build orchestrator.
#[derive(Parser, Debug)]
#[command(
    name = "jsforge",
    about = "Configuration-driven build orchestrator for browser JavaScript libraries",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Configuration file (default: jsforge.toml in the project root; env JSFORGE_CONFIG)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root directory (env JSFORGE_ROOT)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Run transforms but write nothing
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run tasks or aliases in order (default: the `default` alias)
    Run(RunOpts),
    /// List tasks, aliases, and transforms
    List,
    /// Validate the configuration without running anything
    Check,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::List => "list",
            Self::Check => "check",
            Self::Version => "version",
        }
    }
}

/// Options for the `run` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RunOpts {
    /// Task or alias names, run in the order given
    pub tasks: Vec<String>,
}
