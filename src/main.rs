use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use jsforge::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    if matches!(args.command, cli::Command::Version) {
        commands::version::run();
        return Ok(());
    }

    let name = args.command.name();
    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(logging::Logger::new(name));

    match args.command {
        cli::Command::Run(opts) => commands::run::run(&args.global, &opts, &log),
        cli::Command::List => commands::list::run(&args.global, &log),
        cli::Command::Check => commands::check::run(&args.global, &log),
        cli::Command::Version => Ok(()),
    }
}
