//! Command: run tasks and aliases.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, RunOpts};
use crate::config::DEFAULT_ALIAS;
use crate::logging::{Log, Logger};
use crate::orchestrator::Orchestrator;

/// Run the requested names (or the `default` alias), print the summary, and
/// fail if the run failed.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a name cannot be
/// resolved, or a task fails.
pub fn run(global: &GlobalOpts, opts: &RunOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;

    let names: Vec<&str> = if opts.tasks.is_empty() {
        vec![DEFAULT_ALIAS]
    } else {
        opts.tasks.iter().map(String::as_str).collect()
    };
    if global.dry_run {
        log.info("dry run: nothing will be written");
    }

    let ctx = setup.context(Arc::clone(log) as Arc<dyn Log>, global.dry_run);
    let report = Orchestrator::new(ctx).run(&names);

    log.print_summary(&report.summary());
    report.into_result()?;
    Ok(())
}
