//! Command: validate the configuration without running anything.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::config::validation::{self, ValidationWarning};
use crate::logging::{Log, Logger};
use crate::tasks::graph;

/// Load the configuration (which runs the structural checks), then report
/// non-fatal warnings and each task's upstream tasks.
///
/// Warnings do not fail the command; load errors do.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or validated.
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let warnings = report(&setup.config, log);
    if warnings.is_empty() {
        log.info("configuration OK");
    } else {
        log.warn(&format!(
            "found {} configuration warning(s)",
            warnings.len()
        ));
    }
    Ok(())
}

/// Log the data-flow edges and every warning; return the warnings.
pub fn report(config: &Config, log: &dyn Log) -> Vec<ValidationWarning> {
    log.stage("Checking tasks");
    for task in &config.tasks {
        let upstream = graph::upstream(config, task);
        if !upstream.is_empty() {
            log.debug(&format!(
                "{} reads output of {}",
                task.name,
                upstream
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }

    let warnings = validation::validate_all(config);
    for warning in &warnings {
        log.warn(&format!("{}: {}", warning.task, warning.message));
    }
    warnings
}
