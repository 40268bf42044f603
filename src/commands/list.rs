//! Command: list tasks, aliases, and transforms.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::Config;
use crate::logging::Logger;
use crate::tasks::graph;
use crate::transforms::TransformRegistry;

/// Print every task, alias, and registered transform.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    for line in render(&setup.config, &setup.registry) {
        println!("{line}");
    }
    Ok(())
}

/// Render the listing as lines.
#[must_use]
pub fn render(config: &Config, registry: &TransformRegistry) -> Vec<String> {
    let mut lines = vec!["Tasks:".to_string()];
    for task in &config.tasks {
        let mut line = format!("  {} [{}]", task.name, task.transform);
        if !task.sources.is_empty() {
            line.push_str(&format!(" {}", task.sources.join(" ")));
        }
        if let Some(dest) = &task.destination {
            line.push_str(&format!(" -> {}", dest.display()));
        }
        if let Some(description) = &task.description {
            line.push_str(&format!("  # {description}"));
        }
        lines.push(line);
    }

    lines.push("Aliases:".to_string());
    for alias in &config.aliases {
        let pipeline = graph::resolve(config, std::slice::from_ref(&alias.name)).map_or_else(
            |e| format!("<{e}>"),
            |tasks| {
                tasks
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" → ")
            },
        );
        let builtin = if alias.builtin { " (built-in)" } else { "" };
        lines.push(format!(
            "  {} = [{}]{builtin}: {pipeline}",
            alias.name,
            alias.steps.join(", ")
        ));
    }

    lines.push("Transforms:".to_string());
    for (name, description) in registry.entries() {
        lines.push(format!("  {name:<8} {description}"));
    }
    lines
}
