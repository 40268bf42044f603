//! Task graph utilities: alias expansion, cycle detection, and data-flow
//! edges between tasks.

use std::collections::HashMap;
use std::path::Path;

use crate::config::{AliasDefinition, Config, TaskDefinition};
use crate::error::ResolutionError;
use crate::fs::normalize;
use crate::tasks::sources::is_glob;

/// Resolve requested task and alias names into the ordered list of tasks to
/// run.
///
/// Aliases are expanded depth-first in declared order and spliced in place.
/// Only immediately adjacent repeats are collapsed, so a task requested
/// twice with something in between runs twice.
///
/// # Errors
///
/// Returns [`ResolutionError::UnknownName`] for a name that is neither a task
/// nor an alias, and [`ResolutionError::Cycle`] if alias expansion re-enters
/// an alias that is still being expanded.
pub fn resolve<'a, S: AsRef<str>>(
    config: &'a Config,
    requested: &[S],
) -> Result<Vec<&'a TaskDefinition>, ResolutionError> {
    let mut out = Vec::new();
    let mut expanding = Vec::new();
    for name in requested {
        expand(config, name.as_ref(), &mut expanding, &mut out)?;
    }
    Ok(out)
}

fn expand<'a>(
    config: &'a Config,
    name: &str,
    expanding: &mut Vec<String>,
    out: &mut Vec<&'a TaskDefinition>,
) -> Result<(), ResolutionError> {
    if let Some(task) = config.task(name) {
        if out.last().is_none_or(|last| last.name != task.name) {
            out.push(task);
        }
        return Ok(());
    }
    let alias = config
        .alias(name)
        .ok_or_else(|| ResolutionError::UnknownName(name.to_string()))?;
    if let Some(start) = expanding.iter().position(|n| n == name) {
        let mut chain = expanding.get(start..).unwrap_or_default().to_vec();
        chain.push(name.to_string());
        return Err(ResolutionError::Cycle(chain));
    }
    expanding.push(name.to_string());
    for step in &alias.steps {
        expand(config, step, expanding, out)?;
    }
    expanding.pop();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    InProgress,
    Done,
}

/// Find a cycle among alias references using a three-color depth-first
/// search. Returns the chain, first name repeated at the end
/// (`a → b → a`), or `None` if the alias graph is acyclic.
#[must_use]
pub fn find_alias_cycle(aliases: &[AliasDefinition]) -> Option<Vec<String>> {
    let by_name: HashMap<&str, &AliasDefinition> =
        aliases.iter().map(|a| (a.name.as_str(), a)).collect();
    let mut colors: HashMap<&str, Color> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();

    for alias in aliases {
        if !colors.contains_key(alias.name.as_str())
            && let Some(cycle) = visit(alias, &by_name, &mut colors, &mut path)
        {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(
    alias: &'a AliasDefinition,
    by_name: &HashMap<&'a str, &'a AliasDefinition>,
    colors: &mut HashMap<&'a str, Color>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    colors.insert(alias.name.as_str(), Color::InProgress);
    path.push(alias.name.as_str());

    for step in &alias.steps {
        let Some(next) = by_name.get(step.as_str()) else {
            continue;
        };
        match colors.get(step.as_str()) {
            Some(Color::Done) => {}
            Some(Color::InProgress) => {
                let start = path.iter().position(|n| *n == step.as_str()).unwrap_or_default();
                let mut chain: Vec<String> = path
                    .get(start..)
                    .unwrap_or_default()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                chain.push(step.clone());
                return Some(chain);
            }
            None => {
                if let Some(cycle) = visit(next, by_name, colors, path) {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    colors.insert(alias.name.as_str(), Color::Done);
    None
}

/// Tasks whose destination feeds one of `task`'s sources, in declaration
/// order.
///
/// A literal source matches a destination with the same normalised path; a
/// glob source matches any destination it would expand to.
#[must_use]
pub fn upstream<'a>(config: &'a Config, task: &TaskDefinition) -> Vec<&'a TaskDefinition> {
    let feeds = |dest: &Path| {
        let dest = normalize(dest);
        task.sources.iter().any(|source| {
            if is_glob(source) {
                glob::Pattern::new(source).is_ok_and(|p| p.matches_path(&dest))
            } else {
                normalize(Path::new(source)) == dest
            }
        })
    };
    config
        .tasks
        .iter()
        .filter(|t| t.name != task.name)
        .filter(|t| t.destination.as_deref().is_some_and(feeds))
        .collect()
}
