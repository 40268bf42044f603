//! Configuration validation.
//!
//! [`validate`] enforces the structural rules that make a configuration
//! runnable and fails on the first violation. [`ConfigValidator`]
//! implementations look for problems that only show up at run time (missing
//! sources, placeholders that will stay unrendered) and report them as
//! warnings for `jsforge check`.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{AliasDefinition, Config, TaskDefinition};
use crate::error::{ConfigError, TemplateError};
use crate::fs::normalize;
use crate::tasks::{graph, sources};
use crate::template;
use crate::transforms::{EXEC, TransformRegistry};

/// Check names, transforms, alias references, alias cycles and
/// destinations.
///
/// # Errors
///
/// Returns the first [`ConfigError`] found, in that order.
pub fn validate(
    tasks: &[TaskDefinition],
    aliases: &[AliasDefinition],
    registry: &TransformRegistry,
) -> Result<(), ConfigError> {
    let mut names: HashSet<&str> = HashSet::new();
    for name in tasks
        .iter()
        .map(|t| t.name.as_str())
        .chain(aliases.iter().map(|a| a.name.as_str()))
    {
        if !names.insert(name) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
    }

    if let Some(task) = tasks.iter().find(|t| !registry.contains(&t.transform)) {
        return Err(ConfigError::UnknownTransform {
            task: task.name.clone(),
            transform: task.transform.clone(),
        });
    }

    for alias in aliases {
        if let Some(step) = alias.steps.iter().find(|s| !names.contains(s.as_str())) {
            return Err(ConfigError::DanglingReference {
                alias: alias.name.clone(),
                step: step.clone(),
            });
        }
    }

    if let Some(chain) = graph::find_alias_cycle(aliases) {
        return Err(ConfigError::AliasCycle(chain));
    }

    let mut destinations: HashMap<PathBuf, &str> = HashMap::new();
    for task in tasks {
        let Some(dest) = task.destination.as_deref() else {
            continue;
        };
        if let Some(first) = destinations.insert(normalize(dest), &task.name) {
            return Err(ConfigError::DuplicateDestination {
                destination: dest.display().to_string(),
                first: first.to_string(),
                second: task.name.clone(),
            });
        }
    }

    Ok(())
}

/// A non-fatal problem found by `jsforge check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Task the warning is about.
    pub task: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning about `task`.
    #[must_use]
    pub fn new(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, config: &Config) -> Vec<ValidationWarning>;

    /// Return a human-readable name for this validator.
    fn name(&self) -> &'static str;
}

/// Warns about sources that will not exist when their task runs.
///
/// A missing source that another task produces is fine: it only has to
/// exist by the time the consuming task runs.
#[derive(Debug, Default)]
pub struct SourceValidator;

impl ConfigValidator for SourceValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for task in &config.tasks {
            if task.sources.is_empty() && task.transform != EXEC {
                warnings.push(ValidationWarning::new(&task.name, "declares no sources"));
            }
            for pattern in &task.sources {
                if config.producer_of(Path::new(pattern)).is_some() {
                    continue;
                }
                match sources::expand_pattern(&config.root, pattern) {
                    Ok(found) if found.is_empty() => {
                        let message = if sources::is_glob(pattern) {
                            format!("pattern '{pattern}' matches no files")
                        } else {
                            format!("source '{pattern}' does not exist")
                        };
                        warnings.push(ValidationWarning::new(&task.name, message));
                    }
                    Ok(_) => {}
                    Err(e) => warnings.push(ValidationWarning::new(&task.name, e.to_string())),
                }
            }
        }
        warnings
    }

    fn name(&self) -> &'static str {
        "sources"
    }
}

/// Warns about option placeholders that have no value and would be left in
/// the output as written.
#[derive(Debug, Default)]
pub struct OptionTemplateValidator;

impl ConfigValidator for OptionTemplateValidator {
    fn validate(&self, config: &Config) -> Vec<ValidationWarning> {
        config
            .tasks
            .iter()
            .filter_map(|task| {
                let options = Value::Object(task.options.clone());
                match template::render_value(&options, &config.template, true) {
                    Ok(_) => None,
                    Err(TemplateError::Unresolved(token)) => {
                        let severity = if task.strict_templates {
                            "will fail"
                        } else {
                            "will be left as written"
                        };
                        Some(ValidationWarning::new(
                            &task.name,
                            format!("option placeholder '{token}' has no value and {severity}"),
                        ))
                    }
                }
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "option templates"
    }
}

/// Run every validator and collect all warnings.
#[must_use]
pub fn validate_all(config: &Config) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 2] = [&SourceValidator, &OptionTemplateValidator];
    validators.iter().flat_map(|v| v.validate(config)).collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Format;
    use serde_json::Map;
    use tempfile::TempDir;

    fn task(name: &str, transform: &str, destination: Option<&str>) -> TaskDefinition {
        TaskDefinition {
            name: name.to_string(),
            transform: transform.to_string(),
            sources: vec!["src/a.js".to_string()],
            destination: destination.map(PathBuf::from),
            options: Map::new(),
            strict_templates: false,
            description: None,
        }
    }

    fn alias(name: &str, steps: &[&str]) -> AliasDefinition {
        AliasDefinition {
            name: name.to_string(),
            steps: steps.iter().map(ToString::to_string).collect(),
            builtin: false,
        }
    }

    fn check(tasks: &[TaskDefinition], aliases: &[AliasDefinition]) -> Result<(), ConfigError> {
        validate(tasks, aliases, &TransformRegistry::with_builtins())
    }

    // -----------------------------------------------------------------------
    // validate
    // -----------------------------------------------------------------------

    #[test]
    fn accepts_valid_configuration() {
        let tasks = [
            task("lint", "lint", None),
            task("bundle", "bundle", Some("build/a.js")),
        ];
        check(&tasks, &[alias("build", &["lint", "bundle"])]).unwrap();
    }

    #[test]
    fn task_alias_name_collision() {
        let err = check(&[task("lint", "lint", None)], &[alias("lint", &["lint"])]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(ref n) if n == "lint"));
    }

    #[test]
    fn unknown_transform() {
        let err = check(&[task("compress", "uglify", None)], &[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Task 'compress' uses unknown transform 'uglify'"
        );
    }

    #[test]
    fn dangling_alias_step() {
        let err = check(&[task("lint", "lint", None)], &[alias("build", &["lint", "deploy"])])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DanglingReference { ref alias, ref step } if alias == "build" && step == "deploy"
        ));
    }

    #[test]
    fn alias_cycle_names_both_aliases() {
        let err = check(&[], &[alias("a", &["b"]), alias("b", &["a"])]).unwrap_err();
        assert_eq!(err.to_string(), "Alias cycle detected: a → b → a");
    }

    #[test]
    fn duplicate_destination() {
        let tasks = [
            task("bundle", "bundle", Some("build/a.js")),
            task("copy", "exec", Some("./build/a.js")),
        ];
        let err = check(&tasks, &[]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::DuplicateDestination { ref first, ref second, .. }
                if first == "bundle" && second == "copy"
        ));
    }

    // -----------------------------------------------------------------------
    // warnings
    // -----------------------------------------------------------------------

    fn config_in(dir: &Path, text: &str) -> Config {
        Config::from_str(text, Format::Toml, dir, &TransformRegistry::with_builtins()).unwrap()
    }

    #[test]
    fn source_validator_reports_missing_sources() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.js"), "").unwrap();
        let config = config_in(
            dir.path(),
            r#"
            [tasks.lint]
            sources = ["src/*.js", "src/missing.js", "lib/*.js"]

            [tasks.bundle]
            sources = "src/a.js"
            destination = "build/a.js"

            [tasks.minify]
            sources = "build/a.js"
            destination = "build/a.min.js"
            "#,
        );
        let warnings = SourceValidator.validate(&config);
        let messages: Vec<&str> = warnings.iter().map(|w| w.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "source 'src/missing.js' does not exist",
                "pattern 'lib/*.js' matches no files",
            ]
        );
        assert!(warnings.iter().all(|w| w.task == "lint"));
    }

    #[test]
    fn source_validator_reports_empty_sources() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path(), "[tasks.lint]\n");
        let warnings = SourceValidator.validate(&config);
        assert_eq!(warnings, vec![ValidationWarning::new("lint", "declares no sources")]);
    }

    #[test]
    fn option_template_validator_reports_unknown_placeholder() {
        let dir = TempDir::new().unwrap();
        let config = config_in(
            dir.path(),
            r#"
            [package]
            version = "1.0.0"

            [tasks.minify]
            sources = "a.js"
            destination = "a.min.js"
            options = { banner = "/* %%VERSION%% %%BUILD%% */" }
            "#,
        );
        let warnings = OptionTemplateValidator.validate(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("%%BUILD%%"));
        assert!(warnings[0].message.contains("left as written"));
    }

    #[test]
    fn validate_all_collects_every_validator() {
        let dir = TempDir::new().unwrap();
        let config = config_in(
            dir.path(),
            "[tasks.minify]\ndestination = \"a.min.js\"\noptions = { banner = \"%%X%%\" }\n",
        );
        assert_eq!(validate_all(&config).len(), 2);
    }

    #[test]
    fn validator_names() {
        assert_eq!(SourceValidator.name(), "sources");
        assert_eq!(OptionTemplateValidator.name(), "option templates");
    }
}
