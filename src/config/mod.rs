//! Build configuration: package metadata, tasks, and aliases.
//!
//! A [`Config`] is loaded once per process, validated in full before any
//! task runs, and then shared read-only.
pub mod loader;
pub mod manifest;
pub mod validation;

pub use loader::Format;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::fs::normalize;
use crate::template::{self, TemplateContext};
use crate::transforms::{BUNDLE, LINT, MINIFY, TransformRegistry};

/// Default configuration file name, looked up in the project root.
pub const DEFAULT_FILE: &str = "jsforge.toml";

/// Name of the alias run when no task is requested.
pub const DEFAULT_ALIAS: &str = "default";

/// Package identity used in templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Package name, the `name` placeholder.
    pub name: String,
    /// Package version, the `VERSION` and `version` placeholders.
    pub version: String,
}

/// A named unit of work: one transform applied to a set of sources.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    /// Unique task name.
    pub name: String,
    /// Registry name of the transform to apply.
    pub transform: String,
    /// Rendered source paths or glob patterns, relative to the root.
    pub sources: Vec<String>,
    /// Rendered destination, relative to the root.
    pub destination: Option<PathBuf>,
    /// Options as written; rendered when the task runs.
    pub options: Map<String, Value>,
    /// Render options strictly, failing on unresolved placeholders.
    pub strict_templates: bool,
    /// Free-form description shown by `jsforge list`.
    pub description: Option<String>,
}

/// A named, ordered list of task or alias names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDefinition {
    /// Alias name; never shared with a task.
    pub name: String,
    /// Task or alias names, expanded in order.
    pub steps: Vec<String>,
    /// Registered automatically rather than declared in the file.
    pub builtin: bool,
}

/// Fully loaded and validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Project root; sources and destinations are relative to it.
    pub root: PathBuf,
    /// Name and version from the file, the manifest, or the defaults.
    pub package: Package,
    /// License text (or identifier) available as `license`/`licence`.
    pub license: String,
    /// Tasks in declaration order.
    pub tasks: Vec<TaskDefinition>,
    /// User aliases in declaration order, then built-ins.
    pub aliases: Vec<AliasDefinition>,
    /// Placeholder values for templates.
    pub template: TemplateContext,
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file (or a referenced manifest or
    /// license file) cannot be read or parsed, or if validation fails.
    pub fn load(
        path: &Path,
        root: &Path,
        registry: &TransformRegistry,
    ) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(
            &text,
            Format::from_path(path),
            root,
            registry,
            &path.display().to_string(),
        )
    }

    /// Load and validate configuration from an in-memory string.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn from_str(
        text: &str,
        format: Format,
        root: &Path,
        registry: &TransformRegistry,
    ) -> Result<Self, ConfigError> {
        Self::parse(text, format, root, registry, "<inline>")
    }

    fn parse(
        text: &str,
        format: Format,
        root: &Path,
        registry: &TransformRegistry,
        origin: &str,
    ) -> Result<Self, ConfigError> {
        let parsed = loader::parse(text, format, origin)?;
        let raw = parsed.raw;

        let manifest = raw
            .package
            .manifest
            .as_deref()
            .map(|m| manifest::load(root, m))
            .transpose()?
            .unwrap_or_default();

        let package = Package {
            name: raw
                .package
                .name
                .or(manifest.name)
                .unwrap_or_else(|| default_name(root)),
            version: raw
                .package
                .version
                .or(manifest.version)
                .unwrap_or_else(|| "0.0.0".to_string()),
        };

        let license = match (raw.license, raw.license_file) {
            (Some(text), _) => text,
            (None, Some(file)) => loader::read_relative(root, &file)?,
            (None, None) => manifest.license.unwrap_or_default(),
        };

        let template = template_context(&package, &license, &raw.context);

        let tasks = parsed
            .tasks
            .into_iter()
            .map(|(name, raw)| {
                let render = |field: &'static str, value: &str| {
                    template::render_strict(value, &template).map_err(|source| {
                        ConfigError::Template {
                            task: name.clone(),
                            field,
                            source,
                        }
                    })
                };
                let sources = raw
                    .sources
                    .into_vec()
                    .iter()
                    .map(|s| render("sources", s))
                    .collect::<Result<Vec<_>, _>>()?;
                let destination = raw
                    .destination
                    .as_deref()
                    .map(|d| render("destination", d).map(PathBuf::from))
                    .transpose()?;
                Ok(TaskDefinition {
                    transform: raw.transform.unwrap_or_else(|| name.clone()),
                    name,
                    sources,
                    destination,
                    options: raw.options,
                    strict_templates: raw.strict_templates,
                    description: raw.description,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let mut aliases: Vec<AliasDefinition> = parsed
            .aliases
            .into_iter()
            .map(|(name, steps)| AliasDefinition {
                name,
                steps,
                builtin: false,
            })
            .collect();
        let builtins = builtin_aliases(&tasks, &aliases);
        aliases.extend(builtins);

        validation::validate(&tasks, &aliases, registry)?;

        Ok(Self {
            root: root.to_path_buf(),
            package,
            license,
            tasks,
            aliases,
            template,
        })
    }

    /// Look up a task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Look up an alias by name.
    #[must_use]
    pub fn alias(&self, name: &str) -> Option<&AliasDefinition> {
        self.aliases.iter().find(|a| a.name == name)
    }

    /// The task whose destination is `path` (relative to the root), if any.
    #[must_use]
    pub fn producer_of(&self, path: &Path) -> Option<&TaskDefinition> {
        let wanted = normalize(path);
        self.tasks.iter().find(|t| {
            t.destination
                .as_deref()
                .is_some_and(|d| normalize(d) == wanted)
        })
    }

    /// Resolve a root-relative path to an absolute one.
    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

fn default_name(root: &Path) -> String {
    root.file_name()
        .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned())
}

/// Build the template context from package metadata and `[context]`.
///
/// `[context]` values may reference the metadata keys; unresolved
/// placeholders in them are left as written.
fn template_context(
    package: &Package,
    license: &str,
    extra: &BTreeMap<String, String>,
) -> TemplateContext {
    let base = TemplateContext::new()
        .with("name", package.name.as_str())
        .with("pkg.name", package.name.as_str())
        .with("version", package.version.as_str())
        .with("VERSION", package.version.as_str())
        .with("pkg.version", package.version.as_str())
        .with("license", license)
        .with("licence", license);
    let mut ctx = base.clone();
    for (key, value) in extra {
        ctx.insert(key.as_str(), template::render(value, &base));
    }
    ctx
}

/// Aliases registered when their name is free: `lint` runs every lint
/// task, `build` runs lint then bundle then minify tasks, `default` runs
/// `build`.
fn builtin_aliases(tasks: &[TaskDefinition], user: &[AliasDefinition]) -> Vec<AliasDefinition> {
    let of_kind = |kind: &str| -> Vec<String> {
        tasks
            .iter()
            .filter(|t| t.transform == kind)
            .map(|t| t.name.clone())
            .collect()
    };
    let mut out: Vec<AliasDefinition> = Vec::new();
    let taken = |name: &str, out: &[AliasDefinition]| {
        tasks.iter().any(|t| t.name == name)
            || user.iter().any(|a| a.name == name)
            || out.iter().any(|a| a.name == name)
    };

    let lint = of_kind(LINT);
    let mut build = lint.clone();
    build.extend(of_kind(BUNDLE));
    build.extend(of_kind(MINIFY));

    for (name, steps) in [("lint", lint), ("build", build)] {
        if !steps.is_empty() && !taken(name, &out) {
            out.push(AliasDefinition {
                name: name.to_string(),
                steps,
                builtin: true,
            });
        }
    }
    if taken("build", &out) && !taken(DEFAULT_ALIAS, &out) {
        out.push(AliasDefinition {
            name: DEFAULT_ALIAS.to_string(),
            steps: vec!["build".to_string()],
            builtin: true,
        });
    }
    out
}
