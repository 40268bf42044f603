//! Domain-specific error types for the build orchestrator.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`TransformError`]) while command handlers at the CLI boundary convert
//! them to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! ForgeError
//! ├── Config(ConfigError)          loading and validation, before any task runs
//! ├── Resolution(ResolutionError)  unknown task/alias names, alias cycles
//! ├── Template(TemplateError)      strict placeholder rendering
//! └── Task(TaskFailure)            a transform failed for a named task
//! ```

use std::fmt::Write as _;

use thiserror::Error;

/// Top-level error type for the orchestrator.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A requested task or alias could not be resolved.
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// A template could not be rendered in strict mode.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A task failed while running.
    #[error(transparent)]
    Task(#[from] TaskFailure),
}

/// Errors that arise from configuration loading and validation.
///
/// All of these are detected before any task executes.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration, manifest, or license file could not be read.
    #[error("IO error reading {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration or manifest file has invalid syntax or shape.
    #[error("Invalid syntax in {path}: {message}")]
    Parse {
        /// File (or `<inline>`) that failed to parse.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Two tasks or aliases share a name.
    #[error("Duplicate task or alias name '{0}'")]
    DuplicateName(String),

    /// A task names a transform that is not registered.
    #[error("Task '{task}' uses unknown transform '{transform}'")]
    UnknownTransform {
        /// Task declaring the transform.
        task: String,
        /// Transform name that was not found.
        transform: String,
    },

    /// An alias step names neither a task nor an alias.
    #[error("Alias '{alias}' references unknown task or alias '{step}'")]
    DanglingReference {
        /// Alias containing the bad step.
        alias: String,
        /// Step that could not be found.
        step: String,
    },

    /// Alias expansion would never terminate.
    #[error("Alias cycle detected: {}", .0.join(" → "))]
    AliasCycle(Vec<String>),

    /// Two tasks publish to the same destination.
    #[error("Tasks '{first}' and '{second}' both write to {destination}")]
    DuplicateDestination {
        /// Rendered destination path.
        destination: String,
        /// First task declaring it.
        first: String,
        /// Second task declaring it.
        second: String,
    },

    /// A path template on a task references an unknown placeholder.
    #[error("Task '{task}' {field}: {source}")]
    Template {
        /// Task owning the template.
        task: String,
        /// Field that was rendered (`sources` or `destination`).
        field: &'static str,
        /// Underlying template error.
        source: TemplateError,
    },
}

/// Errors that arise when resolving requested task names.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// The requested name is neither a task nor an alias.
    #[error("Unknown task or alias '{0}'")]
    UnknownName(String),

    /// Alias expansion re-entered an alias that is still being expanded.
    #[error("Alias cycle detected: {}", .0.join(" → "))]
    Cycle(Vec<String>),
}

/// Errors that arise from strict template rendering.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A placeholder has no value in the template context.
    #[error("unresolved placeholder '{0}'")]
    Unresolved(String),
}

/// A task failed; carries the task name and the transform error.
#[derive(Error, Debug)]
#[error("Task '{task}' failed: {source}")]
pub struct TaskFailure {
    /// Name of the task that failed.
    pub task: String,
    /// Underlying transform error.
    pub source: TransformError,
}

/// Errors produced while running a single transform.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The linter found one or more violations across the source set.
    #[error("{}", format_violations(.0))]
    Lint(Vec<LintViolation>),

    /// The bundler could not build a flat load order.
    #[error("bundle failed: {0}")]
    Bundle(#[from] BundleError),

    /// The minifier could not rewrite its input.
    #[error("minify failed: {0}")]
    Minify(#[from] MinifyError),

    /// Documentation could not be extracted.
    #[error("docgen failed: {0}")]
    Doc(#[from] DocError),

    /// A source could not be read or a destination could not be written.
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved in the failure.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A source is produced by another task whose output does not exist yet.
    #[error("source {path} is produced by task '{producer}', which has not run")]
    MissingUpstream {
        /// Missing source path.
        path: String,
        /// Task whose destination is `path`.
        producer: String,
    },

    /// The task's options are not valid for this transform.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A task option template could not be rendered in strict mode.
    #[error("option template: {0}")]
    Template(#[from] TemplateError),

    /// An external program failed.
    #[error("external command failed: {0}")]
    Exec(String),
}

/// A single lint rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintViolation {
    /// File the violation was found in.
    pub file: String,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
    /// Rule name (e.g. `eqeqeq`).
    pub rule: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl std::fmt::Display for LintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{} [{}] {}",
            self.file, self.line, self.column, self.rule, self.message
        )
    }
}

fn format_violations(violations: &[LintViolation]) -> String {
    let mut out = format!("{} lint violation(s)", violations.len());
    for v in violations {
        let _ = write!(out, "\n  {v}");
    }
    out
}

/// Errors that arise while bundling modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// A `require` call points at a module that does not exist.
    #[error("module '{specifier}' required from {from} not found")]
    MissingModule {
        /// Specifier as written in the source.
        specifier: String,
        /// Requiring module.
        from: String,
    },

    /// A bare specifier that is not declared external.
    #[error("cannot resolve '{specifier}' required from {from} (not a relative path)")]
    Unresolvable {
        /// Specifier as written in the source.
        specifier: String,
        /// Requiring module.
        from: String,
    },

    /// The module graph cannot be flattened into a load order.
    #[error("dependency cycle: {}", .0.join(" → "))]
    Cycle(Vec<String>),

    /// The task declares no entry module.
    #[error("no entry module given")]
    NoEntry,

    /// A module could not be scanned for `require` calls.
    #[error("unterminated {what} in {file} starting on line {line}")]
    Syntax {
        /// Module being scanned.
        file: String,
        /// Kind of construct (`string`, `comment`, …).
        what: &'static str,
        /// 1-based starting line.
        line: usize,
    },
}

/// Errors that arise while minifying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinifyError {
    /// A literal or comment runs to the end of input.
    #[error("unterminated {what} in {file} starting on line {line}")]
    Unterminated {
        /// Source file.
        file: String,
        /// Kind of construct (`string`, `comment`, …).
        what: &'static str,
        /// 1-based starting line.
        line: usize,
    },
}

/// Errors that arise while extracting documentation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocError {
    /// A comment or literal is never closed, so doc comments cannot be found.
    #[error("unterminated {what} in {file} starting on line {line}")]
    Unterminated {
        /// Source file.
        file: String,
        /// Kind of construct (`comment`, `string`, …).
        what: &'static str,
        /// 1-based starting line.
        line: usize,
    },

    /// Documentation needs a destination directory.
    #[error("no destination directory given")]
    NoDestination,
}
