//! Pluggable file-to-file transforms and the name-keyed registry that holds them.
//!
//! A transform is a pure function from source contents and options to output
//! contents. Reading sources and publishing outputs is the orchestrator's job,
//! so a transform never touches the file system (the `exec` transform is the
//! one exception: it hands paths to an external program).
//!
//! Built-ins:
//!
//! - [`lint`]: rule checks over every source, all violations aggregated
//! - [`bundle`]: CommonJS dependency ordering into one self-contained file
//! - [`minify`]: behaviour-preserving compaction with a banner
//! - [`docgen`]: Markdown pages from `/** … */` comments
//! - [`exec`]: run an external program as a transform
pub mod bundle;
pub mod docgen;
pub mod exec;
pub(crate) mod lexer;
pub mod lint;
pub mod minify;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::TransformError;

/// Registry name of the lint transform.
pub const LINT: &str = "lint";
/// Registry name of the bundle transform.
pub const BUNDLE: &str = "bundle";
/// Registry name of the minify transform.
pub const MINIFY: &str = "minify";
/// Registry name of the documentation transform.
pub const DOCGEN: &str = "docgen";
/// Registry name of the external command transform.
pub const EXEC: &str = "exec";

/// A source file handed to a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root (or absolute if declared so).
    pub path: PathBuf,
    /// File contents.
    pub contents: String,
}

impl SourceFile {
    /// Create a source file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Display form of the path, with forward slashes.
    #[must_use]
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }
}

/// Everything a transform needs for one task invocation.
#[derive(Debug, Clone, Default)]
pub struct TransformInput {
    /// Name of the task being run.
    pub task: String,
    /// Project root; relative paths are resolved against it.
    pub root: PathBuf,
    /// Sources in declared order, globs expanded.
    pub sources: Vec<SourceFile>,
    /// Rendered destination, if the task declares one.
    pub destination: Option<PathBuf>,
    /// Rendered options.
    pub options: Map<String, Value>,
}

impl TransformInput {
    /// Deserialize the options into a transform's typed option struct.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidOptions`] if the options have the
    /// wrong shape or contain unknown keys (when the struct denies them).
    pub fn parse_options<T: DeserializeOwned>(&self) -> Result<T, TransformError> {
        serde_json::from_value(Value::Object(self.options.clone()))
            .map_err(|e| TransformError::InvalidOptions(e.to_string()))
    }

    /// The destination, or an [`TransformError::InvalidOptions`] if absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the task declares no destination.
    pub fn require_destination(&self) -> Result<&PathBuf, TransformError> {
        self.destination.as_ref().ok_or_else(|| {
            TransformError::InvalidOptions(format!("task '{}' needs a destination", self.task))
        })
    }
}

/// A file produced by a transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Destination path (relative to the project root, or absolute).
    pub path: PathBuf,
    /// Contents to publish.
    pub contents: String,
}

/// Result of a successful transform: zero or more files to publish.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    /// Files to publish, in order.
    pub files: Vec<OutputFile>,
}

impl TransformOutput {
    /// An output with no files (e.g. a passing lint).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// An output with a single file.
    #[must_use]
    pub fn single(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            files: vec![OutputFile {
                path: path.into(),
                contents: contents.into(),
            }],
        }
    }
}

/// A named, pluggable transform.
///
/// Implementations must be deterministic for a given input and must not
/// write files themselves; outputs are published by the orchestrator.
#[cfg_attr(test, mockall::automock)]
pub trait Transform: Send + Sync {
    /// One-line description shown by `jsforge list`.
    fn description(&self) -> &'static str {
        ""
    }

    /// Run the transform.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] describing why no output was produced.
    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError>;
}

/// Name-keyed table of transforms.
///
/// New transforms can be registered without touching the task graph or the
/// orchestrator; tasks refer to them by name.
#[derive(Default)]
pub struct TransformRegistry {
    transforms: BTreeMap<String, Box<dyn Transform>>,
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in transform.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(LINT, lint::Lint);
        registry.register(BUNDLE, bundle::Bundle);
        registry.register(MINIFY, minify::Minify);
        registry.register(DOCGEN, docgen::DocGen);
        registry.register(EXEC, exec::Exec);
        registry
    }

    /// Add a transform, replacing any existing one with the same name.
    pub fn register(&mut self, name: impl Into<String>, transform: impl Transform + 'static) {
        self.register_boxed(name, Box::new(transform));
    }

    /// Add an already boxed transform.
    pub fn register_boxed(&mut self, name: impl Into<String>, transform: Box<dyn Transform>) {
        self.transforms.insert(name.into(), transform);
    }

    /// Look up a transform by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Transform> {
        self.transforms.get(name).map(Box::as_ref)
    }

    /// Whether a transform with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Registered names with their descriptions, in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.transforms
            .iter()
            .map(|(name, t)| (name.as_str(), t.description()))
    }
}
