// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed project and a fluent builder so each
// integration test can set up an isolated build without repeating
// filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use jsforge::config::{self, Config};
use jsforge::logging::Log;
use jsforge::orchestrator::{Orchestrator, RunReport};
use jsforge::tasks::Context;
use jsforge::transforms::TransformRegistry;

/// The PicoGL-style pipeline: lint, bundle, minify, docs.
pub const PIPELINE: &str = r#"
license = "MIT"

[package]
name = "picogl"
version = "1.2.3"

[context]
packageName = "<%= name %>"

[tasks.lint]
sources = ["src/*.js"]
options = { eqeqeq = true, strict = true }

[tasks.bundle]
sources = ["src/picogl.js", "src/*.js"]
destination = "build/<%= packageName %>.js"
options = { replace = { "%%VERSION%%" = "<%= VERSION %>" } }

[tasks.minify]
sources = "build/<%= packageName %>.js"
destination = "build/<%= packageName %>.min.js"
options = { banner = "/* v%%VERSION%%*/" }

[tasks.docs]
transform = "docgen"
sources = "src/*.js"
destination = "docs"
"#;

/// Entry module with a dependency on `./util`.
pub const ENTRY: &str = "\"use strict\";\n\nvar util = require(\"./util\");\n\n/**\n * Library version.\n */\nexports.version = \"%%VERSION%%\";\nexports.twice = util.twice;\n";

/// Dependency module.
pub const UTIL: &str = "\"use strict\";\n\n/**\n * Double a number.\n * @param {number} x value\n */\nexports.twice = function (x) {\n    return x * 2;\n};\n";

/// A [`Log`] that keeps messages in memory.
#[derive(Debug, Default)]
pub struct CaptureLog {
    lines: Mutex<Vec<String>>,
}

impl CaptureLog {
    fn push(&self, kind: &str, msg: &str) {
        self.lines
            .lock()
            .expect("log lock")
            .push(format!("{kind}: {msg}"));
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("log lock").clone()
    }
}

impl Log for CaptureLog {
    fn stage(&self, msg: &str) {
        self.push("stage", msg);
    }
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }
    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }
    fn warn(&self, msg: &str) {
        self.push("warn", msg);
    }
    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
    fn dry_run(&self, msg: &str) {
        self.push("dry_run", msg);
    }
}

/// An isolated project backed by a [`tempfile::TempDir`].
pub struct TestProject {
    pub root: tempfile::TempDir,
    pub log: Arc<CaptureLog>,
}

impl TestProject {
    /// Path to the project root.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Load `jsforge.toml` from the project root.
    pub fn try_load(&self) -> Result<Config, jsforge::error::ConfigError> {
        Config::load(
            &self.path().join(config::DEFAULT_FILE),
            self.path(),
            &TransformRegistry::with_builtins(),
        )
    }

    /// Load `jsforge.toml`, panicking on error.
    pub fn load(&self) -> Config {
        self.try_load().expect("load config")
    }

    /// Run `names` against the project with the built-in transforms.
    pub fn run(&self, names: &[&str], dry_run: bool) -> RunReport {
        let ctx = Context::new(
            Arc::new(self.load()),
            Arc::new(TransformRegistry::with_builtins()),
            Arc::clone(&self.log) as Arc<dyn Log>,
            dry_run,
        );
        Orchestrator::new(ctx).run(names)
    }

    /// Read a root-relative file.
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("read project file")
    }

    /// Whether a root-relative path exists.
    pub fn exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }
}

/// Fluent builder for [`TestProject`].
pub struct ProjectBuilder {
    project: TestProject,
}

impl ProjectBuilder {
    /// Begin building an empty project.
    pub fn new() -> Self {
        Self {
            project: TestProject {
                root: tempfile::tempdir().expect("create temp dir"),
                log: Arc::new(CaptureLog::default()),
            },
        }
    }

    /// The PicoGL-style project: [`PIPELINE`] plus two clean modules.
    pub fn pipeline() -> Self {
        Self::new()
            .with_config(PIPELINE)
            .with_file("src/picogl.js", ENTRY)
            .with_file("src/util.js", UTIL)
    }

    /// Write `jsforge.toml`.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(config::DEFAULT_FILE, content)
    }

    /// Write a root-relative file, creating parent directories.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        let path = self.project.root.path().join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write project file");
        self
    }

    /// Finish building and return the project.
    pub fn build(self) -> TestProject {
        self.project
    }
}
