//! Running a single task: render its options, expand and read its sources,
//! apply its transform, and publish the outputs.
pub mod context;
pub mod graph;
pub mod sources;

pub use context::Context;

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::config::TaskDefinition;
use crate::error::{TemplateError, TransformError};
use crate::template::{self, TemplateContext};
use crate::transforms::{SourceFile, TransformInput};

/// What a task that ran to completion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Outputs were written to these root-relative paths.
    Published(Vec<PathBuf>),
    /// Dry run: these outputs were computed but not written.
    DryRun(Vec<PathBuf>),
}

/// Render a task's options against the template context.
///
/// # Errors
///
/// Returns [`TemplateError`] only for tasks with `strict_templates` set.
pub fn render_options(
    task: &TaskDefinition,
    ctx: &TemplateContext,
) -> Result<Map<String, Value>, TemplateError> {
    task.options
        .iter()
        .map(|(key, value)| {
            template::render_value(value, ctx, task.strict_templates).map(|v| (key.clone(), v))
        })
        .collect()
}

/// Execute one task.
///
/// Outputs are published together through
/// [`publish_all`](crate::fs::publish_all), so a failing write never leaves
/// a partial destination behind. In dry-run mode the transform still runs and
/// nothing is written.
///
/// # Errors
///
/// Returns the [`TransformError`] that stopped the task: an unrendered
/// strict option, a missing source, the transform's own failure, or a
/// failed write.
pub fn execute(task: &TaskDefinition, ctx: &Context) -> Result<TaskResult, TransformError> {
    ctx.log.stage(&task.name);

    let transform = ctx.registry.get(&task.transform).ok_or_else(|| {
        TransformError::InvalidOptions(format!("unknown transform '{}'", task.transform))
    })?;
    let options = render_options(task, &ctx.config.template)?;

    let paths = sources::expand(&ctx.config, &task.sources)?;
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = crate::fs::read_source(&ctx.resolve(&path))?;
        files.push(SourceFile::new(path, contents));
    }
    ctx.log.debug(&format!(
        "{}: {} source(s) through '{}'",
        task.name,
        files.len(),
        task.transform
    ));

    let input = TransformInput {
        task: task.name.clone(),
        root: ctx.root().to_path_buf(),
        sources: files,
        destination: task.destination.clone(),
        options,
    };
    let output = transform.apply(&input)?;
    let written: Vec<PathBuf> = output.files.iter().map(|f| f.path.clone()).collect();

    if ctx.dry_run {
        for file in &output.files {
            ctx.log.dry_run(&format!(
                "would write {} ({} bytes)",
                file.path.display(),
                file.contents.len()
            ));
        }
        return Ok(TaskResult::DryRun(written));
    }

    let targets: Vec<(PathBuf, &str)> = output
        .files
        .iter()
        .map(|f| (ctx.resolve(&f.path), f.contents.as_str()))
        .collect();
    crate::fs::publish_all(&targets)?;
    for file in &output.files {
        ctx.log.debug(&format!("wrote {}", file.path.display()));
    }
    Ok(TaskResult::Published(written))
}

/// Shared helpers for task and orchestrator unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::config::{Config, Package};
    use crate::logging::MemoryLog;
    use crate::template::TemplateContext;
    use crate::transforms::TransformRegistry;

    use super::Context;

    /// A [`Config`] with no tasks or aliases rooted at `root`.
    #[must_use]
    pub fn empty_config(root: PathBuf) -> Config {
        Config {
            root,
            package: Package {
                name: "test".to_string(),
                version: "0.0.0".to_string(),
            },
            license: String::new(),
            tasks: vec![],
            aliases: vec![],
            template: TemplateContext::new(),
        }
    }

    /// A context over `config` with the built-in transforms and an
    /// in-memory log.
    #[must_use]
    pub fn make_context(config: Config) -> Context {
        context_with(config, TransformRegistry::with_builtins()).0
    }

    /// A context over `config` and `registry`; also returns the log so tests
    /// can inspect it.
    #[must_use]
    pub fn context_with(config: Config, registry: TransformRegistry) -> (Context, Arc<MemoryLog>) {
        let log = Arc::new(MemoryLog::default());
        let ctx = Context::new(
            Arc::new(config),
            Arc::new(registry),
            Arc::clone(&log) as Arc<dyn crate::logging::Log>,
            false,
        );
        (ctx, log)
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::test_helpers::{context_with, make_context};
    use super::*;
    use crate::config::{Config, Format};
    use crate::transforms::{MockTransform, TransformOutput, TransformRegistry};
    use std::path::Path;
    use tempfile::TempDir;

    const PROJECT: &str = r#"
        [package]
        name = "picogl"
        version = "1.2.3"

        [context]
        banner = "/* v%%VERSION%% */"

        [tasks.lint]
        sources = "src/*.js"
        options = { eqeqeq = true }

        [tasks.bundle]
        sources = ["src/main.js", "src/*.js"]
        destination = "build/<%= name %>.js"

        [tasks.minify]
        sources = "build/picogl.js"
        destination = "build/picogl.min.js"
        options = { banner = "<%= banner %>\n" }
    "#;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (path, contents) in files {
            let path = dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        dir
    }

    fn load(dir: &TempDir, text: &str) -> Config {
        Config::from_str(text, Format::Toml, dir.path(), &TransformRegistry::with_builtins())
            .unwrap()
    }

    fn clean_sources() -> TempDir {
        project(&[
            ("src/main.js", "var util = require(\"./util\");\nutil.run();\n"),
            ("src/util.js", "exports.run = function () { return 1; };\n"),
        ])
    }

    // -----------------------------------------------------------------------
    // render_options
    // -----------------------------------------------------------------------

    #[test]
    fn options_render_against_context() {
        let dir = clean_sources();
        let config = load(&dir, PROJECT);
        let minify = config.task("minify").unwrap();
        let options = render_options(minify, &config.template).unwrap();
        assert_eq!(options["banner"], "/* v1.2.3 */\n");
    }

    #[test]
    fn lenient_options_keep_unknown_placeholders() {
        let dir = clean_sources();
        let mut config = load(&dir, PROJECT);
        config.tasks[2].options.insert("banner".into(), "%%BUILD%%".into());
        let options = render_options(&config.tasks[2], &config.template).unwrap();
        assert_eq!(options["banner"], "%%BUILD%%");
    }

    #[test]
    fn strict_options_fail_on_unknown_placeholders() {
        let dir = clean_sources();
        let mut config = load(&dir, PROJECT);
        config.tasks[2].options.insert("banner".into(), "%%BUILD%%".into());
        config.tasks[2].strict_templates = true;
        let err = render_options(&config.tasks[2], &config.template).unwrap_err();
        assert_eq!(err, TemplateError::Unresolved("%%BUILD%%".to_string()));
    }

    // -----------------------------------------------------------------------
    // execute
    // -----------------------------------------------------------------------

    #[test]
    fn lint_publishes_nothing() {
        let dir = clean_sources();
        let ctx = make_context(load(&dir, PROJECT));
        let result = execute(ctx.config.task("lint").unwrap(), &ctx).unwrap();
        assert_eq!(result, TaskResult::Published(vec![]));
    }

    #[test]
    fn bundle_then_minify_publish_outputs() {
        let dir = clean_sources();
        let ctx = make_context(load(&dir, PROJECT));

        let result = execute(ctx.config.task("bundle").unwrap(), &ctx).unwrap();
        assert_eq!(
            result,
            TaskResult::Published(vec![PathBuf::from("build/picogl.js")])
        );
        let bundled = std::fs::read_to_string(dir.path().join("build/picogl.js")).unwrap();
        assert!(bundled.find("src/util.js").unwrap() < bundled.find("src/main.js\"] =").unwrap());

        execute(ctx.config.task("minify").unwrap(), &ctx).unwrap();
        let minified = std::fs::read_to_string(dir.path().join("build/picogl.min.js")).unwrap();
        assert!(minified.starts_with("/* v1.2.3 */\n"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = clean_sources();
        let (mut ctx, log) = context_with(load(&dir, PROJECT), TransformRegistry::with_builtins());
        ctx.dry_run = true;
        let result = execute(ctx.config.task("bundle").unwrap(), &ctx).unwrap();
        assert_eq!(result, TaskResult::DryRun(vec![PathBuf::from("build/picogl.js")]));
        assert!(!dir.path().join("build").exists());
        assert!(
            log.lines()
                .iter()
                .any(|l| l.starts_with("dry_run: would write build/picogl.js"))
        );
    }

    #[test]
    fn missing_upstream_output_names_producer() {
        let dir = clean_sources();
        let ctx = make_context(load(&dir, PROJECT));
        let err = execute(ctx.config.task("minify").unwrap(), &ctx).unwrap_err();
        assert!(matches!(
            err,
            TransformError::MissingUpstream { ref producer, .. } if producer == "bundle"
        ));
    }

    #[test]
    fn lint_failure_reports_violations() {
        let dir = project(&[("src/main.js", "if (a == b) {}\n")]);
        let ctx = make_context(load(&dir, PROJECT));
        let err = execute(ctx.config.task("lint").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, TransformError::Lint(ref v) if v.len() == 1));
    }

    #[test]
    fn transform_receives_rendered_input() {
        let dir = clean_sources();
        let config = load(
            &dir,
            r#"
            [package]
            version = "2.0.0"

            [tasks.stamp]
            transform = "exec"
            sources = ["src/util.js", "src/*.js"]
            destination = "out/stamp.txt"
            options = { label = "v%%VERSION%%" }
            "#,
        );

        let mut mock = MockTransform::new();
        mock.expect_apply()
            .withf(|input| {
                input.task == "stamp"
                    && input.options["label"] == "v2.0.0"
                    && input
                        .sources
                        .iter()
                        .map(|s| s.display_path())
                        .eq(["src/util.js", "src/main.js"])
                    && input.destination.as_deref() == Some(Path::new("out/stamp.txt"))
            })
            .times(1)
            .returning(|_| Ok(TransformOutput::single("out/stamp.txt", "stamped")));
        let mut registry = TransformRegistry::new();
        registry.register("exec", mock);

        let (ctx, _log) = context_with(config, registry);
        execute(ctx.config.task("stamp").unwrap(), &ctx).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/stamp.txt")).unwrap(),
            "stamped"
        );
    }

    #[test]
    fn failed_publish_leaves_no_partial_destination() {
        let dir = clean_sources();
        std::fs::create_dir_all(dir.path().join("build/picogl.js/inner")).unwrap();
        let ctx = make_context(load(&dir, PROJECT));
        let err = execute(ctx.config.task("bundle").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, TransformError::Io { .. }));
        assert!(dir.path().join("build/picogl.js").is_dir());
        assert!(!dir.path().join("build/picogl.js.jsforge.tmp").exists());
    }

    #[test]
    fn failed_multi_file_publish_leaves_destination_untouched() {
        let dir = project(&[
            ("src/a.js", "/**\n * Say hi.\n */\nexports.hi = function () {};\n"),
            ("docs/index.md/keep.txt", "x"),
        ]);
        let config = load(
            &dir,
            "[tasks.docs]\ntransform = \"docgen\"\nsources = \"src/*.js\"\ndestination = \"docs\"\n",
        );
        let ctx = make_context(config);

        let err = execute(ctx.config.task("docs").unwrap(), &ctx).unwrap_err();
        assert!(matches!(err, TransformError::Io { .. }));
        assert!(!dir.path().join("docs/a.md").exists(), "no page may be left behind");
        assert!(!dir.path().join("docs/a.md.jsforge.tmp").exists());
        assert!(dir.path().join("docs/index.md/keep.txt").exists());
    }

    #[test]
    fn stage_is_logged_per_task() {
        let dir = clean_sources();
        let (ctx, log) = context_with(load(&dir, PROJECT), TransformRegistry::with_builtins());
        execute(ctx.config.task("lint").unwrap(), &ctx).unwrap();
        assert_eq!(log.lines()[0], "stage: lint");
    }
}
