//! Sequential pipeline execution.
//!
//! An [`Orchestrator`] resolves requested names into an ordered task list,
//! runs each task in turn, and stops at the first failure. Every run
//! returns a fresh [`RunReport`].
use std::path::PathBuf;

use crate::error::{ForgeError, ResolutionError, TaskFailure};
use crate::logging::{TaskEntry, TaskStatus};
use crate::tasks::{self, Context, TaskResult, graph};

/// How one task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The transform succeeded and its outputs were published.
    Succeeded {
        /// Published paths, relative to the root.
        outputs: Vec<PathBuf>,
    },
    /// The transform succeeded in a dry run; nothing was published.
    DryRun {
        /// Paths that would have been published.
        outputs: Vec<PathBuf>,
    },
    /// The task failed.
    Failed {
        /// Rendered failure, possibly spanning several lines.
        cause: String,
    },
}

/// Why a run failed.
#[derive(Debug)]
pub enum RunFailure {
    /// The requested names could not be resolved; no task ran.
    Resolution(ResolutionError),
    /// A task failed; later tasks did not run.
    Task(TaskFailure),
}

impl From<RunFailure> for ForgeError {
    fn from(failure: RunFailure) -> Self {
        match failure {
            RunFailure::Resolution(e) => e.into(),
            RunFailure::Task(e) => e.into(),
        }
    }
}

/// Final state of a run.
#[derive(Debug)]
pub enum RunState {
    /// Every resolved task succeeded.
    Succeeded,
    /// Resolution or a task failed.
    Failed(RunFailure),
}

/// Result of one [`Orchestrator::run`].
#[derive(Debug)]
pub struct RunReport {
    /// `(task name, outcome)` for every task that started, in run order.
    pub entries: Vec<(String, TaskOutcome)>,
    /// Resolved tasks that never started because an earlier one failed.
    pub not_run: Vec<String>,
    /// How the run ended.
    pub state: RunState,
}

impl RunReport {
    fn resolution_failed(error: ResolutionError) -> Self {
        Self {
            entries: Vec::new(),
            not_run: Vec::new(),
            state: RunState::Failed(RunFailure::Resolution(error)),
        }
    }

    /// Whether every resolved task succeeded.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.state, RunState::Succeeded)
    }

    /// Names of the tasks that started, in order.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Summary rows for the logger: one per started task, then one per task
    /// that never ran.
    #[must_use]
    pub fn summary(&self) -> Vec<TaskEntry> {
        let join = |outputs: &[PathBuf]| {
            (!outputs.is_empty()).then(|| {
                outputs
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
        };
        self.entries
            .iter()
            .map(|(name, outcome)| match outcome {
                TaskOutcome::Succeeded { outputs } => {
                    TaskEntry::new(name, TaskStatus::Ok, join(outputs))
                }
                TaskOutcome::DryRun { outputs } => {
                    TaskEntry::new(name, TaskStatus::DryRun, join(outputs))
                }
                TaskOutcome::Failed { cause } => TaskEntry::new(
                    name,
                    TaskStatus::Failed,
                    cause.lines().next().map(String::from),
                ),
            })
            .chain(
                self.not_run
                    .iter()
                    .map(|name| TaskEntry::new(name, TaskStatus::NotRun, None)),
            )
            .collect()
    }

    /// Convert the final state into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the run's failure as a [`ForgeError`].
    pub fn into_result(self) -> Result<(), ForgeError> {
        match self.state {
            RunState::Succeeded => Ok(()),
            RunState::Failed(failure) => Err(failure.into()),
        }
    }
}

/// Runs resolved task lists against a shared [`Context`].
#[derive(Debug)]
pub struct Orchestrator {
    ctx: Context,
}

impl Orchestrator {
    /// Create an orchestrator over `ctx`.
    #[must_use]
    pub const fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// The context tasks run against.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.ctx
    }

    /// Resolve `names` and run the resulting tasks in order.
    ///
    /// Resolution failures produce a report with no entries. Otherwise tasks
    /// run one after another; the first failure is recorded and nothing
    /// after it starts. Outputs published by earlier tasks stay in place.
    pub fn run<S: AsRef<str>>(&self, names: &[S]) -> RunReport {
        let config = &self.ctx.config;
        let log = &self.ctx.log;

        let resolved = match graph::resolve(config, names) {
            Ok(resolved) => resolved,
            Err(e) => {
                log.error(&e.to_string());
                return RunReport::resolution_failed(e);
            }
        };
        log.debug(&format!(
            "pipeline: {}",
            resolved
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(" → ")
        ));

        let mut entries = Vec::with_capacity(resolved.len());
        for (index, task) in resolved.iter().enumerate() {
            match tasks::execute(task, &self.ctx) {
                Ok(TaskResult::Published(outputs)) => {
                    entries.push((task.name.clone(), TaskOutcome::Succeeded { outputs }));
                }
                Ok(TaskResult::DryRun(outputs)) => {
                    entries.push((task.name.clone(), TaskOutcome::DryRun { outputs }));
                }
                Err(source) => {
                    let failure = TaskFailure {
                        task: task.name.clone(),
                        source,
                    };
                    log.error(&failure.to_string());
                    entries.push((
                        task.name.clone(),
                        TaskOutcome::Failed {
                            cause: failure.source.to_string(),
                        },
                    ));
                    let not_run = resolved
                        .iter()
                        .skip(index + 1)
                        .map(|t| t.name.clone())
                        .collect();
                    return RunReport {
                        entries,
                        not_run,
                        state: RunState::Failed(RunFailure::Task(failure)),
                    };
                }
            }
        }

        RunReport {
            entries,
            not_run: Vec::new(),
            state: RunState::Succeeded,
        }
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
    use super::*;
    use crate::config::{AliasDefinition, Config, TaskDefinition};
    use crate::error::{LintViolation, TransformError};
    use crate::tasks::test_helpers::{context_with, empty_config};
    use crate::transforms::{MockTransform, TransformOutput, TransformRegistry};
    use serde_json::Map;
    use tempfile::TempDir;

    fn task(name: &str, destination: Option<&str>) -> TaskDefinition {
        TaskDefinition {
            name: name.to_string(),
            transform: name.to_string(),
            sources: vec![],
            destination: destination.map(PathBuf::from),
            options: Map::new(),
            strict_templates: false,
            description: None,
        }
    }

    fn pipeline_config(root: &TempDir) -> Config {
        let mut config = empty_config(root.path().to_path_buf());
        config.tasks = vec![
            task("lint", None),
            task("bundle", Some("build/lib.js")),
            task("minify", Some("build/lib.min.js")),
        ];
        config.aliases = vec![AliasDefinition {
            name: "build".to_string(),
            steps: vec!["lint".into(), "bundle".into(), "minify".into()],
            builtin: true,
        }];
        config
    }

    fn succeeding(path: &'static str) -> MockTransform {
        let mut mock = MockTransform::new();
        mock.expect_apply()
            .times(1)
            .returning(move |_| Ok(TransformOutput::single(path, "out")));
        mock
    }

    fn never_called() -> MockTransform {
        let mut mock = MockTransform::new();
        mock.expect_apply().never();
        mock
    }

    fn lint_violation() -> TransformError {
        TransformError::Lint(vec![LintViolation {
            file: "src/a.js".to_string(),
            line: 1,
            column: 7,
            rule: "eqeqeq",
            message: "expected '===' and saw '=='".to_string(),
        }])
    }

    #[test]
    fn build_runs_every_task_in_order() {
        let dir = TempDir::new().unwrap();
        let mut registry = TransformRegistry::new();
        let mut lint = MockTransform::new();
        lint.expect_apply()
            .times(1)
            .returning(|_| Ok(TransformOutput::none()));
        registry.register("lint", lint);
        registry.register("bundle", succeeding("build/lib.js"));
        registry.register("minify", succeeding("build/lib.min.js"));
        let (ctx, _log) = context_with(pipeline_config(&dir), registry);

        let report = Orchestrator::new(ctx).run(&["build"]);
        assert!(report.succeeded());
        assert_eq!(
            report.task_names().collect::<Vec<_>>(),
            vec!["lint", "bundle", "minify"]
        );
        assert_eq!(
            report.entries[1].1,
            TaskOutcome::Succeeded {
                outputs: vec![PathBuf::from("build/lib.js")]
            }
        );
        assert!(dir.path().join("build/lib.min.js").is_file());
    }

    #[test]
    fn lint_failure_short_circuits() {
        let dir = TempDir::new().unwrap();
        let mut registry = TransformRegistry::new();
        let mut lint = MockTransform::new();
        lint.expect_apply()
            .times(1)
            .returning(|_| Err(lint_violation()));
        registry.register("lint", lint);
        registry.register("bundle", never_called());
        registry.register("minify", never_called());
        let (ctx, log) = context_with(pipeline_config(&dir), registry);

        let report = Orchestrator::new(ctx).run(&["build"]);
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].0, "lint");
        assert!(matches!(report.entries[0].1, TaskOutcome::Failed { .. }));
        assert_eq!(report.not_run, vec!["bundle", "minify"]);
        match &report.state {
            RunState::Failed(RunFailure::Task(failure)) => assert_eq!(failure.task, "lint"),
            other => panic!("unexpected state: {other:?}"),
        }
        assert!(log.lines().iter().any(|l| l.starts_with("error: Task 'lint' failed")));
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn earlier_outputs_survive_a_later_failure() {
        let dir = TempDir::new().unwrap();
        let mut registry = TransformRegistry::new();
        let mut lint = MockTransform::new();
        lint.expect_apply().returning(|_| Ok(TransformOutput::none()));
        registry.register("lint", lint);
        registry.register("bundle", succeeding("build/lib.js"));
        let mut minify = MockTransform::new();
        minify.expect_apply().times(1).returning(|_| {
            Err(TransformError::InvalidOptions("banner must be a string".to_string()))
        });
        registry.register("minify", minify);
        let (ctx, _log) = context_with(pipeline_config(&dir), registry);

        let report = Orchestrator::new(ctx).run(&["build"]);
        assert!(!report.succeeded());
        assert_eq!(report.entries.len(), 3);
        assert!(report.not_run.is_empty());
        assert!(dir.path().join("build/lib.js").is_file());
        assert!(!dir.path().join("build/lib.min.js").exists());
    }

    #[test]
    fn unknown_name_fails_before_any_task() {
        let dir = TempDir::new().unwrap();
        let mut registry = TransformRegistry::new();
        registry.register("lint", never_called());
        registry.register("bundle", never_called());
        registry.register("minify", never_called());
        let (ctx, _log) = context_with(pipeline_config(&dir), registry);

        let report = Orchestrator::new(ctx).run(&["nonexistent"]);
        assert!(report.entries.is_empty());
        assert!(matches!(
            report.state,
            RunState::Failed(RunFailure::Resolution(ResolutionError::UnknownName(ref n)))
                if n == "nonexistent"
        ));
    }

    #[test]
    fn dry_run_reports_outputs_without_writing() {
        let dir = TempDir::new().unwrap();
        let mut registry = TransformRegistry::new();
        registry.register("bundle", succeeding("build/lib.js"));
        let (mut ctx, _log) = context_with(pipeline_config(&dir), registry);
        ctx.dry_run = true;

        let report = Orchestrator::new(ctx).run(&["bundle"]);
        assert!(report.succeeded());
        assert_eq!(
            report.entries,
            vec![(
                "bundle".to_string(),
                TaskOutcome::DryRun {
                    outputs: vec![PathBuf::from("build/lib.js")]
                }
            )]
        );
        assert!(!dir.path().join("build").exists());
    }

    #[test]
    fn runs_are_independent() {
        let dir = TempDir::new().unwrap();
        let mut registry = TransformRegistry::new();
        let mut lint = MockTransform::new();
        lint.expect_apply()
            .times(2)
            .returning(|_| Ok(TransformOutput::none()));
        registry.register("lint", lint);
        let (ctx, _log) = context_with(pipeline_config(&dir), registry);

        let orchestrator = Orchestrator::new(ctx);
        let first = orchestrator.run(&["lint"]);
        let second = orchestrator.run(&["lint"]);
        assert_eq!(first.entries, second.entries);
        assert_eq!(second.entries.len(), 1);
    }

    #[test]
    fn summary_includes_tasks_that_never_ran() {
        let report = RunReport {
            entries: vec![(
                "lint".to_string(),
                TaskOutcome::Failed {
                    cause: "1 lint violation(s)\n  src/a.js:1:7 [eqeqeq] …".to_string(),
                },
            )],
            not_run: vec!["bundle".to_string()],
            state: RunState::Succeeded,
        };
        let summary = report.summary();
        assert_eq!(
            summary,
            vec![
                TaskEntry::new(
                    "lint",
                    TaskStatus::Failed,
                    Some("1 lint violation(s)".to_string())
                ),
                TaskEntry::new("bundle", TaskStatus::NotRun, None),
            ]
        );
    }

    #[test]
    fn failure_converts_to_forge_error() {
        let report = RunReport::resolution_failed(ResolutionError::UnknownName("x".into()));
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, ForgeError::Resolution(_)));
    }
}
