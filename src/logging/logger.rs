//! Structured logger and run summary.
use std::path::PathBuf;

use super::types::{Log, TaskEntry, TaskStatus};
use super::utils::log_file_path;

/// Implement the methods of [`Log`] by delegating to inherent methods of the
/// same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Logger that forwards to `tracing`.
///
/// Every message also reaches the persistent log file at
/// `$XDG_CACHE_HOME/jsforge/<command>.log` (default
/// `~/.cache/jsforge/<command>.log`) through the file layer installed by
/// [`init_subscriber`](super::subscriber::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger for `command`.
    ///
    /// Only remembers the log file path for the summary; the file itself is
    /// created by the subscriber.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            log_file: log_file_path(command),
        }
    }

    /// Return the log file path, if available.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: "jsforge::stage", "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: "jsforge::dry_run", "{msg}");
    }

    /// Print the run summary: one line per task and the totals.
    #[allow(clippy::print_stdout)]
    pub fn print_summary(&self, entries: &[TaskEntry]) {
        if entries.is_empty() {
            return;
        }

        println!();
        self.stage("Summary");

        let mut ok = 0u32;
        let mut dry_run = 0u32;
        let mut not_run = 0u32;
        let mut failed = 0u32;

        for entry in entries {
            let (icon, color) = match entry.status {
                TaskStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                TaskStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                TaskStatus::NotRun => {
                    not_run += 1;
                    ("·", "\x1b[2m")
                }
                TaskStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = entry
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.info(&format!("{color}{icon} {}{suffix}\x1b[0m", entry.name));
        }

        println!();
        let total = ok + dry_run + not_run + failed;
        self.info(&format!(
            "{total} tasks: \x1b[32m{ok} ok\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[2m{not_run} not run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    fn contents(log: &Logger) -> String {
        fs::read_to_string(log.log_path().expect("log path")).unwrap()
    }

    #[test]
    fn log_file_is_created() {
        let (log, _tmp, _guard) = isolated_logger();
        let path = log.log_path().expect("log path should exist");
        assert!(path.exists(), "log file should be created by the file layer");
        assert!(path.ends_with("jsforge/test.log"));
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        assert!(contents(&log).contains(&marker));
    }

    #[test]
    fn warn_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.warn("source 'src/x.js' does not exist");
        let text = contents(&log);
        assert!(text.contains("[warn] source 'src/x.js' does not exist"));
    }

    #[test]
    fn error_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.error("lint failed");
        assert!(contents(&log).contains("[error] lint failed"));
    }

    #[test]
    fn stage_written_to_file_with_arrow() {
        let (log, _tmp, _guard) = isolated_logger();
        log.stage("bundle");
        assert!(contents(&log).contains("==> bundle"));
    }

    #[test]
    fn dry_run_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.dry_run("would write build/picogl.js");
        assert!(contents(&log).contains("[dry run] would write build/picogl.js"));
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.info("via-trait");
        assert!(contents(&log).contains("via-trait"));
    }

    #[test]
    fn summary_lists_each_task_and_totals() {
        let (log, _tmp, _guard) = isolated_logger();
        log.print_summary(&[
            TaskEntry::new("lint", TaskStatus::Ok, None),
            TaskEntry::new("bundle", TaskStatus::Failed, Some("boom".to_string())),
            TaskEntry::new("minify", TaskStatus::NotRun, None),
        ]);
        let text = contents(&log);
        assert!(text.contains("==> Summary"));
        assert!(text.contains("✓ lint"));
        assert!(text.contains("✗ bundle (boom)"));
        assert!(text.contains("· minify"));
        assert!(text.contains("3 tasks: 1 ok, 0 dry-run, 1 not run, 1 failed"));
    }

    #[test]
    fn empty_summary_prints_nothing() {
        let (log, _tmp, _guard) = isolated_logger();
        let before = contents(&log);
        log.print_summary(&[]);
        assert_eq!(contents(&log), before);
    }
}
