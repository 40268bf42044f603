//! Core logging types: summary entries, status, and the [`Log`] trait.

/// One row of the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEntry {
    /// Task name.
    pub name: String,
    /// Final status of the task.
    pub status: TaskStatus,
    /// Optional detail message (published paths or the failure cause).
    pub message: Option<String>,
}

impl TaskEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, status: TaskStatus, message: Option<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message,
        }
    }
}

/// Status of a task in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed and its outputs were published.
    Ok,
    /// Task ran in dry-run mode; nothing was published.
    DryRun,
    /// Task was resolved but never started because an earlier task failed.
    NotRun,
    /// Task failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) forwards to `tracing`; tests can supply
/// their own implementation to capture messages.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn task_status_equality() {
        assert_eq!(TaskStatus::Ok, TaskStatus::Ok);
        assert_ne!(TaskStatus::Ok, TaskStatus::Failed);
        assert_ne!(TaskStatus::NotRun, TaskStatus::DryRun);
    }

    #[test]
    fn task_entry_new() {
        let entry = TaskEntry::new("bundle", TaskStatus::Ok, Some("build/a.js".to_string()));
        assert_eq!(entry.name, "bundle");
        assert_eq!(entry.status, TaskStatus::Ok);
        assert_eq!(entry.message.as_deref(), Some("build/a.js"));
    }
}
