//! Logging infrastructure for structured console and file output.

mod logger;
mod subscriber;
mod types;
mod utils;

pub use logger::Logger;
pub use subscriber::init_subscriber;
pub use types::{Log, TaskEntry, TaskStatus};

/// Serializes `XDG_CACHE_HOME` manipulation across parallel test threads.
#[cfg(test)]
pub(crate) static TEST_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Create a Logger backed by an isolated per-thread tracing subscriber
/// with a file layer, so that events emitted by logger methods reach the log
/// file during tests.
///
/// The returned guard must be kept alive for the duration of the test;
/// dropping it restores the previous thread-local dispatcher.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) fn isolated_logger() -> (Logger, tempfile::TempDir, tracing::dispatcher::DefaultGuard) {
    use tracing_subscriber::{Layer as _, filter::LevelFilter, layer::SubscriberExt as _};
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let env_lock = TEST_ENV_MUTEX
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    // SAFETY: Protected by TEST_ENV_MUTEX; restored before lock is released.
    #[allow(unsafe_code)]
    unsafe {
        std::env::set_var("XDG_CACHE_HOME", tmp.path());
    }
    let file_layer = subscriber::FileLayer::new("test").expect("failed to create file layer");
    let log = Logger::new("test");
    // SAFETY: As above.
    #[allow(unsafe_code)]
    unsafe {
        std::env::remove_var("XDG_CACHE_HOME");
    }
    drop(env_lock);
    let subscriber =
        tracing_subscriber::registry().with(file_layer.with_filter(LevelFilter::DEBUG));
    let guard = tracing::dispatcher::set_default(&tracing::Dispatch::new(subscriber));
    (log, tmp, guard)
}

/// A [`Log`] that keeps messages in memory, for asserting on what a
/// component logged without touching the file system.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    lines: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemoryLog {
    fn push(&self, kind: &str, msg: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(format!("{kind}: {msg}"));
        }
    }

    /// Every message logged so far, as `kind: message`.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().map_or_else(|_| vec![], |g| g.clone())
    }
}

#[cfg(test)]
impl Log for MemoryLog {
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
