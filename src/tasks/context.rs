use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::logging::Log;
use crate::transforms::TransformRegistry;

/// Shared context for task execution.
pub struct Context {
    /// Loaded and validated configuration.
    pub config: Arc<Config>,
    /// Transforms available to tasks, keyed by name.
    pub registry: Arc<TransformRegistry>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (run transforms but publish nothing).
    pub dry_run: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &"<Config>")
            .field("registry", &self.registry)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Context {
    /// Creates a new context for task execution.
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        registry: Arc<TransformRegistry>,
        log: Arc<dyn Log>,
        dry_run: bool,
    ) -> Self {
        Self {
            config,
            registry,
            log,
            dry_run,
        }
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Resolve a root-relative path.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.config.resolve_path(path)
    }

    /// Create a copy of this context with a different logger.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            config: Arc::clone(&self.config),
            registry: Arc::clone(&self.registry),
            log,
            dry_run: self.dry_run,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tasks::test_helpers::{empty_config, make_context};

    #[test]
    fn root_returns_config_root() {
        let ctx = make_context(empty_config(PathBuf::from("/project")));
        assert_eq!(ctx.root(), Path::new("/project"));
    }

    #[test]
    fn resolve_joins_root() {
        let ctx = make_context(empty_config(PathBuf::from("/project")));
        assert_eq!(
            ctx.resolve(Path::new("build/lib.js")),
            PathBuf::from("/project/build/lib.js")
        );
    }

    #[test]
    fn with_log_preserves_other_fields() {
        let ctx = make_context(empty_config(PathBuf::from("/project")));
        let (log, _tmp, _guard) = crate::logging::isolated_logger();
        let ctx2 = ctx.with_log(Arc::new(log));
        assert_eq!(ctx2.root(), ctx.root());
        assert_eq!(ctx2.dry_run, ctx.dry_run);
    }

    #[test]
    fn debug_format_includes_key_fields() {
        let ctx = make_context(empty_config(PathBuf::from("/project")));
        let debug = format!("{ctx:?}");
        assert!(debug.contains("Context"));
        assert!(debug.contains("dry_run"));
        assert!(debug.contains("lint"), "registry names are listed");
    }
}
