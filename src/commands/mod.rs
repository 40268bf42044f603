//! Subcommand implementations and the setup they share.
pub mod check;
pub mod list;
pub mod run;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{self, Config};
use crate::error::ForgeError;
use crate::logging::{Log, Logger};
use crate::tasks::Context;
use crate::transforms::TransformRegistry;

/// Configuration file and project root for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locations {
    /// Directory every task path is relative to.
    pub root: PathBuf,
    /// Configuration file to load.
    pub config: PathBuf,
}

impl Locations {
    /// Resolve from CLI arguments, `JSFORGE_ROOT`/`JSFORGE_CONFIG`, and the
    /// current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn from_env(global: &GlobalOpts) -> Result<Self> {
        let env_path = |key: &str| std::env::var_os(key).map(PathBuf::from);
        Ok(Self::resolve(
            global,
            env_path("JSFORGE_ROOT"),
            env_path("JSFORGE_CONFIG"),
            &std::env::current_dir()?,
        ))
    }

    /// Root: `--root`, then `JSFORGE_ROOT`, then the directory of an explicit
    /// config file, then `cwd`. Config: `--config`, then `JSFORGE_CONFIG`,
    /// then `jsforge.toml` in the root (or `jsforge.json` if only that
    /// exists).
    #[must_use]
    pub fn resolve(
        global: &GlobalOpts,
        env_root: Option<PathBuf>,
        env_config: Option<PathBuf>,
        cwd: &Path,
    ) -> Self {
        let explicit_config = global
            .config
            .clone()
            .or(env_config)
            .map(|p| if p.is_absolute() { p } else { cwd.join(p) });

        let root = global
            .root
            .clone()
            .or(env_root)
            .map(|p| if p.is_absolute() { p } else { cwd.join(p) })
            .or_else(|| {
                explicit_config
                    .as_deref()
                    .and_then(Path::parent)
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| cwd.to_path_buf());

        let config = explicit_config.unwrap_or_else(|| {
            let toml = root.join(config::DEFAULT_FILE);
            let json = toml.with_extension("json");
            if !toml.exists() && json.exists() {
                json
            } else {
                toml
            }
        });

        Self { root, config }
    }
}

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Where the configuration was found.
    pub locations: Locations,
    /// The loaded, validated configuration.
    pub config: Arc<Config>,
    /// Built-in transforms.
    pub registry: Arc<TransformRegistry>,
}

impl CommandSetup {
    /// Locate, load, and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration (or a file it references)
    /// cannot be read, parsed, or validated.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let locations = Locations::from_env(global)?;

        log.stage("Loading configuration");
        log.debug(&format!("root: {}", locations.root.display()));
        log.debug(&format!("config: {}", locations.config.display()));

        let registry = TransformRegistry::with_builtins();
        let config = Config::load(&locations.config, &locations.root, &registry)
            .map_err(ForgeError::from)?;

        log.info(&format!(
            "{} {}: {} task(s), {} alias(es)",
            config.package.name,
            config.package.version,
            config.tasks.len(),
            config.aliases.len()
        ));

        Ok(Self {
            locations,
            config: Arc::new(config),
            registry: Arc::new(registry),
        })
    }

    /// Build a task context sharing this setup's configuration and registry.
    #[must_use]
    pub fn context(&self, log: Arc<dyn Log>, dry_run: bool) -> Context {
        Context::new(
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            log,
            dry_run,
        )
    }
}
