//! Configuration-driven build orchestrator for browser JavaScript libraries.
//!
//! A project declares named tasks (lint, bundle, minify, docgen, external
//! commands) and aliases over them in `jsforge.toml`; `jsforge run build`
//! expands the alias and runs each task in order, stopping at the first
//! failure.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load, template, and validate the build configuration
//! - **[`transforms`]**: the pluggable file transforms and their registry
//! - **[`tasks`]**: alias resolution and single-task execution
//! - **[`orchestrator`]**: sequential runs and the [`RunReport`](orchestrator::RunReport)
//! - **[`commands`]**: top-level subcommands (`run`, `list`, `check`, `version`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod orchestrator;
pub mod tasks;
pub mod template;
pub mod transforms;
