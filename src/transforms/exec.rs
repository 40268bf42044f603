//! Run an external program as a transform.
//!
//! `{sources}` as a whole argument expands to every source path;
//! `{destination}` anywhere in an argument is replaced by the destination.
//! With `capture = true` the program's stdout becomes the destination file;
//! otherwise the program is expected to write its own outputs.
use std::path::Path;

use serde::Deserialize;

use super::{Transform, TransformInput, TransformOutput};
use crate::error::TransformError;
use crate::exec;

/// Options accepted by the exec transform.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecOptions {
    /// Program name or path.
    pub program: String,
    /// Arguments, with `{sources}` and `{destination}` expanded.
    #[serde(default)]
    pub args: Vec<String>,
    /// Write stdout to the destination.
    #[serde(default)]
    pub capture: bool,
}

/// The exec transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exec;

impl Transform for Exec {
    fn description(&self) -> &'static str {
        "run an external program"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        let options: ExecOptions = input.parse_options()?;
        if !exec::is_available(&options.program) {
            return Err(TransformError::Exec(format!(
                "program '{}' not found on PATH",
                options.program
            )));
        }
        let args = expand_args(input, &options.args)?;
        let dir = if input.root.as_os_str().is_empty() {
            Path::new(".")
        } else {
            input.root.as_path()
        };
        let result = exec::run_in(dir, &options.program, &args)
            .map_err(|e| TransformError::Exec(format!("{e:#}")))?;

        if options.capture {
            let destination = input.require_destination()?;
            Ok(TransformOutput::single(destination.clone(), result.stdout))
        } else {
            Ok(TransformOutput::none())
        }
    }
}

/// Expand argument placeholders.
///
/// # Errors
///
/// Returns [`TransformError::InvalidOptions`] when `{destination}` is used
/// by a task without a destination.
pub fn expand_args(input: &TransformInput, args: &[String]) -> Result<Vec<String>, TransformError> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        if arg == "{sources}" {
            out.extend(input.sources.iter().map(super::SourceFile::display_path));
        } else if arg.contains("{destination}") {
            let destination = input.require_destination()?;
            out.push(arg.replace(
                "{destination}",
                &destination.to_string_lossy().replace('\\', "/"),
            ));
        } else {
            out.push(arg.clone());
        }
    }
    Ok(out)
}
