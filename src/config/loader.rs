//! Raw configuration file parsing.
//!
//! TOML and JSON files are both parsed into a [`serde_json::Value`] first so
//! the rest of the loader works on one shape. Table order is preserved,
//! which keeps tasks in declaration order.
use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `jsforge.toml`
    Toml,
    /// `jsforge.json`
    Json,
}

impl Format {
    /// Choose the format from a file extension; anything but `.json` is TOML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// `[package]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawPackage {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Path to a `package.json` to read `name` and `version` from.
    pub manifest: Option<String>,
}

/// A task's `sources`: one path or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawSources {
    One(String),
    Many(Vec<String>),
}

impl Default for RawSources {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl RawSources {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// `[tasks.<name>]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawTask {
    pub transform: Option<String>,
    #[serde(default)]
    pub sources: RawSources,
    pub destination: Option<String>,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub strict_templates: bool,
    pub description: Option<String>,
}

/// The whole file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    #[serde(default)]
    pub package: RawPackage,
    pub license: Option<String>,
    pub license_file: Option<String>,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Kept as an ordered map; each value is a [`RawTask`].
    #[serde(default)]
    pub tasks: Map<String, Value>,
    /// Kept as an ordered map; each value is a list of step names.
    #[serde(default)]
    pub aliases: Map<String, Value>,
}

fn parse_error(path: &str, message: impl std::fmt::Display) -> ConfigError {
    ConfigError::Parse {
        path: path.to_string(),
        message: message.to_string(),
    }
}

/// Parse `text` as `format` into a generic value.
fn to_value(text: &str, format: Format, origin: &str) -> Result<Value, ConfigError> {
    match format {
        Format::Json => serde_json::from_str(text).map_err(|e| parse_error(origin, e)),
        Format::Toml => {
            let table: toml::Table = toml::from_str(text).map_err(|e| parse_error(origin, e))?;
            serde_json::to_value(table).map_err(|e| parse_error(origin, e))
        }
    }
}

fn from_value<T: DeserializeOwned>(value: Value, origin: &str) -> Result<T, ConfigError> {
    serde_json::from_value(value).map_err(|e| parse_error(origin, e))
}

/// A parsed file with tasks and aliases in declaration order.
#[derive(Debug, Default)]
pub(crate) struct ParsedConfig {
    pub raw: RawConfig,
    pub tasks: Vec<(String, RawTask)>,
    pub aliases: Vec<(String, Vec<String>)>,
}

/// Parse configuration text.
///
/// `origin` names the file in error messages.
pub(crate) fn parse(text: &str, format: Format, origin: &str) -> Result<ParsedConfig, ConfigError> {
    let mut raw: RawConfig = from_value(to_value(text, format, origin)?, origin)?;

    let tasks = std::mem::take(&mut raw.tasks)
        .into_iter()
        .map(|(name, value)| {
            let task: RawTask = from_value(value, &format!("{origin} [tasks.{name}]"))?;
            Ok((name, task))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    let aliases = std::mem::take(&mut raw.aliases)
        .into_iter()
        .map(|(name, value)| {
            let steps: Vec<String> = from_value(value, &format!("{origin} [aliases.{name}]"))?;
            Ok((name, steps))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    Ok(ParsedConfig {
        raw,
        tasks,
        aliases,
    })
}

/// Read a file relative to `root` (absolute paths are used as given).
pub(crate) fn read_relative(root: &Path, path: &str) -> Result<String, ConfigError> {
    let full = root.join(path);
    std::fs::read_to_string(&full).map_err(|source| ConfigError::Io {
        path: full.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("jsforge.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("jsforge.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("jsforge.toml")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("jsforge")), Format::Toml);
    }

    #[test]
    fn toml_tasks_keep_declaration_order() {
        let parsed = parse(
            r#"
            [tasks.zeta]
            transform = "lint"
            sources = "src/*.js"

            [tasks.alpha]
            transform = "bundle"
            sources = ["src/a.js", "src/b.js"]
            destination = "build/a.js"

            [aliases]
            all = ["zeta", "alpha"]
            "#,
            Format::Toml,
            "jsforge.toml",
        )
        .unwrap();
        let names: Vec<&str> = parsed.tasks.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(
            parsed.tasks[0].1.sources.clone().into_vec(),
            vec!["src/*.js"]
        );
        assert_eq!(parsed.aliases[0].1, vec!["zeta", "alpha"]);
    }

    #[test]
    fn json_is_accepted() {
        let parsed = parse(
            r#"{
                "package": { "name": "picogl", "version": "1.2.3" },
                "tasks": { "minify": { "sources": "build/a.js", "destination": "build/a.min.js",
                                       "options": { "banner": "/* x */" } } }
            }"#,
            Format::Json,
            "jsforge.json",
        )
        .unwrap();
        assert_eq!(parsed.raw.package.version.as_deref(), Some("1.2.3"));
        assert_eq!(parsed.tasks[0].0, "minify");
        assert!(parsed.tasks[0].1.transform.is_none());
        assert_eq!(parsed.tasks[0].1.options["banner"], "/* x */");
    }

    #[test]
    fn unknown_task_field_names_the_task() {
        let err = parse(
            "[tasks.lint]\nsrc = \"a.js\"\n",
            Format::Toml,
            "jsforge.toml",
        )
        .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("[tasks.lint]"), "{text}");
        assert!(text.contains("src"), "{text}");
    }

    #[test]
    fn invalid_syntax_is_a_parse_error() {
        let err = parse("[tasks\n", Format::Toml, "jsforge.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn alias_steps_must_be_strings() {
        let err = parse("[aliases]\nbuild = [1]\n", Format::Toml, "x.toml").unwrap_err();
        assert!(err.to_string().contains("[aliases.build]"));
    }

    #[test]
    fn read_relative_reports_full_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_relative(dir.path(), "LICENSE").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("LICENSE"));
    }
}
