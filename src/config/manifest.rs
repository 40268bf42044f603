//! Package metadata from an npm-style `package.json`.
use std::path::Path;

use serde::Deserialize;

use super::loader;
use crate::error::ConfigError;

/// The fields of `package.json` the build cares about. Everything else in
/// the manifest is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PackageManifest {
    /// `"name"`.
    pub name: Option<String>,
    /// `"version"`.
    pub version: Option<String>,
    /// `"license"`.
    pub license: Option<String>,
}

/// Load a manifest relative to `root`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid JSON.
pub fn load(root: &Path, path: &str) -> Result<PackageManifest, ConfigError> {
    let text = loader::read_relative(root, path)?;
    parse(&text, path)
}

/// Parse manifest text; `origin` names the file in errors.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] on invalid JSON.
pub fn parse(text: &str, origin: &str) -> Result<PackageManifest, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Parse {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_name_and_version() {
        let m = parse(
            r#"{ "name": "picogl", "version": "0.6.2", "main": "build/picogl.js",
                 "devDependencies": { "grunt": "^1.0.0" } }"#,
            "package.json",
        )
        .unwrap();
        assert_eq!(m.name.as_deref(), Some("picogl"));
        assert_eq!(m.version.as_deref(), Some("0.6.2"));
        assert_eq!(m.license, None);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse("{ name: }", "package.json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "package.json"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(dir.path(), "package.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
