//! Expansion of a task's declared sources into files.
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::TransformError;
use crate::fs::normalize;

/// Whether a source entry is a glob pattern rather than a literal path.
#[must_use]
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand one source entry against `root`.
///
/// A glob yields the matching files, sorted. Relative patterns are matched
/// under `root` and yield root-relative paths; absolute patterns yield
/// absolute paths. A literal path yields itself if it names an existing file
/// and nothing otherwise.
///
/// # Errors
///
/// - [`TransformError::InvalidOptions`] for a malformed pattern
/// - [`TransformError::Io`] when a matched path cannot be read
pub fn expand_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, TransformError> {
    if !is_glob(pattern) {
        return Ok(if root.join(pattern).is_file() {
            vec![PathBuf::from(pattern)]
        } else {
            Vec::new()
        });
    }

    let absolute = Path::new(pattern).is_absolute();
    let full = if absolute {
        pattern.to_string()
    } else {
        let base = glob::Pattern::escape(&root.to_string_lossy());
        format!("{}/{pattern}", base.trim_end_matches('/'))
    };
    let paths = glob::glob(&full)
        .map_err(|e| TransformError::InvalidOptions(format!("source '{pattern}': {e}")))?;

    let mut found = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| TransformError::Io {
            path: e.path().display().to_string(),
            source: e.into_error(),
        })?;
        if !path.is_file() {
            continue;
        }
        if absolute {
            found.push(path);
        } else if let Ok(relative) = path.strip_prefix(root) {
            found.push(relative.to_path_buf());
        }
    }
    found.sort();
    Ok(found)
}

/// Expand every source of `task` in declared order, dropping later
/// duplicates of a file that already appeared.
///
/// # Errors
///
/// - [`TransformError::MissingUpstream`] when a literal source is missing
///   but another task produces it
/// - [`TransformError::Io`] when a literal source is missing, a glob
///   matches nothing, or a matched path cannot be read
/// - [`TransformError::InvalidOptions`] for a malformed pattern
pub fn expand(config: &Config, sources: &[String]) -> Result<Vec<PathBuf>, TransformError> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();

    for pattern in sources {
        let found = expand_pattern(&config.root, pattern)?;
        if found.is_empty() {
            return Err(missing(config, pattern));
        }
        for path in found {
            if seen.insert(normalize(&path)) {
                out.push(path);
            }
        }
    }
    Ok(out)
}

fn missing(config: &Config, pattern: &str) -> TransformError {
    if !is_glob(pattern)
        && let Some(producer) = config.producer_of(Path::new(pattern))
    {
        return TransformError::MissingUpstream {
            path: pattern.to_string(),
            producer: producer.name.clone(),
        };
    }
    let what = if is_glob(pattern) {
        "pattern matches no files"
    } else {
        "no such file"
    };
    TransformError::Io {
        path: pattern.to_string(),
        source: io::Error::new(io::ErrorKind::NotFound, what),
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
    use crate::config::Format;
    use crate::transforms::TransformRegistry;
    use tempfile::TempDir;

    fn project(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for f in files {
            let path = dir.path().join(f);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
        dir
    }

    fn config(dir: &TempDir) -> Config {
        Config::from_str(
            r#"
            [tasks.bundle]
            sources = "src/main.js"
            destination = "build/main.js"
            "#,
            Format::Toml,
            dir.path(),
            &TransformRegistry::with_builtins(),
        )
        .unwrap()
    }

    #[test]
    fn is_glob_detects_metacharacters() {
        assert!(is_glob("src/*.js"));
        assert!(is_glob("src/?.js"));
        assert!(is_glob("src/[ab].js"));
        assert!(!is_glob("src/main.js"));
    }

    #[test]
    fn glob_results_are_sorted_and_relative() {
        let dir = project(&["src/c.js", "src/a.js", "src/b.js", "src/readme.md"]);
        let found = expand_pattern(dir.path(), "src/*.js").unwrap();
        assert_eq!(
            found,
            vec![
                PathBuf::from("src/a.js"),
                PathBuf::from("src/b.js"),
                PathBuf::from("src/c.js"),
            ]
        );
    }

    #[test]
    fn glob_skips_directories() {
        let dir = project(&["src/a.js", "src/dir.js/inner.js"]);
        let found = expand_pattern(dir.path(), "src/*.js").unwrap();
        assert_eq!(found, vec![PathBuf::from("src/a.js")]);
    }

    #[test]
    fn literal_path_only_when_file_exists() {
        let dir = project(&["src/a.js"]);
        assert_eq!(
            expand_pattern(dir.path(), "src/a.js").unwrap(),
            vec![PathBuf::from("src/a.js")]
        );
        assert!(expand_pattern(dir.path(), "src/missing.js").unwrap().is_empty());
        assert!(expand_pattern(dir.path(), "src").unwrap().is_empty());
    }

    #[test]
    fn malformed_pattern_is_an_error() {
        let dir = project(&[]);
        assert!(matches!(
            expand_pattern(dir.path(), "src/[.js"),
            Err(TransformError::InvalidOptions(_))
        ));
    }

    #[test]
    fn absolute_glob_is_not_joined_to_root() {
        let dir = project(&["lib/a.js", "lib/b.js"]);
        let other = TempDir::new().unwrap();
        let pattern = format!(
            "{}/lib/*.js",
            glob::Pattern::escape(&dir.path().to_string_lossy())
        );
        let found = expand_pattern(other.path(), &pattern).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("lib/a.js"), dir.path().join("lib/b.js")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_an_io_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = project(&["src/a.js", "src/locked/b.js"]);
        let locked = dir.path().join("src/locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let readable = std::fs::read_dir(&locked).is_ok();
        let result = expand_pattern(dir.path(), "src/**/*.js");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // permission bits are not enforced for root
        if !readable {
            assert!(matches!(result, Err(TransformError::Io { .. })));
        }
    }

    #[test]
    fn expand_keeps_first_occurrence() {
        let dir = project(&["src/picogl.js", "src/app.js", "src/util.js"]);
        let config = config(&dir);
        let found = expand(
            &config,
            &["src/picogl.js".to_string(), "src/*.js".to_string()],
        )
        .unwrap();
        assert_eq!(
            found,
            vec![
                PathBuf::from("src/picogl.js"),
                PathBuf::from("src/app.js"),
                PathBuf::from("src/util.js"),
            ]
        );
    }

    #[test]
    fn missing_literal_is_io_not_found() {
        let dir = project(&[]);
        let config = config(&dir);
        let err = expand(&config, &["src/nope.js".to_string()]).unwrap_err();
        match err {
            TransformError::Io { path, source } => {
                assert_eq!(path, "src/nope.js");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_produced_source_names_the_producer() {
        let dir = project(&[]);
        let config = config(&dir);
        let err = expand(&config, &["build/main.js".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            TransformError::MissingUpstream { ref producer, .. } if producer == "bundle"
        ));
    }

    #[test]
    fn empty_glob_fails() {
        let dir = project(&["src/a.js"]);
        let config = config(&dir);
        let err = expand(&config, &["lib/*.js".to_string()]).unwrap_err();
        assert!(err.to_string().contains("lib/*.js"));
    }

    #[test]
    fn empty_source_list_expands_to_nothing() {
        let dir = project(&[]);
        let config = config(&dir);
        assert!(expand(&config, &[]).unwrap().is_empty());
    }
}
