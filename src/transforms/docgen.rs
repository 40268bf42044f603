//! Markdown API pages from `/** … */` doc comments.
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::lexer::{self, SegmentKind};
use super::{OutputFile, SourceFile, Transform, TransformInput, TransformOutput};
use crate::error::{DocError, TransformError};

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static docgen pattern")
}

/// Patterns that name the declaration following a doc comment, most
/// specific first.
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r"^(?:export\s+)?(?:async\s+)?function\s*\*?\s*([\w$]+)"),
        compile(r"^(?:export\s+)?class\s+([\w$]+)"),
        compile(r"^(?:export\s+)?(?:var|let|const)\s+([\w$]+)"),
        compile(r"^([\w$]+(?:\.[\w$]+)*)\s*[:=]"),
        compile(r"^(?:static\s+)?(?:get\s+|set\s+)?([\w$]+)\s*\("),
    ]
});

/// Options accepted by the docgen transform.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocGenOptions {
    /// Heading of `index.md`.
    #[serde(default)]
    pub title: Option<String>,
}

/// The documentation transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocGen;

impl Transform for DocGen {
    fn description(&self) -> &'static str {
        "generate Markdown pages from /** */ doc comments"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        let options: DocGenOptions = input.parse_options()?;
        let destination = input.destination.as_ref().ok_or(DocError::NoDestination)?;
        let title = options.title.as_deref().unwrap_or("API Documentation");
        Ok(generate(&input.sources, destination, title)?)
    }
}

/// One `@tag` line of a doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    /// Tag name without the `@`.
    pub name: String,
    /// Remaining text, continuation lines joined with spaces.
    pub text: String,
}

/// A doc comment and the declaration it documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    /// Name taken from the declaration, if one could be recognised.
    pub name: Option<String>,
    /// First line of the declaration, without a trailing `{`.
    pub declaration: Option<String>,
    pub description: String,
    pub tags: Vec<DocTag>,
    /// Line the comment starts on.
    pub line: usize,
}

fn comment_lines(text: &str) -> impl Iterator<Item = &str> {
    let body = text
        .strip_prefix("/**")
        .and_then(|t| t.strip_suffix("*/"))
        .unwrap_or_default();
    body.lines().map(|line| {
        let line = line.trim();
        let line = line.strip_prefix('*').unwrap_or(line);
        line.strip_prefix(' ').unwrap_or(line).trim_end()
    })
}

fn parse_comment(text: &str, line: usize) -> DocEntry {
    let mut description: Vec<&str> = Vec::new();
    let mut tags: Vec<DocTag> = Vec::new();
    for l in comment_lines(text) {
        if let Some(rest) = l.strip_prefix('@') {
            let (name, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            tags.push(DocTag {
                name: name.to_string(),
                text: tail.trim().to_string(),
            });
        } else if let Some(tag) = tags.last_mut() {
            if !l.trim().is_empty() {
                if !tag.text.is_empty() {
                    tag.text.push(' ');
                }
                tag.text.push_str(l.trim());
            }
        } else {
            description.push(l);
        }
    }
    DocEntry {
        name: None,
        declaration: None,
        description: description.join("\n").trim().to_string(),
        tags,
        line,
    }
}

fn declaration_of(code: &str) -> Option<(Option<String>, String)> {
    let first = code.lines().map(str::trim).find(|l| !l.is_empty())?;
    let decl = first.trim_end_matches('{').trim_end().to_string();
    let name = NAME_PATTERNS
        .iter()
        .find_map(|re| re.captures(&decl))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());
    Some((name, decl))
}

/// Extract every doc comment from one source.
///
/// # Errors
///
/// Returns [`DocError::Unterminated`] when the source cannot be scanned.
pub fn extract(source: &SourceFile) -> Result<Vec<DocEntry>, DocError> {
    let segments = lexer::segments(&source.contents).map_err(|e| DocError::Unterminated {
        file: source.display_path(),
        what: e.what,
        line: e.line,
    })?;
    let mut entries = Vec::new();
    for (i, seg) in segments.iter().enumerate() {
        let is_doc = seg.kind == SegmentKind::BlockComment
            && seg.text.starts_with("/**")
            && seg.text != "/**/";
        if !is_doc {
            continue;
        }
        let mut entry = parse_comment(seg.text, seg.line);
        if let Some(next) = segments.get(i + 1).filter(|s| s.kind == SegmentKind::Code)
            && let Some((name, decl)) = declaration_of(next.text)
        {
            entry.name = name;
            entry.declaration = Some(decl);
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn render_page(source: &SourceFile, entries: &[DocEntry]) -> String {
    let title = source
        .path
        .file_name()
        .map_or_else(|| source.display_path(), |n| n.to_string_lossy().into_owned());
    let mut out = format!("# {title}\n\nSource: `{}`\n", source.display_path());
    for entry in entries {
        let heading = entry.name.as_deref().unwrap_or("(anonymous)");
        let _ = write!(out, "\n## {heading}\n\n");
        if let Some(decl) = &entry.declaration {
            let _ = write!(out, "```js\n{decl}\n```\n\n");
        }
        if !entry.description.is_empty() {
            let _ = write!(out, "{}\n\n", entry.description);
        }
        for tag in &entry.tags {
            if tag.text.is_empty() {
                let _ = writeln!(out, "- **@{}**", tag.name);
            } else {
                let _ = writeln!(out, "- **@{}** {}", tag.name, tag.text);
            }
        }
        let _ = writeln!(out, "\n_Defined on line {}._", entry.line);
    }
    out
}

/// Page file names, unique per source: the file stem, or the full path when
/// two sources share a stem or the stem would shadow `index.md`.
fn page_names(sources: &[&SourceFile]) -> Vec<String> {
    let stem = |s: &SourceFile| {
        s.path
            .file_stem()
            .map_or_else(|| "index".to_string(), |n| n.to_string_lossy().into_owned())
    };
    let mut counts: HashMap<String, usize> = HashMap::new();
    for s in sources {
        *counts.entry(stem(s)).or_default() += 1;
    }
    sources
        .iter()
        .map(|s| {
            let base = stem(s);
            if base == "index" || counts.get(&base).copied().unwrap_or_default() > 1 {
                let full = s.path.with_extension("");
                format!("{}.md", full.to_string_lossy().replace(['/', '\\'], "_"))
            } else {
                format!("{base}.md")
            }
        })
        .collect()
}

/// Render pages for every documented source plus `index.md` under
/// `destination`.
///
/// # Errors
///
/// Returns [`DocError::Unterminated`] when a source cannot be scanned.
pub fn generate(
    sources: &[SourceFile],
    destination: &Path,
    title: &str,
) -> Result<TransformOutput, DocError> {
    let mut documented = Vec::new();
    for source in sources {
        let entries = extract(source)?;
        if !entries.is_empty() {
            documented.push((source, entries));
        }
    }

    let names = page_names(&documented.iter().map(|(s, _)| *s).collect::<Vec<_>>());
    let mut files = Vec::with_capacity(documented.len() + 1);
    let mut index = format!("# {title}\n\n");
    if documented.is_empty() {
        index.push_str("No documented sources.\n");
    }
    for ((source, entries), page) in documented.iter().zip(&names) {
        let _ = writeln!(
            index,
            "- [{}]({page}) ({} entr{})",
            source.display_path(),
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" }
        );
        files.push(OutputFile {
            path: destination.join(page),
            contents: render_page(source, entries),
        });
    }
    files.push(OutputFile {
        path: destination.join("index.md"),
        contents: index,
    });
    Ok(TransformOutput { files })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const APP: &str = r#""use strict";

/**
 * Create a PicoGL app.
 *
 * @param {DOMElement} canvas The canvas to render into.
 * @param {Object} [contextAttributes] Passed through to
 *     getContext.
 * @return {App} The app.
 */
function createApp(canvas, contextAttributes) {
    return new App(canvas, contextAttributes);
}

/** Library version. */
var VERSION = "%%VERSION%%";
"#;

    #[test]
    fn extracts_description_tags_and_declaration() {
        let entries = extract(&SourceFile::new("src/picogl.js", APP)).unwrap();
        assert_eq!(entries.len(), 2);

        let create = &entries[0];
        assert_eq!(create.name.as_deref(), Some("createApp"));
        assert_eq!(
            create.declaration.as_deref(),
            Some("function createApp(canvas, contextAttributes)")
        );
        assert_eq!(create.description, "Create a PicoGL app.");
        assert_eq!(create.tags.len(), 3);
        assert_eq!(create.tags[0].name, "param");
        assert_eq!(
            create.tags[1].text,
            "{Object} [contextAttributes] Passed through to getContext."
        );
        assert_eq!(create.line, 3);

        assert_eq!(entries[1].name.as_deref(), Some("VERSION"));
        assert_eq!(entries[1].description, "Library version.");
    }

    #[test]
    fn plain_block_comments_are_not_docs() {
        let src = "/* not docs */\n/**/\nvar a = 1;";
        assert!(extract(&SourceFile::new("a.js", src)).unwrap().is_empty());
    }

    #[test]
    fn doc_markers_inside_strings_are_ignored() {
        let src = "var s = \"/** nope */\";";
        assert!(extract(&SourceFile::new("a.js", src)).unwrap().is_empty());
    }

    #[test]
    fn names_methods_and_assignments() {
        assert_eq!(
            declaration_of("\n  App.prototype.draw = function() {").unwrap().0.as_deref(),
            Some("App.prototype.draw")
        );
        assert_eq!(
            declaration_of("clear() {").unwrap().0.as_deref(),
            Some("clear")
        );
        assert_eq!(
            declaration_of("class Program extends Base {").unwrap().0.as_deref(),
            Some("Program")
        );
    }

    #[test]
    fn unterminated_doc_comment_is_an_error() {
        let err = extract(&SourceFile::new("src/a.js", "a();\n/** open")).unwrap_err();
        assert_eq!(
            err,
            DocError::Unterminated {
                file: "src/a.js".to_string(),
                what: "comment",
                line: 2,
            }
        );
    }

    #[test]
    fn generates_pages_and_index() {
        let sources = vec![
            SourceFile::new("src/picogl.js", APP),
            SourceFile::new("src/plain.js", "var x = 1;\n"),
        ];
        let out = generate(&sources, Path::new("docs"), "PicoGL").unwrap();
        let paths: Vec<_> = out.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("docs/picogl.md"), PathBuf::from("docs/index.md")]
        );
        let page = &out.files[0].contents;
        assert!(page.starts_with("# picogl.js\n\nSource: `src/picogl.js`\n"));
        assert!(page.contains("## createApp"));
        assert!(page.contains("- **@return** {App} The app."));
        assert_eq!(
            out.files[1].contents,
            "# PicoGL\n\n- [src/picogl.js](picogl.md) (2 entries)\n"
        );
    }

    #[test]
    fn shared_stems_use_full_paths() {
        let sources = vec![
            SourceFile::new("src/a/util.js", "/** a */\nvar a;"),
            SourceFile::new("src/b/util.js", "/** b */\nvar b;"),
        ];
        let out = generate(&sources, Path::new("docs"), "T").unwrap();
        assert_eq!(out.files[0].path, PathBuf::from("docs/src_a_util.md"));
        assert_eq!(out.files[1].path, PathBuf::from("docs/src_b_util.md"));
    }

    #[test]
    fn missing_destination_is_an_error() {
        let input = TransformInput {
            task: "docs".to_string(),
            sources: vec![SourceFile::new("a.js", APP)],
            ..TransformInput::default()
        };
        assert!(matches!(
            DocGen.apply(&input),
            Err(TransformError::Doc(DocError::NoDestination))
        ));
    }
}
