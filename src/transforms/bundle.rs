//! CommonJS bundling: one entry module and the modules it reaches, flattened
//! into a single self-contained file.
//!
//! The first source is the entry point; the remaining sources form the set
//! of modules `require` calls may resolve to. Modules are emitted so every
//! module's dependencies precede it.
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::lexer::{self, SegmentKind};
use super::{SourceFile, Transform, TransformInput, TransformOutput};
use crate::error::{BundleError, TransformError};

/// Code ending in a bare `require(`; the specifier is the string literal
/// that follows.
#[allow(clippy::expect_used)]
static REQUIRE_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^.\w$])require\s*\(\s*$").expect("static require pattern")
});

/// Options accepted by the bundle transform.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleOptions {
    /// Text prepended to the bundle.
    #[serde(default)]
    pub banner: Option<String>,
    /// Literal substitutions applied across the assembled bundle
    /// (`"%%VERSION%%" = "<%= version %>"`).
    #[serde(default)]
    pub replace: BTreeMap<String, String>,
    /// Bare specifiers left for the host environment to provide.
    #[serde(default)]
    pub external: Vec<String>,
    /// Global name the entry module's exports are assigned to.
    #[serde(default)]
    pub standalone: Option<String>,
}

/// The bundle transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bundle;

impl Transform for Bundle {
    fn description(&self) -> &'static str {
        "flatten an entry module and its require() graph into one file"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        let options: BundleOptions = input.parse_options()?;
        let destination = input.require_destination()?;
        let bundle = build(&input.sources, &options)?;
        Ok(TransformOutput::single(destination.clone(), bundle))
    }
}

fn module_id(path: &Path) -> String {
    crate::fs::normalize(path).to_string_lossy().replace('\\', "/")
}

/// A module reached from the entry point.
struct Module<'a> {
    source: &'a SourceFile,
    /// Specifier as written → module id, for every bundled dependency.
    deps: Vec<(String, String)>,
}

struct Resolver<'a> {
    by_id: HashMap<String, &'a SourceFile>,
    external: &'a [String],
}

impl<'a> Resolver<'a> {
    fn new(sources: &'a [SourceFile], external: &'a [String]) -> Self {
        let mut by_id = HashMap::new();
        for source in sources {
            by_id.entry(module_id(&source.path)).or_insert(source);
        }
        Self { by_id, external }
    }

    /// Resolve `specifier` required from module `from`.
    ///
    /// Returns `Ok(None)` for declared externals.
    fn resolve(&self, specifier: &str, from: &str) -> Result<Option<String>, BundleError> {
        if !specifier.starts_with("./") && !specifier.starts_with("../") {
            if self.external.iter().any(|e| e == specifier) {
                return Ok(None);
            }
            return Err(BundleError::Unresolvable {
                specifier: specifier.to_string(),
                from: from.to_string(),
            });
        }
        let base = Path::new(from).parent().unwrap_or_else(|| Path::new(""));
        let joined = base.join(specifier);
        let has_extension = joined.extension().is_some_and(|e| e == "js" || e == "json");
        let mut candidates = Vec::with_capacity(3);
        if has_extension {
            candidates.push(joined.clone());
        }
        let mut with_js = joined.clone().into_os_string();
        with_js.push(".js");
        candidates.push(PathBuf::from(with_js));
        candidates.push(joined.join("index.js"));

        candidates
            .iter()
            .map(|c| module_id(c))
            .find(|id| self.by_id.contains_key(id))
            .map(Some)
            .ok_or_else(|| BundleError::MissingModule {
                specifier: specifier.to_string(),
                from: from.to_string(),
            })
    }

    fn module(&self, id: &str) -> Result<Module<'a>, BundleError> {
        let source = self.by_id.get(id).copied().ok_or_else(|| BundleError::MissingModule {
            specifier: id.to_string(),
            from: "<entry>".to_string(),
        })?;
        let mut deps = Vec::new();
        for specifier in requires(source)? {
            if let Some(target) = self.resolve(&specifier, id)? {
                if !deps.iter().any(|(s, _)| *s == specifier) {
                    deps.push((specifier, target));
                }
            }
        }
        Ok(Module { source, deps })
    }
}

/// `require("…")` specifiers in source order.
///
/// A call counts only when `require(` is code, its argument is a single
/// string literal, and the parenthesis closes right after it; text inside
/// strings, templates and comments is never a dependency.
fn requires(source: &SourceFile) -> Result<Vec<String>, BundleError> {
    let segments = lexer::segments(&source.contents).map_err(|e| BundleError::Syntax {
        file: source.display_path(),
        what: e.what,
        line: e.line,
    })?;
    Ok(segments
        .windows(3)
        .filter_map(|w| match w {
            [call, arg, close]
                if call.kind == SegmentKind::Code
                    && arg.kind == SegmentKind::String
                    && close.kind == SegmentKind::Code
                    && REQUIRE_CALL_RE.is_match(call.text)
                    && close.text.trim_start().starts_with(')') =>
            {
                arg.text.get(1..arg.text.len().saturating_sub(1))
            }
            _ => None,
        })
        .filter(|specifier| !specifier.is_empty())
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Depth-first post-order from `id`; dependencies land before dependents.
fn visit<'a>(
    id: &str,
    resolver: &Resolver<'a>,
    marks: &mut HashMap<String, Mark>,
    stack: &mut Vec<String>,
    order: &mut Vec<(String, Module<'a>)>,
) -> Result<(), BundleError> {
    marks.insert(id.to_string(), Mark::InProgress);
    stack.push(id.to_string());

    let module = resolver.module(id)?;
    for (_, dep) in &module.deps {
        match marks.get(dep) {
            Some(Mark::Done) => {}
            Some(Mark::InProgress) => {
                let start = stack.iter().position(|s| s == dep).unwrap_or_default();
                let mut chain: Vec<String> = stack.get(start..).unwrap_or_default().to_vec();
                chain.push(dep.clone());
                return Err(BundleError::Cycle(chain));
            }
            None => visit(dep, resolver, marks, stack, order)?,
        }
    }

    stack.pop();
    marks.insert(id.to_string(), Mark::Done);
    order.push((id.to_string(), module));
    Ok(())
}

/// Modules reachable from the first source, dependencies first.
fn ordered<'a>(
    sources: &'a [SourceFile],
    external: &'a [String],
) -> Result<Vec<(String, Module<'a>)>, BundleError> {
    let entry = sources.first().ok_or(BundleError::NoEntry)?;
    let resolver = Resolver::new(sources, external);
    let mut order = Vec::new();
    visit(
        &module_id(&entry.path),
        &resolver,
        &mut HashMap::new(),
        &mut Vec::new(),
        &mut order,
    )?;
    Ok(order)
}

/// Module ids reachable from the entry, dependencies first.
///
/// # Errors
///
/// Returns a [`BundleError`] for a missing entry, a missing or unresolvable
/// module, or a dependency cycle.
pub fn load_order(
    sources: &[SourceFile],
    external: &[String],
) -> Result<Vec<String>, BundleError> {
    Ok(ordered(sources, external)?
        .into_iter()
        .map(|(id, _)| id)
        .collect())
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

/// Assemble the bundle text.
///
/// # Errors
///
/// See [`load_order`].
pub fn build(sources: &[SourceFile], options: &BundleOptions) -> Result<String, BundleError> {
    let order = ordered(sources, &options.external)?;
    let entry_id = order
        .last()
        .map(|(id, _)| id.clone())
        .ok_or(BundleError::NoEntry)?;

    let mut out = String::new();
    out.push_str("(function () {\n");
    out.push_str("var modules = {};\nvar cache = {};\n");
    out.push_str(
        "function load(id) {\n\
         if (cache[id]) { return cache[id].exports; }\n\
         var module = cache[id] = { exports: {} };\n\
         var entry = modules[id];\n\
         entry[0].call(module.exports, function (name) {\n\
         var target = entry[1][name];\n\
         return target === undefined ? require(name) : load(target);\n\
         }, module, module.exports);\n\
         return module.exports;\n\
         }\n",
    );
    for (id, module) in &order {
        let map: Vec<String> = module
            .deps
            .iter()
            .map(|(spec, target)| format!("{}: {}", js_string(spec), js_string(target)))
            .collect();
        let _ = write!(
            out,
            "modules[{}] = [function (require, module, exports) {{\n{}\n}}, {{{}}}];\n",
            js_string(id),
            module.source.contents.trim_end(),
            map.join(", ")
        );
    }
    match &options.standalone {
        Some(name) => {
            let _ = writeln!(
                out,
                "(typeof self !== \"undefined\" ? self : this)[{}] = load({});",
                js_string(name),
                js_string(&entry_id)
            );
        }
        None => {
            let _ = writeln!(out, "load({});", js_string(&entry_id));
        }
    }
    out.push_str("}).call(this);\n");

    for (from, to) in &options.replace {
        out = out.replace(from.as_str(), to);
    }
    if let Some(banner) = &options.banner {
        out.insert_str(0, banner);
    }
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn src(path: &str, contents: &str) -> SourceFile {
        SourceFile::new(path, contents)
    }

    #[test]
    fn dependencies_precede_dependents() {
        let sources = vec![
            src("src/a.js", "var b = require(\"./b\");\nmodule.exports = b + 1; // A_BODY\n"),
            src("src/b.js", "module.exports = 41; // B_BODY\n"),
        ];
        let out = build(&sources, &BundleOptions::default()).unwrap();
        let b = out.find("B_BODY").unwrap();
        let a = out.find("A_BODY").unwrap();
        assert!(b < a, "B must be emitted before A:\n{out}");
        assert!(out.contains("{\"./b\": \"src/b.js\"}"));
        assert!(out.trim_end().ends_with("load(\"src/a.js\");\n}).call(this);"));
    }

    #[test]
    fn diamond_emits_each_module_once() {
        let sources = vec![
            src("main.js", "require('./left'); require('./right');"),
            src("left.js", "require('./shared');"),
            src("right.js", "require('./shared.js');"),
            src("shared.js", "// shared"),
        ];
        let order = load_order(&sources, &[]).unwrap();
        assert_eq!(order, vec!["shared.js", "left.js", "right.js", "main.js"]);
    }

    #[test]
    fn resolves_parent_and_index_paths() {
        let sources = vec![
            src("src/app/main.js", "require('../util'); require('../core');"),
            src("src/util.js", ""),
            src("src/core/index.js", ""),
        ];
        let order = load_order(&sources, &[]).unwrap();
        assert_eq!(order, vec!["src/util.js", "src/core/index.js", "src/app/main.js"]);
    }

    #[test]
    fn unreachable_sources_are_left_out() {
        let sources = vec![src("a.js", "1;"), src("unused.js", "2;")];
        assert_eq!(load_order(&sources, &[]).unwrap(), vec!["a.js"]);
    }

    #[test]
    fn missing_module_fails() {
        let sources = vec![src("src/a.js", "require('./nope');")];
        let err = load_order(&sources, &[]).unwrap_err();
        assert_eq!(
            err,
            BundleError::MissingModule {
                specifier: "./nope".to_string(),
                from: "src/a.js".to_string(),
            }
        );
    }

    #[test]
    fn cycle_fails_with_chain() {
        let sources = vec![
            src("a.js", "require('./b');"),
            src("b.js", "require('./c');"),
            src("c.js", "require('./b');"),
        ];
        let err = load_order(&sources, &[]).unwrap_err();
        assert_eq!(
            err,
            BundleError::Cycle(vec!["b.js".into(), "c.js".into(), "b.js".into()])
        );
    }

    #[test]
    fn bare_specifiers_need_external() {
        let sources = vec![src("a.js", "var gl = require('gl-matrix');")];
        assert!(matches!(
            load_order(&sources, &[]),
            Err(BundleError::Unresolvable { .. })
        ));
        let order = load_order(&sources, &["gl-matrix".to_string()]).unwrap();
        assert_eq!(order, vec!["a.js"]);
    }

    #[test]
    fn requires_in_comments_are_ignored() {
        let sources = vec![src("a.js", "// require('./gone')\n/* require('./gone') */\nx.require('./gone');")];
        assert_eq!(load_order(&sources, &[]).unwrap(), vec!["a.js"]);
    }

    #[test]
    fn require_text_inside_literals_is_not_a_dependency() {
        let entry = "var msg = \"call require('./plugin') to extend\";\n\
                     var t = `require(\"./other\")`;\n\
                     var r = require('./real');\n";
        let sources = vec![src("a.js", entry), src("real.js", "module.exports = 1;")];
        assert_eq!(load_order(&sources, &[]).unwrap(), vec!["real.js", "a.js"]);
    }

    #[test]
    fn computed_require_is_left_alone() {
        let sources = vec![src("a.js", "var m = require('./' + name);")];
        assert_eq!(load_order(&sources, &[]).unwrap(), vec!["a.js"]);
    }

    #[test]
    fn replace_banner_and_standalone() {
        let sources = vec![src("src/picogl.js", "module.exports = { version: \"%%VERSION%%\" };")];
        let options = BundleOptions {
            banner: Some("/* banner */\n".to_string()),
            replace: [("%%VERSION%%".to_string(), "1.2.3".to_string())].into(),
            external: vec![],
            standalone: Some("PicoGL".to_string()),
        };
        let out = build(&sources, &options).unwrap();
        assert!(out.starts_with("/* banner */\n(function () {"));
        assert!(out.contains("version: \"1.2.3\""));
        assert!(!out.contains("%%VERSION%%"));
        assert!(out.contains("[\"PicoGL\"] = load(\"src/picogl.js\");"));
    }

    #[test]
    fn transform_needs_destination() {
        let input = TransformInput {
            task: "bundle".to_string(),
            sources: vec![src("a.js", "1;")],
            ..TransformInput::default()
        };
        assert!(matches!(
            Bundle.apply(&input),
            Err(TransformError::InvalidOptions(_))
        ));
    }

    #[test]
    fn transform_writes_destination() {
        let input = TransformInput {
            task: "bundle".to_string(),
            sources: vec![src("a.js", "1;")],
            destination: Some(PathBuf::from("build/lib.js")),
            options: json!({ "external": [] }).as_object().cloned().unwrap(),
            ..TransformInput::default()
        };
        let out = Bundle.apply(&input).unwrap();
        assert_eq!(out.files[0].path, PathBuf::from("build/lib.js"));
    }

    #[test]
    fn empty_sources_have_no_entry() {
        assert_eq!(load_order(&[], &[]).unwrap_err(), BundleError::NoEntry);
    }
}
