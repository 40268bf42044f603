//! Style and correctness checks over JavaScript sources.
//!
//! Every source is checked independently and all violations across all
//! files are returned together, so one run reports everything to fix.
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde::de::IgnoredAny;

use super::lexer::{self, Segment, SegmentKind};
use super::{SourceFile, Transform, TransformInput, TransformOutput};
use crate::error::{LintViolation, TransformError};

#[allow(clippy::expect_used)]
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static lint pattern")
}

static DECLARATION_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:var|let|const)\s+([A-Za-z_$][\w$]*)"));
static FUNCTION_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^[ \t]*function\s+([A-Za-z_$][\w$]*)"));
static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"[A-Za-z_$][\w$]*"));
static NEW_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"\bnew\s+([A-Za-z_$][\w$.]*)"));
static NEW_STATEMENT_RE: LazyLock<Regex> = LazyLock::new(|| compile(r"^\s*new\s"));
static EXIT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^\s*(return|throw|break|continue)\b[^{}]*;\s*$"));

/// Rule set for one lint task, read from the task's options.
///
/// Options that need a full parser or only describe the environment are
/// accepted so existing rule sets load, but they have no effect.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintRules {
    /// Forbid `==` and `!=`.
    #[serde(default)]
    pub eqeqeq: bool,
    /// Require a `"use strict"` directive in every file.
    #[serde(default)]
    pub strict: bool,
    /// Indentation width; leading spaces must be a multiple of it and tabs are rejected.
    #[serde(default)]
    pub indent: Option<usize>,
    /// Forbid trailing whitespace.
    #[serde(default)]
    pub trailing: bool,
    /// Require constructors invoked with `new` to be capitalized.
    #[serde(default)]
    pub newcap: bool,
    /// Forbid `new` used only for side effects.
    #[serde(default)]
    pub nonew: bool,
    /// Forbid bindings that are declared but never referenced.
    #[serde(default)]
    pub unused: bool,
    /// Forbid statements directly after `return`/`throw`/`break`/`continue`.
    #[serde(default)]
    pub unreachable: bool,
    /// Maximum line length in characters.
    #[serde(default)]
    pub maxlen: Option<usize>,
    #[serde(default, rename = "undef")]
    _undef: Option<IgnoredAny>,
    #[serde(default, rename = "immed")]
    _immed: Option<IgnoredAny>,
    #[serde(default, rename = "latedef")]
    _latedef: Option<IgnoredAny>,
    #[serde(default, rename = "browser")]
    _browser: Option<IgnoredAny>,
    #[serde(default, rename = "node")]
    _node: Option<IgnoredAny>,
    #[serde(default, rename = "devel")]
    _devel: Option<IgnoredAny>,
    #[serde(default, rename = "browserify")]
    _browserify: Option<IgnoredAny>,
    #[serde(default, rename = "globals")]
    _globals: Option<IgnoredAny>,
}

/// The lint transform. Produces no files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lint;

impl Transform for Lint {
    fn description(&self) -> &'static str {
        "check sources against a rule set; all violations are reported together"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        let rules: LintRules = input.parse_options()?;
        if rules.indent == Some(0) {
            return Err(TransformError::InvalidOptions(
                "indent must be at least 1".to_string(),
            ));
        }

        let violations: Vec<LintViolation> = input
            .sources
            .iter()
            .flat_map(|source| check_file(source, &rules))
            .collect();

        if violations.is_empty() {
            Ok(TransformOutput::none())
        } else {
            Err(TransformError::Lint(violations))
        }
    }
}

/// Collects violations for a single file.
struct Checker<'a> {
    file: String,
    rules: &'a LintRules,
    violations: Vec<LintViolation>,
}

impl Checker<'_> {
    fn report(&mut self, line: usize, column: usize, rule: &'static str, message: String) {
        self.violations.push(LintViolation {
            file: self.file.clone(),
            line,
            column,
            rule,
            message,
        });
    }
}

/// Check one source file against `rules`.
#[must_use]
pub fn check_file(source: &SourceFile, rules: &LintRules) -> Vec<LintViolation> {
    let mut checker = Checker {
        file: source.display_path(),
        rules,
        violations: Vec::new(),
    };

    let segments = match lexer::segments(&source.contents) {
        Ok(segments) => segments,
        Err(e) => {
            checker.report(e.line, 1, "syntax", format!("unterminated {}", e.what));
            return checker.violations;
        }
    };
    let masked = lexer::mask(&segments);
    let raw_lines: Vec<&str> = source
        .contents
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let mask_lines: Vec<&str> = masked
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    if rules.strict {
        check_strict(&mut checker, &segments);
    }
    for (idx, (raw, code)) in raw_lines.iter().zip(&mask_lines).enumerate() {
        let line = idx + 1;
        check_whitespace(&mut checker, line, raw, code);
        if rules.eqeqeq {
            check_eqeqeq(&mut checker, line, code);
        }
        if rules.newcap {
            check_newcap(&mut checker, line, code);
        }
    }
    if rules.nonew {
        check_nonew(&mut checker, &mask_lines);
    }
    if rules.unreachable {
        check_unreachable(&mut checker, &mask_lines);
    }
    if rules.unused {
        check_unused(&mut checker, &masked);
    }

    checker
        .violations
        .sort_by(|a, b| (a.line, a.column).cmp(&(b.line, b.column)));
    checker.violations
}

fn check_strict(checker: &mut Checker<'_>, segments: &[Segment<'_>]) {
    let has_directive = segments.iter().any(|s| {
        s.kind == SegmentKind::String
            && s.text.get(1..s.text.len().saturating_sub(1)) == Some("use strict")
    });
    if !has_directive {
        checker.report(1, 1, "strict", "missing \"use strict\" directive".to_string());
    }
}

fn check_whitespace(checker: &mut Checker<'_>, line: usize, raw: &str, code: &str) {
    let rules = checker.rules;
    if rules.trailing && raw.ends_with([' ', '\t']) {
        let column = raw.trim_end_matches([' ', '\t']).chars().count() + 1;
        checker.report(line, column, "trailing", "trailing whitespace".to_string());
    }
    if let Some(max) = rules.maxlen {
        let len = raw.chars().count();
        if len > max {
            checker.report(
                line,
                max + 1,
                "maxlen",
                format!("line is {len} characters long, limit is {max}"),
            );
        }
    }
    let Some(width) = rules.indent else {
        return;
    };
    let leading: String = raw.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
    let starts_in_code = code
        .chars()
        .nth(leading.chars().count())
        .is_some_and(|c| c != ' ');
    if !starts_in_code {
        return;
    }
    if leading.contains('\t') {
        checker.report(line, 1, "indent", "tab used for indentation".to_string());
    } else if leading.len() % width != 0 {
        checker.report(
            line,
            leading.len() + 1,
            "indent",
            format!(
                "expected indentation to be a multiple of {width}, found {}",
                leading.len()
            ),
        );
    }
}

fn check_eqeqeq(checker: &mut Checker<'_>, line: usize, code: &str) {
    let chars: Vec<char> = code.chars().collect();
    for (i, window) in chars.windows(2).enumerate() {
        let [first, second] = window else { continue };
        if *second != '=' || chars.get(i + 2) == Some(&'=') {
            continue;
        }
        let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
        let found = match *first {
            '=' if !matches!(prev, Some('=' | '!' | '<' | '>')) => "==",
            '!' => "!=",
            _ => continue,
        };
        checker.report(
            line,
            i + 1,
            "eqeqeq",
            format!("expected '{found}=' and instead saw '{found}'"),
        );
    }
}

fn check_newcap(checker: &mut Checker<'_>, line: usize, code: &str) {
    for caps in NEW_RE.captures_iter(code) {
        let Some(path) = caps.get(1) else { continue };
        let name = path.as_str().rsplit('.').next().unwrap_or_default();
        if name.chars().next().is_some_and(char::is_lowercase) {
            let column = code.get(..path.start()).unwrap_or_default().chars().count() + 1;
            checker.report(
                line,
                column,
                "newcap",
                format!("constructor '{name}' should start with an uppercase letter"),
            );
        }
    }
}

/// The last non-blank line before `idx`, trimmed.
fn previous_code<'a>(lines: &[&'a str], idx: usize) -> Option<&'a str> {
    lines
        .get(..idx)?
        .iter()
        .rev()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
}

fn check_nonew(checker: &mut Checker<'_>, lines: &[&str]) {
    for (idx, code) in lines.iter().enumerate() {
        if !NEW_STATEMENT_RE.is_match(code) {
            continue;
        }
        let statement_start = previous_code(lines, idx)
            .is_none_or(|prev| prev.ends_with([';', '{', '}']));
        if statement_start {
            let column = code.len() - code.trim_start().len() + 1;
            checker.report(
                idx + 1,
                column,
                "nonew",
                "do not use 'new' for side effects".to_string(),
            );
        }
    }
}

fn check_unreachable(checker: &mut Checker<'_>, lines: &[&str]) {
    for (idx, code) in lines.iter().enumerate() {
        let Some(caps) = EXIT_RE.captures(code) else {
            continue;
        };
        let keyword = caps.get(1).map_or("return", |m| m.as_str());
        let next = lines
            .iter()
            .enumerate()
            .skip(idx + 1)
            .find(|(_, l)| !l.trim().is_empty());
        let Some((next_idx, next_line)) = next else {
            continue;
        };
        let trimmed = next_line.trim_start();
        let closes_block = trimmed.starts_with('}')
            || trimmed.starts_with("case ")
            || trimmed.starts_with("default:")
            || trimmed.starts_with("default :");
        if !closes_block && !trimmed.starts_with("function ") {
            checker.report(
                next_idx + 1,
                next_line.len() - trimmed.len() + 1,
                "unreachable",
                format!("unreachable code after '{keyword}'"),
            );
        }
    }
}

/// 1-based line and column of a byte offset.
fn position(text: &str, offset: usize) -> (usize, usize) {
    let before = text.get(..offset).unwrap_or_default();
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before.get(line_start..).unwrap_or_default().chars().count() + 1;
    (line, column)
}

fn check_unused(checker: &mut Checker<'_>, masked: &str) {
    let mut references: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for m in IDENT_RE.find_iter(masked) {
        let after_dot = masked
            .get(..m.start())
            .is_some_and(|before| before.trim_end().ends_with('.'));
        if !after_dot {
            *references.entry(m.as_str()).or_default() += 1;
        }
    }

    let declarations = DECLARATION_RE
        .captures_iter(masked)
        .chain(FUNCTION_DECL_RE.captures_iter(masked))
        .filter_map(|caps| caps.get(1));
    for name in declarations {
        if references.get(name.as_str()).copied().unwrap_or_default() <= 1 {
            let (line, column) = position(masked, name.start());
            checker.report(
                line,
                column,
                "unused",
                format!("'{}' is defined but never used", name.as_str()),
            );
        }
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
    use serde_json::json;

    fn rules(options: serde_json::Value) -> LintRules {
        serde_json::from_value(options).unwrap()
    }

    fn lint(src: &str, options: serde_json::Value) -> Vec<LintViolation> {
        check_file(&SourceFile::new("src/a.js", src), &rules(options))
    }

    fn rule_names(violations: &[LintViolation]) -> Vec<&'static str> {
        violations.iter().map(|v| v.rule).collect()
    }

    #[test]
    fn clean_file_passes_full_rule_set() {
        let src = "\"use strict\";\n\nfunction Point(x) {\n    this.x = x;\n}\n\nmodule.exports = function make(x) {\n    if (x === 1) {\n        return new Point(x);\n    }\n    return null;\n};\n";
        let v = lint(
            src,
            json!({
                "eqeqeq": true, "strict": true, "indent": 4, "trailing": true,
                "newcap": true, "nonew": true, "unused": true, "unreachable": true,
                "undef": true, "browser": true, "globals": { "PicoGL": true }
            }),
        );
        assert!(v.is_empty(), "unexpected violations: {v:?}");
    }

    #[test]
    fn eqeqeq_flags_loose_comparisons_only() {
        let v = lint(
            "if (a == b && c != d && e === f && g !== h && i <= j) {}\n",
            json!({ "eqeqeq": true }),
        );
        assert_eq!(rule_names(&v), vec!["eqeqeq", "eqeqeq"]);
        assert_eq!(v[0].column, 7);
        assert!(v[1].message.contains("'!=='"));
    }

    #[test]
    fn eqeqeq_ignores_strings_and_comments() {
        let v = lint(
            "var s = \"a == b\"; // c != d\nuse(s);\n",
            json!({ "eqeqeq": true }),
        );
        assert!(v.is_empty());
    }

    #[test]
    fn strict_requires_directive() {
        let v = lint("var a = 1;\n", json!({ "strict": true }));
        assert_eq!(rule_names(&v), vec!["strict"]);
        assert!(lint("'use strict';\n", json!({ "strict": true })).is_empty());
    }

    #[test]
    fn indent_checks_multiples_and_tabs() {
        let src = "function f() {\n   var a;\n\tvar b;\n    /**\n     * doc\n     */\n}\n";
        let v = lint(src, json!({ "indent": 4 }));
        assert_eq!(rule_names(&v), vec!["indent", "indent"]);
        assert_eq!((v[0].line, v[1].line), (2, 3));
    }

    #[test]
    fn trailing_whitespace_is_reported_with_column() {
        let v = lint("var a = 1;  \n", json!({ "trailing": true }));
        assert_eq!(rule_names(&v), vec!["trailing"]);
        assert_eq!(v[0].column, 11);
    }

    #[test]
    fn newcap_and_nonew() {
        let src = "var x = new foo.bar();\nnew Widget();\nvar y =\n    new Widget();\nuse(x, y);\n";
        let v = lint(src, json!({ "newcap": true, "nonew": true }));
        assert_eq!(rule_names(&v), vec!["newcap", "nonew"]);
        assert_eq!(v[1].line, 2);
    }

    #[test]
    fn unused_bindings_are_reported() {
        let src = "var used = 1;\nvar unused = 2;\nfunction helper() {}\nconsole.log(used, obj.unused);\n";
        let v = lint(src, json!({ "unused": true }));
        let names: Vec<&str> = v.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "'unused' is defined but never used",
                "'helper' is defined but never used"
            ]
        );
        assert_eq!((v[0].line, v[0].column), (2, 5));
    }

    #[test]
    fn template_interpolation_counts_as_use() {
        let src = "var name = \"x\";\nmodule.exports = `hi ${name}`;\n";
        assert!(lint(src, json!({ "unused": true })).is_empty());
    }

    #[test]
    fn template_text_is_not_a_use() {
        let src = "var name = \"x\";\nmodule.exports = `hi name`;\n";
        let v = lint(src, json!({ "unused": true }));
        assert_eq!(rule_names(&v), vec!["unused"]);
        assert_eq!((v[0].line, v[0].column), (1, 5));
    }

    #[test]
    fn eqeqeq_applies_inside_interpolations() {
        let src = "var s = `${a == b} and == text`;\n";
        let v = lint(src, json!({ "eqeqeq": true }));
        assert_eq!(rule_names(&v), vec!["eqeqeq"]);
        assert_eq!(v[0].column, 14);
    }

    #[test]
    fn unreachable_after_return() {
        let src = "function f() {\n    return 1;\n    g();\n}\nswitch (a) {\ncase 1:\n    break;\ncase 2:\n}\n";
        let v = lint(src, json!({ "unreachable": true }));
        assert_eq!(rule_names(&v), vec!["unreachable"]);
        assert_eq!(v[0].line, 3);
    }

    #[test]
    fn maxlen_limits_line_length() {
        let v = lint("var abc = 1;\n", json!({ "maxlen": 5 }));
        assert_eq!(rule_names(&v), vec!["maxlen"]);
    }

    #[test]
    fn unterminated_literal_is_a_syntax_violation() {
        let v = lint("var s = 'oops;\n", json!({}));
        assert_eq!(rule_names(&v), vec!["syntax"]);
    }

    #[test]
    fn transform_aggregates_across_files() {
        let input = TransformInput {
            task: "lint".to_string(),
            sources: vec![
                SourceFile::new("src/a.js", "var a = 1;\n"),
                SourceFile::new("src/b.js", "if (x == y) {}\n"),
            ],
            options: json!({ "strict": true, "eqeqeq": true })
                .as_object()
                .cloned()
                .unwrap(),
            ..TransformInput::default()
        };
        let err = Lint.apply(&input).unwrap_err();
        let TransformError::Lint(violations) = err else {
            panic!("expected lint error");
        };
        let files: Vec<&str> = violations.iter().map(|v| v.file.as_str()).collect();
        assert_eq!(files, vec!["src/a.js", "src/b.js", "src/b.js"]);
    }

    #[test]
    fn unknown_rule_is_invalid_options() {
        let input = TransformInput {
            options: json!({ "semicolons": true }).as_object().cloned().unwrap(),
            ..TransformInput::default()
        };
        assert!(matches!(
            Lint.apply(&input),
            Err(TransformError::InvalidOptions(_))
        ));
    }
}
