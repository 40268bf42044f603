//! Minimal JavaScript scanner shared by the built-in transforms.
//!
//! Splits source text into code, literal and comment segments so that
//! rules and rewrites never look inside strings, templates, regular
//! expressions or comments. It does not build tokens beyond that.

use std::ops::Range;

/// Kind of a source segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// Plain code between literals and comments.
    Code,
    /// `'…'` or `"…"`, quotes included.
    String,
    /// `` `…` ``, backticks included.
    Template,
    /// `/…/flags`.
    Regex,
    /// `// …` up to (not including) the newline.
    LineComment,
    /// `/* … */`.
    BlockComment,
}

/// A contiguous slice of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
    /// 1-based line the segment starts on.
    pub line: usize,
}

impl Segment<'_> {
    pub(crate) const fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            SegmentKind::String | SegmentKind::Template | SegmentKind::Regex
        )
    }
}

/// A literal or comment that runs past the end of its line or the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LexError {
    pub what: &'static str,
    pub line: usize,
}

/// Keywords after which a `/` starts a regular expression.
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Whether a `/` following `code` (already right-trimmed) starts a regex.
fn regex_follows(code: &str) -> Option<bool> {
    let last = *code.as_bytes().last()?;
    if is_ident_byte(last) {
        let start = code
            .bytes()
            .rposition(|b| !is_ident_byte(b))
            .map_or(0, |i| i + 1);
        let word = code.get(start..).unwrap_or_default();
        return Some(REGEX_KEYWORDS.contains(&word));
    }
    Some(!matches!(last, b')' | b']'))
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    code_start: usize,
    code_line: usize,
    /// Whether the last non-comment thing seen was a value (so `/` divides).
    after_value: bool,
    segments: Vec<Segment<'a>>,
}

impl<'a> Lexer<'a> {
    const fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            code_start: 0,
            code_line: 1,
            after_value: false,
            segments: Vec::new(),
        }
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn peek_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    fn pending_code(&self) -> &'a str {
        self.src.get(self.code_start..self.pos).unwrap_or_default()
    }

    fn regex_allowed(&self) -> bool {
        regex_follows(self.pending_code().trim_end()).unwrap_or(!self.after_value)
    }

    fn flush_code(&mut self) {
        let code = self.pending_code();
        if !code.is_empty() {
            if let Some(allowed) = regex_follows(code.trim_end()) {
                self.after_value = !allowed;
            }
            self.segments.push(Segment {
                kind: SegmentKind::Code,
                text: code,
                line: self.code_line,
            });
        }
    }

    fn push(&mut self, kind: SegmentKind, end: usize, start_line: usize) {
        self.flush_code();
        self.segments.push(Segment {
            kind,
            text: self.src.get(self.pos..end).unwrap_or_default(),
            line: start_line,
        });
        if !matches!(kind, SegmentKind::LineComment | SegmentKind::BlockComment) {
            self.after_value = true;
        }
        self.pos = end;
        self.code_start = end;
        self.code_line = self.line;
    }

    fn quoted(&mut self, kind: SegmentKind, quote: u8) -> Result<(), LexError> {
        let start_line = self.line;
        let what = if kind == SegmentKind::Template {
            "template literal"
        } else {
            "string"
        };
        let mut i = self.pos + 1;
        loop {
            match self.bytes.get(i).copied() {
                None => return Err(LexError { what, line: start_line }),
                Some(b'\\') => {
                    if self.peek_at(i + 1) == Some(b'\n') {
                        self.line += 1;
                    }
                    i += 2;
                }
                Some(b) if b == quote => break,
                Some(b'\n') if kind == SegmentKind::String => {
                    return Err(LexError { what, line: start_line });
                }
                Some(b'\n') => {
                    self.line += 1;
                    i += 1;
                }
                Some(_) => i += 1,
            }
        }
        self.push(kind, i + 1, start_line);
        Ok(())
    }

    fn regex(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        let err = LexError {
            what: "regular expression",
            line: start_line,
        };
        let mut i = self.pos + 1;
        let mut in_class = false;
        loop {
            match self.bytes.get(i).copied() {
                None | Some(b'\n') => return Err(err),
                Some(b'\\') => i += 2,
                Some(b'[') => {
                    in_class = true;
                    i += 1;
                }
                Some(b']') => {
                    in_class = false;
                    i += 1;
                }
                Some(b'/') if !in_class => {
                    i += 1;
                    break;
                }
                Some(_) => i += 1,
            }
        }
        while self.bytes.get(i).is_some_and(|b| b.is_ascii_alphabetic()) {
            i += 1;
        }
        self.push(SegmentKind::Regex, i, start_line);
        Ok(())
    }

    fn line_comment(&mut self) {
        let end = self
            .src
            .get(self.pos..)
            .and_then(|rest| rest.find('\n'))
            .map_or(self.bytes.len(), |i| self.pos + i);
        let line = self.line;
        self.push(SegmentKind::LineComment, end, line);
    }

    fn block_comment(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        let Some(close) = self
            .src
            .get(self.pos + 2..)
            .and_then(|rest| rest.find("*/"))
        else {
            return Err(LexError {
                what: "comment",
                line: start_line,
            });
        };
        let end = self.pos + 2 + close + 2;
        let body = self.src.get(self.pos..end).unwrap_or_default();
        self.line += body.matches('\n').count();
        self.push(SegmentKind::BlockComment, end, start_line);
        Ok(())
    }

    fn run(mut self) -> Result<Vec<Segment<'a>>, LexError> {
        while let Some(b) = self.peek(0) {
            match b {
                b'"' | b'\'' => self.quoted(SegmentKind::String, b)?,
                b'`' => self.quoted(SegmentKind::Template, b'`')?,
                b'/' if self.peek(1) == Some(b'/') => self.line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.block_comment()?,
                b'/' if self.regex_allowed() => self.regex()?,
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        self.flush_code();
        Ok(self.segments)
    }
}

/// Split `src` into segments.
pub(crate) fn segments(src: &str) -> Result<Vec<Segment<'_>>, LexError> {
    Lexer::new(src).run()
}

/// Return `src` with comments blanked and literal bodies replaced by spaces.
///
/// `${…}` expressions inside template literals are code and stay visible
/// (masked in turn). Line breaks and the character count of every line are
/// preserved, so line/column positions in the mask match the original text.
pub(crate) fn mask(segments: &[Segment<'_>]) -> String {
    let mut out = String::new();
    for seg in segments {
        match seg.kind {
            SegmentKind::Code => out.push_str(seg.text),
            SegmentKind::Template => mask_template(seg.text, &mut out),
            _ => {
                let last = seg.text.chars().count().saturating_sub(1);
                for (i, c) in seg.text.chars().enumerate() {
                    let keep_delimiter = seg.is_literal() && (i == 0 || i == last);
                    if c == '\n' || keep_delimiter {
                        out.push(c);
                    } else {
                        out.push(' ');
                    }
                }
            }
        }
    }
    out
}

fn blank(text: &str, out: &mut String) {
    out.extend(text.chars().map(|c| if c == '\n' { c } else { ' ' }));
}

/// Mask a template literal, backticks included in `text`.
fn mask_template(text: &str, out: &mut String) {
    let Some(inner) = text.strip_prefix('`') else {
        blank(text, out);
        return;
    };
    let (inner, closed) = inner
        .strip_suffix('`')
        .map_or((inner, false), |body| (body, true));

    out.push('`');
    let mut pos = 0;
    for body in interpolations(inner) {
        let (Some(before), Some(code)) = (inner.get(pos..body.start), inner.get(body.clone()))
        else {
            break;
        };
        blank(before, out);
        match segments(code) {
            Ok(segs) => out.push_str(&mask(&segs)),
            Err(_) => blank(code, out),
        }
        pos = body.end;
    }
    blank(inner.get(pos..).unwrap_or_default(), out);
    if closed {
        out.push('`');
    }
}

/// Byte ranges of the `${…}` bodies in the text between a template's
/// backticks.
fn interpolations(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\\' => i += 2,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let start = i + 2;
                let end = interpolation_end(bytes, start);
                ranges.push(start..end);
                i = end + 1;
            }
            _ => i += 1,
        }
    }
    ranges
}

/// Index of the `}` closing an interpolation whose body starts at `start`,
/// or the end of `bytes` if it never closes.
fn interpolation_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while let Some(&b) = bytes.get(i) {
        match (quote, b) {
            (Some(_), b'\\') => i += 1,
            (Some(q), _) if b == q => quote = None,
            (None, b'"' | b'\'' | b'`') => quote = Some(b),
            (None, b'{') => depth += 1,
            (None, b'}') if depth == 0 => return i,
            (None, b'}') => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<SegmentKind> {
        segments(src).unwrap().iter().map(|s| s.kind).collect()
    }

    #[test]
    fn splits_strings_and_comments() {
        let segs = segments("var a = \"x//y\"; // note\nb();").unwrap();
        assert_eq!(
            segs.iter().map(|s| s.kind).collect::<Vec<_>>(),
            vec![
                SegmentKind::Code,
                SegmentKind::String,
                SegmentKind::Code,
                SegmentKind::LineComment,
                SegmentKind::Code,
            ]
        );
        assert_eq!(segs[1].text, "\"x//y\"");
        assert_eq!(segs[4].text, "\nb();");
    }

    #[test]
    fn division_is_not_a_regex() {
        assert_eq!(kinds("a = b / c / d;"), vec![SegmentKind::Code]);
        assert_eq!(kinds("f(x) / 2"), vec![SegmentKind::Code]);
    }

    #[test]
    fn regex_after_operator_or_keyword() {
        assert_eq!(
            kinds("x = /a\\/b[/]/g.test(s);"),
            vec![SegmentKind::Code, SegmentKind::Regex, SegmentKind::Code]
        );
        assert_eq!(
            kinds("return /ab+c/i;"),
            vec![SegmentKind::Code, SegmentKind::Regex, SegmentKind::Code]
        );
    }

    #[test]
    fn string_followed_by_division() {
        assert_eq!(
            kinds("\"10\" / 2"),
            vec![SegmentKind::String, SegmentKind::Code]
        );
    }

    #[test]
    fn template_may_span_lines() {
        let segs = segments("t = `a\nb`;\nnext").unwrap();
        assert_eq!(segs[1].kind, SegmentKind::Template);
        assert_eq!(segs.last().unwrap().line, 2);
    }

    #[test]
    fn block_comment_tracks_lines() {
        let segs = segments("/* a\n b\n */\nx").unwrap();
        assert_eq!(segs[0].kind, SegmentKind::BlockComment);
        assert_eq!(segs[1].line, 3);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = segments("var s = 'oops;\n").unwrap_err();
        assert_eq!(err.what, "string");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = segments("a;\n/* never closed").unwrap_err();
        assert_eq!(err.what, "comment");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn mask_keeps_template_interpolations() {
        let src = "t = `a == ${name + \"==\"} and ${ f({x: 1}) }`;";
        let masked = mask(&segments(src).unwrap());
        assert_eq!(masked.chars().count(), src.chars().count());
        assert!(masked.contains("name"));
        assert!(masked.contains("f({x: 1})"));
        assert_eq!(masked.matches("==").count(), 0);
        assert!(masked.starts_with("t = `"));
        assert!(masked.ends_with("`;"));
    }

    #[test]
    fn unclosed_interpolation_keeps_shape() {
        let src = "t = `x ${a`;";
        let masked = mask(&segments(src).unwrap());
        assert_eq!(masked.chars().count(), src.chars().count());
        assert!(masked.ends_with("`;"));
    }

    #[test]
    fn mask_preserves_shape() {
        let src = "a == \"b == c\"; // x == y\n/* z */ d";
        let masked = mask(&segments(src).unwrap());
        assert_eq!(masked.len(), src.len());
        assert_eq!(masked.matches("==").count(), 1);
        assert!(masked.contains("\"      \""));
        assert_eq!(masked.lines().count(), 2);
    }
}
