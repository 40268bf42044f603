//! Conservative whitespace and comment compaction.
//!
//! Sources are scanned with the shared lexer, so string, template and regex
//! literals are copied through untouched. Line breaks survive (collapsed to
//! one) which keeps automatic semicolon insertion intact; other whitespace is
//! kept only where dropping it would merge two tokens into a different one.
use serde::Deserialize;

use super::lexer::{self, Segment, SegmentKind};
use super::{SourceFile, Transform, TransformInput, TransformOutput};
use crate::error::{MinifyError, TransformError};

/// Options accepted by the minify transform.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinifyOptions {
    /// Text prepended verbatim to the output.
    #[serde(default)]
    pub banner: Option<String>,
}

/// The minify transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Minify;

impl Transform for Minify {
    fn description(&self) -> &'static str {
        "strip comments and insignificant whitespace"
    }

    fn apply(&self, input: &TransformInput) -> Result<TransformOutput, TransformError> {
        let options: MinifyOptions = input.parse_options()?;
        let destination = input.require_destination()?;
        let mut out = options.banner.unwrap_or_default();
        for source in &input.sources {
            out.push_str(&minify(source)?);
        }
        Ok(TransformOutput::single(destination.clone(), out))
    }
}

const fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}

/// Whether `prev` and `next` need a space between them to stay two tokens.
fn needs_space(prev: char, next: char, prev_is_regex: bool) -> bool {
    (is_word(prev) && is_word(next))
        || (prev_is_regex && is_word(next))
        || (prev == '+' && next == '+')
        || (prev == '-' && next == '-')
        || (prev == '/' && (next == '/' || next == '*'))
        || (prev.is_ascii_digit() && next == '.')
        || (prev == '<' && next == '!')
        || (prev == '-' && next == '>')
}

#[derive(Default)]
struct Writer {
    out: String,
    space: bool,
    newline: bool,
    last_regex: bool,
}

impl Writer {
    fn emit(&mut self, piece: &str, regex: bool) {
        let Some(next) = piece.chars().next() else {
            return;
        };
        if let Some(prev) = self.out.chars().next_back() {
            if self.newline {
                if prev != '\n' {
                    self.out.push('\n');
                }
            } else if self.space && needs_space(prev, next, self.last_regex) {
                self.out.push(' ');
            }
        }
        self.out.push_str(piece);
        self.space = false;
        self.newline = false;
        self.last_regex = regex;
    }

    fn code(&mut self, text: &str) {
        let mut buf = [0_u8; 4];
        for c in text.chars() {
            match c {
                '\n' => self.newline = true,
                c if c.is_whitespace() => self.space = true,
                c => self.emit(c.encode_utf8(&mut buf), false),
            }
        }
    }

    fn segment(&mut self, seg: &Segment<'_>) {
        match seg.kind {
            SegmentKind::Code => self.code(seg.text),
            SegmentKind::LineComment => self.space = true,
            SegmentKind::BlockComment if seg.text.contains('\n') => self.newline = true,
            SegmentKind::BlockComment => self.space = true,
            SegmentKind::Regex => self.emit(seg.text, true),
            SegmentKind::String | SegmentKind::Template => self.emit(seg.text, false),
        }
    }

    fn finish(mut self) -> String {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out
    }
}

/// Minify one source file.
///
/// # Errors
///
/// Returns [`MinifyError::Unterminated`] for a string, template, regex or
/// comment that never closes.
pub fn minify(source: &SourceFile) -> Result<String, MinifyError> {
    let segments = lexer::segments(&source.contents).map_err(|e| MinifyError::Unterminated {
        file: source.display_path(),
        what: e.what,
        line: e.line,
    })?;
    let mut writer = Writer::default();
    for seg in &segments {
        writer.segment(seg);
    }
    Ok(writer.finish())
}
