//! Placeholder rendering for banners, paths, and option values.
//!
//! Two token syntaxes are recognised and looked up verbatim in a
//! [`TemplateContext`]:
//!
//! - `%%NAME%%` where `NAME` is made of ASCII letters, digits, `_` and `.`
//! - `<%= name %>` where surrounding whitespace inside the tag is ignored
//!
//! Rendering is a single pass: substituted values are never scanned again.
use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::TemplateError;

/// Immutable mapping from placeholder name to its value.
///
/// # Examples
///
/// ```
/// use jsforge::template::{TemplateContext, render};
///
/// let ctx = TemplateContext::new().with("VERSION", "1.2.3");
/// assert_eq!(render("/* v%%VERSION%% */", &ctx), "/* v1.2.3 */");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Look up a placeholder.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Number of placeholders defined.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no placeholders are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

/// A placeholder found in a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    /// Full token text, delimiters included.
    raw: &'a str,
    /// Lookup key.
    key: &'a str,
}

fn percent_token(tail: &str) -> Option<Token<'_>> {
    let inner = tail.strip_prefix("%%")?;
    let end = inner.find("%%")?;
    let key = inner.get(..end)?;
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if !valid {
        return None;
    }
    Some(Token {
        raw: tail.get(..end + 4)?,
        key,
    })
}

fn erb_token(tail: &str) -> Option<Token<'_>> {
    let inner = tail.strip_prefix("<%=")?;
    let end = inner.find("%>")?;
    let key = inner.get(..end)?.trim();
    if key.is_empty() {
        return None;
    }
    Some(Token {
        raw: tail.get(..end + 5)?,
        key,
    })
}

/// Find the first placeholder in `s`, returning its byte offset.
fn next_token(s: &str) -> Option<(usize, Token<'_>)> {
    let mut from = 0;
    while let Some(offset) = s.get(from..)?.find(['%', '<']) {
        let at = from + offset;
        let tail = s.get(at..)?;
        if let Some(token) = percent_token(tail).or_else(|| erb_token(tail)) {
            return Some((at, token));
        }
        from = at + 1;
    }
    None
}

fn expand(template: &str, ctx: &TemplateContext, strict: bool) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((at, token)) = next_token(rest) {
        out.push_str(rest.get(..at).unwrap_or_default());
        match ctx.get(token.key) {
            Some(value) => out.push_str(value),
            None if strict => return Err(TemplateError::Unresolved(token.raw.to_string())),
            None => out.push_str(token.raw),
        }
        rest = rest.get(at + token.raw.len()..).unwrap_or_default();
    }
    out.push_str(rest);
    Ok(out)
}

/// Render `template`, leaving unresolved placeholders untouched.
#[must_use]
pub fn render(template: &str, ctx: &TemplateContext) -> String {
    expand(template, ctx, false).unwrap_or_else(|_| template.to_string())
}

/// Render `template`, failing on the first unresolved placeholder.
///
/// # Errors
///
/// Returns [`TemplateError::Unresolved`] naming the placeholder as written.
pub fn render_strict(template: &str, ctx: &TemplateContext) -> Result<String, TemplateError> {
    expand(template, ctx, true)
}

/// Render every string inside an options value.
///
/// Arrays and object values are rendered recursively; object keys are left
/// as written so literal patterns can be used as keys.
///
/// # Errors
///
/// Returns an error only when `strict` is set and a placeholder is unresolved.
pub fn render_value(
    value: &Value,
    ctx: &TemplateContext,
    strict: bool,
) -> Result<Value, TemplateError> {
    Ok(match value {
        Value::String(s) => Value::String(expand(s, ctx, strict)?),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_value(v, ctx, strict))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), render_value(v, ctx, strict)?);
            }
            Value::Object(out)
        }
        other => other.clone(),
    })
}
