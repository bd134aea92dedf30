//! Character scanner for JavaScript-like sources.
//!
//! The scanner does not try to understand the language. It only tracks where
//! string literals, template literals and comments start and end so that the
//! text inside them can be rewritten while everything else is left alone.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    StringLiteral,
    TemplateLiteral,
    LineComment,
    BlockComment,
    Code,
}

impl SpanKind {
    /// Whether the body of a span of this kind may be rewritten
    pub fn is_translatable(self) -> bool {
        !matches!(self, SpanKind::Code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpanKind::StringLiteral => "string_literal",
            SpanKind::TemplateLiteral => "template_literal",
            SpanKind::LineComment => "comment",
            SpanKind::BlockComment => "multiline_comment",
            SpanKind::Code => "code",
        }
    }
}

/// A classified region of the source.
///
/// `range` covers the whole region including delimiters, `body` is the part
/// that is eligible for substitution. For strings and templates the body is
/// the text between the delimiters, for comments it is the whole comment
/// including the `//` or `/* */` markers. Code spans have `body == range`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub range: Range<usize>,
    pub body: Range<usize>,
}

impl Span {
    fn new(kind: SpanKind, range: Range<usize>, body: Range<usize>) -> Self {
        Span { kind, range, body }
    }

    pub fn prefix<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.start..self.body.start]
    }

    pub fn body_text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.body.clone()]
    }

    pub fn suffix<'a>(&self, source: &'a str) -> &'a str {
        &source[self.body.end..self.range.end]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePartKind {
    StaticText,
    Interpolation,
}

/// Piece of a template literal body, ranges are relative to the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePart {
    pub kind: TemplatePartKind,
    pub range: Range<usize>,
}

/// Split a source buffer into classified spans.
///
/// Spans are returned in order and cover the whole buffer, so concatenating
/// `source[span.range]` for every span gives back the input. Unterminated
/// literals and comments are closed at the end of the buffer.
pub fn scan_script(source: &str) -> Vec<Span> {
    let bytes = source.as_bytes();
    let mut spans = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let span = match bytes[i] {
            quote @ (b'"' | b'\'') => Some(scan_string(source, i, quote)),
            b'`' => Some(scan_template(source, i)),
            b'/' if bytes.get(i + 1) == Some(&b'/') => Some(scan_line_comment(source, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => Some(scan_block_comment(source, i)),
            _ => None,
        };

        match span {
            Some(span) => {
                if code_start < i {
                    spans.push(Span::new(SpanKind::Code, code_start..i, code_start..i));
                }
                i = span.range.end;
                code_start = i;
                spans.push(span);
            }
            None => i += 1,
        }
    }

    if code_start < bytes.len() {
        spans.push(Span::new(
            SpanKind::Code,
            code_start..bytes.len(),
            code_start..bytes.len(),
        ));
    }

    spans
}

/// Split a template literal body into static text and `${...}` interpolations.
///
/// Also used on plain phrases that carry interpolation placeholders.
pub fn template_parts(body: &str) -> Vec<TemplatePart> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(body, i),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                if text_start < i {
                    parts.push(TemplatePart {
                        kind: TemplatePartKind::StaticText,
                        range: text_start..i,
                    });
                }
                let end = skip_interpolation(body, i);
                parts.push(TemplatePart {
                    kind: TemplatePartKind::Interpolation,
                    range: i..end,
                });
                i = end;
                text_start = i;
            }
            _ => i += 1,
        }
    }

    if text_start < bytes.len() {
        parts.push(TemplatePart {
            kind: TemplatePartKind::StaticText,
            range: text_start..bytes.len(),
        });
    }

    parts
}

/// Ranges of every interpolation in a template body
pub fn interpolation_ranges(body: &str) -> Vec<Range<usize>> {
    template_parts(body)
        .into_iter()
        .filter(|part| part.kind == TemplatePartKind::Interpolation)
        .map(|part| part.range)
        .collect()
}

fn scan_string(source: &str, start: usize, quote: u8) -> Span {
    let bytes = source.as_bytes();
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(source, i),
            b if b == quote => return Span::new(SpanKind::StringLiteral, start..i + 1, start + 1..i),
            _ => i += 1,
        }
    }

    Span::new(SpanKind::StringLiteral, start..bytes.len(), start + 1..bytes.len())
}

fn scan_template(source: &str, start: usize) -> Span {
    let bytes = source.as_bytes();
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(source, i),
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = skip_interpolation(source, i),
            b'`' => return Span::new(SpanKind::TemplateLiteral, start..i + 1, start + 1..i),
            _ => i += 1,
        }
    }

    Span::new(SpanKind::TemplateLiteral, start..bytes.len(), start + 1..bytes.len())
}

fn scan_line_comment(source: &str, start: usize) -> Span {
    let end = source[start..]
        .find(['\n', '\r'])
        .map(|offset| start + offset)
        .unwrap_or(source.len());
    Span::new(SpanKind::LineComment, start..end, start..end)
}

fn scan_block_comment(source: &str, start: usize) -> Span {
    let end = source[start + 2..]
        .find("*/")
        .map(|offset| start + 2 + offset + 2)
        .unwrap_or(source.len());
    Span::new(SpanKind::BlockComment, start..end, start..end)
}

/// Skip a backslash and the character it escapes. The escaped character may
/// be multi-byte, so step over a whole char rather than a single byte.
fn skip_escape(source: &str, backslash: usize) -> usize {
    match source[backslash + 1..].chars().next() {
        Some(c) => backslash + 1 + c.len_utf8(),
        None => source.len(),
    }
}

/// Skip a `${ ... }` group starting at `start`, returning the index just past
/// the closing brace. Everything inside is copied verbatim, only brace depth
/// is tracked.
fn skip_interpolation(source: &str, start: usize) -> usize {
    let bytes = source.as_bytes();
    let mut depth = 1;
    let mut i = start + 2;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    bytes.len()
}
