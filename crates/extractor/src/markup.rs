//! Scanner for HTML-like sources.
//!
//! Only three places inside markup carry human readable text that we want to
//! touch: comments, a short list of attributes, and text between tags.
//! `<script>` bodies are handed back as their own span so callers can run the
//! script scanner over them, `<style>` bodies are left alone.

use std::ops::Range;

/// Attributes whose values are shown to the user. Everything else (`class`,
/// `id`, `href`, ...) is structural and never rewritten.
pub const TRANSLATABLE_ATTRIBUTES: [&str; 6] =
    ["title", "placeholder", "alt", "value", "label", "aria-label"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    Comment,
    Attribute,
    Text,
    Script,
    Markup,
}

impl MarkupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkupKind::Comment => "html_comment",
            MarkupKind::Attribute => "html_attribute",
            MarkupKind::Text => "html_text",
            MarkupKind::Script => "script",
            MarkupKind::Markup => "markup",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupSpan {
    pub kind: MarkupKind,
    pub range: Range<usize>,
    pub body: Range<usize>,
}

impl MarkupSpan {
    fn new(kind: MarkupKind, range: Range<usize>, body: Range<usize>) -> Self {
        MarkupSpan { kind, range, body }
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

/// Split markup into classified spans covering the whole buffer
pub fn scan_markup(source: &str) -> Vec<MarkupSpan> {
    let mut scanner = MarkupScanner {
        source,
        bytes: source.as_bytes(),
        spans: Vec::new(),
    };
    scanner.run();
    scanner.spans
}

pub fn is_translatable_attribute(name: &str) -> bool {
    TRANSLATABLE_ATTRIBUTES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(name))
}

struct MarkupScanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    spans: Vec<MarkupSpan>,
}

/// Result of reading a single tag
struct Tag {
    name: String,
    end: usize,
    closed: bool,
    self_closing: bool,
    is_end_tag: bool,
}

impl<'a> MarkupScanner<'a> {
    fn run(&mut self) {
        let mut i = 0;
        // Text only counts as a text node when it follows a `>`
        let mut after_gt = false;

        while i < self.bytes.len() {
            if self.bytes[i..].starts_with(b"<!--") {
                let (end, terminated) = match self.source[i + 4..].find("-->") {
                    Some(offset) => (i + 4 + offset + 3, true),
                    None => (self.bytes.len(), false),
                };
                let body_end = if terminated { end - 3 } else { end };
                self.push(MarkupKind::Comment, i..end, i + 4..body_end);
                after_gt = terminated;
                i = end;
            } else if self.is_tag_start(i) {
                let tag = self.scan_tag(i);
                after_gt = tag.closed;
                i = tag.end;

                let raw_text = !tag.is_end_tag
                    && !tag.self_closing
                    && tag.closed
                    && (tag.name.eq_ignore_ascii_case("script")
                        || tag.name.eq_ignore_ascii_case("style"));
                if raw_text {
                    let body_end = self.find_end_tag(i, &tag.name);
                    if i < body_end {
                        let kind = if tag.name.eq_ignore_ascii_case("script") {
                            MarkupKind::Script
                        } else {
                            MarkupKind::Markup
                        };
                        self.push(kind, i..body_end, i..body_end);
                    }
                    after_gt = false;
                    i = body_end;
                }
            } else {
                let start = i;
                while i < self.bytes.len()
                    && !self.is_tag_start(i)
                    && !self.bytes[i..].starts_with(b"<!--")
                {
                    i += 1;
                }
                let terminated = i < self.bytes.len();
                let kind = if after_gt && terminated {
                    MarkupKind::Text
                } else {
                    MarkupKind::Markup
                };
                self.push(kind, start..i, start..i);
                after_gt = false;
            }
        }
    }

    fn push(&mut self, kind: MarkupKind, range: Range<usize>, body: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.spans.push(MarkupSpan::new(kind, range, body));
    }

    fn is_tag_start(&self, i: usize) -> bool {
        self.bytes[i] == b'<'
            && matches!(
                self.bytes.get(i + 1),
                Some(b) if b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?')
            )
    }

    /// Read a tag starting at `<`, emitting markup and attribute spans for it
    fn scan_tag(&mut self, start: usize) -> Tag {
        let source = self.source;
        let len = self.bytes.len();
        let mut j = start + 1;
        let is_end_tag = self.bytes.get(j) == Some(&b'/');
        if is_end_tag {
            j += 1;
        }

        let name_start = j;
        while j < len && !self.bytes[j].is_ascii_whitespace() && !matches!(self.bytes[j], b'>' | b'/')
        {
            j += 1;
        }
        let name = source[name_start..j].to_string();

        let mut markup_start = start;
        let mut self_closing = false;
        let mut closed = false;

        while j < len {
            match self.bytes[j] {
                b'>' => {
                    j += 1;
                    closed = true;
                    break;
                }
                b'/' => {
                    self_closing = true;
                    j += 1;
                }
                b if b.is_ascii_whitespace() => j += 1,
                _ => {
                    self_closing = false;
                    let attr_start = j;
                    while j < len
                        && !self.bytes[j].is_ascii_whitespace()
                        && !matches!(self.bytes[j], b'=' | b'>' | b'/')
                    {
                        j += 1;
                    }
                    if j == attr_start {
                        // stray `=` without a name
                        j += 1;
                        continue;
                    }
                    let attr_name = &source[attr_start..j];

                    let mut k = j;
                    while k < len && self.bytes[k].is_ascii_whitespace() {
                        k += 1;
                    }
                    if k >= len || self.bytes[k] != b'=' {
                        continue;
                    }
                    k += 1;
                    while k < len && self.bytes[k].is_ascii_whitespace() {
                        k += 1;
                    }

                    let value = match self.bytes.get(k) {
                        Some(&quote @ (b'"' | b'\'')) => {
                            let value_start = k + 1;
                            let value_end = source[value_start..]
                                .find(quote as char)
                                .map(|offset| value_start + offset)
                                .unwrap_or(len);
                            j = (value_end + 1).min(len);
                            value_start..value_end
                        }
                        Some(_) => {
                            let value_start = k;
                            let mut value_end = k;
                            while value_end < len
                                && !self.bytes[value_end].is_ascii_whitespace()
                                && self.bytes[value_end] != b'>'
                            {
                                value_end += 1;
                            }
                            j = value_end;
                            value_start..value_end
                        }
                        None => {
                            j = k;
                            continue;
                        }
                    };

                    if is_translatable_attribute(attr_name) && !value.is_empty() {
                        self.push(MarkupKind::Markup, markup_start..value.start, markup_start..value.start);
                        self.push(MarkupKind::Attribute, value.clone(), value.clone());
                        markup_start = value.end;
                    }
                }
            }
        }

        self.push(MarkupKind::Markup, markup_start..j, markup_start..j);

        Tag {
            name,
            end: j,
            closed,
            self_closing,
            is_end_tag,
        }
    }

    /// Position of the matching `</name` or the end of the buffer
    fn find_end_tag(&self, from: usize, name: &str) -> usize {
        let needle = format!("</{}", name.to_ascii_lowercase());
        // ASCII lowercasing keeps byte offsets unchanged
        self.source[from..]
            .to_ascii_lowercase()
            .find(&needle)
            .map(|offset| from + offset)
            .unwrap_or(self.bytes.len())
    }
}
