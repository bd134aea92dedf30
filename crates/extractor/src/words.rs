//! Discovery of untranslated (CJK) phrases inside translatable spans.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::markup::{scan_markup, MarkupKind};
use crate::span::{scan_script, template_parts, SpanKind, TemplatePart, TemplatePartKind};
use crate::SourceKind;

lazy_static! {
    // CJK Unified Ideographs, the range the migration cares about
    static ref FOREIGN_TEXT_REGEX: Regex = Regex::new(r"[\x{4e00}-\x{9fff}]").unwrap();

    // Numbers, dates, times, units, colors and domains are never phrases
    static ref SYSTEM_TEXT_REGEXES: Vec<Regex> = [
        r"^\d+$",
        r"^\d{4}[-./]\d{1,2}[-./]\d{1,2}$",
        r"^\d{1,2}:\d{2}(?::\d{2})?$",
        r"^\d+(\.\d+)?[a-zA-Z]{1,3}$",
        r"^#[0-9A-Fa-f]{3,6}$",
        r"^[a-zA-Z0-9_-]+\.(com|org|net|edu)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect();
}

/// Characters that separate independent phrases
const PHRASE_DELIMITERS: [char; 29] = [
    '，', '。', '）', '（', '(', ')', '<', '>', '[', ']', '【', '】', '？', '：', ':', ',', '#',
    '\n', ';', '`', ' ', '！', '!', '、', '…', '～', '｜', '|', '\u{3000}',
];

const MAX_TEMPLATED_PHRASE_CHARS: usize = 120;

const URL_MARKERS: [&str; 6] = [".com", ".org", ".net", "http", "www.", "https"];

/// A discovered phrase and where it was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordLocation {
    pub word: String,
    pub line: usize,
    pub kind: &'static str,
}

pub fn contains_foreign_text(text: &str) -> bool {
    FOREIGN_TEXT_REGEX.is_match(text)
}

pub fn count_foreign_chars(text: &str) -> usize {
    FOREIGN_TEXT_REGEX.find_iter(text).count()
}

pub fn is_numeric_or_system_text(text: &str) -> bool {
    SYSTEM_TEXT_REGEXES.iter().any(|re| re.is_match(text))
}

/// Split free text into the phrases worth translating
pub fn split_phrases(text: &str) -> Vec<String> {
    if !contains_foreign_text(text) {
        return Vec::new();
    }

    text.split(PHRASE_DELIMITERS)
        .flat_map(|part| part.split("---"))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| contains_foreign_text(part))
        .filter(|part| !is_numeric_or_system_text(part))
        .filter(|part| {
            let lower = part.to_lowercase();
            !URL_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .filter(|part| !part.contains('"') && !part.contains('\''))
        .filter(|part| !part.starts_with("//") && !part.starts_with("/*"))
        .map(String::from)
        .collect()
}

/// Find every foreign phrase in the translatable parts of a source buffer
pub fn extract_words(kind: SourceKind, source: &str) -> Vec<WordLocation> {
    let lines = LineIndex::new(source);
    let mut words = Vec::new();
    match kind {
        SourceKind::Script => collect_script(source, 0, &lines, &mut words),
        SourceKind::Markup => collect_markup(source, &lines, &mut words),
    }
    log::trace!("Found {} foreign phrases in {} source", words.len(), kind.as_str());
    words
}

fn collect_script(source: &str, base: usize, lines: &LineIndex, out: &mut Vec<WordLocation>) {
    for span in scan_script(source) {
        let body = span.body_text(source);
        let offset = base + span.body.start;
        match span.kind {
            SpanKind::Code => {}
            SpanKind::StringLiteral => collect_text(body, offset, span.kind.as_str(), lines, out),
            SpanKind::TemplateLiteral => {
                let parts = template_parts(body);
                if is_templated_phrase(body, &parts) {
                    out.push(WordLocation {
                        word: body.to_string(),
                        line: lines.line_of(offset),
                        kind: span.kind.as_str(),
                    });
                }
                for part in parts {
                    if part.kind == TemplatePartKind::StaticText {
                        collect_text(
                            &body[part.range.clone()],
                            offset + part.range.start,
                            span.kind.as_str(),
                            lines,
                            out,
                        );
                    }
                }
            }
            SpanKind::LineComment => {
                collect_text(&body[2..], offset + 2, span.kind.as_str(), lines, out)
            }
            SpanKind::BlockComment => {
                let inner_end = if body.len() >= 4 && body.ends_with("*/") {
                    body.len() - 2
                } else {
                    body.len()
                };
                collect_text(&body[2..inner_end], offset + 2, span.kind.as_str(), lines, out)
            }
        }
    }
}

/// Short single-line templates that mix interpolations with foreign text are
/// also kept whole, so counts like `${n}个` can be translated as one phrase.
fn is_templated_phrase(body: &str, parts: &[TemplatePart]) -> bool {
    let has_interpolation = parts
        .iter()
        .any(|part| part.kind == TemplatePartKind::Interpolation);
    let has_foreign_text = parts.iter().any(|part| {
        part.kind == TemplatePartKind::StaticText && contains_foreign_text(&body[part.range.clone()])
    });
    has_interpolation
        && has_foreign_text
        && body.chars().count() <= MAX_TEMPLATED_PHRASE_CHARS
        && !body.contains(['\n', '\r', '`'])
}

fn collect_markup(source: &str, lines: &LineIndex, out: &mut Vec<WordLocation>) {
    for span in scan_markup(source) {
        let body = span.body_text(source);
        match span.kind {
            MarkupKind::Markup => {}
            MarkupKind::Script => collect_script(body, span.body.start, lines, out),
            MarkupKind::Comment | MarkupKind::Attribute | MarkupKind::Text => {
                collect_text(body, span.body.start, span.kind.as_str(), lines, out)
            }
        }
    }
}

fn collect_text(
    text: &str,
    offset: usize,
    kind: &'static str,
    lines: &LineIndex,
    out: &mut Vec<WordLocation>,
) {
    for word in split_phrases(text) {
        let position = text.find(&word).unwrap_or(0);
        out.push(WordLocation {
            line: lines.line_of(offset + position),
            word,
            kind,
        });
    }
}

/// Byte offset to 1-based line number lookup
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(kind: SourceKind, source: &str) -> Vec<String> {
        extract_words(kind, source)
            .into_iter()
            .map(|location| location.word)
            .collect()
    }

    #[test]
    fn test_split_phrases_on_delimiters() {
        assert_eq!(
            split_phrases("扫描完成，共找到 3 个结果！"),
            vec!["扫描完成", "共找到", "个结果"]
        );
    }

    #[test]
    fn test_split_phrases_filters_system_text() {
        assert!(split_phrases("2024-01-01").is_empty());
        assert!(split_phrases("访问https://例子.com").is_empty());
        assert!(split_phrases("plain ascii").is_empty());
    }

    #[test]
    fn test_script_words_skip_code_and_interpolations() {
        let source = "const 扫描 = `共${count}个结果`; // 扫描完成\nfoo('深度扫描');";
        assert_eq!(
            words(SourceKind::Script, source),
            vec!["共${count}个结果", "共", "个结果", "扫描完成", "深度扫描"]
        );
    }

    #[test]
    fn test_multiline_template_is_not_kept_whole() {
        let source = "x = `第一${a}\n第二`;";
        assert_eq!(words(SourceKind::Script, source), vec!["第一", "第二"]);
    }

    #[test]
    fn test_locations_report_lines() {
        let source = "a();\n/* 第一行\n第二行 */\nb('第三');";
        let found = extract_words(SourceKind::Script, source);
        let lines: Vec<(&str, usize)> = found.iter().map(|w| (w.word.as_str(), w.line)).collect();
        assert_eq!(lines, vec![("第一行", 2), ("第二行", 3), ("第三", 4)]);
        assert_eq!(found[0].kind, "multiline_comment");
    }

    #[test]
    fn test_markup_words_include_script_bodies() {
        let source = "<p title=\"标题\" class=\"类名\">段落</p><script>alert('警告')</script>";
        assert_eq!(
            words(SourceKind::Markup, source),
            vec!["标题", "段落", "警告"]
        );
    }

    #[test]
    fn test_count_foreign_chars() {
        assert_eq!(count_foreign_chars("scan 扫描 done"), 2);
        assert!(!contains_foreign_text("scan done"));
    }
}
