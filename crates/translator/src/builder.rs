//! Builds the translation table for a set of discovered phrases.
//!
//! Phrases with a curated translation use it directly. Everything else is
//! pieced together from the curated table: counts followed by a unit word are
//! handled by a small rule set, `${...}` expressions are carried over as they
//! are, and the remaining text is translated by repeatedly taking the longest
//! curated phrase it contains.

use std::collections::BTreeMap;

use extractor::{contains_foreign_text, template_parts, TemplatePartKind};
use lazy_static::lazy_static;
use regex::Regex;

use crate::cache::{parse_translations, DictionaryError};
use crate::dictionary::PhraseDictionary;

/// Recursion limit for the longest-substring fallback
pub const MAX_DEPTH: usize = 32;

/// Phrases longer than this are passed through untouched
pub const MAX_PHRASE_CHARS: usize = 400;

/// Canonical curated vocabulary shipped with the tool
pub const BASE_PHRASES: &str = include_str!("../data/base_phrases.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub glyph: &'static str,
    pub singular: &'static str,
    pub plural: &'static str,
}

const fn unit(glyph: &'static str, singular: &'static str, plural: &'static str) -> Unit {
    Unit {
        glyph,
        singular,
        plural,
    }
}

/// Unit words that follow a count. Longer glyphs come first so that `个月`
/// wins over `个` and `毫秒` over `秒`.
pub const UNITS: [Unit; 22] = [
    unit("毫秒", "millisecond", "milliseconds"),
    unit("分钟", "minute", "minutes"),
    unit("小时", "hour", "hours"),
    unit("个月", "month", "months"),
    unit("字符", "character", "characters"),
    unit("字节", "byte", "bytes"),
    unit("秒", "second", "seconds"),
    unit("天", "day", "days"),
    unit("周", "week", "weeks"),
    unit("年", "year", "years"),
    unit("次", "time", "times"),
    unit("个", "item", "items"),
    unit("项", "item", "items"),
    unit("条", "record", "records"),
    unit("行", "line", "lines"),
    unit("列", "column", "columns"),
    unit("页", "page", "pages"),
    unit("组", "group", "groups"),
    unit("种", "type", "types"),
    unit("层", "layer", "layers"),
    unit("位", "digit", "digits"),
    unit("处", "place", "places"),
];

lazy_static! {
    static ref UNIT_ALTERNATION: String = UNITS
        .iter()
        .map(|unit| regex::escape(unit.glyph))
        .collect::<Vec<_>>()
        .join("|");

    // A whole phrase that is just a count and a unit, e.g. `3秒` or `${n}个`
    static ref UNIT_PHRASE_REGEX: Regex = Regex::new(&format!(
        r"^\s*(\d+(?:\.\d+)?|\$\{{[^{{}}]*\}})\s*({})\s*$",
        *UNIT_ALTERNATION
    ))
    .unwrap();

    // A literal count and unit at the start of a longer fragment
    static ref LEADING_UNIT_REGEX: Regex = Regex::new(&format!(
        r"^(\d+(?:\.\d+)?)\s*({})",
        *UNIT_ALTERNATION
    ))
    .unwrap();
}

pub fn unit_for_glyph(glyph: &str) -> Option<&'static Unit> {
    UNITS.iter().find(|unit| unit.glyph == glyph)
}

/// Render a count and a unit glyph, singular only for a literal 1
pub fn render_count(number: &str, glyph: &str) -> Option<String> {
    let unit = unit_for_glyph(glyph)?;
    let singular = number
        .parse::<f64>()
        .map(|value| value == 1.0)
        .unwrap_or(false);
    let word = if singular { unit.singular } else { unit.plural };
    Some(format!("{} {}", number, word))
}

/// Translate a phrase that is only a count and a unit
pub fn translate_unit_phrase(phrase: &str) -> Option<String> {
    let captures = UNIT_PHRASE_REGEX.captures(phrase)?;
    render_count(&captures[1], &captures[2])
}

/// Split a leading unit glyph off a fragment
fn strip_unit_prefix(text: &str) -> Option<(&'static Unit, &str)> {
    let trimmed = text.trim_start();
    UNITS
        .iter()
        .find(|unit| trimmed.starts_with(unit.glyph))
        .map(|unit| (unit, &trimmed[unit.glyph.len()..]))
}

/// Counters describing how a table was produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub direct: usize,
    pub derived: usize,
    /// Phrases whose translation still contains foreign text
    pub untranslated: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BuiltTable {
    pub translations: BTreeMap<String, String>,
    pub report: BuildReport,
}

pub struct DictionaryBuilder {
    base: PhraseDictionary,
    mark_untranslated: bool,
}

impl DictionaryBuilder {
    pub fn new(base: PhraseDictionary) -> Self {
        DictionaryBuilder {
            base,
            mark_untranslated: false,
        }
    }

    /// Builder over the curated table that ships with the tool
    pub fn with_default_base() -> Result<Self, DictionaryError> {
        let base = parse_translations(BASE_PHRASES, "<embedded base_phrases.json>")?;
        Ok(Self::new(PhraseDictionary::new(base)))
    }

    /// Wrap leftover foreign text in brackets so it stands out in review
    pub fn mark_untranslated(mut self, mark: bool) -> Self {
        self.mark_untranslated = mark;
        self
    }

    pub fn base(&self) -> &PhraseDictionary {
        &self.base
    }

    /// Translate every phrase, guaranteeing one entry per phrase
    pub fn build<I, S>(&self, words: I) -> BuiltTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = BuiltTable::default();

        for word in words {
            let word = word.as_ref();
            if word.is_empty() || table.translations.contains_key(word) {
                continue;
            }

            let translation = match self.base.get(word) {
                Some(direct) => {
                    table.report.direct += 1;
                    direct.to_string()
                }
                None => {
                    table.report.derived += 1;
                    self.translate(word)
                }
            };

            if contains_foreign_text(&translation) {
                table.report.untranslated.push(word.to_string());
            }
            table.translations.insert(word.to_string(), translation);
        }

        table
    }

    /// The curated table itself, used when no word list is available
    pub fn build_base(&self) -> BuiltTable {
        let translations: BTreeMap<String, String> = self
            .base
            .entries()
            .iter()
            .map(|entry| (entry.source.clone(), entry.target.clone()))
            .collect();
        BuiltTable {
            report: BuildReport {
                direct: translations.len(),
                ..BuildReport::default()
            },
            translations,
        }
    }

    /// Translate a single phrase
    pub fn translate(&self, phrase: &str) -> String {
        if phrase.chars().count() > MAX_PHRASE_CHARS {
            log::debug!("Phrase too long to translate, keeping as is");
            return phrase.to_string();
        }
        if let Some(direct) = self.base.get(phrase) {
            return direct.to_string();
        }
        if let Some(count) = translate_unit_phrase(phrase) {
            return count;
        }
        if phrase.contains("${") {
            return self.translate_templated(phrase);
        }
        self.translate_fragment(phrase, 0)
    }

    /// Translate the static text around `${...}` expressions, keeping the
    /// expressions byte for byte
    fn translate_templated(&self, phrase: &str) -> String {
        let mut output = String::new();
        // Whether the last chunk was a word or an expression we may need to
        // separate from the next one
        let mut after_word = false;
        let mut after_interpolation = false;

        for part in template_parts(phrase) {
            let text = &phrase[part.range];
            match part.kind {
                TemplatePartKind::Interpolation => {
                    if after_word {
                        push_separated(&mut output, text);
                    } else {
                        output.push_str(text);
                    }
                    after_word = true;
                    after_interpolation = true;
                }
                TemplatePartKind::StaticText if contains_foreign_text(text) => {
                    let translated = match strip_unit_prefix(text) {
                        Some((unit, rest)) if after_interpolation => join_words([
                            unit.plural.to_string(),
                            self.translate_fragment(rest, 0),
                        ]),
                        _ => self.translate_fragment(text, 0),
                    };
                    if after_word {
                        push_separated(&mut output, &translated);
                    } else {
                        output.push_str(&translated);
                    }
                    after_word = true;
                    after_interpolation = false;
                }
                TemplatePartKind::StaticText => {
                    output.push_str(text);
                    after_word = false;
                    after_interpolation = false;
                }
            }
        }

        output
    }

    /// Longest-curated-substring fallback
    fn translate_fragment(&self, text: &str, depth: usize) -> String {
        let core = text.trim();
        if core.is_empty() {
            return String::new();
        }
        if depth >= MAX_DEPTH {
            return self.residue(core);
        }
        if let Some(direct) = self.base.get(core) {
            return direct.to_string();
        }
        if let Some(unit) = unit_for_glyph(core) {
            return unit.plural.to_string();
        }
        if let Some(count) = translate_unit_phrase(core) {
            return count;
        }
        if let Some(captures) = LEADING_UNIT_REGEX.captures(core) {
            let whole = captures.get(0).map_or(0, |m| m.end());
            if let Some(count) = render_count(&captures[1], &captures[2]) {
                return join_words([count, self.translate_fragment(&core[whole..], depth + 1)]);
            }
        }

        match self.base.longest_contained(core) {
            Some((position, entry)) => {
                let before = &core[..position];
                let after = &core[position + entry.source.len()..];
                join_words([
                    self.translate_fragment(before, depth + 1),
                    entry.target.clone(),
                    self.translate_fragment(after, depth + 1),
                ])
            }
            None => self.residue(core),
        }
    }

    fn residue(&self, text: &str) -> String {
        if self.mark_untranslated && contains_foreign_text(text) {
            format!("[{}]", text)
        } else {
            text.to_string()
        }
    }
}

/// Join translated fragments with single spaces, without putting a space
/// before closing punctuation or after an opening bracket
pub fn join_words<I>(fragments: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut output = String::new();
    for fragment in fragments {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        push_separated(&mut output, fragment);
    }
    output
}

fn push_separated(output: &mut String, next: &str) {
    let needs_space = match (output.chars().last(), next.chars().next()) {
        (Some(prev), Some(first)) => {
            !prev.is_whitespace()
                && !first.is_whitespace()
                && !matches!(prev, '(' | '[' | '{' | '/' | '-')
                && !matches!(first, ',' | '.' | ';' | ':' | '!' | '?' | ')' | ']' | '}' | '%' | '/')
        }
        _ => false,
    };
    if needs_space {
        output.push(' ');
    }
    output.push_str(next);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(pairs: &[(&str, &str)]) -> DictionaryBuilder {
        DictionaryBuilder::new(PhraseDictionary::new(
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        ))
    }

    #[test]
    fn test_unit_rule_singular_and_plural() {
        assert_eq!(translate_unit_phrase("1秒").unwrap(), "1 second");
        assert_eq!(translate_unit_phrase("30秒").unwrap(), "30 seconds");
        assert_eq!(translate_unit_phrase("1.5 小时").unwrap(), "1.5 hours");
        assert_eq!(translate_unit_phrase("500毫秒").unwrap(), "500 milliseconds");
        assert_eq!(translate_unit_phrase("3个月").unwrap(), "3 months");
        assert!(translate_unit_phrase("秒").is_none());
        assert!(translate_unit_phrase("3秒后").is_none());
    }

    #[test]
    fn test_unit_rule_with_dynamic_count_is_plural() {
        assert_eq!(translate_unit_phrase("${count}个").unwrap(), "${count} items");
        assert_eq!(translate_unit_phrase("${1}条").unwrap(), "${1} records");
    }

    #[test]
    fn test_direct_entry_wins() {
        let b = builder(&[("扫描完成", "scan complete"), ("扫描", "scan")]);
        assert_eq!(b.translate("扫描完成"), "scan complete");
    }

    #[test]
    fn test_fallback_keeps_fragment_order() {
        let b = builder(&[("开始", "start"), ("扫描", "scan"), ("深度", "deep")]);
        assert_eq!(b.translate("开始深度扫描"), "start deep scan");
    }

    #[test]
    fn test_fallback_with_leading_count() {
        let b = builder(&[("后", "after"), ("重试", "retry")]);
        assert_eq!(b.translate("3秒后重试"), "3 seconds after retry");
    }

    #[test]
    fn test_interpolations_are_preserved() {
        let b = builder(&[("共", "total"), ("结果", "results"), ("找到", "found")]);
        assert_eq!(b.translate("共${list.length}个结果"), "total ${list.length} items results");
        assert_eq!(b.translate("找到${ {a: 1}.a }"), "found ${ {a: 1}.a }");
        assert_eq!(b.translate("(${n})结果"), "(${n}) results");
    }

    #[test]
    fn test_untranslatable_phrase_is_returned_unchanged() {
        let b = builder(&[("扫描", "scan")]);
        assert_eq!(b.translate("未知词"), "未知词");
        let marked = builder(&[("扫描", "scan")]).mark_untranslated(true);
        assert_eq!(marked.translate("未知词"), "[未知词]");
        assert_eq!(marked.translate("扫描未知"), "scan [未知]");
    }

    #[test]
    fn test_long_phrases_are_passed_through() {
        let b = builder(&[("扫描", "scan")]);
        let long = "扫描".repeat(MAX_PHRASE_CHARS);
        assert_eq!(b.translate(&long), long);
    }

    #[test]
    fn test_recursion_depth_is_capped() {
        // Every level only peels off one character, so the cap is reached
        let b = builder(&[("甲", "a")]);
        let phrase = "甲".repeat(MAX_DEPTH * 2);
        let translated = b.translate(&phrase);
        assert!(translated.starts_with("a a a"));
        assert_eq!(translated.matches('a').count(), MAX_DEPTH);
        assert!(translated.ends_with(&"甲".repeat(MAX_DEPTH)));
    }

    #[test]
    fn test_build_covers_every_word() {
        let b = builder(&[("扫描", "scan"), ("完成", "complete")]);
        let table = b.build(["扫描", "扫描完成", "未知", "扫描"]);
        assert_eq!(table.translations.len(), 3);
        assert_eq!(table.translations["扫描完成"], "scan complete");
        assert_eq!(table.translations["未知"], "未知");
        assert_eq!(table.report.direct, 1);
        assert_eq!(table.report.derived, 2);
        assert_eq!(table.report.untranslated, vec!["未知".to_string()]);
    }

    #[test]
    fn test_default_base_loads() {
        let b = DictionaryBuilder::with_default_base().unwrap();
        assert!(b.base().len() > 100);
        assert_eq!(b.translate("扫描"), "scan");
    }

    #[test]
    fn test_default_base_common_vocabulary() {
        let b = DictionaryBuilder::with_default_base().unwrap();
        assert_eq!(b.translate("启用"), "enable");
        assert_eq!(b.translate("描述"), "description");
        assert_eq!(b.translate("上一个"), "previous");
        assert_eq!(b.translate("展开"), "expand");
        assert_eq!(b.translate("响应成功"), "response successful");
    }

    #[test]
    fn test_built_table_applies_once() {
        let b = builder(&[("补丁", "patch")]);
        let table = b.build(["这个补丁", "个"]);
        assert_eq!(table.translations["这个补丁"], "这个 patch");
        assert_eq!(table.translations["个"], "items");

        let dictionary = PhraseDictionary::new(table.translations);
        let substitutor = crate::substitutor::Substitutor::new(&dictionary);
        let first = substitutor.substitute_script("show('这个补丁') // 个");
        assert_eq!(first.output, "show('这items patch') // items");

        let second = substitutor.substitute_script(&first.output);
        assert_eq!(second.output, first.output);
        assert_eq!(second.replacements, 0);
    }

    #[test]
    fn test_join_words_spacing() {
        let joined = join_words(["scan".to_string(), ",".to_string(), "done".to_string()]);
        assert_eq!(joined, "scan, done");
    }
}
