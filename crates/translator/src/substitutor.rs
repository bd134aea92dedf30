//! Applies a phrase dictionary to the translatable spans of a source buffer.
//!
//! Code, `${...}` expressions and structural markup are copied through
//! unchanged. Every inserted translation is escaped for the span it lands in.

use std::borrow::Cow;

use extractor::{
    markup::{scan_markup, MarkupKind},
    span::{interpolation_ranges, scan_script, template_parts, SpanKind, TemplatePartKind},
    SourceKind,
};

use crate::dictionary::{Entry, PhraseDictionary};

/// Rewritten buffer plus what changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    pub output: String,
    /// Spans whose body differs after substitution
    pub changed_spans: usize,
    /// Phrase occurrences replaced
    pub replacements: usize,
}

impl Substitution {
    fn absorb(&mut self, other: Substitution) {
        self.output.push_str(&other.output);
        self.changed_spans += other.changed_spans;
        self.replacements += other.replacements;
    }
}

/// Where an inserted translation ends up, which decides how it is escaped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Quoted(char),
    Template,
    LineComment,
    BlockComment,
    Attribute(Option<char>),
    Text,
    HtmlComment,
}

impl Context {
    fn escape(self, entry: &Entry) -> Cow<'_, str> {
        let target = entry.target.as_str();
        match self {
            Context::Quoted(quote) => escape_quoted(target, quote),
            Context::Template => escape_template(entry),
            Context::LineComment => escape_chars(target, |c| match c {
                '\n' | '\r' => Some(" "),
                _ => None,
            }),
            Context::BlockComment => replace_all(target, "*/", "* /"),
            Context::Attribute(Some('"')) => escape_chars(target, |c| match c {
                '"' => Some("&quot;"),
                _ => None,
            }),
            Context::Attribute(Some(_)) => escape_chars(target, |c| match c {
                '\'' => Some("&#39;"),
                _ => None,
            }),
            Context::Attribute(None) => escape_chars(target, |c| match c {
                ' ' => Some("&#32;"),
                '\t' => Some("&#9;"),
                '\n' => Some("&#10;"),
                '\r' => Some("&#13;"),
                '"' => Some("&quot;"),
                '\'' => Some("&#39;"),
                '=' => Some("&#61;"),
                '<' => Some("&lt;"),
                '>' => Some("&gt;"),
                '`' => Some("&#96;"),
                _ => None,
            }),
            Context::Text => escape_chars(target, |c| match c {
                '<' => Some("&lt;"),
                _ => None,
            }),
            Context::HtmlComment => replace_all(target, "-->", "-- >"),
        }
    }
}

/// Backslash-escape every unescaped `quote` and turn line breaks into escapes
fn escape_quoted(text: &str, quote: char) -> Cow<'_, str> {
    let multiline = quote != '`';
    if !text.contains(quote) && !(multiline && text.contains(['\n', '\r'])) {
        return Cow::Borrowed(text);
    }

    let mut output = String::with_capacity(text.len() + 4);
    let mut escaped = false;
    for c in text.chars() {
        match c {
            '\n' if multiline => output.push_str("\\n"),
            '\r' if multiline => output.push_str("\\r"),
            c if c == quote && !escaped => {
                output.push('\\');
                output.push(c);
            }
            c => output.push(c),
        }
        escaped = c == '\\' && !escaped;
    }
    Cow::Owned(output)
}

/// Escape a target for template static text. Interpolations the entry's
/// source already carried stay live, any other `${` is written as `\${`.
fn escape_template(entry: &Entry) -> Cow<'_, str> {
    let target = entry.target.as_str();
    if !target.contains("${") {
        return escape_quoted(target, '`');
    }

    let kept: Vec<&str> = interpolation_ranges(&entry.source)
        .into_iter()
        .map(|range| &entry.source[range])
        .collect();

    let mut output = String::with_capacity(target.len() + 4);
    for part in template_parts(target) {
        let text = &target[part.range];
        match part.kind {
            TemplatePartKind::Interpolation if kept.contains(&text) => output.push_str(text),
            TemplatePartKind::Interpolation => {
                output.push('\\');
                output.push_str(&escape_quoted(text, '`'));
            }
            TemplatePartKind::StaticText => output.push_str(&escape_quoted(text, '`')),
        }
    }
    Cow::Owned(output)
}

fn escape_chars<F>(text: &str, replacement: F) -> Cow<'_, str>
where
    F: Fn(char) -> Option<&'static str>,
{
    if !text.chars().any(|c| replacement(c).is_some()) {
        return Cow::Borrowed(text);
    }
    let mut output = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match replacement(c) {
            Some(escaped) => output.push_str(escaped),
            None => output.push(c),
        }
    }
    Cow::Owned(output)
}

fn replace_all<'t>(text: &'t str, from: &str, to: &str) -> Cow<'t, str> {
    if text.contains(from) {
        Cow::Owned(text.replace(from, to))
    } else {
        Cow::Borrowed(text)
    }
}

/// Rewrites source buffers with a read-only dictionary
#[derive(Debug, Clone, Copy)]
pub struct Substitutor<'d> {
    dictionary: &'d PhraseDictionary,
}

impl<'d> Substitutor<'d> {
    pub fn new(dictionary: &'d PhraseDictionary) -> Self {
        Substitutor { dictionary }
    }

    pub fn substitute(&self, kind: SourceKind, source: &str) -> Substitution {
        match kind {
            SourceKind::Script => self.substitute_script(source),
            SourceKind::Markup => self.substitute_markup(source),
        }
    }

    /// Rewrite string literals, template static text and comments
    pub fn substitute_script(&self, source: &str) -> Substitution {
        let mut result = Substitution {
            output: String::with_capacity(source.len()),
            ..Substitution::default()
        };

        for span in scan_script(source) {
            if !span.kind.is_translatable() {
                result.output.push_str(&source[span.range.clone()]);
                continue;
            }

            let body = span.body_text(source);
            let (holes, context) = match span.kind {
                SpanKind::StringLiteral => {
                    let quote = span.prefix(source).chars().next().unwrap_or('"');
                    (Vec::new(), Context::Quoted(quote))
                }
                SpanKind::TemplateLiteral => (interpolation_ranges(body), Context::Template),
                SpanKind::LineComment => (Vec::new(), Context::LineComment),
                _ => (Vec::new(), Context::BlockComment),
            };

            result.output.push_str(span.prefix(source));
            self.rewrite(body, &holes, context, &mut result);
            result.output.push_str(span.suffix(source));
        }

        result
    }

    /// Rewrite comments, allow-listed attribute values, text nodes and
    /// inline scripts
    pub fn substitute_markup(&self, source: &str) -> Substitution {
        let mut result = Substitution {
            output: String::with_capacity(source.len()),
            ..Substitution::default()
        };

        for span in scan_markup(source) {
            let body = span.body_text(source);
            let context = match span.kind {
                MarkupKind::Markup => {
                    result.output.push_str(&source[span.range.clone()]);
                    continue;
                }
                MarkupKind::Script => {
                    result.output.push_str(span.prefix(source));
                    result.absorb(self.substitute_script(body));
                    result.output.push_str(span.suffix(source));
                    continue;
                }
                MarkupKind::Comment => Context::HtmlComment,
                MarkupKind::Text => Context::Text,
                MarkupKind::Attribute => {
                    let quote = source[..span.body.start]
                        .chars()
                        .next_back()
                        .filter(|c| matches!(c, '"' | '\''));
                    Context::Attribute(quote)
                }
            };

            result.output.push_str(span.prefix(source));
            self.rewrite(body, &[], context, &mut result);
            result.output.push_str(span.suffix(source));
        }

        result
    }

    fn rewrite(
        &self,
        body: &str,
        holes: &[std::ops::Range<usize>],
        context: Context,
        result: &mut Substitution,
    ) {
        let replaced = self
            .dictionary
            .replace_with(body, holes, |entry| context.escape(entry));
        if replaced.text != body {
            result.changed_spans += 1;
        }
        result.replacements += replaced.replacements;
        result.output.push_str(&replaced.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary(pairs: &[(&str, &str)]) -> PhraseDictionary {
        PhraseDictionary::new(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    fn script(pairs: &[(&str, &str)], source: &str) -> String {
        let dict = dictionary(pairs);
        Substitutor::new(&dict).substitute_script(source).output
    }

    fn markup(pairs: &[(&str, &str)], source: &str) -> String {
        let dict = dictionary(pairs);
        Substitutor::new(&dict).substitute_markup(source).output
    }

    #[test]
    fn test_interpolation_is_preserved() {
        let output = script(
            &[("前缀", "prefix-"), ("后缀", "-suffix")],
            "`前缀${a+b}后缀`",
        );
        assert_eq!(output, "`prefix-${a+b}-suffix`");
    }

    #[test]
    fn test_interpolation_contents_are_never_touched() {
        let output = script(&[("扫描", "scan")], "`扫描${t('扫描')}`");
        assert_eq!(output, "`scan${t('扫描')}`");
    }

    #[test]
    fn test_templated_entry_matches_whole_interpolation() {
        let output = script(&[("共${n}个", "${n} in total")], "`共${n}个`");
        assert_eq!(output, "`${n} in total`");
    }

    #[test]
    fn test_placeholder_text_in_targets_stays_literal() {
        let dict = dictionary(&[("费用", "cost ${x}"), ("共${n}个", "${n} in total, ${n}")]);
        let sub = Substitutor::new(&dict);
        assert_eq!(sub.substitute_script("`费用`").output, r"`cost \${x}`");
        assert_eq!(sub.substitute_script("`共${n}个`").output, "`${n} in total, ${n}`");
        assert_eq!(sub.substitute_script("'费用'").output, "'cost ${x}'");

        let first = sub.substitute_script("`费用${y}`");
        assert_eq!(first.output, r"`cost \${x}${y}`");
        assert_eq!(sub.substitute_script(&first.output).replacements, 0);
    }

    #[test]
    fn test_longest_match_precedence() {
        let output = script(&[("扫描", "scan"), ("深度扫描", "deep scan")], "'深度扫描'");
        assert_eq!(output, "'deep scan'");
    }

    #[test]
    fn test_identifiers_are_not_rewritten() {
        let source = "const 扫描 = 扫描结果(扫描);";
        assert_eq!(script(&[("扫描", "scan")], source), source);
    }

    #[test]
    fn test_comment_boundary() {
        let output = script(&[("扫描", "scan"), ("扫描完成", "scan complete")], "// 扫描完成\ncode扫描()");
        assert_eq!(output, "// scan complete\ncode扫描()");
    }

    #[test]
    fn test_escaped_quote_keeps_string_boundary() {
        let output = script(&[("扫描", "scan")], r#"x = "a\"扫描\"b"; 扫描"#);
        assert_eq!(output, r#"x = "a\"scan\"b"; 扫描"#);
    }

    #[test]
    fn test_targets_are_escaped_for_their_span() {
        let dict = dictionary(&[("不能", "can't"), ("注", "see */ here"), ("换行", "a\nb")]);
        let sub = Substitutor::new(&dict);
        assert_eq!(sub.substitute_script("'不能'").output, r"'can\'t'");
        assert_eq!(sub.substitute_script("\"不能\"").output, "\"can't\"");
        assert_eq!(sub.substitute_script("/* 注 */").output, "/* see * / here */");
        assert_eq!(sub.substitute_script("'换行'").output, r"'a\nb'");
        assert_eq!(sub.substitute_script("// 换行\nx").output, "// a b\nx");
    }

    #[test]
    fn test_unterminated_spans_lose_nothing() {
        let output = script(&[("扫描", "scan")], "foo('扫描");
        assert_eq!(output, "foo('scan");
        let output = script(&[("扫描", "scan")], "/* 扫描");
        assert_eq!(output, "/* scan");
    }

    #[test]
    fn test_substitution_is_idempotent() {
        let dict = dictionary(&[("扫描", "scan"), ("深度扫描", "deep scan"), ("不能", "can't")]);
        let sub = Substitutor::new(&dict);
        let source = "// 深度扫描\nlet a = '不能' + `${x}扫描`; <p title=\"扫描\">";
        let first = sub.substitute_script(source);
        assert!(first.replacements > 0);
        let second = sub.substitute_script(&first.output);
        assert_eq!(second.output, first.output);
        assert_eq!(second.replacements, 0);
        assert_eq!(second.changed_spans, 0);
    }

    #[test]
    fn test_counts() {
        let dict = dictionary(&[("扫描", "scan")]);
        let result = Substitutor::new(&dict).substitute_script("f('扫描', '扫描扫描'); // 无");
        assert_eq!(result.changed_spans, 2);
        assert_eq!(result.replacements, 3);
    }

    #[test]
    fn test_markup_allow_list() {
        let output = markup(&[("扫描", "scan")], r#"<div class="扫描-box" title="扫描">扫描</div>"#);
        assert_eq!(output, r#"<div class="扫描-box" title="scan">scan</div>"#);
    }

    #[test]
    fn test_markup_escapes_attribute_quotes() {
        let output = markup(
            &[("说", "say \"hi\""), ("搜索", "find it")],
            "<a title=\"说\" alt='说' label=搜索>",
        );
        assert_eq!(
            output,
            "<a title=\"say &quot;hi&quot;\" alt='say \"hi\"' label=find&#32;it>"
        );
    }

    #[test]
    fn test_unquoted_attribute_value_stays_one_token() {
        let output = markup(&[("走", "Don't \"go\""), ("等于", "a=b <c>\t`d`")], "<a label=走 title=等于>");
        assert_eq!(
            output,
            "<a label=Don&#39;t&#32;&quot;go&quot; title=a&#61;b&#32;&lt;c&gt;&#9;&#96;d&#96;>"
        );
    }

    #[test]
    fn test_markup_comments_text_and_scripts() {
        let dict = dictionary(&[("扫描", "scan"), ("小于", "a < b")]);
        let source = "<!-- 扫描 --><p>小于</p><script>alert('扫描') // 扫描\n</script><style>.扫描{}</style>";
        let result = Substitutor::new(&dict).substitute_markup(source);
        assert_eq!(
            result.output,
            "<!-- scan --><p>a &lt; b</p><script>alert('scan') // scan\n</script><style>.扫描{}</style>"
        );
        assert_eq!(result.changed_spans, 4);
    }

    #[test]
    fn test_dispatch_by_kind() {
        let dict = dictionary(&[("扫描", "scan")]);
        let sub = Substitutor::new(&dict);
        assert_eq!(sub.substitute(SourceKind::Script, "'扫描'").output, "'scan'");
        assert_eq!(sub.substitute(SourceKind::Markup, "<b>扫描</b>").output, "<b>scan</b>");
    }
}
