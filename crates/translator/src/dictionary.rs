use std::{borrow::Cow, collections::HashMap, ops::Range};

use extractor::{contains_foreign_text, span::interpolation_ranges};

/// Rounds of rewriting a target through the table before giving up on it
const MAX_CLOSURE_ROUNDS: usize = 8;

/// A single source phrase and its replacement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub source: String,
    pub target: String,
    source_chars: usize,
}

/// Why an entry was left out of the substitution table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    Identity,
    /// The target still contains its own source, applying it twice would
    /// keep growing the text
    Reintroduces,
    /// The target drops or rewrites one of the source's `${...}` expressions
    AltersInterpolation,
    /// Rewriting the target through the table never settles
    Unstable,
}

/// Source phrase to target phrase table, ordered longest source first.
///
/// Entries are sorted by the character length of their source phrase,
/// longest first, with ties broken by the source text so the order is
/// deterministic. Every lookup walks the table in that order.
#[derive(Debug, Clone, Default)]
pub struct PhraseDictionary {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    skipped: Vec<(String, SkipReason)>,
}

/// Result of running the dictionary over a piece of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replaced<'s> {
    pub text: Cow<'s, str>,
    pub replacements: usize,
}

enum Piece<'s, 'd> {
    /// Untouched input, `offset` is its position in the original text
    Source { text: &'s str, offset: usize },
    Target(&'d Entry),
}

impl PhraseDictionary {
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = Vec::new();
        let mut skipped = Vec::new();

        for (source, target) in pairs {
            let source = source.into();
            let target = target.into();
            match check_entry(&source, &target) {
                Some(reason) => {
                    log::debug!("Skipping dictionary entry {:?}: {:?}", source, reason);
                    skipped.push((source, reason));
                }
                None => entries.push(Entry {
                    source_chars: source.chars().count(),
                    source,
                    target,
                }),
            }
        }

        entries.sort_by(|a, b| {
            b.source_chars
                .cmp(&a.source_chars)
                .then_with(|| a.source.cmp(&b.source))
        });
        entries.dedup_by(|a, b| a.source == b.source);

        let mut dictionary = PhraseDictionary {
            entries,
            index: HashMap::new(),
            skipped,
        };
        dictionary.close_targets();
        dictionary.reindex();
        dictionary
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.source.clone(), i))
            .collect();
    }

    /// Rewrite targets that still carry foreign text through the table until
    /// nothing in them matches any more. A single substitution pass then
    /// produces text that a second pass leaves alone.
    fn close_targets(&mut self) {
        let mut closed = Vec::new();

        for (i, entry) in self.entries.iter().enumerate() {
            if !contains_foreign_text(&entry.target) {
                continue;
            }

            let mut target = entry.target.clone();
            let mut stable = false;
            for _ in 0..MAX_CLOSURE_ROUNDS {
                let holes = interpolation_ranges(&target);
                let replaced = self.replace_with(&target, &holes, |other| Cow::Borrowed(&other.target));
                if replaced.replacements == 0 {
                    stable = true;
                    break;
                }
                target = replaced.text.into_owned();
            }

            let outcome = match stable {
                true if target.contains(entry.source.as_str()) => Err(SkipReason::Reintroduces),
                true => Ok(target),
                false => Err(SkipReason::Unstable),
            };
            closed.push((i, outcome));
        }

        let mut rejected = Vec::new();
        for (i, outcome) in closed {
            match outcome {
                Ok(target) if target != self.entries[i].target => {
                    log::debug!(
                        "Rewrote translation of {:?} to {:?}",
                        self.entries[i].source,
                        target
                    );
                    self.entries[i].target = target;
                }
                Ok(_) => {}
                Err(reason) => rejected.push((i, reason)),
            }
        }

        for (i, reason) in rejected.into_iter().rev() {
            let entry = self.entries.remove(i);
            log::debug!("Skipping dictionary entry {:?}: {:?}", entry.source, reason);
            self.skipped.push((entry.source, reason));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in lookup order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[(String, SkipReason)] {
        &self.skipped
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.index
            .get(source)
            .map(|&i| self.entries[i].target.as_str())
    }

    /// The longest source phrase contained in `text`, with its byte position
    pub fn longest_contained(&self, text: &str) -> Option<(usize, &Entry)> {
        self.entries
            .iter()
            .find_map(|entry| text.find(entry.source.as_str()).map(|pos| (pos, entry)))
    }

    /// Pairs where a target contains another entry's source. Running the
    /// substitution a second time would rewrite those targets again.
    pub fn idempotence_conflicts(&self) -> Vec<(&str, &str)> {
        let mut conflicts = Vec::new();
        for entry in &self.entries {
            if !extractor::contains_foreign_text(&entry.target) {
                continue;
            }
            if let Some(other) = self
                .entries
                .iter()
                .find(|other| entry.target.contains(other.source.as_str()))
            {
                conflicts.push((entry.source.as_str(), other.source.as_str()));
            }
        }
        conflicts
    }

    /// Replace every phrase found in `text`
    pub fn replace<'s>(&self, text: &'s str) -> Replaced<'s> {
        self.replace_with(text, &[], |entry| Cow::Borrowed(&entry.target))
    }

    /// Replace phrases in `text`, longest first.
    ///
    /// A match is only accepted when each range in `holes` is either
    /// disjoint from it or entirely inside it, so plain phrases never reach
    /// into an interpolation and interpolation-bearing phrases only match
    /// whole interpolations. Text produced by a replacement is never matched
    /// again. `escape` renders the target of every matched entry.
    pub fn replace_with<'s, F>(&self, text: &'s str, holes: &[Range<usize>], escape: F) -> Replaced<'s>
    where
        F: for<'t> Fn(&'t Entry) -> Cow<'t, str>,
    {
        let mut pieces = vec![Piece::Source { text, offset: 0 }];
        let mut replacements = 0;

        for entry in &self.entries {
            if !text.contains(entry.source.as_str()) {
                continue;
            }

            let mut next = Vec::with_capacity(pieces.len() + 2);
            for piece in pieces {
                match piece {
                    Piece::Source { text, offset } => {
                        replacements += split_piece(text, offset, entry, holes, &mut next);
                    }
                    target => next.push(target),
                }
            }
            pieces = next;
        }

        if replacements == 0 {
            return Replaced {
                text: Cow::Borrowed(text),
                replacements,
            };
        }

        let mut output = String::with_capacity(text.len());
        for piece in pieces {
            match piece {
                Piece::Source { text, .. } => output.push_str(text),
                Piece::Target(entry) => output.push_str(&escape(entry)),
            }
        }

        Replaced {
            text: Cow::Owned(output),
            replacements,
        }
    }
}

fn check_entry(source: &str, target: &str) -> Option<SkipReason> {
    if source.is_empty() {
        return Some(SkipReason::Empty);
    }
    if source == target {
        return Some(SkipReason::Identity);
    }
    if target.contains(source) {
        return Some(SkipReason::Reintroduces);
    }
    if source.contains("${") {
        let keeps_interpolations = interpolation_ranges(source)
            .into_iter()
            .all(|range| target.contains(&source[range]));
        if !keeps_interpolations {
            return Some(SkipReason::AltersInterpolation);
        }
    }
    None
}

/// Split one untouched piece around every acceptable match of `entry`
fn split_piece<'s, 'd>(
    text: &'s str,
    offset: usize,
    entry: &'d Entry,
    holes: &[Range<usize>],
    out: &mut Vec<Piece<'s, 'd>>,
) -> usize {
    let source = entry.source.as_str();
    let mut count = 0;
    let mut last = 0;
    let mut search = 0;

    while let Some(found) = text[search..].find(source) {
        let start = search + found;
        let end = start + source.len();

        if respects_holes(offset + start..offset + end, holes) {
            if last < start {
                out.push(Piece::Source {
                    text: &text[last..start],
                    offset: offset + last,
                });
            }
            out.push(Piece::Target(entry));
            count += 1;
            last = end;
            search = end;
        } else {
            search = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
    }

    if last < text.len() {
        out.push(Piece::Source {
            text: &text[last..],
            offset: offset + last,
        });
    }

    count
}

fn respects_holes(matched: Range<usize>, holes: &[Range<usize>]) -> bool {
    holes.iter().all(|hole| {
        let inside = hole.start >= matched.start && hole.end <= matched.end;
        let disjoint = hole.end <= matched.start || hole.start >= matched.end;
        inside || disjoint
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary(pairs: &[(&str, &str)]) -> PhraseDictionary {
        PhraseDictionary::new(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    #[test]
    fn test_entries_are_sorted_longest_first() {
        let dict = dictionary(&[("扫描", "scan"), ("深度扫描", "deep scan"), ("扫", "sweep")]);
        let sources: Vec<&str> = dict.entries().iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["深度扫描", "扫描", "扫"]);
    }

    #[test]
    fn test_longest_match_wins() {
        let dict = dictionary(&[("扫描", "scan"), ("深度扫描", "deep scan")]);
        let replaced = dict.replace("开始深度扫描和扫描");
        assert_eq!(replaced.text, "开始deep scan和scan");
        assert_eq!(replaced.replacements, 2);
    }

    #[test]
    fn test_replacements_do_not_cascade() {
        // "scan" must not be rewritten by the later, shorter "can" entry
        let dict = dictionary(&[("扫描", "scan"), ("can", "CAN")]);
        assert_eq!(dict.replace("扫描").text, "scan");
    }

    #[test]
    fn test_unchanged_text_is_borrowed() {
        let dict = dictionary(&[("扫描", "scan")]);
        let replaced = dict.replace("nothing here");
        assert!(matches!(replaced.text, Cow::Borrowed(_)));
        assert_eq!(replaced.replacements, 0);
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let dict = dictionary(&[
            ("", "x"),
            ("同", "同"),
            ("未知", "[未知]"),
            ("${n}个", "items"),
            ("${n}项", "${n} items"),
        ]);
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get("${n}项"), Some("${n} items"));
        let reasons: Vec<SkipReason> = dict.skipped().iter().map(|(_, r)| *r).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::Empty,
                SkipReason::Identity,
                SkipReason::Reintroduces,
                SkipReason::AltersInterpolation
            ]
        );
    }

    #[test]
    fn test_holes_protect_interpolations() {
        let dict = dictionary(&[("扫描", "scan"), ("${n}个", "${n} items")]);
        let body = "扫描${t('扫描')}共${n}个";
        let holes = interpolation_ranges(body);
        let replaced = dict.replace_with(body, &holes, |e| Cow::Borrowed(&e.target));
        assert_eq!(replaced.text, "scan${t('扫描')}共${n} items");
    }

    #[test]
    fn test_escape_is_applied_to_targets_only() {
        let dict = dictionary(&[("不能", "can't")]);
        let replaced = dict.replace_with("它不能'", &[], |e| Cow::Owned(e.target.replace('\'', "\\'")));
        assert_eq!(replaced.text, "它can\\'t'");
    }

    #[test]
    fn test_longest_contained() {
        let dict = dictionary(&[("扫描", "scan"), ("扫描完成", "scan complete"), ("完成", "done")]);
        let (pos, entry) = dict.longest_contained("已扫描完成").unwrap();
        assert_eq!(pos, "已".len());
        assert_eq!(entry.target, "scan complete");
        assert!(dict.longest_contained("无关").is_none());
    }

    #[test]
    fn test_targets_are_closed_over_the_table() {
        let dict = dictionary(&[("甲乙", "A 乙丙"), ("乙丙", "BC")]);
        assert_eq!(dict.get("甲乙"), Some("A BC"));
        assert!(dict.idempotence_conflicts().is_empty());

        let replaced = dict.replace("甲乙");
        assert_eq!(replaced.text, "A BC");
        assert_eq!(dict.replace(&replaced.text).replacements, 0);
    }

    #[test]
    fn test_residue_in_targets_is_translated_once() {
        let dict = dictionary(&[("个", "items"), ("这个补丁", "这个 patch")]);
        let first = dict.replace("这个补丁");
        assert_eq!(first.text, "这items patch");
        assert_eq!(dict.replace(&first.text).replacements, 0);
    }

    #[test]
    fn test_cyclic_targets_are_skipped() {
        let dict = dictionary(&[("甲", "x 乙"), ("乙", "y 甲"), ("丙", "z")]);
        assert_eq!(dict.len(), 1);
        assert!(dict
            .skipped()
            .iter()
            .all(|(_, reason)| *reason == SkipReason::Unstable));
    }

    #[test]
    fn test_closure_keeps_interpolations() {
        let dict = dictionary(&[("${n}个文件", "${n} 文件"), ("文件", "files")]);
        assert_eq!(dict.get("${n}个文件"), Some("${n} files"));
    }
}
