use console::{style, Term};
use display_json::DisplayAsJsonPretty;
use serde::Serialize;

use crate::batch::{ExtractedLocation, Extraction, FileOutcome, FileRemaining, Verification};

#[derive(Debug, Serialize)]
pub struct ExtractionMetadata {
    pub root: String,
    pub files_scanned: usize,
    pub total_words: usize,
    pub total_locations: usize,
}

/// Contents of `extraction_cache.json`
#[derive(Debug, Serialize, DisplayAsJsonPretty)]
pub struct ExtractionCache {
    pub metadata: ExtractionMetadata,
    pub foreign_words: Vec<String>,
    pub locations: Vec<ExtractedLocation>,
}

impl ExtractionCache {
    pub fn new(root: String, extraction: Extraction) -> Self {
        ExtractionCache {
            metadata: ExtractionMetadata {
                root,
                files_scanned: extraction.files_scanned,
                total_words: extraction.words.len(),
                total_locations: extraction.locations.len(),
            },
            foreign_words: extraction.words.into_iter().collect(),
            locations: extraction.locations,
        }
    }

    /// One phrase per line, sorted
    pub fn words_list(&self) -> String {
        let mut list = self.foreign_words.join("\n");
        list.push('\n');
        list
    }
}

#[derive(Debug, Serialize, DisplayAsJsonPretty)]
pub struct ApplyReport {
    pub root: String,
    pub dry_run: bool,
    pub files_scanned: usize,
    pub files_modified: usize,
    pub files_errored: usize,
    pub changed_spans: usize,
    pub replacements: usize,
    pub remaining_untranslated: usize,
    pub files: Vec<FileOutcome>,
}

impl ApplyReport {
    pub fn new(root: String, dry_run: bool, files: Vec<FileOutcome>) -> Self {
        ApplyReport {
            root,
            dry_run,
            files_scanned: files.len(),
            files_modified: files.iter().filter(|f| f.changed).count(),
            files_errored: files.iter().filter(|f| f.error.is_some()).count(),
            changed_spans: files.iter().map(|f| f.changed_spans).sum(),
            replacements: files.iter().map(|f| f.replacements).sum(),
            remaining_untranslated: files.iter().map(|f| f.remaining).sum(),
            files,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize, DisplayAsJsonPretty)]
pub struct VerifyReport {
    pub root: String,
    pub files_scanned: usize,
    pub files_with_foreign_text: usize,
    pub remaining_phrases: usize,
    pub remaining_chars: usize,
    pub files: Vec<FileRemaining>,
    pub errors: Vec<FileFailure>,
}

impl VerifyReport {
    pub fn new(root: String, verification: Verification) -> Self {
        VerifyReport {
            root,
            files_scanned: verification.files_scanned,
            files_with_foreign_text: verification.remaining.len(),
            remaining_phrases: verification
                .remaining
                .iter()
                .map(|file| file.phrases.len())
                .sum(),
            remaining_chars: verification
                .remaining
                .iter()
                .map(|file| file.foreign_chars)
                .sum(),
            files: verification.remaining,
            errors: verification
                .errors
                .into_iter()
                .map(|(path, error)| FileFailure { path, error })
                .collect(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.remaining_phrases == 0 && self.errors.is_empty()
    }
}

fn line(term: &Term, text: String) {
    term.write_line(&text).unwrap_or(());
}

pub fn print_extract_summary(term: &Term, cache: &ExtractionCache) {
    line(term, format!("{}", style("Extraction finished").green().bold()));
    line(term, format!("  files scanned:   {}", cache.metadata.files_scanned));
    line(term, format!("  unique phrases:  {}", style(cache.metadata.total_words).cyan()));
    line(term, format!("  occurrences:     {}", cache.metadata.total_locations));
}

pub fn print_apply_summary(term: &Term, report: &ApplyReport) {
    let title = if report.dry_run {
        style("Dry run finished, no files were written").yellow().bold()
    } else {
        style("Translation applied").green().bold()
    };
    line(term, format!("{}", title));
    line(term, format!("  files scanned:   {}", report.files_scanned));
    line(term, format!("  files modified:  {}", style(report.files_modified).cyan()));
    line(term, format!("  changed spans:   {}", report.changed_spans));
    line(term, format!("  replacements:    {}", report.replacements));

    if report.files_errored > 0 {
        line(term, format!("  files errored:   {}", style(report.files_errored).red()));
        for file in report.files.iter().filter(|f| f.error.is_some()) {
            line(
                term,
                format!("    {} {}", style(&file.path).red(), file.error.as_deref().unwrap_or("")),
            );
        }
    }
    if report.remaining_untranslated > 0 {
        line(
            term,
            format!(
                "  {} phrases still untranslated, run `verify` for details",
                style(report.remaining_untranslated).yellow()
            ),
        );
    }
}

pub fn print_verify_summary(term: &Term, report: &VerifyReport) {
    if report.is_clean() {
        line(
            term,
            format!(
                "{} no untranslated text in {} files",
                style("Clean:").green().bold(),
                report.files_scanned
            ),
        );
        return;
    }

    for file in &report.files {
        line(
            term,
            format!(
                "{} ({} phrases, {} characters)",
                style(&file.path).yellow(),
                file.phrases.len(),
                file.foreign_chars
            ),
        );
        for phrase in &file.phrases {
            line(term, format!("  {:>5}  {:<18} {}", phrase.line, phrase.kind, phrase.word));
        }
    }
    for failure in &report.errors {
        line(term, format!("{} {}", style(&failure.path).red(), failure.error));
    }
    line(
        term,
        format!(
            "{} {} phrases ({} characters) remain in {} of {} files",
            style("Untranslated:").red().bold(),
            report.remaining_phrases,
            report.remaining_chars,
            report.files_with_foreign_text,
            report.files_scanned
        ),
    );
}
