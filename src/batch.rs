//! File-at-a-time processing of a discovered source tree.
//!
//! A failure on one file is recorded in its outcome and never stops the
//! rest of the batch.

use std::{
    collections::BTreeSet,
    io,
    path::{Path, PathBuf},
};

use extractor::{count_foreign_chars, extract_words, WordLocation};
use serde::Serialize;
use thiserror::Error;
use translator::Substitutor;

use crate::files::{decode_source, display_path, Decoded, SourceFile};
use crate::fs::FileSystem;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("unable to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not valid text in any supported encoding", .path.display())]
    Decode { path: PathBuf },
    #[error("unable to write {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What happened to a single file during `apply`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<&'static str>,
    pub changed: bool,
    pub changed_spans: usize,
    pub replacements: usize,
    /// Foreign phrases still present after substitution
    pub remaining: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A phrase found during `extract`, tied to its file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedLocation {
    pub word: String,
    pub file: String,
    pub line: usize,
    pub kind: &'static str,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub words: BTreeSet<String>,
    pub locations: Vec<ExtractedLocation>,
    pub files_scanned: usize,
    /// `(path, error)` for every file that could not be read
    pub errors: Vec<(String, String)>,
}

/// Untranslated phrases left in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRemaining {
    pub path: String,
    /// Foreign characters anywhere in the file, identifiers included
    pub foreign_chars: usize,
    pub phrases: Vec<WordLocation>,
}

#[derive(Debug, Clone, Default)]
pub struct Verification {
    pub files_scanned: usize,
    pub remaining: Vec<FileRemaining>,
    pub errors: Vec<(String, String)>,
}

pub struct Batch<'a, F> {
    fs: &'a F,
    root: &'a Path,
}

impl<'a, F: FileSystem> Batch<'a, F> {
    pub fn new(fs: &'a F, root: &'a Path) -> Self {
        Batch { fs, root }
    }

    fn display(&self, path: &Path) -> String {
        display_path(self.root, path)
    }

    fn read_source(&self, file: &SourceFile) -> Result<Decoded, FileError> {
        let bytes = self.fs.read(&file.path).map_err(|source| FileError::Read {
            path: file.path.clone(),
            source,
        })?;
        decode_source(&bytes).ok_or_else(|| FileError::Decode {
            path: file.path.clone(),
        })
    }

    /// Substitute every file, writing only the ones whose text changed
    pub fn apply(
        &self,
        files: &[SourceFile],
        substitutor: &Substitutor,
        dry_run: bool,
    ) -> Vec<FileOutcome> {
        let mut outcomes: Vec<FileOutcome> = files
            .iter()
            .map(|file| {
                self.apply_file(file, substitutor, dry_run)
                    .unwrap_or_else(|err| {
                        log::warn!("{}", err);
                        FileOutcome {
                            path: self.display(&file.path),
                            kind: file.kind.as_str(),
                            encoding: None,
                            changed: false,
                            changed_spans: 0,
                            replacements: 0,
                            remaining: 0,
                            error: Some(err.to_string()),
                        }
                    })
            })
            .collect();

        outcomes.sort_by(|a, b| a.path.cmp(&b.path));
        outcomes
    }

    fn apply_file(
        &self,
        file: &SourceFile,
        substitutor: &Substitutor,
        dry_run: bool,
    ) -> Result<FileOutcome, FileError> {
        let decoded = self.read_source(file)?;
        let substitution = substitutor.substitute(file.kind, &decoded.text);
        let changed = substitution.output != decoded.text;
        let path = self.display(&file.path);

        if changed {
            if dry_run {
                log::info!("Would update {} ({} replacements)", path, substitution.replacements);
            } else {
                self.fs
                    .write(&file.path, &substitution.output)
                    .map_err(|source| FileError::Write {
                        path: file.path.clone(),
                        source,
                    })?;
                log::info!("Updated {} ({} replacements)", path, substitution.replacements);
            }
        } else {
            log::debug!("No changes in {}", path);
        }

        Ok(FileOutcome {
            path,
            kind: file.kind.as_str(),
            encoding: Some(decoded.encoding.name()),
            changed,
            changed_spans: substitution.changed_spans,
            replacements: substitution.replacements,
            remaining: extract_words(file.kind, &substitution.output).len(),
            error: None,
        })
    }

    /// Collect every foreign phrase in the tree
    pub fn extract(&self, files: &[SourceFile]) -> Extraction {
        let mut extraction = Extraction::default();

        for file in files {
            let path = self.display(&file.path);
            let decoded = match self.read_source(file) {
                Ok(decoded) => decoded,
                Err(err) => {
                    log::warn!("{}", err);
                    extraction.errors.push((path, err.to_string()));
                    continue;
                }
            };
            extraction.files_scanned += 1;

            for location in extract_words(file.kind, &decoded.text) {
                extraction.words.insert(location.word.clone());
                extraction.locations.push(ExtractedLocation {
                    word: location.word,
                    file: path.clone(),
                    line: location.line,
                    kind: location.kind,
                });
            }
        }

        extraction
    }

    /// Report the foreign phrases still present in each file
    pub fn verify(&self, files: &[SourceFile]) -> Verification {
        let mut verification = Verification::default();

        for file in files {
            let path = self.display(&file.path);
            match self.read_source(file) {
                Ok(decoded) => {
                    verification.files_scanned += 1;
                    let phrases = extract_words(file.kind, &decoded.text);
                    if !phrases.is_empty() {
                        verification.remaining.push(FileRemaining {
                            path,
                            foreign_chars: count_foreign_chars(&decoded.text),
                            phrases,
                        });
                    }
                }
                Err(err) => {
                    log::warn!("{}", err);
                    verification.errors.push((path, err.to_string()));
                }
            }
        }

        verification
    }
}
