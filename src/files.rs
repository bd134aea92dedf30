//! Finding the source files to process and turning their bytes into text.

use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, BIG5, GB18030, UTF_8, WINDOWS_1252};
use extractor::SourceKind;
use walkdir::WalkDir;

use crate::config::Config;

/// A discovered source file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

/// Recursively collect every script and markup file under the root,
/// skipping excluded directories. The result is sorted by path.
pub fn find_source_files(config: &Config) -> Vec<SourceFile> {
    let mut files: Vec<SourceFile> = WalkDir::new(&config.root)
        .into_iter()
        .filter_entry(|entry| {
            // Never prune the root itself, even if its name is excluded
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| config.is_excluded(name))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let kind = SourceKind::from_path(entry.path())?;
            Some(SourceFile {
                path: entry.into_path(),
                kind,
            })
        })
        .collect();

    files.sort();
    files
}

/// Encodings tried after UTF-8, in order. windows-1252 maps every byte, so
/// it always succeeds as the last resort.
fn fallback_encodings() -> [&'static Encoding; 3] {
    [GB18030, BIG5, WINDOWS_1252]
}

/// Text decoded from a source file, with the encoding that worked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

/// Decode file contents, trying a BOM first, then strict UTF-8, then the
/// fallback encodings. Returns `None` if nothing decodes cleanly.
pub fn decode_source(bytes: &[u8]) -> Option<Decoded> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..]) {
            return Some(Decoded {
                text: text.into_owned(),
                encoding,
            });
        }
    }

    std::iter::once(UTF_8)
        .chain(fallback_encodings())
        .find_map(|encoding| {
            encoding
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| Decoded {
                    text: text.into_owned(),
                    encoding,
                })
        })
}

/// Path relative to the root for display, falling back to the full path
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
