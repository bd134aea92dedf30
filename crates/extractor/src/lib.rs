pub mod markup;
pub mod span;
pub mod words;

use std::path::Path;

pub use markup::{scan_markup, MarkupKind, MarkupSpan};
pub use span::{scan_script, template_parts, Span, SpanKind, TemplatePart, TemplatePartKind};
pub use words::{contains_foreign_text, count_foreign_chars, extract_words, WordLocation};

/// The two families of input the scanners understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// JavaScript-like sources
    Script,
    /// HTML-like markup
    Markup,
}

impl SourceKind {
    /// Detect the source kind from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" | "jsx" | "ts" | "tsx" => Some(Self::Script),
            "html" | "htm" => Some(Self::Markup),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Script => "script",
            SourceKind::Markup => "markup",
        }
    }
}
