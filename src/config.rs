use std::path::{Path, PathBuf};

/// Directory names that are never walked into
pub const DEFAULT_EXCLUDED_DIRS: [&str; 13] = [
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "bower_components",
    "dist",
    "build",
    "coverage",
    "__pycache__",
    "venv",
    ".translate",
    ".idea",
    ".vscode",
];

/// Tool-private directory under the project root
pub const TRANSLATE_DIR: &str = ".translate";

pub const WORDS_LIST_FILE: &str = "foreign_words_list.txt";
pub const EXTRACTION_CACHE_FILE: &str = "extraction_cache.json";
pub const TRANSLATION_CACHE_FILE: &str = "translation_cache.json";

/// Settings resolved from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub root: PathBuf,
    pub excluded_dirs: Vec<String>,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>, extra_excludes: &[String]) -> Self {
        let mut excluded_dirs: Vec<String> =
            DEFAULT_EXCLUDED_DIRS.iter().map(|dir| dir.to_string()).collect();
        for dir in extra_excludes {
            if !excluded_dirs.contains(dir) {
                excluded_dirs.push(dir.clone());
            }
        }

        Config {
            root: root.into(),
            excluded_dirs,
        }
    }

    pub fn translate_dir(&self) -> PathBuf {
        self.root.join(TRANSLATE_DIR)
    }

    pub fn words_list_path(&self) -> PathBuf {
        self.translate_dir().join(WORDS_LIST_FILE)
    }

    pub fn extraction_cache_path(&self) -> PathBuf {
        self.translate_dir().join(EXTRACTION_CACHE_FILE)
    }

    pub fn translation_cache_path(&self) -> PathBuf {
        self.translate_dir().join(TRANSLATION_CACHE_FILE)
    }

    /// Use `explicit` when given, `default` otherwise
    pub fn resolve(explicit: Option<&Path>, default: PathBuf) -> PathBuf {
        explicit.map(Path::to_path_buf).unwrap_or(default)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_dirs.iter().any(|dir| dir == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_live_under_translate_dir() {
        let config = Config::new("/project", &[]);
        assert_eq!(
            config.translation_cache_path(),
            PathBuf::from("/project/.translate/translation_cache.json")
        );
        assert_eq!(
            config.words_list_path(),
            PathBuf::from("/project/.translate/foreign_words_list.txt")
        );
    }

    #[test]
    fn test_extra_excludes_are_added_once() {
        let config = Config::new(".", &["vendor".to_string(), "dist".to_string()]);
        assert!(config.is_excluded("vendor"));
        assert!(config.is_excluded("node_modules"));
        assert_eq!(config.excluded_dirs.len(), DEFAULT_EXCLUDED_DIRS.len() + 1);
    }

    #[test]
    fn test_explicit_path_wins() {
        let explicit = PathBuf::from("words.json");
        assert_eq!(
            Config::resolve(Some(&explicit), PathBuf::from("default.json")),
            explicit
        );
        assert_eq!(
            Config::resolve(None, PathBuf::from("default.json")),
            PathBuf::from("default.json")
        );
    }
}
