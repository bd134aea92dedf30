use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{bail, Context, Error};
use clap::{Args, Parser, Subcommand};
use console::{style, Term};
use translator::{load_translations, write_translations, DictionaryBuilder, PhraseDictionary, Substitutor};

use crate::batch::Batch;
use crate::config::Config;
use crate::files::find_source_files;
use crate::fs::StdFileSystem;
use crate::report::{ApplyReport, ExtractionCache, VerifyReport};

mod batch;
mod config;
mod files;
mod fs;
mod report;

#[derive(Parser, Debug)]
#[command(name = "source-translator")]
#[command(version = "0.1.0")]
#[command(about = "Translates Chinese string literals and comments in JS/HTML sources into English")]
#[command(long_about = None)]
struct CliArguments {
    /// Show debug output
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct TreeArguments {
    /// Project root to scan
    #[arg(long, default_value = ".", value_parser = clap::value_parser!(PathBuf))]
    root: PathBuf,

    /// Extra directory names to skip, on top of the defaults
    #[arg(long = "exclude", value_name = "NAME")]
    exclude: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find untranslated phrases and write the word list and extraction cache
    Extract {
        #[command(flatten)]
        tree: TreeArguments,
    },
    /// Translate the extracted phrases into the translation cache
    Build {
        #[arg(long, default_value = ".", value_parser = clap::value_parser!(PathBuf))]
        root: PathBuf,

        /// Word list, one phrase per line
        #[arg(long)]
        words: Option<PathBuf>,

        /// Curated phrase table to use instead of the built-in one
        #[arg(long)]
        base: Option<PathBuf>,

        /// Where to write the translation cache
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Wrap text that could not be translated in brackets
        #[arg(long, default_value = "false")]
        mark_untranslated: bool,
    },
    /// Rewrite source files using the translation cache
    Apply {
        #[command(flatten)]
        tree: TreeArguments,

        /// Translation cache to apply
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Report what would change without writing any file
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Also write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List the untranslated phrases that are left
    Verify {
        #[command(flatten)]
        tree: TreeArguments,

        /// Also write the verification report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Unable to create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Unable to write {}", path.display()))
}

fn read_word_list(path: &Path) -> Result<Vec<String>, Error> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read word list {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn extract(term: &Term, tree: TreeArguments) -> Result<(), Error> {
    let config = Config::new(tree.root, &tree.exclude);
    let files = find_source_files(&config);
    log::info!("Found {} source files under {}", files.len(), config.root.display());

    let extraction = Batch::new(&StdFileSystem, &config.root).extract(&files);
    let cache = ExtractionCache::new(config.root.display().to_string(), extraction);

    write_file(&config.words_list_path(), &cache.words_list())?;
    write_file(&config.extraction_cache_path(), &cache.to_string())?;
    log::info!("Wrote {}", config.words_list_path().display());

    report::print_extract_summary(term, &cache);
    Ok(())
}

fn build(
    term: &Term,
    root: PathBuf,
    words: Option<PathBuf>,
    base: Option<PathBuf>,
    output: Option<PathBuf>,
    mark_untranslated: bool,
) -> Result<(), Error> {
    let config = Config::new(root, &[]);

    let builder = match base {
        Some(path) => {
            let table = load_translations(&path)?;
            log::info!("Loaded {} curated phrases from {}", table.len(), path.display());
            DictionaryBuilder::new(PhraseDictionary::new(table))
        }
        None => DictionaryBuilder::with_default_base()?,
    }
    .mark_untranslated(mark_untranslated);

    for (source, other) in builder.base().idempotence_conflicts() {
        log::warn!("Translation of {:?} still contains the phrase {:?}", source, other);
    }

    let words_path = Config::resolve(words.as_deref(), config.words_list_path());
    let table = if words.is_some() || words_path.exists() {
        let words = read_word_list(&words_path)?;
        log::info!("Translating {} phrases from {}", words.len(), words_path.display());
        builder.build(words)
    } else {
        log::info!("No word list found, writing the curated table");
        builder.build_base()
    };

    let output = Config::resolve(output.as_deref(), config.translation_cache_path());
    write_translations(&table.translations, &output)?;

    term.write_line(&format!(
        "{} {} entries written to {}",
        style("Translation cache built:").green().bold(),
        table.translations.len(),
        output.display()
    ))
    .unwrap_or(());
    term.write_line(&format!(
        "  direct: {}  derived: {}  untranslated: {}",
        table.report.direct,
        table.report.derived,
        style(table.report.untranslated.len()).yellow()
    ))
    .unwrap_or(());
    for phrase in &table.report.untranslated {
        log::debug!("Untranslated: {}", phrase);
    }
    Ok(())
}

fn apply(
    term: &Term,
    tree: TreeArguments,
    cache: Option<PathBuf>,
    dry_run: bool,
    report_path: Option<PathBuf>,
) -> Result<(), Error> {
    let config = Config::new(tree.root, &tree.exclude);

    // Nothing is touched unless the whole cache loads
    let cache = Config::resolve(cache.as_deref(), config.translation_cache_path());
    let translations = load_translations(&cache)
        .with_context(|| "Run `build` first to create the translation cache")?;
    let dictionary = PhraseDictionary::new(translations);
    log::info!(
        "Loaded {} phrases from {} ({} skipped)",
        dictionary.len(),
        cache.display(),
        dictionary.skipped().len()
    );
    for (source, other) in dictionary.idempotence_conflicts() {
        log::warn!("Translation of {:?} still contains the phrase {:?}", source, other);
    }

    let files = find_source_files(&config);
    log::info!("Found {} source files under {}", files.len(), config.root.display());

    let outcomes = Batch::new(&StdFileSystem, &config.root).apply(
        &files,
        &Substitutor::new(&dictionary),
        dry_run,
    );
    let report = ApplyReport::new(config.root.display().to_string(), dry_run, outcomes);

    if let Some(path) = report_path {
        write_file(&path, &report.to_string())?;
    }
    report::print_apply_summary(term, &report);

    if report.files_errored > 0 {
        bail!("{} files could not be processed", report.files_errored);
    }
    Ok(())
}

fn verify(term: &Term, tree: TreeArguments, report_path: Option<PathBuf>) -> Result<(), Error> {
    let config = Config::new(tree.root, &tree.exclude);
    let files = find_source_files(&config);

    let verification = Batch::new(&StdFileSystem, &config.root).verify(&files);
    let report = VerifyReport::new(config.root.display().to_string(), verification);

    if let Some(path) = report_path {
        write_file(&path, &report.to_string())?;
    }
    report::print_verify_summary(term, &report);

    if !report.is_clean() {
        bail!(
            "{} untranslated phrases remain in {} files",
            report.remaining_phrases,
            report.files_with_foreign_text
        );
    }
    Ok(())
}

fn run(args: CliArguments) -> Result<(), Error> {
    let term = Term::stdout();

    match args.command {
        Command::Extract { tree } => extract(&term, tree),
        Command::Build {
            root,
            words,
            base,
            output,
            mark_untranslated,
        } => build(&term, root, words, base, output, mark_untranslated),
        Command::Apply {
            tree,
            cache,
            dry_run,
            report,
        } => apply(&term, tree, cache, dry_run, report),
        Command::Verify { tree, report } => verify(&term, tree, report),
    }
}

fn main() -> ExitCode {
    let args = CliArguments::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn tree(root: &Path) -> TreeArguments {
        TreeArguments {
            root: root.to_path_buf(),
            exclude: Vec::new(),
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = CliArguments::parse_from([
            "source-translator",
            "apply",
            "--root",
            "ext",
            "--exclude",
            "vendor",
            "--dry-run",
            "-v",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Apply { tree, dry_run, cache, .. } => {
                assert_eq!(tree.root, PathBuf::from("ext"));
                assert_eq!(tree.exclude, vec!["vendor".to_string()]);
                assert!(dry_run);
                assert!(cache.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_full_pipeline() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/popup.js"), "// 扫描完成\nshow('开始扫描');\n").unwrap();
        fs::write(root.join("src/popup.html"), "<button title=\"设置\">设置</button>").unwrap();
        let term = Term::stdout();

        extract(&term, tree(root)).unwrap();
        let words = fs::read_to_string(root.join(".translate/foreign_words_list.txt")).unwrap();
        assert!(words.lines().any(|w| w == "开始扫描"));

        build(&term, root.to_path_buf(), None, None, None, false).unwrap();
        let table = load_translations(&root.join(".translate/translation_cache.json")).unwrap();
        assert_eq!(table.len(), words.lines().count());

        apply(&term, tree(root), None, false, Some(root.join("report.json"))).unwrap();
        let script = fs::read_to_string(root.join("src/popup.js")).unwrap();
        assert!(script.starts_with("// scan"));
        assert!(script.contains("show('"));
        assert!(!extractor::contains_foreign_text(&script));

        verify(&term, tree(root), None).unwrap();

        // Running again changes nothing
        let before = fs::read_to_string(root.join("src/popup.html")).unwrap();
        apply(&term, tree(root), None, false, None).unwrap();
        assert_eq!(fs::read_to_string(root.join("src/popup.html")).unwrap(), before);
    }

    #[test]
    fn test_apply_fails_without_cache() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "'扫描'").unwrap();
        let err = apply(&Term::stdout(), tree(dir.path()), None, false, None).unwrap_err();
        assert!(format!("{:#}", err).contains("translation cache"));
        assert_eq!(fs::read_to_string(dir.path().join("a.js")).unwrap(), "'扫描'");
    }
}
