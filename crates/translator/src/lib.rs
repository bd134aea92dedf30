pub mod builder;
pub mod cache;
pub mod dictionary;
pub mod substitutor;

pub use builder::{BuildReport, BuiltTable, DictionaryBuilder, MAX_DEPTH, MAX_PHRASE_CHARS};
pub use cache::{load_translations, parse_translations, write_translations, DictionaryError};
pub use dictionary::{Entry, PhraseDictionary, Replaced, SkipReason};
pub use substitutor::{Substitution, Substitutor};
