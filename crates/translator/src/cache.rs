//! Reading and writing translation tables as flat JSON objects.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde_json::{to_string_pretty, Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("unable to read translations from {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {origin}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{origin} must contain a JSON object of phrase translations")]
    NotAnObject { origin: String },
    #[error("translation for {key:?} in {origin} is not a string")]
    NonStringValue { origin: String, key: String },
    #[error("unable to write translations to {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Load a translation table from disk
pub fn load_translations(path: &Path) -> Result<BTreeMap<String, String>, DictionaryError> {
    let contents = fs::read_to_string(path).map_err(|source| DictionaryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_translations(&contents, &path.display().to_string())
}

/// Parse a flat `{ "source": "target" }` object. `origin` names the input in
/// error messages.
pub fn parse_translations(
    contents: &str,
    origin: &str,
) -> Result<BTreeMap<String, String>, DictionaryError> {
    let value: Value = serde_json::from_str(contents).map_err(|source| DictionaryError::Parse {
        origin: origin.to_string(),
        source,
    })?;

    let Value::Object(object) = value else {
        return Err(DictionaryError::NotAnObject {
            origin: origin.to_string(),
        });
    };

    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(target) => Ok((key, target)),
            _ => Err(DictionaryError::NonStringValue {
                origin: origin.to_string(),
                key,
            }),
        })
        .collect()
}

/// Write a translation table as pretty printed JSON with sorted keys,
/// creating the parent directory when needed
pub fn write_translations(
    translations: &BTreeMap<String, String>,
    path: &Path,
) -> Result<(), DictionaryError> {
    let write_error = |source| DictionaryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }

    let object: Map<String, Value> = translations
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    let mut json = to_string_pretty(&Value::Object(object))
        .map_err(|err| write_error(std::io::Error::from(err)))?;
    json.push('\n');

    fs::write(path, json).map_err(write_error)
}
