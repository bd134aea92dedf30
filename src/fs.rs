use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use tempfile::NamedTempFile;

/// Trait for abstracting file system operations so the batch can be run
/// against an in-memory tree in tests
pub trait FileSystem {
    /// Read a file's raw bytes
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replace a file's contents
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Default implementation using std::fs.
///
/// Writes go to a temporary file next to the target which is then renamed
/// over it, so an interrupted run never leaves a half-written source file.
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(contents.as_bytes())?;
        temp.as_file().sync_all()?;

        if let Ok(metadata) = fs::metadata(path) {
            temp.as_file().set_permissions(metadata.permissions())?;
        }

        temp.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("popup.js");
        fs::write(&path, "alert('扫描');").unwrap();

        StdFileSystem.write(&path, "alert('scan');").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "alert('scan');");
        assert_eq!(StdFileSystem.read(&path).unwrap(), b"alert('scan');");
        // No temporary files are left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
