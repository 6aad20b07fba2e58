use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use crate::error::{Error, Result};

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "pinmap.toml";

/// Returns the lock file path that belongs to a project config: `{config_path}.lock`.
pub fn lock_path_for<P: AsRef<Path>>(config_path: P) -> PathBuf {
    let mut path = config_path.as_ref().as_os_str().to_os_string();
    path.push(".lock");
    PathBuf::from(path)
}

/// Creates the parent directory of `path` if it doesn't exist yet.
pub fn ensure_parent_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Reads a file, returning `None` only when it does not exist.
pub fn read_optional<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>> {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Replaces the content of `path` by writing a sibling temp file and renaming it over the target.
pub fn write_atomic<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    file.write_all(bytes).map_err(|e| Error::io(file.path(), e))?;
    file.as_file().sync_all().map_err(|e| Error::io(file.path(), e))?;
    file.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Loads a JSON document, tolerating `//` comments and trailing commas.
/// A missing file yields `T::default()`.
pub fn load_json_or_default<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned + Default,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let Some(bytes) = read_optional(path)? else {
        return Ok(T::default());
    };
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::io(path, std::io::Error::new(ErrorKind::InvalidData, e)))?;
    json5::from_str(&text).map_err(|source| Error::Decode { path: path.to_path_buf(), source })
}

/// Writes `value` as pretty JSON, creating the parent directory if needed.
pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}
