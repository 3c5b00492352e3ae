//! Flat-file helpers shared by the file-backed stores.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AccountError, Result};

/// Read a JSON document, or `T::default()` when the file does not exist yet.
///
/// A file that exists but does not parse is an error: silently starting
/// from an empty table would drop every key on the next write.
pub(crate) fn read_json_or_default<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&raw).map_err(|e| {
        AccountError::Storage(format!("parsing {}: {e}", path.display()))
    })
}

/// Replace `path` with the JSON form of `value`.
///
/// Writes to a temp file in the same directory and renames it over the
/// target, so readers never observe a half-written file.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| AccountError::Storage(format!("writing {}: {e}", path.display())))?;
    Ok(())
}
