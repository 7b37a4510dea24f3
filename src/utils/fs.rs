//! File system helpers for the key files.

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::Path;

use crate::utils::error::{Error, Result};

/// Ensures a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    if !path.exists() {
        fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "Path exists but is not a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Read a JSON document, naming the file in any error.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::IoError(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    })?;
    serde_json::from_str(&content)
        .map_err(|e| Error::InvalidArgument(format!("{} is not valid JSON: {}", path.display(), e)))
}

/// Write a value as pretty JSON, creating parent directories if needed
pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)?;
    Ok(())
}
