//! File system utilities.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, Result};

/// Load TOML data from a file.
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Sibling path used while writing `path` atomically: the full file name
/// plus `.tmp`, so `a.csv` and `a.json` never share one.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Resolve `relative` inside `data_dir`, refusing anything that could
/// escape it (absolute paths, drive prefixes, `..`).
pub fn resolve_within(data_dir: &Path, relative: &str) -> Result<PathBuf> {
    let candidate = Path::new(relative.trim());
    if candidate.as_os_str().is_empty() {
        return Err(AppError::config("store path is empty"));
    }

    let mut resolved = data_dir.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(AppError::config(format!(
                    "store path '{relative}' must stay inside data directory '{}'",
                    data_dir.display()
                )));
            }
        }
    }

    if resolved == data_dir {
        return Err(AppError::config(format!(
            "store path '{relative}' does not name a file"
        )));
    }
    Ok(resolved)
}
