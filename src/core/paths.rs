use std::env;
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::error::{Error, Result};

/// Expand `~` and environment variables in a user-supplied path.
pub fn expand(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

/// Current working directory.
pub fn cwd() -> Result<PathBuf> {
    env::current_dir()
        .map_err(|e| Error::internal_io(e.to_string(), Some("resolve current directory".into())))
}

/// Find the nearest manifest walking up from `start`.
pub fn find_manifest(start: &Path) -> Result<PathBuf> {
    let mut searched = Vec::new();

    for dir in start.ancestors() {
        let candidate = dir.join(defaults::MANIFEST_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        searched.push(candidate.to_string_lossy().to_string());
    }

    Err(Error::config_not_found(searched))
}

/// Resolve the manifest path from an explicit flag or by discovery.
pub fn resolve_manifest(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(raw) => {
            let path = expand(raw);
            if path.is_file() {
                Ok(path)
            } else {
                Err(Error::config_not_found(vec![path
                    .to_string_lossy()
                    .to_string()]))
            }
        }
        None => find_manifest(&cwd()?),
    }
}
