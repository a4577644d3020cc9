//! Path rules for package entries
//!
//! Package paths are `/`-separated, relative, and never contain empty
//! segments. Two operations live here:
//! - [`normalize_path`] turns loosely written paths into the canonical form
//!   that identifiers are hashed from.
//! - [`validate_path`] rejects paths that cannot be stored in the
//!   line-oriented index tables.

use crate::error::{PackageError, Result};

/// Normalize a path to its canonical form
///
/// Backslashes become forward slashes and empty segments (leading,
/// trailing or doubled separators) are dropped.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    unified
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Check that a path can be stored in a guid table
pub fn validate_path(path: &str) -> Result<()> {
    let invalid = |reason| {
        Err(PackageError::InvalidPath {
            path: path.to_string(),
            reason,
        })
    };

    if path.is_empty() {
        return invalid("path is empty");
    }
    if path.contains(['\n', '\r']) {
        return invalid("path contains a line break");
    }
    if path.contains('\\') {
        return invalid("path contains a backslash");
    }
    if path.split('/').any(str::is_empty) {
        return invalid("path contains an empty segment");
    }

    Ok(())
}

/// Key of the payload entry for an asset path
pub(crate) fn asset_entry_key(path: &str) -> String {
    format!("assets/{}", path)
}

/// Key of the metadata entry for an asset path
pub(crate) fn metadata_entry_key(path: &str) -> String {
    format!("metadata/{}.json", path)
}
