use std::path::{Component, Path};

use crate::TransferError;

/// Validates that a relative object or staging path stays inside its root.
///
/// Rejects empty paths, absolute paths, `..` components and Windows
/// prefixes. A single leading `/` is tolerated by callers that strip it
/// first; this function sees only the relative remainder.
pub fn validate_relative_path(path: &str) -> Result<(), TransferError> {
    if path.is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }

    let parsed = Path::new(path);
    if parsed.is_absolute() {
        return Err(TransferError::InvalidPath(format!(
            "absolute path not allowed: {path}"
        )));
    }

    for component in parsed.components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {path}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(TransferError::InvalidPath(format!(
                    "absolute path not allowed: {path}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}
