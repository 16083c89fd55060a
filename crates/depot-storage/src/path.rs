//! Validation of relative storage paths.

use crate::error::{Result, StorageError};

/// Splits `path` into its `/`-separated segments.
///
/// Rejects empty and absolute paths, backslashes, and empty, `.` or `..`
/// segments, so a validated path can never leave the backend's root.
pub fn segments(path: &str) -> Result<Vec<&str>> {
    let invalid = |reason| {
        Err(StorageError::InvalidPath {
            path: path.to_string(),
            reason,
        })
    };

    if path.is_empty() {
        return invalid("path is empty");
    }
    if path.starts_with('/') {
        return invalid("path must be relative");
    }
    if path.contains('\\') {
        return invalid("backslashes are not allowed");
    }

    let segments: Vec<&str> = path.split('/').collect();
    for segment in &segments {
        match *segment {
            "" => return invalid("path contains an empty segment"),
            "." | ".." => return invalid("path contains a relative segment"),
            _ => {}
        }
    }

    Ok(segments)
}
