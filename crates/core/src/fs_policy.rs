//! Filesystem security policy enforcement.
//!
//! Provides utilities for normalizing logical sandbox paths and rejecting
//! traversal outside the sandbox root.

use crate::{Error, Result};

/// Lexically normalize a POSIX-style logical path into its components,
/// resolving `.` and `..` without touching the filesystem.
///
/// Fails when `..` would climb above the root, and on drive-letter paths.
pub fn normalize_components(input_path: &str) -> Result<Vec<&str>> {
    // Cross-platform check: reject Windows-style absolute paths on any OS
    if input_path.len() >= 2
        && input_path.as_bytes()[1] == b':'
        && input_path.as_bytes()[0].is_ascii_alphabetic()
    {
        return Err(Error::SecurityViolation(format!(
            "Drive-letter paths are not allowed in sandbox: {}",
            input_path
        )));
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in input_path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(Error::SecurityViolation(format!(
                        "Path traversal detected in path: {}",
                        input_path
                    )));
                }
            }
            normal => parts.push(normal),
        }
    }
    Ok(parts)
}

/// Normalize an absolute logical path: `/workspace/a/../b` becomes
/// `/workspace/b`.
pub fn normalize_absolute(input_path: &str) -> Result<String> {
    Ok(format!("/{}", normalize_components(input_path)?.join("/")))
}

/// Strip `root` from the front of a logical path, component-wise.
///
/// `/workspace/a.txt` under `/workspace` becomes `/a.txt`; `/workspace`
/// itself becomes the empty string. `/workspaces/a.txt` is NOT under
/// `/workspace` and is returned unchanged.
pub fn strip_root<'a>(root: &str, input_path: &'a str) -> &'a str {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return input_path;
    }
    match input_path.strip_prefix(root) {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest,
        _ => input_path,
    }
}
