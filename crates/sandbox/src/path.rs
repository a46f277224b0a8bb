//! Translation between logical sandbox paths and backend paths.
//!
//! Logical paths are POSIX-style and rooted at the configured working
//! directory. A container sees them verbatim; the host fallback maps them
//! under its private directory.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use workbox_core::fs_policy::{normalize_absolute, normalize_components, strip_root};
use workbox_core::{Error, Result, VolumeBinding};

#[derive(Debug, Clone)]
pub struct PathResolver {
    work_dir: String,
    /// Binding targets that may be addressed besides the working directory.
    binding_roots: Vec<String>,
}

impl PathResolver {
    pub fn new(work_dir: &str, bindings: &[VolumeBinding]) -> Self {
        let work_dir = match work_dir.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            work_dir,
            binding_roots: bindings
                .iter()
                .map(|b| b.container_path.trim_end_matches('/').to_string())
                .filter(|p| p.starts_with('/'))
                .collect(),
        }
    }

    pub fn work_dir(&self) -> &str {
        &self.work_dir
    }

    /// Resolve a logical path to the absolute path inside the container.
    ///
    /// Relative paths are taken from the working directory. The result must
    /// stay under the working directory or a binding target.
    pub fn container_path(&self, path: &str) -> Result<String> {
        let resolved = self.absolute(path)?;

        let allowed = std::iter::once(self.work_dir.as_str())
            .chain(self.binding_roots.iter().map(String::as_str))
            .any(|root| is_within(root, &resolved));
        if !allowed {
            return Err(Error::security(format!(
                "path {} resolves outside of {}",
                path, self.work_dir
            )));
        }
        Ok(resolved)
    }

    /// Resolve a logical path under the host fallback's private root.
    ///
    /// The path is normalized first, then the working-directory prefix is
    /// stripped; other absolute paths keep their full structure beneath the
    /// root, which is where bindings are materialized.
    pub fn host_path(&self, host_root: &Path, path: &str) -> Result<PathBuf> {
        let resolved = self.absolute(path)?;
        let mut host = host_root.to_path_buf();
        for part in normalize_components(strip_root(&self.work_dir, &resolved))? {
            host.push(part);
        }
        Ok(host)
    }

    /// Replace the working directory with `exec_root` in text headed for a
    /// host-executed sandbox, so absolute in-sandbox paths keep working.
    ///
    /// Only whole path prefixes are replaced: `/workspace/a` and
    /// `'/workspace'` match, `/workspaces` and `/a/workspace` do not. A
    /// working directory of `/` is never rewritten.
    pub fn rewrite<'a>(&self, text: &'a str, exec_root: Option<&str>) -> Cow<'a, str> {
        match exec_root {
            Some(root) if self.rewrites_to(root) => replace_path_prefix(text, &self.work_dir, root),
            _ => Cow::Borrowed(text),
        }
    }

    /// Inverse of [`PathResolver::rewrite`].
    pub fn restore<'a>(&self, text: &'a str, exec_root: Option<&str>) -> Cow<'a, str> {
        match exec_root {
            Some(root) if self.rewrites_to(root) => replace_path_prefix(text, root, &self.work_dir),
            _ => Cow::Borrowed(text),
        }
    }

    fn rewrites_to(&self, root: &str) -> bool {
        self.work_dir != "/" && !root.is_empty() && root != "/" && root != self.work_dir
    }

    /// Join relative paths onto the working directory and normalize.
    fn absolute(&self, path: &str) -> Result<String> {
        if path.starts_with('/') {
            normalize_absolute(path)
        } else {
            normalize_absolute(&format!("{}/{}", self.work_dir.trim_end_matches('/'), path))
        }
    }
}

/// Split an absolute container path into `(parent directory, file name)`.
pub fn split_parent(container_path: &str) -> Result<(String, String)> {
    let (parent, name) = container_path
        .rsplit_once('/')
        .ok_or_else(|| Error::security(format!("not an absolute path: {}", container_path)))?;
    if name.is_empty() {
        return Err(Error::security(format!(
            "path {} does not name a file",
            container_path
        )));
    }
    let parent = if parent.is_empty() { "/" } else { parent };
    Ok((parent.to_string(), name.to_string()))
}

/// Replace every whole-path occurrence of `from` with `to`.
///
/// An occurrence counts when it is not glued to a preceding path segment and
/// is followed by a separator, a quote, whitespace or the end of the text.
fn replace_path_prefix<'a>(text: &'a str, from: &str, to: &str) -> Cow<'a, str> {
    if from.is_empty() || !text.contains(from) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut replaced = false;
    for (start, _) in text.match_indices(from) {
        let end = start + from.len();
        let glued_before = text[..start]
            .chars()
            .next_back()
            .is_some_and(|c| is_name_char(c) || c == '/');
        let glued_after = text[end..].chars().next().is_some_and(is_name_char);
        if glued_before || glued_after {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(to);
        last = end;
        replaced = true;
    }
    if !replaced {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn is_within(root: &str, path: &str) -> bool {
    root == "/" || strip_root(root, path) != path
}
