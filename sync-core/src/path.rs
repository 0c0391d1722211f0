//! Relative path handling.
//!
//! Wire paths are always slash-separated and relative to the shared root.
//! Inbound paths come from an untrusted peer and must pass
//! [`validate_relative`] before they are joined onto anything.

use std::path::{Component, Path, PathBuf};

use shadow_sync_types::MAX_PATH_BYTES;
use thiserror::Error;

/// Reasons a wire path is refused.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// Empty path.
    #[error("empty path")]
    Empty,

    /// Path longer than [`MAX_PATH_BYTES`].
    #[error("path too long: {0} bytes")]
    TooLong(usize),

    /// Absolute path, UNC path or drive letter.
    #[error("absolute path: {0}")]
    Absolute(String),

    /// A `..` component.
    #[error("path escapes root: {0}")]
    Traversal(String),

    /// Not in canonical form (`.`, empty components, backslashes, NUL).
    #[error("path not clean: {0}")]
    NotClean(String),

    /// Clean on the wire, but resolves outside the root through a symlink.
    #[error("path resolves outside root: {0}")]
    OutsideRoot(String),
}

/// A validated, clean relative path (`dir/file.txt`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// The slash-separated form used on the wire and as ledger key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Join onto `root` component by component.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        out.extend(self.0.split('/'));
        out
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate an untrusted wire path.
pub fn validate_relative(raw: &str) -> Result<RelPath, PathError> {
    if raw.is_empty() {
        return Err(PathError::Empty);
    }
    if raw.len() > MAX_PATH_BYTES {
        return Err(PathError::TooLong(raw.len()));
    }
    if raw.starts_with('/') || has_drive_prefix(raw) {
        return Err(PathError::Absolute(raw.to_string()));
    }
    if raw.contains('\\') || raw.contains('\0') {
        return Err(PathError::NotClean(raw.to_string()));
    }

    for component in raw.split('/') {
        match component {
            ".." => return Err(PathError::Traversal(raw.to_string())),
            "" | "." => return Err(PathError::NotClean(raw.to_string())),
            _ => {}
        }
    }

    Ok(RelPath(raw.to_string()))
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Slash-separated path of `abs` below `root`.
///
/// Returns `None` for the root itself and for anything outside it.
/// Both paths are compared as given; callers canonicalize first.
pub fn relative_to_root(root: &Path, abs: &Path) -> Option<String> {
    let rest = abs.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rest.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Real target behind an editor's temporary write file.
///
/// Editors often save through `name.tmp` or `name~` before renaming over
/// `name`. Returns the stripped path for such names, `None` otherwise.
/// The caller decides whether the target exists.
pub fn editor_shadow_target(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let stripped = name
        .strip_suffix(".tmp")
        .or_else(|| name.strip_suffix('~'))?;
    if stripped.is_empty() {
        return None;
    }
    Some(path.with_file_name(stripped))
}
