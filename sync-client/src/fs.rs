//! Atomic file replacement for received content.
//!
//! Content goes to a temporary sibling first and is renamed over the
//! destination, so a watcher or editor never sees a half-written file.
//! The destination keeps its permission bits, and a symlinked destination
//! stays a symlink: the write lands on its current target.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Symlink hops followed before giving up.
const MAX_SYMLINK_HOPS: usize = 40;

/// Permission bits for files that did not exist before.
#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;

/// Replace `dest` with `bytes` atomically, creating parent directories.
pub fn atomic_write_file(dest: &Path, bytes: &[u8]) -> io::Result<()> {
    let target = resolve_symlinks(dest)?;
    let dir = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "destination has no parent"))?;
    fs::create_dir_all(dir)?;

    let existing = match fs::metadata(&target) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".shadow-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;

    match existing {
        Some(perms) => tmp.as_file().set_permissions(perms)?,
        None => set_new_file_mode(tmp.as_file())?,
    }
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| e.error)?;
    Ok(())
}

/// Resolve `dest` to the file a write would land on, if that file is
/// inside `root`.
///
/// Symlinks are followed both at `dest` and in its parent directories.
/// Returns `None` when the resolved location is outside `root`.
pub fn resolve_within(root: &Path, dest: &Path) -> io::Result<Option<PathBuf>> {
    let root = fs::canonicalize(root)?;
    let target = resolve_symlinks(dest)?;

    // Components below the deepest existing ancestor are created later
    let mut existing = target.as_path();
    let mut missing = Vec::new();
    loop {
        match fs::symlink_metadata(existing) {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let Some(name) = existing.file_name() else {
                    return Ok(None);
                };
                missing.push(name.to_os_string());
                existing = match existing.parent() {
                    Some(parent) => parent,
                    None => return Ok(None),
                };
            }
            Err(e) => return Err(e),
        }
    }

    let mut resolved = fs::canonicalize(existing)?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }

    if resolved == root || !resolved.starts_with(&root) {
        return Ok(None);
    }
    Ok(Some(resolved))
}

#[cfg(unix)]
fn set_new_file_mode(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_mode(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

/// Follow `path` through any chain of symlinks to the file it names.
fn resolve_symlinks(path: &Path) -> io::Result<PathBuf> {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_SYMLINK_HOPS {
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                let link = fs::read_link(&current)?;
                current = if link.is_absolute() {
                    link
                } else {
                    current
                        .parent()
                        .map(|p| p.join(&link))
                        .unwrap_or(link)
                };
            }
            Ok(_) => return Ok(current),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(current),
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::Other,
        format!("too many levels of symbolic links: {}", path.display()),
    ))
}
