//! Checks run before a directory is shared.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use shadow_sync_client::OutboundIgnore;
use shadow_sync_core::relative_to_root;
use walkdir::WalkDir;

/// Above this many files the host is asked to confirm.
pub const LARGE_SHARE_FILE_COUNT: usize = 500;

/// Above this many bytes the host is asked to confirm.
pub const LARGE_SHARE_TOTAL_BYTES: u64 = 50 * 1024 * 1024;

const BLOCKED_DIRS: &[&str] = &[
    "/", "/Users", "/home", "/var", "/etc", "/usr", "/System", "/Library", "/private", "/opt",
    "/bin", "/sbin", "/dev", "/proc", "/sys", "/root",
];

fn blocked_dirs() -> Vec<PathBuf> {
    let mut blocked: Vec<PathBuf> = BLOCKED_DIRS.iter().map(PathBuf::from).collect();
    if let Some(home) = std::env::var_os("HOME").filter(|h| !h.is_empty()) {
        blocked.push(PathBuf::from(home));
    }
    blocked
}

/// Refuse filesystem roots, system directories, and the home directory.
///
/// The check runs on the path as given and again after resolving symlinks.
pub fn validate_share_base_dir(base_dir: &Path) -> Result<()> {
    let blocked = blocked_dirs();
    let is_blocked = |p: &Path| blocked.iter().any(|b| b.as_path() == p);

    let candidate: PathBuf = base_dir.components().collect();
    if is_blocked(&candidate) {
        anyhow::bail!(
            "refusing to share {}: choose a project subdirectory instead",
            candidate.display()
        );
    }
    if let Ok(resolved) = std::fs::canonicalize(&candidate) {
        if is_blocked(&resolved) {
            anyhow::bail!(
                "refusing to share {}: choose a project subdirectory instead",
                resolved.display()
            );
        }
    }
    Ok(())
}

/// Files the initial snapshot would send.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShareEstimate {
    /// Regular files not ignored.
    pub file_count: usize,
    /// Their combined size.
    pub total_bytes: u64,
}

impl ShareEstimate {
    /// Whether the share is big enough to warrant a confirmation.
    pub fn is_large(&self) -> bool {
        self.file_count > LARGE_SHARE_FILE_COUNT || self.total_bytes > LARGE_SHARE_TOTAL_BYTES
    }
}

/// Count what would be shared under `base_dir`.
pub fn estimate_share(base_dir: &Path, ignore: &OutboundIgnore) -> ShareEstimate {
    let mut estimate = ShareEstimate::default();
    let walker = WalkDir::new(base_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            match relative_to_root(base_dir, entry.path()) {
                Some(rel) => !ignore.is_ignored(&rel, entry.file_type().is_dir()),
                None => false,
            }
        });

    for entry in walker.flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(meta) = entry.metadata() {
            estimate.file_count += 1;
            estimate.total_bytes += meta.len();
        }
    }
    estimate
}

/// Ask the host to confirm a large share. Non-interactive input refuses.
pub fn confirm_large_share(
    input: &mut impl BufRead,
    output: &mut impl Write,
    interactive: bool,
    estimate: ShareEstimate,
) -> Result<bool> {
    if !interactive {
        anyhow::bail!(
            "large directory detected and no interactive prompt is available; rerun with --force"
        );
    }

    let size_mb = estimate.total_bytes as f64 / (1024.0 * 1024.0);
    write!(
        output,
        "This directory has ~{} files (~{:.1}MB). Shadow is designed for live collaboration on smaller workspaces. Continue anyway? [y/N] ",
        estimate.file_count, size_mb
    )?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
