//! Ignore matching for outbound and inbound paths.
//!
//! Outbound paths pass the hardcoded rule and, when the shared root lives
//! inside a git work tree, the repository's own ignore rules (nested
//! `.gitignore` files included). Inbound paths only pass the hardcoded
//! rule: the receiver has no say in what the sender's repository ignores.
//!
//! Git lookups spawn a process, so [`GitIgnoreMatcher`] preloads every
//! currently ignored path in one query and caches each later answer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{PoisonError, RwLock};

use shadow_sync_core::{is_hardcoded_ignored, relative_to_root, validate_relative};

/// Whether an inbound path must be dropped.
pub fn is_ignored_inbound(rel_path: &str) -> bool {
    is_hardcoded_ignored(rel_path)
}

/// Outbound filter: hardcoded rule plus optional git rules.
#[derive(Debug, Default)]
pub struct OutboundIgnore {
    git: Option<GitIgnoreMatcher>,
}

impl OutboundIgnore {
    /// Build the filter for `base_dir`, enabling git rules when possible.
    ///
    /// Never fails: without git or a work tree only the hardcoded rule
    /// applies.
    pub fn new(base_dir: &Path) -> Self {
        let git = GitIgnoreMatcher::discover(base_dir);
        match &git {
            Some(m) => tracing::debug!(
                "gitignore support enabled for {} (repository {})",
                base_dir.display(),
                m.git_root.display()
            ),
            None => tracing::debug!("gitignore support disabled for {}", base_dir.display()),
        }
        Self { git }
    }

    /// Filter with only the hardcoded rule.
    pub fn hardcoded_only() -> Self {
        Self::default()
    }

    /// Whether git rules are active.
    pub fn has_git(&self) -> bool {
        self.git.is_some()
    }

    /// Whether `rel_path` (relative to the shared root) must not be sent.
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        if is_hardcoded_ignored(rel_path) {
            return true;
        }
        match &self.git {
            Some(git) => git.is_ignored(rel_path, is_dir),
            None => false,
        }
    }
}

#[derive(Debug, Default)]
struct IgnoreCache {
    ignored_files: HashSet<String>,
    ignored_dirs: HashSet<String>,
    not_ignored_files: HashSet<String>,
    not_ignored_dirs: HashSet<String>,
}

impl IgnoreCache {
    fn is_ignored(&self, repo_rel: &str, is_dir: bool) -> bool {
        if !is_dir && self.ignored_files.contains(repo_rel) {
            return true;
        }
        if self.ignored_dirs.contains(repo_rel) {
            return true;
        }
        let mut current = repo_rel;
        while let Some((parent, _)) = current.rsplit_once('/') {
            if self.ignored_dirs.contains(parent) {
                return true;
            }
            current = parent;
        }
        false
    }

    fn is_not_ignored(&self, repo_rel: &str, is_dir: bool) -> bool {
        if is_dir {
            self.not_ignored_dirs.contains(repo_rel)
        } else {
            self.not_ignored_files.contains(repo_rel)
        }
    }
}

/// Git-aware matcher bound to one repository.
#[derive(Debug)]
pub struct GitIgnoreMatcher {
    base_dir: PathBuf,
    git_root: PathBuf,
    cache: RwLock<IgnoreCache>,
}

impl GitIgnoreMatcher {
    /// Find the repository containing `base_dir` and preload its ignored
    /// paths.
    ///
    /// Returns `None` outside a work tree or when git cannot be run.
    pub fn discover(base_dir: &Path) -> Option<Self> {
        let base_dir = normalize_path(base_dir);
        let git_root = repository_root(&base_dir)?;

        let matcher = Self {
            base_dir,
            git_root,
            cache: RwLock::new(IgnoreCache::default()),
        };
        matcher.preload().ok()?;
        Some(matcher)
    }

    /// Repository top level.
    pub fn git_root(&self) -> &Path {
        &self.git_root
    }

    fn preload(&self) -> std::io::Result<()> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.git_root)
            .args([
                "ls-files",
                "--others",
                "-i",
                "--exclude-standard",
                "--directory",
                "-z",
            ])
            .stderr(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Ok(());
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let mut seeded = 0usize;
        for entry in listing.split('\0') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            self.mark_ignored(entry, entry.ends_with('/'));
            seeded += 1;
        }
        tracing::debug!(
            "Preloaded {} ignored paths from {}",
            seeded,
            self.git_root.display()
        );
        Ok(())
    }

    /// Whether git ignores `rel_path` (relative to the shared root).
    ///
    /// Paths outside the repository are never ignored. A failed git query
    /// answers "not ignored" and is not cached.
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        let Some(repo_rel) = self.repo_relative(rel_path) else {
            return false;
        };

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if cache.is_ignored(&repo_rel, is_dir) {
                return true;
            }
            if cache.is_not_ignored(&repo_rel, is_dir) {
                return false;
            }
        }

        match self.check_ignore(&repo_rel, is_dir) {
            Some(true) => {
                self.mark_ignored(&repo_rel, is_dir);
                true
            }
            Some(false) => {
                self.mark_not_ignored(&repo_rel, is_dir);
                false
            }
            None => false,
        }
    }

    fn repo_relative(&self, rel_path: &str) -> Option<String> {
        let rel = validate_relative(rel_path).ok()?;
        relative_to_root(&self.git_root, &rel.to_path(&self.base_dir))
    }

    fn check_ignore(&self, repo_rel: &str, is_dir: bool) -> Option<bool> {
        let candidate = if is_dir {
            format!("{}/", repo_rel.trim_end_matches('/'))
        } else {
            repo_rel.to_string()
        };

        let status = Command::new("git")
            .arg("-C")
            .arg(&self.git_root)
            .args(["check-ignore", "-q", "--"])
            .arg(&candidate)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .ok()?;

        match status.code() {
            Some(0) => Some(true),
            Some(1) => Some(false),
            _ => None,
        }
    }

    fn mark_ignored(&self, repo_rel: &str, is_dir: bool) {
        let Some(key) = cache_key(repo_rel) else {
            return;
        };
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.not_ignored_files.remove(&key);
        cache.not_ignored_dirs.remove(&key);
        if is_dir {
            cache.ignored_dirs.insert(key);
        } else {
            cache.ignored_files.insert(key);
        }
    }

    fn mark_not_ignored(&self, repo_rel: &str, is_dir: bool) {
        let Some(key) = cache_key(repo_rel) else {
            return;
        };
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if is_dir {
            cache.not_ignored_dirs.insert(key);
        } else {
            cache.not_ignored_files.insert(key);
        }
    }
}

fn cache_key(repo_rel: &str) -> Option<String> {
    let trimmed = repo_rel.trim();
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    validate_relative(trimmed).ok().map(|p| p.as_str().to_string())
}

fn repository_root(base_dir: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .arg("-C")
        .arg(base_dir)
        .args(["rev-parse", "--show-toplevel"])
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        return None;
    }
    Some(normalize_path(Path::new(&root)))
}

/// Absolute, symlink-resolved form of `path` when it exists.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute.canonicalize().unwrap_or(absolute)
}
