//! Hardcoded ignore rule, applied in both directions.
//!
//! Covers version-control and IDE metadata directories, OS metadata
//! files, editor swap/backup/temp suffixes and PostgreSQL socket files.
//! Matching is a single case-insensitive regex over the slash-separated
//! relative path.

use std::sync::OnceLock;

use regex::Regex;

const HARDCODED_PATTERN: &str = concat!(
    r"(?i)(?:^|[\\/])(?:\.git|\.hg|\.svn|\.vscode|\.idea|node_modules|\.opencode)(?:[\\/]|$)",
    r"|(?:^|[\\/])\.s\.pgsql\.\d+$",
    r"|\.ds_store$",
    r"|\.sw[a-p0-9]$|\.swp$|\.swo$",
    r"|~$|\.bak$|\.tmp$",
);

static HARDCODED: OnceLock<Regex> = OnceLock::new();

fn hardcoded() -> &'static Regex {
    HARDCODED.get_or_init(|| Regex::new(HARDCODED_PATTERN).expect("hardcoded ignore pattern"))
}

/// Whether `rel_path` matches the hardcoded ignore rule.
///
/// An empty path never matches.
pub fn is_hardcoded_ignored(rel_path: &str) -> bool {
    if rel_path.is_empty() {
        return false;
    }
    hardcoded().is_match(rel_path)
}
