//! Validation and translation of inbound file names.

use std::io;
use std::path::{Path, MAIN_SEPARATOR};

/// Highest `N_` prefix tried before giving up on a unique name.
const MAX_UNIQUIFY: u32 = 999_999;

/// A file name is valid only if it is non-empty and contains no code point
/// below `0x20`. (UTF-8 validity is a given for `&str`; callers decode wire
/// bytes first and reject invalid UTF-8 there.)
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| (c as u32) < 0x20)
}

/// A wire name translated to the platform separator.
#[derive(Debug, PartialEq, Eq)]
pub struct NativeName {
    pub path: String,
    /// Set when the wire name carried a trailing `/`.
    pub is_dir: bool,
}

/// Translate a wire name (`/`-separated) into a native relative path.
///
/// A single trailing separator is stripped and reported as "is-directory".
/// Names containing `//` are rejected, as is a bare separator.
pub fn to_native_path(name: &str) -> Option<NativeName> {
    if name.contains("//") {
        return None;
    }
    let (stripped, is_dir) = match name.strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (name, false),
    };
    if stripped.is_empty() {
        return None;
    }
    let path = stripped
        .chars()
        .map(|c| if c == '/' { MAIN_SEPARATOR } else { c })
        .collect();
    Some(NativeName { path, is_dir })
}

/// True iff `<SEP>..<SEP>` occurs in `path`.
pub fn contains_parent_escape(path: &str) -> bool {
    let needle = format!("{MAIN_SEPARATOR}..{MAIN_SEPARATOR}");
    path.contains(&needle)
}

/// Create `path` and all missing ancestors. Never deletes; fails when an
/// ancestor exists and is not a directory.
pub fn mkdirs(path: &Path) -> io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Find a name not present in `dir`: `base` itself first, then `1_base` up
/// to `999999_base`. With `skip_plain` the bare name is never used; this
/// protects the daemon's own configuration file name.
pub fn uniquify(dir: &Path, base: &str, skip_plain: bool) -> Option<String> {
    if !skip_plain && !exists(&dir.join(base)) {
        return Some(base.to_owned());
    }
    (1..=MAX_UNIQUIFY)
        .map(|n| format!("{n}_{base}"))
        .find(|candidate| !exists(&dir.join(candidate)))
}

// exists() follows symlinks; a dangling symlink still occupies the name.
fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}
