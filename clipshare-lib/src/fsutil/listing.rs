//! Materialisation of the clipboard file list for outbound transfers.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::proto::Version;

/// One transferable entry: the local path plus the name it travels under.
/// Wire names always use `/` as separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub wire_name: String,
    pub is_dir: bool,
}

/// Expand the copied paths into the entry list a `get-files` response
/// transmits.
///
/// Version 1 sends single files under their base name and skips directories.
/// Versions 2 and 3 walk copied directories recursively, naming each entry
/// by its path relative to the copied item's parent; version 3 additionally
/// transmits directory entries themselves, empty ones included.
pub fn collect_entries(copied: &[PathBuf], version: Version) -> io::Result<Vec<ListedEntry>> {
    let mut entries = Vec::new();
    for path in copied {
        let meta = std::fs::metadata(path)?;
        if meta.is_file() {
            let name = base_name(path)?;
            entries.push(ListedEntry { path: path.clone(), wire_name: name, is_dir: false });
            continue;
        }
        if !meta.is_dir() || version == Version::V1 {
            continue;
        }
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        for item in WalkDir::new(path) {
            let item = item.map_err(io::Error::other)?;
            let is_dir = item.file_type().is_dir();
            if is_dir && version != Version::V3 {
                continue;
            }
            if !is_dir && !item.file_type().is_file() {
                continue;
            }
            let rel = item
                .path()
                .strip_prefix(parent)
                .map_err(io::Error::other)?;
            entries.push(ListedEntry {
                path: item.path().to_path_buf(),
                wire_name: wire_name(rel)?,
                is_dir,
            });
        }
    }
    Ok(entries)
}

fn base_name(path: &Path) -> io::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| io::Error::other(format!("unrepresentable file name: {}", path.display())))
}

fn wire_name(rel: &Path) -> io::Result<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| io::Error::other(format!("unrepresentable path: {}", rel.display())))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}
