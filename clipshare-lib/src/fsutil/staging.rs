//! Staging of inbound file sets.
//!
//! An incoming set is streamed into a fresh directory under the working
//! directory and only promoted into place once every entry arrived intact.
//! Promotion renames each top-level staged entry to a collision-free name;
//! the staging directory is removed last.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::debug;

use crate::config::CONFIG_FILE_NAME;
use crate::fsutil::paths::uniquify;

const MAX_CREATE_ATTEMPTS: u32 = 64;

/// Create a staging directory `<workdir>/<hex>` whose name does not collide
/// with anything present. The first candidate derives from the current time;
/// further candidates are random. Creation is atomic, so two concurrent
/// sessions can never share a staging directory.
pub fn create_staging_dir(workdir: &Path) -> io::Result<PathBuf> {
    let mut id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);
    for _ in 0..MAX_CREATE_ATTEMPTS {
        let path = workdir.join(format!("{id:x}"));
        match fs::create_dir(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "staging directory created");
                return Ok(path);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                id = rand::rng().random();
            }
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::other("could not find a free staging directory name"))
}

/// Promote every top-level entry of `staging` into `workdir` under a
/// collision-avoiding name, then remove the staging directory.
///
/// `allow_config_name` relaxes the guard that otherwise keeps an inbound
/// file from materialising as `clipshare.conf`. Returns the promoted paths.
/// An empty staging directory is an error; if any entry fails to promote the
/// staging directory is left in place for inspection.
pub fn promote_staging(
    workdir: &Path,
    staging: &Path,
    allow_config_name: bool,
) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(staging)?
        .collect::<io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.file_name())
        .collect::<Vec<_>>();
    if entries.is_empty() {
        fs::remove_dir_all(staging)?;
        return Err(io::Error::other("no files were received"));
    }
    entries.sort();

    let mut promoted = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = entry
            .into_string()
            .map_err(|_| io::Error::other("staged entry has a non-UTF-8 name"))?;
        let skip_plain = !allow_config_name && name == CONFIG_FILE_NAME;
        let final_name = uniquify(workdir, &name, skip_plain)
            .ok_or_else(|| io::Error::other(format!("no free name for {name}")))?;
        let dest = workdir.join(&final_name);
        fs::rename(staging.join(&name), &dest)?;
        debug!(from = %name, to = %final_name, "staged entry promoted");
        promoted.push(dest);
    }
    fs::remove_dir_all(staging)?;
    Ok(promoted)
}
