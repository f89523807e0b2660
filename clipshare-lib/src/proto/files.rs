//! get-files and send-files across the three protocol versions.
//!
//! Outbound transfers stream straight from disk; inbound sets are staged in
//! a fresh directory and promoted into the working directory only once every
//! entry arrived intact (version 1 receives its single file directly).

use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::config::CONFIG_FILE_NAME;
use crate::fsutil::{
    collect_entries, contains_parent_escape, create_staging_dir, is_valid_name, mkdirs,
    promote_staging, to_native_path, uniquify, ListedEntry,
};
use crate::net::{CloseMode, PeerStream};
use crate::proto::{
    reply_no_data, SessionContext, SessionError, Version, FILE_BUF_SIZE, MAX_FILE_NAME_LEN,
    STATUS_OK,
};

/// Transmit the clipboard's file list.
pub(crate) async fn get_files(
    stream: &mut PeerStream,
    ctx: &SessionContext,
    version: Version,
) -> Result<(), SessionError> {
    let copied = match ctx.clipboard.copied_files() {
        Ok(copied) => copied,
        Err(e) => {
            debug!(error = %e, "clipboard file list failed");
            return reply_no_data(stream).await;
        }
    };
    let entries = match collect_entries(&copied, version) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(error = %e, "file list materialisation failed");
            return reply_no_data(stream).await;
        }
    };
    if entries.is_empty() || entries.len() as i64 > ctx.config.max_file_count {
        return reply_no_data(stream).await;
    }

    stream.write_u8(STATUS_OK).await?;
    stream.send_size(entries.len() as i64).await?;
    for entry in &entries {
        transfer_entry(stream, ctx, entry).await?;
    }
    Ok(())
}

async fn transfer_entry(
    stream: &mut PeerStream,
    ctx: &SessionContext,
    entry: &ListedEntry,
) -> Result<(), SessionError> {
    let name = entry.wire_name.as_bytes();
    if name.is_empty() || name.len() as i64 > MAX_FILE_NAME_LEN {
        return Err(SessionError::Protocol("file name length out of range"));
    }
    stream.send_size(name.len() as i64).await?;
    stream.write_exact(name).await?;

    if entry.is_dir {
        stream.send_size(-1).await?;
        return Ok(());
    }

    let mut file = tokio::fs::File::open(&entry.path)
        .await
        .map_err(SessionError::File)?;
    let size = file
        .metadata()
        .await
        .map_err(SessionError::File)?
        .len() as i64;
    if size > ctx.config.max_file_size {
        return Err(SessionError::Protocol("file exceeds the size limit"));
    }
    stream.send_size(size).await?;

    let mut remaining = size as u64;
    let mut buf = vec![0u8; FILE_BUF_SIZE];
    while remaining > 0 {
        let want = remaining.min(FILE_BUF_SIZE as u64) as usize;
        let got = file.read(&mut buf[..want]).await.map_err(SessionError::File)?;
        if got == 0 {
            return Err(SessionError::File(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "file shrank while being sent",
            )));
        }
        stream.write_exact(&buf[..got]).await?;
        remaining -= got as u64;
    }
    Ok(())
}

/// Receive a file set (versions 2 and 3): stage every entry, close the
/// socket, then promote the staged set into the working directory.
pub(crate) async fn send_files(
    stream: &mut PeerStream,
    ctx: &SessionContext,
    version: Version,
) -> Result<(), SessionError> {
    stream.write_u8(STATUS_OK).await?;
    let count = stream.read_size().await?;
    if count <= 0 || count > ctx.config.max_file_count {
        return Err(SessionError::Protocol("file count out of range"));
    }

    let staging = create_staging_dir(&ctx.workdir).map_err(SessionError::File)?;
    for _ in 0..count {
        if let Err(e) = save_entry(stream, ctx, &staging, version).await {
            // partial fragments must not bleed into the working directory
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }
    }
    stream.close(CloseMode::Immediate).await;

    let promoted = promote_staging(&ctx.workdir, &staging, ctx.explicit_workdir)
        .map_err(SessionError::File)?;
    publish_cut(ctx, promoted)
}

/// Receive one staged entry: name frame, validation, body (or a `-1`
/// directory marker in version 3).
async fn save_entry(
    stream: &mut PeerStream,
    ctx: &SessionContext,
    staging: &Path,
    version: Version,
) -> Result<(), SessionError> {
    let name_len = stream.read_size().await?;
    if name_len <= 0 || name_len > MAX_FILE_NAME_LEN {
        return Err(SessionError::Protocol("file name length out of range"));
    }
    let mut raw = vec![0u8; name_len as usize];
    stream.read_exact(&mut raw).await?;
    let name = std::str::from_utf8(&raw)
        .ok()
        .filter(|name| is_valid_name(name))
        .ok_or(SessionError::Protocol("invalid file name"))?;

    let native = to_native_path(name).ok_or(SessionError::Protocol("invalid path"))?;
    let relative = native.path.trim_start_matches(MAIN_SEPARATOR);
    if relative.is_empty() {
        return Err(SessionError::Protocol("invalid path"));
    }
    let target = staging.join(relative);
    let realised = target.to_string_lossy();
    if contains_parent_escape(&realised) {
        return Err(SessionError::Protocol("path escapes the working directory"));
    }

    let body = stream.read_size().await?;
    if body > ctx.config.max_file_size {
        return Err(SessionError::Protocol("file exceeds the size limit"));
    }
    if body == -1 && version >= Version::V3 {
        return mkdirs(&target).map_err(SessionError::File);
    }
    if body < 0 {
        return Err(SessionError::Protocol("negative file size"));
    }
    if let Some(parent) = target.parent() {
        mkdirs(parent).map_err(SessionError::File)?;
    }
    receive_body(stream, &target, body as u64).await
}

/// Receive a single file (version 1): base name only, stored directly in the
/// working directory under a collision-free name.
pub(crate) async fn send_file_v1(
    stream: &mut PeerStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    stream.write_u8(STATUS_OK).await?;
    let name_len = stream.read_size().await?;
    if name_len <= 0 || name_len > MAX_FILE_NAME_LEN {
        return Err(SessionError::Protocol("file name length out of range"));
    }
    let mut raw = vec![0u8; name_len as usize];
    stream.read_exact(&mut raw).await?;
    let name = std::str::from_utf8(&raw)
        .ok()
        .filter(|name| is_valid_name(name))
        .ok_or(SessionError::Protocol("invalid file name"))?;

    // version 1 transmits only the base name; anything before the last
    // separator is dropped
    let base = name.rsplit('/').next().unwrap_or(name);
    if base.is_empty() || base.contains(MAIN_SEPARATOR) {
        return Err(SessionError::Protocol("invalid file name"));
    }

    let skip_plain = !ctx.explicit_workdir && base == CONFIG_FILE_NAME;
    let final_name = uniquify(&ctx.workdir, base, skip_plain)
        .ok_or(SessionError::Protocol("no free name for the file"))?;
    let target = ctx.workdir.join(&final_name);

    let body = stream.read_size().await?;
    if body < 0 || body > ctx.config.max_file_size {
        return Err(SessionError::Protocol("file size out of range"));
    }
    receive_body(stream, &target, body as u64).await?;
    stream.close(CloseMode::Immediate).await;
    publish_cut(ctx, vec![target])
}

/// Stream exactly `size` bytes into a fresh file at `target`. The file must
/// not pre-exist; a partial file is deleted on any failure.
async fn receive_body(
    stream: &mut PeerStream,
    target: &Path,
    size: u64,
) -> Result<(), SessionError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
        .await
        .map_err(SessionError::File)?;

    let mut remaining = size;
    let mut buf = vec![0u8; FILE_BUF_SIZE];
    while remaining > 0 {
        let chunk = remaining.min(FILE_BUF_SIZE as u64) as usize;
        if let Err(e) = stream.read_exact(&mut buf[..chunk]).await {
            drop(file);
            let _ = std::fs::remove_file(target);
            return Err(e.into());
        }
        if let Err(e) = file.write_all(&buf[..chunk]).await {
            drop(file);
            let _ = std::fs::remove_file(target);
            return Err(SessionError::File(e));
        }
        remaining -= chunk as u64;
    }
    file.flush().await.map_err(SessionError::File)?;
    debug!(path = %target.display(), size, "file received");
    Ok(())
}

/// Publish freshly landed files as a "cut" selection when configured.
fn publish_cut(ctx: &SessionContext, paths: Vec<PathBuf>) -> Result<(), SessionError> {
    if !ctx.config.cut_sent_files {
        return Ok(());
    }
    let absolute = paths
        .into_iter()
        .map(|p| std::fs::canonicalize(&p).unwrap_or(p))
        .collect();
    ctx.clipboard
        .set_cut_files(absolute)
        .map_err(SessionError::Backend)
}
