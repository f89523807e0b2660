//! The versioned binary protocol.
//!
//! A session is one accepted connection: a single-byte version negotiation,
//! one method, the method's framed exchange, close. All multi-byte integers
//! on the wire are signed 64-bit big-endian.

mod files;
mod image;
mod negotiate;
mod router;
mod text;

pub use negotiate::{PROTOCOL_OBSOLETE, PROTOCOL_SUPPORTED, PROTOCOL_UNKNOWN};
pub use router::Method;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::clipboard::{Clipboard, ImageProvider};
use crate::config::Config;
use crate::net::{CloseMode, PeerStream, StreamError};

/// Oldest protocol version this build speaks.
pub const PROTOCOL_MIN: u8 = 1;
/// Newest protocol version this build speaks.
pub const PROTOCOL_MAX: u8 = 3;

/// Name returned by the `info` method and the UDP discovery responder.
pub const INFO_NAME: &str = "clipshare";

pub(crate) const STATUS_OK: u8 = 1;
pub(crate) const STATUS_NO_DATA: u8 = 2;
pub(crate) const STATUS_UNKNOWN_METHOD: u8 = 3;
pub(crate) const STATUS_METHOD_NOT_IMPLEMENTED: u8 = 4;

/// Longest file name accepted on the wire, in bytes.
pub(crate) const MAX_FILE_NAME_LEN: i64 = 2048;
/// 1 GiB cap on image payloads.
pub(crate) const MAX_IMAGE_SIZE: i64 = 1_073_741_824;
/// Chunk size for streaming file bodies.
pub(crate) const FILE_BUF_SIZE: usize = 65536;

/// A negotiated protocol version. Version 0 is reserved for tests and never
/// reaches method dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Version {
    V1,
    V2,
    V3,
}

impl Version {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

/// Why a session ended early. The dispatcher uses the kind only to pick the
/// close mode and the log level; errors never cross session boundaries.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The peer broke the framing or sent something the protocol forbids.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// A clipboard or image back-end call failed after the wire exchange.
    #[error("backend failure: {0}")]
    Backend(#[source] std::io::Error),

    /// Local file I/O failed while transferring a body.
    #[error("file error: {0}")]
    File(#[source] std::io::Error),
}

/// Everything a session worker may touch: the immutable configuration and
/// the injected back-ends. Shared read-only across workers.
pub struct SessionContext {
    pub config: Arc<Config>,
    pub clipboard: Arc<dyn Clipboard>,
    pub images: Arc<dyn ImageProvider>,
    /// Directory all inbound files land under.
    pub workdir: PathBuf,
    /// True when the working directory was configured explicitly; relaxes
    /// the guard on the configuration file name.
    pub explicit_workdir: bool,
}

/// Run one full session on an admitted stream: version negotiation, method
/// dispatch, method body. The caller closes the stream afterwards (a no-op
/// when a handler already closed it).
pub async fn serve_session(
    stream: &mut PeerStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    let Some(version) = negotiate::negotiate_version(stream, &ctx.config).await? else {
        return Ok(());
    };
    router::route(stream, ctx, version).await
}

/// Report "no data" and end the session.
pub(crate) async fn reply_no_data(stream: &mut PeerStream) -> Result<(), SessionError> {
    stream.write_u8(STATUS_NO_DATA).await?;
    stream.close(CloseMode::Immediate).await;
    Ok(())
}
