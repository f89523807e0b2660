//! Single-byte protocol version negotiation.

use tracing::debug;

use crate::config::Config;
use crate::net::{CloseMode, PeerStream};
use crate::proto::{SessionError, Version};

pub const PROTOCOL_SUPPORTED: u8 = 1;
pub const PROTOCOL_OBSOLETE: u8 = 2;
pub const PROTOCOL_UNKNOWN: u8 = 3;

/// Negotiate the session version.
///
/// The client proposes one byte. Below the configured minimum the server
/// answers OBSOLETE and closes; within range it answers SUPPORTED; above the
/// maximum it answers UNKNOWN followed by its maximum and the client either
/// confirms that version or the session ends.
///
/// Returns `None` when the session ends without a usable version — including
/// the reserved test version 0, after which no further bytes are read.
pub(crate) async fn negotiate_version(
    stream: &mut PeerStream,
    config: &Config,
) -> Result<Option<Version>, SessionError> {
    let proposed = stream.read_u8().await?;

    if proposed < config.min_proto_version {
        debug!(proposed, "client protocol version is obsolete");
        stream.write_u8(PROTOCOL_OBSOLETE).await?;
        stream.close(CloseMode::Immediate).await;
        return Ok(None);
    }

    let accepted = if proposed <= config.max_proto_version {
        stream.write_u8(PROTOCOL_SUPPORTED).await?;
        proposed
    } else {
        debug!(proposed, max = config.max_proto_version, "client protocol version is unknown");
        stream.write_u8(PROTOCOL_UNKNOWN).await?;
        stream.write_u8(config.max_proto_version).await?;
        let confirmed = stream.read_u8().await?;
        if confirmed != config.max_proto_version {
            stream.close(CloseMode::Immediate).await;
            return Ok(None);
        }
        confirmed
    };

    Ok(Version::from_byte(accepted))
}
