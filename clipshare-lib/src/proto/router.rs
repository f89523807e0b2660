//! Method dispatch after version negotiation.

use tracing::debug;

use crate::config::MethodConfig;
use crate::net::{CloseMode, PeerStream};
use crate::proto::{
    files, image, text, SessionContext, SessionError, Version, INFO_NAME, STATUS_METHOD_NOT_IMPLEMENTED,
    STATUS_OK, STATUS_UNKNOWN_METHOD,
};

/// The numeric operations a client may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GetText,
    SendText,
    GetFiles,
    SendFiles,
    GetImage,
    GetCopiedImage,
    GetScreenshot,
    Info,
}

impl Method {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::GetText),
            2 => Some(Self::SendText),
            3 => Some(Self::GetFiles),
            4 => Some(Self::SendFiles),
            5 => Some(Self::GetImage),
            6 => Some(Self::GetCopiedImage),
            7 => Some(Self::GetScreenshot),
            125 => Some(Self::Info),
            _ => None,
        }
    }

    fn enabled(self, methods: &MethodConfig) -> bool {
        match self {
            Self::GetText => methods.get_text,
            Self::SendText => methods.send_text,
            Self::GetFiles => methods.get_files,
            Self::SendFiles => methods.send_files,
            Self::GetImage => methods.get_image,
            Self::GetCopiedImage => methods.get_copied_image,
            Self::GetScreenshot => methods.get_screenshot,
            Self::Info => methods.info,
        }
    }

    /// The copied-image and screenshot methods only exist from version 3 on.
    fn available(self, version: Version) -> bool {
        match self {
            Self::GetCopiedImage | Self::GetScreenshot => version >= Version::V3,
            _ => true,
        }
    }
}

/// Read the method byte, check the per-method enable flag and run the
/// version-specific handler.
pub(crate) async fn route(
    stream: &mut PeerStream,
    ctx: &SessionContext,
    version: Version,
) -> Result<(), SessionError> {
    let byte = stream.read_u8().await?;
    let Some(method) = Method::from_byte(byte) else {
        debug!(method = byte, "unknown method");
        stream.write_u8(STATUS_UNKNOWN_METHOD).await?;
        stream.close(CloseMode::Immediate).await;
        return Ok(());
    };

    if !method.enabled(&ctx.config.methods) {
        debug!(?method, "method disabled by configuration");
        stream.write_u8(STATUS_METHOD_NOT_IMPLEMENTED).await?;
        stream.close(CloseMode::Immediate).await;
        return Ok(());
    }

    if !method.available(version) {
        debug!(?method, version = version.as_byte(), "method not in this protocol version");
        stream.write_u8(STATUS_UNKNOWN_METHOD).await?;
        stream.close(CloseMode::Immediate).await;
        return Ok(());
    }

    debug!(?method, version = version.as_byte(), "dispatching method");
    match method {
        Method::GetText => text::get_text(stream, ctx).await,
        Method::SendText => text::send_text(stream, ctx).await,
        Method::GetFiles => files::get_files(stream, ctx, version).await,
        Method::SendFiles => match version {
            Version::V1 => files::send_file_v1(stream, ctx).await,
            _ => files::send_files(stream, ctx, version).await,
        },
        Method::GetImage => image::get_image(stream, ctx).await,
        Method::GetCopiedImage => image::get_copied_image(stream, ctx).await,
        Method::GetScreenshot => image::get_screenshot(stream, ctx).await,
        Method::Info => info(stream).await,
    }
}

/// Send the build-time info name.
async fn info(stream: &mut PeerStream) -> Result<(), SessionError> {
    stream.write_u8(STATUS_OK).await?;
    stream.send_size(INFO_NAME.len() as i64).await?;
    stream.write_exact(INFO_NAME.as_bytes()).await?;
    Ok(())
}
