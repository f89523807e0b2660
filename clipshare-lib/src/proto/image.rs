//! get-image, get-copied-image and get-screenshot.

use tracing::debug;

use crate::clipboard::ImageMode;
use crate::net::PeerStream;
use crate::proto::{reply_no_data, SessionContext, SessionError, MAX_IMAGE_SIZE, STATUS_OK};

pub(crate) async fn get_image(
    stream: &mut PeerStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    let display = resolve_display(ctx, 0);
    send_image(stream, ctx, ImageMode::Any, display).await
}

pub(crate) async fn get_copied_image(
    stream: &mut PeerStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    let display = resolve_display(ctx, 0);
    send_image(stream, ctx, ImageMode::CopiedOnly, display).await
}

/// Screenshot of a client-chosen display. The method acknowledges with OK
/// before reading the display index frame; capture status follows.
pub(crate) async fn get_screenshot(
    stream: &mut PeerStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    stream.write_u8(STATUS_OK).await?;
    let requested = stream.read_size().await?;
    // out-of-range indexes fall back to the default display
    let requested = if (1..=65536).contains(&requested) { requested } else { 0 };
    let display = resolve_display(ctx, u16::try_from(requested).unwrap_or(0));
    send_image(stream, ctx, ImageMode::ScreenshotOnly, display).await
}

/// A client may only pick the display when the configuration allows it;
/// index 0 always means the configured default.
fn resolve_display(ctx: &SessionContext, requested: u16) -> u16 {
    if requested == 0 || !ctx.config.client_selects_display {
        ctx.config.display
    } else {
        requested
    }
}

async fn send_image(
    stream: &mut PeerStream,
    ctx: &SessionContext,
    mode: ImageMode,
    display: u16,
) -> Result<(), SessionError> {
    let image = match ctx.images.capture(mode, display) {
        Ok(Some(bytes)) if !bytes.is_empty() && bytes.len() as i64 <= MAX_IMAGE_SIZE => bytes,
        Ok(_) => return reply_no_data(stream).await,
        Err(e) => {
            let display_index = display;
            debug!(error = %e, ?mode, display = display_index, "image capture failed");
            return reply_no_data(stream).await;
        }
    };
    stream.write_u8(STATUS_OK).await?;
    stream.send_size(image.len() as i64).await?;
    stream.write_exact(&image).await?;
    Ok(())
}
