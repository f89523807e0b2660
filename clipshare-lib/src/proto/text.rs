//! get-text and send-text.

use tracing::debug;

use crate::clipboard::convert_eol;
use crate::net::{CloseMode, PeerStream};
use crate::proto::{reply_no_data, SessionContext, SessionError, STATUS_OK};

/// Send the clipboard text to the peer. Absence, oversize and back-end
/// failures all answer NO_DATA and end the session.
pub(crate) async fn get_text(
    stream: &mut PeerStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    let text = match ctx.clipboard.get_text() {
        Ok(Some(text))
            if !text.is_empty() && text.len() as i64 <= ctx.config.max_text_length =>
        {
            text
        }
        Ok(_) => return reply_no_data(stream).await,
        Err(e) => {
            debug!(error = %e, "clipboard read failed");
            return reply_no_data(stream).await;
        }
    };

    // the wire always carries LF
    let text = convert_eol(&text, true);
    if text.is_empty() {
        return reply_no_data(stream).await;
    }
    stream.write_u8(STATUS_OK).await?;
    stream.send_size(text.len() as i64).await?;
    stream.write_exact(text.as_bytes()).await?;
    Ok(())
}

/// Receive text from the peer and hand it to the clipboard.
pub(crate) async fn send_text(
    stream: &mut PeerStream,
    ctx: &SessionContext,
) -> Result<(), SessionError> {
    stream.write_u8(STATUS_OK).await?;
    let length = stream.read_size().await?;
    if length <= 0 || length > ctx.config.max_text_length {
        return Err(SessionError::Protocol("text length out of range"));
    }

    let mut buf = vec![0u8; length as usize];
    stream.read_exact(&mut buf).await?;
    let text = String::from_utf8(buf)
        .map_err(|_| SessionError::Protocol("text is not valid UTF-8"))?;
    if text
        .bytes()
        .any(|b| b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
    {
        return Err(SessionError::Protocol("text contains control bytes"));
    }

    let text = convert_eol(&text, false);
    stream.close(CloseMode::Immediate).await;
    ctx.clipboard.set_text(text).map_err(SessionError::Backend)?;
    Ok(())
}
