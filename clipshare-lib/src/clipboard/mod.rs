//! Adapter contracts for the platform clipboard and screenshot back-ends.
//!
//! The protocol handlers only ever talk to these traits. Platform back-ends
//! (X11 selections, Windows clipboard, framebuffer capture) live outside this
//! crate; [`MemoryClipboard`] is the in-process implementation the daemon
//! falls back to and the one the tests drive.

mod memory;
mod text;

pub use memory::MemoryClipboard;
pub use text::convert_eol;

use std::io;
use std::path::PathBuf;

/// What the image provider should capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMode {
    /// Copied image if present, otherwise a screenshot.
    Any,
    /// Only an image copied to the clipboard.
    CopiedOnly,
    /// Only a screenshot of a display.
    ScreenshotOnly,
}

/// Text and file-list clipboard operations.
pub trait Clipboard: Send + Sync {
    /// Current clipboard text, or `None` when the clipboard holds no text.
    fn get_text(&self) -> io::Result<Option<String>>;

    fn set_text(&self, text: String) -> io::Result<()>;

    /// Paths currently copied to the clipboard.
    fn copied_files(&self) -> io::Result<Vec<PathBuf>>;

    /// Publish `paths` as a "cut" selection.
    fn set_cut_files(&self, paths: Vec<PathBuf>) -> io::Result<()>;
}

/// Screenshot / copied-image capture.
///
/// `display` selects the output to capture for screenshot modes; `0` means
/// the provider's default. The returned bytes are a complete PNG image.
pub trait ImageProvider: Send + Sync {
    fn capture(&self, mode: ImageMode, display: u16) -> io::Result<Option<Vec<u8>>>;
}

/// Image provider for builds without a capture back-end. Never has data.
#[derive(Debug, Default)]
pub struct NoopImageProvider;

impl ImageProvider for NoopImageProvider {
    fn capture(&self, _mode: ImageMode, _display: u16) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}
