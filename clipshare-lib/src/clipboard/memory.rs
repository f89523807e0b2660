use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use super::Clipboard;

/// In-process clipboard.
///
/// Holds either text or a file list, like a platform clipboard holds one
/// selection at a time. Setting one kind clears the other.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    text: Option<String>,
    files: Vec<PathBuf>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a file list, as a platform copy operation would.
    pub fn with_files(paths: Vec<PathBuf>) -> Self {
        Self { state: Mutex::new(State { text: None, files: paths }) }
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| io::Error::other("clipboard poisoned"))
    }
}

impl Clipboard for MemoryClipboard {
    fn get_text(&self) -> io::Result<Option<String>> {
        Ok(self.lock()?.text.clone())
    }

    fn set_text(&self, text: String) -> io::Result<()> {
        let mut state = self.lock()?;
        state.text = Some(text);
        state.files.clear();
        Ok(())
    }

    fn copied_files(&self) -> io::Result<Vec<PathBuf>> {
        Ok(self.lock()?.files.clone())
    }

    fn set_cut_files(&self, paths: Vec<PathBuf>) -> io::Result<()> {
        let mut state = self.lock()?;
        state.text = None;
        state.files = paths;
        Ok(())
    }
}
