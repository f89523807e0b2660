//! Error-log sink co-located with the working directory.
//!
//! Fatal startup failures are appended to `server_err.log` in addition to
//! being reported through `tracing`, so a daemonised instance leaves a trace
//! even when stderr is gone.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

pub const ERROR_LOG_FILE: &str = "server_err.log";

/// Append a single line to `server_err.log` under `dir`.
///
/// Failures to write the log are swallowed: the log is best-effort and must
/// never take the daemon down on its own.
pub fn append_error_log(dir: &Path, message: &str) {
    let path = dir.join(ERROR_LOG_FILE);
    let file = OpenOptions::new().append(true).create(true).open(&path);
    match file {
        Ok(mut f) => {
            let _ = writeln!(f, "{message}");
        }
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not open error log");
        }
    }
}
