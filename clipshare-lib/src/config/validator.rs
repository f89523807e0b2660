use std::path::Path;

use crate::config::Config;
use crate::error::{Result, ServerError};

/// Startup validation of an assembled configuration. Failures here are
/// fatal: the daemon exits instead of running with a broken setup.
pub fn validate_config(cfg: &Config) -> Result<()> {
    if !cfg.insecure_mode_enabled && !cfg.secure_mode_enabled && !cfg.udp_server_enabled {
        return Err(ServerError::Config("all listeners are disabled".into()));
    }

    if cfg.secure_mode_enabled {
        let Some(tls) = &cfg.tls else {
            return Err(ServerError::Config(
                "secure mode requires server_cert and ca_cert".into(),
            ));
        };
        require_file("server_cert", &tls.cert_bundle)?;
        require_file("ca_cert", &tls.ca_cert)?;
    }

    if let Some(dir) = &cfg.working_dir {
        if !dir.is_dir() {
            return Err(ServerError::Config(format!(
                "working_dir is not an existing directory: {}",
                dir.display()
            )));
        }
    }

    Ok(())
}

fn require_file(key: &str, path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ServerError::Config(format!("{key} file not found: {}", path.display())));
    }
    Ok(())
}
