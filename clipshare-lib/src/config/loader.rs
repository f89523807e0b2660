//! Line-oriented `key = value` configuration parser.
//!
//! Values are integers with an optional K/M/G/T suffix (base 1000), booleans
//! (`true|false|1|0`), paths, or IP addresses. Lines whose trimmed key starts
//! with `#` are comments; unknown keys are ignored.

use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::root::TlsConfig;
use crate::config::Config;
use crate::error::{Result, ServerError};

const LINE_MAX_LEN: usize = 2047;
/// Allow-list entries longer than this are rejected.
const MAX_CLIENT_NAME_LEN: usize = 511;

/// Load the configuration from `path`, applying defaults for everything the
/// file does not set. A missing file yields the default configuration.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "configuration file not found, using defaults");
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(ServerError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            )))
        }
    };

    let mut cfg = Config::default();
    let mut tls = TlsPaths::default();
    for line in text.lines() {
        parse_line(line, &mut cfg, &mut tls)?;
    }
    cfg.tls = tls.build()?;
    cfg.clamp_proto_versions();
    Ok(cfg)
}

/// TLS keys accumulate separately until the whole triple can be assembled.
#[derive(Debug, Default)]
struct TlsPaths {
    cert_bundle: Option<PathBuf>,
    ca_cert: Option<PathBuf>,
    allowed_clients: Option<PathBuf>,
}

impl TlsPaths {
    fn build(self) -> Result<Option<TlsConfig>> {
        let (Some(cert_bundle), Some(ca_cert)) = (self.cert_bundle, self.ca_cert) else {
            return Ok(None);
        };
        let allowed_clients = match self.allowed_clients {
            Some(path) => load_client_list(&path)?,
            None => HashSet::new(),
        };
        Ok(Some(TlsConfig { cert_bundle, ca_cert, allowed_clients }))
    }
}

/// Read the allow-list file: one Common Name per line, trimmed, `#` comments
/// and blank lines skipped.
fn load_client_list(path: &Path) -> Result<HashSet<String>> {
    let text = fs::read_to_string(path).map_err(|e| {
        ServerError::Config(format!("Failed to read allowed clients file {}: {e}", path.display()))
    })?;
    let mut clients = HashSet::new();
    for line in text.lines() {
        let name = trim(line);
        if name.is_empty() || name.starts_with('#') {
            continue;
        }
        if name.len() > MAX_CLIENT_NAME_LEN {
            return Err(ServerError::Config(format!(
                "Allowed client name too long: {} bytes",
                name.len()
            )));
        }
        clients.insert(name.to_owned());
    }
    Ok(clients)
}

fn parse_line(line: &str, cfg: &mut Config, tls: &mut TlsPaths) -> Result<()> {
    let Some((key, value)) = line.split_once('=') else {
        return Ok(());
    };
    let key = trim(key);
    let value = trim(value);
    if key.starts_with('#') {
        return Ok(());
    }
    if key.is_empty() || key.len() >= LINE_MAX_LEN {
        return Err(ServerError::Config("invalid config key".into()));
    }
    if value.is_empty() || value.len() >= LINE_MAX_LEN {
        return Err(ServerError::Config(format!("invalid value for config key {key}")));
    }

    match key {
        "app_port" => cfg.app_port = parse_port(key, value)?,
        "app_port_secure" => cfg.app_port_secure = parse_port(key, value)?,
        "udp_port" => cfg.udp_port = parse_port(key, value)?,
        "insecure_mode_enabled" => cfg.insecure_mode_enabled = parse_bool(key, value)?,
        "secure_mode_enabled" => cfg.secure_mode_enabled = parse_bool(key, value)?,
        "udp_server_enabled" => cfg.udp_server_enabled = parse_bool(key, value)?,
        "cut_sent_files" => cfg.cut_sent_files = parse_bool(key, value)?,
        "client_selects_display" => cfg.client_selects_display = parse_bool(key, value)?,
        "display" => cfg.display = parse_port(key, value)?,
        "max_text_length" => cfg.max_text_length = parse_size(key, value)?,
        "max_file_size" => cfg.max_file_size = parse_size(key, value)?,
        "max_file_count" => cfg.max_file_count = parse_size(key, value)?,
        "min_proto_version" => cfg.min_proto_version = parse_version(key, value)?,
        "max_proto_version" => cfg.max_proto_version = parse_version(key, value)?,
        "working_dir" => cfg.working_dir = Some(PathBuf::from(value)),
        "bind_address" => cfg.bind_addr = parse_addr(key, value)?,
        "bind_address_udp" => cfg.bind_addr_udp = parse_addr(key, value)?,
        "server_cert" => tls.cert_bundle = Some(PathBuf::from(value)),
        "ca_cert" => tls.ca_cert = Some(PathBuf::from(value)),
        "allowed_clients" => tls.allowed_clients = Some(PathBuf::from(value)),
        "method_get_text_enabled" => cfg.methods.get_text = parse_bool(key, value)?,
        "method_send_text_enabled" => cfg.methods.send_text = parse_bool(key, value)?,
        "method_get_files_enabled" => cfg.methods.get_files = parse_bool(key, value)?,
        "method_send_files_enabled" => cfg.methods.send_files = parse_bool(key, value)?,
        "method_get_image_enabled" => cfg.methods.get_image = parse_bool(key, value)?,
        "method_get_copied_image_enabled" => cfg.methods.get_copied_image = parse_bool(key, value)?,
        "method_get_screenshot_enabled" => cfg.methods.get_screenshot = parse_bool(key, value)?,
        "method_info_enabled" => cfg.methods.info = parse_bool(key, value)?,
        // Recognised keys whose features live outside this build: the web
        // surface, process self-restart and the tray icon.
        "web_port" | "web_mode_enabled" | "restart" | "tray_icon" => {
            debug!(key, "config key recognised but not supported in this build");
        }
        _ => {
            debug!(key, "ignoring unknown config key");
        }
    }
    Ok(())
}

/// Trim all characters in `\x01..=\x20` from both ends.
fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c != '\0' && c <= ' ')
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") || value == "1" {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Ok(false)
    } else {
        Err(ServerError::Config(format!("invalid boolean value for {key}: {value}")))
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .map_err(|_| ServerError::Config(format!("value for {key} not in range 0-65535: {value}")))
}

fn parse_version(key: &str, value: &str) -> Result<u8> {
    value
        .parse::<u8>()
        .map_err(|_| ServerError::Config(format!("invalid protocol version for {key}: {value}")))
}

fn parse_addr(key: &str, value: &str) -> Result<IpAddr> {
    value
        .parse::<IpAddr>()
        .map_err(|_| ServerError::Config(format!("invalid address for {key}: {value}")))
}

/// Parse a positive integer with an optional K/M/G/T suffix (base 1000).
fn parse_size(key: &str, value: &str) -> Result<i64> {
    let err = || ServerError::Config(format!("invalid value for {key}: {value}"));
    let digits_end = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let (digits, suffix) = value.split_at(digits_end);
    let base: i64 = digits.parse().map_err(|_| err())?;
    let multiplier: i64 = match suffix {
        "" => 1,
        "k" | "K" => 1_000,
        "m" | "M" => 1_000_000,
        "g" | "G" => 1_000_000_000,
        "t" | "T" => 1_000_000_000_000,
        _ => return Err(ServerError::Config(format!("invalid suffix for {key}: {value}"))),
    };
    let size = base.checked_mul(multiplier).ok_or_else(|| {
        ServerError::Config(format!("value for {key} too large: {value}"))
    })?;
    if size <= 0 {
        return Err(err());
    }
    Ok(size)
}
