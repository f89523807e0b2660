use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::proto::{PROTOCOL_MAX, PROTOCOL_MIN};

/// Name of the daemon's own configuration file. Inbound files are never
/// allowed to materialise under this name unless an explicit working
/// directory is configured.
pub const CONFIG_FILE_NAME: &str = "clipshare.conf";

pub(crate) const DEFAULT_APP_PORT: u16 = 4337;
pub(crate) const DEFAULT_APP_PORT_SECURE: u16 = 4338;
/// 4 MiB
pub(crate) const DEFAULT_MAX_TEXT_LENGTH: i64 = 4_194_304;
/// 64 GiB
pub(crate) const DEFAULT_MAX_FILE_SIZE: i64 = 68_719_476_736;
pub(crate) const DEFAULT_MAX_FILE_COUNT: i64 = 1024;

/// TLS material and the client allow-list for the secure listener.
///
/// `cert_bundle` is a PEM file holding the server certificate chain and its
/// private key; `ca_cert` is the trust anchor client certificates must chain
/// to. `allowed_clients` holds the certificate Common Names admitted to
/// transact; lookup is exact string match and an empty set admits nobody.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_bundle: PathBuf,
    pub ca_cert: PathBuf,
    pub allowed_clients: HashSet<String>,
}

/// Per-method enable flags. A disabled method answers
/// `METHOD_NOT_IMPLEMENTED` and closes.
#[derive(Debug, Clone)]
pub struct MethodConfig {
    pub get_text: bool,
    pub send_text: bool,
    pub get_files: bool,
    pub send_files: bool,
    pub get_image: bool,
    pub get_copied_image: bool,
    pub get_screenshot: bool,
    pub info: bool,
}

impl Default for MethodConfig {
    fn default() -> Self {
        Self {
            get_text: true,
            send_text: true,
            get_files: true,
            send_files: true,
            get_image: true,
            get_copied_image: true,
            get_screenshot: true,
            info: true,
        }
    }
}

/// Immutable daemon configuration.
///
/// Built once at startup with defaults already applied; sessions only ever
/// read it through an `Arc`.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_port: u16,
    pub app_port_secure: u16,
    pub udp_port: u16,
    pub insecure_mode_enabled: bool,
    pub secure_mode_enabled: bool,
    pub udp_server_enabled: bool,
    pub cut_sent_files: bool,
    pub client_selects_display: bool,
    pub methods: MethodConfig,
    pub max_text_length: i64,
    pub max_file_size: i64,
    pub max_file_count: i64,
    pub tls: Option<TlsConfig>,
    /// Explicitly configured working directory. `None` means the daemon runs
    /// in whatever directory it was started from.
    pub working_dir: Option<PathBuf>,
    pub bind_addr: IpAddr,
    pub bind_addr_udp: IpAddr,
    pub min_proto_version: u8,
    pub max_proto_version: u8,
    /// Display captured by screenshot methods when the client does not (or
    /// may not) pick one.
    pub display: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_port: DEFAULT_APP_PORT,
            app_port_secure: DEFAULT_APP_PORT_SECURE,
            udp_port: DEFAULT_APP_PORT,
            insecure_mode_enabled: true,
            secure_mode_enabled: false,
            udp_server_enabled: true,
            cut_sent_files: false,
            client_selects_display: false,
            methods: MethodConfig::default(),
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            tls: None,
            working_dir: None,
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            bind_addr_udp: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            min_proto_version: PROTOCOL_MIN,
            max_proto_version: PROTOCOL_MAX,
            display: 1,
        }
    }
}

impl Config {
    /// Clamp the configured protocol range into the compile-time
    /// `[PROTOCOL_MIN, PROTOCOL_MAX]` window.
    pub(crate) fn clamp_proto_versions(&mut self) {
        self.min_proto_version = self.min_proto_version.clamp(PROTOCOL_MIN, PROTOCOL_MAX);
        if self.max_proto_version < self.min_proto_version
            || self.max_proto_version > PROTOCOL_MAX
        {
            self.max_proto_version = PROTOCOL_MAX;
        }
    }
}
