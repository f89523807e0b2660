#![forbid(unsafe_code)]

pub mod clipboard;
pub mod config;
pub mod error;
pub mod fsutil;
pub mod logging;
pub mod net;
pub mod proto;
pub mod server;
pub mod tls;

pub use clipboard::{Clipboard, ImageMode, ImageProvider, MemoryClipboard, NoopImageProvider};
pub use config::{load_from_path, Config, TlsConfig};
pub use error::{Result, ServerError};
pub use proto::{INFO_NAME, PROTOCOL_MAX, PROTOCOL_MIN};
pub use server::Server;
pub use tls::build_tls_acceptor;
