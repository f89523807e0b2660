use thiserror::Error;

/// Errors that can occur while starting or running the daemon
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    #[error("No private key found in certificate bundle")]
    NoPrivateKey,

    #[error("No certificate found in certificate bundle")]
    NoCertificate,
}

pub type Result<T> = std::result::Result<T, ServerError>;
