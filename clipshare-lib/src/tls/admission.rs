//! TLS handshake and allow-list admission.
//!
//! After `accept`, the worker completes the handshake, pulls the Common Name
//! out of the peer's certificate and compares it for exact equality against
//! the allow-list. A miss closes the socket before any protocol byte flows.

use std::collections::HashSet;
use std::time::Duration;

use rustls_pki_types::CertificateDer;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tracing::debug;
use x509_parser::prelude::*;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("TLS handshake failed: {0}")]
    Handshake(std::io::Error),

    #[error("TLS handshake timed out")]
    Timeout,

    #[error("peer presented no certificate")]
    NoCertificate,

    #[error("peer certificate parse error: {0}")]
    BadCertificate(String),

    #[error("peer certificate carries no common name")]
    NoCommonName,

    #[error("client {0:?} is not in the allow-list")]
    NotAllowed(String),
}

/// Perform the handshake on an accepted socket and admit the peer if its
/// certificate CN is allow-listed. An empty allow-list admits nobody.
pub async fn admit(
    acceptor: &TlsAcceptor,
    stream: TcpStream,
    allowed_clients: &HashSet<String>,
) -> Result<TlsStream<TcpStream>, AdmissionError> {
    let tls = timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream))
        .await
        .map_err(|_| AdmissionError::Timeout)?
        .map_err(AdmissionError::Handshake)?;

    let cn = {
        let (_, conn) = tls.get_ref();
        let certs = conn.peer_certificates().ok_or(AdmissionError::NoCertificate)?;
        let cert = certs.first().ok_or(AdmissionError::NoCertificate)?;
        peer_common_name(cert)?
    };

    if !allowed_clients.contains(&cn) {
        return Err(AdmissionError::NotAllowed(cn));
    }
    debug!(client = %cn, "client verified");
    Ok(tls)
}

/// Extract the subject Common Name from a DER certificate.
pub fn peer_common_name(cert: &CertificateDer<'_>) -> Result<String, AdmissionError> {
    let (_, parsed) = X509Certificate::from_der(cert.as_ref())
        .map_err(|e| AdmissionError::BadCertificate(e.to_string()))?;
    let cn = parsed
        .subject()
        .iter_common_name()
        .next()
        .ok_or(AdmissionError::NoCommonName)?;
    let cn = cn
        .as_str()
        .map_err(|e| AdmissionError::BadCertificate(e.to_string()))?;
    Ok(cn.to_owned())
}
