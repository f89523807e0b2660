//! rustls server setup for the secure listener.

use std::path::Path;
use std::sync::Arc;

use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls::server::WebPkiClientVerifier;
use tokio_rustls::rustls::{RootCertStore, ServerConfig};
use tokio_rustls::TlsAcceptor;

use crate::config::TlsConfig;
use crate::error::{Result, ServerError};

/// Certificate files larger than this are rejected.
const MAX_CERT_FILE_SIZE: u64 = 65536;

/// Build a TLS acceptor from the configured material.
///
/// The bundle file supplies the server certificate chain and its private key;
/// the CA file supplies the trust anchor client certificates must chain to.
/// A peer certificate is mandatory for every handshake.
pub fn build_tls_acceptor(cfg: &TlsConfig) -> Result<TlsAcceptor> {
    let bundle = read_capped(&cfg.cert_bundle, "certificate bundle")?;
    let certs = CertificateDer::pem_slice_iter(&bundle)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Tls(format!("Failed to parse certificate bundle: {e}")))?;
    if certs.is_empty() {
        return Err(ServerError::NoCertificate);
    }
    let Some(key) = PrivateKeyDer::pem_slice_iter(&bundle)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Tls(format!("Failed to parse private key: {e}")))?
        .pop()
    else {
        return Err(ServerError::NoPrivateKey);
    };

    let ca_bytes = read_capped(&cfg.ca_cert, "CA certificate")?;
    let mut roots = RootCertStore::empty();
    for ca in CertificateDer::pem_slice_iter(&ca_bytes) {
        let ca = ca.map_err(|e| ServerError::Tls(format!("Failed to parse CA certificate: {e}")))?;
        roots
            .add(ca)
            .map_err(|e| ServerError::Tls(format!("Failed to add CA certificate: {e}")))?;
    }

    let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| ServerError::Tls(format!("Failed to build client verifier: {e}")))?;

    let server = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Tls(format!("Failed to build TLS config: {e}")))?;

    Ok(TlsAcceptor::from(Arc::new(server)))
}

fn read_capped(path: &Path, what: &str) -> Result<Vec<u8>> {
    let meta = std::fs::metadata(path)
        .map_err(|e| ServerError::Tls(format!("Failed to read {what}: {e}")))?;
    if meta.len() == 0 || meta.len() > MAX_CERT_FILE_SIZE {
        return Err(ServerError::Tls(format!(
            "Invalid {what} file size: {} bytes",
            meta.len()
        )));
    }
    std::fs::read(path).map_err(|e| ServerError::Tls(format!("Failed to read {what}: {e}")))
}
