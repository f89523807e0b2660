//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use clipshare_lib::{
    Config, ImageMode, ImageProvider, MemoryClipboard, Server, TlsConfig,
};
use rcgen::{BasicConstraints, CertificateParams, DnType, Issuer, IsCa, KeyPair};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

pub const STATUS_OK: u8 = 1;
pub const STATUS_NO_DATA: u8 = 2;

/// A configuration bound to loopback with ephemeral ports, landing inbound
/// files in `workdir`.
pub fn test_config(workdir: &Path) -> Config {
    Config {
        app_port: 0,
        app_port_secure: 0,
        udp_port: 0,
        udp_server_enabled: false,
        bind_addr: "127.0.0.1".parse().expect("loopback"),
        bind_addr_udp: "127.0.0.1".parse().expect("loopback"),
        working_dir: Some(workdir.to_path_buf()),
        ..Config::default()
    }
}

pub struct TestServer {
    pub plain: SocketAddr,
    pub secure: Option<SocketAddr>,
    pub udp: Option<SocketAddr>,
    pub clipboard: Arc<MemoryClipboard>,
    pub counts: Arc<clipshare_lib::server::SessionCount>,
}

/// Bind and spawn a server over the given configuration.
pub fn start_server(config: Config, clipboard: Arc<MemoryClipboard>) -> TestServer {
    start_server_with_images(config, clipboard, Arc::new(NoImages))
}

pub fn start_server_with_images(
    config: Config,
    clipboard: Arc<MemoryClipboard>,
    images: Arc<dyn ImageProvider>,
) -> TestServer {
    let server =
        Server::bind(Arc::new(config), clipboard.clone(), images).expect("bind server");
    let plain = server.plain_addr().expect("plain listener");
    let secure = server.secure_addr();
    let udp = server.discovery_addr();
    let counts = server.session_counts();
    tokio::spawn(server.run());
    TestServer { plain, secure, udp, clipboard, counts }
}

/// Propose `version` and return the negotiation status byte.
pub async fn negotiate<S>(stream: &mut S, version: u8) -> u8
where
    S: AsyncReadExt + AsyncWriteExt + Unpin,
{
    stream.write_u8(version).await.expect("send version");
    stream.read_u8().await.expect("read negotiation status")
}

pub async fn write_i64<S: AsyncWriteExt + Unpin>(stream: &mut S, value: i64) {
    stream.write_all(&value.to_be_bytes()).await.expect("write size frame");
}

pub async fn read_i64<S: AsyncReadExt + Unpin>(stream: &mut S) -> i64 {
    let mut buf = [0u8; 8];
    stream.read_exact(&mut buf).await.expect("read size frame");
    i64::from_be_bytes(buf)
}

pub async fn read_bytes<S: AsyncReadExt + Unpin>(stream: &mut S, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await.expect("read payload");
    buf
}

/// Give the server worker a moment to finish post-close work (clipboard
/// publication happens after the socket is torn down).
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
}

/// Asserts the server ends the session here: either a clean FIN or a reset
/// (the server closes rejected sessions without draining unread bytes).
pub async fn expect_eof<S: AsyncReadExt + Unpin>(stream: &mut S) {
    let mut buf = [0u8; 1];
    match stream.read(&mut buf).await {
        Ok(0) | Err(_) => {}
        Ok(_) => panic!("expected close, got byte {:#04x}", buf[0]),
    }
}

/// Image provider that never has data.
pub struct NoImages;

impl ImageProvider for NoImages {
    fn capture(&self, _mode: ImageMode, _display: u16) -> io::Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// Image provider returning a fixed byte blob, recording the requested mode
/// and display.
pub struct StaticImage {
    pub bytes: Vec<u8>,
    pub calls: Mutex<Vec<(ImageMode, u16)>>,
}

impl StaticImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, calls: Mutex::new(Vec::new()) }
    }
}

impl ImageProvider for StaticImage {
    fn capture(&self, mode: ImageMode, display: u16) -> io::Result<Option<Vec<u8>>> {
        self.calls.lock().expect("calls").push((mode, display));
        Ok(Some(self.bytes.clone()))
    }
}

/// A client identity issued by the test CA.
pub struct ClientIdentity {
    pub cn: String,
    pub cert: CertificateDer<'static>,
    pub key: PrivateKeyDer<'static>,
}

/// Test PKI: one CA, a server certificate for `localhost` (bundle written
/// under `dir`) and a client certificate per requested Common Name.
pub struct TestPki {
    pub tls_config: TlsConfig,
    pub ca_der: CertificateDer<'static>,
    pub clients: Vec<ClientIdentity>,
}

impl TestPki {
    pub fn client(&self, cn: &str) -> &ClientIdentity {
        self.clients.iter().find(|c| c.cn == cn).expect("unknown test client")
    }
}

pub fn make_pki(dir: &Path, client_cns: &[&str], allowed: &[&str]) -> TestPki {
    let ca_key = KeyPair::generate().expect("ca key");
    let mut ca_params = CertificateParams::new(vec![]).expect("ca params");
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.distinguished_name.push(DnType::CommonName, "clipshare test CA");
    let ca_cert = ca_params.self_signed(&ca_key).expect("ca cert");
    let ca_pem = ca_cert.pem();
    let ca_der = ca_cert.der().clone();
    let issuer = Issuer::new(ca_params, ca_key);

    let server_key = KeyPair::generate().expect("server key");
    let mut server_params =
        CertificateParams::new(vec!["localhost".to_owned()]).expect("server params");
    server_params.distinguished_name.push(DnType::CommonName, "clipshare test server");
    let server_cert = server_params.signed_by(&server_key, &issuer).expect("server cert");

    let clients = client_cns
        .iter()
        .map(|cn| {
            let key = KeyPair::generate().expect("client key");
            let mut params = CertificateParams::new(vec![]).expect("client params");
            params.distinguished_name.push(DnType::CommonName, *cn);
            let cert = params.signed_by(&key, &issuer).expect("client cert");
            ClientIdentity {
                cn: (*cn).to_owned(),
                cert: cert.der().clone(),
                key: PrivateKeyDer::from_pem_slice(key.serialize_pem().as_bytes())
                    .expect("client key der"),
            }
        })
        .collect();

    let bundle_path = dir.join("server.pem");
    let ca_path = dir.join("ca.pem");
    std::fs::write(&bundle_path, format!("{}{}", server_cert.pem(), server_key.serialize_pem()))
        .expect("write bundle");
    std::fs::write(&ca_path, &ca_pem).expect("write ca");

    TestPki {
        tls_config: TlsConfig {
            cert_bundle: bundle_path,
            ca_cert: ca_path,
            allowed_clients: allowed.iter().map(|s| (*s).to_owned()).collect(),
        },
        ca_der,
        clients,
    }
}

/// Open a mutually-authenticated TLS connection to `addr` as `client`.
pub async fn connect_tls(
    addr: SocketAddr,
    pki: &TestPki,
    client: &ClientIdentity,
) -> io::Result<TlsStream<TcpStream>> {
    let mut roots = RootCertStore::empty();
    roots.add(pki.ca_der.clone()).expect("trust ca");
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(vec![client.cert.clone()], client.key.clone_key())
        .expect("client config");
    let connector = TlsConnector::from(Arc::new(config));
    let tcp = TcpStream::connect(addr).await?;
    let name = ServerName::try_from("localhost").expect("server name");
    connector.connect(name, tcp).await
}
