//! Listener setup and connection dispatch.

mod discovery;
mod sessions;

pub use sessions::{SessionCount, SessionGuard, SessionSnapshot, MAX_SESSIONS};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, UdpSocket};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::clipboard::{Clipboard, ImageProvider};
use crate::config::{validate_config, Config};
use crate::error::{Result, ServerError};
use crate::net::{bind_discovery, bind_tcp, CloseMode, PeerStream};
use crate::proto::{serve_session, SessionContext, SessionError};
use crate::tls::{admit, build_tls_acceptor};

/// The daemon with its entry points bound but not yet serving.
///
/// Binding and serving are split so a caller (or a test) can bind port 0 and
/// read the actual addresses back before the accept loops start.
pub struct Server {
    ctx: Arc<SessionContext>,
    counts: Arc<SessionCount>,
    plain: Option<TcpListener>,
    secure: Option<(TcpListener, TlsAcceptor)>,
    discovery: Option<UdpSocket>,
}

impl Server {
    /// Validate the configuration and bind every enabled entry point.
    pub fn bind(
        config: Arc<Config>,
        clipboard: Arc<dyn Clipboard>,
        images: Arc<dyn ImageProvider>,
    ) -> Result<Self> {
        validate_config(&config)?;

        let workdir = match &config.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        let explicit_workdir = config.working_dir.is_some();

        let plain = if config.insecure_mode_enabled {
            Some(bind_tcp(config.bind_addr, config.app_port)?)
        } else {
            None
        };

        let secure = if config.secure_mode_enabled {
            let tls = config
                .tls
                .as_ref()
                .ok_or_else(|| ServerError::Config("secure mode requires TLS material".into()))?;
            let acceptor = build_tls_acceptor(tls)?;
            Some((bind_tcp(config.bind_addr, config.app_port_secure)?, acceptor))
        } else {
            None
        };

        let discovery = if config.udp_server_enabled {
            let socket = bind_discovery(config.bind_addr_udp, config.udp_port)?;
            socket.set_nonblocking(true).map_err(ServerError::Bind)?;
            Some(UdpSocket::from_std(socket).map_err(ServerError::Bind)?)
        } else {
            None
        };

        let ctx = Arc::new(SessionContext {
            config,
            clipboard,
            images,
            workdir,
            explicit_workdir,
        });
        Ok(Self { ctx, counts: Arc::new(SessionCount::default()), plain, secure, discovery })
    }

    pub fn plain_addr(&self) -> Option<SocketAddr> {
        self.plain.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn secure_addr(&self) -> Option<SocketAddr> {
        self.secure.as_ref().and_then(|(l, _)| l.local_addr().ok())
    }

    pub fn discovery_addr(&self) -> Option<SocketAddr> {
        self.discovery.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn session_counts(&self) -> Arc<SessionCount> {
        Arc::clone(&self.counts)
    }

    /// Run every bound entry point until one of them fails.
    pub async fn run(self) -> Result<()> {
        let mut tasks: JoinSet<()> = JoinSet::new();

        if let Some(listener) = self.plain {
            let ctx = Arc::clone(&self.ctx);
            let counts = Arc::clone(&self.counts);
            tasks.spawn(dispatch_loop(listener, None, ctx, counts));
        }
        if let Some((listener, acceptor)) = self.secure {
            let ctx = Arc::clone(&self.ctx);
            let counts = Arc::clone(&self.counts);
            tasks.spawn(dispatch_loop(listener, Some(acceptor), ctx, counts));
        }
        if let Some(socket) = self.discovery {
            tasks.spawn(discovery::run_discovery(socket));
        }

        while let Some(joined) = tasks.join_next().await {
            joined.map_err(|e| ServerError::Io(std::io::Error::other(e)))?;
        }
        Ok(())
    }
}

/// Accept loop for one TCP entry point. Each admitted connection runs in an
/// isolated worker task; the only state shared across workers is the
/// read-only context and the session counter.
async fn dispatch_loop(
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
    ctx: Arc<SessionContext>,
    counts: Arc<SessionCount>,
) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                continue;
            }
        };
        let Some(guard) = counts.try_admit() else {
            // dropping the socket closes it without touching the session
            warn!(%addr, max = MAX_SESSIONS, "session limit reached, dropping");
            continue;
        };
        let snapshot = counts.snapshot();
        info!(%addr, current = snapshot.current, total = snapshot.total, "accepted connection");

        let ctx = Arc::clone(&ctx);
        let counts = Arc::clone(&counts);
        let acceptor = acceptor.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let mut peer = match acceptor {
                Some(acceptor) => {
                    let Some(tls) = ctx.config.tls.as_ref() else {
                        return;
                    };
                    match admit(&acceptor, stream, &tls.allowed_clients).await {
                        Ok(stream) => PeerStream::tls(stream),
                        Err(e) => {
                            warn!(%addr, error = %e, "tls admission failed");
                            counts.increment_errors();
                            return;
                        }
                    }
                }
                None => PeerStream::plain(stream),
            };

            match serve_session(&mut peer, &ctx).await {
                Ok(()) => {
                    peer.close(CloseMode::WaitPeerEof).await;
                    debug!(%addr, "session complete");
                }
                Err(SessionError::Stream(e)) => {
                    peer.close(CloseMode::ImmediateNoShutdown).await;
                    counts.increment_errors();
                    debug!(%addr, error = %e, "session ended on a stream error");
                }
                Err(e) => {
                    peer.close(CloseMode::Immediate).await;
                    counts.increment_errors();
                    debug!(%addr, error = %e, "session rejected");
                }
            }
        });
    }
}
