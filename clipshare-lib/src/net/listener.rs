//! TCP listener factory.

use std::net::{IpAddr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{Result, ServerError};

const LISTEN_BACKLOG: i32 = 64;

/// Bind a TCP listener on `addr:port` with `SO_REUSEADDR` set. The listener's
/// address family is taken from the configured bind address.
pub fn bind_tcp(addr: IpAddr, port: u16) -> Result<TcpListener> {
    let domain = match addr {
        IpAddr::V4(_) => Domain::IPV4,
        IpAddr::V6(_) => Domain::IPV6,
    };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(ServerError::Bind)?;
    socket.set_reuse_address(true).map_err(ServerError::Bind)?;
    let sock_addr = SocketAddr::new(addr, port);
    socket.bind(&sock_addr.into()).map_err(ServerError::Bind)?;
    socket.listen(LISTEN_BACKLOG).map_err(ServerError::Bind)?;
    socket.set_nonblocking(true).map_err(ServerError::Bind)?;
    let listener = TcpListener::from_std(socket.into()).map_err(ServerError::Bind)?;
    info!(addr = %sock_addr, "tcp listener bound");
    Ok(listener)
}
