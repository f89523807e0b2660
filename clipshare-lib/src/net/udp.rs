//! UDP discovery socket factory.
//!
//! IPv6 sockets join the discovery multicast group on every interface whose
//! address matches the configured bind address (or all of them for the
//! unspecified address) and bind the multicast address itself, so probes sent
//! to the group are received regardless of which interface they arrive on.
//! IPv4 sockets bind ANY directly, or the derived broadcast address of the
//! matching interface when an explicit address is configured.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, warn};

use crate::error::{Result, ServerError};

/// Site-local discovery group.
pub const MULTICAST_GROUP: Ipv6Addr = Ipv6Addr::new(0xff05, 0, 0, 0, 0, 0, 0, 0x4567);

/// Create and bind the discovery socket for the configured address family.
pub fn bind_discovery(addr: IpAddr, port: u16) -> Result<std::net::UdpSocket> {
    match addr {
        IpAddr::V4(v4) => bind_v4(v4, port),
        IpAddr::V6(v6) => bind_v6(v6, port),
    }
}

fn new_udp_socket(domain: Domain) -> Result<Socket> {
    Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(ServerError::Bind)
}

fn bind_to(socket: Socket, addr: SocketAddr) -> Result<std::net::UdpSocket> {
    socket.bind(&addr.into()).map_err(ServerError::Bind)?;
    debug!(%addr, "udp socket bound");
    Ok(socket.into())
}

fn bind_v4(addr: Ipv4Addr, port: u16) -> Result<std::net::UdpSocket> {
    let socket = new_udp_socket(Domain::IPV4)?;
    if addr.is_unspecified() {
        return bind_to(socket, SocketAddr::new(IpAddr::V4(addr), port));
    }
    // An explicit address binds the broadcast address derived from the
    // interface carrying it, so subnet-wide probes are still received.
    for iface in if_addrs::get_if_addrs().map_err(ServerError::Bind)? {
        let if_addrs::IfAddr::V4(v4) = &iface.addr else { continue };
        if v4.ip != addr {
            continue;
        }
        let broadcast = v4
            .broadcast
            .unwrap_or_else(|| Ipv4Addr::from(u32::from(v4.ip) | !u32::from(v4.netmask)));
        return bind_to(socket, SocketAddr::new(IpAddr::V4(broadcast), port));
    }
    Err(ServerError::Config(format!("no interface has the UDP bind address {addr}")))
}

fn bind_v6(addr: Ipv6Addr, port: u16) -> Result<std::net::UdpSocket> {
    let socket = new_udp_socket(Domain::IPV6)?;
    join_group_on_interfaces(&socket, addr);
    // Some platforms cannot bind the multicast address itself; there the
    // socket binds the configured address instead.
    let bind_ip = if cfg!(any(windows, target_os = "macos")) { addr } else { MULTICAST_GROUP };
    bind_to(socket, SocketAddr::new(IpAddr::V6(bind_ip), port))
}

/// Join the discovery group on each interface whose address matches `addr`
/// (every IPv6-capable interface when `addr` is unspecified). Joins are
/// idempotent per interface index; failures on individual interfaces are
/// non-fatal.
fn join_group_on_interfaces(socket: &Socket, addr: Ipv6Addr) {
    let any = addr.is_unspecified();
    let mut joined: HashSet<u32> = HashSet::new();
    let interfaces = match if_addrs::get_if_addrs() {
        Ok(ifaces) => ifaces,
        Err(e) => {
            warn!(error = %e, "interface enumeration failed, joining on default interface");
            vec![]
        }
    };
    for iface in interfaces {
        let if_addrs::IfAddr::V6(v6) = &iface.addr else { continue };
        if !any && v6.ip != addr {
            continue;
        }
        let Some(index) = iface.index else { continue };
        if !joined.insert(index) {
            continue;
        }
        match socket.join_multicast_v6(&MULTICAST_GROUP, index) {
            Ok(()) => debug!(interface = %iface.name, index, "joined discovery multicast group"),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                // already a member on this interface
            }
            Err(e) => {
                warn!(interface = %iface.name, index, error = %e, "multicast join failed");
            }
        }
    }
    if joined.is_empty() {
        // no matching interface: let the kernel pick one
        if let Err(e) = socket.join_multicast_v6(&MULTICAST_GROUP, 0) {
            warn!(error = %e, "default multicast join failed");
        }
    }
}
