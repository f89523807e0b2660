//! UDP discovery responder.

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::proto::INFO_NAME;

/// The exact probe a scanning client sends.
const PROBE: &[u8] = b"in";

/// Answer every `"in"` probe with the info name. Any other payload is
/// ignored. Runs until the socket fails permanently or the task is dropped.
pub(crate) async fn run_discovery(socket: UdpSocket) {
    if let Ok(addr) = socket.local_addr() {
        info!(%addr, "udp discovery responder started");
    }
    let mut buf = [0u8; 4];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!(error = %e, "udp receive failed");
                continue;
            }
        };
        if &buf[..len] != PROBE {
            continue;
        }
        debug!(%peer, "discovery probe");
        if let Err(e) = socket.send_to(INFO_NAME.as_bytes(), peer).await {
            warn!(%peer, error = %e, "discovery reply failed");
        }
    }
}
