pub mod listener;
pub mod stream;
pub mod udp;

pub use listener::bind_tcp;
pub use stream::{CloseMode, PeerStream, StreamError};
pub use udp::{bind_discovery, MULTICAST_GROUP};
