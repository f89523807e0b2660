pub mod acceptor;
pub mod admission;

pub use acceptor::build_tls_acceptor;
pub use admission::{admit, peer_common_name, AdmissionError};
