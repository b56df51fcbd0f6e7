//! Transport layer (spec §4.1): a single-threaded `mio` reactor serving both
//! the TCP connection set and the shared UDP socket.

pub mod net;

pub use net::connection::{Connection, ConnectionId};
pub use net::outbound::{OutCommand, OutboundQueue};
pub use net::server::{IoEvent, Server};
pub use net::udp::UdpEndpoint;
