//! Plain framed TCP + raw UDP transport (spec §4.1), replacing the
//! encrypted session-handshake channel this module held before: the
//! `{type,size}` header from `rtype_protocol::codec` carries everything our
//! wire format needs.

pub mod buffer;
pub mod connection;
pub mod outbound;
pub mod server;
pub mod udp;
