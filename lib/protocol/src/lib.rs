//! The wire protocol: packet types, typed payloads and the codec that
//! frames/unframes them (spec §3.1–3.2, §4.3, §6).

pub mod codec;
pub mod packet_type;
pub mod payload;
pub mod strings;

pub use codec::{create_packet, create_packet_array, extract, extract_array, Decode, Encode, FixedSize, Header, Packet, HEADER_SIZE, TCP_MAX_BODY, UDP_MAX_BODY};
pub use packet_type::{PacketType, MAX_PACKET_TYPES};
