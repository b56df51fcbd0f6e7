//! The packet codec (spec §4.3, §6).
//!
//! The original wire format is defined in terms of `memcpy`'ing
//! `#[repr(C, packed)]` PODs straight into the body. Reading or writing
//! through a packed-struct reference in Rust is unaligned-access UB for
//! anything wider than a byte, so instead every payload explicitly encodes
//! its fields through `byteorder` — same little-endian, fixed-width byte
//! layout on the wire, but no unsafe transmutes on either end.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rtype_common::{ErrorType, NetworkError, NetworkResult};
use std::convert::TryFrom;
use std::io::Cursor;

use crate::packet_type::PacketType;

pub const HEADER_SIZE: usize = 8;
pub const TCP_MAX_BODY: usize = 1024 * 1024;
pub const UDP_MAX_BODY: usize = 1472;

/// `{ type: u32 LE, size: u32 LE }` (spec §3.1/§6).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Header {
    pub packet_type: u32,
    pub size: u32,
}

impl Header {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.packet_type).expect("Vec writes never fail");
        out.write_u32::<LittleEndian>(self.size).expect("Vec writes never fail");
    }

    pub fn decode(data: &[u8]) -> NetworkResult<Header> {
        if data.len() < HEADER_SIZE {
            return Err(NetworkError::Wait);
        }
        let mut cursor = Cursor::new(data);
        let packet_type = cursor.read_u32::<LittleEndian>()?;
        let size = cursor.read_u32::<LittleEndian>()?;
        Ok(Header { packet_type, size })
    }
}

/// A fully framed packet: header plus opaque body bytes, ready to write to a
/// socket or just received off one.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub body: Vec<u8>,
}

impl Packet {
    pub fn kind(&self) -> NetworkResult<PacketType> {
        PacketType::try_from(self.header.packet_type)
    }

    /// Serializes header + body into a single contiguous buffer for sending.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.body.len());
        self.header.encode(&mut out);
        out.extend_from_slice(&self.body);
        out
    }

    /// Decodes a whole header+body framed packet from one contiguous buffer.
    /// Unlike [`crate::codec`]'s TCP-side `Connection` reassembly, a UDP
    /// datagram always carries exactly one complete packet, so there is no
    /// partial-read state machine to drive here.
    pub fn from_datagram(data: &[u8]) -> NetworkResult<Packet> {
        let header = Header::decode(data)?;
        let body_start = HEADER_SIZE;
        let body_end = body_start + header.size as usize;
        if data.len() < body_end {
            return Err(NetworkError::Fatal(ErrorType::Decoding));
        }
        Ok(Packet { header, body: data[body_start..body_end].to_vec() })
    }
}

/// Trait implemented by every typed payload in [`crate::payload`] — the
/// Rust-idiomatic stand-in for "trivially copyable POD" (spec §3.2).
pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>);
}

pub trait Decode: Sized {
    fn decode(data: &[u8]) -> NetworkResult<Self>;
}

/// `create_packet(type, &data)` (spec §4.3): encodes a single payload into a
/// framed packet.
pub fn create_packet<T: Encode>(kind: PacketType, payload: &T) -> Packet {
    let mut body = Vec::new();
    payload.encode(&mut body);
    Packet {
        header: Header { packet_type: kind.as_u32(), size: body.len() as u32 },
        body,
    }
}

/// Array overload: encodes `items` back-to-back into one packet body.
pub fn create_packet_array<T: Encode>(kind: PacketType, items: &[T]) -> Packet {
    let mut body = Vec::new();
    for item in items {
        item.encode(&mut body);
    }
    Packet {
        header: Header { packet_type: kind.as_u32(), size: body.len() as u32 },
        body,
    }
}

/// `extract<T>` (spec §4.3): decodes exactly one `T` from `body`, failing if
/// the body isn't exactly the payload's encoded size.
pub fn extract<T: Decode + FixedSize>(body: &[u8]) -> NetworkResult<T> {
    if body.len() != T::SIZE {
        return Err(NetworkError::Fatal(ErrorType::Decoding));
    }
    T::decode(body)
}

/// `extract_array<T>` (spec §4.3): decodes as many `T`s as evenly fit in
/// `body`, failing if the body length isn't a multiple of the payload size.
pub fn extract_array<T: Decode + FixedSize>(body: &[u8]) -> NetworkResult<Vec<T>> {
    if T::SIZE == 0 || body.len() % T::SIZE != 0 {
        return Err(NetworkError::Fatal(ErrorType::Decoding));
    }
    let mut items = Vec::with_capacity(body.len() / T::SIZE);
    for chunk in body.chunks_exact(T::SIZE) {
        items.push(T::decode(chunk)?);
    }
    Ok(items)
}

/// Payloads with a statically known encoded size implement this so
/// [`extract`]/[`extract_array`] can validate body length before decoding.
pub trait FixedSize {
    const SIZE: usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header { packet_type: 7, size: 42 };
        let mut bytes = Vec::new();
        header.encode(&mut bytes);
        assert_eq!(Header::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn short_header_waits_instead_of_failing() {
        assert_eq!(Header::decode(&[1, 2, 3]), Err(NetworkError::Wait));
    }
}
