//! A single TCP client connection (spec §4.1): framed read/write over a
//! non-blocking `mio::net::TcpStream`, grounded in `neutronium::net::channel`'s
//! buffer-driven ingress/egress loop but stripped of its handshake/encryption
//! machinery — our wire format has no session key exchange, just the plain
//! `{type,size}` header from [`rtype_protocol::codec`].

use std::io::{self, Read, Write};
use std::net::SocketAddr;

use mio::net::TcpStream;
use rtype_common::{ErrorType, NetworkError, NetworkResult};
use rtype_protocol::codec::{Header, Packet, HEADER_SIZE, TCP_MAX_BODY};

use crate::net::buffer::Buffer;

const BUFFER_SIZE: usize = 65536;

/// Where a connection's read side is sitting in the frame: either
/// accumulating the 8-byte header or the body it declared.
enum ReadState {
    Header,
    Body(Header),
}

/// Opaque connection identifier, assigned by [`crate::server::Server`] in
/// accept order. Never reused while the process is alive — spec §4.1 doesn't
/// require id reuse and reuse would race with in-flight events that still
/// name the old id.
pub type ConnectionId = u32;

/// One accepted TCP client. Owns its socket and the buffers backing the
/// header/body read state machine and the outbound write queue.
pub struct Connection {
    pub id: ConnectionId,
    pub peer_addr: SocketAddr,
    stream: TcpStream,
    inbox: Buffer,
    outbox: Buffer,
    read_state: ReadState,
}

impl Connection {
    pub fn new(id: ConnectionId, stream: TcpStream) -> io::Result<Connection> {
        let peer_addr = stream.peer_addr()?;
        Ok(Connection {
            id,
            peer_addr,
            stream,
            inbox: Buffer::new(BUFFER_SIZE),
            outbox: Buffer::new(BUFFER_SIZE),
            read_state: ReadState::Header,
        })
    }

    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// Queues `packet` for sending; actual socket writes happen on the next
    /// writable-readiness event via [`flush_writes`](Self::flush_writes).
    pub fn enqueue(&mut self, packet: &Packet) {
        let bytes = packet.to_bytes();
        let mut cursor: &[u8] = &bytes;
        // `ingress` returns once the reader goes dry (the common case here) or
        // once the outbox hits its nominal size ("Buffer overrun"); a full
        // outbox means the peer isn't draining fast enough and the packet is
        // dropped rather than growing the queue unboundedly.
        let _ = self.outbox.ingress(&mut cursor);
    }

    /// Drains as much of the outbound buffer to the socket as it will take.
    /// Returns `Ok(())` on a would-block (nothing wrong, just backpressure)
    /// or a real write, `Err` only on a fatal socket error.
    pub fn flush_writes(&mut self) -> NetworkResult<()> {
        match self.outbox.egress(&mut self.stream) {
            Ok(_) => Ok(()),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads whatever is available off the socket into the inbound buffer
    /// and pulls every complete frame out of it. Never blocks: a partial
    /// frame is left in the buffer for the next readiness event.
    pub fn read_packets(&mut self) -> NetworkResult<Vec<Packet>> {
        match self.inbox.ingress(&mut self.stream) {
            Ok(_) => {}
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e.into()),
        }

        let mut packets = Vec::new();
        loop {
            match self.try_extract_one()? {
                Some(packet) => packets.push(packet),
                None => break,
            }
        }
        Ok(packets)
    }

    fn try_extract_one(&mut self) -> NetworkResult<Option<Packet>> {
        loop {
            match self.read_state {
                ReadState::Header => {
                    let data = self.inbox.read_slice();
                    if data.len() < HEADER_SIZE {
                        return Ok(None);
                    }
                    let header = Header::decode(data)?;
                    if header.size as usize > TCP_MAX_BODY {
                        return Err(NetworkError::Fatal(ErrorType::PayloadTooLarge));
                    }
                    self.inbox.move_head(HEADER_SIZE);
                    self.read_state = ReadState::Body(header);
                }
                ReadState::Body(header) => {
                    let data = self.inbox.read_slice();
                    if data.len() < header.size as usize {
                        return Ok(None);
                    }
                    let body = data[..header.size as usize].to_vec();
                    self.inbox.move_head(header.size as usize);
                    self.read_state = ReadState::Header;
                    return Ok(Some(Packet { header, body }));
                }
            }
        }
    }

    pub fn shutdown(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}
