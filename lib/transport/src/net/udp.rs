//! The UDP side of the transport (spec §4.1, §9): one `mio::net::UdpSocket`
//! shared by every connected player, datagrams capped at
//! [`rtype_protocol::codec::UDP_MAX_BODY`].
//!
//! UDP carries no inherent connection identity, so a [`ConnectionId`] is
//! bound to a [`SocketAddr`] the first time a datagram arrives from a peer
//! that sent a `RegisterUdp` over TCP (spec §9 open question, decision in
//! `SPEC_FULL.md`: the binding key is the peer's IP, since a client's UDP
//! source port is not known ahead of time and the TCP/UDP connections from
//! one client share a network path).

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};

use mio::net::UdpSocket;
use rtype_common::NetworkResult;
use rtype_protocol::codec::UDP_MAX_BODY;

use crate::net::connection::ConnectionId;

pub struct UdpEndpoint {
    socket: UdpSocket,
    /// Connections that announced `RegisterUdp` over TCP and are waiting for
    /// their first datagram to arrive so their address can be bound.
    pending: HashMap<IpAddr, ConnectionId>,
    /// Bound player addresses, keyed by the id assigned at TCP accept time.
    bound: HashMap<ConnectionId, SocketAddr>,
    /// Reverse index of `bound`, for O(1) lookup on datagram receipt.
    bound_rev: HashMap<SocketAddr, ConnectionId>,
}

impl UdpEndpoint {
    pub fn bind(addr: SocketAddr) -> io::Result<UdpEndpoint> {
        Ok(UdpEndpoint {
            socket: UdpSocket::bind(&addr)?,
            pending: HashMap::new(),
            bound: HashMap::new(),
            bound_rev: HashMap::new(),
        })
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Marks `connection_id` as expecting UDP traffic from `ip` next. Called
    /// when a `RegisterUdp` packet arrives over the matching TCP connection.
    pub fn expect(&mut self, ip: IpAddr, connection_id: ConnectionId) {
        self.pending.insert(ip, connection_id);
    }

    pub fn addr_of(&self, connection_id: ConnectionId) -> Option<SocketAddr> {
        self.bound.get(&connection_id).copied()
    }

    pub fn forget(&mut self, connection_id: ConnectionId) {
        self.pending.retain(|_, id| *id != connection_id);
        if let Some(addr) = self.bound.remove(&connection_id) {
            self.bound_rev.remove(&addr);
        }
    }

    /// Drains every datagram currently queued on the socket. Binds the
    /// sender's address to a pending connection id the first time it's seen;
    /// returns `(connection_id, body)` pairs for every datagram whose sender
    /// is already bound (unbound senders are silently dropped — spec §9).
    pub fn recv_all(&mut self) -> NetworkResult<Vec<(ConnectionId, Vec<u8>)>> {
        let mut out = Vec::new();
        let mut buf = [0u8; UDP_MAX_BODY];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, src)) => {
                    if let Some(id) = self.pending.remove(&src.ip()) {
                        self.bound.insert(id, src);
                        self.bound_rev.insert(src, id);
                    }
                    if let Some(&id) = self.bound_rev.get(&src) {
                        out.push((id, buf[..len].to_vec()));
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }

    pub fn send_to(&self, connection_id: ConnectionId, body: &[u8]) -> NetworkResult<()> {
        if let Some(addr) = self.addr_of(connection_id) {
            self.socket.send_to(body, &addr)?;
        }
        Ok(())
    }

    pub fn broadcast(&self, body: &[u8]) -> NetworkResult<()> {
        for addr in self.bound.values() {
            self.socket.send_to(body, addr)?;
        }
        Ok(())
    }
}
