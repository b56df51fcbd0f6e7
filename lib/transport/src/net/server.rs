//! The single-threaded I/O reactor (spec §4.1, §5): one `mio::Poll` driving
//! both the TCP listener/connections and the UDP socket, grounded in
//! `neutronium::net::endpoint`'s accept-loop shape but without its
//! handshake/live-connection split — every accepted TCP socket is live
//! immediately, there being no session handshake in this protocol.

use std::io;
use std::net::SocketAddr;

use hashbrown::HashMap;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Poll, PollOpt, Ready, Token};
use rtype_common::NetworkResult;
use rtype_eventbus::Event;
use rtype_protocol::codec::Packet;
use slog::Logger;

use crate::net::connection::{Connection, ConnectionId};
use crate::net::outbound::OutCommand;
use crate::net::udp::UdpEndpoint;

const LISTENER_TOKEN: Token = Token(0);
const UDP_TOKEN: Token = Token(1);
/// Connection tokens start past the two fixed reactor tokens.
const FIRST_CONNECTION_TOKEN: usize = 2;
const EVENTS_CAPACITY: usize = 1024;

/// An event the reactor hands back to the caller each poll — also the
/// payload type carried by the [`rtype_eventbus::EventBus`] that bridges the
/// I/O thread to the simulation thread (spec §4.5's dispatcher consumes
/// these on the other end).
#[derive(Clone)]
pub enum IoEvent {
    Accepted(ConnectionId, SocketAddr),
    Disconnected(ConnectionId),
    TcpPacket(ConnectionId, Packet),
    UdpDatagram(ConnectionId, Vec<u8>),
}

/// Event kind count for an `EventBus<IoEvent, { IoEvent::KINDS }>`.
impl IoEvent {
    pub const KINDS: usize = 4;
}

impl Event for IoEvent {
    fn kind(&self) -> usize {
        match self {
            IoEvent::Accepted(..) => 0,
            IoEvent::Disconnected(..) => 1,
            IoEvent::TcpPacket(..) => 2,
            IoEvent::UdpDatagram(..) => 3,
        }
    }
}

/// Owns the listener, every live TCP connection, and the shared UDP socket.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    udp: UdpEndpoint,
    connections: HashMap<ConnectionId, Connection>,
    next_connection_id: ConnectionId,
    log: Logger,
}

impl Server {
    pub fn bind(tcp_addr: SocketAddr, udp_addr: SocketAddr, log: &Logger) -> io::Result<Server> {
        let listener = TcpListener::bind(&tcp_addr)?;
        let udp = UdpEndpoint::bind(udp_addr)?;

        let poll = Poll::new()?;
        poll.register(&listener, LISTENER_TOKEN, Ready::readable(), PollOpt::edge())?;
        poll.register(udp.socket(), UDP_TOKEN, Ready::readable(), PollOpt::edge())?;

        Ok(Server {
            poll,
            listener,
            udp,
            connections: HashMap::new(),
            next_connection_id: 0,
            log: log.new(slog::o!("component" => "reactor")),
        })
    }

    /// Blocks for up to `timeout` waiting for I/O readiness, then services
    /// every ready source exactly once. Returns the batch of events the tick
    /// loop should fold into the event bus.
    pub fn poll(&mut self, timeout: std::time::Duration) -> NetworkResult<Vec<IoEvent>> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);
        self.poll.poll(&mut events, Some(timeout))?;

        let mut out = Vec::new();
        for event in &events {
            match event.token() {
                LISTENER_TOKEN => self.accept_all(&mut out)?,
                UDP_TOKEN => self.drain_udp(&mut out)?,
                Token(raw) => {
                    let id = (raw - FIRST_CONNECTION_TOKEN) as ConnectionId;
                    self.service_connection(id, &mut out);
                }
            }
        }
        Ok(out)
    }

    fn accept_all(&mut self, out: &mut Vec<IoEvent>) -> NetworkResult<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => self.register_connection(stream, addr, out)?,
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    slog::warn!(self.log, "accept failed"; "error" => %e);
                    break;
                }
            }
        }
        Ok(())
    }

    fn register_connection(
        &mut self,
        stream: TcpStream,
        addr: SocketAddr,
        out: &mut Vec<IoEvent>,
    ) -> NetworkResult<()> {
        let id = self.next_connection_id;
        self.next_connection_id += 1;

        let token = Token(FIRST_CONNECTION_TOKEN + id as usize);
        self.poll.register(&stream, token, Ready::readable() | Ready::writable(), PollOpt::edge())?;

        let connection = Connection::new(id, stream)?;
        self.connections.insert(id, connection);
        slog::info!(self.log, "client connected"; "connection_id" => id, "peer" => %addr);
        out.push(IoEvent::Accepted(id, addr));
        Ok(())
    }

    fn service_connection(&mut self, id: ConnectionId, out: &mut Vec<IoEvent>) {
        let disconnect = {
            let connection = match self.connections.get_mut(&id) {
                Some(c) => c,
                None => return,
            };
            match connection.read_packets() {
                Ok(packets) => {
                    for packet in packets {
                        out.push(IoEvent::TcpPacket(id, packet));
                    }
                    connection.flush_writes().is_err()
                }
                Err(_) => true,
            }
        };

        if disconnect {
            self.drop_connection(id, out);
        }
    }

    fn drop_connection(&mut self, id: ConnectionId, out: &mut Vec<IoEvent>) {
        if let Some(mut connection) = self.connections.remove(&id) {
            connection.shutdown();
            let _ = self.poll.deregister(connection.stream());
        }
        self.udp.forget(id);
        slog::info!(self.log, "client disconnected"; "connection_id" => id);
        out.push(IoEvent::Disconnected(id));
    }

    fn drain_udp(&mut self, out: &mut Vec<IoEvent>) -> NetworkResult<()> {
        for (id, body) in self.udp.recv_all()? {
            out.push(IoEvent::UdpDatagram(id, body));
        }
        Ok(())
    }

    /// Handles a `RegisterUdp` packet (spec §9): arms the binding table so
    /// the next datagram from this connection's peer IP is associated with
    /// `id`.
    pub fn register_udp(&mut self, id: ConnectionId) {
        if let Some(connection) = self.connections.get(&id) {
            self.udp.expect(connection.peer_addr.ip(), id);
        }
    }

    pub fn send_tcp(&mut self, id: ConnectionId, packet: &Packet) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.enqueue(packet);
            let _ = connection.flush_writes();
        }
    }

    /// Sends `packet` to every connected client (spec §4.1's `broadcast_tcp`).
    pub fn broadcast_tcp(&mut self, packet: &Packet) {
        for connection in self.connections.values_mut() {
            connection.enqueue(packet);
            let _ = connection.flush_writes();
        }
    }

    pub fn send_udp(&mut self, id: ConnectionId, body: &[u8]) {
        let _ = self.udp.send_to(id, body);
    }

    /// Sends `body` to every bound UDP peer (spec §4.1's `broadcast_udp`).
    pub fn broadcast_udp(&mut self, body: &[u8]) {
        let _ = self.udp.broadcast(body);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn disconnect(&mut self, id: ConnectionId) {
        let mut scratch = Vec::new();
        self.drop_connection(id, &mut scratch);
    }

    /// Applies one [`OutCommand`] produced by the simulation thread. Called
    /// by the I/O thread's own loop, once per drained command, each reactor
    /// iteration.
    pub fn apply(&mut self, command: OutCommand) {
        match command {
            OutCommand::SendTcp(id, packet) => self.send_tcp(id, &packet),
            OutCommand::SendUdp(id, body) => self.send_udp(id, &body),
            OutCommand::BroadcastTcp(packet) => self.broadcast_tcp(&packet),
            OutCommand::BroadcastUdp(body) => self.broadcast_udp(&body),
            OutCommand::RegisterUdp(id) => self.register_udp(id),
            OutCommand::Disconnect(id) => self.disconnect(id),
        }
    }
}
