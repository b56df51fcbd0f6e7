//! The simulation thread's half of the outbound path (spec §5: "Outbound
//! packets cross from the simulation to the I/O executor via per-connection
//! send queues"). `OutCommand` is what crosses; the `OutboundQueue` is a
//! cheap `Clone` handle the simulation side publishes onto and the I/O
//! thread drains each reactor iteration, applying each command to the
//! [`crate::net::server::Server`] it alone owns.

use crossbeam_channel::{Receiver, Sender};
use rtype_protocol::codec::Packet;

use crate::net::connection::ConnectionId;

pub enum OutCommand {
    SendTcp(ConnectionId, Packet),
    SendUdp(ConnectionId, Vec<u8>),
    BroadcastTcp(Packet),
    BroadcastUdp(Vec<u8>),
    RegisterUdp(ConnectionId),
    Disconnect(ConnectionId),
}

#[derive(Clone)]
pub struct OutboundQueue {
    sender: Sender<OutCommand>,
}

impl OutboundQueue {
    pub fn channel() -> (OutboundQueue, Receiver<OutCommand>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (OutboundQueue { sender }, receiver)
    }

    pub fn send_tcp(&self, id: ConnectionId, packet: Packet) {
        let _ = self.sender.send(OutCommand::SendTcp(id, packet));
    }

    pub fn send_udp(&self, id: ConnectionId, body: Vec<u8>) {
        let _ = self.sender.send(OutCommand::SendUdp(id, body));
    }

    pub fn broadcast_tcp(&self, packet: Packet) {
        let _ = self.sender.send(OutCommand::BroadcastTcp(packet));
    }

    pub fn broadcast_udp(&self, body: Vec<u8>) {
        let _ = self.sender.send(OutCommand::BroadcastUdp(body));
    }

    pub fn register_udp(&self, id: ConnectionId) {
        let _ = self.sender.send(OutCommand::RegisterUdp(id));
    }

    pub fn disconnect(&self, id: ConnectionId) {
        let _ = self.sender.send(OutCommand::Disconnect(id));
    }
}
