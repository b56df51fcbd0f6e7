//! The message dispatcher (spec §4.5): a fixed-size table mapping packet
//! type to handler, bridging the transport layer to whatever owns domain
//! state (`game/core`'s `GameState`+`Registry` on the game server,
//! `services/lobby`'s services on the lobby server).
//!
//! Grounded in `server/src/core/message_dispatcher.cpp`'s
//! `default_handler`/per-type `handle_*` split — generalized here from the
//! original's `switch`-on-enum to an array of function pointers indexed by
//! `PacketType::as_u32()`, per spec §9 REDESIGN FLAGS ("the handler table is
//! naturally a fixed-size array... preferable to virtual interfaces").

use rtype_common::NetworkResult;
use rtype_protocol::codec::Packet;
use rtype_protocol::packet_type::{PacketType, MAX_PACKET_TYPES};
use rtype_transport::ConnectionId;
use slog::Logger;
use std::convert::TryFrom;

/// Where a packet arrived from — the dispatcher itself is transport-agnostic,
/// but handlers often need to know whether a reply can go out UDP or must go
/// TCP (spec §4.1).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Origin {
    Tcp(ConnectionId),
    Udp(ConnectionId),
}

impl Origin {
    pub fn connection_id(self) -> ConnectionId {
        match self {
            Origin::Tcp(id) | Origin::Udp(id) => id,
        }
    }
}

type Handler<Ctx> = Box<dyn FnMut(&Packet, Origin, &mut Ctx)>;

/// `handlers: [EventType::MaxTypes]Option<Handler>` (spec §4.5). `Ctx` is
/// whatever domain state handlers need mutable access to — the game
/// server's `(Registry, GameState)` pair or the lobby server's service
/// container — kept generic so this crate has no opinion on either.
pub struct Dispatcher<Ctx> {
    handlers: Vec<Option<Handler<Ctx>>>,
    log: Logger,
}

impl<Ctx> Dispatcher<Ctx> {
    pub fn new(log: &Logger) -> Dispatcher<Ctx> {
        let mut handlers = Vec::with_capacity(MAX_PACKET_TYPES);
        handlers.resize_with(MAX_PACKET_TYPES, || None);
        Dispatcher { handlers, log: log.new(slog::o!("component" => "dispatcher")) }
    }

    /// Registers `handler` for `kind`. Registering twice for the same kind
    /// replaces the previous handler.
    pub fn register<F>(&mut self, kind: PacketType, handler: F)
    where
        F: FnMut(&Packet, Origin, &mut Ctx) + 'static,
    {
        self.handlers[kind.as_u32() as usize] = Some(Box::new(handler));
    }

    /// Looks up `handlers[packet.type]`; if present, invokes it, else calls
    /// the default handler (log and discard) (spec §4.5 steps 1-3). Decode
    /// failures (unknown discriminant) are treated the same as "no handler
    /// registered" — both just log and drop, matching §7's decode-error
    /// policy of keeping the connection open.
    pub fn dispatch(&mut self, packet: &Packet, origin: Origin, ctx: &mut Ctx) {
        match self.kind_of(packet) {
            Ok(kind) => match &mut self.handlers[kind.as_u32() as usize] {
                Some(handler) => handler(packet, origin, ctx),
                None => self.default_handler(packet, origin),
            },
            Err(_) => self.default_handler(packet, origin),
        }
    }

    fn kind_of(&self, packet: &Packet) -> NetworkResult<PacketType> {
        PacketType::try_from(packet.header.packet_type)
    }

    fn default_handler(&self, packet: &Packet, origin: Origin) {
        slog::warn!(
            self.log,
            "unhandled packet type";
            "packet_type" => packet.header.packet_type,
            "connection_id" => origin.connection_id(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtype_protocol::codec::{create_packet, Header};
    use rtype_protocol::payload::PingPacket;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    #[test]
    fn dispatches_to_registered_handler() {
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new(&test_logger());
        dispatcher.register(PacketType::Ping, |_packet, _origin, ctx: &mut u32| {
            *ctx += 1;
        });

        let packet = create_packet(PacketType::Ping, &PingPacket { timestamp_ms: 1 });
        let mut ctx = 0u32;
        dispatcher.dispatch(&packet, Origin::Tcp(7), &mut ctx);
        assert_eq!(ctx, 1);
    }

    #[test]
    fn falls_back_to_default_handler_without_panicking() {
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new(&test_logger());
        let packet = create_packet(PacketType::Ping, &PingPacket { timestamp_ms: 1 });
        let mut ctx = 0u32;
        dispatcher.dispatch(&packet, Origin::Tcp(1), &mut ctx);
        assert_eq!(ctx, 0);
    }

    #[test]
    fn unknown_packet_type_falls_back_to_default_handler() {
        let mut dispatcher: Dispatcher<u32> = Dispatcher::new(&test_logger());
        let bogus = Packet { header: Header { packet_type: 9999, size: 0 }, body: Vec::new() };
        let mut ctx = 0u32;
        dispatcher.dispatch(&bogus, Origin::Udp(1), &mut ctx);
        assert_eq!(ctx, 0);
    }
}
