//! Dispatcher and event-bus wiring for the game server (spec §4.5's handler
//! table, plus the connection-lifecycle half of §4.9's pattern applied to
//! the game side, and `SPEC_FULL.md` §2's `Ping`/`Pong` echo).
//!
//! Packet-shaped input (`PlayerInput`, `RegisterUdp`, `Ping`) goes through
//! the [`Dispatcher`]; connection lifecycle (`Accepted`/`Disconnected`) has
//! no packet of its own and is wired straight onto the event bus, mirroring
//! `server/src/core/message_dispatcher.cpp`'s split between packet handlers
//! and the accept/disconnect callbacks it registers separately.

use std::cell::RefCell;
use std::rc::Rc;

use rtype_dispatcher::{Dispatcher, Origin};
use rtype_ecs::Engine;
use rtype_eventbus::{EventBus, EventPublisher};
use rtype_protocol::codec::{create_packet, extract};
use rtype_protocol::packet_type::PacketType;
use rtype_protocol::payload::{PingPacket, PlayerAssign, PlayerInput};
use rtype_transport::IoEvent;
use slog::Logger;

use crate::components::{Health, InputState};
use crate::constants::ARENA_SIZE;
use crate::state::GameState;

/// Event kind count of the `IoEvent` bus the game server runs.
pub const IO_EVENT_KINDS: usize = IoEvent::KINDS;

pub type IoEventBus = EventBus<IoEvent, IO_EVENT_KINDS>;
pub type IoEventPublisher = EventPublisher<IoEvent, IO_EVENT_KINDS>;

/// Everything a game-server packet handler needs. Shared with the tick loop
/// via `Rc<RefCell<_>>` — the same sharing pattern [`crate::systems`] uses
/// for `GameState` — since the `Dispatcher` is registered once and re-used
/// every tick, so a handler can only ever borrow the registry for the
/// duration of its own call, never longer.
pub struct GameCtx {
    pub engine: Rc<RefCell<Engine>>,
    pub state: Rc<RefCell<GameState>>,
}

/// Registers every packet handler this server understands and the
/// connection-lifecycle subscribers that turn `Accepted`/`Disconnected`
/// events into `add_player`/`remove_player` calls.
pub fn install(
    dispatcher: &mut Dispatcher<GameCtx>,
    event_bus: &mut IoEventBus,
    engine: Rc<RefCell<Engine>>,
    state: Rc<RefCell<GameState>>,
    log: &Logger,
) {
    register_player_input(dispatcher, log.new(slog::o!("handler" => "player_input")));
    register_register_udp(dispatcher);
    register_ping(dispatcher);
    subscribe_accepted(event_bus, Rc::clone(&engine), Rc::clone(&state), log.new(slog::o!("handler" => "accepted")));
    subscribe_disconnected(event_bus, engine, state, log.new(slog::o!("handler" => "disconnected")));
}

fn register_player_input(dispatcher: &mut Dispatcher<GameCtx>, log: Logger) {
    dispatcher.register(PacketType::PlayerInput, move |packet, _origin, ctx: &mut GameCtx| {
        let input = match extract::<PlayerInput>(&packet.body) {
            Ok(input) => input,
            Err(_) => {
                slog::debug!(log, "dropping malformed PlayerInput");
                return;
            }
        };
        let entity = match ctx.state.borrow().player_entities.get(&input.player_id) {
            Some(&entity) => entity,
            None => return,
        };
        let mut engine = ctx.engine.borrow_mut();
        if let Some(state) = engine.registry.get_component_mut::<InputState>(entity) {
            state.actions = input.actions;
            state.dir_x = input.dir_x;
            state.dir_y = input.dir_y;
        }
    });
}

/// `RegisterUdp` carries no payload (spec §9 decision, `SPEC_FULL.md` §3):
/// receiving it just arms the transport's pending-UDP-binding table for
/// this connection, so its peer's first datagram gets bound to it.
fn register_register_udp(dispatcher: &mut Dispatcher<GameCtx>) {
    dispatcher.register(PacketType::RegisterUdp, move |_packet, origin, ctx: &mut GameCtx| {
        ctx.state.borrow().outbound().register_udp(origin.connection_id());
    });
}

/// Echoes `Ping` back as `Pong` over whichever transport it arrived on
/// (`SPEC_FULL.md` §2).
fn register_ping(dispatcher: &mut Dispatcher<GameCtx>) {
    dispatcher.register(PacketType::Ping, move |packet, origin, ctx: &mut GameCtx| {
        let ping = match extract::<PingPacket>(&packet.body) {
            Ok(ping) => ping,
            Err(_) => return,
        };
        let pong = create_packet(PacketType::Pong, &ping);
        let outbound = ctx.state.borrow().outbound().clone();
        match origin {
            Origin::Tcp(id) => outbound.send_tcp(id, pong),
            Origin::Udp(id) => outbound.send_udp(id, pong.to_bytes()),
        }
    });
}

/// On accept: allocate a player slot at the arena center and reply with its
/// `PlayerAssign` (spec §4.6's `add_player`, applied to a freshly accepted
/// connection rather than a post-login handler, since the game server never
/// authenticates — that already happened at the lobby).
fn subscribe_accepted(event_bus: &mut IoEventBus, engine: Rc<RefCell<Engine>>, state: Rc<RefCell<GameState>>, log: Logger) {
    // kind 0: IoEvent::Accepted (rtype_transport::net::server::IoEvent::kind).
    event_bus.subscribe(0, move |event: &IoEvent| {
        let connection_id = match event {
            IoEvent::Accepted(id, _addr) => *id,
            _ => return,
        };

        let mut state = state.borrow_mut();
        let player_id = match state.allocate_player_id() {
            Some(id) => id,
            None => {
                slog::warn!(log, "player id space exhausted, refusing connection"; "connection_id" => connection_id);
                return;
            }
        };

        let spawn_x = ARENA_SIZE / 2.0;
        let spawn_y = ARENA_SIZE / 2.0;
        let entity = {
            let mut engine = engine.borrow_mut();
            match state.add_player(&mut engine.registry, player_id, spawn_x, spawn_y) {
                Ok(entity) => entity,
                Err(_) => return,
            }
        };
        state.bind_connection(connection_id, player_id);

        let health = engine
            .borrow()
            .registry
            .get_component::<Health>(entity)
            .map(|health| health.0.max(0) as u8)
            .unwrap_or(0);
        let assign = PlayerAssign { spawn_x, spawn_y, score: 0, player_id, health };
        let packet = create_packet(PacketType::PlayerAssign, &assign);
        state.outbound().send_tcp(connection_id, packet);
        slog::info!(log, "player assigned"; "connection_id" => connection_id, "player_id" => player_id);
    });
}

/// On disconnect: remove whatever player this connection owned, if any.
fn subscribe_disconnected(event_bus: &mut IoEventBus, engine: Rc<RefCell<Engine>>, state: Rc<RefCell<GameState>>, log: Logger) {
    // kind 1: IoEvent::Disconnected.
    event_bus.subscribe(1, move |event: &IoEvent| {
        let connection_id = match event {
            IoEvent::Disconnected(id) => *id,
            _ => return,
        };

        let mut state = state.borrow_mut();
        if let Some(player_id) = state.unbind_connection(connection_id) {
            let mut engine = engine.borrow_mut();
            state.remove_player(&mut engine.registry, player_id);
            slog::info!(log, "player removed on disconnect"; "connection_id" => connection_id, "player_id" => player_id);
        }
    });
}
