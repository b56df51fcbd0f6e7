//! Dispatcher and event-bus wiring for the lobby server (spec §4.9's handler
//! table, plus the connection-lifecycle half of the same pattern). Mirrors
//! `game/core::dispatch` exactly: packet-shaped input goes through the
//! [`Dispatcher`], connection lifecycle is wired straight onto the event bus.
//!
//! Every handler here does the same three things `server/src/core/message_dispatcher.cpp`'s
//! `handle_*` functions do: decode the request payload, call one
//! `crate::service` function, and encode whatever it returns back into a
//! response packet — the status-coded failure path in particular mirrors the
//! original's "catch a domain exception, send back its status code" shape.

use std::cell::RefCell;
use std::rc::Rc;

use rtype_common::error::DomainResult;
use rtype_dispatcher::{Dispatcher, Origin};
use rtype_protocol::codec::{create_packet, extract, Header, Packet};
use rtype_protocol::packet_type::PacketType;
use rtype_protocol::payload::{
    CreateLobby, CreateLobbyResponse, GetLobbyPlayers, GetLobbyPlayersResponse, GetLobbyList,
    GetUserList, GameConnectionInfo, JoinLobby, LobbyListEntry, LobbyListResponse, LobbyPlayerEntry,
    LobbyPlayerReady, LoginPacket, LoginResponse, MessageEntry, PlayerJoinedLobby, PlayerLeftLobby,
    PlayerReady, PrivateChatHistory, PrivateChatHistoryResponse, PrivateMessage, RegisterPacket,
    StatusResponse, UserListEntry, UserListResponse,
};
use rtype_transport::{ConnectionId, IoEvent, OutboundQueue};
use slog::Logger;

use crate::db::Db;
use crate::provisioning::Provisioner;
use crate::repository::{MessageRepository, UserRepository};
use crate::service;
use crate::state::LobbyState;

/// Event kind count of the `IoEvent` bus the lobby server runs — the same
/// bus shape the game server uses, since both sides sit behind the same
/// transport layer.
pub const IO_EVENT_KINDS: usize = IoEvent::KINDS;

pub type IoEventBus = rtype_eventbus::EventBus<IoEvent, IO_EVENT_KINDS>;
pub type IoEventPublisher = rtype_eventbus::EventPublisher<IoEvent, IO_EVENT_KINDS>;

/// Everything a lobby packet handler needs. Shared `Rc<RefCell<_>>`-style,
/// the same sharing pattern `gamecore::dispatch::GameCtx` uses for the ECS
/// registry, since the dispatcher is registered once and reused for the
/// life of the process.
pub struct LobbyCtx {
    pub state: Rc<RefCell<LobbyState>>,
    pub users: UserRepository,
    pub messages: MessageRepository,
    pub provisioner: Provisioner,
}

impl LobbyCtx {
    pub fn new(db: Db, state: Rc<RefCell<LobbyState>>, provisioner: Provisioner) -> LobbyCtx {
        LobbyCtx { state, users: UserRepository::new(db.clone()), messages: MessageRepository::new(db), provisioner }
    }
}

/// Registers every packet handler the lobby server understands and the
/// connection-lifecycle subscriber that forgets a logged-in user when its
/// connection drops.
pub fn install(dispatcher: &mut Dispatcher<LobbyCtx>, event_bus: &mut IoEventBus, state: Rc<RefCell<LobbyState>>, log: &Logger) {
    register_register(dispatcher, log.new(slog::o!("handler" => "register")));
    register_login(dispatcher, log.new(slog::o!("handler" => "login")));
    register_create_lobby(dispatcher, log.new(slog::o!("handler" => "create_lobby")));
    register_join_lobby(dispatcher, log.new(slog::o!("handler" => "join_lobby")));
    register_leave_lobby(dispatcher, log.new(slog::o!("handler" => "leave_lobby")));
    register_player_ready(dispatcher, log.new(slog::o!("handler" => "player_ready")));
    register_get_lobby_list(dispatcher);
    register_get_lobby_players(dispatcher, log.new(slog::o!("handler" => "get_lobby_players")));
    register_get_user_list(dispatcher, log.new(slog::o!("handler" => "get_user_list")));
    register_chat_history(dispatcher, log.new(slog::o!("handler" => "chat_history")));
    register_private_message(dispatcher, log.new(slog::o!("handler" => "private_message")));
    register_register_udp(dispatcher);
    register_ping(dispatcher);
    subscribe_disconnected(event_bus, state, log.new(slog::o!("handler" => "disconnected")));
}

/// Looks up the authenticated `user_id` for `connection_id`, replying with a
/// `401`-coded `StatusResponse` and bailing if the connection hasn't logged
/// in (spec §4.9: every handler but `Register`/`Login` requires this).
fn authenticated_user(state: &LobbyState, connection_id: ConnectionId, outbound: &OutboundQueue, response_kind: PacketType) -> Option<i32> {
    match state.user_of_connection(connection_id) {
        Some(user_id) => Some(user_id),
        None => {
            let packet = create_packet(response_kind, &StatusResponse { status: rtype_common::DomainError::Unauthorized.status_code() });
            outbound.send_tcp(connection_id, packet);
            None
        }
    }
}

fn register_register(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::Register, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<RegisterPacket>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let status = match service::register(&ctx.users, &request.username, &request.password) {
            Ok(_) => 200,
            Err(err) => {
                slog::debug!(log, "register rejected"; "username" => &request.username, "status" => err.status_code());
                err.status_code()
            }
        };
        let response = create_packet(PacketType::RegisterResponse, &StatusResponse { status });
        outbound.send_tcp(connection_id, response);
    });
}

fn register_login(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::Login, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<LoginPacket>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let result: DomainResult<_> = {
            let mut state = ctx.state.borrow_mut();
            service::login(&ctx.users, &mut state, connection_id, &request.username, &request.password)
        };
        match result {
            Ok((user, stale_connection)) => {
                if let Some(stale) = stale_connection {
                    slog::info!(log, "login replaced a prior connection"; "user_id" => user.id, "stale_connection" => stale);
                    outbound.disconnect(stale);
                }
                let response = create_packet(PacketType::LoginResponse, &LoginResponse { status: 200, user_id: user.id });
                outbound.send_tcp(connection_id, response);
            }
            Err(err) => {
                slog::debug!(log, "login rejected"; "username" => &request.username, "status" => err.status_code());
                let response = create_packet(PacketType::LoginResponse, &LoginResponse { status: err.status_code(), user_id: 0 });
                outbound.send_tcp(connection_id, response);
            }
        }
    });
}

fn register_create_lobby(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::CreateLobby, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<CreateLobby>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let mut state = ctx.state.borrow_mut();
        let user_id = match authenticated_user(&state, connection_id, &outbound, PacketType::CreateLobbyResponse) {
            Some(id) => id,
            None => return,
        };
        let password = if request.password.is_empty() { None } else { Some(request.password) };
        let response = match service::create_lobby(&mut state, user_id, request.name, password) {
            Ok(lobby_id) => CreateLobbyResponse { status: 200, lobby_id },
            Err(err) => {
                slog::debug!(log, "create_lobby rejected"; "user_id" => user_id, "status" => err.status_code());
                CreateLobbyResponse { status: err.status_code(), lobby_id: 0 }
            }
        };
        outbound.send_tcp(connection_id, create_packet(PacketType::CreateLobbyResponse, &response));
    });
}

fn register_join_lobby(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::JoinLobby, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<JoinLobby>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let mut state = ctx.state.borrow_mut();
        let user_id = match authenticated_user(&state, connection_id, &outbound, PacketType::JoinLobbyResponse) {
            Some(id) => id,
            None => return,
        };

        match service::join_lobby(&mut state, user_id, request.lobby_id, &request.password) {
            Ok(others) => {
                let username = ctx.users.find_by_id(user_id).ok().flatten().map(|user| user.username).unwrap_or_default();
                let response = create_packet(PacketType::JoinLobbyResponse, &StatusResponse { status: 200 });
                outbound.send_tcp(connection_id, response);

                let joined = PlayerJoinedLobby { player_id: user_id, username };
                let joined_packet = create_packet(PacketType::PlayerJoinedLobby, &joined);
                for other_id in others {
                    if let Some(other_connection) = state.connection_of(other_id) {
                        outbound.send_tcp(other_connection, joined_packet.clone());
                    }
                }
            }
            Err(err) => {
                slog::debug!(log, "join_lobby rejected"; "user_id" => user_id, "lobby_id" => request.lobby_id, "status" => err.status_code());
                let response = create_packet(PacketType::JoinLobbyResponse, &StatusResponse { status: err.status_code() });
                outbound.send_tcp(connection_id, response);
            }
        }
    });
}

fn register_leave_lobby(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::LeaveLobby, move |_packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let mut state = ctx.state.borrow_mut();
        let user_id = match authenticated_user(&state, connection_id, &outbound, PacketType::LeaveLobbyResponse) {
            Some(id) => id,
            None => return,
        };

        match service::leave_lobby(&mut state, user_id) {
            Ok((_lobby_id, remaining)) => {
                let response = create_packet(PacketType::LeaveLobbyResponse, &StatusResponse { status: 200 });
                outbound.send_tcp(connection_id, response);

                let left = PlayerLeftLobby { player_id: user_id };
                let left_packet = create_packet(PacketType::PlayerLeftLobby, &left);
                for member_id in remaining {
                    if let Some(member_connection) = state.connection_of(member_id) {
                        outbound.send_tcp(member_connection, left_packet.clone());
                    }
                }
            }
            Err(err) => {
                slog::debug!(log, "leave_lobby rejected"; "user_id" => user_id, "status" => err.status_code());
                let response = create_packet(PacketType::LeaveLobbyResponse, &StatusResponse { status: err.status_code() });
                outbound.send_tcp(connection_id, response);
            }
        }
    });
}

/// `PlayerReady` (spec §4.9): sets readiness, broadcasts `LobbyPlayerReady`
/// to every member, and triggers `start_game` when the whole lobby is ready.
fn register_player_ready(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::PlayerReady, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<PlayerReady>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let mut state = ctx.state.borrow_mut();
        let user_id = match state.user_of_connection(connection_id) {
            Some(id) => id,
            None => return,
        };

        let (lobby_id, members, all_ready) = match service::set_ready(&mut state, user_id, request.is_ready) {
            Ok(result) => result,
            Err(err) => {
                slog::debug!(log, "player_ready rejected"; "user_id" => user_id, "status" => err.status_code());
                return;
            }
        };

        let ready_notice = LobbyPlayerReady { player_id: user_id, is_ready: request.is_ready };
        let ready_packet = create_packet(PacketType::LobbyPlayerReady, &ready_notice);
        for member_id in &members {
            if let Some(member_connection) = state.connection_of(*member_id) {
                outbound.send_tcp(member_connection, ready_packet.clone());
            }
        }

        if !all_ready {
            return;
        }

        slog::info!(log, "lobby fully ready, starting game"; "lobby_id" => lobby_id);
        match service::start_game(&mut state, &ctx.provisioner, lobby_id) {
            Ok(endpoint) => {
                let info = GameConnectionInfo { ip: endpoint.ip, tcp_port: endpoint.tcp_port as i32, udp_port: endpoint.udp_port as i32 };
                let info_packet = create_packet(PacketType::GameConnectionInfo, &info);
                for member_id in &members {
                    if let Some(member_connection) = state.connection_of(*member_id) {
                        outbound.send_tcp(member_connection, info_packet.clone());
                    }
                }
            }
            Err(err) => {
                slog::error!(log, "game provisioning failed"; "lobby_id" => lobby_id, "status" => err.status_code());
            }
        }
    });
}

fn register_get_lobby_list(dispatcher: &mut Dispatcher<LobbyCtx>) {
    dispatcher.register(PacketType::GetLobbyList, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<GetLobbyList>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let state = ctx.state.borrow();
        let lobbies = service::list_lobbies(&state, request.offset, request.limit, &request.search)
            .into_iter()
            .map(|lobby| LobbyListEntry { id: lobby.id, name: lobby.name, has_password: lobby.has_password })
            .collect();
        let response = LobbyListResponse { status: 200, lobbies };
        let body = response.encode();
        let packet = Packet { header: Header { packet_type: PacketType::LobbyListResponse.as_u32(), size: body.len() as u32 }, body };
        outbound.send_tcp(connection_id, packet);
    });
}

fn register_get_lobby_players(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::GetLobbyPlayers, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<GetLobbyPlayers>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let state = ctx.state.borrow();
        let (status, players) = match service::lobby_players(&state, &ctx.users, request.lobby_id) {
            Ok(players) => (
                200,
                players
                    .into_iter()
                    .map(|player| LobbyPlayerEntry { player_id: player.user_id, username: player.username, is_ready: player.is_ready })
                    .collect(),
            ),
            Err(err) => {
                slog::debug!(log, "get_lobby_players rejected"; "lobby_id" => request.lobby_id, "status" => err.status_code());
                (err.status_code(), Vec::new())
            }
        };
        let response = GetLobbyPlayersResponse { status, players };
        let body = response.encode();
        let packet = Packet {
            header: Header { packet_type: PacketType::GetLobbyPlayersResponse.as_u32(), size: body.len() as u32 },
            body,
        };
        outbound.send_tcp(connection_id, packet);
    });
}

fn register_get_user_list(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::GetUserList, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<GetUserList>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let state = ctx.state.borrow();
        let (status, users) = match service::user_list(&state, &ctx.users, request.offset, request.limit, &request.search) {
            Ok(users) => (
                200,
                users
                    .into_iter()
                    .map(|user| UserListEntry { user_id: user.user_id, username: user.username, is_online: user.is_online })
                    .collect(),
            ),
            Err(err) => {
                slog::debug!(log, "get_user_list failed"; "status" => err.status_code());
                (err.status_code(), Vec::new())
            }
        };
        let response = UserListResponse { status, users };
        let body = response.encode();
        let packet = Packet {
            header: Header { packet_type: PacketType::UserListResponse.as_u32(), size: body.len() as u32 },
            body,
        };
        outbound.send_tcp(connection_id, packet);
    });
}

fn register_chat_history(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::PrivateChatHistory, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<PrivateChatHistory>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let state = ctx.state.borrow();
        let user_id = match authenticated_user(&state, connection_id, &outbound, PacketType::PrivateChatHistoryResponse) {
            Some(id) => id,
            None => return,
        };

        let messages = match service::chat_history(&ctx.messages, user_id, request.target_user_id) {
            Ok(messages) => messages
                .into_iter()
                .map(|message| MessageEntry {
                    id: message.id,
                    sender_id: message.sender_id,
                    recipient_id: message.recipient_id,
                    content: message.content,
                    sent_at_ms: message.sent_at_ms,
                })
                .collect(),
            Err(err) => {
                slog::debug!(log, "chat_history failed"; "user_id" => user_id, "status" => err.status_code());
                Vec::new()
            }
        };
        let response = PrivateChatHistoryResponse { messages };
        let body = response.encode();
        let packet = Packet {
            header: Header { packet_type: PacketType::PrivateChatHistoryResponse.as_u32(), size: body.len() as u32 },
            body,
        };
        outbound.send_tcp(connection_id, packet);
    });
}

/// `PrivateMessage` (spec §4.9): persists the message then delivers
/// `PrivateMessageDelivered` to both the sender (as an ack) and the
/// recipient, if currently online.
fn register_private_message(dispatcher: &mut Dispatcher<LobbyCtx>, log: Logger) {
    dispatcher.register(PacketType::PrivateMessage, move |packet, origin, ctx: &mut LobbyCtx| {
        let connection_id = origin.connection_id();
        let outbound = ctx.state.borrow().outbound().clone();
        let request = match extract::<PrivateMessage>(&packet.body) {
            Ok(request) => request,
            Err(_) => return,
        };

        let state = ctx.state.borrow();
        let sender_id = match authenticated_user(&state, connection_id, &outbound, PacketType::PrivateMessageDelivered) {
            Some(id) => id,
            None => return,
        };

        match service::send_private_message(&ctx.messages, sender_id, request.recipient_id, &request.content) {
            Ok(message) => {
                let entry = MessageEntry {
                    id: message.id,
                    sender_id: message.sender_id,
                    recipient_id: message.recipient_id,
                    content: message.content,
                    sent_at_ms: message.sent_at_ms,
                };
                let delivered = create_packet(PacketType::PrivateMessageDelivered, &entry);
                outbound.send_tcp(connection_id, delivered.clone());
                if let Some(recipient_connection) = state.connection_of(request.recipient_id) {
                    outbound.send_tcp(recipient_connection, delivered);
                }
            }
            Err(err) => {
                slog::debug!(log, "private_message rejected"; "sender_id" => sender_id, "status" => err.status_code());
            }
        }
    });
}

/// Arms the transport's pending-UDP-binding table for this connection, same
/// as `gamecore::dispatch::register_register_udp`.
fn register_register_udp(dispatcher: &mut Dispatcher<LobbyCtx>) {
    dispatcher.register(PacketType::RegisterUdp, move |_packet, origin, ctx: &mut LobbyCtx| {
        ctx.state.borrow().outbound().register_udp(origin.connection_id());
    });
}

fn register_ping(dispatcher: &mut Dispatcher<LobbyCtx>) {
    dispatcher.register(PacketType::Ping, move |packet, origin, ctx: &mut LobbyCtx| {
        let ping = match extract::<rtype_protocol::payload::PingPacket>(&packet.body) {
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

/// On disconnect: forget whichever user this connection was logged in as, if
/// any, and remove them from their lobby so they don't block a ready check.
fn subscribe_disconnected(event_bus: &mut IoEventBus, state: Rc<RefCell<LobbyState>>, log: Logger) {
    // kind 1: IoEvent::Disconnected.
    event_bus.subscribe(1, move |event: &IoEvent| {
        let connection_id = match event {
            IoEvent::Disconnected(id) => *id,
            _ => return,
        };

        let mut state = state.borrow_mut();
        if let Some(user_id) = state.unbind_connection(connection_id) {
            state.remove_player(user_id);
            slog::info!(log, "user disconnected"; "connection_id" => connection_id, "user_id" => user_id);
        }
    });
}
