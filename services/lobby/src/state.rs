//! In-memory lobby state (spec §3.5, §6: "Lobbies and lobby-players are
//! in-memory only"). Mirrors the table-of-maps shape `game/core::state`
//! keeps on top of the `Registry`, minus the registry since there is no ECS
//! here.

use hashbrown::HashMap;
use rtype_transport::{ConnectionId, OutboundQueue};
use slog::Logger;

use crate::domain::{Lobby, LobbyPlayer};

/// Lobbies hold at most this many players (spec §3.5).
pub const MAX_LOBBY_PLAYERS: usize = 10;

pub struct LobbyState {
    lobbies: HashMap<i32, Lobby>,
    next_lobby_id: i32,
    /// `user_id -> LobbyPlayer`. A user appears in at most one entry, which
    /// makes the spec's "at most one lobby per user" invariant structural
    /// rather than something every call site has to re-check.
    players: HashMap<i32, LobbyPlayer>,
    /// The bijective active-connection map (spec §4.9 `Login`): a user_id
    /// logged in on at most one connection, and a connection carries at
    /// most one authenticated user_id.
    connection_by_user: HashMap<i32, ConnectionId>,
    user_by_connection: HashMap<ConnectionId, i32>,
    outbound: OutboundQueue,
    log: Logger,
}

impl LobbyState {
    pub fn new(outbound: OutboundQueue, log: &Logger) -> LobbyState {
        LobbyState {
            lobbies: HashMap::new(),
            next_lobby_id: 1,
            players: HashMap::new(),
            connection_by_user: HashMap::new(),
            user_by_connection: HashMap::new(),
            outbound,
            log: log.new(slog::o!("component" => "lobby-state")),
        }
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    // -- connection <-> user (spec §4.9 Login) --------------------------

    /// Binds `user_id` to `connection_id`, replacing and returning any
    /// connection that user was previously logged in on (the caller
    /// disconnects it, per spec §4.9: "replacing any prior connection and
    /// disconnecting it").
    pub fn bind_connection(&mut self, user_id: i32, connection_id: ConnectionId) -> Option<ConnectionId> {
        if let Some(&stale_connection) = self.connection_by_user.get(&user_id) {
            self.user_by_connection.remove(&stale_connection);
        }
        if let Some(stale_user) = self.user_by_connection.insert(connection_id, user_id) {
            self.connection_by_user.remove(&stale_user);
        }
        let previous = self.connection_by_user.insert(user_id, connection_id);
        previous
    }

    /// Forgets whichever user `connection_id` was bound to, returning it.
    pub fn unbind_connection(&mut self, connection_id: ConnectionId) -> Option<i32> {
        let user_id = self.user_by_connection.remove(&connection_id)?;
        self.connection_by_user.remove(&user_id);
        Some(user_id)
    }

    pub fn connection_of(&self, user_id: i32) -> Option<ConnectionId> {
        self.connection_by_user.get(&user_id).copied()
    }

    pub fn user_of_connection(&self, connection_id: ConnectionId) -> Option<i32> {
        self.user_by_connection.get(&connection_id).copied()
    }

    pub fn is_online(&self, user_id: i32) -> bool {
        self.connection_by_user.contains_key(&user_id)
    }

    // -- lobbies ----------------------------------------------------------

    pub fn create_lobby(&mut self, name: String, password_hash: Option<String>) -> i32 {
        let id = self.next_lobby_id;
        self.next_lobby_id += 1;
        self.lobbies.insert(id, Lobby { id, name, password_hash, game_active: false });
        id
    }

    pub fn get_lobby(&self, lobby_id: i32) -> Option<&Lobby> {
        self.lobbies.get(&lobby_id)
    }

    pub fn get_lobby_mut(&mut self, lobby_id: i32) -> Option<&mut Lobby> {
        self.lobbies.get_mut(&lobby_id)
    }

    /// `GetLobbyList` (spec §4.9): excludes lobbies with `game_active=true`,
    /// optionally filtered by a case-insensitive substring of `search`.
    pub fn list_open_lobbies(&self, offset: u32, limit: u32, search: &str) -> Vec<&Lobby> {
        let needle = search.to_lowercase();
        let mut matches: Vec<&Lobby> = self
            .lobbies
            .values()
            .filter(|lobby| !lobby.game_active)
            .filter(|lobby| needle.is_empty() || lobby.name.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by_key(|lobby| lobby.id);
        matches.into_iter().skip(offset as usize).take(limit as usize).collect()
    }

    // -- lobby membership ---------------------------------------------------

    pub fn lobby_of_player(&self, user_id: i32) -> Option<i32> {
        self.players.get(&user_id).map(|player| player.lobby_id)
    }

    pub fn players_of_lobby(&self, lobby_id: i32) -> Vec<&LobbyPlayer> {
        self.players.values().filter(|player| player.lobby_id == lobby_id).collect()
    }

    pub fn lobby_player_count(&self, lobby_id: i32) -> usize {
        self.players.values().filter(|player| player.lobby_id == lobby_id).count()
    }

    /// Adds `user_id` to `lobby_id`, first removing it from whatever lobby
    /// it was previously in (spec §3.5 invariant).
    pub fn add_player(&mut self, user_id: i32, lobby_id: i32) {
        self.players.insert(user_id, LobbyPlayer { user_id, lobby_id, is_ready: false });
        slog::debug!(self.log, "player joined lobby"; "user_id" => user_id, "lobby_id" => lobby_id);
    }

    /// Removes `user_id` from its current lobby, returning the
    /// `LobbyPlayer` record that was removed, if any.
    pub fn remove_player(&mut self, user_id: i32) -> Option<LobbyPlayer> {
        self.players.remove(&user_id)
    }

    pub fn set_ready(&mut self, user_id: i32, is_ready: bool) -> Option<i32> {
        let player = self.players.get_mut(&user_id)?;
        player.is_ready = is_ready;
        Some(player.lobby_id)
    }

    /// `true` iff every member of `lobby_id` has `is_ready=true` and the
    /// lobby has at least one member (spec §4.9 `PlayerReady`).
    pub fn all_ready(&self, lobby_id: i32) -> bool {
        let members = self.players_of_lobby(lobby_id);
        !members.is_empty() && members.iter().all(|player| player.is_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn test_state() -> LobbyState {
        let (outbound, _rx) = OutboundQueue::channel();
        LobbyState::new(outbound, &test_logger())
    }

    #[test]
    fn bind_connection_replaces_a_prior_connection_for_the_same_user() {
        let mut state = test_state();
        assert_eq!(state.bind_connection(1, 10), None);
        assert_eq!(state.connection_of(1), Some(10));

        let stale = state.bind_connection(1, 20);
        assert_eq!(stale, Some(10));
        assert_eq!(state.connection_of(1), Some(20));
        assert_eq!(state.user_of_connection(10), None);
        assert_eq!(state.user_of_connection(20), Some(1));
    }

    #[test]
    fn unbind_connection_forgets_both_directions() {
        let mut state = test_state();
        state.bind_connection(1, 10);
        assert_eq!(state.unbind_connection(10), Some(1));
        assert_eq!(state.connection_of(1), None);
        assert!(!state.is_online(1));
    }

    #[test]
    fn add_player_moves_a_user_out_of_its_previous_lobby() {
        let mut state = test_state();
        let first = state.create_lobby("first".into(), None);
        let second = state.create_lobby("second".into(), None);

        state.add_player(1, first);
        assert_eq!(state.lobby_player_count(first), 1);

        state.add_player(1, second);
        assert_eq!(state.lobby_player_count(first), 0);
        assert_eq!(state.lobby_player_count(second), 1);
        assert_eq!(state.lobby_of_player(1), Some(second));
    }

    #[test]
    fn all_ready_requires_every_member_and_at_least_one() {
        let mut state = test_state();
        let lobby_id = state.create_lobby("squad".into(), None);
        assert!(!state.all_ready(lobby_id));

        state.add_player(1, lobby_id);
        state.add_player(2, lobby_id);
        assert!(!state.all_ready(lobby_id));

        state.set_ready(1, true);
        assert!(!state.all_ready(lobby_id));
        state.set_ready(2, true);
        assert!(state.all_ready(lobby_id));

        state.set_ready(1, false);
        assert!(!state.all_ready(lobby_id));
    }

    #[test]
    fn list_open_lobbies_excludes_active_games_and_filters_by_search() {
        let mut state = test_state();
        let open = state.create_lobby("dragons".into(), None);
        let other = state.create_lobby("knights".into(), None);
        let playing = state.create_lobby("dragons in orbit".into(), None);
        state.get_lobby_mut(playing).unwrap().game_active = true;

        let all = state.list_open_lobbies(0, 10, "");
        assert_eq!(all.iter().map(|lobby| lobby.id).collect::<Vec<_>>(), vec![open, other]);

        let filtered = state.list_open_lobbies(0, 10, "DRAGON");
        assert_eq!(filtered.iter().map(|lobby| lobby.id).collect::<Vec<_>>(), vec![open]);
    }
}
