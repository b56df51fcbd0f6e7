//! Lobby domain entities (spec §3.5). Grounded in
//! `examples/original_source/rtype-game/include/domain/entities/` — the
//! teacher's `authenticator` crate never had a lobby/user domain of its own
//! (it modelled serial-key bans instead), so these are new types rather than
//! a generalization of an existing one.

/// A registered account. Persisted in the `users` table (spec §6); only
/// `password_hash` ever touches disk, never the plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
}

/// An in-memory-only lobby (spec §6: "Lobbies and lobby-players are
/// in-memory only"). `password_hash` is `None` for an open lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    pub id: i32,
    pub name: String,
    pub password_hash: Option<String>,
    pub game_active: bool,
}

impl Lobby {
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Membership of a user in a lobby. Each user belongs to at most one lobby
/// at a time (spec §3.5 invariant, enforced by [`crate::state::LobbyState`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LobbyPlayer {
    pub user_id: i32,
    pub lobby_id: i32,
    pub is_ready: bool,
}

/// A persisted private message (`messages` table, spec §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub content: String,
    pub sent_at_ms: u64,
}
