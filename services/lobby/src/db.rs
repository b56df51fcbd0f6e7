//! The single shared PostgreSQL connection (spec §5: "accessed synchronously
//! from a handler... acceptable because handlers run on the simulation/event
//! thread and DB is co-located"). One `postgres::Client`, owned by the lobby
//! processing thread and handed to the repositories as a shared `Rc<RefCell<_>>`
//! the same way `game/core` shares its `Registry`.

use std::cell::RefCell;
use std::rc::Rc;

use postgres::{Client, NoTls};
use rtype_common::error::{DomainError, DomainResult};
use slog::Logger;

/// Only `users` and `messages` are persisted (spec §6); lobbies and
/// lobby-players live purely in [`crate::state::LobbyState`].
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS messages (
    id SERIAL PRIMARY KEY,
    sender_id INTEGER NOT NULL REFERENCES users(id),
    recipient_id INTEGER NOT NULL REFERENCES users(id),
    content TEXT NOT NULL,
    sent_at BIGINT NOT NULL
);
";

pub type Db = Rc<RefCell<Client>>;

pub fn connect(url: &str, log: &Logger) -> DomainResult<Db> {
    let mut client = Client::connect(url, NoTls).map_err(|err| {
        slog::error!(log, "failed to connect to database"; "error" => %err);
        DomainError::Internal
    })?;
    client.batch_execute(SCHEMA).map_err(|err| {
        slog::error!(log, "failed to apply schema"; "error" => %err);
        DomainError::Internal
    })?;
    Ok(Rc::new(RefCell::new(client)))
}
