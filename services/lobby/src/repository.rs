//! Postgres-backed repositories for the two persisted tables (spec §6).
//! Grounded in `examples/original_source/rtype-game/include/database/dao/`'s
//! `UserDao`/DAO-per-table split, flattened to one struct per table since
//! there is no ORM layer between the DAO and the raw SQL here.

use rtype_common::error::{DomainError, DomainResult};

use crate::db::Db;
use crate::domain::{Message, User};

#[derive(Clone)]
pub struct UserRepository {
    db: Db,
}

impl UserRepository {
    pub fn new(db: Db) -> UserRepository {
        UserRepository { db }
    }

    pub fn find_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let row = self
            .db
            .borrow_mut()
            .query_opt("SELECT id, username, password_hash FROM users WHERE username = $1", &[&username])
            .map_err(|_| DomainError::Internal)?;
        Ok(row.map(|row| User { id: row.get(0), username: row.get(1), password_hash: row.get(2) }))
    }

    pub fn find_by_id(&self, id: i32) -> DomainResult<Option<User>> {
        let row = self
            .db
            .borrow_mut()
            .query_opt("SELECT id, username, password_hash FROM users WHERE id = $1", &[&id])
            .map_err(|_| DomainError::Internal)?;
        Ok(row.map(|row| User { id: row.get(0), username: row.get(1), password_hash: row.get(2) }))
    }

    /// Returns `true` iff `username` is already taken.
    pub fn exists(&self, username: &str) -> DomainResult<bool> {
        Ok(self.find_by_username(username)?.is_some())
    }

    pub fn insert(&self, username: &str, password_hash: &str) -> DomainResult<User> {
        let row = self
            .db
            .borrow_mut()
            .query_one(
                "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id",
                &[&username, &password_hash],
            )
            .map_err(|_| DomainError::Internal)?;
        Ok(User { id: row.get(0), username: username.to_owned(), password_hash: password_hash.to_owned() })
    }

    /// Paginated listing for `GetUserList` (spec §4.9), optionally filtered
    /// by a case-insensitive substring match on `username`.
    pub fn list(&self, offset: u32, limit: u32, search: &str) -> DomainResult<Vec<User>> {
        let pattern = format!("%{}%", search);
        let rows = self
            .db
            .borrow_mut()
            .query(
                "SELECT id, username, password_hash FROM users WHERE username ILIKE $1 \
                 ORDER BY id OFFSET $2 LIMIT $3",
                &[&pattern, &(offset as i64), &(limit as i64)],
            )
            .map_err(|_| DomainError::Internal)?;
        Ok(rows.into_iter().map(|row| User { id: row.get(0), username: row.get(1), password_hash: row.get(2) }).collect())
    }
}

#[derive(Clone)]
pub struct MessageRepository {
    db: Db,
}

impl MessageRepository {
    pub fn new(db: Db) -> MessageRepository {
        MessageRepository { db }
    }

    pub fn insert(&self, sender_id: i32, recipient_id: i32, content: &str, sent_at_ms: u64) -> DomainResult<Message> {
        let row = self
            .db
            .borrow_mut()
            .query_one(
                "INSERT INTO messages (sender_id, recipient_id, content, sent_at) VALUES ($1, $2, $3, $4) \
                 RETURNING id",
                &[&sender_id, &recipient_id, &content, &(sent_at_ms as i64)],
            )
            .map_err(|_| DomainError::Internal)?;
        Ok(Message { id: row.get(0), sender_id, recipient_id, content: content.to_owned(), sent_at_ms })
    }

    /// All messages exchanged between the two users, ordered by `sent_at`
    /// (spec §4.9 `PrivateChatHistory`).
    pub fn history_between(&self, a: i32, b: i32) -> DomainResult<Vec<Message>> {
        let rows = self
            .db
            .borrow_mut()
            .query(
                "SELECT id, sender_id, recipient_id, content, sent_at FROM messages \
                 WHERE (sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1) \
                 ORDER BY sent_at ASC",
                &[&a, &b],
            )
            .map_err(|_| DomainError::Internal)?;
        Ok(rows
            .into_iter()
            .map(|row| Message {
                id: row.get(0),
                sender_id: row.get(1),
                recipient_id: row.get(2),
                content: row.get(3),
                sent_at_ms: row.get::<_, i64>(4) as u64,
            })
            .collect())
    }
}
