//! Typed wire payloads (spec §3.2), each a fixed-layout, little-endian
//! encoding implementing [`Encode`]/[`Decode`]/[`FixedSize`].

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rtype_common::NetworkResult;
use std::io::Cursor;

use crate::codec::{Decode, Encode, FixedSize};
use crate::strings::{expect_len, read_fixed, write_fixed};

/// Action bitmask values carried in [`PlayerInput::actions`] (spec §3.2).
pub mod action {
    pub const MOVE_UP: u16 = 1;
    pub const MOVE_DOWN: u16 = 2;
    pub const MOVE_LEFT: u16 = 4;
    pub const MOVE_RIGHT: u16 = 8;
    pub const SHOOT: u16 = 16;
    pub const AUTO_SHOOT: u16 = 32;
}

macro_rules! fixed_size {
    ($ty:ty, $size:expr) => {
        impl FixedSize for $ty {
            const SIZE: usize = $size;
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginPacket {
    pub username: String,
    pub password: String,
}
fixed_size!(LoginPacket, 64);

impl Encode for LoginPacket {
    fn encode(&self, out: &mut Vec<u8>) {
        write_fixed(out, &self.username, 32);
        write_fixed(out, &self.password, 32);
    }
}
impl Decode for LoginPacket {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        Ok(LoginPacket { username: read_fixed(&data[0..32]), password: read_fixed(&data[32..64]) })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegisterPacket {
    pub username: String,
    pub password: String,
}
fixed_size!(RegisterPacket, 64);

impl Encode for RegisterPacket {
    fn encode(&self, out: &mut Vec<u8>) {
        write_fixed(out, &self.username, 32);
        write_fixed(out, &self.password, 32);
    }
}
impl Decode for RegisterPacket {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        Ok(RegisterPacket { username: read_fixed(&data[0..32]), password: read_fixed(&data[32..64]) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerAssign {
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub score: u16,
    pub player_id: u8,
    pub health: u8,
}
fixed_size!(PlayerAssign, 12);

impl Encode for PlayerAssign {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_f32::<LittleEndian>(self.spawn_x).unwrap();
        out.write_f32::<LittleEndian>(self.spawn_y).unwrap();
        out.write_u16::<LittleEndian>(self.score).unwrap();
        out.push(self.player_id);
        out.push(self.health);
    }
}
impl Decode for PlayerAssign {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        let spawn_x = c.read_f32::<LittleEndian>()?;
        let spawn_y = c.read_f32::<LittleEndian>()?;
        let score = c.read_u16::<LittleEndian>()?;
        let player_id = c.read_u8()?;
        let health = c.read_u8()?;
        Ok(PlayerAssign { spawn_x, spawn_y, score, player_id, health })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerInput {
    pub player_id: u8,
    pub actions: u16,
    pub dir_x: f32,
    pub dir_y: f32,
}
fixed_size!(PlayerInput, 11);

impl Encode for PlayerInput {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.player_id);
        out.write_u16::<LittleEndian>(self.actions).unwrap();
        out.write_f32::<LittleEndian>(self.dir_x).unwrap();
        out.write_f32::<LittleEndian>(self.dir_y).unwrap();
    }
}
impl Decode for PlayerInput {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        let player_id = c.read_u8()?;
        let actions = c.read_u16::<LittleEndian>()?;
        let dir_x = c.read_f32::<LittleEndian>()?;
        let dir_y = c.read_f32::<LittleEndian>()?;
        Ok(PlayerInput { player_id, actions, dir_x, dir_y })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdatePlayer {
    pub player_id: u8,
    pub x: f32,
    pub y: f32,
    pub score: u16,
    pub health: u8,
}
fixed_size!(UpdatePlayer, 12);

impl Encode for UpdatePlayer {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.player_id);
        out.write_f32::<LittleEndian>(self.x).unwrap();
        out.write_f32::<LittleEndian>(self.y).unwrap();
        out.write_u16::<LittleEndian>(self.score).unwrap();
        out.push(self.health);
    }
}
impl Decode for UpdatePlayer {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        let player_id = c.read_u8()?;
        let x = c.read_f32::<LittleEndian>()?;
        let y = c.read_f32::<LittleEndian>()?;
        let score = c.read_u16::<LittleEndian>()?;
        let health = c.read_u8()?;
        Ok(UpdatePlayer { player_id, x, y, score, health })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateProjectile {
    pub projectile_id: u8,
    pub owner_id: u8,
    pub x: f32,
    pub y: f32,
}
fixed_size!(UpdateProjectile, 10);

impl Encode for UpdateProjectile {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.projectile_id);
        out.push(self.owner_id);
        out.write_f32::<LittleEndian>(self.x).unwrap();
        out.write_f32::<LittleEndian>(self.y).unwrap();
    }
}
impl Decode for UpdateProjectile {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        let projectile_id = c.read_u8()?;
        let owner_id = c.read_u8()?;
        let x = c.read_f32::<LittleEndian>()?;
        let y = c.read_f32::<LittleEndian>()?;
        Ok(UpdateProjectile { projectile_id, owner_id, x, y })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateEnemy {
    pub enemy_id: u8,
    pub x: f32,
    pub y: f32,
}
fixed_size!(UpdateEnemy, 9);

impl Encode for UpdateEnemy {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.enemy_id);
        out.write_f32::<LittleEndian>(self.x).unwrap();
        out.write_f32::<LittleEndian>(self.y).unwrap();
    }
}
impl Decode for UpdateEnemy {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        let enemy_id = c.read_u8()?;
        let x = c.read_f32::<LittleEndian>()?;
        let y = c.read_f32::<LittleEndian>()?;
        Ok(UpdateEnemy { enemy_id, x, y })
    }
}

/// Broadcast when an entity leaves the simulation (spec §4.6). One shape
/// shared by players/projectiles/enemies since all three only ever carry an
/// 8-bit id on removal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoveEntity {
    pub id: u8,
}
fixed_size!(RemoveEntity, 1);

impl Encode for RemoveEntity {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.id);
    }
}
impl Decode for RemoveEntity {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        Ok(RemoveEntity { id: data[0] })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateLobby {
    pub name: String,
    pub password: String,
}
fixed_size!(CreateLobby, 64);

impl Encode for CreateLobby {
    fn encode(&self, out: &mut Vec<u8>) {
        write_fixed(out, &self.name, 32);
        write_fixed(out, &self.password, 32);
    }
}
impl Decode for CreateLobby {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        Ok(CreateLobby { name: read_fixed(&data[0..32]), password: read_fixed(&data[32..64]) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusResponse {
    pub status: i32,
}
fixed_size!(StatusResponse, 4);

impl Encode for StatusResponse {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.status).unwrap();
    }
}
impl Decode for StatusResponse {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        Ok(StatusResponse { status: c.read_i32::<LittleEndian>()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoginResponse {
    pub status: i32,
    pub user_id: i32,
}
fixed_size!(LoginResponse, 8);

impl Encode for LoginResponse {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.status).unwrap();
        out.write_i32::<LittleEndian>(self.user_id).unwrap();
    }
}
impl Decode for LoginResponse {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        let status = c.read_i32::<LittleEndian>()?;
        let user_id = c.read_i32::<LittleEndian>()?;
        Ok(LoginResponse { status, user_id })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreateLobbyResponse {
    pub status: i32,
    pub lobby_id: i32,
}
fixed_size!(CreateLobbyResponse, 8);

impl Encode for CreateLobbyResponse {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.status).unwrap();
        out.write_i32::<LittleEndian>(self.lobby_id).unwrap();
    }
}
impl Decode for CreateLobbyResponse {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        let status = c.read_i32::<LittleEndian>()?;
        let lobby_id = c.read_i32::<LittleEndian>()?;
        Ok(CreateLobbyResponse { status, lobby_id })
    }
}

/// `{lobby_id: i32; password[32]}` (spec §3.2).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinLobby {
    pub lobby_id: i32,
    pub password: String,
}
fixed_size!(JoinLobby, 36);

impl Encode for JoinLobby {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.lobby_id).unwrap();
        write_fixed(out, &self.password, 32);
    }
}
impl Decode for JoinLobby {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..4]);
        let lobby_id = c.read_i32::<LittleEndian>()?;
        Ok(JoinLobby { lobby_id, password: read_fixed(&data[4..36]) })
    }
}

/// Broadcast to every other lobby member when someone joins (spec §4.9).
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerJoinedLobby {
    pub player_id: i32,
    pub username: String,
}
fixed_size!(PlayerJoinedLobby, 36);

impl Encode for PlayerJoinedLobby {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.player_id).unwrap();
        write_fixed(out, &self.username, 32);
    }
}
impl Decode for PlayerJoinedLobby {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..4]);
        let player_id = c.read_i32::<LittleEndian>()?;
        Ok(PlayerJoinedLobby { player_id, username: read_fixed(&data[4..36]) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerLeftLobby {
    pub player_id: i32,
}
fixed_size!(PlayerLeftLobby, 4);

impl Encode for PlayerLeftLobby {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.player_id).unwrap();
    }
}
impl Decode for PlayerLeftLobby {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        Ok(PlayerLeftLobby { player_id: c.read_i32::<LittleEndian>()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerReady {
    pub is_ready: bool,
}
fixed_size!(PlayerReady, 1);

impl Encode for PlayerReady {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.is_ready as u8);
    }
}
impl Decode for PlayerReady {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        Ok(PlayerReady { is_ready: data[0] != 0 })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobbyPlayerReady {
    pub player_id: i32,
    pub is_ready: bool,
}
fixed_size!(LobbyPlayerReady, 5);

impl Encode for LobbyPlayerReady {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.player_id).unwrap();
        out.push(self.is_ready as u8);
    }
}
impl Decode for LobbyPlayerReady {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..4]);
        let player_id = c.read_i32::<LittleEndian>()?;
        Ok(LobbyPlayerReady { player_id, is_ready: data[4] != 0 })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetLobbyList {
    pub offset: u32,
    pub limit: u32,
    pub search: String,
}
fixed_size!(GetLobbyList, 40);

impl Encode for GetLobbyList {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.offset).unwrap();
        out.write_u32::<LittleEndian>(self.limit).unwrap();
        write_fixed(out, &self.search, 32);
    }
}
impl Decode for GetLobbyList {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..8]);
        let offset = c.read_u32::<LittleEndian>()?;
        let limit = c.read_u32::<LittleEndian>()?;
        Ok(GetLobbyList { offset, limit, search: read_fixed(&data[8..40]) })
    }
}

/// One entry of the packed array following [`LobbyListResponse::status`].
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyListEntry {
    pub id: i32,
    pub name: String,
    pub has_password: bool,
}
fixed_size!(LobbyListEntry, 37);

impl Encode for LobbyListEntry {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.id).unwrap();
        write_fixed(out, &self.name, 32);
        out.push(self.has_password as u8);
    }
}
impl Decode for LobbyListEntry {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..4]);
        let id = c.read_i32::<LittleEndian>()?;
        Ok(LobbyListEntry { id, name: read_fixed(&data[4..36]), has_password: data[36] != 0 })
    }
}

/// `{status: i32}` followed by a packed array of [`LobbyListEntry`] (spec
/// §3.2). Variable length, so it is encoded/decoded as a whole rather than
/// through the generic `extract`/`extract_array` helpers.
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyListResponse {
    pub status: i32,
    pub lobbies: Vec<LobbyListEntry>,
}

impl LobbyListResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.status).unwrap();
        for entry in &self.lobbies {
            entry.encode(&mut out);
        }
        out
    }

    pub fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, 4)?;
        let mut c = Cursor::new(&data[0..4]);
        let status = c.read_i32::<LittleEndian>()?;
        let rest = &data[4..];
        let lobbies = crate::codec::extract_array::<LobbyListEntry>(rest)?;
        Ok(LobbyListResponse { status, lobbies })
    }
}

/// One entry of [`GetLobbyPlayersResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct LobbyPlayerEntry {
    pub player_id: i32,
    pub username: String,
    pub is_ready: bool,
}
fixed_size!(LobbyPlayerEntry, 37);

impl Encode for LobbyPlayerEntry {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.player_id).unwrap();
        write_fixed(out, &self.username, 32);
        out.push(self.is_ready as u8);
    }
}
impl Decode for LobbyPlayerEntry {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..4]);
        let player_id = c.read_i32::<LittleEndian>()?;
        Ok(LobbyPlayerEntry { player_id, username: read_fixed(&data[4..36]), is_ready: data[36] != 0 })
    }
}

/// `{status: i32}` followed by a packed array of [`LobbyPlayerEntry`] (spec
/// §4.9 `GetLobbyPlayers`). Variable length, encoded/decoded as a whole like
/// [`LobbyListResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct GetLobbyPlayersResponse {
    pub status: i32,
    pub players: Vec<LobbyPlayerEntry>,
}

impl GetLobbyPlayersResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.status).unwrap();
        for entry in &self.players {
            entry.encode(&mut out);
        }
        out
    }

    pub fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, 4)?;
        let mut c = Cursor::new(&data[0..4]);
        let status = c.read_i32::<LittleEndian>()?;
        let players = crate::codec::extract_array::<LobbyPlayerEntry>(&data[4..])?;
        Ok(GetLobbyPlayersResponse { status, players })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GetLobbyPlayers {
    pub lobby_id: i32,
}
fixed_size!(GetLobbyPlayers, 4);

impl Encode for GetLobbyPlayers {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.lobby_id).unwrap();
    }
}
impl Decode for GetLobbyPlayers {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        Ok(GetLobbyPlayers { lobby_id: c.read_i32::<LittleEndian>()? })
    }
}

/// One entry of [`UserListResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct UserListEntry {
    pub user_id: i32,
    pub username: String,
    pub is_online: bool,
}
fixed_size!(UserListEntry, 37);

impl Encode for UserListEntry {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.user_id).unwrap();
        write_fixed(out, &self.username, 32);
        out.push(self.is_online as u8);
    }
}
impl Decode for UserListEntry {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..4]);
        let user_id = c.read_i32::<LittleEndian>()?;
        Ok(UserListEntry { user_id, username: read_fixed(&data[4..36]), is_online: data[36] != 0 })
    }
}

/// `{status: i32}` followed by a packed array of [`UserListEntry`] (spec
/// §4.9 `GetUserList`).
#[derive(Debug, Clone, PartialEq)]
pub struct UserListResponse {
    pub status: i32,
    pub users: Vec<UserListEntry>,
}

impl UserListResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_i32::<LittleEndian>(self.status).unwrap();
        for entry in &self.users {
            entry.encode(&mut out);
        }
        out
    }

    pub fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, 4)?;
        let mut c = Cursor::new(&data[0..4]);
        let status = c.read_i32::<LittleEndian>()?;
        let users = crate::codec::extract_array::<UserListEntry>(&data[4..])?;
        Ok(UserListResponse { status, users })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetUserList {
    pub offset: u32,
    pub limit: u32,
    pub search: String,
}
fixed_size!(GetUserList, 40);

impl Encode for GetUserList {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.offset).unwrap();
        out.write_u32::<LittleEndian>(self.limit).unwrap();
        write_fixed(out, &self.search, 32);
    }
}
impl Decode for GetUserList {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..8]);
        let offset = c.read_u32::<LittleEndian>()?;
        let limit = c.read_u32::<LittleEndian>()?;
        Ok(GetUserList { offset, limit, search: read_fixed(&data[8..40]) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivateChatHistory {
    pub target_user_id: i32,
}
fixed_size!(PrivateChatHistory, 4);

impl Encode for PrivateChatHistory {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.target_user_id).unwrap();
    }
}
impl Decode for PrivateChatHistory {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        Ok(PrivateChatHistory { target_user_id: c.read_i32::<LittleEndian>()? })
    }
}

/// One persisted chat message (spec §3.5 `Message`), on the wire both as a
/// single delivery ([`PrivateMessageDelivered`]) and as an array entry of
/// [`PrivateChatHistoryResponse`].
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEntry {
    pub id: i32,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub content: String,
    pub sent_at_ms: u64,
}
fixed_size!(MessageEntry, 276);

impl Encode for MessageEntry {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.id).unwrap();
        out.write_i32::<LittleEndian>(self.sender_id).unwrap();
        out.write_i32::<LittleEndian>(self.recipient_id).unwrap();
        write_fixed(out, &self.content, 256);
        out.write_u64::<LittleEndian>(self.sent_at_ms).unwrap();
    }
}
impl Decode for MessageEntry {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..12]);
        let id = c.read_i32::<LittleEndian>()?;
        let sender_id = c.read_i32::<LittleEndian>()?;
        let recipient_id = c.read_i32::<LittleEndian>()?;
        let content = read_fixed(&data[12..268]);
        let mut tail = Cursor::new(&data[268..276]);
        let sent_at_ms = tail.read_u64::<LittleEndian>()?;
        Ok(MessageEntry { id, sender_id, recipient_id, content, sent_at_ms })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivateChatHistoryResponse {
    pub messages: Vec<MessageEntry>,
}

impl PrivateChatHistoryResponse {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.messages {
            entry.encode(&mut out);
        }
        out
    }

    pub fn decode(data: &[u8]) -> NetworkResult<Self> {
        Ok(PrivateChatHistoryResponse { messages: crate::codec::extract_array::<MessageEntry>(data)? })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrivateMessage {
    pub recipient_id: i32,
    pub content: String,
}
fixed_size!(PrivateMessage, 260);

impl Encode for PrivateMessage {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_i32::<LittleEndian>(self.recipient_id).unwrap();
        write_fixed(out, &self.content, 256);
    }
}
impl Decode for PrivateMessage {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(&data[0..4]);
        let recipient_id = c.read_i32::<LittleEndian>()?;
        Ok(PrivateMessage { recipient_id, content: read_fixed(&data[4..260]) })
    }
}

/// `{ip[64]; ports[16]: i32}` (spec §3.2). `ports` is fixed at 16 slots on
/// the wire; only the first two (tcp, udp) are populated (spec §4.10).
#[derive(Debug, Clone, PartialEq)]
pub struct GameConnectionInfo {
    pub ip: String,
    pub tcp_port: i32,
    pub udp_port: i32,
}
fixed_size!(GameConnectionInfo, 128);

const GAME_CONNECTION_PORTS: usize = 16;

impl Encode for GameConnectionInfo {
    fn encode(&self, out: &mut Vec<u8>) {
        write_fixed(out, &self.ip, 64);
        out.write_i32::<LittleEndian>(self.tcp_port).unwrap();
        out.write_i32::<LittleEndian>(self.udp_port).unwrap();
        for _ in 2..GAME_CONNECTION_PORTS {
            out.write_i32::<LittleEndian>(0).unwrap();
        }
    }
}
impl Decode for GameConnectionInfo {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let ip = read_fixed(&data[0..64]);
        let mut c = Cursor::new(&data[64..72]);
        let tcp_port = c.read_i32::<LittleEndian>()?;
        let udp_port = c.read_i32::<LittleEndian>()?;
        Ok(GameConnectionInfo { ip, tcp_port, udp_port })
    }
}

/// Sent once over TCP so the lobby/game server can associate this
/// connection's authenticated identity with the UDP datagrams that follow
/// (spec §9 open question; decision recorded in `SPEC_FULL.md`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterUdp;
fixed_size!(RegisterUdp, 0);

impl Encode for RegisterUdp {
    fn encode(&self, _out: &mut Vec<u8>) {}
}
impl Decode for RegisterUdp {
    fn decode(_data: &[u8]) -> NetworkResult<Self> {
        Ok(RegisterUdp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingPacket {
    pub timestamp_ms: u32,
}
fixed_size!(PingPacket, 4);

impl Encode for PingPacket {
    fn encode(&self, out: &mut Vec<u8>) {
        out.write_u32::<LittleEndian>(self.timestamp_ms).unwrap();
    }
}
impl Decode for PingPacket {
    fn decode(data: &[u8]) -> NetworkResult<Self> {
        expect_len(data, Self::SIZE)?;
        let mut c = Cursor::new(data);
        Ok(PingPacket { timestamp_ms: c.read_u32::<LittleEndian>()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_packet_round_trips_and_truncates_padding() {
        let pkt = LoginPacket { username: "alice".into(), password: "hunter2".into() };
        let mut bytes = Vec::new();
        pkt.encode(&mut bytes);
        assert_eq!(bytes.len(), LoginPacket::SIZE);
        assert_eq!(LoginPacket::decode(&bytes).unwrap(), pkt);
    }

    #[test]
    fn player_input_round_trips() {
        let pkt = PlayerInput { player_id: 3, actions: action::MOVE_RIGHT | action::SHOOT, dir_x: 1.0, dir_y: 0.0 };
        let mut bytes = Vec::new();
        pkt.encode(&mut bytes);
        assert_eq!(PlayerInput::decode(&bytes).unwrap(), pkt);
    }

    #[test]
    fn lobby_list_response_round_trips_with_variable_entries() {
        let resp = LobbyListResponse {
            status: 200,
            lobbies: vec![
                LobbyListEntry { id: 1, name: "one".into(), has_password: false },
                LobbyListEntry { id: 2, name: "two".into(), has_password: true },
            ],
        };
        let bytes = resp.encode();
        assert_eq!(LobbyListResponse::decode(&bytes).unwrap(), resp);
    }

    #[test]
    fn decode_rejects_undersized_body() {
        assert!(PlayerAssign::decode(&[0u8; 4]).is_err());
    }
}
