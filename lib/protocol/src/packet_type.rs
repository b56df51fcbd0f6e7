use rtype_common::{ErrorType, NetworkError};
use std::convert::TryFrom;

/// Wire packet type discriminant (spec §3.1: `type: enum32`). Values are
/// pinned explicitly since they round-trip across the network and must
/// never be renumbered by adding/removing variants in the middle.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum PacketType {
    Login = 1,
    Register = 2,
    LoginResponse = 3,
    RegisterResponse = 4,

    PlayerAssign = 5,
    PlayerInput = 6,
    UpdatePlayer = 7,
    UpdateProjectile = 8,
    UpdateEnemy = 9,
    RemovePlayer = 10,
    RemoveProjectile = 11,
    RemoveEnemy = 12,

    CreateLobby = 13,
    CreateLobbyResponse = 14,
    JoinLobby = 15,
    JoinLobbyResponse = 16,
    LeaveLobby = 17,
    LeaveLobbyResponse = 18,
    PlayerJoinedLobby = 19,
    PlayerLeftLobby = 20,
    PlayerReady = 21,
    LobbyPlayerReady = 22,
    GetLobbyList = 23,
    LobbyListResponse = 24,
    GetLobbyPlayers = 25,
    GetLobbyPlayersResponse = 26,
    GetUserList = 27,
    UserListResponse = 28,
    PrivateChatHistory = 29,
    PrivateChatHistoryResponse = 30,
    PrivateMessage = 31,
    PrivateMessageDelivered = 32,

    GameConnectionInfo = 33,
    RegisterUdp = 34,
    Ping = 35,
    Pong = 36,
}

pub const MAX_PACKET_TYPES: usize = 37;

impl PacketType {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for PacketType {
    type Error = NetworkError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use PacketType::*;
        Ok(match value {
            1 => Login,
            2 => Register,
            3 => LoginResponse,
            4 => RegisterResponse,
            5 => PlayerAssign,
            6 => PlayerInput,
            7 => UpdatePlayer,
            8 => UpdateProjectile,
            9 => UpdateEnemy,
            10 => RemovePlayer,
            11 => RemoveProjectile,
            12 => RemoveEnemy,
            13 => CreateLobby,
            14 => CreateLobbyResponse,
            15 => JoinLobby,
            16 => JoinLobbyResponse,
            17 => LeaveLobby,
            18 => LeaveLobbyResponse,
            19 => PlayerJoinedLobby,
            20 => PlayerLeftLobby,
            21 => PlayerReady,
            22 => LobbyPlayerReady,
            23 => GetLobbyList,
            24 => LobbyListResponse,
            25 => GetLobbyPlayers,
            26 => GetLobbyPlayersResponse,
            27 => GetUserList,
            28 => UserListResponse,
            29 => PrivateChatHistory,
            30 => PrivateChatHistoryResponse,
            31 => PrivateMessage,
            32 => PrivateMessageDelivered,
            33 => GameConnectionInfo,
            34 => RegisterUdp,
            35 => Ping,
            36 => Pong,
            _ => return Err(NetworkError::Fatal(ErrorType::UnknownPacketType)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_its_discriminant() {
        for raw in 1..MAX_PACKET_TYPES as u32 {
            let kind = PacketType::try_from(raw).expect("contiguous discriminant");
            assert_eq!(kind.as_u32(), raw);
        }
    }

    #[test]
    fn unknown_discriminant_is_rejected() {
        assert!(PacketType::try_from(0).is_err());
        assert!(PacketType::try_from(999).is_err());
    }
}
