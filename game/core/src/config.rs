//! Game server configuration (spec §6 CLI surface, `SPEC_FULL.md` §1.3),
//! loaded from TOML via `serdeconv` the way `gamecore::config` always has.

use serde_derive::{Deserialize, Serialize};

use crate::constants::{FULL_SNAPSHOT_EVERY_TICKS, TICK_PERIOD_MS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub tcp_port: u16,
    pub udp_port: u16,
    pub max_clients: usize,
}

impl Default for Server {
    fn default() -> Server {
        Server { tcp_port: 4242, udp_port: 4243, max_clients: 64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub tick_ms: u64,
    pub full_snapshot_every: u64,
}

impl Default for Game {
    fn default() -> Game {
        Game { tick_ms: TICK_PERIOD_MS, full_snapshot_every: FULL_SNAPSHOT_EVERY_TICKS }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameConfig {
    pub server: Server,
    pub game: Game,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let toml = serdeconv::to_toml_string(&GameConfig::default()).unwrap();
        let parsed: GameConfig = serdeconv::from_toml_str(&toml).unwrap();
        assert_eq!(parsed.server.tcp_port, GameConfig::default().server.tcp_port);
    }
}
