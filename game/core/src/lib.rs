//! The game server's domain crate (`SPEC_FULL.md` §0 `game/core`): component
//! definitions, the `GameState` tables sitting on top of the ECS `Registry`
//! (spec §3.4, §4.6), the simulation systems that run once per tick (spec
//! §4.7), and the dispatcher wiring that turns inbound packets and
//! connection-lifecycle events into calls against that state (spec §4.5,
//! §4.9's `PlayerInput`/`RegisterUdp`/`Ping` counterparts on the game side).
//!
//! `game/server` owns the tick loop and I/O threads; everything that knows
//! what a "player" or a "tick" actually *is* lives here instead, the same
//! split `gamecore`/`gamerunner` draw in the teacher.

pub mod components;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod state;
pub mod systems;

pub use config::GameConfig;
pub use state::GameState;
