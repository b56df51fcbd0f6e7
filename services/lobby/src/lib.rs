//! The lobby domain library (spec §3.5, §4.9, §4.10, §6): authentication,
//! lobby/matchmaking state, persistence, game provisioning, and the
//! dispatcher wiring that turns packets into calls against all of the above.
//!
//! Grounded in `services/authenticator`'s role as the teacher's
//! out-of-band account/session service, generalized from its Rocket-HTTP
//! surface to the raw TCP/UDP transport this protocol uses everywhere else.

pub mod config;
pub mod db;
pub mod dispatch;
pub mod domain;
pub mod provisioning;
pub mod repository;
pub mod service;
pub mod state;

pub use config::LobbyConfig;
pub use dispatch::LobbyCtx;
pub use state::LobbyState;
