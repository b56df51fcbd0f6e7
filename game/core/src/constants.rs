//! Tunable simulation constants (spec §4.7). Kept as one place for every
//! magic number the systems reference, resolving the spec's own client/server
//! arena-size ambiguity (§9) in favor of a single authoritative value.

/// Arena extent on each axis, in pixels. One value used uniformly for
/// movement clamping, collision bounds and enemy spawn margins (spec §9
/// open question; decision recorded in `SPEC_FULL.md` §3).
pub const ARENA_SIZE: f32 = 2000.0;

pub const FRICTION: f32 = 0.9;
pub const PLAYER_ACCEL: f32 = 22_000.0;
pub const PLAYER_MAX_SPEED: f32 = 2_200.0;
/// Squared displacement threshold above which an entity's move this tick is
/// considered significant enough to set its `DirtyFlag` (spec §4.7, §8).
pub const DIRTY_EPSILON_SQ: f32 = 1e-4;

pub const PROJECTILE_SPEED: f32 = 1_240.0;
pub const PROJECTILE_DAMAGE: i32 = 50;
pub const PROJECTILE_RADIUS: f32 = 5.0;

pub const SHOOT_COOLDOWN_MS: u64 = 200;
/// Minimum aim vector magnitude for a shot to fire (spec §4.7: "`|dir| >
/// 0.01`").
pub const MIN_AIM_MAGNITUDE: f32 = 0.01;

pub const ENEMY_SPEED: f32 = 200.0;
pub const ENEMY_RADIUS: f32 = 30.0;
pub const ENEMY_MELEE_DAMAGE: i32 = 20;
pub const ENEMY_KILL_SCORE: u16 = 10;
/// Enemy target population is this many times the current player count
/// (spec §4.7's "enemy spawn").
pub const ENEMY_DENSITY_PER_PLAYER: usize = 30;
/// Margin outside the arena enemies spawn into, then get clamped back out of
/// the arena proper (spec §4.7).
pub const ENEMY_SPAWN_MARGIN: f32 = 50.0;
/// `Target` is cleared once the pursuer is within this distance of it.
pub const PURSUE_ARRIVAL_DISTANCE: f32 = 1.0;

pub const PLAYER_STARTING_HEALTH: i32 = 100;
pub const ENEMY_STARTING_HEALTH: i32 = 100;
/// Spec §4.7 names player/enemy/projectile shapes but not the player's own
/// collision radius; we give players the same circle the original uses for
/// its on-screen sprite hitbox (noted as an inference in `DESIGN.md`).
pub const PLAYER_RADIUS: f32 = 20.0;

pub const TICK_PERIOD_MS: u64 = 8;
pub const FULL_SNAPSHOT_EVERY_TICKS: u64 = 4;
/// Per-tick inbound packet drain budget (spec §4.8, step 1).
pub const INBOUND_BUDGET_PACKETS: usize = 50;
pub const INBOUND_BUDGET_MS: u64 = 10;
