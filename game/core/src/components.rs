//! ECS components for the simulation (spec §3.4, §4.6, §4.7).

/// World-space position in pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// The last `PlayerInput` received for this entity, applied continuously by
/// the movement/shooting systems until a newer one replaces it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    pub actions: u16,
    pub dir_x: f32,
    pub dir_y: f32,
}

/// Signed so collision resolution can drive it below zero before the
/// "health <= 0" check removes the entity; wire payloads clamp to `u8`.
#[derive(Debug, Clone, Copy)]
pub struct Health(pub i32);

#[derive(Debug, Clone, Copy)]
pub struct DirtyFlag(pub bool);

/// Milliseconds (simulation clock) of the last shot fired by this entity.
#[derive(Debug, Clone, Copy)]
pub struct LastShotTime(pub u64);

#[derive(Debug, Clone, Copy)]
pub struct Player {
    pub id: u8,
    pub score: u16,
}

#[derive(Debug, Clone, Copy)]
pub struct Projectile {
    pub id: u8,
    pub owner_id: u8,
    pub damage: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct Enemy {
    pub id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AIState {
    Idle,
    Pursue,
    Attack,
}

/// The player currently being pursued, by id. `None` until the pursuit
/// system picks a nearest target (spec §4.7's "Enemy movement").
#[derive(Debug, Clone, Copy, Default)]
pub struct Target(pub Option<u8>);

/// Collision shapes (spec §4.7). Circle/Rectangle overlap tests live in
/// `systems::collision`.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
}
