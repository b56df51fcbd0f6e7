//! Player movement system (spec §4.7, first in tick order): friction,
//! input-driven acceleration, speed clamp, arena-bounded integration.

use rtype_ecs::Engine;
use rtype_protocol::payload::action;

use crate::components::{DirtyFlag, InputState, Position, Velocity};
use crate::constants::{ARENA_SIZE, DIRTY_EPSILON_SQ, FRICTION, PLAYER_ACCEL, PLAYER_MAX_SPEED};

pub fn install(engine: &mut Engine) {
    engine.register_system(move |registry, dt, _now| {
        let mut zipper = registry.get_filtered_zipper::<(Position, Velocity, InputState, DirtyFlag)>();
        while let Some((_, (pos, vel, input, dirty))) = zipper.next() {
            let before = (pos.x, pos.y);

            let left = input.actions & action::MOVE_LEFT != 0;
            let right = input.actions & action::MOVE_RIGHT != 0;
            let up = input.actions & action::MOVE_UP != 0;
            let down = input.actions & action::MOVE_DOWN != 0;

            vel.x = apply_axis(vel.x, left, right, dt);
            vel.y = apply_axis(vel.y, up, down, dt);

            let speed = (vel.x * vel.x + vel.y * vel.y).sqrt();
            if speed > PLAYER_MAX_SPEED {
                let scale = PLAYER_MAX_SPEED / speed;
                vel.x *= scale;
                vel.y *= scale;
            }

            pos.x += vel.x * dt;
            pos.y += vel.y * dt;

            if pos.x < 0.0 {
                pos.x = 0.0;
                vel.x = 0.0;
            } else if pos.x > ARENA_SIZE {
                pos.x = ARENA_SIZE;
                vel.x = 0.0;
            }
            if pos.y < 0.0 {
                pos.y = 0.0;
                vel.y = 0.0;
            } else if pos.y > ARENA_SIZE {
                pos.y = ARENA_SIZE;
                vel.y = 0.0;
            }

            let dx = pos.x - before.0;
            let dy = pos.y - before.1;
            dirty.0 = dx * dx + dy * dy > DIRTY_EPSILON_SQ;
        }
    });
}

/// A pressed pair on the same axis cancels to friction-only; a single
/// pressed direction accelerates for `dt` seconds (spec §4.7).
fn apply_axis(v: f32, neg: bool, pos: bool, dt: f32) -> f32 {
    if neg == pos {
        v * FRICTION
    } else if pos {
        v + PLAYER_ACCEL * dt
    } else {
        v - PLAYER_ACCEL * dt
    }
}
