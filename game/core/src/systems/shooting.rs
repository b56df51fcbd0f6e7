//! Player shooting system (spec §4.7): fires a projectile along the current
//! aim direction when `Shoot`/`AutoShoot` is held, the cooldown has elapsed,
//! and the aim vector isn't degenerate.
//!
//! Spawning a projectile mid-iteration would mutate the very registry the
//! zipper borrows, so each tick first collects `(x, y, dir_x, dir_y, owner)`
//! tuples for every player that fires, then spawns them afterwards —
//! mirroring `player_shooting_system.hpp`'s two-pass shape (gather firing
//! players, then `CreateProjectile` for each).

use rtype_ecs::Engine;
use rtype_protocol::payload::action;
use std::cell::RefCell;
use std::rc::Rc;

use crate::components::{InputState, LastShotTime, Player, Position};
use crate::constants::{MIN_AIM_MAGNITUDE, SHOOT_COOLDOWN_MS};
use crate::state::GameState;

struct Shot {
    owner: u8,
    x: f32,
    y: f32,
    dir_x: f32,
    dir_y: f32,
}

pub fn install(engine: &mut Engine, state: Rc<RefCell<GameState>>) {
    engine.register_system(move |registry, _dt, now| {
        let mut shots = Vec::new();
        {
            let mut zipper = registry.get_filtered_zipper::<(InputState, Position, LastShotTime, Player)>();
            while let Some((_, (input, pos, last_shot, player))) = zipper.next() {
                let wants_to_shoot = input.actions & (action::SHOOT | action::AUTO_SHOOT) != 0;
                if !wants_to_shoot {
                    continue;
                }
                if now.saturating_sub(last_shot.0) < SHOOT_COOLDOWN_MS {
                    continue;
                }
                let magnitude = (input.dir_x * input.dir_x + input.dir_y * input.dir_y).sqrt();
                if magnitude <= MIN_AIM_MAGNITUDE {
                    continue;
                }
                last_shot.0 = now;
                shots.push(Shot { owner: player.id, x: pos.x, y: pos.y, dir_x: input.dir_x, dir_y: input.dir_y });
            }
        }

        let mut state = state.borrow_mut();
        for shot in shots {
            state.add_projectile(registry, shot.owner, shot.x, shot.y, shot.dir_x, shot.dir_y);
        }
    });
}
