//! Enemy movement / AI system (spec §4.7): `Idle` enemies hold still,
//! `Attack` enemies hold still (melee damage is resolved by the collision
//! system), `Pursue` enemies chase the nearest player, re-targeting whenever
//! they have no target or their current target has left the game.
//!
//! Grounded in `server/include/server/engine/systems/enemy_movement_system.hpp`'s
//! "no target or target gone -> find nearest" retargeting rule.

use rtype_ecs::Engine;
use std::cell::RefCell;
use std::rc::Rc;

use crate::components::{AIState, DirtyFlag, Position, Target, Velocity};
use crate::constants::{DIRTY_EPSILON_SQ, ENEMY_SPEED, PURSUE_ARRIVAL_DISTANCE};
use crate::state::GameState;

pub fn install(engine: &mut Engine, state: Rc<RefCell<GameState>>) {
    engine.register_system(move |registry, dt, _now| {
        let players: Vec<(u8, f32, f32)> = {
            let state = state.borrow();
            state
                .player_entities
                .iter()
                .filter_map(|(&id, &entity)| registry.get_component::<Position>(entity).map(|p| (id, p.x, p.y)))
                .collect()
        };

        let mut zipper = registry.get_filtered_zipper::<(Position, Velocity, AIState, Target, DirtyFlag)>();
        while let Some((_, (pos, vel, ai_state, target, dirty))) = zipper.next() {
            let before = (pos.x, pos.y);

            match *ai_state {
                AIState::Idle | AIState::Attack => {
                    vel.x = 0.0;
                    vel.y = 0.0;
                }
                AIState::Pursue => {
                    let target_alive = target.0.map_or(false, |pid| players.iter().any(|&(id, _, _)| id == pid));
                    if !target_alive {
                        target.0 = nearest_player(pos.x, pos.y, &players);
                    }
                    steer_towards_target(pos.x, pos.y, target.0, &players, vel);
                }
            }

            pos.x += vel.x * dt;
            pos.y += vel.y * dt;

            let dx = pos.x - before.0;
            let dy = pos.y - before.1;
            dirty.0 = dx * dx + dy * dy > DIRTY_EPSILON_SQ;
        }
    });
}

fn nearest_player(x: f32, y: f32, players: &[(u8, f32, f32)]) -> Option<u8> {
    players
        .iter()
        .min_by(|&&(_, ax, ay), &&(_, bx, by)| {
            let da = (ax - x).powi(2) + (ay - y).powi(2);
            let db = (bx - x).powi(2) + (by - y).powi(2);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|&(id, _, _)| id)
}

fn steer_towards_target(x: f32, y: f32, target: Option<u8>, players: &[(u8, f32, f32)], vel: &mut Velocity) {
    let found = target.and_then(|pid| players.iter().find(|&&(id, _, _)| id == pid));
    match found {
        None => {
            vel.x = 0.0;
            vel.y = 0.0;
        }
        Some(&(_, tx, ty)) => {
            let dx = tx - x;
            let dy = ty - y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist <= PURSUE_ARRIVAL_DISTANCE {
                vel.x = 0.0;
                vel.y = 0.0;
            } else {
                vel.x = dx / dist * ENEMY_SPEED;
                vel.y = dy / dist * ENEMY_SPEED;
            }
        }
    }
}
