//! Enemy spawn system (spec §4.7): keeps the enemy population near
//! `ENEMY_DENSITY_PER_PLAYER * player_count`, spawning the deficit each tick
//! just outside the arena so new enemies drift in rather than appearing
//! underfoot.
//!
//! Grounded in `server/include/server/engine/systems/enemy_spawn_system.hpp`'s
//! population-target/spawn-deficit loop.

use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

use rtype_ecs::Engine;

use crate::components::AIState;
use crate::constants::{ARENA_SIZE, ENEMY_DENSITY_PER_PLAYER, ENEMY_SPAWN_MARGIN};
use crate::state::GameState;

pub fn install(engine: &mut Engine, state: Rc<RefCell<GameState>>) {
    engine.register_system(move |registry, _dt, _now| {
        let mut state = state.borrow_mut();
        let target = ENEMY_DENSITY_PER_PLAYER as usize * state.player_count();
        let deficit = target.saturating_sub(state.enemy_count());
        if deficit == 0 {
            return;
        }

        let mut rng = rand::thread_rng();
        for _ in 0..deficit {
            let (x, y) = spawn_position(&mut rng);
            state.add_enemy(registry, x, y, AIState::Pursue);
        }
    });
}

/// Samples a point in the arena's bounding box expanded by the spawn margin,
/// then pushes anything that landed inside the arena back out through the
/// nearest horizontal edge.
fn spawn_position<R: Rng>(rng: &mut R) -> (f32, f32) {
    let mut x = rng.gen_range(-ENEMY_SPAWN_MARGIN, ARENA_SIZE + ENEMY_SPAWN_MARGIN);
    let y = rng.gen_range(-ENEMY_SPAWN_MARGIN, ARENA_SIZE + ENEMY_SPAWN_MARGIN);

    if x >= 0.0 && x <= ARENA_SIZE && y >= 0.0 && y <= ARENA_SIZE {
        x = if x < ARENA_SIZE / 2.0 { -ENEMY_SPAWN_MARGIN } else { ARENA_SIZE + ENEMY_SPAWN_MARGIN };
    }

    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_position_never_lands_inside_the_arena() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let (x, y) = spawn_position(&mut rng);
            let inside = x >= 0.0 && x <= ARENA_SIZE && y >= 0.0 && y <= ARENA_SIZE;
            assert!(!inside, "spawned inside arena at ({}, {})", x, y);
        }
    }
}
