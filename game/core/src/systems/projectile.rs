//! Projectile movement system (spec §4.7): integrates position, marks dirty
//! on meaningful displacement, and despawns any projectile that leaves the
//! arena this tick.

use rtype_ecs::Engine;
use std::cell::RefCell;
use std::rc::Rc;

use crate::components::{DirtyFlag, Position, Projectile, Velocity};
use crate::constants::{ARENA_SIZE, DIRTY_EPSILON_SQ};
use crate::state::GameState;

pub fn install(engine: &mut Engine, state: Rc<RefCell<GameState>>) {
    engine.register_system(move |registry, dt, _now| {
        let mut left_arena = Vec::new();
        {
            let mut zipper = registry.get_filtered_zipper::<(Position, Velocity, DirtyFlag, Projectile)>();
            while let Some((_, (pos, vel, dirty, projectile))) = zipper.next() {
                let before = (pos.x, pos.y);
                pos.x += vel.x * dt;
                pos.y += vel.y * dt;

                let dx = pos.x - before.0;
                let dy = pos.y - before.1;
                dirty.0 = dx * dx + dy * dy > DIRTY_EPSILON_SQ;

                if pos.x < 0.0 || pos.x > ARENA_SIZE || pos.y < 0.0 || pos.y > ARENA_SIZE {
                    left_arena.push(projectile.id);
                }
            }
        }

        let mut state = state.borrow_mut();
        for id in left_arena {
            state.remove_projectile(registry, id);
        }
    });
}
