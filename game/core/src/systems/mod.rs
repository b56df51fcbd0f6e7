//! Simulation systems, registered in tick order (spec §4.7): movement, enemy
//! movement, projectile movement, player shooting, collision, enemy spawn.

pub mod collision;
pub mod enemy_ai;
pub mod movement;
pub mod projectile;
pub mod shooting;
pub mod spawn;

use std::cell::RefCell;
use std::rc::Rc;

use rtype_ecs::Engine;

use crate::state::GameState;

/// Wires every system onto `engine` in the order the tick loop must run them.
pub fn install_all(engine: &mut Engine, state: Rc<RefCell<GameState>>) {
    movement::install(engine);
    enemy_ai::install(engine, Rc::clone(&state));
    projectile::install(engine, Rc::clone(&state));
    shooting::install(engine, Rc::clone(&state));
    collision::install(engine, Rc::clone(&state));
    spawn::install(engine, state);
}
