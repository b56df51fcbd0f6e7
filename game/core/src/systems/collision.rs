//! Collision system (spec §4.7): circle/circle, rect/rect and circle/rect
//! overlap tests, then damage resolution. Projectile-vs-enemy pairs resolve
//! before enemy-vs-player pairs; within each class, entities are visited in
//! ascending entity-index order (the order `Registry::get_entities_with_components`
//! already yields, since it's a straight scan over `signatures`).
//!
//! Grounded in `server/include/server/engine/systems/collision_system.hpp`'s
//! shape-pair dispatch, generalized from its enum-tagged union to a Rust
//! `match` over [`Shape`].

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use rtype_ecs::{Engine, Entity, Registry};

use crate::components::{Enemy, Health, Player, Position, Projectile, Shape};
use crate::constants::{ENEMY_KILL_SCORE, ENEMY_MELEE_DAMAGE};
use crate::state::GameState;

struct ProjectileHit {
    entity: Entity,
    id: u8,
    owner_id: u8,
    damage: i32,
    pos: Position,
    shape: Shape,
}

struct EnemyHit {
    entity: Entity,
    id: u8,
    pos: Position,
    shape: Shape,
}

struct PlayerHit {
    entity: Entity,
    id: u8,
    pos: Position,
    shape: Shape,
}

pub fn install(engine: &mut Engine, state: Rc<RefCell<GameState>>) {
    engine.register_system(move |registry, _dt, _now| {
        let projectiles = snapshot_projectiles(registry);
        let enemies = snapshot_enemies(registry);
        let players = snapshot_players(registry);

        let mut dead_projectiles = HashSet::new();
        let mut dead_enemies = HashSet::new();
        let mut dead_players = HashSet::new();
        let mut score_gains: Vec<(u8, u16)> = Vec::new();

        for projectile in &projectiles {
            if dead_projectiles.contains(&projectile.id) {
                continue;
            }
            for enemy in &enemies {
                if dead_enemies.contains(&enemy.id) {
                    continue;
                }
                if !overlaps(&projectile.shape, &projectile.pos, &enemy.shape, &enemy.pos) {
                    continue;
                }
                dead_projectiles.insert(projectile.id);
                if let Some(health) = registry.get_component_mut::<Health>(enemy.entity) {
                    health.0 -= projectile.damage;
                    if health.0 <= 0 {
                        dead_enemies.insert(enemy.id);
                        score_gains.push((projectile.owner_id, ENEMY_KILL_SCORE));
                    }
                }
                break;
            }
        }

        for enemy in &enemies {
            if dead_enemies.contains(&enemy.id) {
                continue;
            }
            for player in &players {
                if dead_players.contains(&player.id) {
                    continue;
                }
                if !overlaps(&enemy.shape, &enemy.pos, &player.shape, &player.pos) {
                    continue;
                }
                dead_enemies.insert(enemy.id);
                if let Some(health) = registry.get_component_mut::<Health>(player.entity) {
                    health.0 -= ENEMY_MELEE_DAMAGE;
                    if health.0 <= 0 {
                        dead_players.insert(player.id);
                    }
                }
                break;
            }
        }

        let mut state = state.borrow_mut();
        for (owner, amount) in score_gains {
            state.add_score_to_player(registry, owner, amount);
        }
        for id in dead_enemies {
            state.remove_enemy(registry, id);
        }
        for id in dead_players {
            state.remove_player(registry, id);
        }
        for id in dead_projectiles {
            state.remove_projectile(registry, id);
        }
    });
}

fn snapshot_projectiles(registry: &Registry) -> Vec<ProjectileHit> {
    registry
        .get_entities_with_components::<(Position, Shape, Projectile)>()
        .into_iter()
        .filter_map(|entity| {
            let pos = *registry.get_component::<Position>(entity)?;
            let shape = *registry.get_component::<Shape>(entity)?;
            let projectile = registry.get_component::<Projectile>(entity)?;
            Some(ProjectileHit { entity, id: projectile.id, owner_id: projectile.owner_id, damage: projectile.damage, pos, shape })
        })
        .collect()
}

fn snapshot_enemies(registry: &Registry) -> Vec<EnemyHit> {
    registry
        .get_entities_with_components::<(Position, Shape, Enemy)>()
        .into_iter()
        .filter_map(|entity| {
            let pos = *registry.get_component::<Position>(entity)?;
            let shape = *registry.get_component::<Shape>(entity)?;
            let enemy = registry.get_component::<Enemy>(entity)?;
            Some(EnemyHit { entity, id: enemy.id, pos, shape })
        })
        .collect()
}

fn snapshot_players(registry: &Registry) -> Vec<PlayerHit> {
    registry
        .get_entities_with_components::<(Position, Shape, Player)>()
        .into_iter()
        .filter_map(|entity| {
            let pos = *registry.get_component::<Position>(entity)?;
            let shape = *registry.get_component::<Shape>(entity)?;
            let player = registry.get_component::<Player>(entity)?;
            Some(PlayerHit { entity, id: player.id, pos, shape })
        })
        .collect()
}

fn overlaps(a: &Shape, a_pos: &Position, b: &Shape, b_pos: &Position) -> bool {
    match (a, b) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            let dx = a_pos.x - b_pos.x;
            let dy = a_pos.y - b_pos.y;
            let r = ra + rb;
            dx * dx + dy * dy <= r * r
        }
        (Shape::Rectangle { width: wa, height: ha }, Shape::Rectangle { width: wb, height: hb }) => {
            let (ax0, ax1) = (a_pos.x - wa / 2.0, a_pos.x + wa / 2.0);
            let (ay0, ay1) = (a_pos.y - ha / 2.0, a_pos.y + ha / 2.0);
            let (bx0, bx1) = (b_pos.x - wb / 2.0, b_pos.x + wb / 2.0);
            let (by0, by1) = (b_pos.y - hb / 2.0, b_pos.y + hb / 2.0);
            ax0 <= bx1 && ax1 >= bx0 && ay0 <= by1 && ay1 >= by0
        }
        (Shape::Circle { radius }, Shape::Rectangle { width, height }) => circle_rect(a_pos, *radius, b_pos, *width, *height),
        (Shape::Rectangle { width, height }, Shape::Circle { radius }) => circle_rect(b_pos, *radius, a_pos, *width, *height),
    }
}

/// Distance from a circle's center to its clamped-into-rectangle point,
/// compared against the radius (spec §4.7).
fn circle_rect(circle_pos: &Position, radius: f32, rect_pos: &Position, width: f32, height: f32) -> bool {
    let (rx0, rx1) = (rect_pos.x - width / 2.0, rect_pos.x + width / 2.0);
    let (ry0, ry1) = (rect_pos.y - height / 2.0, rect_pos.y + height / 2.0);
    let cx = circle_pos.x.max(rx0).min(rx1);
    let cy = circle_pos.y.max(ry0).min(ry1);
    let dx = circle_pos.x - cx;
    let dy = circle_pos.y - cy;
    dx * dx + dy * dy <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circles_overlap_when_within_combined_radius() {
        let a = Position { x: 0.0, y: 0.0 };
        let b = Position { x: 6.0, y: 0.0 };
        assert!(overlaps(&Shape::Circle { radius: 3.0 }, &a, &Shape::Circle { radius: 3.0 }, &b));
        let c = Position { x: 6.01, y: 0.0 };
        assert!(!overlaps(&Shape::Circle { radius: 3.0 }, &a, &Shape::Circle { radius: 3.0 }, &c));
    }

    #[test]
    fn circle_rect_uses_clamped_nearest_point() {
        let circle = Position { x: 0.0, y: 0.0 };
        let rect = Position { x: 10.0, y: 0.0 };
        assert!(!overlaps(&Shape::Circle { radius: 3.0 }, &circle, &Shape::Rectangle { width: 4.0, height: 4.0 }, &rect));
        let close_rect = Position { x: 5.0, y: 0.0 };
        assert!(overlaps(&Shape::Circle { radius: 3.0 }, &circle, &Shape::Rectangle { width: 4.0, height: 4.0 }, &close_rect));
    }
}
