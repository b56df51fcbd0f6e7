//! Game state tables and operations (spec §3.4, §4.6): the id-indexed maps
//! sitting on top of the ECS `Registry`, plus the spawn/despawn operations
//! every dispatcher handler and simulation system goes through instead of
//! touching the registry directly.

use hashbrown::HashMap;
use rtype_ecs::{Entity, Registry};
use rtype_protocol::codec::create_packet;
use rtype_protocol::packet_type::PacketType;
use rtype_protocol::payload::RemoveEntity;
use rtype_transport::{ConnectionId, OutboundQueue};
use slog::Logger;

use crate::components::{
    AIState, DirtyFlag, Enemy, Health, InputState, LastShotTime, Player, Position, Projectile, Shape, Target,
    Velocity,
};
use crate::constants::{ENEMY_STARTING_HEALTH, PLAYER_RADIUS, PLAYER_STARTING_HEALTH, PROJECTILE_RADIUS};

pub struct ProjectileRecord {
    pub owner_id: u8,
    pub entity: Entity,
}

/// The three id-indexed tables named in spec §3.4. `u8` throughout: the wire
/// payloads (`PlayerInput`, `UpdateProjectile`, `UpdateEnemy`, `RemoveEntity`)
/// all carry 8-bit ids, so the tables use the same width rather than
/// widening internally and truncating at the edge.
pub struct GameState {
    pub player_entities: HashMap<u8, Entity>,
    pub projectile_entities: HashMap<u8, ProjectileRecord>,
    pub enemy_entities: HashMap<u8, Entity>,
    /// Which player a TCP connection owns, so a `Disconnected` event (which
    /// only names a connection id, not a player id) knows who to
    /// [`remove_player`](Self::remove_player). Not named in spec §3.4's
    /// table since it's transport-to-domain plumbing rather than simulation
    /// state, but it has to live somewhere the dispatcher's event
    /// subscribers can reach.
    connection_players: HashMap<ConnectionId, u8>,
    outbound: OutboundQueue,
    log: Logger,
}

/// Registers every component type the simulation uses. Must run once before
/// any entity is spawned.
pub fn register_components(registry: &mut Registry) {
    registry.register_component::<Position>();
    registry.register_component::<Velocity>();
    registry.register_component::<InputState>();
    registry.register_component::<Health>();
    registry.register_component::<DirtyFlag>();
    registry.register_component::<LastShotTime>();
    registry.register_component::<Player>();
    registry.register_component::<Projectile>();
    registry.register_component::<Enemy>();
    registry.register_component::<AIState>();
    registry.register_component::<Target>();
    registry.register_component::<Shape>();
}

fn first_free_id<V>(used: &HashMap<u8, V>) -> Option<u8> {
    (0..=u8::MAX).find(|id| !used.contains_key(id))
}

impl GameState {
    pub fn new(outbound: OutboundQueue, log: &Logger) -> GameState {
        GameState {
            player_entities: HashMap::new(),
            projectile_entities: HashMap::new(),
            enemy_entities: HashMap::new(),
            connection_players: HashMap::new(),
            outbound,
            log: log.new(slog::o!("component" => "game-state")),
        }
    }

    /// Records that `connection_id` owns `player_id`, so a later
    /// disconnect can find and remove the right player.
    pub fn bind_connection(&mut self, connection_id: ConnectionId, player_id: u8) {
        self.connection_players.insert(connection_id, player_id);
    }

    /// Forgets `connection_id`'s ownership and returns the player id it was
    /// bound to, if any.
    pub fn unbind_connection(&mut self, connection_id: ConnectionId) -> Option<u8> {
        self.connection_players.remove(&connection_id)
    }

    /// Picks the next unused player id. Returns `None` once 256 players are
    /// concurrently alive, which the lobby's 10-player-per-lobby cap (spec
    /// §3.5) makes unreachable in practice.
    pub fn allocate_player_id(&self) -> Option<u8> {
        first_free_id(&self.player_entities)
    }

    /// `add_player(id, x, y)` (spec §4.6): fails if `id` is already taken.
    pub fn add_player(&mut self, registry: &mut Registry, id: u8, x: f32, y: f32) -> Result<Entity, ()> {
        if self.player_entities.contains_key(&id) {
            return Err(());
        }
        let entity = registry.spawn_entity();
        registry.add_component(entity, Player { id, score: 0 });
        registry.add_component(entity, Position { x, y });
        registry.add_component(entity, InputState::default());
        registry.add_component(entity, Velocity::default());
        registry.add_component(entity, Health(PLAYER_STARTING_HEALTH));
        registry.add_component(entity, DirtyFlag(true));
        registry.add_component(entity, LastShotTime(0));
        registry.add_component(entity, Shape::Circle { radius: PLAYER_RADIUS });
        self.player_entities.insert(id, entity);
        slog::debug!(self.log, "player added"; "player_id" => id);
        Ok(entity)
    }

    /// `remove_player(id)` (spec §4.6): kills the entity, unindexes it, and
    /// broadcasts `RemovePlayer` over TCP.
    pub fn remove_player(&mut self, registry: &mut Registry, id: u8) {
        if let Some(entity) = self.player_entities.remove(&id) {
            registry.kill_entity(entity);
            let packet = create_packet(PacketType::RemovePlayer, &RemoveEntity { id });
            self.outbound.broadcast_tcp(packet);
            slog::debug!(self.log, "player removed"; "player_id" => id);
        }
    }

    /// `add_projectile(owner, x, y, dir_x, dir_y)` (spec §4.6): normalizes
    /// the aim vector and spawns a projectile travelling along it.
    pub fn add_projectile(&mut self, registry: &mut Registry, owner: u8, x: f32, y: f32, dir_x: f32, dir_y: f32) {
        let id = match first_free_id(&self.projectile_entities) {
            Some(id) => id,
            None => {
                slog::warn!(self.log, "projectile id space exhausted, dropping shot");
                return;
            }
        };
        let magnitude = (dir_x * dir_x + dir_y * dir_y).sqrt();
        let (nx, ny) = if magnitude > 0.0 { (dir_x / magnitude, dir_y / magnitude) } else { (0.0, 0.0) };

        let entity = registry.spawn_entity();
        registry.add_component(entity, Position { x, y });
        registry.add_component(
            entity,
            Velocity { x: nx * crate::constants::PROJECTILE_SPEED, y: ny * crate::constants::PROJECTILE_SPEED },
        );
        registry.add_component(
            entity,
            Projectile { id, owner_id: owner, damage: crate::constants::PROJECTILE_DAMAGE },
        );
        registry.add_component(entity, Shape::Circle { radius: PROJECTILE_RADIUS });
        registry.add_component(entity, DirtyFlag(true));
        self.projectile_entities.insert(id, ProjectileRecord { owner_id: owner, entity });
    }

    /// `remove_projectile(pid)` (spec §4.6): kills, unindexes, broadcasts
    /// `RemoveProjectile` over TCP.
    pub fn remove_projectile(&mut self, registry: &mut Registry, id: u8) {
        if let Some(record) = self.projectile_entities.remove(&id) {
            registry.kill_entity(record.entity);
            let packet = create_packet(PacketType::RemoveProjectile, &RemoveEntity { id });
            self.outbound.broadcast_tcp(packet);
        }
    }

    /// `add_enemy(x, y, state)` (spec §4.6).
    pub fn add_enemy(&mut self, registry: &mut Registry, x: f32, y: f32, state: AIState) -> Option<Entity> {
        let id = match first_free_id(&self.enemy_entities) {
            Some(id) => id,
            None => {
                slog::warn!(self.log, "enemy id space exhausted, skipping spawn");
                return None;
            }
        };
        let entity = registry.spawn_entity();
        registry.add_component(entity, Enemy { id });
        registry.add_component(entity, Shape::Circle { radius: crate::constants::ENEMY_RADIUS });
        registry.add_component(entity, Position { x, y });
        registry.add_component(entity, state);
        registry.add_component(entity, Target::default());
        registry.add_component(entity, Velocity::default());
        registry.add_component(entity, Health(ENEMY_STARTING_HEALTH));
        registry.add_component(entity, DirtyFlag(true));
        self.enemy_entities.insert(id, entity);
        Some(entity)
    }

    /// `remove_enemy(id)`: kills, unindexes, broadcasts `RemoveEnemy`.
    pub fn remove_enemy(&mut self, registry: &mut Registry, id: u8) {
        if let Some(entity) = self.enemy_entities.remove(&id) {
            registry.kill_entity(entity);
            let packet = create_packet(PacketType::RemoveEnemy, &RemoveEntity { id });
            self.outbound.broadcast_tcp(packet);
        }
    }

    /// `add_score_to_player(id, n)` (spec §4.6).
    pub fn add_score_to_player(&mut self, registry: &mut Registry, id: u8, amount: u16) {
        if let Some(&entity) = self.player_entities.get(&id) {
            if let Some(player) = registry.get_component_mut::<Player>(entity) {
                player.score = player.score.saturating_add(amount);
            }
        }
    }

    pub fn player_count(&self) -> usize {
        self.player_entities.len()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemy_entities.len()
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }
}
