use std::any::TypeId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use anymap::AnyMap;
use hashbrown::{HashMap, HashSet};

use crate::entity::Entity;
use crate::signature::Signature;
use crate::sparse_array::SparseArray;

/// Erases a single component type's slot for a dead entity. Registered once
/// per component type the first time it's attached to any entity.
type Eraser = fn(&mut Registry, usize);

/// Component–entity store (spec §3.3, §4.2).
///
/// Each component type `C` is registered once and assigned the next free
/// signature bit; its storage lives in an [`AnyMap`] keyed by `TypeId`,
/// following the same `type_index -> storage` idea as the original's
/// `unordered_map<type_index, SparseArrayVariant>` but resolved through a
/// type map instead of a runtime `std::variant` match.
pub struct Registry {
    arrays: AnyMap,
    bits: HashMap<TypeId, u32>,
    next_bit: u32,
    signatures: Vec<Signature>,
    dead: BinaryHeap<Reverse<u32>>,
    next_entity: u32,
    erasers: Vec<Eraser>,
    eraser_types: HashSet<TypeId>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            arrays: AnyMap::new(),
            bits: HashMap::new(),
            next_bit: 0,
            signatures: Vec::new(),
            dead: BinaryHeap::new(),
            next_entity: 0,
            erasers: Vec::new(),
            eraser_types: HashSet::new(),
        }
    }

    /// Registers component type `C`, assigning it the next free signature
    /// bit. Idempotent: registering the same type twice is a no-op.
    pub fn register_component<C: 'static>(&mut self) {
        let type_id = TypeId::of::<C>();
        if self.bits.contains_key(&type_id) {
            return;
        }
        self.bits.insert(type_id, self.next_bit);
        self.next_bit += 1;
        self.arrays.insert::<SparseArray<C>>(SparseArray::new());
        self.register_eraser::<C>();
    }

    /// The signature with only `C`'s bit set. Panics if `C` was never
    /// registered via [`register_component`] — used internally by
    /// [`crate::query::Query`] to build a combined required mask.
    #[doc(hidden)]
    pub fn signature_bit<C: 'static>(&self) -> Signature {
        Signature::from_bit(self.bit::<C>())
    }

    #[inline]
    fn bit<C: 'static>(&self) -> u32 {
        *self
            .bits
            .get(&TypeId::of::<C>())
            .unwrap_or_else(|| panic!("component type not registered"))
    }

    #[inline]
    fn array<C: 'static>(&self) -> &SparseArray<C> {
        self.arrays
            .get::<SparseArray<C>>()
            .unwrap_or_else(|| panic!("component type not registered"))
    }

    #[inline]
    fn array_mut<C: 'static>(&mut self) -> &mut SparseArray<C> {
        self.arrays
            .get_mut::<SparseArray<C>>()
            .unwrap_or_else(|| panic!("component type not registered"))
    }

    /// Allocates a new entity, reusing the lowest freed index if one exists
    /// (spec §3.3: "Freed entities go to a min-priority-queue for reuse").
    pub fn spawn_entity(&mut self) -> Entity {
        let index = match self.dead.pop() {
            Some(Reverse(index)) => index,
            None => {
                let index = self.next_entity;
                self.next_entity += 1;
                index
            }
        };
        self.ensure_signature_size(index as usize);
        Entity::from(index)
    }

    /// Kills `entity`: clears every component, zeroes its signature, and
    /// pushes it back on the reuse heap.
    pub fn kill_entity(&mut self, entity: Entity) {
        let index = entity.index();
        self.clear_all_components(index);
        if let Some(sig) = self.signatures.get_mut(index) {
            *sig = Signature::EMPTY;
        }
        self.dead.push(Reverse(index as u32));
    }

    /// Hook implemented per component type by [`add_component`]/
    /// [`remove_component`]; kept generic so `kill_entity` doesn't need to
    /// know every registered component type ahead of time. Components must
    /// register an eraser the first time they're used so dead entities are
    /// actually cleared; we track erasers explicitly instead.
    fn clear_all_components(&mut self, index: usize) {
        for erase in self.erasers.clone() {
            erase(self, index);
        }
    }

    fn ensure_signature_size(&mut self, index: usize) {
        if index >= self.signatures.len() {
            self.signatures.resize(index + 1, Signature::EMPTY);
        }
    }

    /// Attaches `component` to `entity`, setting its signature bit.
    pub fn add_component<C: 'static>(&mut self, entity: Entity, component: C) {
        let bit = self.bit::<C>();
        let index = entity.index();
        self.ensure_signature_size(index);
        self.array_mut::<C>().insert_at(index, component);
        self.signatures[index] |= Signature::from_bit(bit);
    }

    /// Removes `C` from `entity`, clearing its signature bit.
    pub fn remove_component<C: 'static>(&mut self, entity: Entity) {
        let bit = self.bit::<C>();
        let index = entity.index();
        self.array_mut::<C>().erase(index);
        if let Some(sig) = self.signatures.get_mut(index) {
            *sig -= Signature::from_bit(bit);
        }
    }

    #[inline]
    pub fn has_component<C: 'static>(&self, entity: Entity) -> bool {
        self.array::<C>().is_valid(entity.index())
    }

    #[inline]
    pub fn get_component<C: 'static>(&self, entity: Entity) -> Option<&C> {
        self.array::<C>().get(entity.index())
    }

    #[inline]
    pub fn get_component_mut<C: 'static>(&mut self, entity: Entity) -> Option<&mut C> {
        self.array_mut::<C>().get_mut(entity.index())
    }

    #[inline]
    pub fn signature(&self, entity: Entity) -> Signature {
        self.signatures.get(entity.index()).copied().unwrap_or(Signature::EMPTY)
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.signatures.len()
    }

    fn register_eraser<C: 'static>(&mut self) {
        let type_id = TypeId::of::<C>();
        if self.eraser_types.contains(&type_id) {
            return;
        }
        self.eraser_types.insert(type_id);
        self.erasers.push(|registry: &mut Registry, index: usize| {
            registry.array_mut::<C>().erase(index);
        });
    }

    /// Every entity whose signature contains every bit in `Q` (bitmask AND,
    /// spec §4.2), in ascending entity-index order.
    pub fn get_entities_with_components<Q: crate::query::Query>(&self) -> Vec<Entity> {
        let required = Q::signature(self);
        self.signatures
            .iter()
            .enumerate()
            .filter(|(_, sig)| sig.contains(required))
            .map(|(index, _)| Entity::from(index))
            .collect()
    }

    /// A [`crate::query::Zipper`] over the entities matching `Q`, yielding
    /// mutable references to each of `Q`'s components per entity.
    pub fn get_filtered_zipper<Q: crate::query::Query>(&mut self) -> crate::query::Zipper<'_, Q> {
        let entities = self.get_entities_with_components::<Q>();
        crate::query::Zipper::new(self, entities)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position {
        x: f32,
        y: f32,
    }
    struct Velocity {
        x: f32,
    }

    #[test]
    fn has_component_matches_signature_bit() {
        let mut registry = Registry::new();
        registry.register_component::<Position>();
        let e = registry.spawn_entity();
        assert!(!registry.has_component::<Position>(e));
        registry.add_component(e, Position { x: 1.0, y: 2.0 });
        assert!(registry.has_component::<Position>(e));
        assert!(registry.signature(e).contains(registry.signature_bit::<Position>()));
    }

    #[test]
    fn kill_entity_clears_components_and_signature() {
        let mut registry = Registry::new();
        registry.register_component::<Position>();
        let e = registry.spawn_entity();
        registry.add_component(e, Position { x: 0.0, y: 0.0 });
        registry.kill_entity(e);
        assert!(!registry.has_component::<Position>(e));
        assert_eq!(registry.signature(e), Signature::EMPTY);
    }

    #[test]
    fn killed_entity_is_recycled_before_a_fresh_one() {
        let mut registry = Registry::new();
        let e0 = registry.spawn_entity();
        let e1 = registry.spawn_entity();
        registry.kill_entity(e0);
        let recycled = registry.spawn_entity();
        assert_eq!(recycled.index(), e0.index());
        let fresh = registry.spawn_entity();
        assert!(fresh.index() > e1.index());
    }

    #[test]
    fn zipper_skips_entities_missing_any_observed_component() {
        let mut registry = Registry::new();
        registry.register_component::<Position>();
        registry.register_component::<Velocity>();

        let moving = registry.spawn_entity();
        registry.add_component(moving, Position { x: 0.0, y: 0.0 });
        registry.add_component(moving, Velocity { x: 5.0 });

        let still = registry.spawn_entity();
        registry.add_component(still, Position { x: 1.0, y: 1.0 });

        let mut seen = Vec::new();
        let mut zipper = registry.get_filtered_zipper::<(Position, Velocity)>();
        while let Some((entity, (pos, vel))) = zipper.next() {
            seen.push(entity);
            pos.x += vel.x;
        }
        assert_eq!(seen, vec![moving]);
        assert_eq!(registry.get_component::<Position>(moving).unwrap().x, 5.0);
    }
}
