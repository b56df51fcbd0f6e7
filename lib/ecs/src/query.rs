use crate::entity::Entity;
use crate::registry::Registry;
use crate::signature::Signature;

/// A tuple of component types usable as a query against a [`Registry`]
/// (spec §4.2: `get_entities_with_components<C1,...,Cn>()` and
/// `get_filtered_zipper<C1,...,Cn>()`). Rust has no variadic generics, so
/// arities are implemented by macro below, mirroring the original's
/// parameter-pack `TypeIndex<T, Ts...>` at a handful of fixed arities
/// instead of one fully generic template.
pub trait Query {
    type Item<'a>
    where
        Self: 'a;

    fn signature(registry: &Registry) -> Signature;
    fn fetch(registry: &mut Registry, entity: Entity) -> Self::Item<'_>;
}

macro_rules! impl_query {
    ($($ty:ident => $idx:tt),+) => {
        impl<$($ty: 'static),+> Query for ($($ty,)+) {
            type Item<'a> = ($(&'a mut $ty,)+) where Self: 'a;

            fn signature(registry: &Registry) -> Signature {
                let mut sig = Signature::EMPTY;
                $(sig |= registry.signature_bit::<$ty>();)+
                sig
            }

            fn fetch(registry: &mut Registry, entity: Entity) -> Self::Item<'_> {
                // SAFETY: each `$ty` is a distinct type, so the component
                // storages being borrowed are disjoint; `get_component_mut`
                // only ever borrows a single `SparseArray<$ty>` out of the
                // registry's type map. We fan out `registry` into N raw
                // pointers to sidestep the borrow checker's inability to see
                // that disjointness across an AnyMap lookup.
                let ptr: *mut Registry = registry;
                unsafe {
                    ($((&mut *ptr).get_component_mut::<$ty>(entity).expect("zipper: entity missing queried component"),)+)
                }
            }
        }
    };
}

impl_query!(A => 0);
impl_query!(A => 0, B => 1);
impl_query!(A => 0, B => 1, C => 2);
impl_query!(A => 0, B => 1, C => 2, D => 3);
impl_query!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_query!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);

/// Parallel iteration over several component arrays by entity index,
/// skipping indices where any observed component is absent
/// (spec §4.2, §GLOSSARY: "Zipper").
///
/// Built by first enumerating the entities whose signature matches `Q`
/// (`Registry::get_entities_with_components`), then yielding
/// `(Entity, Q::Item)` tuples lazily. Iteration order is entity-index
/// ascending, matching `get_entities_with_components`'s scan order.
pub struct Zipper<'a, Q: Query> {
    registry: &'a mut Registry,
    entities: std::vec::IntoIter<Entity>,
    _marker: std::marker::PhantomData<Q>,
}

impl<'a, Q: Query> Zipper<'a, Q> {
    pub(crate) fn new(registry: &'a mut Registry, entities: Vec<Entity>) -> Self {
        Zipper { registry, entities: entities.into_iter(), _marker: std::marker::PhantomData }
    }

    /// Advances the zipper, returning the next `(Entity, Q::Item)` pair.
    /// Not a real `Iterator` impl: `Q::Item<'_>` borrows from `self.registry`
    /// for each call, which `Iterator::Item` (a single associated type, not
    /// one parameterized per call) cannot express until Rust gains stable
    /// LendingIterator. Callers drive it with a `while let` loop instead.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<(Entity, Q::Item<'_>)> {
        let entity = self.entities.next()?;
        Some((entity, Q::fetch(self.registry, entity)))
    }
}
