//! The ECS runtime (spec §3.3, §4.2): a sparse-array component store,
//! entity recycling, signature-based queries and the `Zipper` iteration
//! primitive, grounded in `examples/original_source/new_ecs_lib` (the
//! `Registry`/`SparseArray`/`Zipper` names come from there — `neutronium`'s
//! archetype/shard design and service-locator `Registry` are a different
//! shape entirely and are not reused, see DESIGN.md).

pub mod engine;
pub mod entity;
pub mod query;
pub mod registry;
pub mod signature;
pub mod sparse_array;

pub use engine::{Engine, System};
pub use entity::Entity;
pub use query::{Query, Zipper};
pub use registry::Registry;
pub use signature::Signature;
pub use sparse_array::SparseArray;
