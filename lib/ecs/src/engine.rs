use crate::registry::Registry;

/// A system callable: `FnMut(&mut Registry, dt, now)` (spec §4.2).
/// `dt` is the fixed tick period in seconds; `now` is milliseconds since an
/// arbitrary epoch, used for things like `LastShotTime` comparisons. Not
/// `Send`: the `Engine` that owns these is confined to the simulation
/// thread for its whole lifetime (spec §5 — "Registry is owned by the
/// simulation thread; no other thread may read or mutate it"), so systems
/// are free to close over thread-local state like `Rc<RefCell<GameState>>`.
pub type System = Box<dyn FnMut(&mut Registry, f32, u64)>;

/// Owns the [`Registry`] and the ordered list of systems that mutate it.
/// `engine.update(dt)` (spec §4.8) runs every system once, in the order they
/// were registered — systems living inside the registry they mutate would be
/// self-referential, so the original's `run_systems` loop is hoisted one
/// level up onto this wrapper instead.
pub struct Engine {
    pub registry: Registry,
    systems: Vec<System>,
    now_ms: u64,
}

impl Engine {
    pub fn new() -> Engine {
        Engine { registry: Registry::new(), systems: Vec::new(), now_ms: 0 }
    }

    pub fn register_system<F>(&mut self, system: F)
    where
        F: FnMut(&mut Registry, f32, u64) + 'static,
    {
        self.systems.push(Box::new(system));
    }

    /// Sets the "now" timestamp (milliseconds) passed to every system this
    /// tick. Set once per tick by the caller before `update`.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    /// Runs every registered system once, in insertion order (spec §4.2,
    /// §5: "System execution within a tick is insertion order").
    pub fn update(&mut self, dt: f32) {
        for system in &mut self.systems {
            system(&mut self.registry, dt, self.now_ms);
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
