/// Opaque dense entity index (spec §3.3). Newtype over `u32` so it can't be
/// confused with a raw array index or a domain id (player/projectile/enemy
/// ids are a separate namespace owned by `game/core`).
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Entity(u32);

impl Entity {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Entity {
    #[inline]
    fn from(raw: u32) -> Self {
        Entity(raw)
    }
}

impl From<usize> for Entity {
    #[inline]
    fn from(raw: usize) -> Self {
        Entity(raw as u32)
    }
}
