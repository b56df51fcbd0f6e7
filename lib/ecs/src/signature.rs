use std::ops::{BitAnd, BitOr, BitOrAssign, Sub, SubAssign};

/// Bitmask of which components an entity has (spec §3.3, §GLOSSARY). Bit
/// `i` corresponds to the `i`-th component type registered with the
/// [`crate::registry::Registry`], mirroring the original's compile-time
/// `TypeIndex<T, Ts...>` position without needing template metaprogramming —
/// registration order is recorded at runtime instead (see
/// `Registry::register_component`).
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Signature(u64);

impl Signature {
    pub const EMPTY: Signature = Signature(0);

    #[inline]
    pub fn from_bit(bit: u32) -> Self {
        Signature(1u64 << bit)
    }

    #[inline]
    pub fn contains(self, other: Signature) -> bool {
        self & other == other
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Signature {
    type Output = Signature;
    #[inline]
    fn bitor(self, rhs: Signature) -> Signature {
        Signature(self.0 | rhs.0)
    }
}

impl BitOrAssign for Signature {
    #[inline]
    fn bitor_assign(&mut self, rhs: Signature) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Signature {
    type Output = Signature;
    #[inline]
    fn bitand(self, rhs: Signature) -> Signature {
        Signature(self.0 & rhs.0)
    }
}

impl Sub for Signature {
    type Output = Signature;
    #[inline]
    fn sub(self, rhs: Signature) -> Signature {
        Signature(self.0 & !rhs.0)
    }
}

impl SubAssign for Signature {
    #[inline]
    fn sub_assign(&mut self, rhs: Signature) {
        self.0 &= !rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_checks_all_bits_present() {
        let a = Signature::from_bit(0) | Signature::from_bit(2);
        assert!(a.contains(Signature::from_bit(0)));
        assert!(a.contains(Signature::from_bit(2)));
        assert!(!a.contains(Signature::from_bit(1)));
        assert!(a.contains(a));
    }

    #[test]
    fn sub_clears_only_named_bits() {
        let mut a = Signature::from_bit(0) | Signature::from_bit(1);
        a -= Signature::from_bit(0);
        assert!(!a.contains(Signature::from_bit(0)));
        assert!(a.contains(Signature::from_bit(1)));
    }
}
