//! Owner identities and cell keys.
//!
//! Cells from different owners share one store, so a cell is addressed by the
//! pair (owner id, cell name) rather than by name alone.

use std::fmt::{self, Display, Formatter};

/// Stable identity for one consumer instance.
///
/// Allocated arena-style by [`CellStore::allocate_owner`] when the owner is
/// constructed, monotonically increasing, and never reassigned while the
/// store is alive. The store must outlive every owner id it has handed out.
///
/// [`CellStore::allocate_owner`]: crate::CellStore::allocate_owner
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Create an owner id from a raw counter value.
    #[inline]
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Address of one cell slot in the store.
///
/// Parameter and computed cells share this key space; the kind only
/// determines how a cache miss is resolved, never how the key behaves.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct CellKey {
    /// Identity of the owning consumer instance.
    pub owner: OwnerId,
    /// Declared cell name, unique within the owner.
    pub name: &'static str,
}

impl CellKey {
    /// Create a new cell key.
    #[inline]
    pub const fn new(owner: OwnerId, name: &'static str) -> Self {
        Self { owner, name }
    }
}

impl Display for CellKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_differ_across_owners() {
        let first = CellKey::new(OwnerId::new(0), "total");
        let second = CellKey::new(OwnerId::new(1), "total");
        assert_ne!(first, second);
        assert_eq!(first, CellKey::new(OwnerId::new(0), "total"));
    }

    #[test]
    fn display_includes_owner_and_name() {
        let key = CellKey::new(OwnerId::new(3), "total");
        assert_eq!(key.to_string(), "#3.total");
    }
}
