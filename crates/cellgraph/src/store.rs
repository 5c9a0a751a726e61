//! The shared cell store: cached values, dependency edges, evaluation stack.
//!
//! The store is pure key/value/dependency bookkeeping. It has no notion of
//! parameters versus computed cells and never invokes derivation logic; the
//! accessors in [`crate::cell`] drive it through the operations below.

use crate::key::{CellKey, OwnerId};
use log::trace;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::rc::Rc;

/// Cached values, the dependency graph, and the active evaluation stack for
/// one dependency-graph scope.
///
/// A key is valid iff it has an entry in the value map; presence is the sole
/// validity signal. Dependency edges run from a dependency to the set of keys
/// that read it, accumulate monotonically, and are only superseded when a
/// dependent is cleared and recomputed with fresh reads (stale edges
/// over-approximate invalidation, never under-approximate it).
///
/// The store must outlive every [`OwnerId`] it has allocated.
#[derive(Debug)]
pub struct CellStore<V> {
    /// Cached values; a missing entry means the key is invalid.
    values: FxHashMap<CellKey, V>,
    /// Dependency -> keys that read it during their last computation.
    dependents: FxHashMap<CellKey, FxHashSet<CellKey>>,
    /// Keys whose derivation functions are currently executing, innermost last.
    call_stack: Vec<CellKey>,
    /// Next owner id to hand out.
    next_owner: u64,
}

impl<V> Default for CellStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CellStore<V> {
    /// Create an empty store.
    #[inline]
    pub fn new() -> Self {
        Self {
            values: FxHashMap::default(),
            dependents: FxHashMap::default(),
            call_stack: Vec::new(),
            next_owner: 0,
        }
    }

    /// Allocate a fresh owner identity.
    ///
    /// Ids are monotonic and never reused while the store is alive.
    #[inline]
    pub fn allocate_owner(&mut self) -> OwnerId {
        let owner = OwnerId::new(self.next_owner);
        self.next_owner += 1;
        owner
    }

    /// Query whether there is a cached value for `key`.
    #[inline]
    pub fn has_valid(&self, key: CellKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Idempotently record that `dependent` read `dependency`.
    ///
    /// Duplicate edges collapse; edges are discovered dynamically from reads,
    /// never declared statically.
    #[inline]
    pub fn add_dependency(&mut self, dependent: CellKey, dependency: CellKey) {
        self.dependents
            .entry(dependency)
            .or_default()
            .insert(dependent);
    }

    /// Top of the evaluation stack: the key whose derivation is currently
    /// executing, if any.
    #[inline]
    pub fn caller(&self) -> Option<CellKey> {
        self.call_stack.last().copied()
    }

    /// Push `key` onto the evaluation stack.
    ///
    /// Always paired with [`Self::pop_caller`] by the computed cell's
    /// evaluation protocol, on the error path as well as on success.
    #[inline]
    pub fn push_caller(&mut self, key: CellKey) {
        self.call_stack.push(key);
    }

    /// Pop the top of the evaluation stack.
    #[inline]
    pub fn pop_caller(&mut self) -> Option<CellKey> {
        self.call_stack.pop()
    }

    /// The full evaluation stack, outermost first.
    #[inline]
    pub fn call_stack(&self) -> &[CellKey] {
        &self.call_stack
    }

    /// Whether `key` is currently being computed.
    #[inline]
    pub fn is_computing(&self, key: CellKey) -> bool {
        self.call_stack.contains(&key)
    }
}

impl<V: Clone> CellStore<V> {
    /// Lookup the cached value for `key`, if any.
    #[inline]
    pub fn get(&self, key: CellKey) -> Option<V> {
        self.values.get(&key).cloned()
    }

    /// Store `value` under `key`, invalidating any dependent keys first.
    pub fn store(&mut self, key: CellKey, value: V) {
        self.invalidate(key);
        self.values.insert(key, value);
    }

    /// Clear `key` and, transitively, every key that depends on it.
    ///
    /// Depth-first with a visited set, so the walk terminates even if the
    /// edge graph itself contains a cycle (a configuration defect guarded
    /// against, not reproduced). Visit order is unspecified; invalidation
    /// only clears slots, so order cannot affect results.
    fn invalidate(&mut self, root: CellKey) {
        let mut visited = FxHashSet::default();
        let mut pending = vec![root];
        let mut cleared = 0usize;

        while let Some(key) = pending.pop() {
            if !visited.insert(key) {
                continue;
            }
            if self.values.remove(&key).is_some() {
                cleared += 1;
            }
            if let Some(dependents) = self.dependents.get(&key) {
                pending.extend(dependents.iter().copied());
            }
        }

        if cleared > 0 {
            trace!("Invalidated {cleared} cells downstream of {root}");
        }
    }
}

/// Cheaply cloneable handle to a shared [`CellStore`].
///
/// One handle scope is one dependency graph: every owner participating in the
/// graph is constructed with a clone of the same handle, which is what lets a
/// computed cell on one instance depend on a cell of another. Single-threaded
/// by construction (`Rc`); confining a graph to one thread is part of the
/// engine's contract.
#[derive(Debug)]
pub struct StoreHandle<V> {
    inner: Rc<RefCell<CellStore<V>>>,
}

impl<V> Clone for StoreHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> Default for StoreHandle<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> StoreHandle<V> {
    /// Create a handle to a fresh, empty store.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellStore::new())),
        }
    }

    /// Allocate a fresh owner identity from the shared store.
    #[inline]
    pub fn allocate_owner(&self) -> OwnerId {
        self.inner.borrow_mut().allocate_owner()
    }

    /// Query whether there is a cached value for `key`.
    #[inline]
    pub fn has_valid(&self, key: CellKey) -> bool {
        self.inner.borrow().has_valid(key)
    }

    /// Idempotently record that `dependent` read `dependency`.
    #[inline]
    pub fn add_dependency(&self, dependent: CellKey, dependency: CellKey) {
        self.inner.borrow_mut().add_dependency(dependent, dependency);
    }

    /// Top of the evaluation stack, if any.
    #[inline]
    pub fn caller(&self) -> Option<CellKey> {
        self.inner.borrow().caller()
    }

    /// Push `key` onto the evaluation stack.
    #[inline]
    pub fn push_caller(&self, key: CellKey) {
        self.inner.borrow_mut().push_caller(key);
    }

    /// Pop the top of the evaluation stack.
    #[inline]
    pub fn pop_caller(&self) -> Option<CellKey> {
        self.inner.borrow_mut().pop_caller()
    }

    /// Snapshot of the full evaluation stack, outermost first.
    #[inline]
    pub fn call_stack(&self) -> Vec<CellKey> {
        self.inner.borrow().call_stack().to_vec()
    }

    /// Whether `key` is currently being computed.
    #[inline]
    pub fn is_computing(&self, key: CellKey) -> bool {
        self.inner.borrow().is_computing(key)
    }
}

impl<V: Clone> StoreHandle<V> {
    /// Lookup the cached value for `key`, if any.
    #[inline]
    pub fn get(&self, key: CellKey) -> Option<V> {
        self.inner.borrow().get(key)
    }

    /// Store `value` under `key`, invalidating any dependent keys first.
    #[inline]
    pub fn store(&self, key: CellKey, value: V) {
        self.inner.borrow_mut().store(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &'static str) -> CellKey {
        CellKey::new(OwnerId::new(0), name)
    }

    #[test]
    fn store_and_get() {
        let mut cells = CellStore::new();
        assert_eq!(cells.get(key("base")), None);
        assert!(!cells.has_valid(key("base")));

        cells.store(key("base"), 5);
        assert_eq!(cells.get(key("base")), Some(5));
        assert!(cells.has_valid(key("base")));
    }

    #[test]
    fn write_invalidates_transitive_dependents() {
        let mut cells = CellStore::new();
        cells.store(key("base"), 1);
        cells.store(key("double"), 2);
        cells.store(key("quadruple"), 4);
        cells.add_dependency(key("double"), key("base"));
        cells.add_dependency(key("quadruple"), key("double"));

        cells.store(key("base"), 3);
        assert_eq!(cells.get(key("base")), Some(3));
        assert!(!cells.has_valid(key("double")));
        assert!(!cells.has_valid(key("quadruple")));
    }

    #[test]
    fn unrelated_keys_survive_invalidation() {
        let mut cells = CellStore::new();
        cells.store(key("base"), 1);
        cells.store(key("other"), 9);
        cells.add_dependency(key("double"), key("base"));
        cells.store(key("double"), 2);

        cells.store(key("base"), 3);
        assert_eq!(cells.get(key("other")), Some(9));
        assert!(!cells.has_valid(key("double")));
    }

    #[test]
    fn duplicate_edges_collapse() {
        let mut cells = CellStore::<i64>::new();
        cells.add_dependency(key("double"), key("base"));
        cells.add_dependency(key("double"), key("base"));

        let dependents = cells.dependents.get(&key("base")).map(|edges| edges.len());
        assert_eq!(dependents, Some(1));
    }

    #[test]
    fn invalidation_terminates_on_edge_cycle() {
        // An edge cycle is a configuration defect; the walk must still end.
        let mut cells = CellStore::new();
        cells.store(key("ping"), 1);
        cells.store(key("pong"), 2);
        cells.add_dependency(key("ping"), key("pong"));
        cells.add_dependency(key("pong"), key("ping"));

        cells.store(key("ping"), 3);
        assert_eq!(cells.get(key("ping")), Some(3));
        assert!(!cells.has_valid(key("pong")));
    }

    #[test]
    fn caller_tracks_top_of_stack() {
        let mut cells = CellStore::<i64>::new();
        assert_eq!(cells.caller(), None);

        cells.push_caller(key("outer"));
        cells.push_caller(key("inner"));
        assert_eq!(cells.caller(), Some(key("inner")));
        assert_eq!(cells.call_stack(), [key("outer"), key("inner")]);
        assert!(cells.is_computing(key("outer")));

        assert_eq!(cells.pop_caller(), Some(key("inner")));
        assert_eq!(cells.caller(), Some(key("outer")));
        assert_eq!(cells.pop_caller(), Some(key("outer")));
        assert_eq!(cells.pop_caller(), None);
    }

    #[test]
    fn owner_ids_are_monotonic() {
        let mut cells = CellStore::<i64>::new();
        let first = cells.allocate_owner();
        let second = cells.allocate_owner();
        assert_ne!(first, second);
        assert!(first < second);
    }

    #[test]
    fn handle_clones_share_one_store() {
        let handle = StoreHandle::new();
        let other = handle.clone();

        handle.store(key("base"), 5);
        assert_eq!(other.get(key("base")), Some(5));

        let owner = other.allocate_owner();
        assert_ne!(handle.allocate_owner(), owner);
    }
}
