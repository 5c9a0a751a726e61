//! Per-cell accessors: the read/write endpoints bound to the shared store.
//!
//! Two accessor kinds share one key space and one invalidation path. A
//! [`ParameterCell`] is the write endpoint for externally supplied inputs; a
//! [`ComputedCell`] lazily evaluates a derivation function and memoizes the
//! result. Dependency edges are discovered here: every read performed while a
//! derivation is on the evaluation stack records an edge against the key on
//! top of the stack.

use crate::error::{CellError, CellResult};
use crate::key::CellKey;
use crate::store::StoreHandle;
use crate::value::CellValue;
use log::trace;

/// Derivation function bound to a computed cell.
///
/// Expected to be pure with respect to cell reads: every input it consumes is
/// read through the owner's accessors (which is what makes dependency
/// discovery work), and it must not write parameter cells during its own
/// evaluation.
pub type DeriveFn<O, V> = fn(&O) -> CellResult<V>;

/// Read access to one cell, uniform across both accessor kinds.
///
/// This is the dispatch seam: [`CellSet`] routes every read through it, and
/// how a cache miss is resolved is entirely up to the implementation.
///
/// [`CellSet`]: crate::CellSet
pub trait CellAccessor<O, V> {
    /// Read the cell's value, resolving a cache miss per the accessor kind.
    ///
    /// `owner` is the instance hosting the cell; it is handed to the
    /// derivation function when a computed cell has to evaluate.
    fn get(&self, owner: &O) -> CellResult<V>;
}

/// Accessor for an externally supplied input value.
#[derive(Debug)]
pub struct ParameterCell<V> {
    store: StoreHandle<V>,
    key: CellKey,
}

impl<V: CellValue> ParameterCell<V> {
    pub(crate) fn new(store: StoreHandle<V>, key: CellKey) -> Self {
        Self { store, key }
    }

    /// The key this accessor is wired to.
    #[inline]
    pub fn key(&self) -> CellKey {
        self.key
    }

    /// Write the parameter.
    ///
    /// Every write goes through the store's invalidation path, clearing this
    /// key's transitive dependents before the new value lands; parameters are
    /// graph participants, not special-cased. A write is not an evaluation,
    /// so it never discovers dependency edges.
    pub fn set(&self, value: V) {
        self.store.store(self.key, value);
    }
}

impl<O, V: CellValue> CellAccessor<O, V> for ParameterCell<V> {
    /// Read the parameter.
    ///
    /// If a derivation is currently on the evaluation stack, that caller is
    /// recorded as depending on this cell. A read-before-write seeds the slot
    /// with the unset placeholder and returns it; this never fails, so
    /// derivation functions decide how to handle a missing input.
    fn get(&self, _owner: &O) -> CellResult<V> {
        if let Some(caller) = self.store.caller() {
            self.store.add_dependency(caller, self.key);
        }

        if !self.store.has_valid(self.key) {
            self.store.store(self.key, V::unset());
        }
        Ok(self.store.get(self.key).unwrap_or_else(V::unset))
    }
}

/// Accessor for a lazily derived, memoized value.
#[derive(Debug)]
pub struct ComputedCell<O, V> {
    store: StoreHandle<V>,
    key: CellKey,
    derive: DeriveFn<O, V>,
}

impl<O, V: CellValue> ComputedCell<O, V> {
    pub(crate) fn new(store: StoreHandle<V>, key: CellKey, derive: DeriveFn<O, V>) -> Self {
        Self { store, key, derive }
    }

    /// The key this accessor is wired to.
    #[inline]
    pub fn key(&self) -> CellKey {
        self.key
    }
}

impl<O, V: CellValue> CellAccessor<O, V> for ComputedCell<O, V> {
    /// Read the computed value, evaluating the derivation on a cache miss.
    ///
    /// Evaluation pushes this key onto the store's evaluation stack, so reads
    /// performed by the derivation register edges against it, then pops the
    /// key on both the success and error paths before caching the result.
    /// Re-entering a key already on the stack is a fatal
    /// [`CellError::CyclicDependency`] whose chain is the full stack plus the
    /// offending key, leaving the store usable once the definition is fixed.
    fn get(&self, owner: &O) -> CellResult<V> {
        if let Some(caller) = self.store.caller() {
            self.store.add_dependency(caller, self.key);
        }

        if let Some(value) = self.store.get(self.key) {
            trace!("Cache hit for {}", self.key);
            return Ok(value);
        }
        trace!("Cache miss for {}", self.key);

        if self.store.is_computing(self.key) {
            let mut chain = self.store.call_stack();
            chain.push(self.key);
            return Err(CellError::CyclicDependency { chain });
        }

        self.store.push_caller(self.key);
        let result = (self.derive)(owner);
        self.store.pop_caller();

        let value = result?;
        self.store.store(self.key, value.clone());
        Ok(value)
    }
}
