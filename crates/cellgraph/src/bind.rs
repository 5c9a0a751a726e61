//! Declaration and binding of an owner type's cells.
//!
//! A [`CellLayout`] is the validated, per-type declaration: which names are
//! parameters and which derivation functions exist. Binding a layout against
//! a shared store allocates a fresh owner identity and produces the
//! per-instance accessor table, a [`CellSet`]. One layout binds any number of
//! instances; all of them land in the same store, which is what allows cells
//! on different instances to depend on each other.

use crate::cell::{CellAccessor as _, ComputedCell, DeriveFn, ParameterCell};
use crate::error::{CellError, CellResult};
use crate::key::{CellKey, OwnerId};
use crate::store::StoreHandle;
use crate::value::CellValue;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

/// Naming convention for derivation functions: `calculate_X` derives the
/// cell `X`. Registering a function without this prefix is a declaration
/// defect.
pub const DERIVE_PREFIX: &str = "calculate_";

/// Builder collecting an owner type's cell declarations.
///
/// Validation happens in [`Self::build`]; declaration order is preserved so
/// collision errors name the later declaration.
pub struct CellLayoutBuilder<O, V> {
    parameters: Vec<&'static str>,
    derivations: Vec<(&'static str, DeriveFn<O, V>)>,
}

impl<O, V> Default for CellLayoutBuilder<O, V> {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
            derivations: Vec::new(),
        }
    }
}

impl<O, V: CellValue> CellLayoutBuilder<O, V> {
    /// Declare a parameter cell.
    #[must_use]
    pub fn parameter(mut self, name: &'static str) -> Self {
        self.parameters.push(name);
        self
    }

    /// Declare a derivation function under its `calculate_`-prefixed name.
    ///
    /// The derived cell's name is the function name with the prefix
    /// stripped.
    #[must_use]
    pub fn derivation(mut self, name: &'static str, derive: DeriveFn<O, V>) -> Self {
        self.derivations.push((name, derive));
        self
    }

    /// Validate the declarations and produce the layout.
    ///
    /// Fatal and never retried: a parameter name colliding with an existing
    /// cell, a derivation whose derived name collides with an existing cell
    /// (parameter or computed), or a derivation registered without the
    /// [`DERIVE_PREFIX`] all yield [`CellError::Configuration`].
    pub fn build(self) -> CellResult<CellLayout<O, V>> {
        let mut declared = FxHashSet::default();

        for name in &self.parameters {
            if !declared.insert(*name) {
                return Err(CellError::Configuration(format!(
                    "{name} is declared as a parameter, but a cell with that name already exists"
                )));
            }
        }

        let mut derivations = Vec::with_capacity(self.derivations.len());
        for (full_name, derive) in self.derivations {
            let Some(name) = full_name.strip_prefix(DERIVE_PREFIX) else {
                return Err(CellError::Configuration(format!(
                    "derivation function {full_name} does not start with the {DERIVE_PREFIX} prefix"
                )));
            };
            if !declared.insert(name) {
                return Err(CellError::Configuration(format!(
                    "{full_name} derives the {name} cell, but a cell with that name already exists"
                )));
            }
            derivations.push((name, derive));
        }

        Ok(CellLayout {
            parameters: self.parameters,
            derivations,
        })
    }
}

/// Validated cell declaration for one owner type.
///
/// Derived cell names are stored with the prefix already stripped.
pub struct CellLayout<O, V> {
    parameters: Vec<&'static str>,
    derivations: Vec<(&'static str, DeriveFn<O, V>)>,
}

impl<O, V: CellValue> CellLayout<O, V> {
    /// Start declaring a layout.
    #[must_use]
    pub fn builder() -> CellLayoutBuilder<O, V> {
        CellLayoutBuilder::default()
    }

    /// Declared parameter names, in declaration order.
    #[inline]
    pub fn parameters(&self) -> &[&'static str] {
        &self.parameters
    }

    /// Derived cell names (prefix stripped), in declaration order.
    pub fn derived_names(&self) -> Vec<&'static str> {
        self.derivations.iter().map(|(name, _)| *name).collect()
    }

    /// Bind this layout to a store for one owner instance.
    ///
    /// Allocates a fresh owner identity and wires one accessor per declared
    /// name to the shared store with key (owner id, name). A layout may be
    /// bound any number of times; each binding is an independent instance in
    /// the same dependency graph.
    pub fn bind(&self, store: &StoreHandle<V>) -> CellSet<O, V> {
        let owner = store.allocate_owner();

        let parameters = self
            .parameters
            .iter()
            .map(|&name| {
                let cell = ParameterCell::new(store.clone(), CellKey::new(owner, name));
                (name, cell)
            })
            .collect();

        let computed = self
            .derivations
            .iter()
            .map(|&(name, derive)| {
                let cell = ComputedCell::new(store.clone(), CellKey::new(owner, name), derive);
                (name, cell)
            })
            .collect();

        debug!(
            "Bound {} parameter and {} computed cells for owner {owner}",
            self.parameters.len(),
            self.derivations.len()
        );

        CellSet {
            owner,
            parameters,
            computed,
        }
    }
}

/// Bound accessor table for one owner instance.
pub struct CellSet<O, V> {
    owner: OwnerId,
    parameters: FxHashMap<&'static str, ParameterCell<V>>,
    computed: FxHashMap<&'static str, ComputedCell<O, V>>,
}

impl<O, V: CellValue> CellSet<O, V> {
    /// This instance's identity in the shared store.
    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Direct access to a bound parameter accessor.
    #[inline]
    pub fn parameter(&self, name: &str) -> Option<&ParameterCell<V>> {
        self.parameters.get(name)
    }

    /// Direct access to a bound computed accessor.
    #[inline]
    pub fn computed(&self, name: &str) -> Option<&ComputedCell<O, V>> {
        self.computed.get(name)
    }

    /// Read the named cell, parameter or computed.
    ///
    /// Both kinds dispatch through [`CellAccessor::get`]; `owner` is the
    /// instance hosting this set, handed to the derivation function on a
    /// computed-cell miss.
    ///
    /// [`CellAccessor::get`]: crate::CellAccessor::get
    pub fn get(&self, owner: &O, name: &str) -> CellResult<V> {
        if let Some(cell) = self.parameters.get(name) {
            return cell.get(owner);
        }
        if let Some(cell) = self.computed.get(name) {
            return cell.get(owner);
        }
        Err(CellError::Configuration(format!(
            "no cell named {name} is declared on owner {}",
            self.owner
        )))
    }

    /// Write the named parameter cell.
    ///
    /// Computed cells are read-only through the engine; addressing one here
    /// is a declaration-surface defect, as is an undeclared name.
    pub fn set(&self, name: &str, value: V) -> CellResult<()> {
        if let Some(cell) = self.parameters.get(name) {
            cell.set(value);
            return Ok(());
        }
        if self.computed.contains_key(name) {
            return Err(CellError::Configuration(format!(
                "{name} is a computed cell on owner {} and cannot be written",
                self.owner
            )));
        }
        Err(CellError::Configuration(format!(
            "no cell named {name} is declared on owner {}",
            self.owner
        )))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test declarations are known valid")]
mod tests {
    use super::*;

    type Value = Option<i64>;

    struct Plain {
        cells: CellSet<Plain, Value>,
    }

    fn calculate_double(owner: &Plain) -> CellResult<Value> {
        let base = owner.cells.get(owner, "base")?;
        Ok(base.map(|value| value * 2))
    }

    fn layout() -> CellLayout<Plain, Value> {
        CellLayout::builder()
            .parameter("base")
            .derivation("calculate_double", calculate_double)
            .build()
            .unwrap()
    }

    #[test]
    fn build_exposes_declared_names() {
        let layout = layout();
        assert_eq!(layout.parameters(), ["base"]);
        assert_eq!(layout.derived_names(), ["double"]);
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let result = CellLayout::<Plain, Value>::builder()
            .parameter("base")
            .parameter("base")
            .build();
        assert!(matches!(result, Err(CellError::Configuration(_))));
    }

    #[test]
    fn derivation_colliding_with_parameter_is_rejected() {
        let result = CellLayout::<Plain, Value>::builder()
            .parameter("double")
            .derivation("calculate_double", calculate_double)
            .build();
        assert!(matches!(result, Err(CellError::Configuration(_))));
    }

    #[test]
    fn duplicate_derivation_is_rejected() {
        let result = CellLayout::<Plain, Value>::builder()
            .derivation("calculate_double", calculate_double)
            .derivation("calculate_double", calculate_double)
            .build();
        assert!(matches!(result, Err(CellError::Configuration(_))));
    }

    #[test]
    fn derivation_without_prefix_is_rejected() {
        let result = CellLayout::<Plain, Value>::builder()
            .derivation("double", calculate_double)
            .build();
        assert!(matches!(result, Err(CellError::Configuration(_))));
    }

    #[test]
    fn bind_wires_accessors_to_one_owner() {
        let store = StoreHandle::new();
        let plain = Plain {
            cells: layout().bind(&store),
        };

        let base = plain.cells.parameter("base").unwrap();
        let double = plain.cells.computed("double").unwrap();
        assert_eq!(base.key().owner, plain.cells.owner());
        assert_eq!(double.key().owner, plain.cells.owner());

        plain.cells.set("base", Some(4)).unwrap();
        assert_eq!(plain.cells.get(&plain, "double"), Ok(Some(8)));
    }

    #[test]
    fn each_binding_gets_its_own_owner() {
        let store = StoreHandle::new();
        let layout = layout();
        let first = Plain {
            cells: layout.bind(&store),
        };
        let second = Plain {
            cells: layout.bind(&store),
        };
        assert_ne!(first.cells.owner(), second.cells.owner());

        first.cells.set("base", Some(1)).unwrap();
        second.cells.set("base", Some(10)).unwrap();
        assert_eq!(first.cells.get(&first, "double"), Ok(Some(2)));
        assert_eq!(second.cells.get(&second, "double"), Ok(Some(20)));
    }

    #[test]
    fn undeclared_name_is_a_configuration_error() {
        let store = StoreHandle::new();
        let plain = Plain {
            cells: layout().bind(&store),
        };

        assert!(matches!(
            plain.cells.get(&plain, "missing"),
            Err(CellError::Configuration(_))
        ));
        assert!(matches!(
            plain.cells.set("missing", Some(1)),
            Err(CellError::Configuration(_))
        ));
    }

    #[test]
    fn writing_a_computed_cell_is_rejected() {
        let store = StoreHandle::new();
        let plain = Plain {
            cells: layout().bind(&store),
        };

        assert!(matches!(
            plain.cells.set("double", Some(1)),
            Err(CellError::Configuration(_))
        ));
    }
}
