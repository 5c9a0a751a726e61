//! Demand-driven incremental computation over named cells.
//!
//! This crate provides a self-adjusting cell graph with:
//! - Automatic memoization of derived values
//! - Dependency discovery from runtime read patterns
//! - Incremental invalidation (only clear what a write actually affects)
//! - Cycle detection with a full diagnostic chain
//!
//! # Architecture
//!
//! The system is organized in layers:
//!
//! ```text
//! CellStore (values + dependency edges + evaluation stack)
//!     ↑
//! ParameterCell / ComputedCell (per-cell accessors)
//!     ↑
//! CellLayout / CellSet (validated declaration and per-instance binding)
//! ```
//!
//! A [`CellStore`] is created once per dependency-graph scope and shared, via
//! a [`StoreHandle`], by every owner participating in that graph. Owners
//! declare their cells through a [`CellLayout`]: a list of parameter names
//! (externally written inputs) and derivation functions registered under the
//! [`DERIVE_PREFIX`] naming convention. Binding the layout yields a
//! [`CellSet`] of accessors keyed by (owner id, cell name), so cells on
//! different owners can freely depend on each other.
//!
//! Reading a computed cell that has no cached value pushes its key onto the
//! store's evaluation stack and runs its derivation function; every cell read
//! the derivation performs records a dependency edge against that key. Writing
//! a parameter clears the written cell and its transitive dependents, so the
//! next read recomputes exactly the affected values.
//!
//! # Example
//!
//! ```ignore
//! use cellgraph::{CellLayout, CellResult, CellSet, StoreHandle};
//!
//! struct Pricing {
//!     cells: CellSet<Pricing, Option<i64>>,
//! }
//!
//! fn calculate_total(owner: &Pricing) -> CellResult<Option<i64>> {
//!     let base = owner.cells.get(owner, "base")?;
//!     let tax = owner.cells.get(owner, "tax")?;
//!     Ok(base.zip(tax).map(|(amount, rate)| amount + rate))
//! }
//!
//! let store = StoreHandle::new();
//! let layout = CellLayout::builder()
//!     .parameter("base")
//!     .parameter("tax")
//!     .derivation("calculate_total", calculate_total)
//!     .build()?;
//!
//! let pricing = Pricing { cells: layout.bind(&store) };
//! pricing.cells.set("base", Some(100))?;
//! pricing.cells.set("tax", Some(19))?;
//! let total = pricing.cells.get(&pricing, "total")?;
//! ```

#![allow(
    clippy::module_name_repetitions,
    reason = "Cell types like CellStore are clearer than just Store"
)]
#![allow(clippy::missing_errors_doc, reason = "Errors documented on CellError")]

mod bind;
mod cell;
mod error;
mod key;
mod store;
mod value;

// Re-exports
pub use bind::{CellLayout, CellLayoutBuilder, CellSet, DERIVE_PREFIX};
pub use cell::{CellAccessor, ComputedCell, DeriveFn, ParameterCell};
pub use error::{CellError, CellResult};
pub use key::{CellKey, OwnerId};
pub use store::{CellStore, StoreHandle};
pub use value::CellValue;
