//! Error types for declaration and evaluation failures.

use crate::key::CellKey;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias used throughout the crate.
pub type CellResult<T> = Result<T, CellError>;

/// Fatal error raised by the cell graph.
///
/// Both variants indicate a defect in the consumer's declaration or
/// derivation functions, not a runtime condition; neither is retried by the
/// engine. Reading an unset parameter is deliberately *not* an error: it
/// yields the [`CellValue::unset`] placeholder instead.
///
/// [`CellValue::unset`]: crate::CellValue::unset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    /// A parameter or derived cell name collided with an existing cell, or a
    /// name was addressed that the owner never declared. Raised at
    /// declaration/binding time (or on a misaddressed access); the owner type
    /// cannot be used until its declaration is fixed.
    Configuration(String),
    /// A computed cell's evaluation re-entered itself while already on the
    /// evaluation stack. The chain is the full stack at the moment of
    /// detection with the offending key appended, so the exact cycle is
    /// visible.
    CyclicDependency {
        /// Ordered evaluation chain that formed the cycle.
        chain: Vec<CellKey>,
    },
}

impl Display for CellError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(message) => {
                write!(f, "invalid cell declaration: {message}")
            }
            Self::CyclicDependency { chain } => {
                write!(f, "cyclic dependency detected: ")?;
                for (index, key) in chain.iter().enumerate() {
                    if index > 0 {
                        write!(f, " -> ")?;
                    }
                    write!(f, "{key}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for CellError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::OwnerId;

    #[test]
    fn configuration_display() {
        let error = CellError::Configuration("total is already declared".to_string());
        assert_eq!(
            error.to_string(),
            "invalid cell declaration: total is already declared"
        );
    }

    #[test]
    fn cycle_display_renders_chain_in_order() {
        let owner = OwnerId::new(0);
        let error = CellError::CyclicDependency {
            chain: vec![
                CellKey::new(owner, "total"),
                CellKey::new(owner, "subtotal"),
                CellKey::new(owner, "total"),
            ],
        };
        assert_eq!(
            error.to_string(),
            "cyclic dependency detected: #0.total -> #0.subtotal -> #0.total"
        );
    }
}
