//! Value seam between the store and consumer-chosen value types.

/// Value type stored in the cell graph.
///
/// A parameter cell that is read before it has ever been written yields
/// [`CellValue::unset`] rather than failing, and the placeholder is cached in
/// the slot like any other value so later writes invalidate dependents that
/// read it. Downstream derivation functions decide how to react to the
/// placeholder.
pub trait CellValue: Clone {
    /// Placeholder yielded by a parameter cell on read-before-write.
    fn unset() -> Self;
}

/// `Option` is the expected consumer value shape: unset is simply `None`.
impl<T: Clone> CellValue for Option<T> {
    #[inline]
    fn unset() -> Self {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_unset_is_none() {
        assert_eq!(<Option<i64> as CellValue>::unset(), None);
    }
}
