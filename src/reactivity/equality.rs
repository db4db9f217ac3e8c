// ============================================================================
// spark-query - Equality Functions
// Comparisons available to distinct gates
// ============================================================================

// =============================================================================
// STRICT EQUALITY (Default)
// =============================================================================

/// Default strict equality using PartialEq.
/// Page and page-size gates use this.
///
/// # Example
/// ```
/// use spark_query::reactivity::equality::equals;
///
/// assert!(equals(&2usize, &2usize));
/// assert!(!equals(&2usize, &3usize));
/// ```
pub fn equals<T: PartialEq>(a: &T, b: &T) -> bool {
    a == b
}

// =============================================================================
// TESTS
// =============================================================================
