// ============================================================================
// spark-query - Constants
// Defaults for query cells and gate timing
// ============================================================================

use std::time::Duration;

// =============================================================================
// GATE TIMING
// =============================================================================

/// Quiescence window applied to search text before it may trigger a query.
pub const DEFAULT_SEARCH_QUIESCENCE: Duration = Duration::from_millis(1000);

/// Composer coalescing delay. Zero means "next turn of the local scheduler".
pub const DEFAULT_COALESCE_DELAY: Duration = Duration::ZERO;

// =============================================================================
// QUERY DEFAULTS
// =============================================================================

/// Sort key a fresh pipeline starts with
pub const DEFAULT_SORT_KEY: &str = "name";

/// First page index (pages are zero-based)
pub const DEFAULT_PAGE: usize = 0;

/// Rows per page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Category filter meaning "all categories"
pub const ALL_CATEGORIES: &str = "";

// =============================================================================
// TESTS
// =============================================================================
