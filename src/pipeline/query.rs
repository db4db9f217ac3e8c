// ============================================================================
// spark-query - Query Values
// Composite queries and their dimensions
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::core::error::PipelineError;

// =============================================================================
// SORT DIRECTION
// =============================================================================

/// Sort direction. On the wire it is `1` (ascending) or `-1` (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Wire value: 1 or -1.
    pub fn as_i8(self) -> i8 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// The other direction.
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

impl TryFrom<i8> for SortDirection {
    type Error = PipelineError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SortDirection::Ascending),
            -1 => Ok(SortDirection::Descending),
            other => Err(PipelineError::InvalidDirection(other)),
        }
    }
}

impl From<SortDirection> for i8 {
    fn from(direction: SortDirection) -> Self {
        direction.as_i8()
    }
}

// =============================================================================
// COMPOSITE QUERY
// =============================================================================

/// Snapshot of every list dimension at one coalescing point.
///
/// Equality is structural: two snapshots with equal fields are the same
/// query, no matter which cells fired in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeQuery {
    pub sort_key: String,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
    pub search_text: String,
    pub category_filter: String,
}

impl CompositeQuery {
    /// Projection onto the filtering dimensions (what totals depend on).
    pub fn filters(&self) -> TotalQuery {
        TotalQuery {
            search_text: self.search_text.clone(),
            category_filter: self.category_filter.clone(),
        }
    }

    /// Index of the first row of this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.page_size)
    }
}

// =============================================================================
// TOTAL QUERY
// =============================================================================

/// The filtering dimensions only. Sort and paging never change a total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TotalQuery {
    pub search_text: String,
    pub category_filter: String,
}

// =============================================================================
// TESTS
// =============================================================================
