// ============================================================================
// spark-query - Configuration
// Gate timing and initial query values
// ============================================================================
//
// Both intervals are UX tuning knobs, so they live here rather than being
// baked into the gate or composer. Config is plain serde data: embed it in
// whatever settings file the host application already loads.
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants::*;
use super::error::PipelineError;
use crate::pipeline::query::{CompositeQuery, SortDirection};

// =============================================================================
// QUERY DEFAULTS
// =============================================================================

/// Initial values of the six query cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub sort_key: String,
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
    pub search_text: String,
    pub category_filter: String,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            sort_key: DEFAULT_SORT_KEY.to_string(),
            direction: SortDirection::Descending,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            search_text: String::new(),
            category_filter: ALL_CATEGORIES.to_string(),
        }
    }
}

impl QueryDefaults {
    /// The composite query a pipeline built from these defaults starts with.
    pub fn to_query(&self) -> CompositeQuery {
        CompositeQuery {
            sort_key: self.sort_key.clone(),
            direction: self.direction,
            page: self.page,
            page_size: self.page_size,
            search_text: self.search_text.clone(),
            category_filter: self.category_filter.clone(),
        }
    }
}

// =============================================================================
// PIPELINE CONFIG
// =============================================================================

/// Configuration for a `ListPipeline`.
///
/// # Example
///
/// ```
/// use spark_query::PipelineConfig;
/// use std::time::Duration;
///
/// let config = PipelineConfig::default().with_search_quiescence(Duration::from_millis(300));
/// assert_eq!(config.search_quiescence(), Duration::from_millis(300));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Debounce window for search text, in milliseconds
    pub search_quiescence_ms: u64,

    /// Composer coalescing delay, in milliseconds
    pub coalesce_delay_ms: u64,

    /// Initial cell values
    pub defaults: QueryDefaults,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_quiescence_ms: DEFAULT_SEARCH_QUIESCENCE.as_millis() as u64,
            coalesce_delay_ms: DEFAULT_COALESCE_DELAY.as_millis() as u64,
            defaults: QueryDefaults::default(),
        }
    }
}

impl PipelineConfig {
    pub fn search_quiescence(&self) -> Duration {
        Duration::from_millis(self.search_quiescence_ms)
    }

    pub fn coalesce_delay(&self) -> Duration {
        Duration::from_millis(self.coalesce_delay_ms)
    }

    pub fn with_search_quiescence(mut self, window: Duration) -> Self {
        self.search_quiescence_ms = window.as_millis() as u64;
        self
    }

    pub fn with_coalesce_delay(mut self, delay: Duration) -> Self {
        self.coalesce_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_defaults(mut self, defaults: QueryDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Reject values no pipeline can start from.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.defaults.page_size == 0 {
            return Err(PipelineError::InvalidPageSize(0));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
