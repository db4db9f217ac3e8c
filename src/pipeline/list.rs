// ============================================================================
// spark-query - List Pipeline
// Cells -> gates -> composers -> dispatchers -> views, for one paged list
// ============================================================================
//
// Two independent chains share the cells:
//
//   sort, direction, page, size, search, category
//     -> page composer  -> page dispatcher  -> rows, loading
//   search, category
//     -> total composer -> total dispatcher -> total, total_loading
//
// Each chain has its own gates and its own token domain, so paging never
// re-fetches the total and a slow count never interferes with row fetches.
// ============================================================================

use std::rc::Rc;

use tokio::task::LocalSet;
use tracing::debug;

use crate::core::config::PipelineConfig;
use crate::core::error::{FetchError, PipelineError};
use crate::core::types::FetchFuture;
use crate::pipeline::composer::Composer;
use crate::pipeline::dispatcher::Dispatcher;
use crate::pipeline::query::{CompositeQuery, SortDirection, TotalQuery};
use crate::pipeline::source::DataSource;
use crate::pipeline::state::FetchState;
use crate::primitives::cell::QueryCell;
use crate::primitives::gate::{gate_on, GatePolicy};
use crate::primitives::subscription::Subscription;
use crate::primitives::view::ViewStream;
use crate::reactivity::batching::batch;
use crate::reactivity::scheduling::{has_runtime, Spawner};

/// Rows of one page, or the failure of the fetch that should have produced them.
pub type RowsResult<I> = Result<Vec<I>, FetchError>;

// =============================================================================
// QUERY CELLS
// =============================================================================

/// The six list dimensions.
#[derive(Clone)]
struct Cells {
    sort_key: QueryCell<String>,
    direction: QueryCell<SortDirection>,
    page: QueryCell<usize>,
    page_size: QueryCell<usize>,
    search_text: QueryCell<String>,
    category_filter: QueryCell<String>,
}

impl Cells {
    fn from_config(config: &PipelineConfig) -> Self {
        let d = &config.defaults;
        Self {
            sort_key: QueryCell::new(d.sort_key.clone()),
            direction: QueryCell::new(d.direction),
            page: QueryCell::new(d.page),
            page_size: QueryCell::new(d.page_size),
            search_text: QueryCell::new(d.search_text.clone()),
            category_filter: QueryCell::new(d.category_filter.clone()),
        }
    }

    fn composite(&self) -> CompositeQuery {
        CompositeQuery {
            sort_key: self.sort_key.current(),
            direction: self.direction.current(),
            page: self.page.current(),
            page_size: self.page_size.current(),
            search_text: self.search_text.current(),
            category_filter: self.category_filter.current(),
        }
    }

    fn filters(&self) -> TotalQuery {
        TotalQuery {
            search_text: self.search_text.current(),
            category_filter: self.category_filter.current(),
        }
    }
}

// =============================================================================
// LIST PIPELINE
// =============================================================================

/// A paged, sorted, filtered list backed by a `DataSource`.
///
/// Every timer and fetch is spawned onto the `LocalSet` passed to `new`.
/// Building and mutating the pipeline work from outside that set; results
/// arrive while the set is being driven. The first page and total are
/// requested immediately.
///
/// ```no_run
/// # use std::rc::Rc;
/// # use tokio::task::LocalSet;
/// # use spark_query::{DataSource, FetchError, CompositeQuery, TotalQuery, ListPipeline, PipelineConfig};
/// # struct Contacts;
/// # #[async_trait::async_trait(?Send)]
/// # impl DataSource for Contacts {
/// #     type Scope = u32;
/// #     type Item = String;
/// #     async fn fetch_page(&self, _: &u32, _: &CompositeQuery) -> Result<Vec<String>, FetchError> { Ok(vec![]) }
/// #     async fn fetch_total(&self, _: &u32, _: &TotalQuery) -> Result<u64, FetchError> { Ok(0) }
/// # }
/// # async fn demo() -> Result<(), spark_query::PipelineError> {
/// let local = Rc::new(LocalSet::new());
/// let list = ListPipeline::new(Contacts, 7, PipelineConfig::default(), &local)?;
///
/// let _spinner = list.loading().subscribe(|busy| println!("loading: {busy}"));
/// let _table = list.rows().subscribe(|rows| println!("rows: {rows:?}"));
///
/// list.set_search_text("ann");
/// list.set_pagination(0, 25)?;
///
/// // Drive timers and fetches
/// local.run_until(tokio::time::sleep(std::time::Duration::from_secs(2))).await;
/// # Ok(())
/// # }
/// ```
pub struct ListPipeline<S: DataSource> {
    config: PipelineConfig,
    scope: QueryCell<S::Scope>,
    cells: Cells,

    page_composer: Composer<CompositeQuery>,
    total_composer: Composer<TotalQuery>,
    page_dispatcher: Dispatcher<CompositeQuery, Vec<S::Item>>,
    total_dispatcher: Dispatcher<TotalQuery, u64>,

    rows: ViewStream<RowsResult<S::Item>>,
    loading: ViewStream<bool>,
    total: ViewStream<Result<u64, FetchError>>,
    total_loading: ViewStream<bool>,

    _gates: Vec<Subscription>,
}

impl<S: DataSource> ListPipeline<S> {
    /// Build the pipeline on `local` and dispatch the cold-start queries.
    ///
    /// Fails fast on an invalid configuration or when no tokio runtime is
    /// available on this thread.
    pub fn new(
        source: S,
        scope: S::Scope,
        config: PipelineConfig,
        local: &Rc<LocalSet>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if !has_runtime() {
            return Err(PipelineError::NoRuntime);
        }
        let spawner = Spawner::local(local);

        let source = Rc::new(source);
        let scope = QueryCell::new(scope);
        let cells = Cells::from_config(&config);
        let window = config.search_quiescence();
        let delay = config.coalesce_delay();

        // Composers (cold start happens here)
        let page_composer = Composer::with_spawner(
            {
                let cells = cells.clone();
                move || cells.composite()
            },
            delay,
            spawner.clone(),
        );
        let total_composer = Composer::with_spawner(
            {
                let cells = cells.clone();
                move || cells.filters()
            },
            delay,
            spawner.clone(),
        );

        // Gates
        let to_page = page_composer.trigger_handle();
        let to_total = total_composer.trigger_handle();
        let s = &spawner;
        let gates = vec![
            gate_on(&cells.sort_key, GatePolicy::PassThrough, to_page.clone(), s),
            gate_on(&cells.direction, GatePolicy::PassThrough, to_page.clone(), s),
            gate_on(&cells.page, GatePolicy::distinct(), to_page.clone(), s),
            gate_on(&cells.page_size, GatePolicy::distinct(), to_page.clone(), s),
            gate_on(&cells.search_text, GatePolicy::debounce(window), to_page.clone(), s),
            gate_on(&cells.category_filter, GatePolicy::PassThrough, to_page, s),
            gate_on(&cells.search_text, GatePolicy::debounce(window), to_total.clone(), s),
            gate_on(&cells.category_filter, GatePolicy::PassThrough, to_total, s),
        ];

        // Dispatchers
        let page_dispatcher = Dispatcher::with_spawner("page", &page_composer.output(), {
            let source = source.clone();
            let scope = scope.clone();
            move |query: CompositeQuery| -> FetchFuture<Vec<S::Item>> {
                let source = source.clone();
                let scope = scope.current();
                Box::pin(async move { source.fetch_page(&scope, &query).await })
            }
        }, spawner.clone());
        let total_dispatcher = Dispatcher::with_spawner("total", &total_composer.output(), {
            let source = source.clone();
            let scope = scope.clone();
            move |query: TotalQuery| -> FetchFuture<u64> {
                let source = source.clone();
                let scope = scope.current();
                Box::pin(async move { source.fetch_total(&scope, &query).await })
            }
        }, spawner);

        // Views
        let rows = page_dispatcher
            .output()
            .filter_map(FetchState::settled)
            .start_with(Ok(Vec::new()));
        let loading = page_dispatcher.output().map(FetchState::is_loading);
        let total = total_dispatcher.output().filter_map(FetchState::settled);
        let total_loading = total_dispatcher.output().map(FetchState::is_loading);

        debug!(
            search_quiescence = ?window,
            coalesce_delay = ?delay,
            "list pipeline built"
        );

        Ok(Self {
            config,
            scope,
            cells,
            page_composer,
            total_composer,
            page_dispatcher,
            total_dispatcher,
            rows,
            loading,
            total,
            total_loading,
            _gates: gates,
        })
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    /// Rows of the latest query. Never reports loading; starts as `Ok(vec![])`.
    pub fn rows(&self) -> ViewStream<RowsResult<S::Item>> {
        self.rows.clone()
    }

    /// True while a row fetch for the latest query is outstanding.
    pub fn loading(&self) -> ViewStream<bool> {
        self.loading.clone()
    }

    /// Total matching items. No value until the first count arrives.
    pub fn total(&self) -> ViewStream<Result<u64, FetchError>> {
        self.total.clone()
    }

    /// True while a count fetch is outstanding.
    pub fn total_loading(&self) -> ViewStream<bool> {
        self.total_loading.clone()
    }

    /// The composite queries handed to the row dispatcher.
    pub fn queries(&self) -> ViewStream<CompositeQuery> {
        self.page_composer.output()
    }

    /// The filter queries handed to the total dispatcher.
    pub fn total_queries(&self) -> ViewStream<TotalQuery> {
        self.total_composer.output()
    }

    // =========================================================================
    // MUTATORS
    // =========================================================================

    pub fn set_sort(&self, key: impl Into<String>) {
        self.cells.sort_key.set(key.into());
    }

    pub fn set_direction(&self, direction: SortDirection) {
        self.cells.direction.set(direction);
    }

    pub fn set_page(&self, page: usize) {
        self.cells.page.set(page);
    }

    /// Set the page size. Zero is rejected and leaves the cell untouched.
    pub fn set_page_size(&self, size: usize) -> Result<(), PipelineError> {
        if size == 0 {
            return Err(PipelineError::InvalidPageSize(size));
        }
        self.cells.page_size.set(size);
        Ok(())
    }

    /// Search text is debounced: it triggers a query only after the
    /// configured quiet window.
    pub fn set_search_text(&self, text: impl Into<String>) {
        self.cells.search_text.set(text.into());
    }

    pub fn set_category_filter(&self, category: impl Into<String>) {
        self.cells.category_filter.set(category.into());
    }

    /// Set page and page size together, as one pagination event.
    pub fn set_pagination(&self, page: usize, size: usize) -> Result<(), PipelineError> {
        if size == 0 {
            return Err(PipelineError::InvalidPageSize(size));
        }
        batch(|| {
            self.cells.page_size.set(size);
            self.cells.page.set(page);
        });
        Ok(())
    }

    /// Switch the owner context and re-fetch rows and total for it.
    ///
    /// Goes through the composers, so cell writes in the same tick are
    /// fetched together with the new scope.
    pub fn set_scope(&self, scope: S::Scope) {
        self.scope.set(scope);
        self.page_composer.invalidate();
        self.total_composer.invalidate();
    }

    /// Re-issue the current row and total queries (e.g. after an item was
    /// created or deleted elsewhere).
    pub fn refresh(&self) {
        self.page_dispatcher.refresh();
        self.total_dispatcher.refresh();
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// The composite the cells describe right now (not necessarily dispatched
    /// yet, e.g. while search text is inside its quiet window).
    pub fn snapshot(&self) -> CompositeQuery {
        self.cells.composite()
    }

    pub fn scope(&self) -> S::Scope {
        self.scope.current()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Row fetches started so far, refreshes included.
    pub fn page_fetches(&self) -> u64 {
        self.page_dispatcher.latest_token()
    }

    /// Count fetches started so far, refreshes included.
    pub fn total_fetches(&self) -> u64 {
        self.total_dispatcher.latest_token()
    }
}
