// ============================================================================
// spark-query - Cancelling Dispatcher
// One fetch per composite query, latest query wins
// ============================================================================
//
// Cancellation here is logical, not transport-level. Every dispatch takes a
// fresh token from a monotonic counter; a fetch that completes with a token
// other than the latest one is simply dropped. The data source is never asked
// to abort anything, and a superseded request keeps running until it
// finishes on its own.
//
// Lifecycle of one execution:
//   dispatch(q) -> token n, emit Loading, spawn fetch
//   fetch done  -> token == latest ? emit Ready / Failed : drop (stale)
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::core::error::FetchError;
use crate::core::types::{FetchFn, FetchFuture};
use crate::pipeline::state::FetchState;
use crate::primitives::subscription::Subscription;
use crate::primitives::view::ViewStream;
use crate::reactivity::scheduling::Spawner;

// =============================================================================
// DISPATCHER INNER
// =============================================================================

struct DispatcherInner<Q, T> {
    /// Name used in logs ("page", "total", ...)
    name: &'static str,

    fetch: FetchFn<Q, T>,

    spawner: Spawner,

    /// Token of the most recently issued execution
    latest_token: Cell<u64>,

    /// Executions spawned but not yet completed, superseded ones included
    outstanding: Cell<usize>,

    /// Results dropped because a newer query had been issued
    stale: Cell<u64>,

    last_query: RefCell<Option<Q>>,

    output: ViewStream<FetchState<T>>,
}

impl<Q, T> DispatcherInner<Q, T>
where
    Q: Clone + std::fmt::Debug + 'static,
    T: Clone + 'static,
{
    fn dispatch(self: &Rc<Self>, query: Q) {
        let token = self.latest_token.get() + 1;
        self.latest_token.set(token);
        *self.last_query.borrow_mut() = Some(query.clone());
        self.outstanding.set(self.outstanding.get() + 1);

        debug!(dispatcher = self.name, token, query = ?query, "fetch dispatched");
        self.output.emit(FetchState::Loading);

        let execution = (self.fetch)(query);
        let weak = Rc::downgrade(self);
        self.spawner.spawn(async move {
            let result = execution.await;
            if let Some(inner) = weak.upgrade() {
                inner.settle(token, result);
            }
        });
    }

    fn settle(&self, token: u64, result: Result<T, FetchError>) {
        self.outstanding.set(self.outstanding.get().saturating_sub(1));

        let latest = self.latest_token.get();
        if token != latest {
            self.stale.set(self.stale.get() + 1);
            trace!(
                dispatcher = self.name,
                token,
                latest,
                ok = result.is_ok(),
                "superseded result dropped"
            );
            return;
        }

        match result {
            Ok(value) => {
                debug!(dispatcher = self.name, token, "fetch resolved");
                self.output.emit(FetchState::Ready(value));
            }
            Err(error) => {
                warn!(dispatcher = self.name, token, %error, "fetch failed");
                self.output.emit(FetchState::Failed(error));
            }
        }
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Turns a stream of composite queries into a multicast `FetchState` stream.
///
/// At most one execution's outcome reaches the output per dispatcher: a slow
/// early response never overwrites a fast late one. Subscribing to the
/// output (directly or through derived views) never starts a fetch.
///
/// # Panics
///
/// `new` spawns fetches on the ambient local set: construct the dispatcher,
/// and write to the cells feeding it, inside a `tokio::task::LocalSet`.
/// `with_spawner` has no such requirement.
pub struct Dispatcher<Q, T> {
    inner: Rc<DispatcherInner<Q, T>>,
    _upstream: Subscription,
}

impl<Q, T> Dispatcher<Q, T>
where
    Q: Clone + std::fmt::Debug + 'static,
    T: Clone + 'static,
{
    /// Attach to `queries` and dispatch every composite it emits, starting
    /// with its current one.
    pub fn new(
        name: &'static str,
        queries: &ViewStream<Q>,
        fetch: impl Fn(Q) -> FetchFuture<T> + 'static,
    ) -> Self {
        Self::with_spawner(name, queries, fetch, Spawner::Ambient)
    }

    /// Like `new`, with fetches spawned through `spawner`.
    pub fn with_spawner(
        name: &'static str,
        queries: &ViewStream<Q>,
        fetch: impl Fn(Q) -> FetchFuture<T> + 'static,
        spawner: Spawner,
    ) -> Self {
        let inner = Rc::new(DispatcherInner {
            name,
            fetch: Rc::new(fetch) as FetchFn<Q, T>,
            spawner,
            latest_token: Cell::new(0),
            outstanding: Cell::new(0),
            stale: Cell::new(0),
            last_query: RefCell::new(None),
            output: ViewStream::new(),
        });

        let weak = Rc::downgrade(&inner);
        let upstream = queries.subscribe(move |query: &Q| {
            if let Some(inner) = weak.upgrade() {
                inner.dispatch(query.clone());
            }
        });

        Self {
            inner,
            _upstream: upstream,
        }
    }

    /// Re-dispatch the last query even though it did not change.
    ///
    /// Returns false when nothing was dispatched yet.
    pub fn refresh(&self) -> bool {
        let last = self.inner.last_query.borrow().clone();
        match last {
            Some(query) => {
                debug!(dispatcher = self.inner.name, "refresh requested");
                self.inner.dispatch(query);
                true
            }
            None => false,
        }
    }

    /// The multicast state stream.
    pub fn output(&self) -> ViewStream<FetchState<T>> {
        self.inner.output.clone()
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Token of the most recent execution (0 before the first dispatch).
    pub fn latest_token(&self) -> u64 {
        self.inner.latest_token.get()
    }

    /// Executions still running, superseded ones included.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.get()
    }

    /// Number of results dropped as superseded.
    pub fn stale(&self) -> u64 {
        self.inner.stale.get()
    }

    pub fn last_query(&self) -> Option<Q> {
        self.inner.last_query.borrow().clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    /// Echo fetch: resolves to `query * 10` after `query` milliseconds,
    /// failing for 99.
    fn echo_fetch(calls: Rc<Cell<u32>>) -> impl Fn(u64) -> FetchFuture<u64> {
        move |query: u64| -> FetchFuture<u64> {
            calls.set(calls.get() + 1);
            Box::pin(async move {
                sleep(Duration::from_millis(query)).await;
                if query == 99 {
                    Err(FetchError::transport("unreachable"))
                } else {
                    Ok(query * 10)
                }
            })
        }
    }

    fn record(view: &ViewStream<FetchState<u64>>) -> (Rc<RefCell<Vec<FetchState<u64>>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = view.subscribe({
            let seen = seen.clone();
            move |s: &FetchState<u64>| seen.borrow_mut().push(s.clone())
        });
        (seen, sub)
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_current_query_on_attach() {
        LocalSet::new()
            .run_until(async {
                let queries = ViewStream::with_initial(30u64);
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));

                assert_eq!(calls.get(), 1);
                assert_eq!(dispatcher.latest_token(), 1);
                assert_eq!(dispatcher.output().latest(), Some(FetchState::Loading));

                sleep(Duration::from_millis(31)).await;
                assert_eq!(dispatcher.output().latest(), Some(FetchState::Ready(300)));
                assert_eq!(dispatcher.outstanding(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_early_result_never_overwrites_fast_late_one() {
        LocalSet::new()
            .run_until(async {
                let queries = ViewStream::with_initial(500u64);
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));
                let (seen, _sub) = record(&dispatcher.output());

                queries.emit(20);
                assert_eq!(dispatcher.outstanding(), 2);

                sleep(Duration::from_secs(1)).await;

                assert_eq!(
                    *seen.borrow(),
                    vec![
                        FetchState::Loading,
                        FetchState::Loading,
                        FetchState::Ready(200),
                    ]
                );
                assert_eq!(dispatcher.stale(), 1);
                assert_eq!(dispatcher.outstanding(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn fast_early_result_arriving_after_supersession_is_dropped() {
        LocalSet::new()
            .run_until(async {
                let queries = ViewStream::with_initial(20u64);
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));
                let (seen, _sub) = record(&dispatcher.output());

                sleep(Duration::from_millis(5)).await;
                queries.emit(40);

                sleep(Duration::from_millis(100)).await;
                assert_eq!(
                    *seen.borrow(),
                    vec![
                        FetchState::Loading,
                        FetchState::Loading,
                        FetchState::Ready(400),
                    ]
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_forwarded_once_then_pipeline_recovers() {
        LocalSet::new()
            .run_until(async {
                let queries = ViewStream::with_initial(99u64);
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));
                let (seen, _sub) = record(&dispatcher.output());

                sleep(Duration::from_millis(200)).await;
                assert_eq!(
                    *seen.borrow(),
                    vec![
                        FetchState::Loading,
                        FetchState::Failed(FetchError::transport("unreachable")),
                    ]
                );
                assert_eq!(calls.get(), 1, "failures are not retried");

                queries.emit(10);
                sleep(Duration::from_millis(20)).await;
                assert_eq!(dispatcher.output().latest(), Some(FetchState::Ready(100)));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_re_dispatches_unchanged_query() {
        LocalSet::new()
            .run_until(async {
                let queries = ViewStream::with_initial(10u64);
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));

                sleep(Duration::from_millis(20)).await;
                assert!(dispatcher.refresh());
                assert_eq!(calls.get(), 2);
                assert_eq!(dispatcher.latest_token(), 2);
                assert_eq!(dispatcher.output().latest(), Some(FetchState::Loading));
                assert_eq!(dispatcher.last_query(), Some(10));

                sleep(Duration::from_millis(20)).await;
                assert_eq!(dispatcher.output().latest(), Some(FetchState::Ready(100)));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_before_any_query_is_a_no_op() {
        LocalSet::new()
            .run_until(async {
                let queries: ViewStream<u64> = ViewStream::new();
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));

                assert!(!dispatcher.refresh());
                assert_eq!(calls.get(), 0);
                assert_eq!(dispatcher.output().latest(), None);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn extra_consumers_never_fetch() {
        LocalSet::new()
            .run_until(async {
                let queries = ViewStream::with_initial(10u64);
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));

                let (_a, _sa) = record(&dispatcher.output());
                let loading = dispatcher.output().map(FetchState::is_loading);
                let (_b, _sb) = record(&dispatcher.output());
                let _sl = loading.subscribe(|_| {});

                sleep(Duration::from_millis(20)).await;
                assert_eq!(calls.get(), 1);
                assert_eq!(loading.latest(), Some(false));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_dispatcher_ignores_late_results() {
        LocalSet::new()
            .run_until(async {
                let queries = ViewStream::with_initial(50u64);
                let calls = Rc::new(Cell::new(0));
                let dispatcher = Dispatcher::new("test", &queries, echo_fetch(calls.clone()));
                let output = dispatcher.output();

                drop(dispatcher);
                sleep(Duration::from_millis(100)).await;

                assert_eq!(output.latest(), Some(FetchState::Loading));
                assert_eq!(queries.subscriber_count(), 0);
            })
            .await;
    }
}
