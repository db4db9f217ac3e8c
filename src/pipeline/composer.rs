// ============================================================================
// spark-query - Composer
// Fan-in of every query cell into one de-duplicated composite stream
// ============================================================================
//
// The composer never looks at which cell fired. A trigger only marks it
// dirty; the flush re-reads *all* cells through the snapshot function. That
// keeps cells free of references to each other and makes the emitted value
// independent of trigger order.
//
// Coalescing:
// - outside a batch, the first trigger of a tick schedules one deferred
//   flush; later triggers in the same tick find it already scheduled
// - inside a batch, the flush runs synchronously when the batch closes
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::core::context::PendingFlush;
use crate::core::types::Trigger;
use crate::primitives::view::ViewStream;
use crate::reactivity::scheduling::{schedule_flush, Spawner};

// =============================================================================
// COMPOSER INNER
// =============================================================================

struct ComposerInner<Q> {
    /// Reads the current value of every cell
    read: Box<dyn Fn() -> Q>,

    /// Delay between the first trigger of a tick and the flush
    delay: Duration,

    spawner: Spawner,

    /// A flush is pending (deferred task or end of batch)
    scheduled: Cell<bool>,

    /// The next flush emits even if the composite is unchanged
    forced: Cell<bool>,

    /// Flushes that found nothing new
    suppressed: Cell<u64>,

    /// Last emitted composite
    last: RefCell<Option<Q>>,

    output: ViewStream<Q>,
}

impl<Q: Clone + PartialEq + std::fmt::Debug + 'static> PendingFlush for ComposerInner<Q> {
    fn flush(&self) {
        self.scheduled.set(false);
        let forced = self.forced.replace(false);

        let query = (self.read)();
        if !forced && self.last.borrow().as_ref() == Some(&query) {
            self.suppressed.set(self.suppressed.get() + 1);
            trace!(query = ?query, "composite unchanged, not re-emitted");
            return;
        }

        *self.last.borrow_mut() = Some(query.clone());
        debug!(query = ?query, "composite emitted");
        self.output.emit(query);
    }

    fn discard(&self) {
        self.scheduled.set(false);
        self.forced.set(false);
    }
}

// =============================================================================
// COMPOSER
// =============================================================================

/// Combines cell snapshots into a stream of distinct composite queries.
///
/// The first composite is emitted synchronously by `new` (cold start).
///
/// # Example
///
/// ```
/// use spark_query::{batch, Composer, QueryCell};
/// use std::time::Duration;
///
/// let search = QueryCell::new(String::new());
/// let category = QueryCell::new(String::new());
///
/// let composer = Composer::new(
///     {
///         let (search, category) = (search.clone(), category.clone());
///         move || (search.current(), category.current())
///     },
///     Duration::ZERO,
/// );
/// assert_eq!(composer.output().latest(), Some((String::new(), String::new())));
///
/// // Re-triggering without a change emits nothing
/// batch(|| composer.trigger());
/// assert_eq!(composer.emitted(), 1);
/// ```
pub struct Composer<Q> {
    inner: Rc<ComposerInner<Q>>,
}

impl<Q> Clone for Composer<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Q: Clone + PartialEq + std::fmt::Debug + 'static> Composer<Q> {
    /// Create a composer over `read` and emit the cold-start composite.
    ///
    /// Deferred flushes go to the ambient `LocalSet`; triggering outside one
    /// panics. Use `with_spawner` to target a specific set.
    pub fn new(read: impl Fn() -> Q + 'static, coalesce_delay: Duration) -> Self {
        Self::with_spawner(read, coalesce_delay, Spawner::Ambient)
    }

    /// Like `new`, with deferred flushes spawned through `spawner`.
    pub fn with_spawner(
        read: impl Fn() -> Q + 'static,
        coalesce_delay: Duration,
        spawner: Spawner,
    ) -> Self {
        let composer = Self {
            inner: Rc::new(ComposerInner {
                read: Box::new(read),
                delay: coalesce_delay,
                spawner,
                scheduled: Cell::new(false),
                forced: Cell::new(false),
                suppressed: Cell::new(0),
                last: RefCell::new(None),
                output: ViewStream::new(),
            }),
        };
        composer.inner.flush();
        composer
    }

    /// Mark the composer dirty. At most one flush is pending at a time.
    pub fn trigger(&self) {
        if self.inner.scheduled.replace(true) {
            return;
        }

        let as_flush: Rc<dyn PendingFlush> = self.inner.clone();
        let weak: Weak<dyn PendingFlush> = Rc::downgrade(&as_flush);
        // The deferred task only holds a weak reference; dropping the
        // handle detaches it rather than cancelling it.
        let _ = schedule_flush(weak, self.inner.delay, &self.inner.spawner);
    }

    /// Trigger a flush that emits even if the composite did not change.
    ///
    /// For inputs the snapshot does not cover (an owner context read at
    /// dispatch time, say). Coalesces with ordinary triggers of the same tick.
    pub fn invalidate(&self) {
        self.inner.forced.set(true);
        self.trigger();
    }

    /// A trigger that does not keep the composer alive.
    pub fn trigger_handle(&self) -> Trigger {
        let weak = Rc::downgrade(&self.inner);
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                Composer { inner }.trigger();
            }
        })
    }

    /// Flush now, bypassing the coalescing delay.
    pub fn flush(&self) {
        self.inner.flush();
    }

    /// The stream of distinct composites.
    pub fn output(&self) -> ViewStream<Q> {
        self.inner.output.clone()
    }

    /// Last emitted composite.
    pub fn last(&self) -> Option<Q> {
        self.inner.last.borrow().clone()
    }

    /// Number of composites emitted so far, cold start included.
    pub fn emitted(&self) -> u64 {
        self.inner.output.emissions()
    }

    /// Number of flushes that produced nothing new.
    pub fn suppressed(&self) -> u64 {
        self.inner.suppressed.get()
    }

    /// Whether a flush is pending.
    pub fn is_scheduled(&self) -> bool {
        self.inner.scheduled.get()
    }
}

// =============================================================================
// TESTS
// =============================================================================
