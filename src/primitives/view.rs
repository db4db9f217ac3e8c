// ============================================================================
// spark-query - View Stream
// Multicast, replay-latest sequences and their derivations
// ============================================================================
//
// A view stream is the shareable end of the pipeline. Subscribing replays the
// latest value (if any) and then every emission. Deriving a view subscribes
// once to its parent: however many views or consumers hang off a dispatcher,
// the dispatcher runs each fetch exactly once.
//
// A derived view holds its subscription to the parent and keeps the parent
// alive, so chains built from temporaries stay connected. The parent holds
// nothing but a weak callback into the child.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::primitives::subscription::{SubscriberList, Subscription};

// =============================================================================
// VIEW INNER
// =============================================================================

struct ViewInner<T> {
    latest: RefCell<Option<T>>,
    emissions: Cell<u64>,
    subscribers: SubscriberList<T>,
    /// Subscription to the parent view (derived views only)
    upstream: RefCell<Option<Subscription>>,
    /// The parent view's inner, type-erased. Dropped after `upstream`.
    parent: RefCell<Option<Rc<dyn Any>>>,
}

// =============================================================================
// VIEW STREAM
// =============================================================================

/// A shareable, replay-latest stream of `T`.
///
/// # Example
///
/// ```
/// use spark_query::ViewStream;
///
/// let states: ViewStream<Option<u32>> = ViewStream::new();
/// let loading = states.map(|s| s.is_none());
/// let values = states.filter_map(|s| *s).start_with(0);
///
/// assert_eq!(values.latest(), Some(0));
///
/// states.emit(None);
/// assert_eq!(loading.latest(), Some(true));
/// assert_eq!(values.latest(), Some(0));
///
/// states.emit(Some(7));
/// assert_eq!(loading.latest(), Some(false));
/// assert_eq!(values.latest(), Some(7));
/// ```
pub struct ViewStream<T> {
    inner: Rc<ViewInner<T>>,
}

impl<T> Clone for ViewStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for ViewStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ViewStream<T> {
    /// A view with no value yet.
    pub fn new() -> Self {
        Self::from_latest(None)
    }

    /// A view seeded with `value`; late subscribers see it until the first
    /// emission replaces it.
    pub fn with_initial(value: T) -> Self {
        Self::from_latest(Some(value))
    }

    fn from_latest(latest: Option<T>) -> Self {
        Self {
            inner: Rc::new(ViewInner {
                latest: RefCell::new(latest),
                emissions: Cell::new(0),
                subscribers: SubscriberList::new(),
                upstream: RefCell::new(None),
                parent: RefCell::new(None),
            }),
        }
    }

    /// Publish a value to every subscriber and remember it for late ones.
    pub fn emit(&self, value: T) {
        *self.inner.latest.borrow_mut() = Some(value.clone());
        self.inner.emissions.set(self.inner.emissions.get() + 1);
        self.inner.subscribers.notify(&value);
    }

    /// The most recent value (or seed).
    pub fn latest(&self) -> Option<T> {
        self.inner.latest.borrow().clone()
    }

    /// Number of `emit` calls so far. Seeds do not count.
    pub fn emissions(&self) -> u64 {
        self.inner.emissions.get()
    }

    /// Number of attached subscribers (derived views count as one each).
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Observe the view: replays the latest value, then every emission.
    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Subscription {
        if let Some(latest) = self.latest() {
            f(&latest);
        }
        self.inner.subscribers.add(Rc::new(f))
    }

    // =========================================================================
    // DERIVATION
    // =========================================================================

    /// Derived view of `f(value)` for every value.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(&T) -> U + 'static) -> ViewStream<U> {
        self.derive(None, move |value, child| child.emit(f(value)))
    }

    /// Derived view keeping only the values `f` maps to `Some`.
    pub fn filter_map<U: Clone + 'static>(
        &self,
        f: impl Fn(&T) -> Option<U> + 'static,
    ) -> ViewStream<U> {
        self.derive(None, move |value, child| {
            if let Some(mapped) = f(value) {
                child.emit(mapped);
            }
        })
    }

    /// Derived view seeded with `seed` until this view produces a value.
    pub fn start_with(&self, seed: T) -> ViewStream<T> {
        self.derive(Some(seed), |value, child| child.emit(value.clone()))
    }

    fn derive<U: Clone + 'static>(
        &self,
        seed: Option<U>,
        forward: impl Fn(&T, &ViewStream<U>) + 'static,
    ) -> ViewStream<U> {
        let child = ViewStream::from_latest(seed);
        let weak = Rc::downgrade(&child.inner);

        let upstream = self.subscribe(move |value| {
            if let Some(inner) = weak.upgrade() {
                forward(value, &ViewStream { inner });
            }
        });
        *child.inner.upstream.borrow_mut() = Some(upstream);
        *child.inner.parent.borrow_mut() = Some(self.inner.clone() as Rc<dyn Any>);

        child
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for ViewStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStream")
            .field("latest", &self.inner.latest.borrow())
            .field("emissions", &self.inner.emissions.get())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
