// ============================================================================
// spark-query - Query Cell
// A writable, observable query dimension
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::primitives::subscription::{SubscriberList, Subscription};

// =============================================================================
// CELL INNER
// =============================================================================

struct CellInner<T> {
    value: RefCell<T>,
    subscribers: SubscriberList<T>,
}

// =============================================================================
// QUERY CELL
// =============================================================================

/// One independently settable query dimension (page, sort key, ...).
///
/// A cell always holds a value: the constructor takes the initial one.
/// Every `set` notifies every attached observer synchronously, even when the
/// new value equals the old one. Suppressing repeats is a gate's job.
///
/// # Example
///
/// ```
/// use spark_query::QueryCell;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let page = QueryCell::new(0usize);
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let _sub = page.changes({
///     let seen = seen.clone();
///     move |p: &usize| seen.borrow_mut().push(*p)
/// });
///
/// page.set(1);
/// page.set(1);
/// assert_eq!(*seen.borrow(), vec![0, 1, 1]); // replay, then every set
/// ```
pub struct QueryCell<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for QueryCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> QueryCell<T> {
    /// Create a new cell with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(CellInner {
                value: RefCell::new(value),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    /// Get the current value (cloning).
    pub fn current(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Access the current value with a closure (avoids cloning).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Set the value and notify every observer, in subscription order.
    pub fn set(&self, value: T)
    where
        T: Clone,
    {
        *self.inner.value.borrow_mut() = value;
        self.publish();
    }

    /// Update the value in place, then notify like `set`.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_query::QueryCell;
    ///
    /// let page = QueryCell::new(4usize);
    /// page.update(|p| *p += 1);
    /// assert_eq!(page.current(), 5);
    /// ```
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        f(&mut self.inner.value.borrow_mut());
        self.publish();
    }

    /// Observe the value: `f` runs immediately with the current value, then
    /// after every write, until the returned handle is dropped.
    pub fn changes(&self, f: impl Fn(&T) + 'static) -> Subscription
    where
        T: Clone,
    {
        let current = self.current();
        f(&current);
        self.inner.subscribers.add(Rc::new(f))
    }

    /// Number of attached observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    fn publish(&self)
    where
        T: Clone,
    {
        // Notify with a copy so observers may read (or write) this cell
        let value = self.current();
        self.inner.subscribers.notify(&value);
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for QueryCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.with(|value| {
            f.debug_struct("QueryCell")
                .field("value", value)
                .field("subscribers", &self.subscriber_count())
                .finish()
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
