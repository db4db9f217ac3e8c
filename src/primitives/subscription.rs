// ============================================================================
// spark-query - Subscriptions
// Ordered observer lists and RAII subscription handles
// ============================================================================
//
// Cells and views both multicast to a list of callbacks. Notification works
// on a snapshot of the list so callbacks may subscribe, unsubscribe or write
// to other cells while being notified (collect-then-call, no borrow held).
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::types::{Callback, DisposeFn};

/// Unique identifier for a subscription within one list.
pub type SubscriptionId = u64;

// =============================================================================
// SUBSCRIPTION HANDLE
// =============================================================================

/// Handle to an active observer.
///
/// Dropping the handle detaches the observer. Call `detach()` to keep the
/// observer for as long as its source lives.
#[must_use = "dropping a Subscription immediately unsubscribes it"]
pub struct Subscription {
    id: SubscriptionId,
    dispose: Option<DisposeFn>,
}

impl Subscription {
    fn new(id: SubscriptionId, dispose: DisposeFn) -> Self {
        Self {
            id,
            dispose: Some(dispose),
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Detach the observer now.
    pub fn unsubscribe(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    /// Keep the observer attached for the lifetime of its source.
    pub fn detach(mut self) {
        self.dispose = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.dispose.is_some())
            .finish()
    }
}

// =============================================================================
// SUBSCRIBER LIST
// =============================================================================

struct Entry<T> {
    id: SubscriptionId,
    active: Cell<bool>,
    callback: Callback<T>,
}

struct ListState<T> {
    entries: Vec<Rc<Entry<T>>>,
    next_id: SubscriptionId,
}

/// Ordered list of observers of `T`.
///
/// Observers are notified in subscription order. Cloning the list shares it.
pub struct SubscriberList<T> {
    state: Rc<RefCell<ListState<T>>>,
}

impl<T> Clone for SubscriberList<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: 'static> Default for SubscriberList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> SubscriberList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(ListState {
                entries: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Adds an observer and returns its handle.
    pub fn add(&self, callback: Callback<T>) -> Subscription {
        let entry = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;

            let entry = Rc::new(Entry {
                id,
                active: Cell::new(true),
                callback,
            });
            state.entries.push(entry.clone());
            entry
        };

        let id = entry.id;
        let state: Weak<RefCell<ListState<T>>> = Rc::downgrade(&self.state);
        Subscription::new(
            id,
            Box::new(move || {
                entry.active.set(false);
                if let Some(state) = state.upgrade() {
                    state.borrow_mut().entries.retain(|e| e.id != id);
                }
            }),
        )
    }

    /// Notifies every active observer, in subscription order.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Rc<Entry<T>>> = self.state.borrow().entries.clone();

        for entry in snapshot {
            // Skip observers detached by an earlier callback in this round
            if entry.active.get() {
                (entry.callback)(value);
            }
        }
    }

    /// Returns the number of attached observers.
    #[inline]
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Returns true if nothing is attached.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    /// Detaches every observer. Outstanding handles become no-ops.
    pub fn clear(&self) {
        let entries = std::mem::take(&mut self.state.borrow_mut().entries);
        for entry in entries {
            entry.active.set(false);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
