#![forbid(unsafe_code)]

//! Version-tracked shared values with change notification.
//!
//! # Invariants
//!
//! 1. Setting a value equal to the current one is a no-op: no version bump,
//!    no notification.
//! 2. Listeners run in registration order, after every internal borrow has
//!    been released, so a listener may read or write the observable it is
//!    subscribed to.
//! 3. Dropping a [`Subscription`] unregisters its callback before the next
//!    notification. Dead entries are pruned lazily.
//!
//! # Failure Modes
//!
//! - Listener panic: propagates to the caller of `set` / `notify`. Listeners
//!   registered after the panicking one are not called for that change.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

type Callback<T> = dyn Fn(&T);

/// Ordered list of weakly held callbacks.
///
/// Shared by [`Observable`] and the store so both follow the same
/// subscription and notification rules.
pub(crate) struct Listeners<T> {
    entries: RefCell<Vec<Weak<Callback<T>>>>,
}

impl<T: 'static> Listeners<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Register `callback`; it stays registered while the returned
    /// subscription is alive.
    pub(crate) fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(callback);
        self.entries.borrow_mut().push(Rc::downgrade(&strong));
        Subscription::new(strong)
    }

    /// Call every live listener with `value`.
    pub(crate) fn notify(&self, value: &T) {
        let live: Vec<Rc<Callback<T>>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|entry| entry.strong_count() > 0);
            entries.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in live {
            callback(value);
        }
    }

    /// Number of live listeners.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard keeping a callback registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    fn new<T: 'static>(callback: Rc<Callback<T>>) -> Self {
        Self {
            _guard: Box::new(callback),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Observable<T>
// ---------------------------------------------------------------------------

struct Inner<T> {
    value: RefCell<T>,
    version: std::cell::Cell<u64>,
    listeners: Listeners<T>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Cloning shares the underlying value.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                version: std::cell::Cell::new(0),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.bump_and_notify();
    }

    /// Number of changes applied so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Call `callback` with the new value after every change.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.listeners.subscribe(callback)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    fn bump_and_notify(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        let snapshot = self.get();
        self.inner.listeners.notify(&snapshot);
    }
}
