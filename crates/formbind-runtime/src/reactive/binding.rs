#![forbid(unsafe_code)]

//! Read bindings and subscription scopes.
//!
//! A [`Binding<T>`] is a cheap, cloneable read handle: it evaluates its
//! source on every [`get`](Binding::get), so it never goes stale. Field
//! bindings handed out by a projection are built this way.
//!
//! A [`BindingScope`] owns the subscriptions belonging to one logical owner
//! (a mounted form tree, a field adapter) and releases them together.
//!
//! # Invariants
//!
//! 1. `Binding::get()` reflects the source at call time; there is no cache.
//! 2. Dropping a scope releases every held subscription; no callback held
//!    by the scope fires afterwards.

use std::fmt;
use std::rc::Rc;

use super::observable::{Observable, Subscription};

// ---------------------------------------------------------------------------
// Binding<T>
// ---------------------------------------------------------------------------

/// Read-only view of a derived value.
pub struct Binding<T> {
    eval: Rc<dyn Fn() -> T>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            eval: Rc::clone(&self.eval),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&self.get()).finish()
    }
}

impl<T: 'static> Binding<T> {
    /// Binding evaluating `f` on every read.
    pub fn new(f: impl Fn() -> T + 'static) -> Self {
        Self { eval: Rc::new(f) }
    }

    #[must_use]
    pub fn get(&self) -> T {
        (self.eval)()
    }
}

/// Binding reading `source` through `map`, without cloning the source value.
pub fn bind_mapped<S: Clone + PartialEq + 'static, T: 'static>(
    source: &Observable<S>,
    map: impl Fn(&S) -> T + 'static,
) -> Binding<T> {
    let source = source.clone();
    Binding::new(move || source.with(&map))
}

// ---------------------------------------------------------------------------
// BindingScope
// ---------------------------------------------------------------------------

/// Owner of a set of subscriptions, released together on drop.
#[derive(Default)]
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `subscription` alive for the lifetime of the scope.
    pub fn hold(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn mapped_binding_tracks_source() {
        let errors = Observable::new(vec!["required".to_string()]);
        let count = bind_mapped(&errors, Vec::len);
        assert_eq!(count.get(), 1);
        errors.set(Vec::new());
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn scope_releases_on_drop() {
        let touched = Observable::new(false);
        let calls = Rc::new(Cell::new(0));

        let mut scope = BindingScope::new();
        let c = Rc::clone(&calls);
        scope.hold(touched.subscribe(move |_| c.set(c.get() + 1)));
        touched.set(true);
        assert_eq!(calls.get(), 1);

        drop(scope);
        touched.set(false);
        assert_eq!(calls.get(), 1);
        assert_eq!(touched.subscriber_count(), 0);
    }
}
