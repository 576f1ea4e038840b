#![forbid(unsafe_code)]

//! Single-threaded state container.
//!
//! A [`Store`] owns one state tree of backend nodes and a set of form slices,
//! each a [`FormReducer`] mounted at a key path. [`Store::dispatch`] hands a
//! transition record to every slice that accepts it and then notifies
//! subscribers with the new tree.
//!
//! # Invariants
//!
//! 1. Records are applied in dispatch order.
//! 2. Subscribers are notified synchronously after each dispatch, in
//!    subscription order, even when the record changed nothing.
//! 3. No borrow of the state is held while subscribers run; a subscriber may
//!    read the store or dispatch again (nested dispatches complete, including
//!    their notifications, before the outer notification continues).
//! 4. Registering a form slice seeds a zero-value form at its path unless a
//!    node is already there.
//!
//! # Failure Modes
//!
//! - Subscriber panic: propagates out of `dispatch`. The state has already
//!   been committed at that point.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use formbind_core::{Action, Backend, FormReducer, FormState};
use tracing::{debug, debug_span};

use crate::reactive::{Listeners, Subscription};

/// A key path into the state tree.
pub type FormPath = Vec<String>;

pub(crate) fn path_refs(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

struct Slice {
    path: FormPath,
    reducer: FormReducer,
}

struct Inner<B: Backend> {
    state: RefCell<B::Node>,
    slices: RefCell<Vec<Slice>>,
    listeners: Listeners<B::Node>,
}

/// Shared handle to a state tree. Cloning shares the tree.
pub struct Store<B: Backend> {
    inner: Rc<Inner<B>>,
}

impl<B: Backend> Clone for Store<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<B: Backend> fmt::Debug for Store<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forms: Vec<String> = self
            .inner
            .slices
            .borrow()
            .iter()
            .map(|slice| slice.reducer.form_name().to_owned())
            .collect();
        f.debug_struct("Store")
            .field("backend", &B::NAME)
            .field("forms", &forms)
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl<B: Backend> Default for Store<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> Store<B> {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(B::empty_map())
    }

    /// Store starting from a persisted tree.
    #[must_use]
    pub fn with_root(root: B::Node) -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(root),
                slices: RefCell::new(Vec::new()),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Mount a reducer for `form_name` at `path`.
    pub fn register_form(&self, path: &[&str], form_name: &str) {
        let owned: FormPath = path.iter().map(|key| (*key).to_owned()).collect();
        {
            let mut state = self.inner.state.borrow_mut();
            if !B::has_in(&state, path) {
                let root = std::mem::replace(&mut *state, B::null());
                *state = B::set_in(root, path, FormReducer::initial_state::<B>());
            }
        }
        let mut slices = self.inner.slices.borrow_mut();
        if slices
            .iter()
            .any(|slice| slice.path == owned && slice.reducer.form_name() == form_name)
        {
            return;
        }
        debug!(form = form_name, path = ?owned, backend = B::NAME, "form slice registered");
        slices.push(Slice {
            path: owned,
            reducer: FormReducer::new(form_name),
        });
    }

    /// Snapshot of the whole tree.
    #[must_use]
    pub fn get_state(&self) -> B::Node {
        self.inner.state.borrow().clone()
    }

    /// Run `f` against the current tree without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&B::Node) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Typed view of the form stored at `path`.
    #[must_use]
    pub fn form_state(&self, path: &[&str]) -> Option<FormState> {
        self.read(|root| B::get_in(root, path).map(FormState::from_node::<B>))
    }

    /// Call `listener` with the new tree after every dispatch.
    pub fn subscribe(&self, listener: impl Fn(&B::Node) + 'static) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Apply `action` to every slice that accepts it, then notify.
    pub fn dispatch(&self, action: Action) {
        let span = debug_span!(
            "dispatch",
            kind = action.kind(),
            form = action.form_name().unwrap_or_default()
        );
        let _enter = span.enter();

        let snapshot = {
            let slices = self.inner.slices.borrow();
            let mut state = self.inner.state.borrow_mut();
            let mut root = std::mem::replace(&mut *state, B::null());
            for slice in slices.iter().filter(|slice| slice.reducer.accepts(&action)) {
                let path = path_refs(&slice.path);
                let form = B::get_in(&root, &path)
                    .cloned()
                    .unwrap_or_else(FormReducer::initial_state::<B>);
                let next = slice.reducer.reduce::<B>(form, &action);
                root = B::set_in(root, &path, next);
            }
            *state = root.clone();
            root
        };

        self.inner.listeners.notify(&snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formbind_core::{FieldMap, FieldState, PlainBackend, action};
    use serde_json::json;
    use std::cell::Cell;

    type P = PlainBackend;

    fn fields(names: &[&str]) -> FieldMap {
        names
            .iter()
            .map(|name| ((*name).to_owned(), FieldState::default()))
            .collect()
    }

    #[test]
    fn register_form_seeds_zero_form() {
        let store = Store::<P>::new();
        store.register_form(&["forms", "login"], "login");
        let form = store.form_state(&["forms", "login"]).expect("seeded");
        assert!(form.valid);
        assert!(form.fields.is_empty());
    }

    #[test]
    fn register_form_keeps_persisted_node() {
        let store = Store::<P>::with_root(json!({"login": {"valid": false, "fields": {}}}));
        store.register_form(&["login"], "login");
        assert_eq!(store.form_state(&["login"]).map(|f| f.valid), Some(false));
    }

    #[test]
    fn dispatch_routes_by_form_name() {
        let store = Store::<P>::new();
        store.register_form(&["a"], "a");
        store.register_form(&["b"], "b");
        store.dispatch(action::form_initialisation("a", fields(&["x"])));
        assert!(store.form_state(&["a"]).is_some_and(|f| f.field("x").is_some()));
        assert!(store.form_state(&["b"]).is_some_and(|f| f.fields.is_empty()));
    }

    #[test]
    fn subscribers_see_every_dispatch() {
        let store = Store::<P>::new();
        store.register_form(&["f"], "f");
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let _sub = store.subscribe(move |_| c.set(c.get() + 1));

        store.dispatch(action::set_form_submitting("f", true));
        store.dispatch(action::remove_field("f", "missing"));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn subscriber_may_dispatch() {
        let store = Store::<P>::new();
        store.register_form(&["f"], "f");
        store.dispatch(action::form_initialisation("f", fields(&["x"])));

        let inner = store.clone();
        let _sub = store.subscribe(move |root| {
            let touched = P::get_in(root, &["f", "fields", "x", "touched"]).and_then(P::as_bool);
            if touched == Some(false) {
                inner.dispatch(action::set_field_touched("f", "x", true));
            }
        });
        store.dispatch(action::change_field_value("f", "x", "v"));
        let form = store.form_state(&["f"]).expect("form");
        assert!(form.fields["x"].touched);
        assert_eq!(form.fields["x"].value, json!("v"));
    }

    #[test]
    fn dropped_subscription_is_not_called() {
        let store = Store::<P>::new();
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let sub = store.subscribe(move |_| c.set(c.get() + 1));
        drop(sub);
        store.dispatch(action::set_form_submitting("f", true));
        assert_eq!(calls.get(), 0);
        assert_eq!(store.listener_count(), 0);
    }

    #[cfg(feature = "persistent")]
    #[test]
    fn persistent_store_shares_snapshots() {
        use formbind_core::PersistentBackend;

        let store = Store::<PersistentBackend>::new();
        store.register_form(&["f"], "f");
        store.dispatch(action::form_initialisation("f", fields(&["x"])));
        let before = store.get_state();
        store.dispatch(action::change_field_value("f", "x", "v"));
        let after = store.get_state();
        assert_ne!(before, after);
        assert_eq!(
            PersistentBackend::to_plain(&before)["f"]["fields"]["x"]["value"],
            json!("")
        );
    }
}
