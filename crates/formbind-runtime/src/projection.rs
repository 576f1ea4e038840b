#![forbid(unsafe_code)]

//! Live projections of selected fields.
//!
//! A [`FieldsProjection`] maps a list of field names to their current
//! [`FieldState`], recomputed on every store notification. Fields the store
//! does not have yet project to `FieldState::default()`. Downstream
//! subscribers are only notified when the projected map actually changed.

use std::collections::BTreeMap;
use std::fmt;

use formbind_core::state::keys::FIELDS;
use formbind_core::{Backend, FieldState};

use crate::reactive::{Binding, Observable, Subscription, bind_mapped};
use crate::store::Store;

/// Projected field states keyed by field name.
pub type FieldStates = BTreeMap<String, FieldState>;

/// Live view of some fields of one form.
pub struct FieldsProjection {
    current: Observable<FieldStates>,
    _store_subscription: Subscription,
}

impl fmt::Debug for FieldsProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldsProjection")
            .field("fields", &self.current.with(|map| map.keys().cloned().collect::<Vec<_>>()))
            .field("version", &self.current.version())
            .finish()
    }
}

impl FieldsProjection {
    /// Project `names` from the form stored at `form_path`.
    #[must_use]
    pub fn new<B: Backend, S: AsRef<str>>(
        store: &Store<B>,
        form_path: &[&str],
        names: &[S],
    ) -> Self {
        let names: Vec<String> = names.iter().map(|name| name.as_ref().to_owned()).collect();
        let form_path: Vec<String> = form_path.iter().map(|key| (*key).to_owned()).collect();

        let current = Observable::new(store.read(|root| project::<B>(root, &form_path, &names)));
        let sink = current.clone();
        let subscription = store.subscribe(move |root| {
            sink.set(project::<B>(root, &form_path, &names));
        });

        Self {
            current,
            _store_subscription: subscription,
        }
    }

    /// Current projected map.
    #[must_use]
    pub fn get(&self) -> FieldStates {
        self.current.get()
    }

    /// Binding to one projected field.
    #[must_use]
    pub fn field(&self, name: &str) -> Binding<FieldState> {
        let name = name.to_owned();
        bind_mapped(&self.current, move |map| map.get(&name).cloned().unwrap_or_default())
    }

    /// Called with the new map whenever it changes.
    pub fn subscribe(&self, callback: impl Fn(&FieldStates) + 'static) -> Subscription {
        self.current.subscribe(callback)
    }

    /// Number of times the projection changed.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.current.version()
    }
}

fn project<B: Backend>(root: &B::Node, form_path: &[String], names: &[String]) -> FieldStates {
    let mut path: Vec<&str> = form_path.iter().map(String::as_str).collect();
    path.push(FIELDS);
    let fields = B::get_in(root, &path);
    names
        .iter()
        .map(|name| {
            let state = fields
                .and_then(|fields| B::get_in(fields, &[name.as_str()]))
                .map(FieldState::from_node::<B>)
                .unwrap_or_default();
            (name.clone(), state)
        })
        .collect()
}
