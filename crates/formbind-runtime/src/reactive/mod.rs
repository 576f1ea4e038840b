#![forbid(unsafe_code)]

//! Reactive primitives underneath the store and projections.
//!
//! - [`Observable`]: a shared, version-tracked value that notifies
//!   subscribers on change.
//! - [`Subscription`]: RAII guard; dropping it unsubscribes.
//! - [`Binding`]: a read handle over a mapped observable.
//! - [`BindingScope`]: owner of a group of subscriptions.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc` + `RefCell`). Subscribers are stored
//! as `Weak` callbacks and pruned lazily during notification. The store uses
//! the same listener list as `Observable`, so store subscriptions and
//! projection subscriptions share ordering and lifetime rules.

pub mod binding;
pub mod observable;

pub use binding::{Binding, BindingScope, bind_mapped};
pub(crate) use observable::Listeners;
pub use observable::{Observable, Subscription};
