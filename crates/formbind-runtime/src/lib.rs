#![forbid(unsafe_code)]

//! Runtime side of formbind: the store, the field registration coordinator,
//! the validation pipeline and the reactive plumbing connecting them.
//!
//! # Architecture
//!
//! ```text
//!   FieldBinding ──on_change/on_blur──▶ FormCoordinator ──dispatch──▶ Store
//!        ▲                                   │  ▲                      │
//!        │                        register / │  │ reconcile             │ notify
//!        │                        validate   ▼  │                      ▼
//!   FieldsProjection ◀──────────────── Observable ◀──────────── subscribers
//! ```
//!
//! Everything is single-threaded. The only suspension points are validator
//! futures (awaited one after another) and the commit debouncer, which the
//! host loop drives through [`FormCoordinator::poll`].

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod field;
pub mod projection;
pub mod reactive;
pub mod store;
pub mod validate;

pub use config::FormConfig;
pub use coordinator::{FieldRegistration, FormCoordinator, SubmitOutcome};
pub use debounce::{Clock, Debouncer, ManualClock, SystemClock};
#[cfg(feature = "config-file")]
pub use error::ConfigError;
pub use error::{FieldError, ValidationError};
pub use field::FieldBinding;
pub use projection::{FieldStates, FieldsProjection};
pub use reactive::{Binding, BindingScope, Observable, Subscription};
pub use store::{FormPath, Store};
pub use validate::{
    Validation, Validator, ValidatorFn, ValidatorRegistry, ValidatorSpec, Verdict,
    normalize_validators, validate, validate_node,
};
