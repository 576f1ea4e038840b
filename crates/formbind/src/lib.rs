#![forbid(unsafe_code)]

//! formbind: form state for reactive UIs.
//!
//! This crate re-exports the pieces most applications need:
//!
//! - [`core`]: backends, transition records, the reducer and the
//!   value-extraction policy.
//! - [`runtime`] (feature `runtime`, on by default): the store, the field
//!   registration coordinator, field bindings, projections and validation.
//!
//! ```ignore
//! use formbind::prelude::*;
//!
//! let store = Store::<PlainBackend>::new();
//! let form = FormCoordinator::new(&store, &["forms", "signup"], "signup");
//! let email = form.bind_field(FieldRegistration::new(FieldMeta::text("email")))?;
//! form.mount();
//! email.on_change(InputEvent::value("ada@example.com"))?;
//! ```

pub use formbind_core as core;
#[cfg(feature = "runtime")]
pub use formbind_runtime as runtime;

pub use formbind_core::{
    Action, Backend, Baseline, FieldInput, FieldKind, FieldMap, FieldMeta, FieldState, FormError,
    FormReducer, FormState, InputEvent, PlainBackend, Value, action, extract_value,
};
#[cfg(feature = "persistent")]
pub use formbind_core::{PersistentBackend, PersistentNode};

#[cfg(feature = "runtime")]
pub use formbind_runtime::{
    FieldBinding, FieldError, FieldRegistration, FieldsProjection, FormConfig, FormCoordinator,
    ManualClock, Store, SubmitOutcome, SystemClock, ValidationError, Validator, ValidatorRegistry,
    ValidatorSpec, Verdict,
};

/// Glob-import surface for applications.
pub mod prelude {
    pub use crate::core::{
        Backend, Baseline, FieldKind, FieldMeta, FieldState, FormState, InputEvent, PlainBackend,
        action,
    };
    #[cfg(feature = "persistent")]
    pub use crate::core::PersistentBackend;

    #[cfg(feature = "runtime")]
    pub use crate::runtime::{
        FieldBinding, FieldRegistration, FieldsProjection, FormConfig, FormCoordinator, Store,
        SubmitOutcome, Validator, ValidatorSpec, Verdict,
    };
}
