#![forbid(unsafe_code)]

//! Core form state for formbind.
//!
//! This crate owns the canonical shape of form state and the pure transition
//! function over it:
//!
//! - [`backend`]: the data-access capability set ([`Backend`]) and its two
//!   implementations, [`PlainBackend`] and (with the `persistent` feature)
//!   [`PersistentBackend`].
//! - [`state`]: typed views ([`FieldState`], [`FormState`]) over backend nodes.
//! - [`action`]: transition records consumed by the reducer.
//! - [`reducer`]: [`FormReducer`], the `(state, action) -> state` function.
//! - [`extract`]: the value-extraction policy for checkbox, radio, select and
//!   plain inputs.
//!
//! Nothing in this crate performs I/O or holds shared mutable state; the
//! store, registration coordinator and validation pipeline live in
//! `formbind-runtime`.

pub mod action;
pub mod backend;
pub mod error;
pub mod extract;
pub mod reducer;
pub mod state;

pub use action::Action;
#[cfg(feature = "persistent")]
pub use backend::{PersistentBackend, PersistentNode};
pub use backend::{Backend, PlainBackend};
pub use error::FormError;
pub use extract::{FieldInput, FieldKind, FieldMeta, InputEvent, extract_value};
pub use reducer::FormReducer;
pub use state::{Baseline, FieldMap, FieldState, FormState};

/// Plain JSON-like value used at the edges of the crate (transition records,
/// validator inputs, projections).
pub use serde_json::Value;
