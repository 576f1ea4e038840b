#![forbid(unsafe_code)]

//! UI adapter for one mounted field instance.
//!
//! A [`FieldBinding`] is only obtainable from
//! [`FormCoordinator::bind_field`], so a field can never exist outside a form
//! tree. Its handlers turn UI events into transition records:
//!
//! - `on_change`: extract the next value, dispatch CHANGE_FIELD_VALUE, then
//!   (if configured) validate and dispatch SET_FIELD_ERRORS.
//! - `on_blur`: dispatch SET_FIELD_TOUCHED, then (if configured) validate.
//!
//! The dispatch happens synchronously inside the handler; only validation is
//! deferred to the returned future.

use std::fmt;

use formbind_core::{Backend, FieldInput, FieldMeta, FieldState, FormError, action, extract_value};
use tracing::trace;

use crate::coordinator::FormCoordinator;
use crate::error::FieldError;
use crate::validate::Validation;

/// Event handlers and state access for one field instance.
pub struct FieldBinding<B: Backend> {
    coordinator: FormCoordinator<B>,
    meta: FieldMeta,
}

impl<B: Backend> fmt::Debug for FieldBinding<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldBinding")
            .field("form", &self.coordinator.form_name())
            .field("meta", &self.meta)
            .finish()
    }
}

impl<B: Backend> FieldBinding<B> {
    pub(crate) fn new(coordinator: FormCoordinator<B>, meta: FieldMeta) -> Self {
        Self { coordinator, meta }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    #[must_use]
    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    /// Apply a UI change.
    ///
    /// Returns the validation future when validation on change is enabled.
    ///
    /// # Errors
    ///
    /// [`FormError::MultipleRequiresList`] when a multi-select receives a
    /// scalar. Nothing is dispatched in that case.
    pub fn on_change(&self, input: impl Into<FieldInput>) -> Result<Option<Validation>, FormError> {
        let name = self.meta.name.as_str();
        let meta = self
            .meta
            .clone()
            .group_size(self.coordinator.field_count(name).max(1));
        let current = self.coordinator.field_value(name);
        let next = extract_value::<B>(&input.into(), &meta, current.as_ref())?;

        trace!(form = self.coordinator.form_name(), field = name, "value changed");
        self.coordinator.dispatch(action::change_field_value(
            self.coordinator.form_name(),
            name,
            B::to_plain(&next),
        ));

        Ok(self
            .coordinator
            .config()
            .validate_on_change
            .then(|| self.coordinator.validate_field(name)))
    }

    /// Mark the field touched.
    ///
    /// Returns the validation future when validation on blur is enabled.
    pub fn on_blur(&self) -> Option<Validation> {
        let name = self.meta.name.as_str();
        self.coordinator
            .dispatch(action::set_field_touched(self.coordinator.form_name(), name, true));
        self.coordinator
            .config()
            .validate_on_blur
            .then(|| self.coordinator.validate_field(name))
    }

    /// [`on_change`](Self::on_change), awaiting validation.
    ///
    /// # Errors
    ///
    /// Extraction and validator contract errors.
    pub async fn change(&self, input: impl Into<FieldInput>) -> Result<Vec<String>, FieldError> {
        match self.on_change(input)? {
            Some(validation) => Ok(validation.await?),
            None => Ok(Vec::new()),
        }
    }

    /// [`on_blur`](Self::on_blur), awaiting validation.
    ///
    /// # Errors
    ///
    /// Validator contract errors.
    pub async fn blur(&self) -> Result<Vec<String>, FieldError> {
        match self.on_blur() {
            Some(validation) => Ok(validation.await?),
            None => Ok(Vec::new()),
        }
    }

    /// Canonical state, or the default field state before the first commit.
    #[must_use]
    pub fn state(&self) -> FieldState {
        self.coordinator
            .field_state(&self.meta.name)
            .unwrap_or_default()
    }

    /// Unregister this instance, applying the configured removal policy.
    pub fn unmount(self) {
        self.coordinator.unregister_field(&self.meta.name, None);
    }
}
