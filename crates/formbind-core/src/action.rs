#![forbid(unsafe_code)]

//! Transition records.
//!
//! An [`Action`] is an immutable description of an intended state change.
//! Every record names the form it targets; reducers bound to other forms
//! ignore it. Records serialize as flat maps tagged by `kind`:
//!
//! ```
//! # use formbind_core::action;
//! let record = action::change_field_value("signup", "email", "a@b.c").to_record().unwrap();
//! assert_eq!(record["kind"], "CHANGE_FIELD_VALUE");
//! assert_eq!(record["form_name"], "signup");
//! ```
//!
//! Decoding a record whose `kind` is not known yields
//! [`Action::Unrecognized`], which every reducer passes through unchanged.
//!
//! The free functions in this module are the pure constructors for each kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{Baseline, FieldMap};

/// A state-transition record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Replace the field set and recompute both baselines.
    FormInitialisation { form_name: String, fields: FieldMap },
    /// Reconcile the field set against an authoritative snapshot.
    UpdateForm { form_name: String, fields: FieldMap },
    ChangeFieldValue {
        form_name: String,
        field: String,
        value: Value,
    },
    ChangeFieldsValues {
        form_name: String,
        values: BTreeMap<String, Value>,
    },
    SetFieldErrors {
        form_name: String,
        field: String,
        errors: Vec<String>,
    },
    SetFieldsErrors {
        form_name: String,
        errors: BTreeMap<String, Vec<String>>,
    },
    SetFieldDisabled {
        form_name: String,
        field: String,
        disabled: bool,
    },
    SetFieldsDisabled {
        form_name: String,
        disabled: BTreeMap<String, bool>,
    },
    SetFieldTouched {
        form_name: String,
        field: String,
        touched: bool,
    },
    SetFieldsTouched {
        form_name: String,
        touched: BTreeMap<String, bool>,
    },
    SetFieldHidden {
        form_name: String,
        field: String,
        hidden: bool,
    },
    SetFieldsHidden {
        form_name: String,
        hidden: BTreeMap<String, bool>,
    },
    RemoveField { form_name: String, field: String },
    ResetField {
        form_name: String,
        field: String,
        #[serde(default)]
        baseline: Baseline,
    },
    ResetFields {
        form_name: String,
        fields: Vec<String>,
        #[serde(default)]
        baseline: Baseline,
    },
    ResetForm {
        form_name: String,
        #[serde(default)]
        baseline: Baseline,
    },
    SetFormSubmitting { form_name: String, submitting: bool },
    /// A record of a kind this crate does not know.
    #[serde(other)]
    Unrecognized,
}

impl Action {
    /// The record's `kind` tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::FormInitialisation { .. } => "FORM_INITIALISATION",
            Self::UpdateForm { .. } => "UPDATE_FORM",
            Self::ChangeFieldValue { .. } => "CHANGE_FIELD_VALUE",
            Self::ChangeFieldsValues { .. } => "CHANGE_FIELDS_VALUES",
            Self::SetFieldErrors { .. } => "SET_FIELD_ERRORS",
            Self::SetFieldsErrors { .. } => "SET_FIELDS_ERRORS",
            Self::SetFieldDisabled { .. } => "SET_FIELD_DISABLED",
            Self::SetFieldsDisabled { .. } => "SET_FIELDS_DISABLED",
            Self::SetFieldTouched { .. } => "SET_FIELD_TOUCHED",
            Self::SetFieldsTouched { .. } => "SET_FIELDS_TOUCHED",
            Self::SetFieldHidden { .. } => "SET_FIELD_HIDDEN",
            Self::SetFieldsHidden { .. } => "SET_FIELDS_HIDDEN",
            Self::RemoveField { .. } => "REMOVE_FIELD",
            Self::ResetField { .. } => "RESET_FIELD",
            Self::ResetFields { .. } => "RESET_FIELDS",
            Self::ResetForm { .. } => "RESET_FORM",
            Self::SetFormSubmitting { .. } => "SET_FORM_SUBMITTING",
            Self::Unrecognized => "UNRECOGNIZED",
        }
    }

    /// The form this record targets; `None` for unrecognized records.
    #[must_use]
    pub fn form_name(&self) -> Option<&str> {
        match self {
            Self::FormInitialisation { form_name, .. }
            | Self::UpdateForm { form_name, .. }
            | Self::ChangeFieldValue { form_name, .. }
            | Self::ChangeFieldsValues { form_name, .. }
            | Self::SetFieldErrors { form_name, .. }
            | Self::SetFieldsErrors { form_name, .. }
            | Self::SetFieldDisabled { form_name, .. }
            | Self::SetFieldsDisabled { form_name, .. }
            | Self::SetFieldTouched { form_name, .. }
            | Self::SetFieldsTouched { form_name, .. }
            | Self::SetFieldHidden { form_name, .. }
            | Self::SetFieldsHidden { form_name, .. }
            | Self::RemoveField { form_name, .. }
            | Self::ResetField { form_name, .. }
            | Self::ResetFields { form_name, .. }
            | Self::ResetForm { form_name, .. }
            | Self::SetFormSubmitting { form_name, .. } => Some(form_name),
            Self::Unrecognized => None,
        }
    }

    /// Encode as a plain record.
    pub fn to_record(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Decode a plain record.
    pub fn from_record(record: Value) -> serde_json::Result<Self> {
        serde_json::from_value(record)
    }
}

fn keyed<K, V, I>(entries: I) -> BTreeMap<String, V>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[must_use]
pub fn form_initialisation(form_name: impl Into<String>, fields: FieldMap) -> Action {
    Action::FormInitialisation {
        form_name: form_name.into(),
        fields,
    }
}

#[must_use]
pub fn update_form(form_name: impl Into<String>, fields: FieldMap) -> Action {
    Action::UpdateForm {
        form_name: form_name.into(),
        fields,
    }
}

#[must_use]
pub fn change_field_value(
    form_name: impl Into<String>,
    field: impl Into<String>,
    value: impl Into<Value>,
) -> Action {
    Action::ChangeFieldValue {
        form_name: form_name.into(),
        field: field.into(),
        value: value.into(),
    }
}

#[must_use]
pub fn change_fields_values<K, V, I>(form_name: impl Into<String>, values: I) -> Action
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Action::ChangeFieldsValues {
        form_name: form_name.into(),
        values: keyed(values.into_iter().map(|(k, v)| (k, v.into()))),
    }
}

#[must_use]
pub fn set_field_errors<I, S>(
    form_name: impl Into<String>,
    field: impl Into<String>,
    errors: I,
) -> Action
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Action::SetFieldErrors {
        form_name: form_name.into(),
        field: field.into(),
        errors: errors.into_iter().map(Into::into).collect(),
    }
}

#[must_use]
pub fn set_fields_errors<K, I>(form_name: impl Into<String>, errors: I) -> Action
where
    I: IntoIterator<Item = (K, Vec<String>)>,
    K: Into<String>,
{
    Action::SetFieldsErrors {
        form_name: form_name.into(),
        errors: keyed(errors),
    }
}

#[must_use]
pub fn set_field_disabled(
    form_name: impl Into<String>,
    field: impl Into<String>,
    disabled: bool,
) -> Action {
    Action::SetFieldDisabled {
        form_name: form_name.into(),
        field: field.into(),
        disabled,
    }
}

#[must_use]
pub fn set_fields_disabled<K, I>(form_name: impl Into<String>, disabled: I) -> Action
where
    I: IntoIterator<Item = (K, bool)>,
    K: Into<String>,
{
    Action::SetFieldsDisabled {
        form_name: form_name.into(),
        disabled: keyed(disabled),
    }
}

#[must_use]
pub fn set_field_touched(
    form_name: impl Into<String>,
    field: impl Into<String>,
    touched: bool,
) -> Action {
    Action::SetFieldTouched {
        form_name: form_name.into(),
        field: field.into(),
        touched,
    }
}

#[must_use]
pub fn set_fields_touched<K, I>(form_name: impl Into<String>, touched: I) -> Action
where
    I: IntoIterator<Item = (K, bool)>,
    K: Into<String>,
{
    Action::SetFieldsTouched {
        form_name: form_name.into(),
        touched: keyed(touched),
    }
}

#[must_use]
pub fn set_field_hidden(
    form_name: impl Into<String>,
    field: impl Into<String>,
    hidden: bool,
) -> Action {
    Action::SetFieldHidden {
        form_name: form_name.into(),
        field: field.into(),
        hidden,
    }
}

#[must_use]
pub fn set_fields_hidden<K, I>(form_name: impl Into<String>, hidden: I) -> Action
where
    I: IntoIterator<Item = (K, bool)>,
    K: Into<String>,
{
    Action::SetFieldsHidden {
        form_name: form_name.into(),
        hidden: keyed(hidden),
    }
}

#[must_use]
pub fn remove_field(form_name: impl Into<String>, field: impl Into<String>) -> Action {
    Action::RemoveField {
        form_name: form_name.into(),
        field: field.into(),
    }
}

#[must_use]
pub fn reset_field(
    form_name: impl Into<String>,
    field: impl Into<String>,
    baseline: Baseline,
) -> Action {
    Action::ResetField {
        form_name: form_name.into(),
        field: field.into(),
        baseline,
    }
}

#[must_use]
pub fn reset_fields<I, S>(form_name: impl Into<String>, fields: I, baseline: Baseline) -> Action
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Action::ResetFields {
        form_name: form_name.into(),
        fields: fields.into_iter().map(Into::into).collect(),
        baseline,
    }
}

#[must_use]
pub fn reset_form(form_name: impl Into<String>, baseline: Baseline) -> Action {
    Action::ResetForm {
        form_name: form_name.into(),
        baseline,
    }
}

#[must_use]
pub fn set_form_submitting(form_name: impl Into<String>, submitting: bool) -> Action {
    Action::SetFormSubmitting {
        form_name: form_name.into(),
        submitting,
    }
}
