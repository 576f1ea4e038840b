#![forbid(unsafe_code)]

//! Typed views over the form state tree.
//!
//! The reducer works on backend nodes; [`FieldState`] and [`FormState`] are
//! the typed shapes those nodes follow, used to build transition records and
//! to read state back out for projections and tests.
//!
//! # Tree layout
//!
//! ```text
//! <form path>
//! ├── valid, submitted, submitting, touched, changed : bool
//! ├── fields
//! │   └── <field name>
//! │       ├── value   : any
//! │       ├── errors  : [string]
//! │       └── valid, touched, changed, disabled, hidden : bool
//! ├── initial_form_state : <form without baselines>
//! └── empty_form_state   : <form without baselines>
//! ```
//!
//! Reading a view is tolerant: missing or mistyped entries fall back to the
//! field/form defaults rather than failing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{Backend, get_bool};

/// Keys of the form state tree.
pub mod keys {
    pub const VALID: &str = "valid";
    pub const SUBMITTED: &str = "submitted";
    pub const SUBMITTING: &str = "submitting";
    pub const TOUCHED: &str = "touched";
    pub const CHANGED: &str = "changed";
    pub const FIELDS: &str = "fields";
    pub const INITIAL_FORM_STATE: &str = "initial_form_state";
    pub const EMPTY_FORM_STATE: &str = "empty_form_state";

    pub const VALUE: &str = "value";
    pub const ERRORS: &str = "errors";
    pub const DISABLED: &str = "disabled";
    pub const HIDDEN: &str = "hidden";

    /// Form-level entries captured in a baseline snapshot.
    pub const BASELINE_ENTRIES: [&str; 6] =
        [VALID, SUBMITTED, SUBMITTING, TOUCHED, CHANGED, FIELDS];
}

use keys::*;

/// Field snapshots keyed by field name.
pub type FieldMap = BTreeMap<String, FieldState>;

/// Which baseline a reset restores.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Baseline {
    /// Declared defaults captured at form initialization.
    Initial,
    /// Same fields with values blanked and flags defaulted.
    #[default]
    Empty,
}

impl Baseline {
    /// Key of the baseline snapshot in the form state tree.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Initial => INITIAL_FORM_STATE,
            Self::Empty => EMPTY_FORM_STATE,
        }
    }
}

/// State of one logical field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldState {
    pub value: Value,
    pub errors: Vec<String>,
    pub valid: bool,
    pub touched: bool,
    pub changed: bool,
    pub disabled: bool,
    pub hidden: bool,
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            value: Value::String(String::new()),
            errors: Vec::new(),
            valid: true,
            touched: false,
            changed: false,
            disabled: false,
            hidden: false,
        }
    }
}

impl FieldState {
    /// A default field holding `value`.
    #[must_use]
    pub fn with_value(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    /// Builder: replace the error list, keeping `valid` consistent.
    #[must_use]
    pub fn errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = errors.into_iter().map(Into::into).collect();
        self.valid = self.errors.is_empty();
        self
    }

    /// Builder: set the touched flag.
    #[must_use]
    pub fn touched(mut self, touched: bool) -> Self {
        self.touched = touched;
        self
    }

    /// Builder: set the changed flag.
    #[must_use]
    pub fn changed(mut self, changed: bool) -> Self {
        self.changed = changed;
        self
    }

    /// Builder: set the disabled flag.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Builder: set the hidden flag.
    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Encode as a backend node. `valid` is derived from `errors`.
    #[must_use]
    pub fn to_node<B: Backend>(&self) -> B::Node {
        let errors = B::list(self.errors.iter().map(|e| B::string(e)).collect());
        let entries = [
            (VALUE, B::from_plain(&self.value)),
            (ERRORS, errors),
            (VALID, B::bool(self.errors.is_empty())),
            (TOUCHED, B::bool(self.touched)),
            (CHANGED, B::bool(self.changed)),
            (DISABLED, B::bool(self.disabled)),
            (HIDDEN, B::bool(self.hidden)),
        ];
        entries
            .into_iter()
            .fold(B::empty_map(), |node, (key, value)| B::set_in(node, &[key], value))
    }

    /// Decode from a backend node, defaulting missing entries.
    #[must_use]
    pub fn from_node<B: Backend>(node: &B::Node) -> Self {
        let defaults = Self::default();
        let errors: Vec<String> = B::get_in(node, &[ERRORS])
            .map(B::list_items)
            .unwrap_or_default()
            .iter()
            .filter_map(|e| B::as_str(e).map(str::to_owned))
            .collect();
        Self {
            value: B::get_in(node, &[VALUE])
                .map(B::to_plain)
                .unwrap_or(defaults.value),
            valid: get_bool::<B>(node, &[VALID], errors.is_empty()),
            errors,
            touched: get_bool::<B>(node, &[TOUCHED], defaults.touched),
            changed: get_bool::<B>(node, &[CHANGED], defaults.changed),
            disabled: get_bool::<B>(node, &[DISABLED], defaults.disabled),
            hidden: get_bool::<B>(node, &[HIDDEN], defaults.hidden),
        }
    }

    /// The "empty" counterpart of this field: value blanked (empty list for
    /// list values, empty string otherwise), errors cleared, flags defaulted.
    #[must_use]
    pub fn blanked(&self) -> Self {
        let value = if self.value.is_array() {
            Value::Array(Vec::new())
        } else {
            Value::String(String::new())
        };
        Self::with_value(value)
    }
}

/// State of one form (without its baselines).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormState {
    pub valid: bool,
    pub submitted: bool,
    pub submitting: bool,
    pub touched: bool,
    pub changed: bool,
    pub fields: FieldMap,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            valid: true,
            submitted: false,
            submitting: false,
            touched: false,
            changed: false,
            fields: FieldMap::new(),
        }
    }
}

impl FormState {
    /// Decode the form entries of a form node. Baselines are ignored.
    #[must_use]
    pub fn from_node<B: Backend>(node: &B::Node) -> Self {
        let defaults = Self::default();
        Self {
            valid: get_bool::<B>(node, &[VALID], defaults.valid),
            submitted: get_bool::<B>(node, &[SUBMITTED], defaults.submitted),
            submitting: get_bool::<B>(node, &[SUBMITTING], defaults.submitting),
            touched: get_bool::<B>(node, &[TOUCHED], defaults.touched),
            changed: get_bool::<B>(node, &[CHANGED], defaults.changed),
            fields: B::get_in(node, &[FIELDS])
                .map(fields_from_node::<B>)
                .unwrap_or_default(),
        }
    }

    /// Decode one of the baselines of a form node, if the form was initialized.
    #[must_use]
    pub fn baseline<B: Backend>(node: &B::Node, baseline: Baseline) -> Option<Self> {
        B::get_in(node, &[baseline.key()]).map(Self::from_node::<B>)
    }

    /// Encode as a backend node (no baselines).
    #[must_use]
    pub fn to_node<B: Backend>(&self) -> B::Node {
        let entries = [
            (VALID, B::bool(self.valid)),
            (SUBMITTED, B::bool(self.submitted)),
            (SUBMITTING, B::bool(self.submitting)),
            (TOUCHED, B::bool(self.touched)),
            (CHANGED, B::bool(self.changed)),
            (FIELDS, fields_to_node::<B>(&self.fields)),
        ];
        entries
            .into_iter()
            .fold(B::empty_map(), |node, (key, value)| B::set_in(node, &[key], value))
    }

    /// Look up a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.get(name)
    }

    /// Whether `valid` agrees with the fields it aggregates.
    #[must_use]
    pub fn validity_is_consistent(&self) -> bool {
        self.fields.values().all(|f| f.valid == f.errors.is_empty())
            && self.valid == self.fields.values().all(|f| f.valid)
    }
}

/// Encode a field map as a backend map node.
#[must_use]
pub fn fields_to_node<B: Backend>(fields: &FieldMap) -> B::Node {
    fields.iter().fold(B::empty_map(), |node, (name, field)| {
        B::set_in(node, &[name.as_str()], field.to_node::<B>())
    })
}

/// Decode a backend map node of fields.
#[must_use]
pub fn fields_from_node<B: Backend>(node: &B::Node) -> FieldMap {
    B::keys(node)
        .into_iter()
        .filter_map(|name| {
            let field = B::get_in(node, &[name.as_str()]).map(FieldState::from_node::<B>)?;
            Some((name, field))
        })
        .collect()
}
