#![forbid(unsafe_code)]

//! Value-extraction policy.
//!
//! [`extract_value`] turns a raw UI input (a direct value or an input event)
//! into the next canonical value of a field, given the field's metadata and
//! its currently stored value. The same policy runs when a field instance is
//! registered and on every later change event.
//!
//! | kind                       | result                                              |
//! |----------------------------|-----------------------------------------------------|
//! | text, custom, select       | the raw value, or the event's value                 |
//! | radio, single checkbox     | checked: declared value (or `true`); unchecked: `""`|
//! | grouped checkbox           | current collection with the declared value added or removed |
//! | multiple select            | the selected option values, or a directly passed list |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{Backend, into_collection};
use crate::error::{FormError, describe};

/// Kind of UI component backing a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Radio,
    Checkbox,
    Select,
    Custom,
}

impl FieldKind {
    /// Whether several instances sharing one name form a single group value.
    #[must_use]
    pub const fn is_group_capable(self) -> bool {
        matches!(self, Self::Radio | Self::Checkbox)
    }
}

/// Static description of one field instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMeta {
    pub name: String,
    pub kind: FieldKind,
    /// Multiple selection (select fields only).
    pub multiple: bool,
    /// Declared option value for radio/checkbox instances.
    pub value: Option<Value>,
    /// Number of mounted instances sharing this field name.
    pub group_size: usize,
    /// Component identifier for custom fields.
    pub component: Option<String>,
}

impl Default for FieldMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: FieldKind::Text,
            multiple: false,
            value: None,
            group_size: 1,
            component: None,
        }
    }
}

impl FieldMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    #[must_use]
    pub fn radio(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, FieldKind::Radio).with_option(value)
    }

    #[must_use]
    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Checkbox)
    }

    #[must_use]
    pub fn select(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Select)
    }

    #[must_use]
    pub fn custom(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            ..Self::new(name, FieldKind::Custom)
        }
    }

    /// Builder: declared option value.
    #[must_use]
    pub fn with_option(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Builder: allow multiple selection.
    #[must_use]
    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    /// Builder: number of instances sharing the name.
    #[must_use]
    pub fn group_size(mut self, size: usize) -> Self {
        self.group_size = size;
        self
    }

    /// Check the configuration a field must satisfy before it can be
    /// registered.
    ///
    /// # Errors
    ///
    /// [`FormError::MissingFieldName`] for an empty name and
    /// [`FormError::MissingComponent`] for a custom field without a component.
    pub fn check(&self) -> Result<(), FormError> {
        if self.name.is_empty() {
            return Err(FormError::MissingFieldName);
        }
        if self.kind == FieldKind::Custom && self.component.as_deref().is_none_or(str::is_empty) {
            return Err(FormError::MissingComponent {
                field: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Whether this instance accumulates into a collection shared with its
    /// siblings.
    #[must_use]
    pub fn is_grouped_checkbox(&self) -> bool {
        self.kind == FieldKind::Checkbox && self.group_size > 1
    }

    /// Whether this field holds a list of selected options.
    #[must_use]
    pub fn is_multi_select(&self) -> bool {
        self.kind == FieldKind::Select && self.multiple
    }

    /// Value stored when a radio/checkbox instance is checked.
    fn checked_value(&self) -> Value {
        self.value.clone().unwrap_or(Value::Bool(true))
    }
}

/// Event-like input from a UI component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputEvent {
    pub value: Value,
    pub checked: Option<bool>,
    pub selected: Option<Vec<Value>>,
}

impl InputEvent {
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn checked(checked: bool) -> Self {
        Self {
            checked: Some(checked),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn selected<I, V>(options: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            selected: Some(options.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

/// Raw input handed to [`extract_value`].
#[derive(Clone, Debug, PartialEq)]
pub enum FieldInput {
    Value(Value),
    Event(InputEvent),
}

impl From<Value> for FieldInput {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<InputEvent> for FieldInput {
    fn from(event: InputEvent) -> Self {
        Self::Event(event)
    }
}

impl FieldInput {
    /// The checked flag this input carries, if any. A direct boolean counts.
    fn checked(&self) -> Option<bool> {
        match self {
            Self::Event(event) => event.checked,
            Self::Value(Value::Bool(b)) => Some(*b),
            Self::Value(_) => None,
        }
    }

    fn raw(&self) -> &Value {
        match self {
            Self::Value(value) => value,
            Self::Event(event) => &event.value,
        }
    }
}

/// Compute the next canonical value for a field.
///
/// `current` is the value stored for the field so far; only grouped
/// checkboxes read it.
///
/// # Errors
///
/// [`FormError::MultipleRequiresList`] when a multiple-selection field is
/// given a scalar.
pub fn extract_value<B: Backend>(
    input: &FieldInput,
    meta: &FieldMeta,
    current: Option<&B::Node>,
) -> Result<B::Node, FormError> {
    if meta.is_multi_select() {
        return extract_selection::<B>(input, meta);
    }

    if !meta.kind.is_group_capable() {
        return Ok(B::from_plain(input.raw()));
    }

    let Some(checked) = input.checked() else {
        return Ok(B::from_plain(input.raw()));
    };

    if meta.is_grouped_checkbox() {
        let option = B::from_plain(&meta.checked_value());
        let collection = current.map_or_else(|| B::list(Vec::new()), into_collection::<B>);
        let next = match (checked, B::list_contains(&collection, &option)) {
            (true, true) => collection,
            (true, false) => B::list_push(collection, option),
            (false, _) => B::list_remove(collection, &option),
        };
        return Ok(next);
    }

    if checked {
        Ok(B::from_plain(&meta.checked_value()))
    } else {
        Ok(B::string(""))
    }
}

fn extract_selection<B: Backend>(
    input: &FieldInput,
    meta: &FieldMeta,
) -> Result<B::Node, FormError> {
    if let FieldInput::Event(InputEvent {
        selected: Some(options),
        ..
    }) = input
    {
        return Ok(B::list(options.iter().map(B::from_plain).collect()));
    }
    match input.raw() {
        list @ Value::Array(_) => Ok(B::from_plain(list)),
        Value::Null => Ok(B::list(Vec::new())),
        other => Err(FormError::MultipleRequiresList {
            field: meta.name.clone(),
            found: describe(other),
        }),
    }
}
