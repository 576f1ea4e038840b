#![forbid(unsafe_code)]

//! Configuration errors raised while wiring fields.
//!
//! These are programmer errors: they are returned synchronously from the
//! registration or value-extraction call that detected them and are never
//! retried. Conditions the core tolerates (targeting a field that is not in
//! state) are not errors at all; the reducer treats them as no-ops.

use serde_json::Value;

/// A field was configured in a way the form core cannot honor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// A field was registered without a name.
    #[error("field registration requires a non-empty name")]
    MissingFieldName,

    /// A custom field was registered without naming its component.
    #[error("custom field `{field}` requires a component")]
    MissingComponent { field: String },

    /// A multiple-selection field was given a scalar value.
    #[error("field `{field}` allows multiple selection and needs a list value, got {found}")]
    MultipleRequiresList { field: String, found: &'static str },
}

/// Short description of a plain value's type, for error messages.
#[must_use]
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn multiple_requires_list_message() {
        let err = FormError::MultipleRequiresList {
            field: "tags".into(),
            found: describe(&json!("a")),
        };
        assert_eq!(
            err.to_string(),
            "field `tags` allows multiple selection and needs a list value, got a string"
        );
    }
}
