#![forbid(unsafe_code)]

//! Runtime error types.

use formbind_core::FormError;

/// The validation pipeline could not run.
///
/// A validator returning a message is not an error; only a broken validator
/// declaration is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// An entry of a validator declaration is not callable.
    #[error("validate must be a function or array of functions")]
    NotCallable {
        /// Description of the offending entry.
        found: String,
    },
}

/// Error surfaced by a field binding's event handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A configuration document could not be loaded.
#[cfg(feature = "config-file")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid form configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("debounce_ms must be at most {max}, got {got}")]
    DebounceOutOfRange { got: u64, max: u64 },
}
