#![forbid(unsafe_code)]

//! Per-form configuration.
//!
//! [`FormConfig`] carries the knobs a form tree is wired with. Every field has
//! a default, so partial documents are accepted:
//!
//! ```toml
//! debounce_ms = 100
//! remove_on_unmount = true
//! reset_baseline = "initial"
//! ```
//!
//! With the `config-file` feature the same shape can be loaded from TOML via
//! [`FormConfig::from_toml_str`].

use core::time::Duration;

use formbind_core::Baseline;
use serde::{Deserialize, Serialize};

#[cfg(feature = "config-file")]
use crate::error::ConfigError;

/// Default quiet period before registrations are committed.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Upper bound accepted for `debounce_ms` when loading a document.
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Configuration of one mounted form tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Quiet period coalescing field registrations into one commit.
    pub debounce_ms: u64,
    /// Drop a field from state when its last instance unmounts.
    pub remove_on_unmount: bool,
    /// Run validators after every value change.
    pub validate_on_change: bool,
    /// Run validators when a field loses focus.
    pub validate_on_blur: bool,
    /// Baseline restored by resets that do not name one.
    pub reset_baseline: Baseline,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            remove_on_unmount: false,
            validate_on_change: true,
            validate_on_blur: true,
            reset_baseline: Baseline::Empty,
        }
    }
}

impl FormConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Builder: quiet period in milliseconds.
    #[must_use]
    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Builder: remove fields from state on unmount.
    #[must_use]
    pub fn with_remove_on_unmount(mut self, remove: bool) -> Self {
        self.remove_on_unmount = remove;
        self
    }

    /// Builder: validation triggers.
    #[must_use]
    pub fn with_validation(mut self, on_change: bool, on_blur: bool) -> Self {
        self.validate_on_change = on_change;
        self.validate_on_blur = on_blur;
        self
    }

    /// Builder: default reset baseline.
    #[must_use]
    pub fn with_reset_baseline(mut self, baseline: Baseline) -> Self {
        self.reset_baseline = baseline;
        self
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::DebounceOutOfRange`] for a quiet period above
    /// [`MAX_DEBOUNCE_MS`].
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        if config.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::DebounceOutOfRange {
                got: config.debounce_ms,
                max: MAX_DEBOUNCE_MS,
            });
        }
        Ok(config)
    }
}
