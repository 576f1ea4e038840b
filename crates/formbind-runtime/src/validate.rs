#![forbid(unsafe_code)]

//! Field validation pipeline.
//!
//! A field declares zero, one or many validators ([`ValidatorSpec`]).
//! [`normalize_validators`] flattens the declaration into an ordered list and
//! [`validate`] runs that list against a candidate value.
//!
//! # Invariants
//!
//! 1. An empty validator list resolves immediately to no errors without
//!    invoking anything.
//! 2. Validators run one at a time in declaration order. Each one, including
//!    its future, finishes before the next starts, so error messages come
//!    back in declaration order whatever each validator's latency.
//! 3. A validator returning `None` contributes nothing; `Some(message)`
//!    contributes `message`.
//!
//! # Failure Modes
//!
//! - A [`Validator::NotCallable`] entry anywhere in the list fails the whole
//!   pipeline with [`ValidationError::NotCallable`] before any validator runs.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use ahash::AHashMap;
use formbind_core::{Backend, Value};
use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Validators
// ---------------------------------------------------------------------------

/// Outcome of invoking a validator.
pub enum Verdict {
    /// The answer is available now.
    Ready(Option<String>),
    /// The answer arrives later.
    Pending(LocalBoxFuture<'static, Option<String>>),
}

impl Verdict {
    #[must_use]
    pub fn ok() -> Self {
        Self::Ready(None)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Ready(Some(message.into()))
    }

    pub fn pending(fut: impl Future<Output = Option<String>> + 'static) -> Self {
        Self::Pending(fut.boxed_local())
    }

    async fn resolve(self) -> Option<String> {
        match self {
            Self::Ready(outcome) => outcome,
            Self::Pending(fut) => fut.await,
        }
    }
}

impl fmt::Debug for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// Callable validator over a plain value.
pub type ValidatorFn = Rc<dyn Fn(&Value) -> Verdict>;

/// One entry of a validator declaration.
#[derive(Clone)]
pub enum Validator {
    Callable(ValidatorFn),
    /// An entry that cannot be invoked, e.g. a name with no registered
    /// validator. Carries a description of what was declared.
    NotCallable(String),
}

impl Validator {
    /// Wrap a validator of the general shape.
    pub fn new(f: impl Fn(&Value) -> Verdict + 'static) -> Self {
        Self::Callable(Rc::new(f))
    }

    /// Wrap a validator that answers immediately.
    pub fn sync(f: impl Fn(&Value) -> Option<String> + 'static) -> Self {
        Self::new(move |value| Verdict::Ready(f(value)))
    }

    /// Wrap a validator that answers through a future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + 'static,
        Fut: Future<Output = Option<String>> + 'static,
    {
        Self::new(move |value| Verdict::pending(f(value.clone())))
    }

    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Callable(_))
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::NotCallable(found) => f.debug_tuple("NotCallable").field(found).finish(),
        }
    }
}

/// A field's validator declaration.
#[derive(Clone, Debug, Default)]
pub enum ValidatorSpec {
    #[default]
    None,
    One(Validator),
    Many(Vec<Validator>),
}

impl From<Validator> for ValidatorSpec {
    fn from(validator: Validator) -> Self {
        Self::One(validator)
    }
}

impl From<Vec<Validator>> for ValidatorSpec {
    fn from(validators: Vec<Validator>) -> Self {
        Self::Many(validators)
    }
}

impl From<Option<Validator>> for ValidatorSpec {
    fn from(validator: Option<Validator>) -> Self {
        validator.map_or(Self::None, Self::One)
    }
}

/// Flatten a declaration into the ordered list the pipeline runs.
#[must_use]
pub fn normalize_validators(spec: ValidatorSpec) -> Vec<Validator> {
    match spec {
        ValidatorSpec::None => Vec::new(),
        ValidatorSpec::One(validator) => vec![validator],
        ValidatorSpec::Many(validators) => validators,
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Future returned by [`validate`].
pub type Validation = LocalBoxFuture<'static, Result<Vec<String>, ValidationError>>;

/// Run `validators` against `value` in declaration order.
///
/// # Errors
///
/// [`ValidationError::NotCallable`] when any entry is not callable.
pub fn validate(value: Value, validators: &[Validator]) -> Validation {
    if validators.is_empty() {
        return future::ready(Ok(Vec::new())).boxed_local();
    }

    let callables = match callables(validators) {
        Ok(callables) => callables,
        Err(err) => return future::ready(Err(err)).boxed_local(),
    };

    async move {
        let mut errors = Vec::new();
        for validator in callables {
            if let Some(message) = validator(&value).resolve().await {
                errors.push(message);
            }
        }
        Ok(errors)
    }
    .boxed_local()
}

/// [`validate`] over a backend node.
pub fn validate_node<B: Backend>(value: &B::Node, validators: &[Validator]) -> Validation {
    validate(B::to_plain(value), validators)
}

fn callables(validators: &[Validator]) -> Result<Vec<ValidatorFn>, ValidationError> {
    validators
        .iter()
        .map(|validator| match validator {
            Validator::Callable(f) => Ok(Rc::clone(f)),
            Validator::NotCallable(found) => Err(ValidationError::NotCallable {
                found: found.clone(),
            }),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Named validators, for declarations that refer to validators by name.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    entries: AHashMap<String, ValidatorFn>,
}

impl ValidatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `validator` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        validator: impl Fn(&Value) -> Verdict + 'static,
    ) {
        self.entries.insert(name.into(), Rc::new(validator));
    }

    /// Resolve one name. Unknown names resolve to a non-callable entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Validator {
        match self.entries.get(name) {
            Some(f) => Validator::Callable(Rc::clone(f)),
            None => Validator::NotCallable(format!("unknown validator `{name}`")),
        }
    }

    /// Resolve a list of names into a declaration.
    pub fn resolve<I, S>(&self, names: I) -> ValidatorSpec
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ValidatorSpec::Many(names.into_iter().map(|name| self.get(name.as_ref())).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ValidatorRegistry").field("names", &names).finish()
    }
}
