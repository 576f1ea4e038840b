#![forbid(unsafe_code)]

//! Field registration coordinator.
//!
//! One [`FormCoordinator`] exists per mounted form tree. UI field instances
//! register with it; it folds instances sharing a name into one logical field
//! (radio and checkbox groups), keeps a local snapshot of every field
//! (`fields_stack`), and commits that snapshot to the store as a single
//! transition record once registrations go quiet.
//!
//! # Lifecycle of a field slot
//!
//! ```text
//! Unregistered ──register──▶ Registered (count 1)
//!                              │   ▲
//!                     register │   │ unregister (keep)
//!                              ▼   │
//!                            Registered (count n, group value merged)
//!                              │
//!                    unregister│(remove)
//!                              ▼
//!                            Removed
//! ```
//!
//! # Invariants
//!
//! 1. A registration burst inside the quiet period yields exactly one commit:
//!    FORM_INITIALISATION before the form is initialized, UPDATE_FORM after.
//! 2. `mount` adopts a form slice that already carries baselines without
//!    dispatching anything, unless some registered field is missing from it;
//!    those fields are then committed with one UPDATE_FORM.
//! 3. The store is the source of truth: every store notification overwrites
//!    local snapshot values that disagree with the canonical ones.
//! 4. No bookkeeping borrow is held across a dispatch or an await, so store
//!    listeners (including this coordinator's own) always see a free
//!    bookkeeping cell.
//!
//! # Failure Modes
//!
//! - Misconfigured fields ([`FormError`]) are rejected before any bookkeeping
//!   changes.
//! - Broken validator declarations surface as [`ValidationError`] from the
//!   validation futures; nothing is dispatched for that field.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use formbind_core::action;
use formbind_core::backend::is_blank;
use formbind_core::state::fields_from_node;
use formbind_core::state::keys::{FIELDS, INITIAL_FORM_STATE, VALUE};
use formbind_core::{
    Backend, Baseline, FieldInput, FieldKind, FieldMeta, FieldState, FormError, FormState,
    InputEvent, Value, extract_value,
};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use serde::Serialize;
use tracing::{debug, debug_span, trace};
use web_time::Instant;

use crate::config::FormConfig;
use crate::debounce::{Clock, Debouncer, SystemClock};
use crate::error::ValidationError;
use crate::field::FieldBinding;
use crate::projection::FieldsProjection;
use crate::reactive::BindingScope;
use crate::store::{FormPath, Store, path_refs};
use crate::validate::{Validation, Validator, ValidatorSpec, normalize_validators, validate_node};

// ---------------------------------------------------------------------------
// Registration input
// ---------------------------------------------------------------------------

/// Everything a field instance declares when it mounts.
#[derive(Clone, Debug)]
pub struct FieldRegistration {
    pub meta: FieldMeta,
    /// Initial field state. Its value is replaced for checked/unchecked
    /// radio and checkbox instances and defaulted for multi-selects.
    pub snapshot: FieldState,
    /// Checked state of a radio or checkbox instance.
    pub checked: Option<bool>,
    pub validators: ValidatorSpec,
}

impl FieldRegistration {
    #[must_use]
    pub fn new(meta: FieldMeta) -> Self {
        Self {
            meta,
            snapshot: FieldState::default(),
            checked: None,
            validators: ValidatorSpec::None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.snapshot.value = value.into();
        self
    }

    #[must_use]
    pub fn with_snapshot(mut self, snapshot: FieldState) -> Self {
        self.snapshot = snapshot;
        self
    }

    #[must_use]
    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    #[must_use]
    pub fn validators(mut self, spec: impl Into<ValidatorSpec>) -> Self {
        self.validators = spec.into();
        self
    }
}

/// Result of [`FormCoordinator::submit`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub valid: bool,
    /// Field values keyed by field name.
    pub values: Value,
    /// Error messages of invalid fields.
    pub errors: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// Bookkeeping
// ---------------------------------------------------------------------------

struct Bookkeeping<B: Backend> {
    fields_stack: B::Node,
    fields_count: AHashMap<String, usize>,
    fields_validate_stack: AHashMap<String, Vec<Validator>>,
    fields_meta: AHashMap<String, FieldMeta>,
    debouncer: Debouncer,
    initialized: bool,
}

impl<B: Backend> Bookkeeping<B> {
    fn stack_put(&mut self, path: &[&str], node: B::Node) {
        let stack = std::mem::replace(&mut self.fields_stack, B::null());
        self.fields_stack = B::set_in(stack, path, node);
    }

    fn stack_delete(&mut self, name: &str) {
        let stack = std::mem::replace(&mut self.fields_stack, B::null());
        self.fields_stack = B::delete_in(stack, &[name]);
    }
}

struct Shared<B: Backend> {
    form_name: String,
    path: FormPath,
    store: Store<B>,
    clock: Rc<dyn Clock>,
    config: FormConfig,
    book: RefCell<Bookkeeping<B>>,
    scope: RefCell<BindingScope>,
}

impl<B: Backend> Shared<B> {
    fn form_path(&self) -> Vec<&str> {
        path_refs(&self.path)
    }

    fn form_node<'a>(&self, root: &'a B::Node) -> Option<&'a B::Node> {
        B::get_in(root, &self.form_path())
    }

    fn has_persisted(&self) -> bool {
        self.store.read(|root| {
            self.form_node(root)
                .is_some_and(|form| B::has_in(form, &[INITIAL_FORM_STATE]))
        })
    }

    /// Overwrite local values that disagree with the store.
    fn reconcile(&self, root: &B::Node) {
        let Some(fields) = self.form_node(root).and_then(|form| B::get_in(form, &[FIELDS])) else {
            return;
        };
        let Ok(mut book) = self.book.try_borrow_mut() else {
            trace!(form = %self.form_name, "bookkeeping busy; reconciliation skipped");
            return;
        };
        for name in B::keys(&book.fields_stack) {
            let Some(canonical) = B::get_in(fields, &[name.as_str(), VALUE]) else {
                continue;
            };
            let agrees = B::get_in(&book.fields_stack, &[name.as_str(), VALUE])
                .is_some_and(|local| B::deep_equal(local, canonical));
            if !agrees {
                trace!(
                    form = %self.form_name,
                    field = %name,
                    "store value wins over local snapshot"
                );
                book.stack_put(&[name.as_str(), VALUE], canonical.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FormCoordinator
// ---------------------------------------------------------------------------

/// Handle to the bookkeeping of one mounted form tree. Clones share it.
pub struct FormCoordinator<B: Backend> {
    shared: Rc<Shared<B>>,
}

impl<B: Backend> Clone for FormCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<B: Backend> fmt::Debug for FormCoordinator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("FormCoordinator");
        s.field("form", &self.shared.form_name)
            .field("path", &self.shared.path);
        if let Ok(book) = self.shared.book.try_borrow() {
            s.field("fields", &B::keys(&book.fields_stack))
                .field("initialized", &book.initialized)
                .field("pending", &book.debouncer.pending());
        }
        s.finish_non_exhaustive()
    }
}

impl<B: Backend> FormCoordinator<B> {
    /// Coordinator with default configuration and the wall clock.
    #[must_use]
    pub fn new(store: &Store<B>, path: &[&str], form_name: &str) -> Self {
        Self::with_options(store, path, form_name, FormConfig::default(), SystemClock)
    }

    /// Coordinator with explicit configuration and clock.
    ///
    /// Registers the form slice with `store` and subscribes to it for the
    /// lifetime of the coordinator.
    #[must_use]
    pub fn with_options(
        store: &Store<B>,
        path: &[&str],
        form_name: &str,
        config: FormConfig,
        clock: impl Clock + 'static,
    ) -> Self {
        store.register_form(path, form_name);
        let shared = Rc::new(Shared {
            form_name: form_name.to_owned(),
            path: path.iter().map(|key| (*key).to_owned()).collect(),
            store: store.clone(),
            clock: Rc::new(clock),
            book: RefCell::new(Bookkeeping {
                fields_stack: B::empty_map(),
                fields_count: AHashMap::new(),
                fields_validate_stack: AHashMap::new(),
                fields_meta: AHashMap::new(),
                debouncer: Debouncer::new(config.debounce()),
                initialized: false,
            }),
            config,
            scope: RefCell::new(BindingScope::new()),
        });

        let weak: Weak<Shared<B>> = Rc::downgrade(&shared);
        let subscription = store.subscribe(move |root| {
            if let Some(shared) = weak.upgrade() {
                shared.reconcile(root);
            }
        });
        shared.scope.borrow_mut().hold(subscription);

        Self { shared }
    }

    #[must_use]
    pub fn form_name(&self) -> &str {
        &self.shared.form_name
    }

    #[must_use]
    pub fn path(&self) -> Vec<&str> {
        self.shared.form_path()
    }

    #[must_use]
    pub fn config(&self) -> &FormConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store<B> {
        &self.shared.store
    }

    // -- registration --------------------------------------------------------

    /// Register one field instance.
    ///
    /// # Errors
    ///
    /// Configuration errors from [`FieldMeta::check`] and
    /// [`FormError::MultipleRequiresList`] for a multi-select declared with a
    /// scalar value. Bookkeeping is untouched on error.
    pub fn register_field(&self, registration: FieldRegistration) -> Result<(), FormError> {
        let FieldRegistration {
            meta,
            snapshot,
            checked,
            validators,
        } = registration;
        meta.check()?;

        let now = self.shared.clock.now();
        let mut book = self.shared.book.borrow_mut();
        let name = meta.name.clone();
        let count = book.fields_count.get(&name).copied().unwrap_or(0) + 1;
        let existing = B::get_in(&book.fields_stack, &[name.as_str()]).cloned();

        match existing {
            Some(existing) if count > 1 && meta.kind.is_group_capable() => {
                let merged = merge_group_value::<B>(&meta, checked, count, &existing)?;
                if let Some(value) = merged {
                    book.stack_put(&[name.as_str(), VALUE], value);
                }
                let validators = normalize_validators(validators);
                let slot = book.fields_validate_stack.entry(name.clone()).or_default();
                if slot.is_empty() {
                    *slot = validators;
                }
                debug!(
                    form = %self.shared.form_name,
                    field = %name,
                    count,
                    "group instance merged"
                );
            }
            _ => {
                let value = initial_value::<B>(&meta, checked, &snapshot)?;
                let node = B::set_in(snapshot.to_node::<B>(), &[VALUE], value);
                book.stack_put(&[name.as_str()], node);
                book.fields_validate_stack
                    .insert(name.clone(), normalize_validators(validators));
                debug!(form = %self.shared.form_name, field = %name, count, "field registered");
            }
        }

        book.fields_count.insert(name.clone(), count);
        book.fields_meta.insert(name, meta);
        book.debouncer.arm(now);
        Ok(())
    }

    /// Unregister one field instance.
    ///
    /// With `remove_on_unmount` (falling back to the configured default) the
    /// field leaves the bookkeeping and a REMOVE_FIELD is dispatched at once.
    pub fn unregister_field(&self, name: &str, remove_on_unmount: Option<bool>) {
        let remove = remove_on_unmount.unwrap_or(self.shared.config.remove_on_unmount);
        {
            let mut book = self.shared.book.borrow_mut();
            if remove {
                book.fields_count.remove(name);
                book.fields_validate_stack.remove(name);
                book.fields_meta.remove(name);
                book.stack_delete(name);
            } else if let Some(count) = book.fields_count.get_mut(name) {
                *count = count.saturating_sub(1);
            }
        }
        if remove {
            debug!(form = %self.shared.form_name, field = name, "field removed");
            self.dispatch(action::remove_field(&self.shared.form_name, name));
        }
    }

    /// Let `value` replace the local snapshot value of `name`.
    pub fn update_stack_field_value(&self, name: &str, value: B::Node) {
        let mut book = self.shared.book.borrow_mut();
        if B::has_in(&book.fields_stack, &[name]) {
            book.stack_put(&[name, VALUE], value);
        }
    }

    /// Number of mounted instances of `name`.
    #[must_use]
    pub fn field_count(&self, name: &str) -> usize {
        self.shared
            .book
            .borrow()
            .fields_count
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Local snapshot of `name`, as registered so far.
    #[must_use]
    pub fn stacked_field(&self, name: &str) -> Option<FieldState> {
        let book = self.shared.book.borrow();
        B::get_in(&book.fields_stack, &[name]).map(FieldState::from_node::<B>)
    }

    pub(crate) fn field_meta(&self, name: &str) -> Option<FieldMeta> {
        self.shared.book.borrow().fields_meta.get(name).cloned()
    }

    // -- commits -------------------------------------------------------------

    /// First synchronous commit, run when the form root mounts.
    ///
    /// Adopts persisted form state if the slice already has baselines,
    /// committing any registered field it lacks; otherwise dispatches
    /// FORM_INITIALISATION. Once initialized, only
    /// commits registrations still pending.
    pub fn mount(&self) {
        let (initialized, pending) = {
            let book = self.shared.book.borrow();
            (book.initialized, book.debouncer.is_armed())
        };
        if !initialized || pending {
            self.commit("mount");
        }
    }

    /// Commit if the quiet period has elapsed. Returns whether it committed.
    pub fn poll(&self) -> bool {
        let now = self.shared.clock.now();
        let fired = self.shared.book.borrow_mut().debouncer.fire(now);
        match fired {
            Some(coalesced) => {
                debug!(form = %self.shared.form_name, coalesced, "quiet period elapsed");
                self.commit("debounce");
                true
            }
            None => false,
        }
    }

    /// Commit now, regardless of the debouncer.
    pub fn flush(&self) {
        self.commit("flush");
    }

    /// When the pending commit becomes due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.book.borrow().debouncer.deadline()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.shared.book.borrow().initialized
    }

    fn commit(&self, trigger: &'static str) {
        let span = debug_span!("commit", form = %self.shared.form_name, trigger);
        let _enter = span.enter();

        let record = {
            let mut book = self.shared.book.borrow_mut();
            book.debouncer.cancel();
            let fields = fields_from_node::<B>(&book.fields_stack);
            if book.initialized {
                Some(action::update_form(&self.shared.form_name, fields))
            } else {
                book.initialized = true;
                if self.shared.has_persisted() {
                    None
                } else {
                    Some(action::form_initialisation(&self.shared.form_name, fields))
                }
            }
        };

        match record {
            Some(record) => {
                debug!(kind = record.kind(), "committing field snapshot");
                self.dispatch(record);
            }
            None => {
                debug!("adopting persisted form state");
                let shared = &self.shared;
                shared.store.read(|root| shared.reconcile(root));
                if let Some(record) = self.unpersisted_fields_update() {
                    debug!(kind = record.kind(), "committing fields absent from persisted state");
                    self.dispatch(record);
                }
            }
        }
    }

    /// UPDATE_FORM carrying the whole snapshot when some registered field is
    /// missing from the adopted slice.
    fn unpersisted_fields_update(&self) -> Option<formbind_core::Action> {
        let persisted = self.shared.store.read(|root| {
            self.shared
                .form_node(root)
                .and_then(|form| B::get_in(form, &[FIELDS]))
                .map(B::keys)
                .unwrap_or_default()
        });
        let book = self.shared.book.borrow();
        let missing = B::keys(&book.fields_stack)
            .iter()
            .any(|name| !persisted.contains(name));
        missing.then(|| {
            action::update_form(
                &self.shared.form_name,
                fields_from_node::<B>(&book.fields_stack),
            )
        })
    }

    // -- state ---------------------------------------------------------------

    /// Dispatch a record through the coordinator's store.
    pub fn dispatch(&self, record: formbind_core::Action) {
        self.shared.store.dispatch(record);
    }

    /// Typed view of this form's canonical state.
    #[must_use]
    pub fn form_state(&self) -> FormState {
        self.shared
            .store
            .form_state(&self.shared.form_path())
            .unwrap_or_default()
    }

    /// Canonical state of `name`, if the store has it.
    #[must_use]
    pub fn field_state(&self, name: &str) -> Option<FieldState> {
        self.shared.store.read(|root| {
            self.shared
                .form_node(root)
                .and_then(|form| B::get_in(form, &[FIELDS, name]))
                .map(FieldState::from_node::<B>)
        })
    }

    /// Canonical value of `name`, falling back to the local snapshot.
    #[must_use]
    pub fn field_value(&self, name: &str) -> Option<B::Node> {
        let canonical = self.shared.store.read(|root| {
            self.shared
                .form_node(root)
                .and_then(|form| B::get_in(form, &[FIELDS, name, VALUE]))
                .cloned()
        });
        canonical.or_else(|| {
            let book = self.shared.book.borrow();
            B::get_in(&book.fields_stack, &[name, VALUE]).cloned()
        })
    }

    /// Plain map of every field value in the store.
    #[must_use]
    pub fn values(&self) -> Value {
        let fields = self
            .form_state()
            .fields
            .into_iter()
            .map(|(name, field)| (name, field.value))
            .collect();
        Value::Object(fields)
    }

    /// Reset every field to `baseline` (or the configured default).
    pub fn reset_form(&self, baseline: Option<Baseline>) {
        let baseline = baseline.unwrap_or(self.shared.config.reset_baseline);
        self.dispatch(action::reset_form(&self.shared.form_name, baseline));
    }

    /// Reset one field to `baseline` (or the configured default).
    pub fn reset_field(&self, name: &str, baseline: Option<Baseline>) {
        let baseline = baseline.unwrap_or(self.shared.config.reset_baseline);
        self.dispatch(action::reset_field(&self.shared.form_name, name, baseline));
    }

    // -- validation ----------------------------------------------------------

    /// Validate the current value of `name` and store the resulting errors.
    pub fn validate_field(&self, name: &str) -> Validation {
        let value = self.field_value(name).unwrap_or_else(B::null);
        let validators = self.validators_for(name);
        let pipeline = validate_node::<B>(&value, &validators);
        let this = self.clone();
        let name = name.to_owned();
        async move {
            let errors = pipeline.await?;
            this.dispatch(action::set_field_errors(
                &this.shared.form_name,
                &name,
                errors.clone(),
            ));
            Ok(errors)
        }
        .boxed_local()
    }

    /// Validate every registered field, one after another, and store all
    /// errors in one record.
    pub fn validate_form(
        &self,
    ) -> LocalBoxFuture<'static, Result<BTreeMap<String, Vec<String>>, ValidationError>> {
        let this = self.clone();
        async move {
            let names = {
                let book = this.shared.book.borrow();
                B::keys(&book.fields_stack)
            };
            let mut results = BTreeMap::new();
            for name in names {
                let value = this.field_value(&name).unwrap_or_else(B::null);
                let validators = this.validators_for(&name);
                let errors = validate_node::<B>(&value, &validators).await?;
                results.insert(name, errors);
            }
            this.dispatch(action::set_fields_errors(
                &this.shared.form_name,
                results.clone(),
            ));
            Ok(results)
        }
        .boxed_local()
    }

    /// Run a submission: mark submitting, validate the whole form, mark
    /// submitted.
    pub fn submit(&self) -> LocalBoxFuture<'static, Result<SubmitOutcome, ValidationError>> {
        let this = self.clone();
        async move {
            let form_name = this.shared.form_name.clone();
            this.dispatch(action::set_form_submitting(&form_name, true));
            let validated = this.validate_form().await;
            this.dispatch(action::set_form_submitting(&form_name, false));

            let errors: BTreeMap<String, Vec<String>> = validated?
                .into_iter()
                .filter(|(_, errors)| !errors.is_empty())
                .collect();
            let outcome = SubmitOutcome {
                valid: errors.is_empty(),
                values: this.values(),
                errors,
            };
            debug!(form = %form_name, valid = outcome.valid, "submission finished");
            Ok(outcome)
        }
        .boxed_local()
    }

    fn validators_for(&self, name: &str) -> Vec<Validator> {
        self.shared
            .book
            .borrow()
            .fields_validate_stack
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    // -- adapters ------------------------------------------------------------

    /// Register a field instance and return its UI adapter.
    ///
    /// # Errors
    ///
    /// As [`register_field`](Self::register_field).
    pub fn bind_field(
        &self,
        registration: FieldRegistration,
    ) -> Result<FieldBinding<B>, FormError> {
        let meta = registration.meta.clone();
        self.register_field(registration)?;
        Ok(FieldBinding::new(self.clone(), meta))
    }

    /// Live projection of `names` from this form.
    #[must_use]
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> FieldsProjection {
        FieldsProjection::new(&self.shared.store, &self.shared.form_path(), names)
    }
}

// ---------------------------------------------------------------------------
// Value policy at registration
// ---------------------------------------------------------------------------

fn initial_value<B: Backend>(
    meta: &FieldMeta,
    checked: Option<bool>,
    snapshot: &FieldState,
) -> Result<B::Node, FormError> {
    let value = B::from_plain(&snapshot.value);
    if meta.is_multi_select() {
        if is_blank::<B>(&value) {
            return Ok(B::list(Vec::new()));
        }
        return extract_value::<B>(&FieldInput::Value(snapshot.value.clone()), meta, None);
    }
    match checked {
        Some(checked) if meta.kind.is_group_capable() => {
            let single = meta.clone().group_size(1);
            extract_value::<B>(&InputEvent::checked(checked).into(), &single, None)
        }
        _ => Ok(value),
    }
}

/// New group value after another instance of a radio/checkbox group
/// registers, or `None` when the instance leaves the value alone.
fn merge_group_value<B: Backend>(
    meta: &FieldMeta,
    checked: Option<bool>,
    count: usize,
    existing: &B::Node,
) -> Result<Option<B::Node>, FormError> {
    let Some(checked) = checked else {
        return Ok(None);
    };
    let grouped = meta.clone().group_size(count);
    let input: FieldInput = InputEvent::checked(checked).into();
    match meta.kind {
        FieldKind::Radio if checked => {
            extract_value::<B>(&input, &grouped, None).map(Some)
        }
        FieldKind::Checkbox => {
            extract_value::<B>(&input, &grouped, B::get_in(existing, &[VALUE])).map(Some)
        }
        _ => Ok(None),
    }
}
