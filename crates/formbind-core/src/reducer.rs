#![forbid(unsafe_code)]

//! The form/field state reducer.
//!
//! [`FormReducer`] is bound to one form name and maps `(state, action)` to the
//! next state. It is pure: no I/O, no shared state, and the input node is
//! consumed rather than mutated behind the caller's back. Records addressed
//! to another form, and unrecognized records, hand the input back as-is.
//!
//! # Invariants
//!
//! 1. `fields.<f>.valid == fields.<f>.errors.is_empty()` after every
//!    transition that writes errors.
//! 2. Form `valid` is the AND over all field `valid` flags, recomputed by a
//!    full scan whenever errors change, a field is removed or reset, or the
//!    field set is reconciled. It is never flipped incrementally.
//! 3. Form `touched` / `changed` only go false→true, except through
//!    FORM_INITIALISATION (OR-reduced from the snapshot) and RESET_FORM
//!    (restored from the baseline).
//! 4. Single-field transitions aimed at a field that is not in state are
//!    no-ops. Batch disabled/touched/hidden transitions apply to every key,
//!    materializing a default field for keys not yet present.
//! 5. Both baselines are rebuilt by every FORM_INITIALISATION.
//!
//! # Failure Modes
//!
//! None. Malformed or mistargeted records degrade to no-ops; the reducer
//! never panics and never returns an error.

use tracing::trace;

use crate::action::Action;
use crate::backend::{Backend, get_bool};
use crate::state::keys::{
    BASELINE_ENTRIES, CHANGED, DISABLED, EMPTY_FORM_STATE, ERRORS, FIELDS, HIDDEN,
    INITIAL_FORM_STATE, SUBMITTED, SUBMITTING, TOUCHED, VALID, VALUE,
};
use crate::state::{Baseline, FieldMap, FieldState, FormState};

/// Reducer for the state of one named form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormReducer {
    form_name: String,
}

impl FormReducer {
    /// Bind a reducer to `form_name`.
    #[must_use]
    pub fn new(form_name: impl Into<String>) -> Self {
        Self {
            form_name: form_name.into(),
        }
    }

    /// The form this reducer owns.
    #[must_use]
    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    /// Whether `action` is addressed to this reducer's form.
    #[must_use]
    pub fn accepts(&self, action: &Action) -> bool {
        action.form_name() == Some(self.form_name.as_str())
    }

    /// Zero-value state of a form that was never initialized.
    #[must_use]
    pub fn initial_state<B: Backend>() -> B::Node {
        FormState::default().to_node::<B>()
    }

    /// Apply `action` to `state`.
    #[must_use]
    pub fn reduce<B: Backend>(&self, state: B::Node, action: &Action) -> B::Node {
        if !self.accepts(action) {
            trace!(
                form = %self.form_name,
                kind = action.kind(),
                "record not addressed to this form"
            );
            return state;
        }

        match action {
            Action::FormInitialisation { fields, .. } => initialise::<B>(state, fields),
            Action::UpdateForm { fields, .. } => update_form::<B>(state, fields),
            Action::ChangeFieldValue { field, value, .. } => {
                change_value::<B>(state, field, B::from_plain(value))
            }
            Action::ChangeFieldsValues { values, .. } => {
                values.iter().fold(state, |state, (field, value)| {
                    change_value::<B>(state, field, B::from_plain(value))
                })
            }
            Action::SetFieldErrors { field, errors, .. } => {
                if !has_field::<B>(&state, field) {
                    return skip::<B>(state, action, field);
                }
                rescan_valid::<B>(set_errors::<B>(state, field, errors))
            }
            Action::SetFieldsErrors { errors, .. } => {
                let state = errors.iter().fold(state, |state, (field, errors)| {
                    if has_field::<B>(&state, field) {
                        set_errors::<B>(state, field, errors)
                    } else {
                        state
                    }
                });
                rescan_valid::<B>(state)
            }
            Action::SetFieldDisabled { field, disabled, .. } => {
                if !has_field::<B>(&state, field) {
                    return skip::<B>(state, action, field);
                }
                set_field_flag::<B>(state, field, DISABLED, *disabled)
            }
            Action::SetFieldsDisabled { disabled, .. } => disabled
                .iter()
                .fold(state, |state, (field, flag)| {
                    set_field_flag::<B>(ensure_field::<B>(state, field), field, DISABLED, *flag)
                }),
            Action::SetFieldTouched { field, touched, .. } => {
                if !has_field::<B>(&state, field) {
                    return skip::<B>(state, action, field);
                }
                touch::<B>(state, field, *touched)
            }
            Action::SetFieldsTouched { touched, .. } => touched
                .iter()
                .fold(state, |state, (field, flag)| {
                    touch::<B>(ensure_field::<B>(state, field), field, *flag)
                }),
            Action::SetFieldHidden { field, hidden, .. } => {
                if !has_field::<B>(&state, field) {
                    return skip::<B>(state, action, field);
                }
                set_field_flag::<B>(state, field, HIDDEN, *hidden)
            }
            Action::SetFieldsHidden { hidden, .. } => hidden
                .iter()
                .fold(state, |state, (field, flag)| {
                    set_field_flag::<B>(ensure_field::<B>(state, field), field, HIDDEN, *flag)
                }),
            Action::RemoveField { field, .. } => {
                if !has_field::<B>(&state, field) {
                    return skip::<B>(state, action, field);
                }
                rescan_valid::<B>(B::delete_in(state, &[FIELDS, field.as_str()]))
            }
            Action::ResetField { field, baseline, .. } => {
                rescan_valid::<B>(reset_field::<B>(state, field, *baseline))
            }
            Action::ResetFields {
                fields, baseline, ..
            } => {
                let state = fields
                    .iter()
                    .fold(state, |state, field| reset_field::<B>(state, field, *baseline));
                rescan_valid::<B>(state)
            }
            Action::ResetForm { baseline, .. } => reset_form::<B>(state, *baseline),
            Action::SetFormSubmitting { submitting, .. } => {
                let state = B::set_in(state, &[SUBMITTING], B::bool(*submitting));
                B::set_in(state, &[SUBMITTED], B::bool(!*submitting))
            }
            Action::Unrecognized => state,
        }
    }
}

fn skip<B: Backend>(state: B::Node, action: &Action, field: &str) -> B::Node {
    trace!(kind = action.kind(), field, "field not in state; ignoring");
    state
}

fn has_field<B: Backend>(state: &B::Node, field: &str) -> bool {
    B::has_in(state, &[FIELDS, field])
}

fn ensure_field<B: Backend>(state: B::Node, field: &str) -> B::Node {
    if has_field::<B>(&state, field) {
        state
    } else {
        B::set_in(state, &[FIELDS, field], FieldState::default().to_node::<B>())
    }
}

fn set_field_flag<B: Backend>(state: B::Node, field: &str, flag: &str, value: bool) -> B::Node {
    B::set_in(state, &[FIELDS, field, flag], B::bool(value))
}

fn touch<B: Backend>(state: B::Node, field: &str, touched: bool) -> B::Node {
    let state = set_field_flag::<B>(state, field, TOUCHED, touched);
    if touched {
        B::set_in(state, &[TOUCHED], B::bool(true))
    } else {
        state
    }
}

fn change_value<B: Backend>(state: B::Node, field: &str, value: B::Node) -> B::Node {
    if !has_field::<B>(&state, field) {
        trace!(field, "value change for field not in state; ignoring");
        return state;
    }
    let state = B::set_in(state, &[CHANGED], B::bool(true));
    let state = B::set_in(state, &[FIELDS, field, VALUE], value);
    set_field_flag::<B>(state, field, CHANGED, true)
}

fn set_errors<B: Backend>(state: B::Node, field: &str, errors: &[String]) -> B::Node {
    let list = B::list(errors.iter().map(|e| B::string(e)).collect());
    let state = B::set_in(state, &[FIELDS, field, ERRORS], list);
    set_field_flag::<B>(state, field, VALID, errors.is_empty())
}

/// Recompute form `valid` as the AND over every field.
fn rescan_valid<B: Backend>(state: B::Node) -> B::Node {
    let valid = match B::get_in(&state, &[FIELDS]) {
        Some(fields) => B::keys(fields)
            .iter()
            .all(|name| get_bool::<B>(fields, &[name.as_str(), VALID], true)),
        None => true,
    };
    B::set_in(state, &[VALID], B::bool(valid))
}

fn initialise<B: Backend>(state: B::Node, fields: &FieldMap) -> B::Node {
    let snapshot = FormState {
        valid: fields.values().all(|f| f.errors.is_empty()),
        submitted: false,
        submitting: false,
        touched: fields.values().any(|f| f.touched),
        changed: fields.values().any(|f| f.changed),
        fields: fields.clone(),
    };
    let empty = FormState {
        fields: fields
            .iter()
            .map(|(name, field)| (name.clone(), field.blanked()))
            .collect(),
        ..FormState::default()
    };

    let initial = snapshot.to_node::<B>();
    let state = B::merge(state, &initial);
    let state = B::set_in(state, &[INITIAL_FORM_STATE], initial);
    B::set_in(state, &[EMPTY_FORM_STATE], empty.to_node::<B>())
}

fn update_form<B: Backend>(state: B::Node, fields: &FieldMap) -> B::Node {
    let existing = B::get_in(&state, &[FIELDS]).map(B::keys).unwrap_or_default();
    let state = existing
        .iter()
        .filter(|name| !fields.contains_key(name.as_str()))
        .fold(state, |state, name| B::delete_in(state, &[FIELDS, name.as_str()]));

    let initialised = B::has_in(&state, &[INITIAL_FORM_STATE]);
    let state = fields.iter().fold(state, |state, (name, field)| {
        if has_field::<B>(&state, name) {
            return state;
        }
        let mut state = B::set_in(state, &[FIELDS, name.as_str()], field.to_node::<B>());
        if initialised {
            if !B::has_in(&state, &[INITIAL_FORM_STATE, FIELDS, name.as_str()]) {
                state = B::set_in(
                    state,
                    &[INITIAL_FORM_STATE, FIELDS, name.as_str()],
                    field.to_node::<B>(),
                );
            }
            if !B::has_in(&state, &[EMPTY_FORM_STATE, FIELDS, name.as_str()]) {
                state = B::set_in(
                    state,
                    &[EMPTY_FORM_STATE, FIELDS, name.as_str()],
                    field.blanked().to_node::<B>(),
                );
            }
        }
        state
    });
    rescan_valid::<B>(state)
}

fn reset_field<B: Backend>(state: B::Node, field: &str, baseline: Baseline) -> B::Node {
    if !has_field::<B>(&state, field) {
        trace!(field, "reset for field not in state; ignoring");
        return state;
    }
    match B::get_in(&state, &[baseline.key(), FIELDS, field]).cloned() {
        Some(restored) => B::set_in(state, &[FIELDS, field], restored),
        None => {
            trace!(field, baseline = baseline.key(), "no baseline entry for field");
            state
        }
    }
}

fn reset_form<B: Backend>(state: B::Node, baseline: Baseline) -> B::Node {
    let Some(snapshot) = B::get_in(&state, &[baseline.key()]) else {
        trace!(baseline = baseline.key(), "form reset before initialization; ignoring");
        return state;
    };
    let restored = BASELINE_ENTRIES
        .iter()
        .copied()
        .filter_map(|key| B::get_in(snapshot, &[key]).map(|node| (key, node.clone())))
        .fold(B::empty_map(), |node, (key, value)| B::set_in(node, &[key], value));
    rescan_valid::<B>(B::merge(state, &restored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action;
    use crate::backend::PlainBackend;
    use serde_json::{Value, json};
    use tracing_test::traced_test;

    type P = PlainBackend;

    fn reducer() -> FormReducer {
        FormReducer::new("signup")
    }

    fn initialised(fields: &[(&str, FieldState)]) -> Value {
        let fields: FieldMap = fields
            .iter()
            .map(|(name, field)| ((*name).to_string(), field.clone()))
            .collect();
        reducer().reduce::<P>(
            FormReducer::initial_state::<P>(),
            &action::form_initialisation("signup", fields),
        )
    }

    fn form(state: &Value) -> FormState {
        FormState::from_node::<P>(state)
    }

    #[test]
    fn foreign_form_is_ignored() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let next = reducer().reduce::<P>(
            state.clone(),
            &action::change_field_value("other", "a", "y"),
        );
        assert_eq!(next, state);
    }

    #[test]
    #[traced_test]
    fn foreign_form_is_traced() {
        let state = FormReducer::initial_state::<P>();
        let _ = reducer().reduce::<P>(state, &action::set_form_submitting("other", true));
        assert!(logs_contain("record not addressed to this form"));
    }

    #[test]
    fn unrecognized_record_is_ignored() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let next = reducer().reduce::<P>(state.clone(), &Action::Unrecognized);
        assert_eq!(next, state);
    }

    #[test]
    fn initialisation_recomputes_flags_and_baselines() {
        let state = initialised(&[
            ("a", FieldState::with_value("x").touched(true)),
            ("b", FieldState::with_value(json!(["p"])).disabled(true)),
        ]);
        let form = form(&state);
        assert!(form.valid);
        assert!(form.touched);
        assert!(!form.changed);

        let initial =
            FormState::baseline::<P>(&state, Baseline::Initial).expect("initial baseline");
        assert_eq!(initial.fields["a"].value, json!("x"));
        assert!(initial.touched);

        let empty = FormState::baseline::<P>(&state, Baseline::Empty).expect("empty baseline");
        assert_eq!(empty.fields["a"], FieldState::default());
        assert_eq!(empty.fields["b"].value, json!([]));
        assert!(!empty.fields["b"].disabled);
        assert!(!empty.touched);
    }

    #[test]
    fn initialisation_replaces_previous_fields_and_baselines() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let mut fields = FieldMap::new();
        fields.insert("b".into(), FieldState::with_value("y"));
        let state = reducer().reduce::<P>(state, &action::form_initialisation("signup", fields));
        let form = form(&state);
        assert!(form.field("a").is_none());
        assert_eq!(form.fields["b"].value, json!("y"));
        let initial = FormState::baseline::<P>(&state, Baseline::Initial).expect("initial");
        assert!(initial.field("a").is_none());
    }

    #[test]
    fn update_form_adds_and_drops_without_overwriting() {
        let state = initialised(&[
            ("a", FieldState::with_value("x")),
            ("b", FieldState::with_value("y")),
        ]);
        let state = reducer().reduce::<P>(
            state,
            &action::change_field_value("signup", "a", "edited"),
        );

        let mut fields = FieldMap::new();
        fields.insert("a".into(), FieldState::with_value("ignored"));
        fields.insert("c".into(), FieldState::with_value("z"));
        let state = reducer().reduce::<P>(state, &action::update_form("signup", fields));

        let form = form(&state);
        assert_eq!(form.fields["a"].value, json!("edited"));
        assert!(form.field("b").is_none());
        assert_eq!(form.fields["c"].value, json!("z"));

        let initial = FormState::baseline::<P>(&state, Baseline::Initial).expect("initial");
        assert_eq!(initial.fields["c"].value, json!("z"));
        assert_eq!(initial.fields["a"].value, json!("x"));
    }

    #[test]
    fn update_form_rescans_validity_after_dropping_invalid_field() {
        let state = initialised(&[
            ("a", FieldState::with_value("x")),
            ("b", FieldState::with_value("y")),
        ]);
        let state = reducer().reduce::<P>(state, &action::set_field_errors("signup", "b", ["bad"]));
        assert!(!form(&state).valid);

        let mut fields = FieldMap::new();
        fields.insert("a".into(), FieldState::with_value("x"));
        let state = reducer().reduce::<P>(state, &action::update_form("signup", fields));
        assert!(form(&state).valid);
    }

    #[test]
    fn change_value_marks_field_and_form_changed() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let state = reducer().reduce::<P>(state, &action::change_field_value("signup", "a", "y"));
        let form = form(&state);
        assert!(form.changed);
        assert!(form.fields["a"].changed);
        assert_eq!(form.fields["a"].value, json!("y"));
    }

    #[test]
    fn change_value_for_missing_field_is_noop() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let next = reducer().reduce::<P>(
            state.clone(),
            &action::change_field_value("signup", "zz", "y"),
        );
        assert_eq!(next, state);
    }

    #[test]
    fn change_values_only_touches_existing_keys() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let state = reducer().reduce::<P>(
            state,
            &action::change_fields_values("signup", [("a", "1"), ("ghost", "2")]),
        );
        let form = form(&state);
        assert_eq!(form.fields["a"].value, json!("1"));
        assert!(form.field("ghost").is_none());
    }

    #[test]
    fn errors_drive_field_and_form_validity() {
        let state = initialised(&[
            ("a", FieldState::with_value("x")),
            ("b", FieldState::with_value("y")),
        ]);
        let state = reducer().reduce::<P>(
            state,
            &action::set_fields_errors(
                "signup",
                [("a", vec!["e1".to_string()]), ("b", vec!["e2".to_string()])],
            ),
        );
        assert!(!form(&state).valid);

        let state = reducer().reduce::<P>(
            state,
            &action::set_field_errors("signup", "a", Vec::<String>::new()),
        );
        let current = form(&state);
        assert!(current.fields["a"].valid);
        assert!(!current.valid, "b still has errors");

        let state = reducer().reduce::<P>(
            state,
            &action::set_field_errors("signup", "b", Vec::<String>::new()),
        );
        assert!(form(&state).valid);
    }

    #[test]
    fn single_flag_transitions_skip_missing_fields() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        for record in [
            action::set_field_disabled("signup", "ghost", true),
            action::set_field_touched("signup", "ghost", true),
            action::set_field_hidden("signup", "ghost", true),
            action::set_field_errors("signup", "ghost", ["e"]),
            action::remove_field("signup", "ghost"),
            action::reset_field("signup", "ghost", Baseline::Initial),
        ] {
            let next = reducer().reduce::<P>(state.clone(), &record);
            assert_eq!(next, state, "{} should be a no-op", record.kind());
        }
    }

    #[test]
    fn batch_flag_transitions_apply_unconditionally() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let state = reducer().reduce::<P>(
            state,
            &action::set_fields_disabled("signup", [("a", true), ("late", true)]),
        );
        let form = form(&state);
        assert!(form.fields["a"].disabled);
        assert!(form.fields["late"].disabled);
        assert_eq!(form.fields["late"].value, json!(""));
    }

    #[test]
    fn touched_is_monotone_at_form_level() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let state = reducer().reduce::<P>(state, &action::set_field_touched("signup", "a", true));
        assert!(form(&state).touched);
        let state = reducer().reduce::<P>(state, &action::set_field_touched("signup", "a", false));
        let current = form(&state);
        assert!(!current.fields["a"].touched);
        assert!(current.touched);
    }

    #[test]
    fn untouching_never_marks_form_touched() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let state = reducer().reduce::<P>(
            state,
            &action::set_fields_touched("signup", [("a", false)]),
        );
        assert!(!form(&state).touched);
    }

    #[test]
    fn remove_field_drops_entry() {
        let state = initialised(&[
            ("a", FieldState::with_value("x")),
            ("b", FieldState::default()),
        ]);
        let state = reducer().reduce::<P>(state, &action::remove_field("signup", "a"));
        let form = form(&state);
        assert!(form.field("a").is_none());
        assert!(form.field("b").is_some());
    }

    #[test]
    fn reset_field_restores_selected_baseline() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let state = reducer().reduce::<P>(state, &action::change_field_value("signup", "a", "y"));

        let initial = reducer().reduce::<P>(
            state.clone(),
            &action::reset_field("signup", "a", Baseline::Initial),
        );
        assert_eq!(form(&initial).fields["a"].value, json!("x"));
        assert!(!form(&initial).fields["a"].changed);

        let empty = reducer().reduce::<P>(
            state,
            &action::reset_field("signup", "a", Baseline::Empty),
        );
        assert_eq!(form(&empty).fields["a"].value, json!(""));
    }

    #[test]
    fn reset_fields_rescans_validity() {
        let state = initialised(&[
            ("a", FieldState::with_value("x")),
            ("b", FieldState::default()),
        ]);
        let state = reducer().reduce::<P>(state, &action::set_field_errors("signup", "a", ["bad"]));
        let state = reducer().reduce::<P>(
            state,
            &action::reset_fields("signup", ["a", "b"], Baseline::Empty),
        );
        assert!(form(&state).valid);
        assert!(form(&state).fields["a"].errors.is_empty());
    }

    #[test]
    fn reset_form_restores_wholesale() {
        let state = initialised(&[("a", FieldState::with_value("x"))]);
        let state = reducer().reduce::<P>(state, &action::change_field_value("signup", "a", "y"));
        let state = reducer().reduce::<P>(state, &action::set_field_touched("signup", "a", true));
        let state = reducer().reduce::<P>(state, &action::set_form_submitting("signup", false));

        let state = reducer().reduce::<P>(state, &action::reset_form("signup", Baseline::Initial));
        let current = form(&state);
        assert_eq!(current.fields["a"].value, json!("x"));
        assert!(!current.touched);
        assert!(!current.changed);
        assert!(!current.submitted);
        assert!(FormState::baseline::<P>(&state, Baseline::Empty).is_some());
    }

    #[test]
    fn reset_form_before_initialisation_is_noop() {
        let state = FormReducer::initial_state::<P>();
        let next = reducer().reduce::<P>(
            state.clone(),
            &action::reset_form("signup", Baseline::Initial),
        );
        assert_eq!(next, state);
    }

    #[test]
    fn submitting_lifecycle() {
        let state = initialised(&[("a", FieldState::default())]);
        let state = reducer().reduce::<P>(state, &action::set_form_submitting("signup", true));
        let current = form(&state);
        assert!(current.submitting);
        assert!(!current.submitted);

        let state = reducer().reduce::<P>(state, &action::set_form_submitting("signup", false));
        let current = form(&state);
        assert!(!current.submitting);
        assert!(current.submitted);
    }
}
