#![forbid(unsafe_code)]

//! Property tests for the form reducer and the value-extraction policy.
//!
//! # Invariants
//!
//! 1. **No-op records**: a record for another form, or an unrecognized
//!    record, returns a state deep-equal to its input.
//! 2. **Validity aggregation**: form `valid` is the AND over field `valid`
//!    after every transition, and every field's `valid` agrees with its
//!    errors.
//! 3. **Touched monotonicity**: form `touched` never goes true→false outside
//!    FORM_INITIALISATION and RESET_FORM.
//! 4. **Backend equivalence**: every sequence yields the same plain state on
//!    both backends.
//!
//! Run: `cargo test -p formbind-core --test reducer_properties`

use formbind_core::action::{self, Action};
use formbind_core::{
    Backend, Baseline, FieldInput, FieldKind, FieldMap, FieldMeta, FieldState, FormReducer,
    FormState, InputEvent, PersistentBackend, PlainBackend, extract_value,
};
use proptest::prelude::*;
use serde_json::{Value, json};

const FORM: &str = "profile";

// =============================================================================
// Strategies
// =============================================================================

fn field_name() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d"]).prop_map(str::to_owned)
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("")),
        "[a-z]{1,6}".prop_map(Value::from),
        (0i64..100).prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => scalar(),
        1 => prop::collection::vec(scalar(), 0..3).prop_map(Value::Array),
    ]
}

fn errors() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{1,10}", 0..3)
}

fn field_state() -> impl Strategy<Value = FieldState> {
    (field_value(), errors(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(value, errors, touched, changed, disabled)| {
            FieldState::with_value(value)
                .errors(errors)
                .touched(touched)
                .changed(changed)
                .disabled(disabled)
        },
    )
}

fn field_map() -> impl Strategy<Value = FieldMap> {
    prop::collection::btree_map(field_name(), field_state(), 0..4)
}

fn baseline() -> impl Strategy<Value = Baseline> {
    prop_oneof![Just(Baseline::Initial), Just(Baseline::Empty)]
}

/// Records for `FORM` that never re-initialize or reset the whole form.
fn incremental_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        field_map().prop_map(|fields| action::update_form(FORM, fields)),
        (field_name(), field_value()).prop_map(|(f, v)| action::change_field_value(FORM, f, v)),
        prop::collection::btree_map(field_name(), field_value(), 0..3)
            .prop_map(|values| action::change_fields_values(FORM, values)),
        (field_name(), errors()).prop_map(|(f, e)| action::set_field_errors(FORM, f, e)),
        prop::collection::btree_map(field_name(), errors(), 0..3)
            .prop_map(|errors| action::set_fields_errors(FORM, errors)),
        (field_name(), any::<bool>()).prop_map(|(f, b)| action::set_field_disabled(FORM, f, b)),
        prop::collection::btree_map(field_name(), any::<bool>(), 0..3)
            .prop_map(|flags| action::set_fields_disabled(FORM, flags)),
        (field_name(), any::<bool>()).prop_map(|(f, b)| action::set_field_touched(FORM, f, b)),
        prop::collection::btree_map(field_name(), any::<bool>(), 0..3)
            .prop_map(|flags| action::set_fields_touched(FORM, flags)),
        (field_name(), any::<bool>()).prop_map(|(f, b)| action::set_field_hidden(FORM, f, b)),
        prop::collection::btree_map(field_name(), any::<bool>(), 0..3)
            .prop_map(|flags| action::set_fields_hidden(FORM, flags)),
        field_name().prop_map(|f| action::remove_field(FORM, f)),
        (field_name(), baseline()).prop_map(|(f, b)| action::reset_field(FORM, f, b)),
        (prop::collection::vec(field_name(), 0..3), baseline())
            .prop_map(|(fields, b)| action::reset_fields(FORM, fields, b)),
        any::<bool>().prop_map(|b| action::set_form_submitting(FORM, b)),
    ]
}

fn any_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        6 => incremental_action(),
        1 => field_map().prop_map(|fields| action::form_initialisation(FORM, fields)),
        1 => baseline().prop_map(|b| action::reset_form(FORM, b)),
    ]
}

fn retarget(action: &Action) -> Action {
    let mut record = action.to_record().expect("record encodes");
    record["form_name"] = json!("someone_else");
    Action::from_record(record).expect("record decodes")
}

// =============================================================================
// Helpers
// =============================================================================

fn run<B: Backend>(init: &FieldMap, actions: &[Action]) -> Vec<B::Node> {
    let reducer = FormReducer::new(FORM);
    let mut state = reducer.reduce::<B>(
        FormReducer::initial_state::<B>(),
        &action::form_initialisation(FORM, init.clone()),
    );
    let mut trace = vec![state.clone()];
    for action in actions {
        state = reducer.reduce::<B>(state, action);
        trace.push(state.clone());
    }
    trace
}

fn is_whole_form_transition(action: &Action) -> bool {
    matches!(
        action,
        Action::FormInitialisation { .. } | Action::ResetForm { .. }
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_foreign_and_unrecognized_records_are_noops(
        init in field_map(),
        prefix in prop::collection::vec(any_action(), 0..6),
        probe in any_action(),
    ) {
        let reducer = FormReducer::new(FORM);
        let state = run::<PlainBackend>(&init, &prefix).pop().expect("non-empty trace");

        let foreign = reducer.reduce::<PlainBackend>(state.clone(), &retarget(&probe));
        prop_assert_eq!(&foreign, &state);

        let unknown = reducer.reduce::<PlainBackend>(state.clone(), &Action::Unrecognized);
        prop_assert_eq!(&unknown, &state);
    }

    #[test]
    fn prop_validity_aggregates_after_every_transition(
        init in field_map(),
        actions in prop::collection::vec(any_action(), 0..12),
    ) {
        for (step, state) in run::<PlainBackend>(&init, &actions).iter().enumerate() {
            let form = FormState::from_node::<PlainBackend>(state);
            prop_assert!(
                form.validity_is_consistent(),
                "inconsistent validity after step {}: {:?}",
                step,
                form
            );
        }
    }

    #[test]
    fn prop_touched_is_monotone(
        init in field_map(),
        actions in prop::collection::vec(any_action(), 0..12),
    ) {
        let trace = run::<PlainBackend>(&init, &actions);
        for (i, action) in actions.iter().enumerate() {
            if is_whole_form_transition(action) {
                continue;
            }
            let before = FormState::from_node::<PlainBackend>(&trace[i]);
            let after = FormState::from_node::<PlainBackend>(&trace[i + 1]);
            prop_assert!(
                !before.touched || after.touched,
                "{} cleared form touched",
                action.kind()
            );
            prop_assert!(
                !before.changed || after.changed,
                "{} cleared form changed",
                action.kind()
            );
        }
    }

    #[test]
    fn prop_backends_agree(
        init in field_map(),
        actions in prop::collection::vec(any_action(), 0..12),
    ) {
        let plain = run::<PlainBackend>(&init, &actions);
        let persistent = run::<PersistentBackend>(&init, &actions);
        for (step, (p, q)) in plain.iter().zip(&persistent).enumerate() {
            prop_assert_eq!(
                p,
                &PersistentBackend::to_plain(q),
                "backends diverged at step {}",
                step
            );
        }
    }

    #[test]
    fn prop_reset_field_restores_baseline(
        value in "[a-z]{1,6}",
        edit in "[A-Z]{1,6}",
    ) {
        for (baseline, expected) in [
            (Baseline::Initial, json!(value)),
            (Baseline::Empty, json!("")),
        ] {
            let init: FieldMap = [("a".to_owned(), FieldState::with_value(value.clone()))].into();
            let actions = [
                action::change_field_value(FORM, "a", edit.clone()),
                action::reset_field(FORM, "a", baseline),
            ];
            for state in [
                run::<PlainBackend>(&init, &actions).pop(),
                run::<PersistentBackend>(&init, &actions)
                    .pop()
                    .map(|node| PersistentBackend::to_plain(&node)),
            ] {
                let state = state.expect("non-empty trace");
                let form = FormState::from_node::<PlainBackend>(&state);
                prop_assert_eq!(&form.fields["a"].value, &expected);
            }
        }
    }

    #[test]
    fn prop_extraction_agrees_across_backends(
        kind in prop_oneof![
            Just(FieldKind::Text),
            Just(FieldKind::Radio),
            Just(FieldKind::Checkbox),
            Just(FieldKind::Select),
            Just(FieldKind::Custom),
        ],
        multiple in any::<bool>(),
        option in scalar(),
        group_size in 1usize..4,
        checked in any::<bool>(),
        current in field_value(),
        raw in field_value(),
        as_event in any::<bool>(),
    ) {
        let meta = FieldMeta::new("f", kind)
            .with_option(option)
            .multiple(multiple)
            .group_size(group_size);
        let input: FieldInput = match (kind, as_event) {
            (FieldKind::Radio | FieldKind::Checkbox, _) => InputEvent::checked(checked).into(),
            (_, true) => InputEvent::value(raw).into(),
            (_, false) => raw.into(),
        };

        let plain = extract_value::<PlainBackend>(&input, &meta, Some(&current));
        let persistent = extract_value::<PersistentBackend>(
            &input,
            &meta,
            Some(&PersistentBackend::from_plain(&current)),
        );
        prop_assert_eq!(
            plain.clone(),
            persistent.map(|node| PersistentBackend::to_plain(&node))
        );

        if meta.is_grouped_checkbox() {
            let list = plain.expect("grouped checkbox never fails");
            let items = list.as_array().expect("grouped checkbox yields a list");
            let option = meta.value.clone().expect("option declared");
            prop_assert_eq!(items.contains(&option), checked);
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

fn end_to_end<B: Backend>() {
    let reducer = FormReducer::new("form");
    let init: FieldMap = [("name".to_owned(), FieldState::with_value(""))].into();
    let state = reducer.reduce::<B>(
        FormReducer::initial_state::<B>(),
        &action::form_initialisation("form", init),
    );
    let state = reducer.reduce::<B>(state, &action::change_field_value("form", "name", "ab"));
    let state = reducer.reduce::<B>(
        state,
        &action::set_field_errors("form", "name", ["too short"]),
    );

    let form = FormState::from_node::<B>(&state);
    assert_eq!(form.fields["name"].value, json!("ab"));
    assert!(!form.fields["name"].valid);
    assert!(!form.valid);

    let state = reducer.reduce::<B>(
        state,
        &action::set_field_errors("form", "name", Vec::<String>::new()),
    );
    assert!(FormState::from_node::<B>(&state).valid);
}

#[test]
fn end_to_end_plain() {
    end_to_end::<PlainBackend>();
}

#[test]
fn end_to_end_persistent() {
    end_to_end::<PersistentBackend>();
}

fn checkbox_group<B: Backend>(order: &[i64]) -> B::Node {
    let mut current: Option<B::Node> = None;
    for (registered, option) in order.iter().enumerate() {
        let meta = FieldMeta::checkbox("opt")
            .with_option(*option)
            .group_size(registered + 1);
        let next = extract_value::<B>(&InputEvent::checked(true).into(), &meta, current.as_ref())
            .expect("checkbox extraction");
        current = Some(next);
    }
    current.expect("at least one registration")
}

fn sorted(value: &Value) -> Vec<i64> {
    let mut items: Vec<i64> = value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    items.sort_unstable();
    items
}

#[test]
fn checkbox_group_accumulates_in_any_order() {
    for order in [[1, 2, 3], [3, 1, 2], [2, 3, 1]] {
        let plain = checkbox_group::<PlainBackend>(&order);
        assert_eq!(sorted(&plain), vec![1, 2, 3]);
        let persistent = checkbox_group::<PersistentBackend>(&order);
        assert_eq!(sorted(&PersistentBackend::to_plain(&persistent)), vec![1, 2, 3]);
    }

    let full = checkbox_group::<PlainBackend>(&[1, 2, 3]);
    let meta = FieldMeta::checkbox("opt").with_option(2).group_size(3);
    let next = extract_value::<PlainBackend>(&InputEvent::checked(false).into(), &meta, Some(&full))
        .expect("uncheck");
    assert_eq!(sorted(&next), vec![1, 3]);
}
