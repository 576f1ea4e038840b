//! Fuzz arbitrary transition sequences through both backends.
//!
//! Checks that form validity always agrees with field errors and that the
//! plain and persistent backends never diverge.

#![no_main]

use arbitrary::Arbitrary;
use formbind_core::{
    Action, Backend, Baseline, FieldMap, FieldState, FormReducer, FormState, PersistentBackend,
    PlainBackend, action,
};
use libfuzzer_sys::fuzz_target;

const FORM: &str = "fuzz";
const NAMES: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Arbitrary, Debug)]
enum Op {
    Init(Vec<(u8, bool)>),
    Update(Vec<(u8, bool)>),
    Change(u8, i32),
    Errors(u8, Vec<bool>),
    Touch(u8, bool),
    Disable(u8, bool),
    Hide(u8, bool),
    Remove(u8),
    ResetField(u8, bool),
    ResetForm(bool),
    Submitting(bool),
    Foreign(u8),
}

fn name(index: u8) -> &'static str {
    NAMES[usize::from(index) % NAMES.len()]
}

fn baseline(initial: bool) -> Baseline {
    if initial { Baseline::Initial } else { Baseline::Empty }
}

fn fields(entries: &[(u8, bool)]) -> FieldMap {
    entries
        .iter()
        .map(|(index, failing)| {
            let field = FieldState::with_value(i64::from(*index));
            let field = if *failing { field.errors(["bad"]) } else { field };
            (name(*index).to_owned(), field)
        })
        .collect()
}

fn record(op: &Op) -> Action {
    match op {
        Op::Init(entries) => action::form_initialisation(FORM, fields(entries)),
        Op::Update(entries) => action::update_form(FORM, fields(entries)),
        Op::Change(index, value) => action::change_field_value(FORM, name(*index), *value),
        Op::Errors(index, flags) => action::set_field_errors(
            FORM,
            name(*index),
            flags.iter().take(4).map(|flag| if *flag { "x" } else { "y" }),
        ),
        Op::Touch(index, on) => action::set_field_touched(FORM, name(*index), *on),
        Op::Disable(index, on) => action::set_fields_disabled(FORM, [(name(*index), *on)]),
        Op::Hide(index, on) => action::set_field_hidden(FORM, name(*index), *on),
        Op::Remove(index) => action::remove_field(FORM, name(*index)),
        Op::ResetField(index, initial) => {
            action::reset_field(FORM, name(*index), baseline(*initial))
        }
        Op::ResetForm(initial) => action::reset_form(FORM, baseline(*initial)),
        Op::Submitting(on) => action::set_form_submitting(FORM, *on),
        Op::Foreign(index) => action::remove_field("elsewhere", name(*index)),
    }
}

fn run<B: Backend>(records: &[Action]) -> FormState {
    let reducer = FormReducer::new(FORM);
    let state = records
        .iter()
        .fold(FormReducer::initial_state::<B>(), |state, record| {
            let next = reducer.reduce::<B>(state, record);
            assert!(FormState::from_node::<B>(&next).validity_is_consistent());
            next
        });
    FormState::from_node::<B>(&state)
}

fuzz_target!(|ops: Vec<Op>| {
    let records: Vec<Action> = ops.iter().take(64).map(record).collect();
    let plain = run::<PlainBackend>(&records);
    let persistent = run::<PersistentBackend>(&records);
    assert_eq!(plain, persistent);
});
