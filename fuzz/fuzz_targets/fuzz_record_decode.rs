//! Fuzz transition-record decoding from untrusted JSON.
//!
//! Decoding must never panic, and any record that decodes must survive being
//! reduced and re-encoded.

#![no_main]

use formbind_core::{Action, FormReducer, PlainBackend};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(record) = Action::from_record(value) else {
        return;
    };
    let reducer = FormReducer::new(record.form_name().unwrap_or("fuzz"));
    let _ = reducer.reduce::<PlainBackend>(FormReducer::initial_state::<PlainBackend>(), &record);
    assert!(record.to_record().is_ok());
});
