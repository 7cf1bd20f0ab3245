//! Fuzz target for state.json parsing and validation.
//!
//! Arbitrary bytes must never panic the parser or the validator, and any
//! state that validates must be analyzable without error.

#![no_main]

use bk_config::{validate_state, StateFile};
use bk_core::check_state;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(state) = serde_json::from_slice::<StateFile>(data) else {
        return;
    };
    if validate_state(&state).is_err() {
        return;
    }
    check_state(&state.available, &state.allocation, &state.max)
        .expect("a validated state is always well-shaped");
});
