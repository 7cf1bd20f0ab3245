//! Fuzz target for request evaluation.
//!
//! Builds a well-shaped system from arbitrary units (including negative
//! and extreme values) and checks that evaluation never panics, never
//! touches its inputs, and only grants into a safe state.

#![no_main]

use arbitrary::Arbitrary;
use bk_common::{ProcessMatrix, Request, ResourceVector};
use bk_core::{analyze_safety, derive_need, evaluate_request};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    processes: u8,
    resources: u8,
    process: u8,
    units: Vec<i64>,
}

fuzz_target!(|input: Input| {
    let p = (input.processes % 8) as usize;
    let r = (input.resources % 5) as usize;
    let mut units = input.units.into_iter().chain(std::iter::repeat(0));
    let mut take = |n: usize| ResourceVector::new(units.by_ref().take(n).collect());

    let available = take(r);
    let allocation = ProcessMatrix::new((0..p).map(|_| take(r)).collect());
    let max = ProcessMatrix::new((0..p).map(|_| take(r)).collect());
    let request = Request::new(input.process as usize, take(r));

    let need = derive_need(&allocation, &max).expect("shapes agree by construction");
    let before = (available.clone(), allocation.clone(), need.clone());

    let result = evaluate_request(&request, &available, &allocation, &need);
    assert_eq!(before, (available, allocation, need));

    if let Ok(outcome) = result {
        if let Some(granted) = outcome.granted() {
            let again = analyze_safety(&granted.available, &granted.allocation, &granted.need)
                .expect("granted state keeps its shape");
            assert!(again.is_safe());
        }
    }
});
