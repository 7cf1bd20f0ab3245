//! Deadlock-avoidance engine.
//!
//! Three pure functions over caller-owned snapshots:
//! - [`derive_need`]: remaining demand, `max - allocation`
//! - [`analyze_safety`]: greedy search for a safe completion order
//! - [`evaluate_request`]: bound checks, provisional grant, safety check
//!
//! None of them keeps state between calls or mutates its arguments. A
//! granted request comes back as a new snapshot for the caller to adopt.

pub mod need;
pub mod request;
pub mod safety;

pub use need::derive_need;
pub use request::{evaluate_request, GrantedState, RequestResult};
pub use safety::{analyze_safety, check_state, SafeSequence, SafetyResult};
