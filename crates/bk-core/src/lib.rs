//! Banker's Algorithm Core Library
//!
//! This library provides the deadlock-avoidance engine and its surroundings:
//! - Need derivation, safety analysis, and request evaluation
//! - A ledger that adopts granted requests in place
//! - Structured logging
//! - Exit codes and output rendering for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod banker;
pub mod exit_codes;
pub mod ledger;
pub mod logging;
pub mod output;

pub use banker::{
    analyze_safety, check_state, derive_need, evaluate_request, GrantedState, RequestResult,
    SafeSequence, SafetyResult,
};
pub use ledger::Ledger;
