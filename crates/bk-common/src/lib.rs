//! Banker's algorithm common types and errors.
//!
//! This crate provides foundational types shared across the bk-* crates:
//! - Resource vectors and per-process matrices with value semantics
//! - Resource requests
//! - Common error types with stable codes
//! - Output format definitions

pub mod error;
pub mod output;
pub mod resources;

pub use error::{Error, Result};
pub use output::OutputFormat;
pub use resources::{ProcessMatrix, Request, ResourceVector, Shape, Units};
