//! Error types for the banker's algorithm workspace.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! Only malformed input is an error. A state that turns out to be unsafe, or a
//! request that gets denied, is an ordinary outcome and never surfaces here.
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Dimension Mismatch
//!   Reason: dimension mismatch in allocation: expected 5x3 matrix, found 4 rows
//!   Fix: Make available, allocation and max agree on process and resource counts.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "shape",
//!   "message": "dimension mismatch in allocation: expected 5x3 matrix, found 4 rows",
//!   "recoverable": true,
//!   "suggested_action": "fix_input",
//!   "context": { "operand": "allocation" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for banker operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// State file, preset, and shape configuration errors.
    Config,
    /// Vectors and matrices that disagree in shape.
    Shape,
    /// Malformed resource requests.
    Request,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Shape => write!(f, "shape"),
            ErrorCategory::Request => write!(f, "request"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for agents to take in response to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Correct the offending input and call again.
    FixInput,
    /// Run the validate command against the state file.
    RunValidate,
    /// Start over from a zero-filled or preset state.
    ResetState,
    /// Retry the operation.
    Retry,
    /// Abort the operation.
    Abort,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::RunValidate => write!(f, "run_validate"),
            SuggestedAction::ResetState => write!(f, "reset_state"),
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Abort => write!(f, "abort"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown preset '{name}' (available: {available})")]
    UnknownPreset { name: String, available: String },

    // Shape errors (20-29)
    #[error("dimension mismatch in {operand}: expected {expected}, found {found}")]
    DimensionMismatch {
        operand: String,
        expected: String,
        found: String,
    },

    #[error("process index {index} out of range for {process_count} processes")]
    InvalidProcessIndex { index: usize, process_count: usize },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Shape and request errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidState(_) => 11,
            Error::UnknownPreset { .. } => 12,
            Error::DimensionMismatch { .. } => 20,
            Error::InvalidProcessIndex { .. } => 21,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidState(_) | Error::UnknownPreset { .. } => {
                ErrorCategory::Config
            }
            Error::DimensionMismatch { .. } => ErrorCategory::Shape,
            Error::InvalidProcessIndex { .. } => ErrorCategory::Request,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Shape and index errors are fatal to the call that raised them, but the
    /// caller can recover by correcting the input; nothing was changed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidState(_) => true,
            Error::UnknownPreset { .. } => true,
            Error::DimensionMismatch { .. } => true,
            Error::InvalidProcessIndex { .. } => true,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns the suggested action for agents.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunValidate,
            Error::InvalidState(_) => SuggestedAction::RunValidate,
            Error::UnknownPreset { .. } => SuggestedAction::FixInput,
            Error::DimensionMismatch { .. } => SuggestedAction::FixInput,
            Error::InvalidProcessIndex { .. } => SuggestedAction::FixInput,
            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Check the command-line options and environment variables.",
            Error::InvalidState(_) => {
                "Run 'banker validate' on the state file, or start over with 'banker init'."
            }
            Error::UnknownPreset { .. } => "List the built-in states with 'banker presets'.",
            Error::DimensionMismatch { .. } => {
                "Make available, allocation and max agree on process and resource counts."
            }
            Error::InvalidProcessIndex { .. } => {
                "Process indices start at 0; pick an index below the process count."
            }
            Error::Io(_) => "Check that the state file exists and is readable.",
            Error::Json(_) => {
                "Invalid JSON in state file. Check syntax with 'jq . <file>' or regenerate it."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidState(_) => "Invalid State",
            Error::UnknownPreset { .. } => "Unknown Preset",
            Error::DimensionMismatch { .. } => "Dimension Mismatch",
            Error::InvalidProcessIndex { .. } => "Invalid Process Index",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Suggested action for agents.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., operand, index).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::DimensionMismatch {
                operand,
                expected,
                found,
            } => {
                context.insert("operand".to_string(), serde_json::json!(operand));
                context.insert("expected".to_string(), serde_json::json!(expected));
                context.insert("found".to_string(), serde_json::json!(found));
            }
            Error::InvalidProcessIndex {
                index,
                process_count,
            } => {
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("process_count".to_string(), serde_json::json!(process_count));
            }
            Error::UnknownPreset { name, .. } => {
                context.insert("preset".to_string(), serde_json::json!(name));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }

    /// Serialize to pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.to_json())
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
