//! Exit codes for the banker CLI.
//!
//! Exit codes communicate the verdict without requiring output parsing, so
//! `banker check --format exitcode` works as a shell predicate.
//!
//! Exit code ranges:
//! - 0-2: Operational outcomes (safe, unsafe, denied are all answers)
//! - 10-19: User/input errors (recoverable by fixing the input)
//! - 20-29: Internal and I/O errors

use bk_common::Error;

use crate::banker::{RequestResult, SafetyResult};

/// Exit codes for banker operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-2)
    // ========================================================================
    /// Success: state is safe, request granted, or command completed
    Clean = 0,

    /// State is unsafe
    Unsafe = 1,

    /// Request denied (exceeds need, exceeds available, or unsafe)
    RequestDenied = 2,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments or malformed request
    ArgsError = 10,

    /// State file failed parsing or validation
    StateError = 11,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Only `Clean` is success; unsafe and denied are answers, not successes.
    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Check if this exit code is an operational outcome (codes 0-9).
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }

    /// Check if this exit code is a user/input error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        let code = self as i32;
        (10..20).contains(&code)
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        let code = self as i32;
        code >= 20
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Unsafe => "OK_UNSAFE",
            ExitCode::RequestDenied => "OK_DENIED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::StateError => "ERR_STATE",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }

    /// Map an error to the exit code the CLI reports for it.
    pub fn from_error(err: &Error) -> ExitCode {
        match err {
            Error::Config(_) | Error::UnknownPreset { .. } => ExitCode::ArgsError,
            Error::DimensionMismatch { .. } | Error::InvalidProcessIndex { .. } => {
                ExitCode::ArgsError
            }
            Error::InvalidState(_) | Error::Json(_) => ExitCode::StateError,
            Error::Io(_) => ExitCode::IoError,
        }
    }

    pub fn from_safety(result: &SafetyResult) -> ExitCode {
        if result.is_safe() {
            ExitCode::Clean
        } else {
            ExitCode::Unsafe
        }
    }

    pub fn from_request(result: &RequestResult) -> ExitCode {
        if result.is_granted() {
            ExitCode::Clean
        } else {
            ExitCode::RequestDenied
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
