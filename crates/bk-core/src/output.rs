//! Output rendering for the CLI.
//!
//! JSON payloads are wrapped in an [`Envelope`] carrying the run ID, a
//! timestamp and the snapshot of the state they were computed against.
//! Markdown and one-line summaries are rendered from the same results.

use bk_common::{ProcessMatrix, ResourceVector};
use bk_config::{PresetInfo, StateSnapshot};
use chrono::Utc;
use serde::Serialize;

use crate::banker::{RequestResult, SafetyResult};

/// Schema version of the JSON envelope.
pub const OUTPUT_SCHEMA_VERSION: &str = "1.0.0";

/// Top-level JSON response for every command.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub schema_version: &'static str,
    pub run_id: String,
    pub generated_at: String,
    pub command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateSnapshot>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(run_id: &str, command: &'static str, payload: T) -> Self {
        Envelope {
            schema_version: OUTPUT_SCHEMA_VERSION,
            run_id: run_id.to_string(),
            generated_at: Utc::now().to_rfc3339(),
            command,
            state: None,
            payload,
        }
    }

    pub fn with_snapshot(mut self, snapshot: &StateSnapshot) -> Self {
        self.state = Some(snapshot.clone());
        self
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Markdown table with one row per process and one column per resource type.
pub fn matrix_table(matrix: &ProcessMatrix, resources: usize) -> String {
    let mut out = String::new();
    out.push_str("| Process |");
    for j in 0..resources {
        out.push_str(&format!(" R{} |", j));
    }
    out.push('\n');
    out.push_str("|---------|");
    for _ in 0..resources {
        out.push_str("----|");
    }
    out.push('\n');
    for (i, row) in matrix.iter().enumerate() {
        out.push_str(&format!("| P{} |", i));
        for value in row.iter() {
            out.push_str(&format!(" {} |", value));
        }
        out.push('\n');
    }
    out
}

fn vector_line(label: &str, vector: &ResourceVector) -> String {
    format!("{}: {}\n", label, vector)
}

pub fn need_markdown(need: &ProcessMatrix, resources: usize) -> String {
    format!("# Need Matrix\n\n{}", matrix_table(need, resources))
}

pub fn need_summary(need: &ProcessMatrix) -> String {
    format!("need: {}", need)
}

pub fn safety_markdown(result: &SafetyResult, need: &ProcessMatrix, resources: usize) -> String {
    let mut out = String::from("# Safety Analysis\n\n");
    match result {
        SafetyResult::Safe { sequence } => {
            out.push_str("Verdict: ✓ Safe\n");
            out.push_str(&format!("Safe sequence: {}\n", sequence));
        }
        SafetyResult::Unsafe => {
            out.push_str("Verdict: ✗ Unsafe\n");
            out.push_str("No ordering lets every process finish.\n");
        }
    }
    out.push_str("\n## Need\n\n");
    out.push_str(&matrix_table(need, resources));
    out
}

pub fn safety_summary(result: &SafetyResult) -> String {
    match result {
        SafetyResult::Safe { sequence } => format!("safe: sequence {}", sequence),
        SafetyResult::Unsafe => "unsafe".to_string(),
    }
}

pub fn request_markdown(result: &RequestResult, process: usize, resources: usize) -> String {
    let mut out = format!("# Request from P{}\n\n", process);
    match result {
        RequestResult::Granted(granted) => {
            out.push_str("Outcome: ✓ Granted\n");
            out.push_str(&format!("Safe sequence: {}\n", granted.sequence));
            out.push_str(&vector_line("Available", &granted.available));
            out.push_str("\n## Allocation\n\n");
            out.push_str(&matrix_table(&granted.allocation, resources));
            out.push_str("\n## Need\n\n");
            out.push_str(&matrix_table(&granted.need, resources));
        }
        denied => {
            out.push_str("Outcome: ✗ Denied\n");
            if let Some(reason) = denied.denial_reason() {
                out.push_str(&format!("Reason: {}\n", reason));
            }
        }
    }
    out
}

pub fn request_summary(result: &RequestResult, process: usize) -> String {
    match result {
        RequestResult::Granted(granted) => format!(
            "P{} granted: available {}, sequence {}",
            process, granted.available, granted.sequence
        ),
        denied => format!(
            "P{} {}: {}",
            process,
            denied.outcome_name(),
            denied.denial_reason().unwrap_or_default()
        ),
    }
}

pub fn presets_markdown(presets: &[PresetInfo]) -> String {
    let mut out = String::from("# Presets\n\n| Name | Shape | Description |\n|------|-------|-------------|\n");
    for preset in presets {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            preset.name, preset.shape, preset.description
        ));
    }
    out
}
