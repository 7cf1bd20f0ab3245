//! Built-in states for demos and smoke tests.
//!
//! - Textbook: the classic five-process, three-resource safe instance
//! - Deadlocked: three processes in a circular wait with nothing free
//! - Idle: a zero-filled 3x3 system

use bk_common::{ProcessMatrix, ResourceVector, Shape};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shape::SystemShape;
use crate::state::StateFile;

/// Available state presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Five processes, three resource types, known safe.
    Textbook,
    /// Circular wait with no free units, unsafe.
    Deadlocked,
    /// Zero-filled 3x3 system.
    Idle,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] =
        &[PresetName::Textbook, PresetName::Deadlocked, PresetName::Idle];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Textbook => "textbook",
            PresetName::Deadlocked => "deadlocked",
            PresetName::Idle => "idle",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "textbook" | "classic" | "silberschatz" => Some(PresetName::Textbook),
            "deadlocked" | "deadlock" | "unsafe" => Some(PresetName::Deadlocked),
            "idle" | "empty" | "zero" => Some(PresetName::Idle),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Textbook => {
                "Classic 5-process, 3-resource instance; safe with sequence [1, 3, 4, 0, 2]"
            }
            PresetName::Deadlocked => {
                "Three processes each waiting on a unit another holds; nothing available"
            }
            PresetName::Idle => "Zero-filled 3x3 system; trivially safe",
        }
    }

    fn names() -> String {
        PresetName::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = bk_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| bk_common::Error::UnknownPreset {
            name: s.to_string(),
            available: PresetName::names(),
        })
    }
}

/// Summary of a preset for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: String,
    pub shape: Shape,
}

/// Get the state for a preset.
pub fn get_preset(name: PresetName) -> StateFile {
    match name {
        PresetName::Textbook => textbook_preset(),
        PresetName::Deadlocked => deadlocked_preset(),
        PresetName::Idle => idle_preset(),
    }
}

/// List every preset with its description and shape.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|name| PresetInfo {
            name: *name,
            description: name.description().to_string(),
            shape: get_preset(*name).shape(),
        })
        .collect()
}

/// Textbook preset.
///
/// Need works out to `[[7,4,3],[1,2,2],[6,0,0],[0,1,1],[4,3,1]]`; with
/// ascending-index passes the safe sequence is `[1, 3, 4, 0, 2]`.
fn textbook_preset() -> StateFile {
    StateFile::new(
        ResourceVector::from([3, 3, 2]),
        ProcessMatrix::from_rows(vec![[0, 1, 0], [2, 0, 0], [3, 0, 2], [2, 1, 1], [0, 0, 2]]),
        ProcessMatrix::from_rows(vec![[7, 5, 3], [3, 2, 2], [9, 0, 2], [2, 2, 2], [4, 3, 3]]),
    )
    .with_total(ResourceVector::from([10, 5, 7]))
    .with_description(PresetName::Textbook.description())
}

/// Deadlocked preset: process i holds one unit of type i and needs one unit
/// of type (i + 1) mod 3.
fn deadlocked_preset() -> StateFile {
    StateFile::new(
        ResourceVector::from([0, 0, 0]),
        ProcessMatrix::from_rows(vec![[1, 0, 0], [0, 1, 0], [0, 0, 1]]),
        ProcessMatrix::from_rows(vec![[1, 1, 0], [0, 1, 1], [1, 0, 1]]),
    )
    .with_total(ResourceVector::from([1, 1, 1]))
    .with_description(PresetName::Deadlocked.description())
}

fn idle_preset() -> StateFile {
    SystemShape::new(3, 3)
        .zeroed_state()
        .with_total(ResourceVector::zeroed(3))
        .with_description(PresetName::Idle.description())
}
