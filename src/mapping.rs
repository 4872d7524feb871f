// Copyright (C) 2025 The padmix authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod store;

pub use store::Store;

/// Target names are matched case-insensitively against this sentinel; a
/// target carrying it levels every active session instead of one process.
pub const ALL_APPLICATIONS: &str = "All Applications";

/// A single application/level pair inside a mapping.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct VolumeTarget {
    /// The process name the level applies to, or the wildcard sentinel.
    #[serde(rename = "applicationName")]
    pub application: String,

    /// The volume level in percent (0-100).
    #[serde(rename = "volumeLevel")]
    pub level: u8,
}

impl VolumeTarget {
    /// Creates a new volume target.
    pub fn new(application: &str, level: u8) -> VolumeTarget {
        VolumeTarget {
            application: application.to_string(),
            level,
        }
    }

    /// Returns true if this target addresses every active session.
    pub fn is_all_applications(&self) -> bool {
        self.application.eq_ignore_ascii_case(ALL_APPLICATIONS)
    }
}

/// A binding from one MIDI note to one or more application volume targets.
/// Target order is insertion order; it is preserved for display and has no
/// semantic effect on application.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MappingEntry {
    /// The primary key, assigned at creation. Save files written by older
    /// builds may omit it; the store assigns a fresh one on load.
    #[serde(default)]
    pub id: Uuid,

    /// The MIDI note number (0-127) that triggers this mapping.
    #[serde(rename = "midiNote")]
    pub note: u8,

    /// The volume targets applied when the note fires.
    #[serde(rename = "settings")]
    pub targets: Vec<VolumeTarget>,
}

/// Typed error for mapping persistence failures so callers can distinguish
/// I/O problems from malformed save files.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("error reading or writing the mappings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed mappings file: {0}")]
    Malformed(#[from] serde_json::Error),
}
