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
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{Endpoint, ProcessLookup};

/// A point-in-time view of one audio session. Produced fresh on every query;
/// never cached, since sessions appear and disappear as applications start
/// and stop.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub process_id: u32,
    pub process_name: String,
    /// The session's volume scalar (0.0-1.0).
    pub volume: f32,
}

/// Looks up and mutates active audio sessions by process identity. All
/// operations are synchronous and independently fallible; failures are
/// logged and swallowed per call, surfacing at worst as an empty or partial
/// result.
pub struct Directory {
    endpoint: Arc<dyn Endpoint>,
    processes: Arc<dyn ProcessLookup>,
}

impl Directory {
    pub fn new(endpoint: Arc<dyn Endpoint>, processes: Arc<dyn ProcessLookup>) -> Directory {
        Directory {
            endpoint,
            processes,
        }
    }

    /// Enumerates the active sessions, resolving each owning process id to a
    /// name. Sessions whose process has already exited are skipped, not
    /// errored; each handle is released before the next is processed.
    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let sessions = match self.endpoint.sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(err = e.to_string(), "Error enumerating audio sessions.");
                return Vec::new();
            }
        };

        let mut snapshots = Vec::new();
        for session in sessions {
            let process_id = session.process_id();
            let process_name = match self.processes.name_of(process_id) {
                Some(process_name) => process_name,
                None => {
                    debug!(process_id, "Session process has exited, skipping.");
                    continue;
                }
            };

            match session.volume() {
                Ok(volume) => snapshots.push(SessionSnapshot {
                    process_id,
                    process_name,
                    volume,
                }),
                Err(e) => warn!(
                    process_id,
                    err = e.to_string(),
                    "Error reading session volume."
                ),
            }
        }

        snapshots
    }

    /// Sets the volume of every session whose process name matches the given
    /// name, case-insensitively. Multiple processes sharing a name all
    /// receive the update; no matches is a no-op, not an error.
    pub fn set_volume(&self, process_name: &str, percent: u8) {
        let volume = scalar(percent);
        let sessions = match self.endpoint.sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(err = e.to_string(), "Error enumerating audio sessions.");
                return;
            }
        };

        for mut session in sessions {
            let process_id = session.process_id();
            let matches = self
                .processes
                .name_of(process_id)
                .is_some_and(|name| name.eq_ignore_ascii_case(process_name));
            if !matches {
                continue;
            }

            match session.set_volume(volume) {
                Ok(()) => info!(process_name, process_id, percent, "Set session volume."),
                Err(e) => warn!(
                    process_id,
                    err = e.to_string(),
                    "Error setting session volume."
                ),
            }
        }
    }

    /// Sets the volume of every active session unconditionally.
    pub fn set_volume_all(&self, percent: u8) {
        let volume = scalar(percent);
        let sessions = match self.endpoint.sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(err = e.to_string(), "Error enumerating audio sessions.");
                return;
            }
        };

        for mut session in sessions {
            if let Err(e) = session.set_volume(volume) {
                warn!(
                    process_id = session.process_id(),
                    err = e.to_string(),
                    "Error setting session volume."
                );
            }
        }

        info!(percent, "Set volume for all sessions.");
    }

    /// Returns the first matching session's volume scalar, or 0.0 if none
    /// matched or enumeration failed. Callers treat 0.0 as "unknown", not
    /// literally silence.
    pub fn get_volume(&self, process_name: &str) -> f32 {
        let sessions = match self.endpoint.sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                error!(err = e.to_string(), "Error enumerating audio sessions.");
                return 0.0;
            }
        };

        for session in sessions {
            let matches = self
                .processes
                .name_of(session.process_id())
                .is_some_and(|name| name.eq_ignore_ascii_case(process_name));
            if !matches {
                continue;
            }

            match session.volume() {
                Ok(volume) => return volume,
                Err(e) => warn!(
                    process_id = session.process_id(),
                    err = e.to_string(),
                    "Error reading session volume."
                ),
            }
        }

        0.0
    }
}

/// Converts a percent level (0-100) to a volume scalar (0.0-1.0).
fn scalar(percent: u8) -> f32 {
    f32::from(percent.min(100)) / 100.0
}
