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
use std::{fmt, sync::Arc};

pub mod directory;
pub mod mock;
pub mod pipewire;
pub mod process;

pub use directory::{Directory, SessionSnapshot};

/// Typed error for audio endpoint and session access failures. Enumeration
/// races against process exit, so these are logged and degraded per call,
/// never treated as fatal.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("error talking to the audio endpoint: {0}")]
    Endpoint(String),

    #[error("error running endpoint command: {0}")]
    Io(#[from] std::io::Error),
}

/// A live audio session on the default render endpoint. The handle owns any
/// underlying resources; dropping it releases them.
pub trait SessionHandle {
    /// The id of the process that owns the session.
    fn process_id(&self) -> u32;

    /// Reads the session's volume scalar (0.0-1.0).
    fn volume(&self) -> Result<f32, SessionError>;

    /// Writes the session's volume scalar (0.0-1.0).
    fn set_volume(&mut self, volume: f32) -> Result<(), SessionError>;
}

/// The system's default render endpoint. Sessions are enumerated fresh on
/// every call: the session set changes whenever applications start or stop,
/// so handles must never be cached across calls.
pub trait Endpoint: fmt::Display + Send + Sync {
    /// Enumerates the currently active output sessions.
    fn sessions(&self) -> Result<Vec<Box<dyn SessionHandle>>, SessionError>;
}

/// Resolves process ids to process names.
pub trait ProcessLookup: Send + Sync {
    /// Returns the name for the given pid, or None once the process has
    /// exited.
    fn name_of(&self, pid: u32) -> Option<String>;
}

/// Gets the endpoint for the running system.
pub fn default_endpoint() -> Arc<dyn Endpoint> {
    Arc::new(pipewire::Endpoint::new())
}
