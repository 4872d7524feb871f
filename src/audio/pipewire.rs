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
use std::{fmt, process::Command};

use serde_json::Value;
use tracing::debug;

use super::{SessionError, SessionHandle};

/// The PipeWire render endpoint, driven through the stock command line tools:
/// `pw-dump` for stream enumeration and `wpctl` for volume writes. A session
/// here is an output stream node carrying an owning process id.
pub struct Endpoint;

impl Endpoint {
    pub fn new() -> Endpoint {
        Endpoint
    }
}

impl super::Endpoint for Endpoint {
    fn sessions(&self) -> Result<Vec<Box<dyn SessionHandle>>, SessionError> {
        let output = Command::new("pw-dump").output()?;
        if !output.status.success() {
            return Err(SessionError::Endpoint(format!(
                "pw-dump exited with {}",
                output.status
            )));
        }

        let objects: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| SessionError::Endpoint(format!("unparseable pw-dump output: {}", e)))?;

        let mut sessions: Vec<Box<dyn SessionHandle>> = Vec::new();
        for object in objects.as_array().into_iter().flatten() {
            let info = match object.get("info") {
                Some(info) => info,
                None => continue,
            };
            let props = match info.get("props") {
                Some(props) => props,
                None => continue,
            };

            if props.get("media.class").and_then(Value::as_str) != Some("Stream/Output/Audio") {
                continue;
            }

            let node_id = match object.get("id").and_then(Value::as_u64) {
                Some(node_id) => node_id as u32,
                None => continue,
            };
            let pid = match props.get("application.process.id").and_then(Value::as_u64) {
                Some(pid) => pid as u32,
                None => {
                    debug!(node_id, "Output stream carries no process id, skipping.");
                    continue;
                }
            };

            sessions.push(Box::new(Session {
                node_id,
                pid,
                volume: node_volume(info),
            }));
        }

        Ok(sessions)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PipeWire (default render endpoint)")
    }
}

/// Reads a node's volume scalar from its Props param. PipeWire reports
/// channelVolumes cubed; wpctl speaks the linear 0.0-1.0 scale this crate
/// uses, so the cube root converts between them.
fn node_volume(info: &Value) -> f32 {
    info.get("params")
        .and_then(|params| params.get("Props"))
        .and_then(Value::as_array)
        .and_then(|props| props.iter().find_map(|prop| prop.get("channelVolumes")))
        .and_then(Value::as_array)
        .and_then(|volumes| volumes.iter().filter_map(Value::as_f64).reduce(f64::max))
        .map(|volume| volume.cbrt() as f32)
        .unwrap_or(1.0)
}

/// One output stream node. The volume value is the one read at enumeration
/// time; writes go straight through to the node.
struct Session {
    node_id: u32,
    pid: u32,
    volume: f32,
}

impl SessionHandle for Session {
    fn process_id(&self) -> u32 {
        self.pid
    }

    fn volume(&self) -> Result<f32, SessionError> {
        Ok(self.volume)
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), SessionError> {
        let status = Command::new("wpctl")
            .arg("set-volume")
            .arg(self.node_id.to_string())
            .arg(format!("{:.2}", volume))
            .status()?;

        if !status.success() {
            return Err(SessionError::Endpoint(format!(
                "wpctl exited with {}",
                status
            )));
        }

        self.volume = volume;
        Ok(())
    }
}
