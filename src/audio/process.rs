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
use std::collections::HashMap;

use super::ProcessLookup;

/// Resolves pids against the running system.
pub struct SystemProcesses;

impl ProcessLookup for SystemProcesses {
    #[cfg(target_os = "linux")]
    fn name_of(&self, pid: u32) -> Option<String> {
        let comm = std::fs::read_to_string(format!("/proc/{}/comm", pid)).ok()?;
        let name = comm.trim();
        if name.is_empty() {
            return None;
        }
        Some(name.to_string())
    }

    #[cfg(not(target_os = "linux"))]
    fn name_of(&self, _pid: u32) -> Option<String> {
        None
    }
}

/// A fixed pid to name table for tests and demos.
pub struct StaticProcesses {
    names: HashMap<u32, String>,
}

impl StaticProcesses {
    pub fn new(entries: &[(u32, &str)]) -> StaticProcesses {
        StaticProcesses {
            names: entries
                .iter()
                .map(|(pid, name)| (*pid, name.to_string()))
                .collect(),
        }
    }
}

impl ProcessLookup for StaticProcesses {
    fn name_of(&self, pid: u32) -> Option<String> {
        self.names.get(&pid).cloned()
    }
}
