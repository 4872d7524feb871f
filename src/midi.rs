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
use std::{error::Error, fmt, sync::Arc};

use tokio::sync::mpsc::Sender;

pub mod midir;
pub mod mock;

/// A MIDI input device that can be watched for events.
pub trait Device: fmt::Display + Send + Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for events and sends the raw bytes to the given
    /// sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>>;

    /// Stops watching events and releases the underlying connection.
    /// Idempotent.
    fn stop_watch_events(&self);
}

/// Enumerates the MIDI input devices available for listening. Device
/// ordinals are positions in the returned list.
pub trait DeviceProvider: Send + Sync {
    fn list_inputs(&self) -> Result<Vec<Arc<dyn Device>>, Box<dyn Error>>;
}

/// The system device provider, backed by midir.
pub struct SystemDevices;

impl DeviceProvider for SystemDevices {
    fn list_inputs(&self) -> Result<Vec<Arc<dyn Device>>, Box<dyn Error>> {
        midir::list()
    }
}

/// Lists the input devices known to midir.
pub fn list_devices() -> Result<Vec<Arc<dyn Device>>, Box<dyn Error>> {
    midir::list()
}
