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
use std::{
    error::Error,
    fmt, mem,
    sync::{Arc, Mutex},
};

use midir::{MidiInput, MidiInputConnection, MidiInputPort};
use tokio::sync::mpsc::Sender;
use tracing::{error, info, span, Level};

pub struct Device {
    name: String,
    input_port: MidiInputPort,
    event_connection: Mutex<Option<MidiInputConnection<()>>>,
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "watch events (midir)");
        let _enter = span.enter();

        let mut event_connection = self.event_connection.lock().expect("unable to get lock");
        if event_connection.is_some() {
            return Err("Already watching events.".into());
        }

        info!(device = self.name, "Watching MIDI events.");

        let input = MidiInput::new("padmix input")?;
        *event_connection = Some(input.connect(
            &self.input_port,
            "padmix input watcher",
            move |_, raw_event, _| {
                if let Err(e) = sender.blocking_send(Vec::from(raw_event)) {
                    error!(
                        err = format!("{:?}", e),
                        "Error sending MIDI event to receiver."
                    );
                }
            },
            (),
        )?);

        Ok(())
    }

    fn stop_watch_events(&self) {
        // Explicitly drop the connection.
        let event_connection = self
            .event_connection
            .lock()
            .expect("error getting mutex")
            .take();

        mem::drop(event_connection);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Input)", self.name)
    }
}

/// Lists midir input devices in port order and produces the Device trait.
/// The position in this list is the ordinal the rest of the engine uses.
pub fn list() -> Result<Vec<Arc<dyn super::Device>>, Box<dyn Error>> {
    let input = MidiInput::new("padmix input listing")?;

    let mut devices: Vec<Arc<dyn super::Device>> = Vec::new();
    for port in input.ports() {
        let name = input.port_name(&port)?;
        devices.push(Arc::new(Device {
            name,
            input_port: port,
            event_connection: Mutex::new(None),
        }));
    }

    Ok(devices)
}
