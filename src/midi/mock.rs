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
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Barrier, Mutex,
    },
};

use tokio::{sync::mpsc::Sender, task::JoinHandle};

/// A mock MIDI input device. Tests inject events with mock_event, which
/// blocks until the watcher thread has forwarded them.
#[derive(Clone)]
pub struct Device {
    name: String,
    barrier: Arc<Barrier>,
    closed: Arc<AtomicBool>,
    event: Arc<Mutex<Vec<u8>>>,
    event_thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            barrier: Arc::new(Barrier::new(2)),
            closed: Arc::new(AtomicBool::new(false)),
            event: Arc::new(Mutex::new(Vec::new())),
            event_thread: Arc::new(Mutex::new(None)),
        }
    }

    /// Sends the mock event through to the sender.
    pub fn mock_event(&self, event: &[u8]) {
        {
            let mut mutex_event = self.event.lock().expect("unable to get event lock");
            *mutex_event = event.to_vec();
        }
        // Wait until the thread goes to receive the event.
        self.barrier.wait();
        // Wait until the thread has forwarded it.
        self.barrier.wait();
    }

    /// Returns true while the device has an active watcher.
    pub fn is_watching(&self) -> bool {
        self.event_thread
            .lock()
            .expect("unable to get lock")
            .is_some()
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>> {
        let mut event_thread = self.event_thread.lock().expect("unable to get lock");
        if event_thread.is_some() {
            return Err("Already watching events.".into());
        }

        // The device is reusable across watch/stop cycles.
        self.closed.store(false, Ordering::Relaxed);

        let barrier = self.barrier.clone();
        let event = self.event.clone();
        let closed = self.closed.clone();
        *event_thread = Some(tokio::task::spawn_blocking(move || loop {
            barrier.wait();

            {
                if closed.load(Ordering::Relaxed) {
                    return;
                }
                let event = event.lock().expect("unable to get event lock");
                sender
                    .blocking_send(event.to_vec())
                    .expect("error sending event");
            }
            barrier.wait();
        }));

        Ok(())
    }

    /// Stops watching events. A no-op when no watcher is active, so repeated
    /// disposal is safe.
    fn stop_watch_events(&self) {
        let taken = self.event_thread.lock().expect("unable to get lock").take();
        if taken.is_none() {
            return;
        }

        self.closed.store(true, Ordering::Relaxed);
        // Wait for the watcher thread to move to its next loop iteration and
        // observe the close.
        self.barrier.wait();
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

/// A device provider serving a fixed list of mock devices.
pub struct Provider {
    devices: Vec<Arc<dyn super::Device>>,
}

impl Provider {
    pub fn new(devices: Vec<Device>) -> Provider {
        Provider {
            devices: devices
                .into_iter()
                .map(|device| {
                    let device: Arc<dyn super::Device> = Arc::new(device);
                    device
                })
                .collect(),
        }
    }
}

impl super::DeviceProvider for Provider {
    fn list_inputs(&self) -> Result<Vec<Arc<dyn super::Device>>, Box<dyn Error>> {
        Ok(self.devices.clone())
    }
}
