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
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use midly::{live::LiveEvent, MidiMessage};
use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, UnboundedSender},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    engine::EngineEvent,
    mapping::Store,
    midi::{Device, DeviceProvider},
    volume::Applier,
};

/// How many raw MIDI events may queue between the device callback and the
/// dispatch task before the callback blocks.
const EVENT_QUEUE_DEPTH: usize = 16;

/// The result of binding the listener to a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// Listening on the named device. `used` differs from `requested` when
    /// the requested ordinal was out of range and the listener fell back to
    /// device 0.
    Listening {
        device: String,
        requested: usize,
        used: usize,
    },
    /// No input devices are available; the listener stays idle.
    NoDevices,
}

/// Owns the single active MIDI input subscription and dispatches note-on
/// events through the mapping store to the volume applier. Raw note-ons are
/// re-emitted to observers so learn workflows see presses even when no
/// mapping exists yet.
pub struct Listener {
    devices: Arc<dyn DeviceProvider>,
    store: Arc<Mutex<Store>>,
    applier: Applier,
    events: UnboundedSender<EngineEvent>,
    /// Bumped on every start and stop. Dispatch tasks drop events tagged
    /// with a stale generation, so a switched-away device can never apply
    /// volumes after its unsubscribe.
    generation: Arc<AtomicU64>,
    active: Mutex<Option<Subscription>>,
}

struct Subscription {
    device: Arc<dyn Device>,
    task: JoinHandle<()>,
}

impl Listener {
    pub fn new(
        devices: Arc<dyn DeviceProvider>,
        store: Arc<Mutex<Store>>,
        applier: Applier,
        events: UnboundedSender<EngineEvent>,
    ) -> Listener {
        Listener {
            devices,
            store,
            applier,
            events,
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    /// Starts listening on the device with the given ordinal. Any previous
    /// subscription is fully released first; never two devices at once. An
    /// out of range ordinal falls back to device 0.
    pub fn start(&self, device_index: usize) -> Result<StartOutcome, Box<dyn Error>> {
        self.stop();

        let devices = self.devices.list_inputs()?;
        if devices.is_empty() {
            warn!("No MIDI input devices available.");
            return Ok(StartOutcome::NoDevices);
        }

        let used = if device_index >= devices.len() {
            warn!(
                requested = device_index,
                available = devices.len(),
                "Device index out of range, using device 0."
            );
            0
        } else {
            device_index
        };
        let device = devices[used].clone();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let (events_tx, mut events_rx) = mpsc::channel::<Vec<u8>>(EVENT_QUEUE_DEPTH);
        device.watch_events(events_tx)?;

        info!(device = device.name(), "Listening for MIDI events.");

        let store = self.store.clone();
        let applier = self.applier.clone();
        let notify = self.events.clone();
        let current = self.generation.clone();
        let task = tokio::spawn(async move {
            while let Some(raw_event) = events_rx.recv().await {
                // A switched-away subscription may still have events in
                // flight; they belong to the old device and are dropped.
                if current.load(Ordering::SeqCst) != generation {
                    debug!("Dropping event from a stale subscription.");
                    break;
                }
                dispatch(&raw_event, &store, &applier, &notify);
            }
        });

        let outcome = StartOutcome::Listening {
            device: device.name(),
            requested: device_index,
            used,
        };
        *self.active.lock() = Some(Subscription { device, task });

        Ok(outcome)
    }

    /// Stops listening and releases the device. Idempotent; a no-op while
    /// idle.
    pub fn stop(&self) {
        let subscription = self.active.lock().take();
        if let Some(subscription) = subscription {
            self.generation.fetch_add(1, Ordering::SeqCst);
            subscription.device.stop_watch_events();
            subscription.task.abort();
            info!(
                device = subscription.device.name(),
                "Stopped listening for MIDI events."
            );
        }
    }

    /// Returns true while a device subscription is active.
    pub fn is_listening(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handles one raw MIDI event: re-emits note-ons for learn workflows and
/// applies the mapped volume settings for note-ons with non-zero velocity.
fn dispatch(
    raw_event: &[u8],
    store: &Arc<Mutex<Store>>,
    applier: &Applier,
    notify: &UnboundedSender<EngineEvent>,
) {
    let event = match LiveEvent::parse(raw_event) {
        Ok(event) => event,
        Err(e) => {
            error!(err = format!("{:?}", e), "Error parsing MIDI event.");
            return;
        }
    };

    let message = match event {
        LiveEvent::Midi { message, .. } => message,
        _ => return,
    };

    match message {
        MidiMessage::NoteOn { key, vel } => {
            let note = key.as_int();
            let velocity = vel.as_int();
            debug!(note, velocity, "MIDI note on.");

            // Learn workflows observe every press, mapped or not.
            let _ = notify.send(EngineEvent::NoteReceived { note, velocity });

            if velocity == 0 {
                return;
            }

            // Copy the mapping out so the store lock never spans a volume
            // application.
            let mapping = store.lock().get_by_note(note);
            match mapping {
                Some(mapping) => {
                    info!(
                        note,
                        targets = mapping.targets.len(),
                        "Applying volume settings for note."
                    );
                    applier.apply(&mapping.targets);
                }
                // A press on an unmapped pad is a normal outcome.
                None => debug!(note, "No mapping for note."),
            }
        }
        MidiMessage::Controller { controller, value } => {
            // Observed for future knob/slider support; not dispatched.
            debug!(
                controller = controller.as_int(),
                value = value.as_int(),
                "MIDI control change."
            );
        }
        _ => {}
    }
}
