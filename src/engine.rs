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
use std::{error::Error, path::PathBuf, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

use crate::{
    audio::{Directory, Endpoint, ProcessLookup, SessionSnapshot},
    listener::{Listener, StartOutcome},
    mapping::{MappingEntry, PersistenceError, Store, VolumeTarget},
    midi::DeviceProvider,
    volume::Applier,
};

/// Notifications from the engine's background contexts. Consumers drain
/// these on their own schedule; the engine never calls into observers from
/// the MIDI delivery context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    /// A note-on arrived on the listened device, at any velocity. Drives
    /// learn workflows, which want presses even for unmapped notes.
    NoteReceived { note: u8, velocity: u8 },

    /// A mapping's targets were applied.
    VolumeChanged,
}

/// The volume mapping engine: the mapping store, the session directory, the
/// volume applier and the MIDI listener, wired once at construction. The
/// engine owns the load-once/save-on-exit lifecycle of the persisted state.
pub struct Engine {
    store: Arc<Mutex<Store>>,
    directory: Arc<Directory>,
    applier: Applier,
    listener: Listener,
}

impl Engine {
    /// Builds an engine around the given collaborators. The mapping store
    /// loads from the given path (or the per-user default), seeding the
    /// built-in defaults when nothing usable is on disk. Returns the engine
    /// and the notification stream it feeds.
    pub fn new(
        devices: Arc<dyn DeviceProvider>,
        endpoint: Arc<dyn Endpoint>,
        processes: Arc<dyn ProcessLookup>,
        store_path: Option<PathBuf>,
    ) -> Result<(Engine, UnboundedReceiver<EngineEvent>), PersistenceError> {
        let store = Arc::new(Mutex::new(Store::open(store_path)?));
        let directory = Arc::new(Directory::new(endpoint, processes));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let applier = Applier::new(directory.clone(), events_tx.clone());
        let listener = Listener::new(devices, store.clone(), applier.clone(), events_tx);

        Ok((
            Engine {
                store,
                directory,
                applier,
                listener,
            },
            events_rx,
        ))
    }

    /// Starts listening on the given device ordinal, or on the persisted one
    /// when no override is given. The override becomes the persisted ordinal.
    pub fn start(&self, device_index: Option<usize>) -> Result<StartOutcome, Box<dyn Error>> {
        let index = match device_index {
            Some(index) => {
                self.store.lock().set_selected_device_index(index);
                index
            }
            None => self.store.lock().selected_device_index(),
        };

        self.listener.start(index)
    }

    /// Switches the listened device. The prior subscription is fully
    /// released before the new device is bound.
    pub fn switch_device(&self, device_index: usize) -> Result<StartOutcome, Box<dyn Error>> {
        self.store.lock().set_selected_device_index(device_index);
        self.listener.start(device_index)
    }

    /// Stops listening. Idempotent.
    pub fn stop(&self) {
        self.listener.stop();
    }

    /// Returns true while a MIDI device subscription is active.
    pub fn is_listening(&self) -> bool {
        self.listener.is_listening()
    }

    /// Copies of all mappings, for display.
    pub fn mappings(&self) -> Vec<MappingEntry> {
        self.store.lock().list_all()
    }

    pub fn mapping_for_note(&self, note: u8) -> Option<MappingEntry> {
        self.store.lock().get_by_note(note)
    }

    pub fn mapping_by_id(&self, id: Uuid) -> Option<MappingEntry> {
        self.store.lock().get_by_id(id)
    }

    /// Creates a mapping, replacing any existing mapping on the note.
    pub fn add_mapping(&self, note: u8, targets: Vec<VolumeTarget>) -> Uuid {
        self.store.lock().add(note, targets)
    }

    pub fn update_mapping(&self, id: Uuid, note: u8, targets: Vec<VolumeTarget>) {
        self.store.lock().update(id, note, targets);
    }

    pub fn remove_mapping(&self, id: Uuid) -> bool {
        self.store.lock().remove(id)
    }

    /// A fresh snapshot of the active audio sessions.
    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        self.directory.snapshots()
    }

    /// Applies a set of volume targets immediately, outside of any mapping.
    /// Emits the same VolumeChanged notification a dispatched mapping does.
    pub fn apply(&self, targets: &[VolumeTarget]) {
        self.applier.apply(targets);
    }

    /// Flushes the store to disk.
    pub fn save(&self) -> Result<(), PersistenceError> {
        self.store.lock().save(None)
    }

    /// Releases the device subscription and flushes the store; called on
    /// normal process shutdown.
    pub fn shutdown(&self) -> Result<(), PersistenceError> {
        self.listener.stop();
        self.save()
    }
}
