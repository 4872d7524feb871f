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
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{MappingEntry, PersistenceError, VolumeTarget};

const SAVE_FILE: &str = "midi_mappings.json";

/// The on-disk shape of the store: all mappings plus the last used MIDI
/// device ordinal. The timestamp is informational only.
#[derive(Deserialize, Serialize)]
struct SaveFile {
    #[serde(default)]
    mappings: Vec<MappingEntry>,

    #[serde(rename = "saveTimestamp")]
    save_timestamp: Option<DateTime<Local>>,

    #[serde(rename = "selectedMidiDeviceIndex", default)]
    selected_midi_device_index: usize,
}

/// The note to mapping table. Owns every entry by id plus a note index that
/// is kept consistent with the primary map on each mutation; at most one
/// entry owns any given note at a time.
pub struct Store {
    entries: HashMap<Uuid, MappingEntry>,
    note_index: HashMap<u8, Uuid>,
    selected_device_index: usize,
    path: PathBuf,
}

impl Store {
    /// Opens the store at the given path (or the default per-user path),
    /// loading persisted mappings if present and seeding the built-in
    /// defaults otherwise. An unreadable file is logged and replaced by the
    /// defaults; the engine runs unattended and must come up regardless.
    pub fn open(path: Option<PathBuf>) -> Result<Store, PersistenceError> {
        let path = match path {
            Some(path) => path,
            None => default_save_path()?,
        };

        let mut store = Store {
            entries: HashMap::new(),
            note_index: HashMap::new(),
            selected_device_index: 0,
            path,
        };

        match store.load(None) {
            Ok(true) => {}
            Ok(false) => store.seed_defaults(),
            Err(e) => {
                warn!(
                    err = e.to_string(),
                    "Unable to load mappings, starting from the defaults."
                );
                store.seed_defaults();
            }
        }

        Ok(store)
    }

    /// Creates a new mapping for the given note. An existing mapping on the
    /// same note is deleted first. Returns the new entry's id.
    pub fn add(&mut self, note: u8, targets: Vec<VolumeTarget>) -> Uuid {
        self.remove_for_note(note);

        let id = Uuid::new_v4();
        self.entries.insert(id, MappingEntry { id, note, targets });
        self.note_index.insert(note, id);
        id
    }

    /// Updates an existing mapping. A no-op if the id is unknown; callers
    /// check existence through get_by_id first. Moving the mapping onto a
    /// note owned by another entry deletes that entry, mirroring add.
    pub fn update(&mut self, id: Uuid, note: u8, targets: Vec<VolumeTarget>) {
        let old_note = match self.entries.get(&id) {
            Some(entry) => entry.note,
            None => return,
        };

        if old_note != note {
            self.note_index.remove(&old_note);
            self.remove_for_note(note);
            self.note_index.insert(note, id);
        }

        if let Some(entry) = self.entries.get_mut(&id) {
            entry.note = note;
            entry.targets = targets;
        }
    }

    /// Removes the mapping with the given id, releasing its note. Returns
    /// true if an entry existed.
    pub fn remove(&mut self, id: Uuid) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.note_index.remove(&entry.note);
                true
            }
            None => false,
        }
    }

    /// Gets a copy of the mapping bound to the given note.
    pub fn get_by_note(&self, note: u8) -> Option<MappingEntry> {
        self.note_index
            .get(&note)
            .and_then(|id| self.entries.get(id))
            .cloned()
    }

    /// Gets a copy of the mapping with the given id.
    pub fn get_by_id(&self, id: Uuid) -> Option<MappingEntry> {
        self.entries.get(&id).cloned()
    }

    /// Returns copies of all mappings, in no particular note order.
    pub fn list_all(&self) -> Vec<MappingEntry> {
        self.entries.values().cloned().collect()
    }

    /// The ordinal of the last used MIDI input device.
    pub fn selected_device_index(&self) -> usize {
        self.selected_device_index
    }

    pub fn set_selected_device_index(&mut self, index: usize) {
        self.selected_device_index = index;
    }

    /// Serializes all mappings and the selected device index to the given
    /// path, or the store's own path. The target file is overwritten
    /// wholesale.
    pub fn save(&self, path: Option<&Path>) -> Result<(), PersistenceError> {
        let path = path.unwrap_or(&self.path);

        let file = SaveFile {
            mappings: self.list_all(),
            save_timestamp: Some(Local::now()),
            selected_midi_device_index: self.selected_device_index,
        };

        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        info!(
            path = path.display().to_string(),
            count = self.entries.len(),
            device_index = self.selected_device_index,
            "Saved mappings."
        );

        Ok(())
    }

    /// Loads persisted state from the given path, or the store's own path.
    /// Returns false if the file does not exist; fails on malformed content.
    /// A file carrying only a device index is a successful load that leaves
    /// the in-memory mappings untouched. Entries with a nil id are assigned
    /// a fresh one before indexing.
    pub fn load(&mut self, path: Option<&Path>) -> Result<bool, PersistenceError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.path.clone(),
        };

        if !path.exists() {
            info!(path = path.display().to_string(), "Mappings file not found.");
            return Ok(false);
        }

        let file: SaveFile = serde_json::from_str(&fs::read_to_string(&path)?)?;

        self.selected_device_index = file.selected_midi_device_index;

        if file.mappings.is_empty() {
            info!("No mappings in the file, loaded the device index only.");
            return Ok(true);
        }

        self.entries.clear();
        self.note_index.clear();
        for mut entry in file.mappings {
            if entry.id.is_nil() {
                entry.id = Uuid::new_v4();
            }
            self.note_index.insert(entry.note, entry.id);
            self.entries.insert(entry.id, entry);
        }

        info!(
            path = path.display().to_string(),
            count = self.entries.len(),
            device_index = self.selected_device_index,
            "Loaded mappings."
        );

        Ok(true)
    }

    /// Deletes whatever mapping currently owns the note, if any.
    fn remove_for_note(&mut self, note: u8) {
        if let Some(id) = self.note_index.remove(&note) {
            self.entries.remove(&id);
        }
    }

    /// The built-in mappings a fresh store starts from.
    fn seed_defaults(&mut self) {
        self.add(
            36,
            vec![
                VolumeTarget::new("cs2.exe", 20),
                VolumeTarget::new("msedge.exe", 100),
            ],
        );
        self.add(
            37,
            vec![
                VolumeTarget::new("cs2.exe", 100),
                VolumeTarget::new("msedge.exe", 100),
            ],
        );
    }
}

/// The fixed save file under the per-user application data directory,
/// created if absent.
fn default_save_path() -> Result<PathBuf, PersistenceError> {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    let dir = base.join("padmix");
    fs::create_dir_all(&dir)?;
    Ok(dir.join(SAVE_FILE))
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use uuid::Uuid;

    use super::{Store, SAVE_FILE};
    use crate::mapping::{PersistenceError, VolumeTarget};

    fn open_store(path: PathBuf) -> Store {
        Store::open(Some(path)).expect("unable to open store")
    }

    fn targets(pairs: &[(&str, u8)]) -> Vec<VolumeTarget> {
        pairs
            .iter()
            .map(|(application, level)| VolumeTarget::new(application, *level))
            .collect()
    }

    /// Walks the store's mappings and asserts every note is owned by exactly
    /// one entry and every index entry points at a live one.
    fn assert_consistent(store: &Store) {
        let mappings = store.list_all();
        let mut notes: Vec<u8> = mappings.iter().map(|mapping| mapping.note).collect();
        notes.sort_unstable();
        notes.dedup();
        assert_eq!(notes.len(), mappings.len(), "duplicate note in store");

        for mapping in mappings {
            let indexed = store
                .get_by_note(mapping.note)
                .expect("note missing from index");
            assert_eq!(indexed.id, mapping.id);
        }
    }

    #[test]
    fn test_open_seeds_defaults() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let store = open_store(dir.path().join(SAVE_FILE));

        let defaults = store.get_by_note(36).expect("default mapping missing");
        assert_eq!(defaults.targets, targets(&[("cs2.exe", 20), ("msedge.exe", 100)]));
        let defaults = store.get_by_note(37).expect("default mapping missing");
        assert_eq!(defaults.targets, targets(&[("cs2.exe", 100), ("msedge.exe", 100)]));
        assert_eq!(store.selected_device_index(), 0);
        assert_consistent(&store);
    }

    #[test]
    fn test_add_then_get_by_note() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let id = store.add(40, targets(&[("game.exe", 25), ("music.exe", 80)]));
        let entry = store.get_by_note(40).expect("mapping missing");
        assert_eq!(entry.id, id);
        assert_eq!(entry.targets, targets(&[("game.exe", 25), ("music.exe", 80)]));
        assert_eq!(store.get_by_id(id).expect("id missing").note, 40);
        assert_consistent(&store);
    }

    #[test]
    fn test_add_replaces_note_collision() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let first = store.add(40, targets(&[("old.exe", 10)]));
        let second = store.add(40, targets(&[("new.exe", 90)]));

        assert_ne!(first, second);
        assert!(store.get_by_id(first).is_none());
        assert_eq!(
            store.get_by_note(40).expect("mapping missing").targets,
            targets(&[("new.exe", 90)])
        );
        assert_consistent(&store);
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let before = store.list_all().len();
        store.update(Uuid::new_v4(), 50, targets(&[("game.exe", 10)]));
        assert_eq!(store.list_all().len(), before);
        assert!(store.get_by_note(50).is_none());
        assert_consistent(&store);
    }

    #[test]
    fn test_update_moves_note_and_deletes_collision() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let moved = store.add(40, targets(&[("game.exe", 10)]));
        let collided = store.add(41, targets(&[("music.exe", 60)]));

        store.update(moved, 41, targets(&[("game.exe", 15)]));

        assert!(store.get_by_id(collided).is_none());
        let entry = store.get_by_note(41).expect("mapping missing");
        assert_eq!(entry.id, moved);
        assert_eq!(entry.targets, targets(&[("game.exe", 15)]));
        assert!(store.get_by_note(40).is_none());
        assert_consistent(&store);
    }

    #[test]
    fn test_update_same_note_replaces_targets() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let id = store.add(40, targets(&[("game.exe", 10)]));
        store.update(id, 40, targets(&[("game.exe", 55)]));

        assert_eq!(
            store.get_by_note(40).expect("mapping missing").targets,
            targets(&[("game.exe", 55)])
        );
        assert_consistent(&store);
    }

    #[test]
    fn test_remove_releases_note() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let id = store.add(40, targets(&[("game.exe", 10)]));
        assert!(store.remove(id));
        assert!(!store.remove(id));
        assert!(store.get_by_note(40).is_none());

        // The note is free for a new mapping again.
        store.add(40, targets(&[("other.exe", 30)]));
        assert_consistent(&store);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let path = dir.path().join(SAVE_FILE);

        let mut store = open_store(path.clone());
        store.add(40, targets(&[("game.exe", 25)]));
        store.add(41, targets(&[("All Applications", 70)]));
        store.set_selected_device_index(2);
        store.save(None).expect("unable to save");

        let loaded = open_store(path);
        assert_eq!(loaded.selected_device_index(), 2);

        let mut expected: Vec<(u8, Vec<VolumeTarget>)> = store
            .list_all()
            .into_iter()
            .map(|mapping| (mapping.note, mapping.targets))
            .collect();
        let mut actual: Vec<(u8, Vec<VolumeTarget>)> = loaded
            .list_all()
            .into_iter()
            .map(|mapping| (mapping.note, mapping.targets))
            .collect();
        expected.sort_by_key(|(note, _)| *note);
        actual.sort_by_key(|(note, _)| *note);
        assert_eq!(expected, actual);

        // Ids present in the file are preserved.
        for mapping in store.list_all() {
            assert_eq!(
                loaded.get_by_note(mapping.note).expect("mapping missing").id,
                mapping.id
            );
        }
        assert_consistent(&loaded);
    }

    #[test]
    fn test_load_missing_file_returns_false() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let loaded = store
            .load(Some(&dir.path().join("nope.json")))
            .expect("missing file must not error");
        assert!(!loaded);

        // A fresh store stays at its seeded defaults.
        assert!(store.get_by_note(36).is_some());
        assert!(store.get_by_note(37).is_some());
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let path = dir.path().join(SAVE_FILE);
        std::fs::write(&path, "{ not json").expect("unable to write file");

        let mut store = open_store(dir.path().join("other.json"));
        match store.load(Some(&path)) {
            Err(PersistenceError::Malformed(_)) => {}
            other => panic!("expected malformed error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_assigns_missing_ids() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let path = dir.path().join(SAVE_FILE);
        std::fs::write(
            &path,
            r#"{
                "mappings": [
                    { "midiNote": 42, "settings": [ { "applicationName": "game.exe", "volumeLevel": 30 } ] }
                ],
                "selectedMidiDeviceIndex": 1
            }"#,
        )
        .expect("unable to write file");

        let store = open_store(path);
        let entry = store.get_by_note(42).expect("mapping missing");
        assert!(!entry.id.is_nil());
        assert_eq!(store.selected_device_index(), 1);
        assert_consistent(&store);
    }

    #[test]
    fn test_load_device_index_only() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let path = dir.path().join(SAVE_FILE);
        std::fs::write(&path, r#"{ "mappings": [], "selectedMidiDeviceIndex": 3 }"#)
            .expect("unable to write file");

        let mut store = open_store(dir.path().join("other.json"));
        store.add(40, targets(&[("game.exe", 25)]));

        let loaded = store.load(Some(&path)).expect("unable to load");
        assert!(loaded);
        assert_eq!(store.selected_device_index(), 3);
        // Mappings are left alone when the file carries none.
        assert!(store.get_by_note(40).is_some());
    }

    #[test]
    fn test_note_uniqueness_over_mutation_sequences() {
        let dir = tempfile::tempdir().expect("unable to create tempdir");
        let mut store = open_store(dir.path().join(SAVE_FILE));

        let a = store.add(10, targets(&[("a.exe", 10)]));
        let b = store.add(11, targets(&[("b.exe", 20)]));
        let _ = store.add(10, targets(&[("c.exe", 30)]));
        store.update(b, 10, targets(&[("b.exe", 40)]));
        store.remove(a);
        store.add(12, targets(&[("d.exe", 50)]));
        store.update(b, 12, targets(&[("b.exe", 60)]));

        assert_consistent(&store);
        assert_eq!(
            store.get_by_note(12).expect("mapping missing").targets,
            targets(&[("b.exe", 60)])
        );
    }
}
