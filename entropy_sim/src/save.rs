// Save/load boundary.
//
// The engine does not own a storage medium. It defines the save format (the
// JSON form of `GameState`), the minimal-shape check a payload must pass,
// schema-version migration, and a `SaveStore` trait over a key/value medium.
// Two stores ship with the crate: `MemoryStore` (tests, embedding) and
// `DirStore` (one `<key>.json` file per key, used by the CLI).
//
// Load failures are errors at the `SaveStore` level. `load_or_absent()`
// collapses them to "no state" for callers that should start a new run
// instead of crashing.
//
// **Critical constraint: determinism.** A decoded state must resume exactly
// where it was saved, so floats are written with round-trip precision and
// `meta.rng_state` is stored as a plain integer.

use crate::state::GameState;
use crate::types::RunStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SAVE_SCHEMA_VERSION: u32 = 1;

pub const AUTOSAVE_KEY: &str = "entropy.m3.autosave";

/// Manual save slots, in display order.
pub const SLOT_KEYS: [(&str, &str); 3] = [
    ("slot1", "entropy.m3.slot1"),
    ("slot2", "entropy.m3.slot2"),
    ("slot3", "entropy.m3.slot3"),
];

/// Sections a payload must carry as JSON objects.
const REQUIRED_SECTIONS: [&str; 7] = [
    "meta",
    "run",
    "resources",
    "project",
    "entropy",
    "market",
    "plan",
];

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to parse save data: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("save data does not match the expected state shape")]
    InvalidShape,
    #[error("unsupported save schema version {found} (supported: {supported})")]
    UnsupportedVersion { found: i64, supported: u32 },
    #[error("save I/O failed for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode save data: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Whether `value` has the seven state sections as objects and a `history`
/// array.
pub fn check_state_shape(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    REQUIRED_SECTIONS
        .iter()
        .all(|section| object.get(*section).is_some_and(Value::is_object))
        && object.get("history").is_some_and(Value::is_array)
}

/// Bring a payload up to `SAVE_SCHEMA_VERSION`. Missing, non-positive, and
/// newer-than-supported versions are rejected.
pub fn migrate(mut value: Value) -> Result<Value, SaveError> {
    let meta = value
        .get_mut("meta")
        .and_then(Value::as_object_mut)
        .ok_or(SaveError::InvalidShape)?;
    let found = meta
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    if found <= 0 || found > i64::from(SAVE_SCHEMA_VERSION) {
        return Err(SaveError::UnsupportedVersion {
            found,
            supported: SAVE_SCHEMA_VERSION,
        });
    }
    if found < i64::from(SAVE_SCHEMA_VERSION) {
        meta.insert("schema_version".into(), Value::from(SAVE_SCHEMA_VERSION));
    }
    Ok(value)
}

pub fn decode_state(data: &str) -> Result<GameState, SaveError> {
    let value: Value = serde_json::from_str(data).map_err(SaveError::Parse)?;
    let value = migrate(value)?;
    if !check_state_shape(&value) {
        return Err(SaveError::InvalidShape);
    }
    serde_json::from_value(value).map_err(SaveError::Parse)
}

pub fn encode_state(state: &GameState) -> Result<String, SaveError> {
    let value = serde_json::to_value(state).map_err(SaveError::Encode)?;
    if !check_state_shape(&value) {
        return Err(SaveError::InvalidShape);
    }
    serde_json::to_string(&value).map_err(SaveError::Encode)
}

/// Empty keys fall back to the autosave key.
pub fn resolve_key(key: &str) -> &str {
    if key.is_empty() { AUTOSAVE_KEY } else { key }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// A key/value medium holding encoded saves.
///
/// Implementors provide raw string access; `load`, `save` and `delete` add
/// key resolution, encoding and validation on top.
pub trait SaveStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, SaveError>;
    fn write_raw(&mut self, key: &str, data: &str) -> Result<(), SaveError>;
    fn remove_raw(&mut self, key: &str) -> Result<(), SaveError>;

    fn load(&self, key: &str) -> Result<Option<GameState>, SaveError> {
        match self.read_raw(resolve_key(key))? {
            Some(data) if !data.is_empty() => decode_state(&data).map(Some),
            _ => Ok(None),
        }
    }

    /// Returns the number of bytes written.
    fn save(&mut self, key: &str, state: &GameState) -> Result<usize, SaveError> {
        let data = encode_state(state)?;
        self.write_raw(resolve_key(key), &data)?;
        Ok(data.len())
    }

    fn delete(&mut self, key: &str) -> Result<(), SaveError> {
        self.remove_raw(resolve_key(key))
    }
}

/// In-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, SaveError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write_raw(&mut self, key: &str, data: &str) -> Result<(), SaveError> {
        self.entries.insert(key.to_string(), data.to_string());
        Ok(())
    }

    fn remove_raw(&mut self, key: &str) -> Result<(), SaveError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory.
#[derive(Clone, Debug)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SaveStore for DirStore {
    fn read_raw(&self, key: &str) -> Result<Option<String>, SaveError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SaveError::Io { path, source }),
        }
    }

    fn write_raw(&mut self, key: &str, data: &str) -> Result<(), SaveError> {
        fs::create_dir_all(&self.dir).map_err(|source| SaveError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(key);
        fs::write(&path, data).map_err(|source| SaveError::Io { path, source })
    }

    fn remove_raw(&mut self, key: &str) -> Result<(), SaveError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SaveError::Io { path, source }),
        }
    }
}

/// Load `key`, treating any failure as "no saved state".
pub fn load_or_absent(store: &dyn SaveStore, key: &str) -> Option<GameState> {
    match store.load(key) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(
                target: "entropy::save",
                key = resolve_key(key),
                error = %err,
                "save.load_rejected"
            );
            None
        }
    }
}

/// What a manual save slot holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotSummary {
    pub id: String,
    pub storage_key: String,
    pub exists: bool,
    pub week: Option<u32>,
    pub status: Option<RunStatus>,
    pub updated_at_iso: Option<String>,
}

pub fn list_slots(store: &dyn SaveStore) -> Vec<SlotSummary> {
    SLOT_KEYS
        .iter()
        .map(|(id, key)| {
            let state = store.load(key).ok().flatten();
            SlotSummary {
                id: (*id).to_string(),
                storage_key: (*key).to_string(),
                exists: state.is_some(),
                week: state.as_ref().map(|s| s.run.week),
                status: state.as_ref().map(|s| s.run.status),
                updated_at_iso: state.map(|s| s.meta.updated_at_iso),
            }
        })
        .collect()
}
