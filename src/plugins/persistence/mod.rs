//! Bestiary save record: how many of each type the player has devoured.
//!
//! Gameplay only increments counters and writes `PersistSave`; the disk write
//! happens here, after the fixed step, and only when a save path is configured.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::state::GameState;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("save file json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Request to flush the save record to disk.
#[derive(Message, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistSave;

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    counters: BTreeMap<String, u32>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl SaveRecord {
    /// In-memory record backed by `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { counters: BTreeMap::new(), path: Some(path.into()) }
    }

    /// Read an existing record; a missing file is an empty record.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let path = path.as_ref();
        let mut record = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<SaveRecord>(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => SaveRecord::default(),
            Err(err) => return Err(err.into()),
        };
        record.path = Some(path.to_path_buf());
        Ok(record)
    }

    /// Like `load`, but a broken file is logged and replaced by an empty record.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|err| {
            warn!(path = %path.display(), %err, "save record unreadable; starting fresh");
            Self::at(path)
        })
    }

    /// Bump the counter for `key`, returning the new count.
    pub fn increment(&mut self, key: &str) -> u32 {
        let n = self.counters.entry(key.to_owned()).or_insert(0);
        *n += 1;
        *n
    }

    pub fn count(&self, key: &str) -> u32 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write to the configured path. Returns `Ok(false)` when there is none.
    pub fn persist(&self) -> Result<bool, SaveError> {
        let Some(path) = &self.path else {
            return Ok(false);
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(true)
    }
}

pub fn plugin(app: &mut App) {
    if !app.world().contains_resource::<SaveRecord>() {
        app.insert_resource(SaveRecord::default());
    }
    app.add_message::<PersistSave>().add_systems(
        PostUpdate,
        persist_save.run_if(in_state(GameState::InGame)),
    );
}

/// Coalesces any number of requests in a frame into one write.
pub(crate) fn persist_save(mut requests: MessageReader<PersistSave>, record: Res<SaveRecord>) {
    if requests.read().count() == 0 {
        return;
    }
    match record.persist() {
        Ok(true) => debug!(path = ?record.path(), "save record written"),
        Ok(false) => {}
        Err(err) => error!(%err, "failed to write save record"),
    }
}
