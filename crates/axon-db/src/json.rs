//! The JSON file backend.
//!
//! A human-readable snapshot: one JSON document holding the memory info
//! and every state record. Slower and bulkier than the binary layout, but
//! greppable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use axon_core::{MemoryInfo, OpenMode, State, StateRecord, StorageBackend, StorageError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    info: Option<MemoryInfo>,
    states: Vec<StateRecord>,
}

/// A storage backend that persists memory as one JSON document.
///
/// Reads happen at `open`; writes are buffered and flushed at `close`.
#[derive(Debug)]
pub struct JsonBackend {
    path: PathBuf,
    mode: Option<OpenMode>,
    states: BTreeMap<State, StateRecord>,
    info: Option<MemoryInfo>,
    cursor: Vec<State>,
    cursor_pos: usize,
}

impl JsonBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode: None,
            states: BTreeMap::new(),
            info: None,
            cursor: Vec::new(),
            cursor_pos: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writable(&self) -> Result<(), StorageError> {
        match self.mode {
            Some(OpenMode::Write) => Ok(()),
            Some(OpenMode::Read) => Err(StorageError::ReadOnly),
            None => Err(StorageError::NotOpen),
        }
    }

    fn load_file(&mut self) -> Result<(), StorageError> {
        let text = std::fs::read_to_string(&self.path)?;
        let snapshot: Snapshot = serde_json::from_str(&text)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        self.info = snapshot.info;
        self.states = snapshot
            .states
            .into_iter()
            .map(|record| (record.state, record))
            .collect();
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let snapshot = Snapshot {
            info: self.info,
            states: self.states.values().cloned().collect(),
        };
        let text = serde_json::to_string_pretty(&snapshot)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl StorageBackend for JsonBackend {
    fn open(&mut self, mode: OpenMode) -> Result<(), StorageError> {
        if self.mode.is_some() {
            return Err(StorageError::AlreadyOpen);
        }
        match mode {
            OpenMode::Read => self.load_file()?,
            OpenMode::Write => {
                if self.path.exists() {
                    self.load_file()?;
                } else {
                    self.states.clear();
                    self.info = None;
                }
            }
        }
        self.mode = Some(mode);
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        let mode = self.mode.take().ok_or(StorageError::NotOpen)?;
        self.cursor.clear();
        self.cursor_pos = 0;
        if mode == OpenMode::Write {
            self.flush()?;
        }
        Ok(())
    }

    fn first_state(&mut self) -> Option<State> {
        self.mode?;
        self.cursor = self.states.keys().copied().collect();
        self.cursor_pos = 0;
        self.cursor.first().copied()
    }

    fn next_state(&mut self) -> Option<State> {
        self.mode?;
        self.cursor_pos += 1;
        self.cursor.get(self.cursor_pos).copied()
    }

    fn has_state(&self, state: State) -> bool {
        self.mode.is_some() && self.states.contains_key(&state)
    }

    fn get_state_info(&self, state: State) -> Option<StateRecord> {
        self.mode?;
        self.states.get(&state).cloned()
    }

    fn add_state_info(&mut self, record: &StateRecord) -> Result<(), StorageError> {
        self.writable()?;
        self.states.insert(record.state, record.clone());
        Ok(())
    }

    fn update_state_info(&mut self, record: &StateRecord) -> Result<(), StorageError> {
        self.writable()?;
        self.states.insert(record.state, record.clone());
        Ok(())
    }

    fn delete_state(&mut self, state: State) -> Result<(), StorageError> {
        self.writable()?;
        self.states.remove(&state);
        Ok(())
    }

    fn get_memory_info(&self) -> Option<MemoryInfo> {
        self.mode?;
        self.info
    }

    fn add_memory_info(&mut self, info: &MemoryInfo) -> Result<(), StorageError> {
        self.writable()?;
        self.info = Some(*info);
        Ok(())
    }

    fn update_memory_info(&mut self, info: &MemoryInfo) -> Result<(), StorageError> {
        self.writable()?;
        self.info = Some(*info);
        Ok(())
    }
}
