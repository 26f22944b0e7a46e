//! The binary file backend.
//!
//! File layout: one `MemoryInfo` block followed by concatenated
//! `StateRecord`s in the portable little-endian encoding. Each record's
//! declared `total_size` lets the reader step over records it cannot
//! decode, so a single corrupt record costs itself, not the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use axon_core::record::{MEMORY_INFO_SIZE, STATE_HEADER_SIZE};
use axon_core::{MemoryInfo, OpenMode, State, StateRecord, StorageBackend, StorageError};

/// A storage backend that persists memory as one binary file.
///
/// Reads happen at `open`; writes are buffered and flushed at `close`.
#[derive(Debug)]
pub struct BinBackend {
    path: PathBuf,
    mode: Option<OpenMode>,
    states: BTreeMap<State, StateRecord>,
    info: Option<MemoryInfo>,
    cursor: Vec<State>,
    cursor_pos: usize,
}

impl BinBackend {
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
        let bytes = std::fs::read(&self.path)?;
        if bytes.len() < MEMORY_INFO_SIZE {
            return Err(StorageError::Corrupt(format!(
                "file too short for a memory info block: {} bytes",
                bytes.len()
            )));
        }
        self.info = Some(MemoryInfo::decode(&bytes[..MEMORY_INFO_SIZE])?);

        self.states.clear();
        let mut offset = MEMORY_INFO_SIZE;
        while offset < bytes.len() {
            let rest = &bytes[offset..];
            let declared = StateRecord::declared_size(rest).map_err(|err| {
                StorageError::Corrupt(format!("unreadable record header at byte {offset}: {err}"))
            })?;
            if declared < STATE_HEADER_SIZE || declared > rest.len() {
                return Err(StorageError::Corrupt(format!(
                    "record at byte {offset} declares impossible size {declared}"
                )));
            }
            match StateRecord::decode(&rest[..declared]) {
                Ok(record) => {
                    self.states.insert(record.state, record);
                }
                Err(err) => {
                    warn!(offset, %err, "skipping undecodable state record");
                }
            }
            offset += declared;
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let info = self.info.ok_or_else(|| {
            StorageError::Corrupt("no memory info written before close".to_string())
        })?;
        let mut bytes = Vec::with_capacity(
            MEMORY_INFO_SIZE + self.states.values().map(StateRecord::total_size).sum::<usize>(),
        );
        bytes.extend_from_slice(&info.encode());
        for record in self.states.values() {
            bytes.extend(record.encode()?);
        }
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl StorageBackend for BinBackend {
    fn open(&mut self, mode: OpenMode) -> Result<(), StorageError> {
        if self.mode.is_some() {
            return Err(StorageError::AlreadyOpen);
        }
        match mode {
            OpenMode::Read => self.load_file()?,
            OpenMode::Write => {
                // Pick up existing content so updates see prior records.
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
