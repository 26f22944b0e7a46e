//! The storage interface bulk memory load/dump is driven through.
//!
//! The agent's load and dump routines own no knowledge of the backing
//! medium — anything that can store [`StateRecord`]s and one
//! [`MemoryInfo`] behind this trait works. Concrete backends live in
//! `axon-db`.

use thiserror::Error;

use crate::error::CoreError;
use crate::record::{MemoryInfo, StateRecord};
use crate::State;

/// How a storage session will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// Backend I/O and consistency failures.
///
/// A failed [`StorageBackend::open`] aborts a whole load or dump;
/// individual record failures are reported and skipped where possible.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("backend is not open")]
    NotOpen,

    #[error("backend is already open")]
    AlreadyOpen,

    #[error("backend was opened read-only")]
    ReadOnly,

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Record(#[from] CoreError),
}

/// A medium that can persist an agent's memory.
///
/// `first_state`/`next_state` form a sequential cursor over the stored
/// states; the cursor is reset by `first_state` and exhausted when
/// `next_state` returns `None`.
pub trait StorageBackend {
    /// Opens a session. Opening is where connection-level failures surface;
    /// an error here aborts the caller's whole load or dump.
    fn open(&mut self, mode: OpenMode) -> Result<(), StorageError>;

    /// Closes the session, flushing any pending writes.
    fn close(&mut self) -> Result<(), StorageError>;

    /// Resets the state cursor and returns the first stored state.
    fn first_state(&mut self) -> Option<State>;

    /// Advances the state cursor.
    fn next_state(&mut self) -> Option<State>;

    fn has_state(&self, state: State) -> bool;

    /// Full record for a stored state, or `None` if absent or unreadable.
    fn get_state_info(&self, state: State) -> Option<StateRecord>;

    fn add_state_info(&mut self, record: &StateRecord) -> Result<(), StorageError>;

    fn update_state_info(&mut self, record: &StateRecord) -> Result<(), StorageError>;

    fn delete_state(&mut self, state: State) -> Result<(), StorageError>;

    fn get_memory_info(&self) -> Option<MemoryInfo>;

    fn add_memory_info(&mut self, info: &MemoryInfo) -> Result<(), StorageError>;

    fn update_memory_info(&mut self, info: &MemoryInfo) -> Result<(), StorageError>;
}
