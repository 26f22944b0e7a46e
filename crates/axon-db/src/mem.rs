//! The in-memory backend.

use std::collections::BTreeMap;

use axon_core::{MemoryInfo, OpenMode, State, StateRecord, StorageBackend, StorageError};

/// A storage backend that keeps everything in RAM.
///
/// Lookup operations on a closed backend return empty results; mutations
/// require an open write session.
///
/// # Example
///
/// ```
/// use axon_core::{OpenMode, StorageBackend, StateRecord};
/// use axon_db::MemBackend;
///
/// let mut backend = MemBackend::new();
/// backend.open(OpenMode::Write).unwrap();
/// backend
///     .add_state_info(&StateRecord {
///         state: 1,
///         original_payoff: 0.0,
///         payoff: 0.0,
///         count: 1,
///         actions: Vec::new(),
///     })
///     .unwrap();
/// assert!(backend.has_state(1));
/// backend.close().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MemBackend {
    mode: Option<OpenMode>,
    states: BTreeMap<State, StateRecord>,
    info: Option<MemoryInfo>,
    cursor: Vec<State>,
    cursor_pos: usize,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn writable(&self) -> Result<(), StorageError> {
        match self.mode {
            Some(OpenMode::Write) => Ok(()),
            Some(OpenMode::Read) => Err(StorageError::ReadOnly),
            None => Err(StorageError::NotOpen),
        }
    }
}

impl StorageBackend for MemBackend {
    fn open(&mut self, mode: OpenMode) -> Result<(), StorageError> {
        if self.mode.is_some() {
            return Err(StorageError::AlreadyOpen);
        }
        self.mode = Some(mode);
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        if self.mode.take().is_none() {
            return Err(StorageError::NotOpen);
        }
        self.cursor.clear();
        self.cursor_pos = 0;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: State) -> StateRecord {
        StateRecord {
            state,
            original_payoff: 0.5,
            payoff: 0.5,
            count: 1,
            actions: Vec::new(),
        }
    }

    #[test]
    fn open_close_lifecycle() {
        let mut backend = MemBackend::new();
        assert!(matches!(backend.close(), Err(StorageError::NotOpen)));
        backend.open(OpenMode::Read).unwrap();
        assert!(matches!(
            backend.open(OpenMode::Read),
            Err(StorageError::AlreadyOpen)
        ));
        backend.close().unwrap();
        backend.open(OpenMode::Write).unwrap();
        backend.close().unwrap();
    }

    #[test]
    fn writes_require_a_write_session() {
        let mut backend = MemBackend::new();
        assert!(matches!(
            backend.add_state_info(&record(1)),
            Err(StorageError::NotOpen)
        ));
        backend.open(OpenMode::Read).unwrap();
        assert!(matches!(
            backend.add_state_info(&record(1)),
            Err(StorageError::ReadOnly)
        ));
    }

    #[test]
    fn cursor_walks_states_in_order() {
        let mut backend = MemBackend::new();
        backend.open(OpenMode::Write).unwrap();
        backend.add_state_info(&record(3)).unwrap();
        backend.add_state_info(&record(1)).unwrap();
        backend.add_state_info(&record(2)).unwrap();

        assert_eq!(backend.first_state(), Some(1));
        assert_eq!(backend.next_state(), Some(2));
        assert_eq!(backend.next_state(), Some(3));
        assert_eq!(backend.next_state(), None);
        // first_state resets.
        assert_eq!(backend.first_state(), Some(1));
    }

    #[test]
    fn lookups_on_a_closed_backend_are_empty() {
        let mut backend = MemBackend::new();
        backend.open(OpenMode::Write).unwrap();
        backend.add_state_info(&record(1)).unwrap();
        backend.close().unwrap();

        assert!(!backend.has_state(1));
        assert!(backend.get_state_info(1).is_none());
        assert!(backend.first_state().is_none());
    }

    #[test]
    fn delete_removes_a_record() {
        let mut backend = MemBackend::new();
        backend.open(OpenMode::Write).unwrap();
        backend.add_state_info(&record(1)).unwrap();
        backend.delete_state(1).unwrap();
        assert!(!backend.has_state(1));
    }
}
