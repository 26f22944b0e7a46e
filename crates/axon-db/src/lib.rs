//! # axon-db
//!
//! Storage backends for agent memory.
//!
//! The agent drives bulk load/dump through the
//! [`StorageBackend`](axon_core::StorageBackend) trait and owns no
//! knowledge of the medium. Three media live here:
//!
//! - [`MemBackend`]: in-memory, for tests and ephemeral snapshots
//! - [`BinBackend`]: a file in the portable binary layout — one
//!   `MemoryInfo` block followed by concatenated `StateRecord`s, readable
//!   on any platform
//! - [`JsonBackend`]: a human-readable JSON snapshot file
//!
//! ## Usage
//!
//! ```
//! use axon_core::{OpenMode, StorageBackend};
//! use axon_db::MemBackend;
//!
//! let mut backend = MemBackend::new();
//! backend.open(OpenMode::Write).unwrap();
//! assert!(backend.first_state().is_none());
//! backend.close().unwrap();
//! ```

pub mod bin;
pub mod json;
pub mod mem;

pub use bin::BinBackend;
pub use json::JsonBackend;
pub use mem::MemBackend;

pub use axon_core;
