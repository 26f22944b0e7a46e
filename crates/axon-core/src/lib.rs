//! # axon-core
//!
//! The data model shared by every Axon crate.
//!
//! An Axon agent experiences the world as a sequence of integer *states*,
//! reacts with integer *actions*, and remembers what happened as a directed
//! graph of observed transitions. This crate holds the pieces every other
//! crate builds on:
//!
//! - [`OutputSpace`]: a range-compressed, weighted action/value domain
//! - [`MemoryGraph`]: the id-addressed arena of experienced states
//! - [`StateRecord`] / [`MemoryInfo`]: the portable record types and their
//!   explicit little-endian byte layout
//! - [`StorageBackend`]: the interface bulk load/dump is driven through
//!
//! ## Architecture Rules
//!
//! - No I/O here — concrete storage lives in `axon-db`, messaging in
//!   `axon-net`.
//! - The byte layout is a contract: encode/decode are explicit functions,
//!   never a memory overlay, so dumps are identical across platforms.

pub mod backend;
pub mod error;
pub mod memory;
pub mod record;
pub mod space;

pub use backend::{OpenMode, StorageBackend, StorageError};
pub use error::CoreError;
pub use memory::{ActionNode, EnvLink, MemoryGraph, StateNode};
pub use record::{ActionBlock, LinkRecord, MemoryInfo, StateRecord};
pub use space::{Fragment, OutputSpace};

/// Input value fed to a decision engine. For an agent, an input is a state.
pub type Input = i64;
/// Output value drawn by a decision engine. For an agent, an output is an
/// action.
pub type Output = i64;

/// A state experienced by an agent.
pub type State = Input;
/// An action performed by an agent.
pub type Action = Output;
/// The environment's contribution to a transition.
pub type EnvAction = Output;

/// Sentinel for "no valid input". The maximum representable value is
/// reserved; valid inputs stop one below it.
pub const INVALID_INPUT: Input = i64::MAX;
/// Sentinel for "no valid output", returned by draws over an empty space
/// and by out-of-bounds indexing. Callers must check before use.
pub const INVALID_OUTPUT: Output = i64::MAX;
/// Sentinel for "no valid state".
pub const INVALID_STATE: State = INVALID_INPUT;
/// Sentinel for "no valid action".
pub const INVALID_ACTION: Action = INVALID_OUTPUT;
