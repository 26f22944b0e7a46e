//! # axon-net
//!
//! The sharing network — the only piece of Axon where threads meet.
//!
//! Each member (agent) owns exactly one [`Mailbox`]: a bounded FIFO of
//! pending messages guarded by its own mutex. The [`SharingNetwork`] maps
//! member ids to mailboxes and carries the neighbor topology with its
//! per-edge sharing intervals. Members send serialized state records to
//! their neighbors; what the payload means is the sender's and receiver's
//! business — the network moves bytes.
//!
//! ## Architecture Rules
//!
//! - No global lock: contention is per-mailbox, one sender/receiver pair
//!   at a time.
//! - `send` never blocks. A full mailbox drops its oldest message.
//! - `recv` never blocks. `wait_message` exposes the condition variable
//!   `send` signals, for callers that want to sleep.
//!
//! ## Usage
//!
//! ```
//! use axon_net::SharingNetwork;
//!
//! let net = SharingNetwork::new();
//! net.load_topology("1: 2@1\n2: 1@1\n").unwrap();
//!
//! net.send(1, 2, b"hello").unwrap();
//! let msg = net.recv(2, None).unwrap().unwrap();
//! assert_eq!(msg.sender, 1);
//! assert_eq!(msg.payload, b"hello");
//! ```

pub mod channel;
pub mod error;
pub mod network;
pub mod topology;

pub use channel::{Mailbox, Message, DEFAULT_POOL_CAPACITY};
pub use error::NetError;
pub use network::SharingNetwork;
pub use topology::Topology;

/// Identity of a network member. Agents use their own id when joining.
pub type MemberId = i32;
