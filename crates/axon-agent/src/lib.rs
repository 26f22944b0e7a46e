//! # axon-agent
//!
//! The learning agent and the decision machinery under it.
//!
//! Three layers, each wrapping the previous:
//!
//! - [`Decider`]: maps an input to an output drawn uniformly at random from
//!   a candidate space. Knows nothing about time or payoffs.
//! - [`Sequencer`]: remembers the previous (input, output) pair so each
//!   tick yields the observed transition `(pre_in, pre_out) -> cur_in`.
//! - [`Agent`]: the payoff model. Restricts candidate actions with the
//!   Maximum Payoff Rule, updates the experience graph every tick, and —
//!   when joined to a sharing network — exchanges learned state records
//!   with its neighbors.
//!
//! The [`Policy`] trait is the seam between the layers: a restriction
//! policy plus a memory-update hook. The identity policy restricts
//! nothing and learns nothing; [`Agent`] is the interesting
//! implementation.
//!
//! ## Usage
//!
//! ```
//! use axon_agent::Agent;
//! use axon_core::OutputSpace;
//!
//! let mut agent = Agent::new(1, 0.9, 0.01).unwrap();
//! let mut actions = OutputSpace::new();
//! actions.add_range(0, 3, 1).unwrap();
//!
//! let action = agent.process(42, &actions);
//! assert!(actions.iter().any(|a| a == action));
//! agent.update(1.0);
//! assert_eq!(agent.memory().state(42).unwrap().count, 1);
//! ```

pub mod agent;
pub mod decider;
pub mod sequencer;

pub use agent::{Agent, Mode};
pub use decider::{Decider, IdentityPolicy, Policy};
pub use sequencer::{Sequencer, Transition};
