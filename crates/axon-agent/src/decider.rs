//! The stochastic input→output decision engine.

use std::collections::BTreeMap;

use rand::Rng;

use axon_core::{Input, Output, OutputSpace, INVALID_INPUT, INVALID_OUTPUT};

/// The two capabilities a decision engine can be customized with: how the
/// candidate space is narrowed before a draw, and what internal state to
/// evolve after a tick.
pub trait Policy {
    /// Narrows the candidate output space for an input. The returned space
    /// may be smaller and may weight values by duplication. Default:
    /// identity.
    fn restrict(&mut self, input: Input, available: &OutputSpace) -> OutputSpace {
        let _ = input;
        available.clone()
    }

    /// Evolves internal state after a tick, given the raw payoff signal.
    /// Default: no-op.
    fn update_memory(&mut self, original_payoff: f32) {
        let _ = original_payoff;
    }
}

/// The do-nothing policy: no restriction, no memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPolicy;

impl Policy for IdentityPolicy {}

/// Draws one output per input from a candidate space, uniformly at random
/// over the space's logical index range — so a value that appears twice is
/// twice as likely.
///
/// # Example
///
/// ```
/// use axon_agent::Decider;
/// use axon_core::{OutputSpace, INVALID_OUTPUT};
///
/// let mut decider = Decider::new();
/// let mut space = OutputSpace::new();
/// space.add(9);
///
/// assert_eq!(decider.process(1, &space), 9);
/// assert_eq!(decider.process(1, &OutputSpace::new()), INVALID_OUTPUT);
/// assert_eq!(decider.process_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Decider {
    cur_input: Input,
    cur_output: Output,
    process_count: u64,
}

impl Default for Decider {
    fn default() -> Self {
        Self::new()
    }
}

impl Decider {
    pub fn new() -> Self {
        Self {
            cur_input: INVALID_INPUT,
            cur_output: INVALID_OUTPUT,
            process_count: 0,
        }
    }

    /// Draws one output from `candidates` for `input`.
    ///
    /// Returns [`INVALID_OUTPUT`] (recording nothing) when the candidate
    /// space is empty. On success the (input, output) pair becomes current
    /// and the process counter advances.
    pub fn process(&mut self, input: Input, candidates: &OutputSpace) -> Output {
        if candidates.is_empty() {
            return INVALID_OUTPUT;
        }
        let index = rand::rng().random_range(0..candidates.size());
        let output = candidates.get(index);
        self.cur_input = input;
        self.cur_output = output;
        self.process_count += 1;
        output
    }

    /// The current (input, output) pair. Both are the invalid sentinels
    /// before the first successful `process`.
    pub fn current(&self) -> (Input, Output) {
        (self.cur_input, self.cur_output)
    }

    /// Number of successful `process` calls so far.
    pub fn process_count(&self) -> u64 {
        self.process_count
    }

    /// Shannon entropy, in bits, of drawing a single output from `space`.
    /// Repeated values concentrate probability mass and lower the entropy.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_agent::Decider;
    /// use axon_core::OutputSpace;
    ///
    /// let decider = Decider::new();
    /// let mut space = OutputSpace::new();
    /// space.add_range(0, 3, 1).unwrap();
    /// assert!((decider.single_output_entropy(&space) - 2.0).abs() < 1e-6);
    /// ```
    pub fn single_output_entropy(&self, space: &OutputSpace) -> f32 {
        let total = space.size();
        if total == 0 {
            return 0.0;
        }
        let mut counts: BTreeMap<Output, u64> = BTreeMap::new();
        for value in space.iter() {
            *counts.entry(value).or_insert(0) += 1;
        }
        let total = total as f64;
        let mut entropy = 0.0f64;
        for &count in counts.values() {
            let p = count as f64 / total;
            entropy -= p * p.log2();
        }
        entropy as f32
    }
}
