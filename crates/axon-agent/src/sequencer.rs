//! The time-sequential wrapper around the decision engine.
//!
//! Learning needs edges, and an edge needs two moments: the pair chosen on
//! the previous tick and the input that followed it. The sequencer keeps
//! that one-step history and defines exactly when a transition exists.

use axon_core::{Input, Output, OutputSpace, INVALID_OUTPUT};

use crate::decider::Decider;

/// One observed edge: the previous (input, output) pair led to `input`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub pre_input: Input,
    pub pre_output: Output,
    pub input: Input,
}

/// A [`Decider`] that remembers the previous (input, output) pair.
///
/// The contract around [`transition`](Self::transition) is the
/// re-entrancy rule for learning updates: a transition exists only when a
/// successful `process` has happened since the last [`roll`](Self::roll),
/// so consuming ticks twice cannot record the same edge twice. The very
/// first tick has no previous pair and produces no edge: a boundary
/// condition, not an error.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    decider: Decider,
    previous: Option<(Input, Output)>,
    fresh: bool,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws an output for `input` from `candidates`. A successful draw
    /// marks this tick fresh.
    pub fn process(&mut self, input: Input, candidates: &OutputSpace) -> Output {
        let output = self.decider.process(input, candidates);
        if output != INVALID_OUTPUT {
            self.fresh = true;
        }
        output
    }

    /// Whether a successful `process` has happened since the last roll.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// The edge observed this tick, if both moments exist: a fresh current
    /// pair and a previous pair to connect it to.
    pub fn transition(&self) -> Option<Transition> {
        if !self.fresh {
            return None;
        }
        let (pre_input, pre_output) = self.previous?;
        Some(Transition {
            pre_input,
            pre_output,
            input: self.decider.current().0,
        })
    }

    /// Rolls the cursor: the current pair becomes the previous pair and the
    /// tick is no longer fresh. A roll without a fresh process is a no-op.
    pub fn roll(&mut self) {
        if self.fresh {
            self.previous = Some(self.decider.current());
            self.fresh = false;
        }
    }

    /// Seeds the previous pair, as when resuming from a loaded memory: the
    /// next tick's transition will connect from here.
    pub fn resume_from(&mut self, input: Input, output: Output) {
        self.previous = Some((input, output));
        self.fresh = false;
    }

    /// The current (input, output) pair.
    pub fn current(&self) -> (Input, Output) {
        self.decider.current()
    }

    /// The previous (input, output) pair, if one tick has completed.
    pub fn previous(&self) -> Option<(Input, Output)> {
        self.previous
    }

    pub fn process_count(&self) -> u64 {
        self.decider.process_count()
    }

    pub fn decider(&self) -> &Decider {
        &self.decider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(value: Output) -> OutputSpace {
        let mut space = OutputSpace::new();
        space.add(value);
        space
    }

    #[test]
    fn first_tick_has_no_transition() {
        let mut seq = Sequencer::new();
        seq.process(1, &single(5));
        assert!(seq.transition().is_none());
        seq.roll();
        assert_eq!(seq.previous(), Some((1, 5)));
    }

    #[test]
    fn second_tick_yields_the_edge() {
        let mut seq = Sequencer::new();
        seq.process(1, &single(5));
        seq.roll();
        seq.process(2, &single(3));

        assert_eq!(
            seq.transition(),
            Some(Transition {
                pre_input: 1,
                pre_output: 5,
                input: 2
            })
        );
    }

    #[test]
    fn transition_is_consumed_by_roll() {
        let mut seq = Sequencer::new();
        seq.process(1, &single(5));
        seq.roll();
        seq.process(2, &single(3));
        seq.roll();

        // No fresh process since the roll: no transition to record.
        assert!(seq.transition().is_none());
        assert!(!seq.is_fresh());
    }

    #[test]
    fn repeated_roll_without_process_keeps_previous() {
        let mut seq = Sequencer::new();
        seq.process(1, &single(5));
        seq.roll();
        seq.roll();
        seq.roll();
        assert_eq!(seq.previous(), Some((1, 5)));
    }

    #[test]
    fn resume_seeds_the_previous_pair() {
        let mut seq = Sequencer::new();
        seq.resume_from(9, 2);
        assert_eq!(seq.previous(), Some((9, 2)));
        assert!(!seq.is_fresh());

        seq.process(11, &single(4));
        assert_eq!(
            seq.transition(),
            Some(Transition {
                pre_input: 9,
                pre_output: 2,
                input: 11
            })
        );
    }

    #[test]
    fn failed_draw_is_not_fresh() {
        let mut seq = Sequencer::new();
        seq.process(1, &single(5));
        seq.roll();
        seq.process(2, &OutputSpace::new());
        assert!(!seq.is_fresh());
        assert!(seq.transition().is_none());
    }
}
