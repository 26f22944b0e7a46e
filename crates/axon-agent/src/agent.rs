//! The learning agent: Maximum Payoff Rule, online graph update, and the
//! sharing protocol driver.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use tracing::warn;

use axon_core::{
    Action, CoreError, MemoryGraph, OpenMode, OutputSpace, State, StateRecord, StorageBackend,
    StorageError, INVALID_INPUT,
};
use axon_net::{MemberId, SharingNetwork};

use crate::decider::Policy;
use crate::sequencer::Sequencer;

/// Learning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Learn while acting, and let what was learned bias action choice.
    #[default]
    Online,
    /// Learn while acting, but choose actions purely at random.
    Explore,
    /// Record structure for externally supplied actions without touching
    /// payoffs. The caller passes the taught action as the only candidate.
    Teach,
}

/// An agent that learns a payoff-annotated experience graph as it acts.
///
/// Drive it one tick at a time: [`process`](Self::process) chooses an
/// action for the current state, the environment executes it, and
/// [`update`](Self::update) hands back the raw payoff signal so the graph
/// can absorb what happened.
///
/// # Example
///
/// ```
/// use axon_agent::Agent;
/// use axon_core::OutputSpace;
///
/// let mut agent = Agent::new(1, 0.9, 0.01).unwrap();
/// let mut actions = OutputSpace::new();
/// actions.add(4);
///
/// assert_eq!(agent.process(10, &actions), 4);
/// agent.update(0.5);
/// assert!((agent.memory().payoff_of(10) - 0.5).abs() < 1e-6);
/// ```
pub struct Agent {
    id: MemberId,
    mode: Mode,
    seq: Sequencer,
    memory: MemoryGraph,
    network: Option<Arc<SharingNetwork>>,
}

impl Agent {
    /// Creates an agent.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DiscountRate`] unless `discount_rate` lies in
    /// `[0, 1)`, and [`CoreError::Threshold`] for a negative `threshold`.
    pub fn new(id: MemberId, discount_rate: f32, threshold: f32) -> Result<Self, CoreError> {
        Ok(Self {
            id,
            mode: Mode::default(),
            seq: Sequencer::new(),
            memory: MemoryGraph::new(discount_rate, threshold)?,
            network: None,
        })
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// The agent's experience graph.
    pub fn memory(&self) -> &MemoryGraph {
        &self.memory
    }

    /// Number of completed draws so far (the agent's tick counter).
    pub fn process_count(&self) -> u64 {
        self.seq.process_count()
    }

    /// Chooses an action for `state` from `available`, after restricting
    /// the candidates according to the current mode.
    ///
    /// Returns [`axon_core::INVALID_ACTION`] when the restricted space is
    /// empty; callers must check before acting on it.
    pub fn process(&mut self, state: State, available: &OutputSpace) -> Action {
        let candidates = Policy::restrict(self, state, available);
        self.seq.process(state, &candidates)
    }

    /// Absorbs the environment's feedback for the current tick: records
    /// the observed transition, applies `original_payoff` to the current
    /// state, propagates payoff changes backward, rolls the time cursor,
    /// and runs the sharing protocol when joined to a network.
    ///
    /// Calling `update` again without an intervening `process` refreshes
    /// payoffs but records no visit and no transition.
    pub fn update(&mut self, original_payoff: f32) {
        Policy::update_memory(self, original_payoff);
        self.seq.roll();
        if self.network.is_some() {
            self.share_memory();
        }
    }

    /// Explicitly forgets a state. Links into it from elsewhere dangle and
    /// resolve to a zero-payoff stub; the caller owns that consequence.
    pub fn delete_state(&mut self, state: State) -> bool {
        self.memory.delete_state(state)
    }

    // --- Maximum Payoff Rule ------------------------------------------

    /// Weights candidate actions by how good their recorded destinations
    /// are. Each distinct candidate is repeated `1 + (number of candidates
    /// ranked strictly below it)` times, so better-ranked actions carry
    /// proportionally more probability mass. Actions with no recorded
    /// history rank above every known payoff to drive exploration.
    fn max_payoff_rule(&mut self, state: State, available: &OutputSpace) -> OutputSpace {
        self.memory.ensure_state(state);

        let mut candidates: Vec<Action> = Vec::new();
        for action in available.iter() {
            if !candidates.contains(&action) {
                candidates.push(action);
            }
        }
        let payoffs: Vec<Option<f32>> = candidates
            .iter()
            .map(|&action| self.memory.action_payoff(state, action))
            .collect();

        // `None` (never tried) outranks every known payoff.
        fn ranks_below(a: &Option<f32>, b: &Option<f32>) -> bool {
            match (a, b) {
                (Some(x), Some(y)) => x < y,
                (Some(_), None) => true,
                (None, _) => false,
            }
        }

        let mut restricted = OutputSpace::with_capacity(candidates.len());
        for (i, &action) in candidates.iter().enumerate() {
            let weight = 1 + payoffs.iter().filter(|&p| ranks_below(p, &payoffs[i])).count();
            for _ in 0..weight {
                restricted.add(action);
            }
        }
        restricted
    }

    /// Propagates a payoff change at `origin` backward through the graph.
    /// Each predecessor refreshes its action payoffs and its own payoff;
    /// the wave continues while changes stay at or above the accuracy
    /// threshold, and every state is refreshed at most once per tick.
    fn propagate_from(&mut self, origin: State) {
        let threshold = self.memory.threshold();
        let mut visited: BTreeSet<State> = BTreeSet::new();
        visited.insert(origin);
        let mut queue: VecDeque<State> = VecDeque::from([origin]);

        while let Some(state) = queue.pop_front() {
            for pred in self.memory.predecessors(state) {
                if !visited.insert(pred) {
                    continue;
                }
                let delta = self.memory.refresh_state(pred);
                if delta.abs() >= threshold {
                    queue.push_back(pred);
                }
            }
        }
    }

    // --- Sharing ------------------------------------------------------

    /// Joins a sharing network, registering this agent as a member.
    pub fn join_sharing_network(&mut self, network: Arc<SharingNetwork>) {
        network.add_member(self.id);
        self.network = Some(network);
    }

    /// Leaves the current sharing network, removing this agent and its
    /// edges. A warning no-op when not joined.
    pub fn leave_sharing_network(&mut self) {
        match self.network.take() {
            Some(network) => network.remove_member(self.id),
            None => warn!(agent = self.id, "not joined to any sharing network"),
        }
    }

    /// Adds (or retunes) the edge to a neighbor. A warning no-op when not
    /// joined or when the neighbor is unknown to the network.
    pub fn add_neighbour(&mut self, nid: MemberId, interval: u64) {
        let Some(network) = &self.network else {
            warn!(agent = self.id, "cannot add neighbour: not joined to any sharing network");
            return;
        };
        if let Err(err) = network.add_neighbour(self.id, nid, interval) {
            warn!(agent = self.id, neighbour = nid, %err, "cannot add neighbour");
        }
    }

    /// Removes the edge to a neighbor. A warning no-op when not joined.
    pub fn remove_neighbour(&mut self, nid: MemberId) {
        let Some(network) = &self.network else {
            warn!(agent = self.id, "cannot remove neighbour: not joined to any sharing network");
            return;
        };
        if let Err(err) = network.remove_neighbour(self.id, nid) {
            warn!(agent = self.id, neighbour = nid, %err, "cannot remove neighbour");
        }
    }

    /// Changes the sharing interval of an existing edge. A warning no-op
    /// when not joined or when the edge does not exist.
    pub fn change_sharing_interval(&mut self, nid: MemberId, interval: u64) {
        let Some(network) = &self.network else {
            warn!(agent = self.id, "cannot change interval: not joined to any sharing network");
            return;
        };
        if let Err(err) = network.change_sharing_interval(self.id, nid, interval) {
            warn!(agent = self.id, neighbour = nid, %err, "cannot change sharing interval");
        }
    }

    /// This agent's neighbors with their sharing intervals. Empty (with a
    /// warning) when not joined.
    pub fn neighbours(&self) -> Vec<(MemberId, u64)> {
        match &self.network {
            Some(network) => network.neighbours(self.id),
            None => {
                warn!(agent = self.id, "not joined to any sharing network");
                Vec::new()
            }
        }
    }

    pub fn is_neighbour(&self, nid: MemberId) -> bool {
        self.network
            .as_ref()
            .is_some_and(|network| network.is_neighbour(self.id, nid))
    }

    /// One round of the sharing protocol: merge everything pending in this
    /// agent's mailbox, then send the most recently learned state to every
    /// neighbor whose interval divides the tick counter.
    fn share_memory(&mut self) {
        let Some(network) = self.network.clone() else {
            return;
        };

        while let Ok(Some(msg)) = network.recv(self.id, None) {
            match StateRecord::decode(&msg.payload) {
                Ok(record) => self.memory.merge_record(&record),
                Err(err) => warn!(
                    agent = self.id,
                    sender = msg.sender,
                    %err,
                    "discarding undecodable state record"
                ),
            }
        }

        let ticks = self.seq.process_count();
        if ticks == 0 {
            return;
        }
        let (last_state, _) = self.memory.last_pair();
        let Some(record) = self.memory.to_record(last_state) else {
            return;
        };
        let payload = match record.encode() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(agent = self.id, state = last_state, %err, "state record too large to share");
                return;
            }
        };
        for (nid, interval) in network.neighbours(self.id) {
            if ticks % interval == 0 {
                if let Err(err) = network.send(self.id, nid, &payload) {
                    warn!(agent = self.id, neighbour = nid, %err, "failed to send state record");
                }
            }
        }
    }

    // --- Persistence --------------------------------------------------

    /// Loads memory from a storage backend, replacing matching states and
    /// adopting the dump's configuration and resume point. Best-effort:
    /// unreadable records are warned about and skipped; a failed `open`
    /// or a corrupt memory-info block aborts.
    pub fn load_memory_from_storage(
        &mut self,
        backend: &mut dyn StorageBackend,
    ) -> Result<(), StorageError> {
        backend.open(OpenMode::Read)?;
        let result = self.load_states(backend);
        let closed = backend.close();
        result.and(closed)
    }

    fn load_states(&mut self, backend: &mut dyn StorageBackend) -> Result<(), StorageError> {
        let info = backend.get_memory_info();
        if let Some(info) = &info {
            self.memory.apply_info(info)?;
        }

        let mut cursor = backend.first_state();
        while let Some(state) = cursor {
            match backend.get_state_info(state) {
                Some(record) => self.memory.insert_record(&record),
                None => warn!(agent = self.id, state, "skipping unreadable state record"),
            }
            cursor = backend.next_state();
        }

        // Action payoff caches can only be rebuilt once every target state
        // is in the arena.
        let states: Vec<State> = self.memory.states().collect();
        for state in states {
            self.memory.refresh_actions(state);
        }

        // Resume the time sequence where the dump left off, so the next
        // tick links from the last recorded (state, action) pair.
        let (last_state, last_action) = self.memory.last_pair();
        if last_state != INVALID_INPUT {
            self.seq.resume_from(last_state, last_action);
        }

        if let Some(info) = info {
            if info.state_count != self.memory.state_count()
                || info.link_count != self.memory.link_count()
            {
                warn!(
                    agent = self.id,
                    expected_states = info.state_count,
                    loaded_states = self.memory.state_count(),
                    expected_links = info.link_count,
                    loaded_links = self.memory.link_count(),
                    "loaded memory does not match its recorded totals"
                );
            }
        }
        Ok(())
    }

    /// Dumps memory to a storage backend. Best-effort per record; a failed
    /// `open` aborts, and the aggregate memory info is written last.
    pub fn dump_memory_to_storage(
        &self,
        backend: &mut dyn StorageBackend,
    ) -> Result<(), StorageError> {
        backend.open(OpenMode::Write)?;
        let result = self.dump_states(backend);
        let closed = backend.close();
        result.and(closed)
    }

    fn dump_states(&self, backend: &mut dyn StorageBackend) -> Result<(), StorageError> {
        for state in self.memory.states() {
            let record = self
                .memory
                .to_record(state)
                .expect("iterating this graph's own states");
            let stored = if backend.has_state(state) {
                backend.update_state_info(&record)
            } else {
                backend.add_state_info(&record)
            };
            if let Err(err) = stored {
                warn!(agent = self.id, state, %err, "failed to store state record");
            }
        }

        let info = self.memory.memory_info();
        if backend.get_memory_info().is_some() {
            backend.update_memory_info(&info)
        } else {
            backend.add_memory_info(&info)
        }
    }
}

impl Policy for Agent {
    /// Mode-aware restriction: the Maximum Payoff Rule online, the
    /// untouched input space when exploring or being taught.
    fn restrict(&mut self, input: State, available: &OutputSpace) -> OutputSpace {
        match self.mode {
            Mode::Online => self.max_payoff_rule(input, available),
            Mode::Explore | Mode::Teach => available.clone(),
        }
    }

    /// The online learning step. In [`Mode::Teach`] only graph structure
    /// is recorded; payoffs stay untouched.
    fn update_memory(&mut self, original_payoff: f32) {
        let (cur_state, cur_action) = self.seq.current();
        if cur_state == INVALID_INPUT {
            warn!(agent = self.id, "update before any successful process; nothing to learn from");
            return;
        }

        let fresh = self.seq.is_fresh();
        if let Some(tr) = self.seq.transition() {
            // The environment's contribution is whatever of the new input
            // the chosen output does not explain.
            let env_action = tr.input - (tr.pre_input + tr.pre_output);
            self.memory
                .record_transition(tr.pre_input, tr.pre_output, env_action, tr.input);
        }
        if fresh {
            self.memory.ensure_state(cur_state).count += 1;
            self.memory.set_last_pair(cur_state, cur_action);
        }

        if self.mode == Mode::Teach {
            return;
        }

        self.memory.ensure_state(cur_state).original_payoff = original_payoff;
        let delta = self.memory.refresh_state(cur_state);
        if delta.abs() >= self.memory.threshold() {
            self.propagate_from(cur_state);
        }
    }
}
