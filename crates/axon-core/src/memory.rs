//! The experience graph — states, actions, and observed transitions.
//!
//! The graph is an arena keyed by state id. Links refer to their target by
//! id, never by reference, so a link may point at a state that has not been
//! experienced yet (or was deleted); such targets resolve to a zero-payoff
//! stub wherever a payoff is needed.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::CoreError;
use crate::record::{ActionBlock, LinkRecord, MemoryInfo, StateRecord};
use crate::{Action, EnvAction, State, INVALID_ACTION, INVALID_STATE};

/// One observed environment response to taking an action from a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvLink {
    pub env_action: EnvAction,
    /// How many times this exact transition has been observed.
    pub count: u32,
    /// Target state id. Non-owning: the target may not exist.
    pub next_state: State,
}

/// An action performed under a state, with its observed responses and a
/// cached payoff estimate used for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionNode {
    /// Highest payoff among the states this action's links lead to.
    pub payoff: f32,
    pub links: Vec<EnvLink>,
}

/// One experienced state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateNode {
    /// Last raw payoff signal received while in this state.
    pub original_payoff: f32,
    /// Discounted, propagated payoff.
    pub payoff: f32,
    /// Visit count.
    pub count: u32,
    pub actions: BTreeMap<Action, ActionNode>,
}

impl StateNode {
    fn fresh() -> Self {
        Self {
            original_payoff: 0.0,
            payoff: 0.0,
            count: 0,
            actions: BTreeMap::new(),
        }
    }
}

/// The agent's memory: an id-addressed arena of [`StateNode`]s plus the
/// aggregate metadata that travels with a dump.
///
/// # Example
///
/// ```
/// use axon_core::MemoryGraph;
///
/// let mut memory = MemoryGraph::new(0.9, 0.01).unwrap();
/// memory.record_transition(1, 5, -4, 2);
/// assert_eq!(memory.state_count(), 2);
/// assert_eq!(memory.link_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    discount_rate: f32,
    threshold: f32,
    states: BTreeMap<State, StateNode>,
    link_count: u32,
    last_state: State,
    last_action: Action,
    /// Reverse adjacency: which states link into a given state. Maintained
    /// online, rebuilt from records on load; not part of the dump.
    backlinks: BTreeMap<State, BTreeSet<State>>,
}

impl MemoryGraph {
    /// Creates an empty graph.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DiscountRate`] unless `discount_rate` lies in
    /// `[0, 1)`, and [`CoreError::Threshold`] for a negative `threshold`.
    pub fn new(discount_rate: f32, threshold: f32) -> Result<Self, CoreError> {
        if !(0.0..1.0).contains(&discount_rate) {
            return Err(CoreError::DiscountRate(discount_rate));
        }
        if threshold < 0.0 || threshold.is_nan() {
            return Err(CoreError::Threshold(threshold));
        }
        Ok(Self {
            discount_rate,
            threshold,
            states: BTreeMap::new(),
            link_count: 0,
            last_state: INVALID_STATE,
            last_action: INVALID_ACTION,
            backlinks: BTreeMap::new(),
        })
    }

    pub fn discount_rate(&self) -> f32 {
        self.discount_rate
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Number of states in the arena.
    pub fn state_count(&self) -> u32 {
        self.states.len() as u32
    }

    /// Total number of links across all states.
    pub fn link_count(&self) -> u32 {
        self.link_count
    }

    /// The most recently processed (state, action) pair.
    pub fn last_pair(&self) -> (State, Action) {
        (self.last_state, self.last_action)
    }

    pub fn set_last_pair(&mut self, state: State, action: Action) {
        self.last_state = state;
        self.last_action = action;
    }

    pub fn contains(&self, state: State) -> bool {
        self.states.contains_key(&state)
    }

    pub fn state(&self, state: State) -> Option<&StateNode> {
        self.states.get(&state)
    }

    pub fn state_mut(&mut self, state: State) -> Option<&mut StateNode> {
        self.states.get_mut(&state)
    }

    /// Iterates all state ids in ascending order.
    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        self.states.keys().copied()
    }

    /// Returns the node for `state`, creating a fresh zero-payoff node on
    /// first contact.
    pub fn ensure_state(&mut self, state: State) -> &mut StateNode {
        self.states.entry(state).or_insert_with(StateNode::fresh)
    }

    /// Payoff of a state, resolving unknown ids to a zero-payoff stub.
    pub fn payoff_of(&self, state: State) -> f32 {
        self.states.get(&state).map_or(0.0, |n| n.payoff)
    }

    /// Cached payoff estimate for an action under a state, if any history
    /// has been recorded.
    pub fn action_payoff(&self, state: State, action: Action) -> Option<f32> {
        self.states
            .get(&state)?
            .actions
            .get(&action)
            .map(|a| a.payoff)
    }

    /// States with a recorded link into `state`.
    pub fn predecessors(&self, state: State) -> Vec<State> {
        self.backlinks
            .get(&state)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Records one observed transition `(state, action) -> next_state`.
    ///
    /// Re-observing the exact same transition increments its count instead
    /// of growing the graph. Both endpoints are created on demand.
    pub fn record_transition(
        &mut self,
        state: State,
        action: Action,
        env_action: EnvAction,
        next_state: State,
    ) {
        self.ensure_state(next_state);
        let node = self.states.entry(state).or_insert_with(StateNode::fresh);
        let act = node.actions.entry(action).or_insert_with(|| ActionNode {
            payoff: 0.0,
            links: Vec::new(),
        });
        let known = act
            .links
            .iter()
            .position(|l| l.env_action == env_action && l.next_state == next_state);
        match known {
            Some(index) => act.links[index].count += 1,
            None => {
                act.links.push(EnvLink {
                    env_action,
                    count: 1,
                    next_state,
                });
                self.link_count += 1;
                self.backlinks.entry(next_state).or_default().insert(state);
            }
        }
    }

    /// Recomputes the cached action payoffs of `state` from the current
    /// payoffs of its link targets. Does not touch the state's own payoff.
    pub fn refresh_actions(&mut self, state: State) {
        let Some(node) = self.states.get(&state) else {
            return;
        };
        let refreshed: Vec<(Action, f32)> = node
            .actions
            .iter()
            .filter(|(_, a)| !a.links.is_empty())
            .map(|(&action, a)| {
                let best = a
                    .links
                    .iter()
                    .map(|l| self.payoff_of(l.next_state))
                    .fold(f32::NEG_INFINITY, f32::max);
                (action, best)
            })
            .collect();
        let node = self.states.get_mut(&state).expect("checked above");
        for (action, payoff) in refreshed {
            node.actions.get_mut(&action).expect("came from node").payoff = payoff;
        }
    }

    /// Refreshes `state`'s action payoffs and recomputes its own payoff as
    /// `original + discount_rate * max(next payoffs)`, falling back to the
    /// original payoff alone when no links exist yet.
    ///
    /// Returns the change in the state's payoff.
    pub fn refresh_state(&mut self, state: State) -> f32 {
        self.refresh_actions(state);
        let dr = self.discount_rate;
        let Some(node) = self.states.get_mut(&state) else {
            return 0.0;
        };
        let best_next = node
            .actions
            .values()
            .filter(|a| !a.links.is_empty())
            .map(|a| a.payoff)
            .fold(f32::NEG_INFINITY, f32::max);
        let new = if best_next == f32::NEG_INFINITY {
            node.original_payoff
        } else {
            node.original_payoff + dr * best_next
        };
        let delta = new - node.payoff;
        node.payoff = new;
        delta
    }

    /// Removes a state and its outgoing links.
    ///
    /// Inbound links from other states stay in place; they resolve to a
    /// zero-payoff stub until the state is experienced again.
    /// Returns `false` if the state was unknown.
    pub fn delete_state(&mut self, state: State) -> bool {
        let Some(node) = self.states.remove(&state) else {
            return false;
        };
        for act in node.actions.values() {
            self.link_count -= act.links.len() as u32;
            for link in &act.links {
                if let Some(preds) = self.backlinks.get_mut(&link.next_state) {
                    preds.remove(&state);
                }
            }
        }
        if self.last_state == state {
            self.last_state = INVALID_STATE;
            self.last_action = INVALID_ACTION;
        }
        true
    }

    /// Portable snapshot of one state, or `None` for an unknown id.
    pub fn to_record(&self, state: State) -> Option<StateRecord> {
        let node = self.states.get(&state)?;
        Some(StateRecord {
            state,
            original_payoff: node.original_payoff,
            payoff: node.payoff,
            count: node.count,
            actions: node
                .actions
                .iter()
                .map(|(&action, a)| ActionBlock {
                    action,
                    links: a
                        .links
                        .iter()
                        .map(|l| LinkRecord {
                            env_action: l.env_action,
                            count: l.count,
                            next_state: l.next_state,
                        })
                        .collect(),
                })
                .collect(),
        })
    }

    /// Inserts a record wholesale, replacing any existing node for the same
    /// state. Link and backlink bookkeeping is kept consistent.
    pub fn insert_record(&mut self, record: &StateRecord) {
        if self.states.contains_key(&record.state) {
            self.unlink_state(record.state);
        }
        let mut actions = BTreeMap::new();
        for block in &record.actions {
            let links: Vec<EnvLink> = block
                .links
                .iter()
                .map(|l| EnvLink {
                    env_action: l.env_action,
                    count: l.count,
                    next_state: l.next_state,
                })
                .collect();
            self.link_count += links.len() as u32;
            for link in &links {
                self.backlinks
                    .entry(link.next_state)
                    .or_default()
                    .insert(record.state);
            }
            actions.insert(
                block.action,
                ActionNode {
                    payoff: 0.0,
                    links,
                },
            );
        }
        self.states.insert(
            record.state,
            StateNode {
                original_payoff: record.original_payoff,
                payoff: record.payoff,
                count: record.count,
                actions,
            },
        );
        self.refresh_actions(record.state);
    }

    /// Merges a record received from another agent.
    ///
    /// Unseen states insert wholesale. For a known state the policy is:
    /// counts sum (state visits and per-link observations), the original
    /// payoff averages, and the state payoff is then refreshed from the
    /// merged links. This is the extension point for alternative merge
    /// strategies.
    pub fn merge_record(&mut self, record: &StateRecord) {
        if !self.states.contains_key(&record.state) {
            self.insert_record(record);
            return;
        }

        let state = record.state;
        {
            let node = self.states.get_mut(&state).expect("checked above");
            node.count += record.count;
            node.original_payoff = (node.original_payoff + record.original_payoff) / 2.0;
        }
        for block in &record.actions {
            for link in &block.links {
                let node = self.states.get_mut(&state).expect("checked above");
                let act = node
                    .actions
                    .entry(block.action)
                    .or_insert_with(|| ActionNode {
                        payoff: 0.0,
                        links: Vec::new(),
                    });
                let known = act
                    .links
                    .iter()
                    .position(|l| l.env_action == link.env_action && l.next_state == link.next_state);
                match known {
                    Some(index) => act.links[index].count += link.count,
                    None => {
                        act.links.push(EnvLink {
                            env_action: link.env_action,
                            count: link.count,
                            next_state: link.next_state,
                        });
                        self.link_count += 1;
                        self.backlinks.entry(link.next_state).or_default().insert(state);
                    }
                }
            }
        }
        self.refresh_state(state);
    }

    /// Aggregate metadata for a dump.
    pub fn memory_info(&self) -> MemoryInfo {
        MemoryInfo {
            discount_rate: self.discount_rate,
            threshold: self.threshold,
            state_count: self.state_count(),
            link_count: self.link_count,
            last_state: self.last_state,
            last_action: self.last_action,
        }
    }

    /// Adopts the configuration and resume point of a loaded dump.
    ///
    /// # Errors
    ///
    /// Rejects out-of-range discount rate or threshold, leaving the graph
    /// unchanged.
    pub fn apply_info(&mut self, info: &MemoryInfo) -> Result<(), CoreError> {
        if !(0.0..1.0).contains(&info.discount_rate) {
            return Err(CoreError::DiscountRate(info.discount_rate));
        }
        if info.threshold < 0.0 || info.threshold.is_nan() {
            return Err(CoreError::Threshold(info.threshold));
        }
        self.discount_rate = info.discount_rate;
        self.threshold = info.threshold;
        self.last_state = info.last_state;
        self.last_action = info.last_action;
        Ok(())
    }

    /// Removes a state's outgoing contributions from the aggregate counts
    /// and the reverse index, keeping the node itself.
    fn unlink_state(&mut self, state: State) {
        let Some(node) = self.states.get(&state) else {
            return;
        };
        let targets: Vec<(State, u32)> = node
            .actions
            .values()
            .flat_map(|a| a.links.iter().map(|l| (l.next_state, 1u32)))
            .collect();
        for (target, n) in targets {
            self.link_count -= n;
            if let Some(preds) = self.backlinks.get_mut(&target) {
                preds.remove(&state);
            }
        }
    }
}
