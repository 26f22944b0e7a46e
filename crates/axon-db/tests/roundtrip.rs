//! Integration test: agent memory survives a dump/load round trip through
//! every backend.

use axon_agent::Agent;
use axon_core::OutputSpace;
use axon_db::{BinBackend, JsonBackend, MemBackend};

fn single(action: i64) -> OutputSpace {
    let mut space = OutputSpace::new();
    space.add(action);
    space
}

/// Walks a small deterministic trajectory so the graph has payoffs,
/// repeated transitions, and branching.
fn learned_agent() -> Agent {
    let mut agent = Agent::new(1, 0.9, 0.01).unwrap();
    agent.process(1, &single(5));
    agent.update(0.0);
    agent.process(2, &single(3));
    agent.update(1.0);
    agent.process(3, &single(1));
    agent.update(2.0);
    agent.process(1, &single(5));
    agent.update(0.5);
    agent.process(2, &single(4));
    agent.update(1.0);
    agent
}

fn assert_same_memory(a: &Agent, b: &Agent) {
    let (ma, mb) = (a.memory(), b.memory());
    assert_eq!(ma.state_count(), mb.state_count());
    assert_eq!(ma.link_count(), mb.link_count());
    assert_eq!(ma.last_pair(), mb.last_pair());
    assert!((ma.discount_rate() - mb.discount_rate()).abs() < 1e-6);
    assert!((ma.threshold() - mb.threshold()).abs() < 1e-6);
    for state in ma.states() {
        let (na, nb) = (ma.state(state).unwrap(), mb.state(state).unwrap());
        assert_eq!(na.count, nb.count, "count of state {state}");
        assert!(
            (na.payoff - nb.payoff).abs() < 1e-6,
            "payoff of state {state}"
        );
        assert!((na.original_payoff - nb.original_payoff).abs() < 1e-6);
        assert_eq!(ma.to_record(state), mb.to_record(state));
    }
}

#[test]
fn round_trip_through_mem_backend() {
    let agent = learned_agent();
    let mut backend = MemBackend::new();
    agent.dump_memory_to_storage(&mut backend).unwrap();

    // Different construction parameters: the dump's configuration wins.
    let mut restored = Agent::new(2, 0.5, 0.5).unwrap();
    restored.load_memory_from_storage(&mut backend).unwrap();
    assert_same_memory(&agent, &restored);
}

#[test]
fn round_trip_through_bin_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.axon");

    let agent = learned_agent();
    let mut writer = BinBackend::new(&path);
    agent.dump_memory_to_storage(&mut writer).unwrap();

    let mut reader = BinBackend::new(&path);
    let mut restored = Agent::new(2, 0.5, 0.5).unwrap();
    restored.load_memory_from_storage(&mut reader).unwrap();
    assert_same_memory(&agent, &restored);
}

#[test]
fn round_trip_through_json_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");

    let agent = learned_agent();
    let mut writer = JsonBackend::new(&path);
    agent.dump_memory_to_storage(&mut writer).unwrap();

    let mut reader = JsonBackend::new(&path);
    let mut restored = Agent::new(2, 0.5, 0.5).unwrap();
    restored.load_memory_from_storage(&mut reader).unwrap();
    assert_same_memory(&agent, &restored);
}

#[test]
fn load_failure_leaves_graph_and_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let mut missing = BinBackend::new(dir.path().join("absent.axon"));

    let mut agent = learned_agent();
    let states_before = agent.memory().state_count();
    assert!(agent.load_memory_from_storage(&mut missing).is_err());
    assert_eq!(agent.memory().state_count(), states_before);
}

#[test]
fn learning_resumes_after_reload() {
    let agent = learned_agent();
    let mut backend = MemBackend::new();
    agent.dump_memory_to_storage(&mut backend).unwrap();

    let mut restored = Agent::new(1, 0.9, 0.01).unwrap();
    restored.load_memory_from_storage(&mut backend).unwrap();

    // Keep learning: the next tick links from the dumped (2, 4) pair.
    restored.process(3, &single(1));
    restored.update(2.0);
    restored.process(4, &single(2));
    restored.update(0.0);

    assert!(restored.memory().contains(4));
    // Two fresh edges: (2,4) -> 3 from the resume point, then (3,1) -> 4.
    assert_eq!(restored.memory().link_count(), agent.memory().link_count() + 2);
    let resumed = restored.memory().state(2).unwrap();
    assert!(resumed.actions[&4].links.iter().any(|l| l.next_state == 3));
}

#[test]
fn binary_and_json_dumps_agree() {
    let dir = tempfile::tempdir().unwrap();
    let agent = learned_agent();

    let mut bin = BinBackend::new(dir.path().join("m.axon"));
    let mut json = JsonBackend::new(dir.path().join("m.json"));
    agent.dump_memory_to_storage(&mut bin).unwrap();
    agent.dump_memory_to_storage(&mut json).unwrap();

    let mut from_bin = Agent::new(3, 0.1, 0.1).unwrap();
    let mut from_json = Agent::new(4, 0.2, 0.2).unwrap();
    from_bin
        .load_memory_from_storage(&mut BinBackend::new(dir.path().join("m.axon")))
        .unwrap();
    from_json
        .load_memory_from_storage(&mut JsonBackend::new(dir.path().join("m.json")))
        .unwrap();
    assert_same_memory(&from_bin, &from_json);
}
