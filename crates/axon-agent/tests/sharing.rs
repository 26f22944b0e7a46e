//! Integration test: agents exchanging learned state records over a
//! sharing network.

use std::sync::Arc;
use std::time::Duration;

use axon_agent::Agent;
use axon_core::OutputSpace;
use axon_net::SharingNetwork;

fn single(action: i64) -> OutputSpace {
    let mut space = OutputSpace::new();
    space.add(action);
    space
}

#[test]
fn sharing_cadence_follows_the_intervals() {
    // Members {1, 2, 3}; member 2 shares to 1 every tick and to 3 every
    // second tick.
    let net = Arc::new(SharingNetwork::new());
    net.load_topology("1: 2@1\n2: 1@1 3@2\n3: 2@2\n").unwrap();

    let mut agent = Agent::new(2, 0.9, 0.01).unwrap();
    agent.join_sharing_network(Arc::clone(&net));

    agent.process(10, &single(1));
    agent.update(0.5);
    agent.process(11, &single(1));
    agent.update(0.5);

    // After 2 ticks: two sends to neighbour 1, one send to neighbour 3.
    assert_eq!(net.pending(1).unwrap(), 2);
    assert_eq!(net.pending(3).unwrap(), 1);
}

#[test]
fn received_records_merge_into_memory() {
    let net = Arc::new(SharingNetwork::new());
    net.load_topology("1: 2@1\n2: 1@1\n").unwrap();

    let mut teacher = Agent::new(1, 0.9, 0.01).unwrap();
    let mut learner = Agent::new(2, 0.9, 0.01).unwrap();
    teacher.join_sharing_network(Arc::clone(&net));
    learner.join_sharing_network(Arc::clone(&net));

    // The teacher learns state 10, sending its record to the learner.
    teacher.process(10, &single(4));
    teacher.update(1.5);
    assert_eq!(net.pending(2).unwrap(), 1);

    // The learner's own tick drains and merges the pending record.
    learner.process(500, &single(1));
    learner.update(0.0);

    assert!(learner.memory().contains(10));
    assert!((learner.memory().payoff_of(10) - 1.5).abs() < 1e-6);
    assert_eq!(net.pending(2).unwrap(), 0);
}

#[test]
fn leave_removes_the_member_and_its_edges() {
    let net = Arc::new(SharingNetwork::new());
    net.load_topology("1: 2@1\n2: 1@1\n").unwrap();

    let mut agent = Agent::new(1, 0.9, 0.01).unwrap();
    agent.join_sharing_network(Arc::clone(&net));
    assert!(agent.is_neighbour(2));

    agent.leave_sharing_network();
    assert!(!net.is_member(1));
    assert!(net.neighbours(2).is_empty());
    assert!(agent.neighbours().is_empty());
}

#[test]
fn neighbour_management_through_the_agent() {
    let net = Arc::new(SharingNetwork::new());
    net.add_member(7);

    let mut agent = Agent::new(1, 0.9, 0.01).unwrap();
    agent.join_sharing_network(Arc::clone(&net));

    agent.add_neighbour(7, 4);
    assert_eq!(agent.neighbours(), vec![(7, 4)]);

    agent.change_sharing_interval(7, 9);
    assert_eq!(net.sharing_interval(1, 7).unwrap(), 9);

    agent.remove_neighbour(7);
    assert!(agent.neighbours().is_empty());
}

#[test]
fn cross_thread_sharing_propagates_experience() {
    let net = Arc::new(SharingNetwork::new());
    net.load_topology("1: 2@1\n2: 1@1\n").unwrap();

    let worker_net = Arc::clone(&net);
    let worker = std::thread::spawn(move || {
        let mut agent = Agent::new(1, 0.9, 0.01).unwrap();
        agent.join_sharing_network(worker_net);
        for i in 0..10 {
            agent.process(100 + i, &single(1));
            agent.update(i as f32);
        }
        agent.memory().state_count()
    });

    let mut local = Agent::new(2, 0.9, 0.01).unwrap();
    local.join_sharing_network(Arc::clone(&net));

    let learned = worker.join().unwrap();
    assert_eq!(learned, 10);
    assert!(net.wait_message(2, Duration::from_secs(1)).unwrap());

    // One local tick drains the backlog of shared records.
    local.process(0, &single(1));
    local.update(0.0);

    assert!(local.memory().contains(109));
    let absorbed = (100..110).filter(|&s| local.memory().contains(s)).count();
    assert!(absorbed >= 9, "absorbed only {absorbed} shared states");
}
