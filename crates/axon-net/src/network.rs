//! The sharing network: member registry, mailboxes, and neighbor edges.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::channel::{Mailbox, Message, DEFAULT_POOL_CAPACITY};
use crate::error::NetError;
use crate::topology::Topology;
use crate::MemberId;

struct Member {
    mailbox: Arc<Mailbox>,
    /// Neighbour id -> sharing interval in agent ticks.
    neighbours: BTreeMap<MemberId, u64>,
}

/// A fixed-topology group of members exchanging byte payloads.
///
/// The network itself is passive: agents drive the sharing protocol and
/// decide what the payloads mean. Shared across threads as
/// `Arc<SharingNetwork>`; every mutating operation takes `&self`.
///
/// # Example
///
/// ```
/// use axon_net::SharingNetwork;
///
/// let net = SharingNetwork::new();
/// net.add_member(1);
/// net.add_member(2);
/// net.add_neighbour(1, 2, 3).unwrap();
///
/// assert_eq!(net.sharing_interval(1, 2).unwrap(), 3);
/// assert!(net.is_neighbour(1, 2));
/// assert!(!net.is_neighbour(2, 1)); // edges are directed
/// ```
pub struct SharingNetwork {
    members: RwLock<BTreeMap<MemberId, Member>>,
    pool_capacity: usize,
}

impl Default for SharingNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl SharingNetwork {
    /// Creates an empty network with the default mailbox capacity.
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Creates an empty network whose mailboxes hold up to `capacity`
    /// pending messages each.
    pub fn with_pool_capacity(capacity: usize) -> Self {
        Self {
            members: RwLock::new(BTreeMap::new()),
            pool_capacity: capacity.max(1),
        }
    }

    /// Registers a member, allocating its mailbox. Idempotent.
    pub fn add_member(&self, id: MemberId) {
        let mut members = self.members.write();
        members.entry(id).or_insert_with(|| Member {
            mailbox: Arc::new(Mailbox::new(self.pool_capacity)),
            neighbours: BTreeMap::new(),
        });
    }

    /// Removes a member, its mailbox, and every edge touching it.
    pub fn remove_member(&self, id: MemberId) {
        let mut members = self.members.write();
        members.remove(&id);
        for member in members.values_mut() {
            member.neighbours.remove(&id);
        }
    }

    pub fn is_member(&self, id: MemberId) -> bool {
        self.members.read().contains_key(&id)
    }

    /// All member ids, ascending.
    pub fn members(&self) -> Vec<MemberId> {
        self.members.read().keys().copied().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.read().len()
    }

    /// Adds (or retunes) the directed edge `id -> nid`. The interval is in
    /// agent ticks; zero is clamped to 1.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownMember`] unless both ends are registered.
    pub fn add_neighbour(
        &self,
        id: MemberId,
        nid: MemberId,
        interval: u64,
    ) -> Result<(), NetError> {
        let mut members = self.members.write();
        if !members.contains_key(&nid) {
            return Err(NetError::UnknownMember(nid));
        }
        let member = members.get_mut(&id).ok_or(NetError::UnknownMember(id))?;
        member.neighbours.insert(nid, interval.max(1));
        Ok(())
    }

    /// Removes the directed edge `id -> nid`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownMember`] for an unregistered `id`.
    pub fn remove_neighbour(&self, id: MemberId, nid: MemberId) -> Result<(), NetError> {
        let mut members = self.members.write();
        let member = members.get_mut(&id).ok_or(NetError::UnknownMember(id))?;
        member.neighbours.remove(&nid);
        Ok(())
    }

    /// Changes the sharing interval of an existing edge.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::NotNeighbours`] if the edge does not exist.
    pub fn change_sharing_interval(
        &self,
        id: MemberId,
        nid: MemberId,
        interval: u64,
    ) -> Result<(), NetError> {
        let mut members = self.members.write();
        let member = members.get_mut(&id).ok_or(NetError::UnknownMember(id))?;
        match member.neighbours.get_mut(&nid) {
            Some(slot) => {
                *slot = interval.max(1);
                Ok(())
            }
            None => Err(NetError::NotNeighbours {
                member: id,
                neighbour: nid,
            }),
        }
    }

    /// Neighbours of a member with their intervals; empty for unknown ids.
    pub fn neighbours(&self, id: MemberId) -> Vec<(MemberId, u64)> {
        self.members
            .read()
            .get(&id)
            .map(|m| m.neighbours.iter().map(|(&n, &iv)| (n, iv)).collect())
            .unwrap_or_default()
    }

    pub fn is_neighbour(&self, id: MemberId, nid: MemberId) -> bool {
        self.members
            .read()
            .get(&id)
            .is_some_and(|m| m.neighbours.contains_key(&nid))
    }

    /// Sharing interval of the edge `id -> nid`.
    ///
    /// # Errors
    ///
    /// [`NetError::UnknownMember`] or [`NetError::NotNeighbours`].
    pub fn sharing_interval(&self, id: MemberId, nid: MemberId) -> Result<u64, NetError> {
        self.members
            .read()
            .get(&id)
            .ok_or(NetError::UnknownMember(id))?
            .neighbours
            .get(&nid)
            .copied()
            .ok_or(NetError::NotNeighbours {
                member: id,
                neighbour: nid,
            })
    }

    /// Enqueues `payload` into `to`'s mailbox and signals the receiver.
    /// Never blocks: a full mailbox drops its oldest message.
    ///
    /// Returns the number of bytes queued.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownMember`] unless both ends are registered.
    pub fn send(&self, from: MemberId, to: MemberId, payload: &[u8]) -> Result<usize, NetError> {
        let mailbox = {
            let members = self.members.read();
            if !members.contains_key(&from) {
                return Err(NetError::UnknownMember(from));
            }
            Arc::clone(&members.get(&to).ok_or(NetError::UnknownMember(to))?.mailbox)
        };
        mailbox.push(Message {
            sender: from,
            payload: payload.to_vec(),
        });
        Ok(payload.len())
    }

    /// Dequeues the next message addressed to `id`: the oldest overall for
    /// a `None` sender, otherwise the oldest from that sender. Non-blocking.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownMember`] for an unregistered `id`.
    pub fn recv(&self, id: MemberId, from: Option<MemberId>) -> Result<Option<Message>, NetError> {
        let mailbox = self.mailbox_of(id)?;
        Ok(mailbox.pop(from))
    }

    /// Number of messages pending for a member.
    pub fn pending(&self, id: MemberId) -> Result<usize, NetError> {
        Ok(self.mailbox_of(id)?.len())
    }

    /// Blocks until a message is pending for `id` or the timeout elapses.
    /// Returns whether a message was pending when the wait ended.
    pub fn wait_message(&self, id: MemberId, timeout: Duration) -> Result<bool, NetError> {
        let mailbox = self.mailbox_of(id)?;
        Ok(mailbox.wait(timeout))
    }

    /// Replaces the whole membership and topology from a description.
    /// All-or-nothing: on a parse error the network keeps its prior state.
    /// Existing mailboxes (and their pending messages) are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::MalformedTopology`] from the parse.
    pub fn load_topology(&self, text: &str) -> Result<(), NetError> {
        let topo = Topology::parse(text)?;
        let mut fresh = BTreeMap::new();
        for id in topo.member_ids() {
            fresh.insert(
                id,
                Member {
                    mailbox: Arc::new(Mailbox::new(self.pool_capacity)),
                    neighbours: topo.neighbours(id).into_iter().collect(),
                },
            );
        }
        *self.members.write() = fresh;
        Ok(())
    }

    /// Renders the current membership and topology in the description
    /// format [`Topology::parse`] accepts.
    pub fn dump_topology(&self) -> String {
        let members = self.members.read();
        Topology::from_members(
            members
                .iter()
                .map(|(&id, m)| (id, m.neighbours.clone()))
                .collect(),
        )
        .dump()
    }

    fn mailbox_of(&self, id: MemberId) -> Result<Arc<Mailbox>, NetError> {
        let members = self.members.read();
        Ok(Arc::clone(
            &members.get(&id).ok_or(NetError::UnknownMember(id))?.mailbox,
        ))
    }
}
