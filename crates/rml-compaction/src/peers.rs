//! The peer-frontier table.
//!
//! For every other known replica this records the frontier we believe
//! that peer last acknowledged. It advances only at swap commit points
//! (finalization on the initiator, ack delivery on the responder), so
//! each stored frontier moves strictly forward in causal order.

use rml_dag::Hash;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Believed tip sets of every other known replica.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerFrontiers {
    frontiers: HashMap<Uuid, BTreeSet<Hash>>,
}

impl PeerFrontiers {
    /// Build the table for a replica. Every configured peer starts at
    /// `{genesis}`; the replica's own uuid is filtered out.
    pub fn new(my_uuid: Uuid, peer_uuids: &[Uuid], genesis_id: Hash) -> Self {
        let frontiers = peer_uuids
            .iter()
            .filter(|uuid| **uuid != my_uuid)
            .map(|uuid| (*uuid, BTreeSet::from([genesis_id])))
            .collect();
        PeerFrontiers { frontiers }
    }

    /// Whether the peer was configured at construction.
    pub fn known(&self, peer: &Uuid) -> bool {
        self.frontiers.contains_key(peer)
    }

    /// The believed frontier of a peer.
    pub fn get(&self, peer: &Uuid) -> Option<&BTreeSet<Hash>> {
        self.frontiers.get(peer)
    }

    /// Replace a known peer's believed frontier. Returns false for an
    /// unconfigured peer, leaving the table untouched.
    pub fn set(&mut self, peer: &Uuid, frontier: BTreeSet<Hash>) -> bool {
        match self.frontiers.get_mut(peer) {
            Some(slot) => {
                *slot = frontier;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &BTreeSet<Hash>)> {
        self.frontiers.iter()
    }

    /// Ids referenced by any believed frontier.
    pub fn all_roots(&self) -> BTreeSet<Hash> {
        self.frontiers.values().flatten().copied().collect()
    }

    pub fn peer_count(&self) -> usize {
        self.frontiers.len()
    }
}
