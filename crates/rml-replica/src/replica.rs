//! The replica state machine.
//!
//! A replica is a sequential state machine: every operation runs to
//! completion without suspension points, and nothing here blocks on
//! I/O. Delivering the messages produced by the swap methods is the
//! transport layer's job.

use crate::error::SwapError;
use crate::protocol::{apply_delta, verify_message, Delta, SwapAck, SwapMessage};
use rml_compaction::{compact, next_cog, update_stability, PeerFrontiers};
use rml_dag::{Hash, LogStore, Payload};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Construction options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReplicaConfig {
    /// Run compaction automatically after every stability pass.
    pub enable_compaction: bool,
}

/// One peer of the replicated log.
///
/// Holds the DAG store and the per-peer believed frontiers. Two
/// replicas compare equal when their DAG content has converged: same
/// live ids, same reverse maps, same tips.
#[derive(Clone, Debug)]
pub struct Replica {
    id: Uuid,
    store: LogStore,
    peers: PeerFrontiers,
    config: ReplicaConfig,
}

impl Replica {
    /// Create a replica whose DAG is a single stable genesis. The
    /// peer set may include `my_uuid`; it is ignored.
    pub fn new(my_uuid: Uuid, peer_uuids: &[Uuid]) -> Self {
        Self::with_config(my_uuid, peer_uuids, ReplicaConfig::default())
    }

    pub fn with_config(my_uuid: Uuid, peer_uuids: &[Uuid], config: ReplicaConfig) -> Self {
        let store = LogStore::new();
        let peers = PeerFrontiers::new(my_uuid, peer_uuids, store.genesis_id());
        Replica {
            id: my_uuid,
            store,
            peers,
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// The current local tip set.
    pub fn frontier(&self) -> &BTreeSet<Hash> {
        self.store.frontier()
    }

    /// The frontier we believe `peer` last acknowledged.
    pub fn peer_frontier(&self, peer: &Uuid) -> Option<&BTreeSet<Hash>> {
        self.peers.get(peer)
    }

    /// Append a new entry causally succeeding everything observed so
    /// far. Returns its id.
    pub fn append(&mut self, payload: Payload) -> Hash {
        let id = self.store.append(payload);
        debug!(replica = %self.id, entry = %id.short(), "appended");
        id
    }

    /// Whether `id` is stable per this replica's belief.
    pub fn check_stable(&self, id: &Hash) -> bool {
        self.store.check_stable(id)
    }

    /// Phase 1: compute the delta for `peer` from the frontier
    /// difference. Mutates nothing; the same call can be repeated
    /// after an abandoned session.
    pub fn prepare_swap(&self, peer: &Uuid) -> Result<SwapMessage, SwapError> {
        let believed = self.peers.get(peer).ok_or(SwapError::UnknownPeer(*peer))?;

        let wanted = self.store.bfs(self.store.frontier().iter().copied(), |id| {
            !believed.contains(id) && !self.store.is_compacted(id)
        });
        let delta = self.collect(wanted);

        debug!(replica = %self.id, peer = %peer, entries = delta.len(), "prepared swap");
        Ok(SwapMessage {
            delta,
            roots: self.store.frontier().clone(),
        })
    }

    /// Phase 2: merge the initiator's delta, reply with our own
    /// unacknowledged work, and stage the deferred commit.
    ///
    /// Our belief about the initiator is *not* advanced here; that
    /// happens only when the returned token reaches
    /// [`Replica::complete_swap`], i.e. once the initiator confirmed
    /// the reply arrived.
    pub fn respond_to_swap(
        &mut self,
        from: &Uuid,
        msg: &SwapMessage,
    ) -> Result<(SwapMessage, SwapAck), SwapError> {
        let believed = self
            .peers
            .get(from)
            .ok_or(SwapError::UnknownPeer(*from))?
            .clone();
        verify_message(&self.store, msg)?;

        let pre_merge = self.store.frontier_ids();
        let new_frontier = self.integrate(msg)?;

        // Reply with local work the initiator has neither acknowledged
        // nor just sent itself, from the pre-merge tips.
        let wanted = self.store.bfs(pre_merge.iter().copied(), |id| {
            !believed.contains(id) && !msg.roots.contains(id) && !self.store.is_compacted(id)
        });
        let delta = self.collect(wanted);

        self.store.set_frontier(new_frontier.clone());
        debug!(replica = %self.id, peer = %from, entries = delta.len(), "responded to swap");

        let reply = SwapMessage {
            delta,
            roots: new_frontier.clone(),
        };
        let ack = SwapAck {
            peer: *from,
            frontier: new_frontier,
        };
        Ok((reply, ack))
    }

    /// Phase 3: merge the responder's reply and commit our belief
    /// about its frontier, then run stability.
    pub fn swap_final(&mut self, from: &Uuid, msg: &SwapMessage) -> Result<(), SwapError> {
        if !self.peers.known(from) {
            return Err(SwapError::UnknownPeer(*from));
        }
        verify_message(&self.store, msg)?;

        self.peers.set(from, msg.roots.clone());
        let new_frontier = self.integrate(msg)?;
        self.store.set_frontier(new_frontier);

        debug!(replica = %self.id, peer = %from, "finalized swap");
        self.run_stability();
        Ok(())
    }

    /// Commit the deferred responder-side update: the initiator's ack
    /// arrived, so the frontier snapshot captured at response time
    /// becomes our belief about it.
    pub fn complete_swap(&mut self, ack: SwapAck) -> Result<(), SwapError> {
        let peer = ack.peer;
        if !self.peers.set(&peer, ack.frontier) {
            return Err(SwapError::UnknownPeer(peer));
        }
        debug!(replica = %self.id, peer = %peer, "swap acknowledged");
        self.run_stability();
        Ok(())
    }

    /// Recompute stability from the current peer-frontier table.
    /// Returns the newly stabilized ids.
    pub fn update_stability(&mut self) -> Vec<Hash> {
        update_stability(&mut self.store, &self.peers)
    }

    /// The next block of entries eligible for compaction. Ids the
    /// protocol still advertises as roots (our tips and every believed
    /// peer frontier) are never part of it.
    pub fn next_cog(&self) -> BTreeSet<Hash> {
        let mut protected = self.peers.all_roots();
        protected.extend(self.store.frontier().iter().copied());
        next_cog(&self.store, &protected)
    }

    /// Fold a cog into the compacted boundary. No-op when empty.
    pub fn compact(&mut self, cog: &BTreeSet<Hash>) -> usize {
        compact(&mut self.store, cog)
    }

    /// Merge an incoming message and compute the converged tip set:
    /// tips both sides already agreed on, plus genuinely new remote
    /// tips, plus local tips the incoming entries did not cover.
    ///
    /// The delta is walked only when it introduces roots unknown
    /// locally; otherwise causal closure guarantees every carried
    /// entry already exists here.
    fn integrate(&mut self, msg: &SwapMessage) -> Result<BTreeSet<Hash>, SwapError> {
        let kept_shared: BTreeSet<Hash> = msg
            .roots
            .intersection(self.store.frontier())
            .copied()
            .collect();
        let new_remote: BTreeSet<Hash> = msg
            .roots
            .iter()
            .filter(|root| !self.store.exists(root))
            .copied()
            .collect();
        let local = self.store.frontier_ids();

        if !new_remote.is_empty() {
            apply_delta(&mut self.store, &msg.delta)?;
        }

        let kept_local = local.into_iter().filter(|id| self.store.is_tip(id));

        Ok(kept_shared
            .into_iter()
            .chain(new_remote)
            .chain(kept_local)
            .collect())
    }

    fn collect(&self, ids: HashSet<Hash>) -> Delta {
        ids.into_iter()
            .filter_map(|id| self.store.get(&id).map(|entry| (id, entry.clone())))
            .collect()
    }

    fn run_stability(&mut self) {
        update_stability(&mut self.store, &self.peers);
        if self.config.enable_compaction {
            let cog = self.next_cog();
            if !cog.is_empty() {
                self.compact(&cog);
            }
        }
    }
}

/// Replica equality is DAG convergence: same live ids, same reverse
/// maps, same tips.
impl PartialEq for Replica {
    fn eq(&self, other: &Self) -> bool {
        self.store == other.store
    }
}

impl Eq for Replica {}
