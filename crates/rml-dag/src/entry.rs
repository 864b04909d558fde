//! Log entry definition.
//!
//! Each entry in the DAG carries:
//! - An id computed from its parents and payload
//! - References to parent entries (causal predecessors)
//! - An opaque payload
//! - A replica-local stability flag (monotonic false -> true)

use crate::hash::{Hash, IdDigest};
use serde::{Deserialize, Serialize};

/// The payload carried by a log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// The fixed sentinel payload of the genesis entry.
    Genesis,

    /// Opaque application bytes.
    Data(Vec<u8>),
}

impl Payload {
    /// Create a data payload.
    pub fn data(bytes: impl Into<Vec<u8>>) -> Self {
        Payload::Data(bytes.into())
    }

    /// Check if this is the genesis payload.
    pub fn is_genesis(&self) -> bool {
        matches!(self, Payload::Genesis)
    }

    /// Get the payload data as bytes (empty slice for Genesis).
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Genesis => &[],
            Payload::Data(data) => data,
        }
    }

    /// Payload type tag mixed into the hash.
    fn type_byte(&self) -> u8 {
        match self {
            Payload::Genesis => 0,
            Payload::Data(_) => 1,
        }
    }
}

/// A single record of the replicated log.
///
/// The id is computed from the parent ids and the payload, so it pins
/// the entire causal history beneath the entry. Any change to the
/// contents would change the id.
///
/// The `stable` flag is replica-local state and never travels on the
/// wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Content id - SHA-256 over the canonical entry encoding.
    pub id: Hash,

    /// Ids of parent entries. Empty only for genesis.
    pub parents: Vec<Hash>,

    /// The payload carried by this entry.
    pub payload: Payload,

    /// Whether every known peer has observed this entry, per this
    /// replica's belief.
    #[serde(skip)]
    stable: bool,
}

impl Entry {
    /// Build an entry, computing its id.
    pub fn new(parents: Vec<Hash>, payload: Payload) -> Self {
        let id = Self::compute_id(&parents, &payload);
        Entry {
            id,
            parents,
            payload,
            stable: false,
        }
    }

    /// The genesis entry. Identical on every replica and born stable.
    pub fn genesis() -> Self {
        let mut entry = Entry::new(Vec::new(), Payload::Genesis);
        entry.stable = true;
        entry
    }

    /// Check if this is the genesis entry.
    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty() && self.payload.is_genesis()
    }

    pub fn is_stable(&self) -> bool {
        self.stable
    }

    /// Flip the stability flag. One-way: there is no way back.
    pub fn mark_stable(&mut self) {
        self.stable = true;
    }

    /// Compute the id for an entry with the given contents. The
    /// canonical encoding lives in [`IdDigest`].
    fn compute_id(parents: &[Hash], payload: &Payload) -> Hash {
        let mut digest = IdDigest::new();
        digest.parents(parents);
        digest.tag(payload.type_byte());
        digest.payload(payload.as_bytes());
        digest.finish()
    }

    /// Verify that the id matches the entry's contents.
    pub fn verify(&self) -> bool {
        Self::compute_id(&self.parents, &self.payload) == self.id
    }
}
