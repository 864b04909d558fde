//! Wire types and delta validation for the swap protocol.

use crate::error::SwapError;
use rml_dag::{Entry, Hash, LogStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

/// Entries one side believes the other lacks, keyed by id.
pub type Delta = BTreeMap<Hash, Entry>;

/// One half of the exchange: a delta plus the sender's advertised
/// roots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapMessage {
    pub delta: Delta,
    pub roots: BTreeSet<Hash>,
}

/// Deferred commit token returned by `respond_to_swap`.
///
/// Handing it back to [`crate::Replica::complete_swap`] records that
/// the initiator confirmed delivery; only then does the responder
/// advance its belief about the initiator's frontier. Dropping the
/// token abandons the session without side effect.
///
/// The token captures the frontier snapshot taken at response time,
/// not a live value, so interleaved sessions and local appends cannot
/// skew the commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapAck {
    pub(crate) peer: Uuid,
    pub(crate) frontier: BTreeSet<Hash>,
}

impl SwapAck {
    /// The peer whose frontier this token commits.
    pub fn peer(&self) -> Uuid {
        self.peer
    }
}

/// Validate an incoming message against the local store.
///
/// Every entry must hash to its key; every advertised root, and every
/// parent of an entry new to this side, must resolve inside the delta
/// or locally. Nothing is inserted here: verification fully precedes
/// application, so a failing message leaves no trace.
pub(crate) fn verify_message(store: &LogStore, msg: &SwapMessage) -> Result<(), SwapError> {
    for (id, entry) in &msg.delta {
        if entry.id != *id || !entry.verify() {
            return Err(SwapError::BadDelta(format!(
                "entry {} fails hash verification",
                id.short()
            )));
        }
        // Entries already held (live or on the boundary) were resolved
        // when they first arrived; a retransmission may legitimately
        // reference a parent this side has since retired.
        if store.exists(id) {
            continue;
        }
        for parent in &entry.parents {
            if !msg.delta.contains_key(parent) && !store.exists(parent) {
                return Err(SwapError::BadDelta(format!(
                    "entry {} references unknown parent {}",
                    id.short(),
                    parent.short()
                )));
            }
        }
    }
    for root in &msg.roots {
        if !msg.delta.contains_key(root) && !store.exists(root) {
            return Err(SwapError::BadDelta(format!(
                "advertised root {} is not covered",
                root.short()
            )));
        }
    }
    Ok(())
}

/// Insert a verified delta, parents before children.
///
/// Deltas are causally closed, so draining the pending queue makes
/// progress on every pass; entries already known locally are skipped.
pub(crate) fn apply_delta(store: &mut LogStore, delta: &Delta) -> Result<(), SwapError> {
    let mut pending: VecDeque<Entry> = delta
        .values()
        .filter(|e| !store.exists(&e.id))
        .cloned()
        .collect();

    while !pending.is_empty() {
        let round = pending.len();
        let mut progressed = false;
        for _ in 0..round {
            if let Some(entry) = pending.pop_front() {
                if entry.parents.iter().all(|p| store.exists(p)) {
                    store.insert(entry)?;
                    progressed = true;
                } else {
                    pending.push_back(entry);
                }
            }
        }
        if !progressed {
            return Err(SwapError::BadDelta("delta is not causally closed".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rml_dag::Payload;

    fn message(delta: Delta, roots: BTreeSet<Hash>) -> SwapMessage {
        SwapMessage { delta, roots }
    }

    #[test]
    fn test_verify_accepts_well_formed_delta() {
        let store = LogStore::new();
        let a = Entry::new(vec![store.genesis_id()], Payload::data(vec![1]));
        let b = Entry::new(vec![a.id], Payload::data(vec![2]));
        let roots = BTreeSet::from([b.id]);
        let delta = Delta::from([(a.id, a), (b.id, b)]);

        assert!(verify_message(&store, &message(delta, roots)).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_entry() {
        let store = LogStore::new();
        let mut a = Entry::new(vec![store.genesis_id()], Payload::data(vec![1]));
        a.payload = Payload::data(vec![9]);
        let delta = Delta::from([(a.id, a)]);

        let err = verify_message(&store, &message(delta, BTreeSet::new()));
        assert!(matches!(err, Err(SwapError::BadDelta(_))));
    }

    #[test]
    fn test_verify_rejects_mismatched_key() {
        let store = LogStore::new();
        let a = Entry::new(vec![store.genesis_id()], Payload::data(vec![1]));
        let wrong = Entry::new(vec![store.genesis_id()], Payload::data(vec![2])).id;
        let delta = Delta::from([(wrong, a)]);

        let err = verify_message(&store, &message(delta, BTreeSet::new()));
        assert!(matches!(err, Err(SwapError::BadDelta(_))));
    }

    #[test]
    fn test_verify_rejects_dangling_parent() {
        let store = LogStore::new();
        let ghost = Hash::digest(b"ghost");
        let a = Entry::new(vec![ghost], Payload::data(vec![1]));
        let delta = Delta::from([(a.id, a)]);

        let err = verify_message(&store, &message(delta, BTreeSet::new()));
        assert!(matches!(err, Err(SwapError::BadDelta(_))));
    }

    #[test]
    fn test_verify_rejects_uncovered_root() {
        let store = LogStore::new();
        let ghost = Hash::digest(b"ghost");

        let err = verify_message(&store, &message(Delta::new(), BTreeSet::from([ghost])));
        assert!(matches!(err, Err(SwapError::BadDelta(_))));
    }

    #[test]
    fn test_verify_tolerates_retransmitted_boundary_entries() {
        let mut store = LogStore::new();
        let a = store.append(Payload::data(vec![1]));
        let b = store.append(Payload::data(vec![2]));
        let _c = store.append(Payload::data(vec![3]));
        let b_entry = store.get(&b).unwrap().clone();

        // Fold a and b into the boundary; a's last child edge goes
        // with b, so a is fully retired.
        for id in [a, b] {
            let entry = store.evict(&id).unwrap();
            for parent in &entry.parents {
                store.unlink_child(parent, &id);
            }
            if store.has_children(&id) {
                store.mark_compacted(id);
            }
        }
        assert!(!store.exists(&a));
        assert!(store.is_compacted(&b));

        // A peer with a stale believed frontier re-sends b. Its parent
        // no longer resolves here, but b itself already sits on the
        // boundary; the session must not abort.
        let delta = Delta::from([(b, b_entry)]);
        let msg = message(delta, BTreeSet::from([b]));
        assert!(verify_message(&store, &msg).is_ok());
    }

    #[test]
    fn test_apply_inserts_parents_first() {
        let mut store = LogStore::new();
        let a = Entry::new(vec![store.genesis_id()], Payload::data(vec![1]));
        let b = Entry::new(vec![a.id], Payload::data(vec![2]));
        let c = Entry::new(vec![b.id], Payload::data(vec![3]));
        // BTreeMap iteration order is id order, not causal order.
        let delta = Delta::from([(c.id, c.clone()), (b.id, b.clone()), (a.id, a.clone())]);

        apply_delta(&mut store, &delta).unwrap();
        assert!(store.exists(&a.id) && store.exists(&b.id) && store.exists(&c.id));
        assert_eq!(store.frontier_ids(), vec![c.id]);
    }

    #[test]
    fn test_apply_skips_known_entries() {
        let mut store = LogStore::new();
        let a = store.append(Payload::data(vec![1]));
        let known = store.get(&a).unwrap().clone();
        let delta = Delta::from([(a, known)]);

        apply_delta(&mut store, &delta).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_entries_travel_without_stability_flag() {
        let store = LogStore::new();
        let mut a = Entry::new(vec![store.genesis_id()], Payload::data(vec![7]));
        a.mark_stable();

        // Entries travel as (id, parents, payload); the stability flag
        // stays replica-local and comes back down.
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("id").is_some());
        assert!(json.get("parents").is_some());
        assert!(json.get("payload").is_some());
        assert!(json.get("stable").is_none());

        let back: Entry = serde_json::from_value(json).unwrap();
        assert!(!back.is_stable());
        assert!(back.verify());
    }

    #[test]
    fn test_message_roundtrips_over_the_wire() {
        let store = LogStore::new();
        let a = Entry::new(vec![store.genesis_id()], Payload::data(vec![7]));
        let msg = message(Delta::from([(a.id, a.clone())]), BTreeSet::from([a.id]));

        let bytes = bincode::serialize(&msg).unwrap();
        let back: SwapMessage = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, msg);
    }
}
