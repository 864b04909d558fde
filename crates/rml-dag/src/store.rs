//! The per-replica DAG store.
//!
//! Holds the forward map (id -> entry), the ordered reverse map
//! (id -> children), the frontier (ids without local children) and the
//! compacted boundary (ids whose entry has been discarded but which
//! live entries still reference as parents).

use crate::entry::{Entry, Payload};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The entry's id does not match its contents.
    #[error("id mismatch for entry {}", .0.short())]
    HashMismatch(Hash),

    /// An inserted entry references a parent that is neither live nor
    /// compacted.
    #[error("unknown parent {}", .0.short())]
    MissingParent(Hash),
}

/// Counters describing the current shape of the store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries currently held live.
    pub live_entries: usize,
    /// Ids currently retained on the compacted boundary.
    pub compacted_ids: usize,
    /// Current number of tips.
    pub frontier_size: usize,
    /// Entries physically discarded over the store's lifetime.
    pub total_compacted: u64,
}

/// Content-addressed DAG storage for one replica.
///
/// The store is the sole owner of entry objects; every other structure
/// holds ids. Child lists are kept sorted by id so that two replicas
/// holding the same content have bit-identical reverse maps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogStore {
    /// All live entries indexed by id.
    entries: HashMap<Hash, Entry>,

    /// Reverse index: parent -> children, each list sorted by id and
    /// duplicate-free. No entry is kept for childless ids.
    children: HashMap<Hash, Vec<Hash>>,

    /// Ids with no locally known children.
    frontier: BTreeSet<Hash>,

    /// Ids whose entry was discarded by compaction but which are still
    /// referenced as parents by live entries. Treated as existing and
    /// stable. Seeded with genesis: it is the initial compaction
    /// boundary.
    compacted: BTreeSet<Hash>,

    genesis_id: Hash,

    /// Running count of entries discarded by compaction.
    total_compacted: u64,
}

impl LogStore {
    /// Create a store holding only the stable genesis entry.
    pub fn new() -> Self {
        let genesis = Entry::genesis();
        let genesis_id = genesis.id;

        let mut entries = HashMap::new();
        entries.insert(genesis_id, genesis);

        LogStore {
            entries,
            children: HashMap::new(),
            frontier: BTreeSet::from([genesis_id]),
            compacted: BTreeSet::from([genesis_id]),
            genesis_id,
            total_compacted: 0,
        }
    }

    /// The id of the shared genesis entry.
    pub fn genesis_id(&self) -> Hash {
        self.genesis_id
    }

    /// Get a live entry by id.
    pub fn get(&self, id: &Hash) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Iterate over the live entries.
    pub fn iter(&self) -> impl Iterator<Item = (&Hash, &Entry)> {
        self.entries.iter()
    }

    /// True iff the id is live, compacted, or genesis.
    pub fn exists(&self, id: &Hash) -> bool {
        self.entries.contains_key(id) || self.compacted.contains(id) || *id == self.genesis_id
    }

    /// True iff the id sits on the compacted boundary.
    pub fn is_compacted(&self, id: &Hash) -> bool {
        self.compacted.contains(id)
    }

    /// True iff the id is stable per this replica's belief. Compacted
    /// ids are always stable.
    pub fn check_stable(&self, id: &Hash) -> bool {
        self.compacted.contains(id)
            || self.entries.get(id).map_or(false, |e| e.is_stable())
    }

    /// Flip a live entry's stability flag.
    pub fn mark_stable(&mut self, id: &Hash) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.mark_stable();
        }
    }

    /// Immediate children of an id, sorted.
    pub fn children_of(&self, id: &Hash) -> &[Hash] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True iff the id has at least one locally known child.
    pub fn has_children(&self, id: &Hash) -> bool {
        self.children.get(id).is_some_and(|c| !c.is_empty())
    }

    /// True iff the id has no locally known children.
    pub fn is_tip(&self, id: &Hash) -> bool {
        !self.has_children(id)
    }

    /// The current tip set.
    pub fn frontier(&self) -> &BTreeSet<Hash> {
        &self.frontier
    }

    /// The current tip set as a sorted vec.
    pub fn frontier_ids(&self) -> Vec<Hash> {
        self.frontier.iter().copied().collect()
    }

    /// Replace the frontier wholesale. Used by swap merging, which
    /// computes the converged tip set explicitly.
    pub fn set_frontier(&mut self, frontier: BTreeSet<Hash>) {
        self.frontier = frontier;
    }

    /// The compacted boundary.
    pub fn compacted(&self) -> &BTreeSet<Hash> {
        &self.compacted
    }

    /// Insert a verified remote entry.
    ///
    /// Requires the id to match the contents and every parent to exist
    /// (live or compacted). Re-inserting a known id is a no-op.
    pub fn insert(&mut self, entry: Entry) -> Result<Hash, StoreError> {
        if !entry.verify() {
            return Err(StoreError::HashMismatch(entry.id));
        }

        if self.exists(&entry.id) {
            return Ok(entry.id);
        }

        for parent in &entry.parents {
            if !self.exists(parent) {
                return Err(StoreError::MissingParent(*parent));
            }
        }

        let id = entry.id;
        self.link(entry);
        Ok(id)
    }

    /// Append a locally created entry on top of the current frontier.
    ///
    /// The new entry's parents are the frontier snapshot in id order;
    /// afterwards it is the sole tip. Returns the new id.
    pub fn append(&mut self, payload: Payload) -> Hash {
        let parents = self.frontier_ids();
        let entry = Entry::new(parents, payload);
        let id = entry.id;
        self.link(entry);
        id
    }

    /// Wire a new entry into both maps and update the frontier. The
    /// entry must be verified and its parents known.
    fn link(&mut self, entry: Entry) {
        let id = entry.id;
        for parent in &entry.parents {
            let kids = self.children.entry(*parent).or_default();
            if let Err(pos) = kids.binary_search(&id) {
                kids.insert(pos, id);
            }
            self.frontier.remove(parent);
        }
        // A brand-new entry has no children yet.
        self.frontier.insert(id);
        self.entries.insert(id, entry);
    }

    /// Traverse reverse parent pointers from `from`, collecting every
    /// id for which `include` holds and enqueueing the parents of
    /// included ids only.
    pub fn bfs<I, F>(&self, from: I, include: F) -> HashSet<Hash>
    where
        I: IntoIterator<Item = Hash>,
        F: Fn(&Hash) -> bool,
    {
        let mut queue: VecDeque<Hash> = from.into_iter().collect();
        let mut seen = HashSet::new();

        while let Some(id) = queue.pop_front() {
            if seen.contains(&id) || !include(&id) {
                continue;
            }
            seen.insert(id);
            if let Some(entry) = self.entries.get(&id) {
                queue.extend(entry.parents.iter().copied());
            }
        }

        seen
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters for reporting.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            live_entries: self.entries.len(),
            compacted_ids: self.compacted.len(),
            frontier_size: self.frontier.len(),
            total_compacted: self.total_compacted,
        }
    }

    // ---- compaction hooks -------------------------------------------------
    //
    // Used by the compactor while it folds a cog into the boundary.
    // Child lists are the single source of truth for "some live entry
    // references this id as a parent": an id leaves `compacted` exactly
    // when its child list empties.

    /// Remove the parent -> child edge. When the parent's child list
    /// empties, the list is dropped and a compacted parent is retired
    /// from the boundary.
    pub fn unlink_child(&mut self, parent: &Hash, child: &Hash) {
        let mut emptied = false;
        if let Some(kids) = self.children.get_mut(parent) {
            if let Ok(pos) = kids.binary_search(child) {
                kids.remove(pos);
            }
            emptied = kids.is_empty();
        }
        if emptied {
            self.children.remove(parent);
            self.compacted.remove(parent);
        }
    }

    /// Physically discard a live entry, returning it.
    pub fn evict(&mut self, id: &Hash) -> Option<Entry> {
        let removed = self.entries.remove(id);
        if removed.is_some() {
            self.total_compacted += 1;
        }
        removed
    }

    /// Retain an id on the compacted boundary.
    pub fn mark_compacted(&mut self, id: Hash) {
        self.compacted.insert(id);
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Two stores are equal iff their live id sets, their reverse maps
/// (keys and sorted child sequences) and their frontiers are equal.
/// This is the convergence criterion between replicas.
impl PartialEq for LogStore {
    fn eq(&self, other: &Self) -> bool {
        self.frontier == other.frontier
            && self.children == other.children
            && self.entries.len() == other.entries.len()
            && self.entries.keys().all(|id| other.entries.contains_key(id))
    }
}

impl Eq for LogStore {}
