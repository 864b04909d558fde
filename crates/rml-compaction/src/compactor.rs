//! DAG compaction.
//!
//! Compaction advances a boundary into the stable prefix of the DAG,
//! physically discarding interior entries. An id stays behind on the
//! boundary exactly as long as some live entry still lists it as a
//! parent, so incoming deltas that reference it keep verifying.

use rml_dag::{Hash, LogStore};
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, info};

/// Live entries all of whose parents already lie on the compacted
/// boundary. These are the candidates for the next compaction pass.
pub fn compact_frontier(store: &LogStore) -> BTreeSet<Hash> {
    let mut frontier = BTreeSet::new();
    for boundary in store.compacted() {
        for child in store.children_of(boundary) {
            let eligible = store
                .get(child)
                .is_some_and(|e| e.parents.iter().all(|p| store.is_compacted(p)));
            if eligible {
                frontier.insert(*child);
            }
        }
    }
    frontier
}

/// The next block of entries eligible for compaction: grown forward
/// from the compact frontier, absorbing a child only once all of its
/// parents are compacted or already in the block.
///
/// Reaching any unstable id empties the whole cog: compaction never
/// crosses unstable entries. Ids in `protected` (the local frontier
/// and every believed peer frontier) are skipped without being
/// absorbed, which stops growth past them and keeps every id the
/// protocol still advertises as a root alive.
pub fn next_cog(store: &LogStore, protected: &BTreeSet<Hash>) -> BTreeSet<Hash> {
    let mut queue: VecDeque<Hash> = compact_frontier(store).into_iter().collect();
    let mut cog = BTreeSet::new();

    while let Some(id) = queue.pop_front() {
        if cog.contains(&id) || protected.contains(&id) {
            continue;
        }
        if !store.check_stable(&id) {
            return BTreeSet::new();
        }
        cog.insert(id);

        for child in store.children_of(&id) {
            let absorbed = store.get(child).is_some_and(|e| {
                e.parents
                    .iter()
                    .all(|p| store.is_compacted(p) || cog.contains(p))
            });
            if absorbed {
                queue.push_back(*child);
            }
        }
    }

    debug!(size = cog.len(), "computed next cog");
    cog
}

/// Fold a cog into the compacted boundary.
///
/// For each member: its parent edges are removed (retiring a boundary
/// parent whose last child disappears), its entry is discarded, and
/// its id is retained on the boundary iff a live entry still
/// references it as a parent. Returns the number of discarded entries.
pub fn compact(store: &mut LogStore, cog: &BTreeSet<Hash>) -> usize {
    if cog.is_empty() {
        return 0;
    }

    let mut evicted = 0;
    for id in cog {
        let Some(entry) = store.evict(id) else { continue };
        for parent in &entry.parents {
            store.unlink_child(parent, id);
        }
        if store.has_children(id) {
            store.mark_compacted(*id);
        }
        evicted += 1;
    }

    info!(
        evicted,
        boundary = store.compacted().len(),
        "compacted stable prefix"
    );
    evicted
}
