//! Causal stability tracking.
//!
//! An entry is stable once it is transitively reachable from every
//! known peer's believed frontier: at that point every peer has
//! acknowledged it, and nothing above it can ever contradict it.

use crate::peers::PeerFrontiers;
use rml_dag::{Hash, LogStore};
use std::collections::HashSet;
use tracing::debug;

/// Mark every entry reachable from the local frontier *and* from every
/// peer's believed frontier as stable. Returns the newly stabilized
/// ids in sorted order.
///
/// The walk collects only not-yet-stable ids, so already-stable regions
/// are never re-traversed. A peer whose believed frontier is entirely
/// stable (notably `{genesis}` before the first completed swap)
/// contributes an empty set and blocks stabilization: an entry is only
/// ever stable with respect to peers we have actually exchanged with.
pub fn update_stability(store: &mut LogStore, peers: &PeerFrontiers) -> Vec<Hash> {
    let mut shared: HashSet<Hash> = store.bfs(
        store.frontier().iter().copied(),
        |id| !store.check_stable(id),
    );

    for (_peer, believed) in peers.iter() {
        if shared.is_empty() {
            break;
        }
        let reachable = store.bfs(believed.iter().copied(), |id| !store.check_stable(id));
        shared.retain(|id| reachable.contains(id));
    }

    let mut newly: Vec<Hash> = shared.into_iter().collect();
    newly.sort_unstable();
    for id in &newly {
        store.mark_stable(id);
    }
    if !newly.is_empty() {
        debug!(count = newly.len(), "entries became stable");
    }
    newly
}
