//! Property-based tests for the DAG store invariants.

use proptest::prelude::*;
use rml_dag::{Entry, LogStore, Payload};

proptest! {
    /// Identical (parents, payload) always produce identical ids, and
    /// the id always verifies against the contents.
    #[test]
    fn id_is_deterministic(payload in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut store = LogStore::new();
        let g = store.genesis_id();
        let a = store.append(Payload::data(payload.clone()));

        let e1 = Entry::new(vec![g, a], Payload::data(payload.clone()));
        let e2 = Entry::new(vec![a, g], Payload::data(payload));
        prop_assert_eq!(e1.id, e2.id);
        prop_assert!(e1.verify());
    }

    /// Sibling entries inserted in arbitrary order leave the child
    /// list sorted and every sibling on the frontier.
    #[test]
    fn children_sorted_under_any_arrival_order(
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 1..8), 1..10),
        seed in any::<u64>(),
    ) {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut store = LogStore::new();
        let g = store.genesis_id();

        let mut siblings: Vec<Entry> = payloads
            .into_iter()
            .map(|p| Entry::new(vec![g], Payload::data(p)))
            .collect();
        siblings.sort_by_key(|e| e.id);
        siblings.dedup_by_key(|e| e.id);
        let expected: Vec<_> = siblings.iter().map(|e| e.id).collect();

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        siblings.shuffle(&mut rng);
        for entry in siblings {
            store.insert(entry).unwrap();
        }

        prop_assert_eq!(store.children_of(&g), expected.as_slice());
        for id in &expected {
            prop_assert!(store.frontier().contains(id));
        }
    }

    /// A run of appends keeps the frontier a singleton and every
    /// referenced parent known.
    #[test]
    fn append_run_preserves_invariants(
        payloads in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..8), 1..20),
    ) {
        let mut store = LogStore::new();
        let mut ids = vec![store.genesis_id()];

        for p in payloads {
            let id = store.append(Payload::data(p));
            prop_assert_eq!(store.frontier_ids(), vec![id]);
            ids.push(id);
        }

        for id in &ids {
            let entry = store.get(id).unwrap();
            prop_assert!(entry.verify());
            for parent in &entry.parents {
                prop_assert!(store.exists(parent));
            }
            // frontier membership <=> childless
            prop_assert_eq!(store.frontier().contains(id), store.is_tip(id));
        }
    }
}
