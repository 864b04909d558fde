//! Integration tests for causal stability across replica fleets.

use rml_dag::Payload;
use rml_replica::Replica;
use uuid::Uuid;

fn fleet(n: usize) -> (Vec<Replica>, Vec<Uuid>) {
    let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
    let replicas = ids.iter().map(|id| Replica::new(*id, &ids)).collect();
    (replicas, ids)
}

fn swap(replicas: &mut [Replica], a: usize, b: usize) {
    let a_id = replicas[a].id();
    let b_id = replicas[b].id();
    let m1 = replicas[a].prepare_swap(&b_id).unwrap();
    let (m2, ack) = replicas[b].respond_to_swap(&a_id, &m1).unwrap();
    replicas[a].swap_final(&b_id, &m2).unwrap();
    replicas[b].complete_swap(ack).unwrap();
}

#[test]
fn test_genesis_is_born_stable_everywhere() {
    let (replicas, _) = fleet(3);
    for r in &replicas {
        assert!(r.check_stable(&r.store().genesis_id()));
    }
}

#[test]
fn test_local_appends_are_unstable_until_acknowledged() {
    let (mut replicas, _) = fleet(2);
    let n1 = replicas[0].append(Payload::data(vec![10]));
    assert!(!replicas[0].check_stable(&n1));

    swap(&mut replicas, 0, 1);
    assert!(replicas[0].check_stable(&n1));
    assert!(replicas[1].check_stable(&n1));

    // Fresh appends on either side start unstable again.
    let n4 = replicas[0].append(Payload::data(vec![30]));
    let n5 = replicas[1].append(Payload::data(vec![12]));
    assert!(!replicas[0].check_stable(&n4));
    assert!(!replicas[1].check_stable(&n5));
}

/// Stability propagates transitively: an entry becomes stable on a
/// replica only once *every* peer's believed frontier reaches it.
#[test]
fn test_three_replica_transitive_stability() {
    let (mut replicas, _) = fleet(3);
    let x = replicas[0].append(Payload::data(vec![10]));

    swap(&mut replicas, 0, 1);
    swap(&mut replicas, 0, 2);

    // Only the originator has seen acknowledgments from both peers.
    assert!(replicas[0].check_stable(&x));
    assert!(!replicas[1].check_stable(&x));
    assert!(!replicas[2].check_stable(&x));

    swap(&mut replicas, 1, 2);

    assert!(replicas[0].check_stable(&x));
    assert!(replicas[1].check_stable(&x));
    assert!(replicas[2].check_stable(&x));
}

/// A peer we have never exchanged with holds everything at genesis, so
/// nothing can stabilize until the first completed swap with it.
#[test]
fn test_unsynced_peer_blocks_stability() {
    let (mut replicas, _) = fleet(3);
    let x = replicas[0].append(Payload::data(vec![10]));

    // Repeated swaps with one peer are not enough.
    swap(&mut replicas, 0, 1);
    swap(&mut replicas, 0, 1);
    assert!(!replicas[0].check_stable(&x));

    swap(&mut replicas, 0, 2);
    assert!(replicas[0].check_stable(&x));
}

#[test]
fn test_stability_survives_interleaved_appends() {
    let (mut replicas, ids) = fleet(2);
    let n1 = replicas[0].append(Payload::data(vec![10]));
    let n2 = replicas[0].append(Payload::data(vec![11]));
    let n3 = replicas[1].append(Payload::data(vec![21]));

    // Appends land between every phase of the session.
    let m1 = replicas[0].prepare_swap(&ids[1]).unwrap();
    let a1 = replicas[0].append(Payload::data(vec![12]));
    let (m2, ack) = replicas[1].respond_to_swap(&ids[0], &m1).unwrap();
    let b1 = replicas[1].append(Payload::data(vec![22]));
    replicas[0].swap_final(&ids[1], &m2).unwrap();
    let a2 = replicas[0].append(Payload::data(vec![13]));
    replicas[1].complete_swap(ack).unwrap();

    // The pre-session entries stabilized on both sides; everything
    // injected mid-session did not.
    for id in [n1, n2, n3] {
        assert!(replicas[0].check_stable(&id), "{id} stable on initiator");
        assert!(replicas[1].check_stable(&id), "{id} stable on responder");
    }
    for id in [a1, a2] {
        assert!(!replicas[0].check_stable(&id));
    }
    assert!(!replicas[1].check_stable(&b1));

    // Nothing was lost: two more rounds converge the pair fully.
    swap(&mut replicas, 0, 1);
    swap(&mut replicas, 1, 0);
    assert_eq!(replicas[0], replicas[1]);
    for id in [a1, a2, b1] {
        assert!(replicas[0].check_stable(&id));
        assert!(replicas[1].check_stable(&id));
    }
}

/// check_stable never flips back, session after session.
#[test]
fn test_stability_is_monotonic_across_sessions() {
    let (mut replicas, _) = fleet(3);
    let mut observed: Vec<rml_dag::Hash> = Vec::new();

    for round in 0u8..4 {
        for i in 0..3 {
            observed.push(replicas[i].append(Payload::data(vec![round, i as u8])));
        }
        let stable_before: Vec<Vec<bool>> = replicas
            .iter()
            .map(|r| observed.iter().map(|id| r.check_stable(id)).collect())
            .collect();

        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            swap(&mut replicas, a, b);
        }

        for (r, before) in replicas.iter().zip(&stable_before) {
            for (id, was_stable) in observed.iter().zip(before) {
                if *was_stable {
                    assert!(r.check_stable(id), "stability regressed for {id}");
                }
            }
        }
    }
}
