//! Sardonyx demo runner.
//!
//! Drives fleets of replicas through append/swap/compaction rounds
//! and reports convergence and DAG-size statistics.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rml_dag::Payload;
use rml_replica::{Replica, ReplicaConfig, SwapError};
use tracing::info;
use uuid::Uuid;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None | Some("quick") => run_quick(),
        Some("churn") => run_churn(),
        Some("help") | Some("--help") | Some("-h") => print_usage(),
        Some(other) => {
            println!("Unknown suite: {}", other);
            print_usage();
        }
    }
}

fn print_usage() {
    println!("Usage: sardonyx [suite]");
    println!();
    println!("Available suites:");
    println!("  quick    - Scripted three-replica walkthrough (default)");
    println!("  churn    - Randomized four-replica churn with auto-compaction");
}

fn fleet(n: usize, enable_compaction: bool) -> Vec<Replica> {
    let ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
    let config = ReplicaConfig { enable_compaction };
    ids.iter()
        .map(|id| Replica::with_config(*id, &ids, config))
        .collect()
}

/// Run one full swap session between two replicas of the fleet.
fn swap(replicas: &mut [Replica], a: usize, b: usize) -> Result<(), SwapError> {
    let a_id = replicas[a].id();
    let b_id = replicas[b].id();
    let m1 = replicas[a].prepare_swap(&b_id)?;
    let (m2, ack) = replicas[b].respond_to_swap(&a_id, &m1)?;
    replicas[a].swap_final(&b_id, &m2)?;
    replicas[b].complete_swap(ack)?;
    Ok(())
}

fn report(replicas: &[Replica]) {
    println!(
        "  {:<10} {:>6} {:>9} {:>6} {:>10}",
        "replica", "live", "boundary", "tips", "discarded"
    );
    for r in replicas {
        let stats = r.store().stats();
        println!(
            "  {:<10} {:>6} {:>9} {:>6} {:>10}",
            &r.id().to_string()[..8],
            stats.live_entries,
            stats.compacted_ids,
            stats.frontier_size,
            stats.total_compacted
        );
    }
}

fn converged(replicas: &[Replica]) -> bool {
    replicas
        .iter()
        .all(|r| r.frontier() == replicas[0].frontier())
}

fn run_quick() {
    println!("=== quick: scripted three-replica walkthrough ===");
    let mut replicas = fleet(3, false);

    let x = replicas[0].append(Payload::data(b"first".to_vec()));
    replicas[1].append(Payload::data(b"second".to_vec()));
    replicas[2].append(Payload::data(b"third".to_vec()));

    for (a, b) in [(0, 1), (0, 2), (1, 2)] {
        swap(&mut replicas, a, b).expect("swap session failed");
    }
    println!(
        "after one round: converged = {}, stable(x) on originator = {}",
        converged(&replicas),
        replicas[0].check_stable(&x)
    );

    // A merge entry buries the three branch heads.
    replicas[0].append(Payload::data(b"merge".to_vec()));
    for (a, b) in [(0, 1), (0, 2), (1, 2)] {
        swap(&mut replicas, a, b).expect("swap session failed");
    }
    for (a, b) in [(0, 1), (0, 2), (1, 2)] {
        swap(&mut replicas, a, b).expect("swap session failed");
    }
    println!(
        "after two rounds: converged = {}, stable(x) everywhere = {}",
        converged(&replicas),
        replicas.iter().all(|r| r.check_stable(&x))
    );

    // Manual compaction on the first replica.
    let cog = replicas[0].next_cog();
    let evicted = replicas[0].compact(&cog);
    info!(evicted, "manual compaction pass finished");
    println!("compacted {} entries on one replica", evicted);
    report(&replicas);
}

fn run_churn() {
    println!("=== churn: randomized four-replica workload ===");
    let mut replicas = fleet(4, true);
    let mut rng = StdRng::seed_from_u64(42);
    let pairs: Vec<(usize, usize)> = (0..4)
        .flat_map(|a| (a + 1..4).map(move |b| (a, b)))
        .collect();
    let mut appended = 0u64;

    for step in 0..500 {
        for _ in 0..rng.gen_range(0..4) {
            let i = rng.gen_range(0..replicas.len());
            let value = rng.gen::<u8>();
            replicas[i].append(Payload::data(vec![value]));
            appended += 1;
        }

        if step % 25 == 24 {
            for &(a, b) in &pairs {
                // A concurrent append lands while the session is open.
                let a_id = replicas[a].id();
                let b_id = replicas[b].id();
                let m1 = replicas[a].prepare_swap(&b_id).expect("prepare failed");
                let (m2, ack) = replicas[b]
                    .respond_to_swap(&a_id, &m1)
                    .expect("respond failed");
                replicas[b].append(Payload::data(vec![rng.gen::<u8>()]));
                appended += 1;
                replicas[a].swap_final(&b_id, &m2).expect("finalize failed");
                replicas[b].complete_swap(ack).expect("ack failed");
            }
            info!(step, appended, "gossip burst complete");
        }
    }

    // Quiesce: two full gossip rounds without new appends.
    for _ in 0..2 {
        for &(a, b) in &pairs {
            swap(&mut replicas, a, b).expect("swap session failed");
        }
    }

    println!("appended {} entries total", appended);
    println!("converged = {}", converged(&replicas));
    report(&replicas);
}
