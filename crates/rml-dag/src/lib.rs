//! # rml-dag
//!
//! Content-addressed storage for the Sardonyx replicated merkle log.
//!
//! This crate provides:
//! - A 32-byte content identifier and the canonical encoding digest
//!   ids are computed over
//! - The log entry type, identified by the hash of (parents, payload)
//! - The per-replica DAG store: forward map, ordered reverse map,
//!   frontier tracking and the compacted boundary
//!
//! ## Architecture
//!
//! Every entry's id is derived from its parent ids and payload, so the
//! id transitively pins the entire causal history beneath it. The store
//! is the sole owner of entry objects; the reverse map, frontier and
//! compacted set hold only ids.
//!
//! ## Example
//!
//! ```rust
//! use rml_dag::{LogStore, Payload};
//!
//! let mut store = LogStore::new();
//! let a = store.append(Payload::data(vec![1]));
//! let b = store.append(Payload::data(vec![2]));
//!
//! // Appends chain: the newest entry is the only tip.
//! assert_eq!(store.frontier_ids(), vec![b]);
//! assert_eq!(store.get(&b).unwrap().parents, vec![a]);
//! ```

mod entry;
mod hash;
mod store;

pub use entry::{Entry, Payload};
pub use hash::{Hash, IdDigest};
pub use store::{LogStore, StoreError, StoreStats};
