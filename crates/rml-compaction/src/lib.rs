//! # rml-compaction
//!
//! Causal stability and compaction subsystem for the Sardonyx
//! replicated merkle log.
//!
//! This crate provides:
//! - The peer-frontier table: per-peer believed tip sets
//! - Stability tracking: entries reachable from every peer's believed
//!   frontier are marked stable
//! - The compactor: folds stable interior entries into a compacted
//!   boundary while preserving the hash chain
//!
//! ## Architecture
//!
//! Stability is computed locally from the peer-frontier table, which
//! the swap protocol advances at its commit points. Compaction only
//! ever consumes stable entries and never touches ids the protocol
//! still advertises as roots, so deltas exchanged after a compaction
//! pass keep verifying on both sides.

mod compactor;
mod peers;
mod stability;

pub use compactor::{compact, compact_frontier, next_cog};
pub use peers::PeerFrontiers;
pub use stability::update_stability;
