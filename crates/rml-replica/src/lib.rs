//! # rml-replica
//!
//! The replica state machine of the Sardonyx replicated merkle log,
//! and the three-message swap protocol that converges two replicas
//! without transferring their full histories.
//!
//! ## Protocol shape
//!
//! A swap is a single non-pipelined session between an initiator A and
//! a responder B:
//!
//! 1. A sends the entries it believes B lacks plus its own tips
//!    (`prepare_swap`).
//! 2. B merges, replies with its own unacknowledged entries and its
//!    converged tips, and stages a deferred commit (`respond_to_swap`).
//! 3. A merges the reply and commits its belief about B
//!    (`swap_final`); the implicit ack lets B commit via
//!    `complete_swap`.
//!
//! A session abandoned at any phase leaves both peer-frontier tables
//! at their previous values; the next swap simply retransmits.
//!
//! ## Example
//!
//! ```rust
//! use rml_replica::Replica;
//! use rml_dag::Payload;
//! use uuid::Uuid;
//!
//! let ids = [Uuid::new_v4(), Uuid::new_v4()];
//! let mut a = Replica::new(ids[0], &ids);
//! let mut b = Replica::new(ids[1], &ids);
//!
//! let x = a.append(Payload::data(vec![42]));
//!
//! let m1 = a.prepare_swap(&ids[1]).unwrap();
//! let (m2, ack) = b.respond_to_swap(&ids[0], &m1).unwrap();
//! a.swap_final(&ids[1], &m2).unwrap();
//! b.complete_swap(ack).unwrap();
//!
//! assert_eq!(a, b);
//! assert!(a.check_stable(&x) && b.check_stable(&x));
//! ```

mod error;
mod protocol;
mod replica;

pub use error::SwapError;
pub use protocol::{Delta, SwapAck, SwapMessage};
pub use replica::{Replica, ReplicaConfig};
