//! Error types for the swap protocol.

use rml_dag::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to the transport layer.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SwapError {
    /// An incoming delta failed verification: an entry does not hash
    /// to its advertised id, or the message references an id that is
    /// neither in the delta nor locally known. The session aborts with
    /// no state change; the caller may retry from scratch.
    #[error("bad delta: {0}")]
    BadDelta(String),

    /// The peer uuid was not configured at construction. Returned
    /// without side effect.
    #[error("unknown peer {0}")]
    UnknownPeer(Uuid),

    /// The local store rejected an insertion. Signals a programming
    /// error rather than a protocol error.
    #[error(transparent)]
    Store(#[from] StoreError),
}
