//! Entry ids and the canonical encoding they are computed over.
//!
//! An id is the SHA-256 digest of an entry's canonical encoding:
//! the parent count as a little-endian u64, the parent ids in
//! ascending byte order, a payload tag byte, and the payload bytes.
//! Pinning the encoding here keeps ids identical across processes
//! and architectures.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 32-byte entry id. Ordered by raw byte value; that order is
/// observable in child lists and in the replica equality check.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Hash(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// One-shot digest of arbitrary bytes. Handy for conjuring ids
    /// that belong to no entry.
    pub fn digest(data: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&Sha256::digest(data));
        Hash(bytes)
    }

    /// Full lowercase hex rendering, same as `Display`.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Parse the 64-character hex form produced by `to_hex`.
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = s.as_bytes();
        if raw.len() != 64 {
            return None;
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let hi = (raw[2 * i] as char).to_digit(16)?;
            let lo = (raw[2 * i + 1] as char).to_digit(16)?;
            *byte = (hi << 4 | lo) as u8;
        }
        Some(Hash(bytes))
    }

    /// Abbreviated form for log lines and error messages: the first
    /// four bytes as hex.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

/// Incremental digest over the canonical entry encoding.
///
/// Callers feed the encoding in its fixed order: parents, payload tag,
/// payload bytes. Parent order is normalized here, so two entries that
/// list the same parents differently still collapse to one id.
pub struct IdDigest {
    sha: Sha256,
}

impl IdDigest {
    pub fn new() -> Self {
        IdDigest { sha: Sha256::new() }
    }

    /// Write the parent section: count, then ids in ascending order.
    pub fn parents(&mut self, parents: &[Hash]) {
        self.sha.update((parents.len() as u64).to_le_bytes());
        let mut ordered = parents.to_vec();
        ordered.sort_unstable();
        for parent in &ordered {
            self.sha.update(parent.as_bytes());
        }
    }

    /// Write the payload tag byte.
    pub fn tag(&mut self, tag: u8) {
        self.sha.update([tag]);
    }

    /// Write the payload bytes.
    pub fn payload(&mut self, data: &[u8]) {
        self.sha.update(data);
    }

    /// Finish the encoding and return the id.
    pub fn finish(self) -> Hash {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.sha.finalize());
        Hash(bytes)
    }
}

impl Default for IdDigest {
    fn default() -> Self {
        Self::new()
    }
}
