//! # quorumclock-types: Core types for `quorumclock`
//!
//! This crate contains the leaf types the matrix clock is built from:
//! - Identifiers ([`ReplicaId`]) and log positions ([`Lsn`])
//! - Sparse vector clocks ([`VClock`])
//! - Bounded replica sets with ascending iteration ([`ReplicaSet`])

use std::fmt::Display;

use serde::{Deserialize, Serialize};

mod replica_set;
mod vclock;

pub use replica_set::{Iter as ReplicaSetIter, ReplicaSet};
pub use vclock::VClock;

/// Default number of replica slots, matching the width of a classic
/// 32-bit replica map.
pub const VCLOCK_MAX: usize = 32;

/// Hard upper bound on any replica set capacity.
///
/// Replica ids are `u8`, so no set can address more than 256 slots.
pub const MAX_CAPACITY: usize = u8::MAX as usize + 1;

// ============================================================================
// Entity IDs - All Copy
// ============================================================================

/// Identifier of a replica, and of the vector clock component that tracks
/// the log it owns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ReplicaId(u8);

impl ReplicaId {
    pub fn new(id: u8) -> Self {
        Self(id)
    }

    pub fn as_u8(self) -> u8 {
        self.0
    }

    /// Returns the id as a `usize` for indexing.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for ReplicaId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<ReplicaId> for u8 {
    fn from(id: ReplicaId) -> Self {
        id.0
    }
}

/// Log sequence number: a position in one replica's write-ahead log.
///
/// Zero means "nothing written yet" and is never reported as a confirmed
/// position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Lsn(u64);

impl Lsn {
    pub const ZERO: Lsn = Lsn(0);

    pub fn new(lsn: u64) -> Self {
        Self(lsn)
    }

    /// Returns the LSN as a `u64`.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Display for Lsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Lsn {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Lsn> for u64 {
    fn from(lsn: Lsn) -> Self {
        lsn.0
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the leaf types.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    /// The replica id does not fit in the set's capacity.
    #[error("replica {id} out of range for capacity {capacity}")]
    OutOfRange { id: ReplicaId, capacity: usize },
}

#[cfg(test)]
mod tests;
