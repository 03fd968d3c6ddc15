//! Error types for the matrix clock.

use quorumclock_types::{ReplicaId, TypesError};
use thiserror::Error;

/// Errors returned by [`MatrixClock`](crate::MatrixClock) operations.
///
/// Every operation validates its arguments before touching any state, so an
/// error always leaves the matrix exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixError {
    /// Query offset outside `[-count, count - 1]`, or nothing attached.
    #[error("offset {offset} out of range for {count} attached replicas")]
    OutOfRange { offset: i64, count: usize },

    /// Replica id does not fit in the matrix capacity.
    #[error("replica {id} out of range for capacity {capacity}")]
    InvalidReplica { id: ReplicaId, capacity: usize },

    /// Replica is not attached.
    #[error("replica {0} is not attached")]
    NotAttached(ReplicaId),

    /// The attached replica limit has been reached.
    #[error("cannot attach more than {limit} replicas")]
    CapacityExceeded { limit: usize },

    /// Reported vector clock names a component beyond the capacity.
    #[error("component {component} out of range for capacity {capacity}")]
    InvalidComponent { component: ReplicaId, capacity: usize },

    /// Requested capacity is zero or larger than the replica id space.
    #[error("invalid capacity {0}")]
    InvalidCapacity(usize),
}

/// Result type for matrix clock operations.
pub type Result<T> = std::result::Result<T, MatrixError>;

impl From<TypesError> for MatrixError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::OutOfRange { id, capacity } => MatrixError::InvalidReplica { id, capacity },
        }
    }
}
