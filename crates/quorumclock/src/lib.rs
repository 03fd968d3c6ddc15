//! quorumclock: Quorum-tracking matrix clock for synchronous replication
//!
//! Each replica periodically acknowledges the vector clock it has durably
//! written. The [`MatrixClock`] keeps every attached replica's latest
//! acknowledgment and, per vector clock component, a ranking of replicas by
//! the LSN they reached. The position confirmed by a quorum of `q` replicas
//! is then read by index instead of sorted on demand, which is what a
//! synchronous commit path needs before acknowledging a write.
//!
//! # Example
//!
//! ```
//! use quorumclock::MatrixClock;
//! use quorumclock_types::{Lsn, ReplicaId, VClock};
//!
//! let component = ReplicaId::new(10);
//! let report = |lsn| VClock::from_iter([(component, Lsn::new(lsn))]);
//!
//! let mut matrix = MatrixClock::new(32).unwrap();
//! matrix.attach(ReplicaId::new(1), &report(5)).unwrap();
//! matrix.attach(ReplicaId::new(2), &report(9)).unwrap();
//! matrix.attach(ReplicaId::new(3), &report(2)).unwrap();
//!
//! // LSN 5 of log 10 is on at least two replicas.
//! assert_eq!(matrix.get(-2).unwrap().get(component), Lsn::new(5));
//! assert_eq!(matrix.quorum(3).unwrap().get(component), Lsn::new(2));
//! ```
//!
//! # Thread Safety
//!
//! `MatrixClock` does no locking. It is meant to be owned by the single
//! task that already serializes replication state; share it behind a mutex
//! otherwise.

mod error;
mod matrix;

pub use error::{MatrixError, Result};
pub use matrix::MatrixClock;
