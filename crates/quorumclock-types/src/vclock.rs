//! Sparse vector clocks.
//!
//! A vector clock maps a component (the id of the replica owning a log) to
//! the highest LSN known for that log. Only components that have been set
//! are stored; every other component reads as [`Lsn::ZERO`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Lsn, ReplicaId};

/// A sparse vector clock, ordered by component id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VClock {
    components: BTreeMap<ReplicaId, Lsn>,
}

impl VClock {
    /// Creates an empty vector clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every component.
    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// Returns the LSN for `component`, or [`Lsn::ZERO`] if it is absent.
    pub fn get(&self, component: ReplicaId) -> Lsn {
        self.components
            .get(&component)
            .copied()
            .unwrap_or(Lsn::ZERO)
    }

    /// Returns true if `component` has been set explicitly.
    pub fn contains(&self, component: ReplicaId) -> bool {
        self.components.contains_key(&component)
    }

    /// Sets `component` to `lsn` unconditionally, returning the previous value.
    pub fn set(&mut self, component: ReplicaId, lsn: Lsn) -> Lsn {
        self.components
            .insert(component, lsn)
            .unwrap_or(Lsn::ZERO)
    }

    /// Advances `component` to `lsn`, returning the previous value.
    ///
    /// A component never moves backward through `follow`; a lower `lsn` is
    /// ignored.
    pub fn follow(&mut self, component: ReplicaId, lsn: Lsn) -> Lsn {
        let entry = self.components.entry(component).or_insert(Lsn::ZERO);
        let prev = *entry;
        if lsn > prev {
            *entry = lsn;
        }
        prev
    }

    /// Iterates over `(component, lsn)` pairs in ascending component order.
    pub fn iter(&self) -> impl Iterator<Item = (ReplicaId, Lsn)> + '_ {
        self.components.iter().map(|(id, lsn)| (*id, *lsn))
    }

    /// Iterates over the components present, in ascending order.
    pub fn components(&self) -> impl Iterator<Item = ReplicaId> + '_ {
        self.components.keys().copied()
    }

    /// Number of components present.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Sum of all components.
    ///
    /// Grows strictly with every write to any log, which makes it a cheap
    /// signature for "has anything changed".
    pub fn sum(&self) -> u64 {
        self.components
            .values()
            .fold(0u64, |acc, lsn| acc.saturating_add(lsn.as_u64()))
    }

    /// Raises every component to at least the value in `other`.
    pub fn merge(&mut self, other: &VClock) {
        for (component, lsn) in other.iter() {
            self.follow(component, lsn);
        }
    }

    /// Compares two clocks under the component-wise partial order.
    ///
    /// Returns `None` when the clocks are concurrent (each is ahead of the
    /// other on some component).
    pub fn compare(&self, other: &VClock) -> Option<Ordering> {
        let mut le = true;
        let mut ge = true;

        for component in self.components().chain(other.components()) {
            match self.get(component).cmp(&other.get(component)) {
                Ordering::Less => ge = false,
                Ordering::Greater => le = false,
                Ordering::Equal => {}
            }
            if !le && !ge {
                return None;
            }
        }

        match (le, ge) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }

    /// Returns true if this clock has seen everything `other` has.
    pub fn dominates(&self, other: &VClock) -> bool {
        matches!(
            self.compare(other),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }
}

impl Display for VClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (component, lsn)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{component}: {lsn}")?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(ReplicaId, Lsn)> for VClock {
    fn from_iter<I: IntoIterator<Item = (ReplicaId, Lsn)>>(iter: I) -> Self {
        Self {
            components: iter.into_iter().collect(),
        }
    }
}

impl Extend<(ReplicaId, Lsn)> for VClock {
    fn extend<I: IntoIterator<Item = (ReplicaId, Lsn)>>(&mut self, iter: I) {
        self.components.extend(iter);
    }
}
