//! The matrix clock.
//!
//! Rows are replicas, columns are vector clock components. For every known
//! column the matrix keeps the attached replicas ranked ascending by the LSN
//! they last reported for that column. Reading rank `count - q` of a column
//! then gives the highest LSN that at least `q` replicas have reached, with
//! no sorting at query time.
//!
//! # Maintenance
//!
//! An update changes exactly one row. Every other replica's value is
//! unchanged, so each column's ranking minus the updated replica is still
//! sorted, and the updated replica only has to be moved to its new slot:
//!
//! ```text
//! column 10, replica 3 reports 12
//!
//!   before: [3:2, 1:5, 2:9]
//!   after:  [1:5, 2:9, 3:12]     (rotate_left over ranks 0..=2)
//! ```
//!
//! That is one linear scan plus one rotate per changed column.

use quorumclock_config::MatrixConfig;
use quorumclock_types::{Lsn, MAX_CAPACITY, ReplicaId, ReplicaSet, ReplicaSetIter, VClock};

use crate::error::{MatrixError, Result};

/// Quorum-tracking matrix clock.
///
/// Not synchronized: callers serialize access, typically from the single
/// task that owns replication state.
#[derive(Debug, Clone)]
pub struct MatrixClock {
    /// Attached replicas.
    rows: ReplicaSet,

    /// Components seen in at least one report.
    cols: ReplicaSet,

    /// Last reported clock per replica, indexed by replica id.
    ///
    /// Only meaningful for attached replicas.
    clocks: Vec<VClock>,

    /// Per-component ranking of attached replicas, ascending by LSN.
    ///
    /// Indexed by component id; empty for unknown components.
    order: Vec<Vec<ReplicaId>>,

    /// Maximum number of replicas attached at once.
    max_attached: usize,
}

impl MatrixClock {
    /// Creates an empty matrix for replica ids in `[0, capacity)`.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::InvalidCapacity`] if `capacity` is zero or
    /// exceeds [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_limit(capacity, capacity)
    }

    /// Creates an empty matrix that accepts at most `max_attached` replicas
    /// at once, drawn from ids in `[0, capacity)`.
    pub fn with_limit(capacity: usize, max_attached: usize) -> Result<Self> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(MatrixError::InvalidCapacity(capacity));
        }
        if max_attached == 0 || max_attached > capacity {
            return Err(MatrixError::InvalidCapacity(max_attached));
        }

        Ok(Self {
            rows: ReplicaSet::with_capacity(capacity),
            cols: ReplicaSet::with_capacity(capacity),
            clocks: vec![VClock::new(); capacity],
            order: vec![Vec::new(); capacity],
            max_attached,
        })
    }

    /// Creates an empty matrix sized by configuration.
    pub fn from_config(config: &MatrixConfig) -> Result<Self> {
        Self::with_limit(config.capacity, config.attach_limit())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Starts tracking replica `id` with `vclock` as its first report.
    ///
    /// Attaching an already attached replica is the same as
    /// [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// - [`MatrixError::InvalidReplica`] if `id` is beyond the capacity
    /// - [`MatrixError::InvalidComponent`] if `vclock` names a component
    ///   beyond the capacity
    /// - [`MatrixError::CapacityExceeded`] if the attach limit is reached
    pub fn attach(&mut self, id: ReplicaId, vclock: &VClock) -> Result<()> {
        self.check_replica(id)?;
        if self.rows.contains(id) {
            return self.update(id, vclock);
        }
        self.check_components(vclock)?;
        if self.rows.len() >= self.max_attached {
            return Err(MatrixError::CapacityExceeded {
                limit: self.max_attached,
            });
        }

        self.rows.insert(id)?;
        self.clocks[id.as_usize()].clear();

        // Until the report is folded in the new row reads zero everywhere.
        // Rank it as late as a zero value allows.
        let clocks = &self.clocks;
        for col in self.cols.iter() {
            let ranking = &mut self.order[col.as_usize()];
            let slot = ranking.partition_point(|r| clocks[r.as_usize()].get(col).is_zero());
            ranking.insert(slot, id);
        }

        tracing::debug!(
            replica = %id,
            attached = self.rows.len(),
            vclock = %vclock,
            "replica attached"
        );

        self.apply(id, vclock)
    }

    /// Stops tracking replica `id`.
    ///
    /// The replica is dropped from every ranking; the relative order of the
    /// remaining replicas is unchanged.
    ///
    /// # Errors
    ///
    /// - [`MatrixError::InvalidReplica`] if `id` is beyond the capacity
    /// - [`MatrixError::NotAttached`] if `id` is not attached
    pub fn detach(&mut self, id: ReplicaId) -> Result<()> {
        self.check_replica(id)?;
        if !self.rows.remove(id) {
            return Err(MatrixError::NotAttached(id));
        }

        for col in self.cols.iter() {
            let ranking = &mut self.order[col.as_usize()];
            if let Some(pos) = ranking.iter().position(|r| *r == id) {
                ranking.remove(pos);
            }
        }
        self.clocks[id.as_usize()].clear();

        tracing::debug!(replica = %id, attached = self.rows.len(), "replica detached");

        #[cfg(debug_assertions)]
        self.check_invariants();

        Ok(())
    }

    /// Records a new report from attached replica `id`.
    ///
    /// Components that went backward are accepted and re-ranked.
    ///
    /// # Errors
    ///
    /// - [`MatrixError::InvalidReplica`] if `id` is beyond the capacity
    /// - [`MatrixError::NotAttached`] if `id` is not attached
    /// - [`MatrixError::InvalidComponent`] if `vclock` names a component
    ///   beyond the capacity
    pub fn update(&mut self, id: ReplicaId, vclock: &VClock) -> Result<()> {
        self.check_replica(id)?;
        if !self.rows.contains(id) {
            return Err(MatrixError::NotAttached(id));
        }
        self.check_components(vclock)?;

        self.apply(id, vclock)
    }

    /// Returns the matrix to its freshly created state.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.cols.clear();
        self.clocks.iter_mut().for_each(VClock::clear);
        self.order.iter_mut().for_each(Vec::clear);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns the vector clock at rank `offset` in every known column.
    ///
    /// Non-negative offsets count up from the lowest rank, negative offsets
    /// count down from the highest: `-1` is the most advanced replica and
    /// `-q` is the position reached by at least `q` replicas. Components
    /// whose value at that rank is zero are omitted.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::OutOfRange`] if nothing is attached or `offset`
    /// is outside `[-count, count - 1]`.
    pub fn get(&self, offset: i64) -> Result<VClock> {
        let rank = self.rank(offset)?;

        let mut vclock = VClock::new();
        for col in self.cols.iter() {
            let replica = self.order[col.as_usize()][rank];
            let lsn = self.clocks[replica.as_usize()].get(col);
            if !lsn.is_zero() {
                vclock.follow(col, lsn);
            }
        }
        Ok(vclock)
    }

    /// Like [`get`](Self::get), writing into `out`.
    ///
    /// On failure `out` is cleared.
    pub fn get_into(&self, offset: i64, out: &mut VClock) -> Result<()> {
        match self.get(offset) {
            Ok(vclock) => {
                *out = vclock;
                Ok(())
            }
            Err(err) => {
                out.clear();
                Err(err)
            }
        }
    }

    /// Returns the vector clock confirmed by at least `quorum` replicas.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::OutOfRange`] if `quorum` is zero or larger than
    /// the number of attached replicas.
    pub fn quorum(&self, quorum: usize) -> Result<VClock> {
        self.get(self.quorum_offset(quorum)?)
    }

    /// Returns the LSN of `component` confirmed by at least `quorum`
    /// replicas. Unknown components are confirmed at zero.
    pub fn confirmed_lsn(&self, component: ReplicaId, quorum: usize) -> Result<Lsn> {
        let rank = self.rank(self.quorum_offset(quorum)?)?;
        if !self.cols.contains(component) {
            return Ok(Lsn::ZERO);
        }

        let replica = self.order[component.as_usize()][rank];
        Ok(self.clocks[replica.as_usize()].get(component))
    }

    /// Number of attached replicas.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Replica ids accepted are `[0, capacity)`.
    pub fn capacity(&self) -> usize {
        self.rows.capacity()
    }

    pub fn max_attached(&self) -> usize {
        self.max_attached
    }

    pub fn is_attached(&self, id: ReplicaId) -> bool {
        self.rows.contains(id)
    }

    /// Attached replicas in ascending id order.
    pub fn replicas(&self) -> ReplicaSetIter<'_> {
        self.rows.iter()
    }

    /// Known components in ascending id order.
    pub fn components(&self) -> ReplicaSetIter<'_> {
        self.cols.iter()
    }

    /// Last clock reported by `id`, if attached.
    pub fn clock(&self, id: ReplicaId) -> Option<&VClock> {
        if self.rows.contains(id) {
            Some(&self.clocks[id.as_usize()])
        } else {
            None
        }
    }

    /// Attached replicas ranked ascending by their LSN for `component`.
    pub fn ranking(&self, component: ReplicaId) -> Option<&[ReplicaId]> {
        if self.cols.contains(component) {
            Some(self.order[component.as_usize()].as_slice())
        } else {
            None
        }
    }

    /// Asserts that every ranking is a sorted permutation of the attached
    /// replicas.
    ///
    /// # Panics
    ///
    /// Panics with a description of the first violation found.
    pub fn check_invariants(&self) {
        let count = self.rows.len();
        for col in self.cols.iter() {
            let ranking = &self.order[col.as_usize()];
            assert_eq!(
                ranking.len(),
                count,
                "component {col} ranks {} replicas, {count} attached",
                ranking.len()
            );

            let mut seen = ReplicaSet::with_capacity(self.capacity());
            for replica in ranking {
                assert!(
                    self.rows.contains(*replica),
                    "component {col} ranks detached replica {replica}"
                );
                assert_eq!(
                    seen.insert(*replica),
                    Ok(true),
                    "component {col} ranks replica {replica} twice"
                );
            }

            for pair in ranking.windows(2) {
                let low = self.clocks[pair[0].as_usize()].get(col);
                let high = self.clocks[pair[1].as_usize()].get(col);
                assert!(
                    low <= high,
                    "component {col} out of order: replica {} at {low} before replica {} at {high}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Folds a validated report from an attached replica into the matrix.
    fn apply(&mut self, id: ReplicaId, vclock: &VClock) -> Result<()> {
        for component in vclock.components() {
            if !self.cols.contains(component) {
                self.discover(component)?;
            }
        }

        let row = id.as_usize();
        for col in self.cols.iter() {
            let old_lsn = self.clocks[row].get(col);
            let new_lsn = vclock.get(col);
            if old_lsn == new_lsn {
                continue;
            }
            if new_lsn < old_lsn {
                tracing::warn!(
                    replica = %id,
                    component = %col,
                    old_lsn = %old_lsn,
                    new_lsn = %new_lsn,
                    "component went backward"
                );
            }

            let ranking = &mut self.order[col.as_usize()];
            let (from, to) = reposition(ranking, &self.clocks, col, id, new_lsn);
            if from != to {
                tracing::trace!(
                    replica = %id,
                    component = %col,
                    lsn = %new_lsn,
                    from,
                    to,
                    "replica re-ranked"
                );
            }
        }

        self.clocks[row].clone_from(vclock);

        #[cfg(debug_assertions)]
        self.check_invariants();

        Ok(())
    }

    /// Starts tracking `component`, seeding its ranking with every attached
    /// replica in ascending id order.
    ///
    /// Nobody has reported the component yet, so every replica reads zero
    /// and any order is sorted.
    fn discover(&mut self, component: ReplicaId) -> Result<()> {
        self.cols.insert(component)?;

        let ranking = &mut self.order[component.as_usize()];
        ranking.clear();
        ranking.extend(self.rows.iter());

        tracing::debug!(component = %component, "component discovered");
        Ok(())
    }

    fn check_replica(&self, id: ReplicaId) -> Result<()> {
        if id.as_usize() >= self.capacity() {
            return Err(MatrixError::InvalidReplica {
                id,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    fn check_components(&self, vclock: &VClock) -> Result<()> {
        match vclock
            .components()
            .find(|c| c.as_usize() >= self.capacity())
        {
            Some(component) => Err(MatrixError::InvalidComponent {
                component,
                capacity: self.capacity(),
            }),
            None => Ok(()),
        }
    }

    /// Normalizes a signed offset to a rank in `[0, count)`.
    fn rank(&self, offset: i64) -> Result<usize> {
        let count = self.rows.len();
        let signed = count as i64;
        if count == 0 || offset >= signed || offset < -signed {
            return Err(MatrixError::OutOfRange { offset, count });
        }
        Ok(((offset + signed) % signed) as usize)
    }

    fn quorum_offset(&self, quorum: usize) -> Result<i64> {
        let count = self.rows.len();
        // Quorums past i64::MAX are reported at the most negative offset.
        let offset = i64::try_from(quorum).map_or(i64::MIN, i64::wrapping_neg);
        if quorum == 0 || quorum > count {
            return Err(MatrixError::OutOfRange { offset, count });
        }
        Ok(offset)
    }
}

/// Moves `id` to the slot its new `lsn` belongs at, returning the old and
/// new rank.
///
/// `clocks` still holds the old value for `id`; every other replica's value
/// is current, so the ranking without `id` is sorted. Any slot between the
/// first value `>= lsn` and the first value `> lsn` keeps it sorted, and the
/// one nearest the old rank is taken.
fn reposition(
    ranking: &mut [ReplicaId],
    clocks: &[VClock],
    component: ReplicaId,
    id: ReplicaId,
    lsn: Lsn,
) -> (usize, usize) {
    let Some(old_pos) = ranking.iter().position(|r| *r == id) else {
        panic!("replica {id} missing from ranking of component {component}");
    };

    let mut below = 0;
    let mut at_or_below = 0;
    for (pos, replica) in ranking.iter().enumerate() {
        if pos == old_pos {
            continue;
        }
        let value = clocks[replica.as_usize()].get(component);
        if value < lsn {
            below += 1;
        }
        if value <= lsn {
            at_or_below += 1;
        }
    }

    let new_pos = old_pos.clamp(below, at_or_below);
    if old_pos < new_pos {
        ranking[old_pos..=new_pos].rotate_left(1);
    } else if old_pos > new_pos {
        ranking[new_pos..=old_pos].rotate_right(1);
    }
    (old_pos, new_pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> ReplicaId {
        ReplicaId::new(n)
    }

    fn vclock(pairs: &[(u8, u64)]) -> VClock {
        pairs
            .iter()
            .map(|(c, lsn)| (ReplicaId::new(*c), Lsn::new(*lsn)))
            .collect()
    }

    fn ids(ranking: &[ReplicaId]) -> Vec<u8> {
        ranking.iter().map(|r| r.as_u8()).collect()
    }

    #[test]
    fn reposition_moves_up() {
        let clocks = vec![
            vclock(&[(0, 2)]),
            vclock(&[(0, 5)]),
            vclock(&[(0, 9)]),
        ];
        let mut ranking = vec![id(0), id(1), id(2)];

        let moved = reposition(&mut ranking, &clocks, id(0), id(0), Lsn::new(12));
        assert_eq!(moved, (0, 2));
        assert_eq!(ids(&ranking), vec![1, 2, 0]);
    }

    #[test]
    fn reposition_moves_down() {
        let clocks = vec![
            vclock(&[(0, 2)]),
            vclock(&[(0, 5)]),
            vclock(&[(0, 9)]),
        ];
        let mut ranking = vec![id(0), id(1), id(2)];

        let moved = reposition(&mut ranking, &clocks, id(0), id(2), Lsn::new(1));
        assert_eq!(moved, (2, 0));
        assert_eq!(ids(&ranking), vec![2, 0, 1]);
    }

    #[test]
    fn reposition_tie_stays_near_old_rank() {
        let clocks = vec![
            vclock(&[(0, 5)]),
            vclock(&[(0, 5)]),
            vclock(&[(0, 5)]),
            vclock(&[(0, 1)]),
        ];
        // Replica 3 is last with a stale value; every other rank holds 5.
        let mut ranking = vec![id(0), id(1), id(2), id(3)];

        let moved = reposition(&mut ranking, &clocks, id(0), id(3), Lsn::new(5));
        assert_eq!(moved, (3, 3));
        assert_eq!(ids(&ranking), vec![0, 1, 2, 3]);
    }

    #[test]
    fn attach_places_new_row_after_zeros() {
        let mut matrix = MatrixClock::new(8).unwrap();
        matrix.attach(id(1), &vclock(&[(1, 4)])).unwrap();
        matrix.attach(id(2), &VClock::new()).unwrap();
        matrix.attach(id(3), &VClock::new()).unwrap();

        // 2 and 3 read zero for component 1; 1 stays on top.
        assert_eq!(ids(matrix.ranking(id(1)).unwrap()), vec![2, 3, 1]);
        matrix.check_invariants();
    }

    #[test]
    fn discovered_component_seeds_ascending() {
        let mut matrix = MatrixClock::new(8).unwrap();
        for n in [5, 2, 7] {
            matrix.attach(id(n), &VClock::new()).unwrap();
        }
        assert!(matrix.ranking(id(4)).is_none());

        matrix.update(id(7), &vclock(&[(4, 3)])).unwrap();
        assert_eq!(ids(matrix.ranking(id(4)).unwrap()), vec![2, 5, 7]);
    }

    #[test]
    fn missing_component_reads_as_zero() {
        let mut matrix = MatrixClock::new(8).unwrap();
        matrix.attach(id(1), &vclock(&[(1, 5), (2, 3)])).unwrap();
        matrix.attach(id(2), &vclock(&[(1, 6), (2, 4)])).unwrap();

        // Replica 2 stops reporting component 2.
        matrix.update(id(2), &vclock(&[(1, 7)])).unwrap();

        assert_eq!(ids(matrix.ranking(id(2)).unwrap()), vec![2, 1]);
        assert_eq!(matrix.get(-1).unwrap(), vclock(&[(1, 7), (2, 3)]));
        matrix.check_invariants();
    }
}
