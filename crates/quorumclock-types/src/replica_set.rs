//! Bounded set of replica ids.
//!
//! A fixed-capacity bitset over `[0, capacity)`. Members are enumerated in
//! ascending order, which is what the matrix clock relies on when it seeds a
//! freshly discovered component's ranking.

use crate::{MAX_CAPACITY, ReplicaId, TypesError};

const WORD_BITS: usize = u64::BITS as usize;

/// A set of replica ids with an explicit capacity.
///
/// Inserting an id at or beyond the capacity fails instead of silently
/// wrapping, so the capacity is a checked limit rather than an ambient one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSet {
    words: Box<[u64]>,
    capacity: usize,
}

impl ReplicaSet {
    /// Creates an empty set able to hold ids in `[0, capacity)`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`MAX_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity <= MAX_CAPACITY,
            "capacity {capacity} exceeds maximum {MAX_CAPACITY}"
        );

        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)].into_boxed_slice(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Adds `id` to the set.
    ///
    /// Returns `true` if the id was not already present.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::OutOfRange`] if `id` is not below the capacity.
    pub fn insert(&mut self, id: ReplicaId) -> Result<bool, TypesError> {
        if id.as_usize() >= self.capacity {
            return Err(TypesError::OutOfRange {
                id,
                capacity: self.capacity,
            });
        }

        let (word, mask) = Self::locate(id);
        let inserted = self.words[word] & mask == 0;
        self.words[word] |= mask;
        Ok(inserted)
    }

    /// Removes `id` from the set, returning whether it was present.
    pub fn remove(&mut self, id: ReplicaId) -> bool {
        if !self.contains(id) {
            return false;
        }

        let (word, mask) = Self::locate(id);
        self.words[word] &= !mask;
        true
    }

    pub fn contains(&self, id: ReplicaId) -> bool {
        if id.as_usize() >= self.capacity {
            return false;
        }

        let (word, mask) = Self::locate(id);
        self.words[word] & mask != 0
    }

    /// Number of members (population count).
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Iterates over the members in ascending id order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            word_index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    fn locate(id: ReplicaId) -> (usize, u64) {
        let index = id.as_usize();
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }
}

impl<'a> IntoIterator for &'a ReplicaSet {
    type Item = ReplicaId;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the members of a [`ReplicaSet`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    words: &'a [u64],
    word_index: usize,
    current: u64,
}

impl Iterator for Iter<'_> {
    type Item = ReplicaId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                // Clear the lowest set bit.
                self.current &= self.current - 1;
                return Some(ReplicaId::new((self.word_index * WORD_BITS + bit) as u8));
            }

            self.word_index += 1;
            if self.word_index >= self.words.len() {
                return None;
            }
            self.current = self.words[self.word_index];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_iterate_ascending() {
        let mut set = ReplicaSet::with_capacity(32);
        for id in [17u8, 3, 31, 0, 9] {
            assert!(set.insert(ReplicaId::new(id)).unwrap());
        }

        let members: Vec<u8> = set.iter().map(|id| id.as_u8()).collect();
        assert_eq!(members, vec![0, 3, 9, 17, 31]);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn insert_twice_reports_existing() {
        let mut set = ReplicaSet::with_capacity(8);
        assert!(set.insert(ReplicaId::new(2)).unwrap());
        assert!(!set.insert(ReplicaId::new(2)).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn insert_beyond_capacity_fails() {
        let mut set = ReplicaSet::with_capacity(4);
        let err = set.insert(ReplicaId::new(4)).unwrap_err();
        assert_eq!(
            err,
            TypesError::OutOfRange {
                id: ReplicaId::new(4),
                capacity: 4
            }
        );
        assert!(set.is_empty());
    }

    #[test]
    fn iterates_across_word_boundaries() {
        let mut set = ReplicaSet::with_capacity(MAX_CAPACITY);
        for id in [255u8, 64, 63, 128, 1] {
            set.insert(ReplicaId::new(id)).unwrap();
        }

        let members: Vec<u8> = set.iter().map(|id| id.as_u8()).collect();
        assert_eq!(members, vec![1, 63, 64, 128, 255]);
    }

    #[test]
    fn remove_and_clear() {
        let mut set = ReplicaSet::with_capacity(16);
        set.insert(ReplicaId::new(1)).unwrap();
        set.insert(ReplicaId::new(5)).unwrap();

        assert!(set.remove(ReplicaId::new(1)));
        assert!(!set.remove(ReplicaId::new(1)));
        assert!(!set.remove(ReplicaId::new(200)));
        assert!(set.contains(ReplicaId::new(5)));

        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.iter().next(), None);
    }

    #[test]
    fn zero_capacity_set_is_empty() {
        let set = ReplicaSet::with_capacity(0);
        assert_eq!(set.iter().count(), 0);
        assert!(!set.contains(ReplicaId::new(0)));
    }

    #[test]
    #[should_panic(expected = "exceeds maximum")]
    fn oversized_capacity_panics() {
        let _ = ReplicaSet::with_capacity(MAX_CAPACITY + 1);
    }
}
