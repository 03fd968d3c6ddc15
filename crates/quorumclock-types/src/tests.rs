//! Unit tests for quorumclock-types

use std::cmp::Ordering;

use proptest::prelude::*;
use test_case::test_case;

use crate::{Lsn, ReplicaId, VClock};

fn vclock(pairs: &[(u8, u64)]) -> VClock {
    pairs
        .iter()
        .map(|(id, lsn)| (ReplicaId::new(*id), Lsn::new(*lsn)))
        .collect()
}

// ============================================================================
// VClock Tests
// ============================================================================

#[test]
fn absent_component_reads_zero() {
    let clock = vclock(&[(1, 5)]);
    assert_eq!(clock.get(ReplicaId::new(1)), Lsn::new(5));
    assert_eq!(clock.get(ReplicaId::new(2)), Lsn::ZERO);
    assert!(!clock.contains(ReplicaId::new(2)));
}

#[test]
fn follow_never_moves_backward() {
    let mut clock = VClock::new();
    assert_eq!(clock.follow(ReplicaId::new(3), Lsn::new(10)), Lsn::ZERO);
    assert_eq!(clock.follow(ReplicaId::new(3), Lsn::new(7)), Lsn::new(10));
    assert_eq!(clock.get(ReplicaId::new(3)), Lsn::new(10));
}

#[test]
fn set_overwrites_in_either_direction() {
    let mut clock = vclock(&[(3, 10)]);
    assert_eq!(clock.set(ReplicaId::new(3), Lsn::new(4)), Lsn::new(10));
    assert_eq!(clock.get(ReplicaId::new(3)), Lsn::new(4));
}

#[test]
fn iteration_is_ordered_by_component() {
    let clock = vclock(&[(9, 1), (2, 7), (5, 3)]);
    let components: Vec<u8> = clock.components().map(|c| c.as_u8()).collect();
    assert_eq!(components, vec![2, 5, 9]);
}

#[test]
fn clear_empties_clock() {
    let mut clock = vclock(&[(1, 1), (2, 2)]);
    clock.clear();
    assert!(clock.is_empty());
    assert_eq!(clock.sum(), 0);
}

#[test]
fn sum_adds_all_components() {
    assert_eq!(vclock(&[(1, 5), (2, 9), (3, 2)]).sum(), 16);
}

#[test]
fn merge_takes_component_max() {
    let mut a = vclock(&[(1, 5), (2, 1)]);
    let b = vclock(&[(1, 3), (2, 4), (3, 8)]);
    a.merge(&b);
    assert_eq!(a, vclock(&[(1, 5), (2, 4), (3, 8)]));
}

#[test]
fn display_lists_components() {
    assert_eq!(vclock(&[(10, 5), (1, 2)]).to_string(), "{1: 2, 10: 5}");
    assert_eq!(VClock::new().to_string(), "{}");
}

#[test_case(&[(1, 5)], &[(1, 5)], Some(Ordering::Equal); "equal")]
#[test_case(&[(1, 5)], &[(1, 6)], Some(Ordering::Less); "behind")]
#[test_case(&[(1, 5), (2, 1)], &[(1, 5)], Some(Ordering::Greater); "extra component")]
#[test_case(&[(1, 5), (2, 0)], &[(1, 5)], Some(Ordering::Equal); "explicit zero")]
#[test_case(&[(1, 6)], &[(2, 1)], None; "concurrent")]
fn compare_partial_order(a: &[(u8, u64)], b: &[(u8, u64)], expected: Option<Ordering>) {
    assert_eq!(vclock(a).compare(&vclock(b)), expected);
}

#[test]
fn dominates_includes_equal() {
    let a = vclock(&[(1, 5), (2, 3)]);
    assert!(a.dominates(&a.clone()));
    assert!(a.dominates(&vclock(&[(1, 4)])));
    assert!(!a.dominates(&vclock(&[(3, 1)])));
}

#[test]
fn serializes_as_component_map() {
    let clock = vclock(&[(1, 5), (10, 9)]);
    let json = serde_json::to_string(&clock).unwrap();
    assert_eq!(json, r#"{"1":5,"10":9}"#);

    let decoded: VClock = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, clock);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Property: a merged clock dominates both inputs.
    #[test]
    fn prop_merge_dominates_inputs(
        a in prop::collection::vec((0u8..8, 0u64..100), 0..8),
        b in prop::collection::vec((0u8..8, 0u64..100), 0..8),
    ) {
        let a = vclock(&a);
        let b = vclock(&b);
        let mut merged = a.clone();
        merged.merge(&b);

        prop_assert!(merged.dominates(&a));
        prop_assert!(merged.dominates(&b));
    }
}
