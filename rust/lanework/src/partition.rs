//! Round-robin partitioning of an ordered item sequence into lanes.
//!
//! The item at input position `k` lands in lane `k % lane_count`, at position
//! `k / lane_count` within that lane. Relative order is preserved inside each
//! lane, and the sizes of any two lanes differ by at most one.

use std::collections::VecDeque;

/// An ordered run of items assigned to a single worker.
///
/// A lane is owned exclusively by the worker that drains it; items are taken
/// from the front in FIFO order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane<T> {
    index: usize,
    items: VecDeque<T>,
}

impl<T> Lane<T> {
    fn with_capacity(index: usize, capacity: usize) -> Lane<T> {
        Lane {
            index,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Zero-based index of this lane.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes the next item in FIFO order.
    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items.into()
    }
}

/// Splits `items` into exactly `lane_count` lanes by round-robin assignment.
///
/// Lanes are returned in index order. When `lane_count` exceeds the number of
/// items, the trailing lanes are empty.
///
/// # Panics
///
/// Panics if `lane_count` is 0.
pub fn partition<T>(items: impl IntoIterator<Item = T>, lane_count: usize) -> Vec<Lane<T>> {
    assert_ne!(lane_count, 0, "lane_count must be positive");

    let items = items.into_iter();
    let per_lane = items.size_hint().0.div_ceil(lane_count);
    let mut lanes = (0..lane_count)
        .map(|index| Lane::with_capacity(index, per_lane))
        .collect::<Vec<_>>();
    for (k, item) in items.enumerate() {
        lanes[k % lane_count].items.push_back(item);
    }
    lanes
}

#[cfg(test)]
mod tests {
    use super::partition;

    #[test]
    fn test_partition_five_into_two() {
        let lanes = partition(["a", "b", "c", "d", "e"], 2);
        assert_eq!(lanes.len(), 2);
        assert_eq!(lanes[0].clone().into_items(), vec!["a", "c", "e"]);
        assert_eq!(lanes[1].clone().into_items(), vec!["b", "d"]);
        assert_eq!(lanes[0].index(), 0);
        assert_eq!(lanes[1].index(), 1);
    }

    #[test]
    fn test_partition_bijection() {
        for total in [0usize, 1, 2, 7, 64, 101] {
            for lane_count in 1..=9 {
                let lanes = partition(0..total, lane_count);
                assert_eq!(lanes.len(), lane_count);

                let mut seen = vec![false; total];
                for lane in &lanes {
                    for (pos, k) in lane.clone().into_items().into_iter().enumerate() {
                        assert_eq!((k % lane_count, k / lane_count), (lane.index(), pos));
                        assert!(!seen[k]);
                        seen[k] = true;
                    }
                }
                assert!(seen.iter().all(|&s| s));

                let max = lanes.iter().map(|l| l.len()).max().unwrap();
                let min = lanes.iter().map(|l| l.len()).min().unwrap();
                assert!(max - min <= 1);
            }
        }
    }

    #[test]
    fn test_single_lane_keeps_order() {
        let lanes = partition(0..10, 1);
        assert_eq!(lanes[0].clone().into_items(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_more_lanes_than_items() {
        let lanes = partition(["x", "y", "z"], 5);
        assert_eq!(lanes.len(), 5);
        assert!(lanes[..3].iter().all(|l| l.len() == 1));
        assert!(lanes[3..].iter().all(|l| l.is_empty()));
    }

    #[test]
    fn test_pop_front_is_fifo() {
        let mut lanes = partition(0..6, 3);
        let lane = &mut lanes[1];
        assert_eq!(lane.pop_front(), Some(1));
        assert_eq!(lane.pop_front(), Some(4));
        assert_eq!(lane.pop_front(), None);
    }

    #[test]
    #[should_panic]
    fn test_zero_lanes() {
        partition(0..3, 0);
    }
}
